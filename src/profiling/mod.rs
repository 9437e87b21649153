//! Profiling
//!
//! - [`perf_counter`]: the per-unit cycle counter lanes write into result records
//! - [`host_timer`]: wall-clock timers for host phases

pub mod host_timer;
pub mod perf_counter;

pub use host_timer::{PhaseTimer, ScopedTimer};
pub use perf_counter::{CycleSummary, PerfCounter};
