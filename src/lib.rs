//! pim-mha - multi-head self-attention on a simulated processing-in-memory rank
//!
//! Many units, each with a handful of SPMD lanes, a small scratch memory and a
//! large bulk memory reachable only by block transfers. The kernel tiles
//! attention to fit scratch, computes it in fixed point with a LUT softmax,
//! and produces results a host-side reference can reproduce bit for bit.
//!
//! ```ignore
//! use pim_mha::config::{SingleHeadGeometry, SystemConfig};
//! use pim_mha::host::UnitSet;
//! use pim_mha::inputs::MhaInputs;
//!
//! let units = UnitSet::<SingleHeadGeometry>::allocate(SystemConfig::default())?;
//! let (results, _timings) = units.run(&MhaInputs::scenario::<SingleHeadGeometry>())?;
//! println!("row 0: {:?}", results.row(0, 0));
//! ```

#![allow(clippy::needless_range_loop)] // index loops mirror the row/column math

pub mod config;
pub mod error;
pub mod host;
pub mod inputs;
pub mod kernel;
pub mod logging;
pub mod memory;
pub mod profiling;
pub mod quant;
pub mod reference;
pub mod scheduler;

pub use config::{MhaGeometry, Schedule, SystemConfig};
pub use error::{ErrorCategory, PimError, PimResult};
pub use host::{MhaResults, RunReport, UnitSet};
pub use inputs::MhaInputs;
pub use profiling::{CycleSummary, PerfCounter};
