//! Host-side orchestration
//!
//! Allocates the units a geometry needs, uploads inputs and the LUT, launches
//! every unit and gathers the per-slot result records. Errors exist only at
//! this boundary.

pub mod results;
pub mod unit_set;
pub mod validate;

pub use results::{HostTimings, MhaResults, RunReport, SlotResult};
pub use unit_set::UnitSet;
pub use validate::{run_validated, DEFAULT_TOLERANCE};
