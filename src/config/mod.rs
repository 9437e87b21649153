//! Configuration for the attention kernel and the simulated rank
//!
//! Two kinds of configuration exist:
//! - [`MhaGeometry`]: sizes, lane count, tiling and quantization scales. These
//!   are associated constants of a type, so every size is fixed at build time
//!   and a malformed geometry fails compilation when the kernel is
//!   instantiated for it.
//! - [`SystemConfig`]: properties of the host-side simulation (how many units
//!   the rank can grant, the clock used for cycle accounting, memory
//!   capacities). These are runtime values and never change kernel output.

pub mod geometry;
pub mod system;

pub use geometry::{
    MhaGeometry, MultiSlotGeometry, Schedule, SingleHeadGeometry, TilingGeometry,
};
pub use system::SystemConfig;

/// Alignment of every bulk-memory block transfer, in bytes
pub const DMA_ALIGNMENT: usize = 8;

/// Largest single block transfer; longer transfers are split
pub const MAX_DMA_BYTES: usize = 2048;

/// Scratch (WRAM) capacity of one unit, shared by all of its lanes
pub const SCRATCH_CAPACITY_BYTES: usize = 64 * 1024;

/// Hardware limit on lanes per unit
pub const MAX_LANES: usize = 24;

/// Largest head dimension for which `i8 x i8` dot products cannot overflow `i32`
pub const MAX_HEAD_DIM: usize = 64;

/// Round `bytes` up to the transfer alignment
pub const fn align8(bytes: usize) -> usize {
    (bytes + DMA_ALIGNMENT - 1) & !(DMA_ALIGNMENT - 1)
}
