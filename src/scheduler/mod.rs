//! Tile scheduler
//!
//! Decides which lane touches which rows of which slot, and which slots each
//! unit receives. Two regimes exist:
//! - head-parallel: a lane owns whole slots, tiling their rows on its own
//! - row-parallel: all lanes share each slot, one contiguous row range each

pub mod partition;
pub mod types;

pub use partition::{unit_assignments, RowTiles, TileScheduler};
pub use types::{RowRange, RowTile, SlotId, UnitAssignment, WorkItem};
