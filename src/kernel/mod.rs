//! Attention tile kernel
//!
//! Each unit runs `NR_LANES` lanes of the same program. Per tile the pipeline
//! is `FETCH_SHARED -> MATMUL_SCORE -> SOFTMAX -> WEIGHTED_SUM -> WRITEBACK`,
//! where the shared fetch happens once per slot and is amortized over all of
//! the slot's tiles.
//!
//! Lane code has no error channel. A broken contract (bad address, exhausted
//! scratch) panics; the barrier is poisoned so the other lanes stop too, and
//! [`launch_unit`] reports the unit as faulted.

pub mod barrier;
pub mod head_parallel;
pub mod lane;
pub mod pipeline;
pub mod row_parallel;
pub mod shared;
pub mod tile;
pub mod unit;

pub use barrier::LaneBarrier;
pub use lane::{Lane, DESIGNATED_LANE};
pub use tile::{matmul_score_tile, softmax_row, softmax_tile, weighted_sum_tile, TileShape};
pub use unit::{launch_unit, UnitContext};

use std::fmt;

/// Stages of the per-tile state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    FetchShared,
    MatmulScore,
    Softmax,
    WeightedSum,
    Writeback,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::FetchShared => "FETCH_SHARED",
            Stage::MatmulScore => "MATMUL_SCORE",
            Stage::Softmax => "SOFTMAX",
            Stage::WeightedSum => "WEIGHTED_SUM",
            Stage::Writeback => "WRITEBACK",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
