//! Small geometries shared by the integration tests
//!
//! Sizes are chosen to hit the awkward cases: odd head dimensions (padded
//! rows), sequence lengths that do not divide among lanes, idle lanes, and
//! units that receive fewer slots than they have room for.

#![allow(dead_code)]

use pim_mha::config::{MhaGeometry, Schedule, SystemConfig};

/// 6 slots over 2 units of 4 lanes; unit 1 gets 2 slots, so lanes 2-3 idle
pub struct HeadSmall;

impl MhaGeometry for HeadSmall {
    const NAME: &'static str = "head-small";
    const SEQ_LEN: usize = 16;
    const HEAD_DIM: usize = 8;
    const NUM_HEADS: usize = 3;
    const BATCH_SIZE: usize = 2;
    const NR_LANES: usize = 4;
    const TILE_ROWS: usize = 3;
    const SLOTS_PER_UNIT: usize = 4;
    const SCHEDULE: Schedule = Schedule::HeadParallel;
}

/// [`HeadSmall`] with `TILE_ROWS` doubled
pub struct HeadSmallWideTiles;

impl MhaGeometry for HeadSmallWideTiles {
    const NAME: &'static str = "head-small-wide";
    const SEQ_LEN: usize = 16;
    const HEAD_DIM: usize = 8;
    const NUM_HEADS: usize = 3;
    const BATCH_SIZE: usize = 2;
    const NR_LANES: usize = 4;
    const TILE_ROWS: usize = 6;
    const SLOTS_PER_UNIT: usize = 4;
    const SCHEDULE: Schedule = Schedule::HeadParallel;
}

/// More slots than lanes in one unit; odd head dimension
pub struct HeadStrided;

impl MhaGeometry for HeadStrided {
    const NAME: &'static str = "head-strided";
    const SEQ_LEN: usize = 12;
    const HEAD_DIM: usize = 3;
    const NUM_HEADS: usize = 5;
    const BATCH_SIZE: usize = 1;
    const NR_LANES: usize = 2;
    const TILE_ROWS: usize = 5;
    const SLOTS_PER_UNIT: usize = 5;
    const SCHEDULE: Schedule = Schedule::HeadParallel;
    const QK_SCALE: i32 = 64;
    const V_SCALE: i32 = 100;
}

/// 18 rows over 5 lanes (4, 4, 4, 4, 2); odd head dimension
pub struct RowSmall;

impl MhaGeometry for RowSmall {
    const NAME: &'static str = "row-small";
    const SEQ_LEN: usize = 18;
    const HEAD_DIM: usize = 5;
    const NUM_HEADS: usize = 2;
    const BATCH_SIZE: usize = 2;
    const NR_LANES: usize = 5;
    const TILE_ROWS: usize = 2;
    const SLOTS_PER_UNIT: usize = 3;
    const SCHEDULE: Schedule = Schedule::RowParallel;
}

/// [`RowSmall`] with `TILE_ROWS` doubled
pub struct RowSmallWideTiles;

impl MhaGeometry for RowSmallWideTiles {
    const NAME: &'static str = "row-small-wide";
    const SEQ_LEN: usize = 18;
    const HEAD_DIM: usize = 5;
    const NUM_HEADS: usize = 2;
    const BATCH_SIZE: usize = 2;
    const NR_LANES: usize = 5;
    const TILE_ROWS: usize = 4;
    const SLOTS_PER_UNIT: usize = 3;
    const SCHEDULE: Schedule = Schedule::RowParallel;
}

/// More lanes than rows: lanes 8-11 own empty ranges
pub struct RowIdleLanes;

impl MhaGeometry for RowIdleLanes {
    const NAME: &'static str = "row-idle-lanes";
    const SEQ_LEN: usize = 8;
    const HEAD_DIM: usize = 4;
    const NUM_HEADS: usize = 1;
    const BATCH_SIZE: usize = 2;
    const NR_LANES: usize = 12;
    const TILE_ROWS: usize = 1;
    const SLOTS_PER_UNIT: usize = 1;
    const SCHEDULE: Schedule = Schedule::RowParallel;
}

/// Large enough that K/V transfers split into several DMA chunks
pub struct RowLongSequence;

impl MhaGeometry for RowLongSequence {
    const NAME: &'static str = "row-long";
    const SEQ_LEN: usize = 160;
    const HEAD_DIM: usize = 24;
    const NUM_HEADS: usize = 1;
    const BATCH_SIZE: usize = 1;
    const NR_LANES: usize = 8;
    const TILE_ROWS: usize = 4;
    const SLOTS_PER_UNIT: usize = 1;
    const SCHEDULE: Schedule = Schedule::RowParallel;
}

/// Units run one after another, so lane panics in fault tests stay readable
pub fn sequential_config() -> SystemConfig {
    SystemConfig::new().with_parallel_units(false)
}
