//! Compile-time kernel geometry
//!
//! A geometry is a zero-sized type implementing [`MhaGeometry`]. Kernel and
//! host code are generic over it, so every shape constant is resolved when the
//! code is monomorphized and the `VALID` assertions run at build time.

use crate::config::{align8, MAX_HEAD_DIM, MAX_LANES, SCRATCH_CAPACITY_BYTES};
use crate::memory::calculator;
use serde::Serialize;

/// How the work of one unit is split across its lanes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Schedule {
    /// Lane `l` owns slots `l, l + NR_LANES, ...` and tiles their rows alone
    HeadParallel,
    /// All lanes cooperate on one slot at a time, each owning a row range
    RowParallel,
}

impl Schedule {
    pub fn as_str(&self) -> &'static str {
        match self {
            Schedule::HeadParallel => "head-parallel",
            Schedule::RowParallel => "row-parallel",
        }
    }
}

impl std::fmt::Display for Schedule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Shape of one attention workload
///
/// Implementors provide the first block of constants; everything below
/// `TOTAL_SLOTS` is derived and should not be overridden.
///
/// # Example
/// ```ignore
/// struct Tiny;
/// impl MhaGeometry for Tiny {
///     const NAME: &'static str = "tiny";
///     const SEQ_LEN: usize = 8;
///     const HEAD_DIM: usize = 4;
///     const NUM_HEADS: usize = 2;
///     const BATCH_SIZE: usize = 1;
///     const NR_LANES: usize = 2;
///     const TILE_ROWS: usize = 4;
///     const SLOTS_PER_UNIT: usize = 2;
///     const SCHEDULE: Schedule = Schedule::HeadParallel;
/// }
/// ```
pub trait MhaGeometry: Send + Sync + 'static {
    /// Short name used in logs and reports
    const NAME: &'static str;
    /// Rows (and score columns) per slot
    const SEQ_LEN: usize;
    /// Elements per Q/K/V/output row
    const HEAD_DIM: usize;
    const NUM_HEADS: usize;
    const BATCH_SIZE: usize;
    /// Lanes per unit
    const NR_LANES: usize;
    /// Rows in one score/probability tile
    const TILE_ROWS: usize;
    /// Slots uploaded to each unit
    const SLOTS_PER_UNIT: usize;
    const SCHEDULE: Schedule;
    /// Fixed-point scale of Q and K
    const QK_SCALE: i32 = 127;
    /// Fixed-point scale of V
    const V_SCALE: i32 = 127;

    // ---- derived ----

    /// Head-major slot count: slot `s` is head `s / BATCH_SIZE`, batch item `s % BATCH_SIZE`
    const TOTAL_SLOTS: usize = Self::NUM_HEADS * Self::BATCH_SIZE;
    const NR_UNITS: usize = Self::TOTAL_SLOTS.div_ceil(Self::SLOTS_PER_UNIT);
    /// Elements per Q/K/V matrix
    const SLOT_ELEMS: usize = Self::SEQ_LEN * Self::HEAD_DIM;
    /// Bulk row stride of Q/K/V (`i8` rows padded to the transfer alignment)
    const IN_ROW_BYTES: usize = align8(Self::HEAD_DIM);
    /// Bulk row stride of the output (`i32` rows padded to the transfer alignment)
    const OUT_ROW_BYTES: usize = align8(Self::HEAD_DIM * 4);
    /// One result record: output rows followed by the 8-byte cycle field
    const RECORD_BYTES: usize = Self::SEQ_LEN * Self::OUT_ROW_BYTES + 8;
    /// Rows per lane under the row-parallel split
    const ROWS_PER_LANE: usize = Self::SEQ_LEN.div_ceil(Self::NR_LANES);
    /// Scratch bytes one unit needs for a launch
    const SCRATCH_BYTES: usize = match Self::SCHEDULE {
        Schedule::HeadParallel => calculator::head_parallel_footprint(
            Self::SEQ_LEN,
            Self::HEAD_DIM,
            Self::TILE_ROWS,
            Self::NR_LANES,
        ),
        Schedule::RowParallel => calculator::row_parallel_footprint(
            Self::SEQ_LEN,
            Self::HEAD_DIM,
            Self::TILE_ROWS,
            Self::NR_LANES,
        ),
    };

    /// Build-time contract checks. Evaluate with `let () = G::VALID;`.
    const VALID: () = {
        assert!(Self::SEQ_LEN > 0, "SEQ_LEN must be positive");
        assert!(Self::HEAD_DIM > 0, "HEAD_DIM must be positive");
        assert!(
            Self::HEAD_DIM <= MAX_HEAD_DIM,
            "HEAD_DIM above 64 can overflow i32 score accumulators"
        );
        assert!(Self::NUM_HEADS > 0, "NUM_HEADS must be positive");
        assert!(Self::BATCH_SIZE > 0, "BATCH_SIZE must be positive");
        assert!(Self::NR_LANES > 0, "NR_LANES must be positive");
        assert!(Self::NR_LANES <= MAX_LANES, "at most 24 lanes per unit");
        assert!(Self::TILE_ROWS > 0, "TILE_ROWS must be positive");
        assert!(Self::SLOTS_PER_UNIT > 0, "SLOTS_PER_UNIT must be positive");
        assert!(
            Self::QK_SCALE >= 1 && Self::QK_SCALE <= 127,
            "QK_SCALE must lie in 1..=127"
        );
        assert!(
            Self::V_SCALE >= 1 && Self::V_SCALE <= 127,
            "V_SCALE must lie in 1..=127"
        );
        assert!(
            Self::SEQ_LEN * 255 * 128 <= i32::MAX as usize,
            "SEQ_LEN too large for i32 weighted-sum accumulators"
        );
        assert!(
            Self::SCRATCH_BYTES <= SCRATCH_CAPACITY_BYTES,
            "scratch footprint exceeds 64 KiB"
        );
    };
}

/// Sixteen heads, one slot per lane, rows tiled eight at a time
#[derive(Debug, Clone, Copy, Default)]
pub struct TilingGeometry;

impl MhaGeometry for TilingGeometry {
    const NAME: &'static str = "tiling";
    const SEQ_LEN: usize = 32;
    const HEAD_DIM: usize = 8;
    const NUM_HEADS: usize = 16;
    const BATCH_SIZE: usize = 1;
    const NR_LANES: usize = 16;
    const TILE_ROWS: usize = 8;
    const SLOTS_PER_UNIT: usize = 16;
    const SCHEDULE: Schedule = Schedule::HeadParallel;
}

/// Sixteen heads over a batch of 128, one slot per unit, lanes split rows
#[derive(Debug, Clone, Copy, Default)]
pub struct MultiSlotGeometry;

impl MhaGeometry for MultiSlotGeometry {
    const NAME: &'static str = "multi-slot";
    const SEQ_LEN: usize = 128;
    const HEAD_DIM: usize = 16;
    const NUM_HEADS: usize = 16;
    const BATCH_SIZE: usize = 128;
    const NR_LANES: usize = 16;
    const TILE_ROWS: usize = 2;
    const SLOTS_PER_UNIT: usize = 1;
    const SCHEDULE: Schedule = Schedule::RowParallel;
}

/// One head, one batch item; the end-to-end accuracy scenario
#[derive(Debug, Clone, Copy, Default)]
pub struct SingleHeadGeometry;

impl MhaGeometry for SingleHeadGeometry {
    const NAME: &'static str = "single-head";
    const SEQ_LEN: usize = 32;
    const HEAD_DIM: usize = 16;
    const NUM_HEADS: usize = 1;
    const BATCH_SIZE: usize = 1;
    const NR_LANES: usize = 16;
    const TILE_ROWS: usize = 2;
    const SLOTS_PER_UNIT: usize = 1;
    const SCHEDULE: Schedule = Schedule::RowParallel;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_presets_are_valid() {
        let () = TilingGeometry::VALID;
        let () = MultiSlotGeometry::VALID;
        let () = SingleHeadGeometry::VALID;
    }

    #[test]
    fn test_tiling_derived_constants() {
        assert_eq!(TilingGeometry::TOTAL_SLOTS, 16);
        assert_eq!(TilingGeometry::NR_UNITS, 1);
        assert_eq!(TilingGeometry::IN_ROW_BYTES, 8);
        assert_eq!(TilingGeometry::OUT_ROW_BYTES, 32);
        assert_eq!(TilingGeometry::RECORD_BYTES, 32 * 32 + 8);
    }

    #[test]
    fn test_multi_slot_derived_constants() {
        assert_eq!(MultiSlotGeometry::TOTAL_SLOTS, 2048);
        assert_eq!(MultiSlotGeometry::NR_UNITS, 2048);
        assert_eq!(MultiSlotGeometry::ROWS_PER_LANE, 8);
        assert!(MultiSlotGeometry::SCRATCH_BYTES <= SCRATCH_CAPACITY_BYTES);
    }

    #[test]
    fn test_default_scales() {
        assert_eq!(SingleHeadGeometry::QK_SCALE, 127);
        assert_eq!(SingleHeadGeometry::V_SCALE, 127);
    }

    #[test]
    fn test_schedule_display() {
        assert_eq!(Schedule::HeadParallel.to_string(), "head-parallel");
        assert_eq!(Schedule::RowParallel.as_str(), "row-parallel");
    }
}
