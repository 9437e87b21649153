//! Deterministic partitioning of rows and slots across lanes and units
//!
//! Every lane computes the same partition from the same constants, so all
//! lanes agree on iteration bounds and reach every barrier the same number
//! of times.

use crate::config::{MhaGeometry, Schedule};
use crate::scheduler::types::{RowRange, RowTile, UnitAssignment, WorkItem};

/// Tile scheduler of one unit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TileScheduler {
    pub seq_len: usize,
    pub nr_lanes: usize,
    pub tile_rows: usize,
}

impl TileScheduler {
    /// # Panics
    /// If any size is zero
    pub fn new(seq_len: usize, nr_lanes: usize, tile_rows: usize) -> Self {
        assert!(
            seq_len > 0 && nr_lanes > 0 && tile_rows > 0,
            "scheduler sizes must be positive"
        );
        TileScheduler {
            seq_len,
            nr_lanes,
            tile_rows,
        }
    }

    pub fn for_geometry<G: MhaGeometry>() -> Self {
        let () = G::VALID;
        Self::new(G::SEQ_LEN, G::NR_LANES, G::TILE_ROWS)
    }

    /// Rows per lane under the row-parallel split
    pub fn rows_per_lane(&self) -> usize {
        self.seq_len.div_ceil(self.nr_lanes)
    }

    /// Row-parallel range of `lane`
    ///
    /// Ranges are `ceil(SEQ_LEN / NR_LANES)` long and clamped to `SEQ_LEN`, so
    /// trailing lanes may get a short or empty range.
    pub fn lane_rows(&self, lane: usize) -> RowRange {
        let per_lane = self.rows_per_lane();
        let start = (lane * per_lane).min(self.seq_len);
        let end = (start + per_lane).min(self.seq_len);
        RowRange::new(start, end)
    }

    /// Head-parallel slots of `lane`: `lane, lane + NR_LANES, ...` below `nslots`
    pub fn lane_slots(&self, lane: usize, nslots: usize) -> impl Iterator<Item = usize> {
        (lane..nslots).step_by(self.nr_lanes)
    }

    /// Split `range` into tiles of at most `tile_rows` rows, the tail sized down
    pub fn row_tiles(&self, range: RowRange) -> RowTiles {
        RowTiles {
            next: range.start,
            end: range.end,
            tile_rows: self.tile_rows,
        }
    }

    /// Everything every lane will touch for `nslots` unit-local slots
    pub fn work_items(&self, schedule: Schedule, nslots: usize) -> Vec<WorkItem> {
        let mut items = Vec::new();
        for lane in 0..self.nr_lanes {
            match schedule {
                Schedule::HeadParallel => {
                    for slot in self.lane_slots(lane, nslots) {
                        items.push(WorkItem {
                            lane,
                            slot,
                            rows: RowRange::new(0, self.seq_len),
                        });
                    }
                }
                Schedule::RowParallel => {
                    let rows = self.lane_rows(lane);
                    if rows.is_empty() {
                        continue;
                    }
                    for slot in 0..nslots {
                        items.push(WorkItem { lane, slot, rows });
                    }
                }
            }
        }
        items
    }
}

/// Iterator over the tiles of a row range
#[derive(Debug, Clone)]
pub struct RowTiles {
    next: usize,
    end: usize,
    tile_rows: usize,
}

impl Iterator for RowTiles {
    type Item = RowTile;

    fn next(&mut self) -> Option<RowTile> {
        if self.next >= self.end {
            return None;
        }
        let rows = self.tile_rows.min(self.end - self.next);
        let tile = RowTile {
            start: self.next,
            rows,
        };
        self.next += rows;
        Some(tile)
    }
}

/// Unit `u` gets `min(slots_per_unit, remaining)` slots starting at
/// `u * slots_per_unit`; units past the last slot get none.
pub fn unit_assignments(
    total_slots: usize,
    slots_per_unit: usize,
    nr_units: usize,
) -> Vec<UnitAssignment> {
    (0..nr_units)
        .map(|unit| {
            let slot0 = (unit * slots_per_unit).min(total_slots);
            let nslots = slots_per_unit.min(total_slots - slot0);
            UnitAssignment {
                unit,
                slot0,
                nslots,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lane_rows_even_split() {
        let sched = TileScheduler::new(128, 16, 2);
        assert_eq!(sched.rows_per_lane(), 8);
        assert_eq!(sched.lane_rows(0), RowRange::new(0, 8));
        assert_eq!(sched.lane_rows(15), RowRange::new(120, 128));
    }

    #[test]
    fn test_lane_rows_remainder() {
        // 10 rows over 4 lanes: 3, 3, 3, 1
        let sched = TileScheduler::new(10, 4, 2);
        assert_eq!(sched.lane_rows(2), RowRange::new(6, 9));
        assert_eq!(sched.lane_rows(3), RowRange::new(9, 10));
    }

    #[test]
    fn test_lane_rows_empty_tail() {
        // 32 rows over 24 lanes: 16 lanes of 2 rows, the rest idle
        let sched = TileScheduler::new(32, 24, 2);
        assert_eq!(sched.lane_rows(15), RowRange::new(30, 32));
        assert!(sched.lane_rows(16).is_empty());
        assert!(sched.lane_rows(23).is_empty());
    }

    #[test]
    fn test_lane_slots_stride() {
        let sched = TileScheduler::new(32, 16, 8);
        assert_eq!(sched.lane_slots(3, 40).collect::<Vec<_>>(), vec![3, 19, 35]);
        assert_eq!(sched.lane_slots(3, 3).count(), 0);
    }

    #[test]
    fn test_row_tiles_tail_sized_down() {
        let sched = TileScheduler::new(10, 1, 4);
        let tiles: Vec<_> = sched.row_tiles(RowRange::new(0, 10)).collect();
        assert_eq!(
            tiles,
            vec![
                RowTile { start: 0, rows: 4 },
                RowTile { start: 4, rows: 4 },
                RowTile { start: 8, rows: 2 },
            ]
        );
        assert_eq!(sched.row_tiles(RowRange::new(5, 5)).count(), 0);
    }

    #[test]
    fn test_unit_assignments() {
        let units = unit_assignments(10, 4, 3);
        assert_eq!(units[0].slots(), 0..4);
        assert_eq!(units[1].slots(), 4..8);
        assert_eq!(units[2].slots(), 8..10);

        let idle = unit_assignments(2, 4, 2);
        assert!(idle[1].is_idle());
        assert_eq!(idle[1].slot0, 2);
    }

    #[test]
    fn test_work_items_row_parallel_skips_idle_lanes() {
        let sched = TileScheduler::new(4, 8, 1);
        let items = sched.work_items(Schedule::RowParallel, 2);
        assert_eq!(items.len(), 8);
        assert!(items.iter().all(|item| item.lane < 4));
    }
}
