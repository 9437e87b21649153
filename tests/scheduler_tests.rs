//! Partition properties of the tile scheduler and the unit assignment

use pim_mha::config::Schedule;
use pim_mha::scheduler::{unit_assignments, RowRange, TileScheduler, WorkItem};
use proptest::prelude::*;

/// No two items of the same slot share a row
fn rows_disjoint(items: &[WorkItem]) -> bool {
    items.iter().enumerate().all(|(i, a)| {
        items[i + 1..]
            .iter()
            .all(|b| a.slot != b.slot || !a.rows.overlaps(&b.rows))
    })
}

fn spans_disjoint(items: &[WorkItem], record_bytes: usize, out_row_bytes: usize) -> bool {
    let mut spans: Vec<_> = items
        .iter()
        .map(|item| item.output_span(record_bytes, out_row_bytes))
        .filter(|span| !span.is_empty())
        .collect();
    spans.sort_by_key(|span| span.start);
    spans.windows(2).all(|w| w[0].end <= w[1].start)
}

#[test]
fn test_row_split_uneven() {
    let sched = TileScheduler::new(18, 5, 2);
    let lens: Vec<_> = (0..5).map(|lane| sched.lane_rows(lane).len()).collect();
    assert_eq!(lens, vec![4, 4, 4, 4, 2]);
}

#[test]
fn test_row_split_more_lanes_than_rows() {
    let sched = TileScheduler::new(8, 12, 1);
    for lane in 8..12 {
        let idle = sched.lane_rows(lane);
        assert!(idle.is_empty());
        assert!(!idle.overlaps(&sched.lane_rows(7)));
    }
    let items = sched.work_items(Schedule::RowParallel, 2);
    assert_eq!(items.len(), 8 * 2);
    assert!(items.iter().all(|item| item.lane < 8));
}

#[test]
fn test_tiles_of_multi_slot_lane() {
    // 128 rows over 16 lanes, tiles of 2
    let sched = TileScheduler::new(128, 16, 2);
    let tiles: Vec<_> = sched.row_tiles(sched.lane_rows(3)).collect();
    assert_eq!(tiles.len(), 4);
    assert_eq!(tiles[0].start, 24);
    assert_eq!(tiles[3].end(), 32);
}

#[test]
fn test_lane_slots_stride() {
    let sched = TileScheduler::new(32, 16, 8);
    assert_eq!(sched.lane_slots(3, 16).collect::<Vec<_>>(), vec![3]);

    let sched = TileScheduler::new(12, 2, 5);
    assert_eq!(sched.lane_slots(0, 5).collect::<Vec<_>>(), vec![0, 2, 4]);
    assert_eq!(sched.lane_slots(1, 5).collect::<Vec<_>>(), vec![1, 3]);
    assert_eq!(sched.lane_slots(1, 1).count(), 0);
}

#[test]
fn test_unit_assignments_tail() {
    let assignments = unit_assignments(6, 4, 2);
    assert_eq!(assignments[0].slots(), 0..4);
    assert_eq!(assignments[1].slots(), 4..6);

    let assignments = unit_assignments(4, 4, 3);
    assert!(assignments[1].is_idle());
    assert!(assignments[2].is_idle());
}

proptest! {
    #[test]
    fn test_lane_ranges_partition_rows(
        seq_len in 1..300usize,
        nr_lanes in 1..24usize,
        tile_rows in 1..16usize,
    ) {
        let sched = TileScheduler::new(seq_len, nr_lanes, tile_rows);
        for a in 0..nr_lanes {
            for b in a + 1..nr_lanes {
                prop_assert!(!sched.lane_rows(a).overlaps(&sched.lane_rows(b)));
            }
        }

        let mut next = 0;
        for lane in 0..nr_lanes {
            let rows = sched.lane_rows(lane);
            prop_assert!(rows.len() <= sched.rows_per_lane());
            if rows.is_empty() {
                continue;
            }
            prop_assert_eq!(rows.start, next);
            next = rows.end;
        }
        prop_assert_eq!(next, seq_len);
    }

    #[test]
    fn test_tiles_cover_range(
        start in 0..200usize,
        len in 0..200usize,
        tile_rows in 1..16usize,
    ) {
        let sched = TileScheduler::new(start + len + 1, 1, tile_rows);
        let range = RowRange::new(start, start + len);
        let mut next = start;
        for tile in sched.row_tiles(range) {
            prop_assert!(tile.rows >= 1 && tile.rows <= tile_rows);
            prop_assert_eq!(tile.start, next);
            next = tile.end();
        }
        prop_assert_eq!(next, range.end);
    }

    #[test]
    fn test_work_items_write_disjoint_spans(
        seq_len in 1..128usize,
        nr_lanes in 1..24usize,
        tile_rows in 1..8usize,
        nslots in 0..20usize,
        head_dim in 1..64usize,
    ) {
        let sched = TileScheduler::new(seq_len, nr_lanes, tile_rows);
        let out_row_bytes = (4 * head_dim).div_ceil(8) * 8;
        let record_bytes = seq_len * out_row_bytes + 8;

        for schedule in [Schedule::HeadParallel, Schedule::RowParallel] {
            let items = sched.work_items(schedule, nslots);
            prop_assert!(rows_disjoint(&items));
            prop_assert!(spans_disjoint(&items, record_bytes, out_row_bytes));

            let covered: usize = items.iter().map(|item| item.rows.len()).sum();
            prop_assert_eq!(covered, nslots * seq_len);
        }
    }

    #[test]
    fn test_head_parallel_slot_owned_once(
        nr_lanes in 1..24usize,
        nslots in 0..64usize,
    ) {
        let sched = TileScheduler::new(4, nr_lanes, 1);
        let mut owners = vec![0usize; nslots];
        for lane in 0..nr_lanes {
            for slot in sched.lane_slots(lane, nslots) {
                prop_assert_eq!(slot % nr_lanes, lane);
                owners[slot] += 1;
            }
        }
        prop_assert!(owners.iter().all(|&n| n == 1));
    }

    #[test]
    fn test_unit_assignments_cover_slots(
        total in 1..500usize,
        per_unit in 1..32usize,
    ) {
        let nr_units = total.div_ceil(per_unit);
        let assignments = unit_assignments(total, per_unit, nr_units);
        let mut next = 0;
        for a in &assignments {
            prop_assert!(a.nslots <= per_unit);
            prop_assert_eq!(a.slot0, next);
            next += a.nslots;
        }
        prop_assert_eq!(next, total);
    }
}
