//! Row-parallel lane program
//!
//! All lanes work on one slot at a time. The designated lane fetches the
//! slot's K and V into shared scratch; every lane then computes its own row
//! range in `TILE_ROWS` tiles. The cycle count is written once, after the
//! last slot, by the designated lane.

use crate::config::MhaGeometry;
use crate::kernel::pipeline::TilePipeline;
use crate::kernel::shared::{KvTiles, SharedTables};
use crate::kernel::{Lane, Stage};
use crate::memory::{HandoffBuffer, ScratchArena};
use crate::scheduler::TileScheduler;
use tracing::{debug, debug_span, trace};

/// Scratch shared by all lanes of a row-parallel unit
pub struct Shared {
    tables: HandoffBuffer<SharedTables>,
    kv: HandoffBuffer<KvTiles>,
}

impl Shared {
    pub fn alloc<G: MhaGeometry>(scratch: &ScratchArena) -> Self {
        Self {
            tables: HandoffBuffer::new(SharedTables::alloc(scratch)),
            kv: HandoffBuffer::new(KvTiles::alloc::<G>(scratch)),
        }
    }
}

pub fn run<G: MhaGeometry>(lane: &Lane<'_>, shared: &Shared) {
    let sched = TileScheduler::for_geometry::<G>();
    let rows = sched.lane_rows(lane.id);
    let mut pipeline = TilePipeline::alloc::<G>(lane.scratch());

    let nslots = lane.exchange(
        &shared.tables,
        |tables| {
            lane.perf().reset();
            tables.fetch(lane.bulk(), lane.symbols());
        },
        |tables| {
            let nslots = tables.nslots();
            for slot in 0..nslots {
                let _span = debug_span!("slot", slot).entered();
                lane.exchange(
                    &shared.kv,
                    |kv| {
                        trace!(lane = lane.id, slot, stage = %Stage::FetchShared);
                        kv.fetch::<G>(lane.bulk(), lane.symbols(), slot);
                    },
                    |kv| {
                        for tile in sched.row_tiles(rows) {
                            pipeline.process::<G>(lane, slot, tile, &kv.k, &kv.v, &tables.lut);
                        }
                    },
                );
            }
            nslots
        },
    );

    // every lane has passed the final rendezvous
    if lane.is_designated() {
        let cycles = lane.perf().now();
        let cycles_at = G::SEQ_LEN * G::OUT_ROW_BYTES;
        for slot in 0..nslots.max(1) {
            lane.write_cycles(slot, G::RECORD_BYTES, cycles_at, cycles);
        }
        debug!(unit = lane.unit(), nslots, cycles, "unit slots done");
    }
}
