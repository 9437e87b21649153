//! Head-parallel lane program
//!
//! Lane `l` owns unit-local slots `l, l + NR_LANES, ...`. For each it fetches
//! K and V into its private scratch once, then walks the slot's rows in
//! `TILE_ROWS` tiles. Only the LUT and scalars are shared.

use crate::config::MhaGeometry;
use crate::kernel::pipeline::TilePipeline;
use crate::kernel::shared::{KvTiles, SharedTables};
use crate::kernel::{Lane, Stage};
use crate::memory::{HandoffBuffer, ScratchArena};
use crate::scheduler::{RowRange, TileScheduler};
use tracing::{debug, debug_span, trace};

/// Scratch shared by all lanes of a head-parallel unit
pub struct Shared {
    tables: HandoffBuffer<SharedTables>,
}

impl Shared {
    pub fn alloc(scratch: &ScratchArena) -> Self {
        Self {
            tables: HandoffBuffer::new(SharedTables::alloc(scratch)),
        }
    }
}

pub fn run<G: MhaGeometry>(lane: &Lane<'_>, shared: &Shared) {
    let sched = TileScheduler::for_geometry::<G>();
    let mut kv = KvTiles::alloc::<G>(lane.scratch());
    let mut pipeline = TilePipeline::alloc::<G>(lane.scratch());
    let cycles_at = G::SEQ_LEN * G::OUT_ROW_BYTES;

    let nslots = lane.exchange(
        &shared.tables,
        |tables| {
            lane.perf().reset();
            tables.fetch(lane.bulk(), lane.symbols());
        },
        |tables| {
            let nslots = tables.nslots();
            for slot in sched.lane_slots(lane.id, nslots) {
                let _span = debug_span!("slot", slot).entered();
                let start = lane.perf().now();

                trace!(lane = lane.id, slot, stage = %Stage::FetchShared);
                kv.fetch::<G>(lane.bulk(), lane.symbols(), slot);

                for tile in sched.row_tiles(RowRange::new(0, G::SEQ_LEN)) {
                    pipeline.process::<G>(lane, slot, tile, &kv.k, &kv.v, &tables.lut);
                }

                let cycles = lane.perf().now().saturating_sub(start);
                lane.write_cycles(slot, G::RECORD_BYTES, cycles_at, cycles);
                debug!(unit = lane.unit(), lane = lane.id, slot, cycles, "slot done");
            }
            nslots
        },
    );

    if nslots == 0 && lane.is_designated() {
        lane.write_cycles(0, G::RECORD_BYTES, cycles_at, lane.perf().now());
    }
}
