//! Per-lane tile pipeline
//!
//! `FETCH_SHARED` happens outside (once per slot); this runs the rest for one
//! row tile: fetch the Q rows, score them against K, softmax, weight V and
//! write the output rows back to the slot's record.

use crate::config::MhaGeometry;
use crate::kernel::tile::{matmul_score_tile, softmax_tile, weighted_sum_tile, TileShape};
use crate::kernel::{Lane, Stage};
use crate::memory::{ScratchArena, ScratchBuf};
use crate::scheduler::RowTile;
use tracing::trace;

/// Lane-exclusive tile buffers, sized for `TILE_ROWS` rows
#[derive(Debug)]
pub struct TilePipeline {
    shape: TileShape,
    q: ScratchBuf<i8>,
    scores: ScratchBuf<i32>,
    probs: ScratchBuf<u8>,
    out: ScratchBuf<i32>,
}

impl TilePipeline {
    pub fn alloc<G: MhaGeometry>(scratch: &ScratchArena) -> Self {
        let shape = TileShape::of::<G>();
        Self {
            shape,
            q: scratch.alloc(G::TILE_ROWS * G::IN_ROW_BYTES),
            scores: scratch.alloc(G::TILE_ROWS * G::SEQ_LEN),
            probs: scratch.alloc(G::TILE_ROWS * G::SEQ_LEN),
            out: scratch.alloc(G::TILE_ROWS * shape.out_stride),
        }
    }

    /// Run one tile of unit-local slot `slot` against resident K, V and LUT
    pub fn process<G: MhaGeometry>(
        &mut self,
        lane: &Lane<'_>,
        slot: usize,
        tile: RowTile,
        k: &[i8],
        v: &[i8],
        lut: &[u8],
    ) {
        let shape = self.shape;
        let bulk = lane.bulk();
        let symbols = lane.symbols();
        let in_bytes = tile.rows * G::IN_ROW_BYTES;
        let out_bytes = tile.rows * G::OUT_ROW_BYTES;

        let q_row = slot * G::SEQ_LEN + tile.start;
        bulk.dma_read(
            symbols.q.at(q_row * G::IN_ROW_BYTES),
            &mut self.q.as_bytes_mut()[..in_bytes],
        );

        trace!(lane = lane.id, slot, row = tile.start, rows = tile.rows, stage = %Stage::MatmulScore);
        matmul_score_tile(&self.q, k, tile.rows, &shape, &mut self.scores);

        trace!(lane = lane.id, slot, row = tile.start, stage = %Stage::Softmax);
        softmax_tile(&self.scores, tile.rows, shape.seq_len, lut, &mut self.probs);

        trace!(lane = lane.id, slot, row = tile.start, stage = %Stage::WeightedSum);
        weighted_sum_tile(&self.probs, v, tile.rows, &shape, &mut self.out);

        trace!(lane = lane.id, slot, row = tile.start, stage = %Stage::Writeback);
        let record = slot * G::RECORD_BYTES + tile.start * G::OUT_ROW_BYTES;
        bulk.dma_write(
            symbols.results.at(record),
            &self.out.as_bytes()[..out_bytes],
        );
    }
}
