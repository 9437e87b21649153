//! Bulk-memory symbol map of the attention kernel

use crate::config::MhaGeometry;
use crate::error::PimResult;
use crate::memory::bulk::{BulkMemory, Region};
use crate::memory::calculator::BulkLayout;
use crate::quant::LUT_SIZE;

pub const DPU_Q: &str = "DPU_Q";
pub const DPU_K: &str = "DPU_K";
pub const DPU_V: &str = "DPU_V";
pub const DPU_EXP_LUT: &str = "DPU_EXP_LUT";
pub const DPU_RESULTS: &str = "DPU_RESULTS";
pub const DPU_NSLOTS64: &str = "DPU_NSLOTS64";
pub const DPU_SLOT0_64: &str = "DPU_SLOT0_64";

/// Layout of one unit for geometry `G`
///
/// Q/K/V hold `SLOTS_PER_UNIT * SEQ_LEN` rows of `IN_ROW_BYTES` each.
/// Results hold `SLOTS_PER_UNIT` records of `RECORD_BYTES`: `SEQ_LEN` output
/// rows of `OUT_ROW_BYTES`, then the 64-bit cycle count.
pub fn mha_layout<G: MhaGeometry>() -> BulkLayout {
    let rows = G::SLOTS_PER_UNIT * G::SEQ_LEN;
    let mut layout = BulkLayout::new();
    layout
        .add_symbol(DPU_Q, rows * G::IN_ROW_BYTES)
        .add_symbol(DPU_K, rows * G::IN_ROW_BYTES)
        .add_symbol(DPU_V, rows * G::IN_ROW_BYTES)
        .add_symbol(DPU_EXP_LUT, LUT_SIZE)
        .add_symbol(DPU_RESULTS, G::SLOTS_PER_UNIT * G::RECORD_BYTES)
        .add_symbol(DPU_NSLOTS64, 8)
        .add_symbol(DPU_SLOT0_64, 8);
    layout
}

/// Symbol addresses resolved once by the host, so lanes never look names up
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MhaSymbols {
    pub q: Region,
    pub k: Region,
    pub v: Region,
    pub lut: Region,
    pub results: Region,
    pub nslots: Region,
    pub slot0: Region,
}

impl MhaSymbols {
    pub fn resolve(bulk: &BulkMemory) -> PimResult<Self> {
        Ok(Self {
            q: bulk.symbol(DPU_Q)?,
            k: bulk.symbol(DPU_K)?,
            v: bulk.symbol(DPU_V)?,
            lut: bulk.symbol(DPU_EXP_LUT)?,
            results: bulk.symbol(DPU_RESULTS)?,
            nslots: bulk.symbol(DPU_NSLOTS64)?,
            slot0: bulk.symbol(DPU_SLOT0_64)?,
        })
    }
}
