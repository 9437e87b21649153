//! Scratch buffers filled from bulk memory once and then only read
//!
//! [`SharedTables`] (LUT and the per-unit scalars) is fetched once per launch
//! by the designated lane. [`KvTiles`] holds one slot's K and V; it is shared
//! under the row-parallel schedule and private to each lane under the
//! head-parallel one.

use crate::config::MhaGeometry;
use crate::memory::{BulkMemory, MhaSymbols, ScratchArena, ScratchBuf};
use crate::quant::LUT_SIZE;

/// Exponential LUT plus the `nslots` / `slot0` scalars
#[derive(Debug)]
pub struct SharedTables {
    pub lut: ScratchBuf<u8>,
    scalars: ScratchBuf<u64>,
}

impl SharedTables {
    pub fn alloc(scratch: &ScratchArena) -> Self {
        Self {
            lut: scratch.alloc(LUT_SIZE),
            scalars: scratch.alloc(2),
        }
    }

    pub fn fetch(&mut self, bulk: &BulkMemory, symbols: &MhaSymbols) {
        bulk.dma_read(symbols.lut.offset, self.lut.as_bytes_mut());
        bulk.dma_read(symbols.nslots.offset, &mut self.scalars.as_bytes_mut()[..8]);
        bulk.dma_read(symbols.slot0.offset, &mut self.scalars.as_bytes_mut()[8..]);
    }

    /// Slots assigned to this unit
    pub fn nslots(&self) -> usize {
        u64::from_le(self.scalars[0]) as usize
    }

    /// Global index of the unit's first slot
    pub fn slot0(&self) -> usize {
        u64::from_le(self.scalars[1]) as usize
    }
}

/// K and V of one slot, padded rows as in bulk memory
#[derive(Debug)]
pub struct KvTiles {
    pub k: ScratchBuf<i8>,
    pub v: ScratchBuf<i8>,
}

impl KvTiles {
    pub fn alloc<G: MhaGeometry>(scratch: &ScratchArena) -> Self {
        let len = G::SEQ_LEN * G::IN_ROW_BYTES;
        Self {
            k: scratch.alloc(len),
            v: scratch.alloc(len),
        }
    }

    /// Whole-matrix fetch of unit-local slot `slot`
    pub fn fetch<G: MhaGeometry>(&mut self, bulk: &BulkMemory, symbols: &MhaSymbols, slot: usize) {
        let offset = slot * G::SEQ_LEN * G::IN_ROW_BYTES;
        bulk.dma_read(symbols.k.at(offset), self.k.as_bytes_mut());
        bulk.dma_read(symbols.v.at(offset), self.v.as_bytes_mut());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TilingGeometry;
    use crate::memory::layout::{mha_layout, DPU_EXP_LUT, DPU_K, DPU_NSLOTS64, DPU_SLOT0_64};

    #[test]
    fn test_fetch_tables_and_kv() {
        let bulk = BulkMemory::new(&mha_layout::<TilingGeometry>(), 1 << 20).unwrap();
        let symbols = MhaSymbols::resolve(&bulk).unwrap();
        bulk.copy_to(DPU_EXP_LUT, 0, &[9u8; 256]).unwrap();
        bulk.copy_to(DPU_NSLOTS64, 0, &5u64.to_le_bytes()).unwrap();
        bulk.copy_to(DPU_SLOT0_64, 0, &80u64.to_le_bytes()).unwrap();
        // slot 1's K starts one matrix in
        bulk.copy_to(DPU_K, 32 * 8, &[3u8; 8]).unwrap();

        let scratch = ScratchArena::new(64 * 1024);
        let mut tables = SharedTables::alloc(&scratch);
        tables.fetch(&bulk, &symbols);
        assert!(tables.lut.iter().all(|&e| e == 9));
        assert_eq!(tables.nslots(), 5);
        assert_eq!(tables.slot0(), 80);

        let mut kv = KvTiles::alloc::<TilingGeometry>(&scratch);
        kv.fetch::<TilingGeometry>(&bulk, &symbols, 1);
        assert_eq!(&kv.k[..8], &[3i8; 8]);
        assert!(kv.k[8..].iter().all(|&x| x == 0));
        assert_eq!(scratch.used(), 256 + 16 + 2 * 256);
    }
}
