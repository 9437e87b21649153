//! Bulk memory (MRAM model)
//!
//! One byte buffer per unit, carved into named symbols by a [`BulkLayout`].
//! The host reaches it by symbol name and gets a [`PimResult`] back; lanes
//! reach it through [`BulkMemory::dma_read`] / [`BulkMemory::dma_write`] with
//! absolute addresses resolved before launch. Lane transfers treat a bad
//! address as a broken contract and panic, which aborts the unit.
//!
//! Every transfer moves whole 8-byte aligned blocks. Lane transfers longer than
//! [`MAX_DMA_BYTES`] are issued as several chunks.

use crate::config::{DMA_ALIGNMENT, MAX_DMA_BYTES};
use crate::error::{PimError, PimResult};
use crate::memory::calculator::{BulkLayout, SymbolSpec};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{PoisonError, RwLock};

/// Resolved location of a symbol
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Region {
    pub offset: usize,
    pub size: usize,
}

impl Region {
    /// Absolute address of `offset` bytes into the region
    #[inline]
    pub fn at(&self, offset: usize) -> usize {
        debug_assert!(offset <= self.size);
        self.offset + offset
    }

    pub fn end(&self) -> usize {
        self.offset + self.size
    }
}

/// Transfer counters of one unit
#[derive(Debug, Default)]
struct TransferCounters {
    host_writes: AtomicU64,
    host_write_bytes: AtomicU64,
    host_reads: AtomicU64,
    host_read_bytes: AtomicU64,
    dma_reads: AtomicU64,
    dma_read_bytes: AtomicU64,
    dma_writes: AtomicU64,
    dma_write_bytes: AtomicU64,
}

/// Snapshot of transfer counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
pub struct TransferStats {
    pub host_writes: u64,
    pub host_write_bytes: u64,
    pub host_reads: u64,
    pub host_read_bytes: u64,
    /// Lane read chunks (at most `MAX_DMA_BYTES` each)
    pub dma_reads: u64,
    pub dma_read_bytes: u64,
    /// Lane write chunks (at most `MAX_DMA_BYTES` each)
    pub dma_writes: u64,
    pub dma_write_bytes: u64,
}

impl TransferStats {
    /// Element-wise sum, for aggregating over units
    pub fn merge(&self, other: &TransferStats) -> TransferStats {
        TransferStats {
            host_writes: self.host_writes + other.host_writes,
            host_write_bytes: self.host_write_bytes + other.host_write_bytes,
            host_reads: self.host_reads + other.host_reads,
            host_read_bytes: self.host_read_bytes + other.host_read_bytes,
            dma_reads: self.dma_reads + other.dma_reads,
            dma_read_bytes: self.dma_read_bytes + other.dma_read_bytes,
            dma_writes: self.dma_writes + other.dma_writes,
            dma_write_bytes: self.dma_write_bytes + other.dma_write_bytes,
        }
    }
}

/// Bulk memory of one unit
#[derive(Debug)]
pub struct BulkMemory {
    data: RwLock<Vec<u8>>,
    symbols: Vec<SymbolSpec>,
    counters: TransferCounters,
}

impl BulkMemory {
    /// Allocate a zeroed buffer for `layout`
    ///
    /// # Errors
    /// - [`PimError::BulkExhausted`] if the layout is larger than `capacity`
    pub fn new(layout: &BulkLayout, capacity: usize) -> PimResult<Self> {
        let total = layout.total_bytes();
        if total > capacity {
            return Err(PimError::BulkExhausted {
                requested: total,
                capacity,
            });
        }

        tracing::trace!(
            "Bulk memory laid out: {} symbols, {} bytes",
            layout.symbol_count(),
            total
        );

        Ok(Self {
            data: RwLock::new(vec![0u8; total]),
            symbols: layout.symbols().to_vec(),
            counters: TransferCounters::default(),
        })
    }

    /// Bytes backing all symbols
    pub fn size(&self) -> usize {
        self.symbols.last().map(|s| s.offset + s.size).unwrap_or(0)
    }

    /// Resolve a symbol name
    pub fn symbol(&self, name: &str) -> PimResult<Region> {
        self.symbols
            .iter()
            .find(|s| s.name == name)
            .map(|s| Region {
                offset: s.offset,
                size: s.size,
            })
            .ok_or_else(|| PimError::UnknownSymbol(name.to_string()))
    }

    /// Host write of `bytes` at `offset` into `symbol`
    pub fn copy_to(&self, symbol: &str, offset: usize, bytes: &[u8]) -> PimResult<()> {
        let region = self.checked_range(symbol, offset, bytes.len())?;
        let mut data = self.data.write()?;
        data[region.offset..region.offset + bytes.len()].copy_from_slice(bytes);

        self.counters.host_writes.fetch_add(1, Ordering::Relaxed);
        self.counters
            .host_write_bytes
            .fetch_add(bytes.len() as u64, Ordering::Relaxed);
        Ok(())
    }

    /// Host read of `out.len()` bytes at `offset` from `symbol`
    pub fn copy_from(&self, symbol: &str, offset: usize, out: &mut [u8]) -> PimResult<()> {
        let region = self.checked_range(symbol, offset, out.len())?;
        let data = self.data.read()?;
        out.copy_from_slice(&data[region.offset..region.offset + out.len()]);

        self.counters.host_reads.fetch_add(1, Ordering::Relaxed);
        self.counters
            .host_read_bytes
            .fetch_add(out.len() as u64, Ordering::Relaxed);
        Ok(())
    }

    /// Lane read of `dst.len()` bytes starting at absolute address `addr`
    ///
    /// # Panics
    /// On a misaligned or out-of-range transfer.
    pub fn dma_read(&self, addr: usize, dst: &mut [u8]) {
        self.assert_lane_transfer(addr, dst.len());
        let data = self.data.read().unwrap_or_else(PoisonError::into_inner);
        for (i, chunk) in dst.chunks_mut(MAX_DMA_BYTES).enumerate() {
            let start = addr + i * MAX_DMA_BYTES;
            chunk.copy_from_slice(&data[start..start + chunk.len()]);
            self.counters.dma_reads.fetch_add(1, Ordering::Relaxed);
        }
        self.counters
            .dma_read_bytes
            .fetch_add(dst.len() as u64, Ordering::Relaxed);
    }

    /// Lane write of `src` starting at absolute address `addr`
    ///
    /// # Panics
    /// On a misaligned or out-of-range transfer.
    pub fn dma_write(&self, addr: usize, src: &[u8]) {
        self.assert_lane_transfer(addr, src.len());
        let mut data = self.data.write().unwrap_or_else(PoisonError::into_inner);
        for (i, chunk) in src.chunks(MAX_DMA_BYTES).enumerate() {
            let start = addr + i * MAX_DMA_BYTES;
            data[start..start + chunk.len()].copy_from_slice(chunk);
            self.counters.dma_writes.fetch_add(1, Ordering::Relaxed);
        }
        self.counters
            .dma_write_bytes
            .fetch_add(src.len() as u64, Ordering::Relaxed);
    }

    /// Current transfer counters
    pub fn stats(&self) -> TransferStats {
        let c = &self.counters;
        TransferStats {
            host_writes: c.host_writes.load(Ordering::Relaxed),
            host_write_bytes: c.host_write_bytes.load(Ordering::Relaxed),
            host_reads: c.host_reads.load(Ordering::Relaxed),
            host_read_bytes: c.host_read_bytes.load(Ordering::Relaxed),
            dma_reads: c.dma_reads.load(Ordering::Relaxed),
            dma_read_bytes: c.dma_read_bytes.load(Ordering::Relaxed),
            dma_writes: c.dma_writes.load(Ordering::Relaxed),
            dma_write_bytes: c.dma_write_bytes.load(Ordering::Relaxed),
        }
    }

    fn checked_range(&self, symbol: &str, offset: usize, len: usize) -> PimResult<Region> {
        let region = self.symbol(symbol)?;
        if offset % DMA_ALIGNMENT != 0 || len % DMA_ALIGNMENT != 0 {
            return Err(PimError::MisalignedTransfer {
                offset,
                len,
                alignment: DMA_ALIGNMENT,
            });
        }
        if offset + len > region.size {
            return Err(PimError::TransferOutOfBounds {
                symbol: symbol.to_string(),
                offset,
                len,
                size: region.size,
            });
        }
        Ok(Region {
            offset: region.offset + offset,
            size: len,
        })
    }

    fn assert_lane_transfer(&self, addr: usize, len: usize) {
        assert!(
            addr % DMA_ALIGNMENT == 0 && len % DMA_ALIGNMENT == 0,
            "misaligned lane transfer: addr {addr}, len {len}"
        );
        assert!(
            addr + len <= self.size(),
            "lane transfer past end of bulk memory: {addr} + {len} > {}",
            self.size()
        );
    }
}
