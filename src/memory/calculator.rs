//! Static memory footprints
//!
//! Two things are sized here before anything is allocated:
//! - the bulk-memory layout of one unit ([`BulkLayout`]), a list of named,
//!   8-byte aligned symbols laid out back to back
//! - the scratch footprint of one launch, as `const fn`s so geometry
//!   validation can reject an oversized configuration at build time

use crate::config::align8;
use crate::quant::LUT_SIZE;

/// Bytes of the two shared 64-bit scalars (`nslots`, `slot0`)
pub const SCALAR_BYTES: usize = 16;

/// Scratch bytes of one lane's private tile buffers
///
/// Q tile (padded `i8` rows), score tile (`i32`), probability tile (`u8`) and
/// output tile (padded `i32` rows), each rounded to the transfer alignment.
pub const fn lane_tile_bytes(seq_len: usize, head_dim: usize, tile_rows: usize) -> usize {
    align8(tile_rows * align8(head_dim))
        + align8(tile_rows * seq_len * 4)
        + align8(tile_rows * seq_len)
        + align8(tile_rows * align8(head_dim * 4))
}

/// Scratch bytes of one slot's K and V matrices (padded `i8` rows)
pub const fn kv_bytes(seq_len: usize, head_dim: usize) -> usize {
    2 * align8(seq_len * align8(head_dim))
}

/// Head-parallel: LUT and scalars shared, K/V and tiles private to each lane
pub const fn head_parallel_footprint(
    seq_len: usize,
    head_dim: usize,
    tile_rows: usize,
    nr_lanes: usize,
) -> usize {
    LUT_SIZE
        + SCALAR_BYTES
        + nr_lanes * (kv_bytes(seq_len, head_dim) + lane_tile_bytes(seq_len, head_dim, tile_rows))
}

/// Row-parallel: LUT, scalars and K/V shared, tiles private to each lane
pub const fn row_parallel_footprint(
    seq_len: usize,
    head_dim: usize,
    tile_rows: usize,
    nr_lanes: usize,
) -> usize {
    LUT_SIZE
        + SCALAR_BYTES
        + kv_bytes(seq_len, head_dim)
        + nr_lanes * lane_tile_bytes(seq_len, head_dim, tile_rows)
}

/// One named region of a [`BulkLayout`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SymbolSpec {
    pub name: &'static str,
    pub offset: usize,
    pub size: usize,
}

/// Bulk-memory layout of one unit
///
/// # Example
/// ```ignore
/// let mut layout = BulkLayout::new();
/// layout.add_symbol("DPU_EXP_LUT", 256);
/// layout.add_symbol("DPU_NSLOTS64", 8);
/// assert_eq!(layout.total_bytes(), 264);
/// ```
#[derive(Debug, Clone, Default)]
pub struct BulkLayout {
    symbols: Vec<SymbolSpec>,
    end: usize,
}

impl BulkLayout {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a symbol; its size is rounded up to the transfer alignment
    pub fn add_symbol(&mut self, name: &'static str, bytes: usize) -> &mut Self {
        let size = align8(bytes);
        self.symbols.push(SymbolSpec {
            name,
            offset: self.end,
            size,
        });
        self.end += size;
        self
    }

    /// Bytes covered by all symbols
    pub fn total_bytes(&self) -> usize {
        self.end
    }

    pub fn symbol_count(&self) -> usize {
        self.symbols.len()
    }

    pub fn symbols(&self) -> &[SymbolSpec] {
        &self.symbols
    }

    pub fn get(&self, name: &str) -> Option<&SymbolSpec> {
        self.symbols.iter().find(|s| s.name == name)
    }
}
