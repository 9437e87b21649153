//! Work units handed out by the tile scheduler

use std::ops::Range;

/// Half-open row range `[start, end)` within one slot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RowRange {
    pub start: usize,
    pub end: usize,
}

impl RowRange {
    pub fn new(start: usize, end: usize) -> Self {
        debug_assert!(start <= end);
        RowRange { start, end }
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// Whether both ranges share at least one row; an empty range shares none
    pub fn overlaps(&self, other: &RowRange) -> bool {
        !self.is_empty() && !other.is_empty() && self.start < other.end && other.start < self.end
    }
}

/// A block of at most `TILE_ROWS` consecutive rows
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RowTile {
    pub start: usize,
    pub rows: usize,
}

impl RowTile {
    pub fn end(&self) -> usize {
        self.start + self.rows
    }
}

/// Slots assigned to one unit: `slot0 .. slot0 + nslots`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnitAssignment {
    pub unit: usize,
    pub slot0: usize,
    pub nslots: usize,
}

impl UnitAssignment {
    pub fn slots(&self) -> Range<usize> {
        self.slot0..self.slot0 + self.nslots
    }

    pub fn is_idle(&self) -> bool {
        self.nslots == 0
    }
}

/// Global slot identity
///
/// Slots are numbered head-major: `slot = head * batch_size + batch`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SlotId {
    pub head: usize,
    pub batch: usize,
}

impl SlotId {
    pub fn from_index(slot: usize, batch_size: usize) -> Self {
        SlotId {
            head: slot / batch_size,
            batch: slot % batch_size,
        }
    }

    pub fn index(&self, batch_size: usize) -> usize {
        self.head * batch_size + self.batch
    }
}

/// One lane's ownership of rows of one unit-local slot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkItem {
    pub lane: usize,
    /// Slot index local to the unit
    pub slot: usize,
    pub rows: RowRange,
}

impl WorkItem {
    /// Byte span of this item's output rows in the unit's results symbol
    pub fn output_span(&self, record_bytes: usize, out_row_bytes: usize) -> Range<usize> {
        let base = self.slot * record_bytes;
        base + self.rows.start * out_row_bytes..base + self.rows.end * out_row_bytes
    }
}
