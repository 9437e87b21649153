//! Lane identity and synchronization helpers

use crate::kernel::unit::UnitContext;
use crate::memory::{BulkMemory, HandoffBuffer, MhaSymbols, ScratchArena};
use crate::profiling::PerfCounter;

/// Lane that performs shared fetches and per-unit bookkeeping
pub const DESIGNATED_LANE: usize = 0;

/// One SPMD lane of a unit
pub struct Lane<'a> {
    pub id: usize,
    unit: &'a UnitContext<'a>,
}

impl<'a> Lane<'a> {
    pub(crate) fn new(id: usize, unit: &'a UnitContext<'a>) -> Self {
        Self { id, unit }
    }

    pub fn is_designated(&self) -> bool {
        self.id == DESIGNATED_LANE
    }

    pub fn unit(&self) -> usize {
        self.unit.unit
    }

    pub fn bulk(&self) -> &'a BulkMemory {
        self.unit.bulk
    }

    pub fn symbols(&self) -> &'a MhaSymbols {
        &self.unit.symbols
    }

    pub fn scratch(&self) -> &'a ScratchArena {
        self.unit.scratch
    }

    pub fn perf(&self) -> &'a PerfCounter {
        self.unit.perf
    }

    /// Wait until every lane of the unit arrives
    pub fn rendezvous(&self) {
        self.unit.barrier.wait();
    }

    /// Hand `buf` from the designated lane to every lane
    ///
    /// The designated lane runs `fill`; after a rendezvous all lanes run
    /// `read`; a second rendezvous keeps the next `fill` of the same buffer
    /// from overwriting data a slow lane is still reading.
    pub fn exchange<T, R>(
        &self,
        buf: &HandoffBuffer<T>,
        fill: impl FnOnce(&mut T),
        read: impl FnOnce(&T) -> R,
    ) -> R {
        if self.is_designated() {
            buf.fill(fill);
        }
        self.rendezvous();
        let out = buf.read(read);
        self.rendezvous();
        out
    }

    /// Write a cycle count into the record of unit-local slot `slot`
    pub fn write_cycles(&self, slot: usize, record_bytes: usize, cycles_at: usize, cycles: u64) {
        let addr = self.symbols().results.at(slot * record_bytes + cycles_at);
        self.bulk().dma_write(addr, &cycles.to_le_bytes());
    }
}
