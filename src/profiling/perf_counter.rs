//! Free-running cycle counter of one unit
//!
//! Cycles are derived from wall time at the configured clock. The counter is
//! diagnostic only: kernel output never depends on it, and the value lands in
//! a field of the result record that is separate from the output rows.

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

/// Cycle counter shared by every lane of a unit
#[derive(Debug)]
pub struct PerfCounter {
    base: Instant,
    /// Nanoseconds since `base` at the last reset
    origin_ns: AtomicU64,
    clock_hz: u64,
}

impl PerfCounter {
    pub fn new(clock_hz: u64) -> Self {
        Self {
            base: Instant::now(),
            origin_ns: AtomicU64::new(0),
            clock_hz,
        }
    }

    /// Restart counting from zero
    pub fn reset(&self) {
        self.origin_ns.store(self.elapsed_ns(), Ordering::SeqCst);
    }

    /// Cycles since the last reset
    pub fn now(&self) -> u64 {
        let ns = self
            .elapsed_ns()
            .saturating_sub(self.origin_ns.load(Ordering::SeqCst));
        Self::ns_to_cycles(ns, self.clock_hz)
    }

    pub fn clock_hz(&self) -> u64 {
        self.clock_hz
    }

    fn elapsed_ns(&self) -> u64 {
        u64::try_from(self.base.elapsed().as_nanos()).unwrap_or(u64::MAX)
    }

    fn ns_to_cycles(ns: u64, clock_hz: u64) -> u64 {
        (ns as u128 * clock_hz as u128 / 1_000_000_000) as u64
    }
}

/// Cycle statistics over a set of slot records
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct CycleSummary {
    pub slots: usize,
    pub total_cycles: u64,
    pub max_cycles: u64,
    pub avg_cycles: f64,
    /// `max_cycles` at the clock frequency; units run concurrently, so the
    /// slowest slot bounds the launch
    pub max_ms: f64,
}

impl CycleSummary {
    pub fn from_cycles(cycles: &[u64], clock_hz: u64) -> Self {
        if cycles.is_empty() {
            return CycleSummary::default();
        }
        let total_cycles: u64 = cycles.iter().sum();
        let max_cycles = cycles.iter().copied().max().unwrap_or(0);
        CycleSummary {
            slots: cycles.len(),
            total_cycles,
            max_cycles,
            avg_cycles: total_cycles as f64 / cycles.len() as f64,
            max_ms: max_cycles as f64 * 1e3 / clock_hz as f64,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ns_to_cycles() {
        assert_eq!(PerfCounter::ns_to_cycles(1_000_000_000, 350_000_000), 350_000_000);
        assert_eq!(PerfCounter::ns_to_cycles(1_000, 350_000_000), 350);
        assert_eq!(PerfCounter::ns_to_cycles(0, 350_000_000), 0);
    }

    #[test]
    fn test_counter_is_monotonic() {
        let counter = PerfCounter::new(350_000_000);
        let a = counter.now();
        std::thread::sleep(std::time::Duration::from_millis(2));
        let b = counter.now();
        assert!(b > a);
        assert!(b >= 350_000 * 2);
    }

    #[test]
    fn test_reset_restarts() {
        let counter = PerfCounter::new(350_000_000);
        std::thread::sleep(std::time::Duration::from_millis(5));
        counter.reset();
        assert!(counter.now() < 350_000 * 5);
    }

    #[test]
    fn test_cycle_summary() {
        let summary = CycleSummary::from_cycles(&[100, 300], 1_000);
        assert_eq!(summary.slots, 2);
        assert_eq!(summary.total_cycles, 400);
        assert_eq!(summary.max_cycles, 300);
        assert_eq!(summary.avg_cycles, 200.0);
        assert_eq!(summary.max_ms, 300.0);
        assert_eq!(CycleSummary::from_cycles(&[], 1_000), CycleSummary::default());
    }
}
