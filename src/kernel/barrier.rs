//! Full-rendezvous barrier for the lanes of one unit
//!
//! Unlike `std::sync::Barrier` this one can be poisoned: when a lane panics,
//! the lanes already waiting (and any that arrive later) panic too instead of
//! stalling forever, so the unit fails as a whole.

use std::sync::{Condvar, Mutex, PoisonError};

#[derive(Debug)]
struct BarrierState {
    arrived: usize,
    generation: u64,
    /// First lane that faulted
    fault: Option<usize>,
}

/// Barrier over a fixed number of lanes
#[derive(Debug)]
pub struct LaneBarrier {
    lanes: usize,
    state: Mutex<BarrierState>,
    cvar: Condvar,
}

impl LaneBarrier {
    pub fn new(lanes: usize) -> Self {
        Self {
            lanes,
            state: Mutex::new(BarrierState {
                arrived: 0,
                generation: 0,
                fault: None,
            }),
            cvar: Condvar::new(),
        }
    }

    /// Block until all lanes have arrived
    ///
    /// # Panics
    /// If the barrier is, or becomes, poisoned while waiting.
    pub fn wait(&self) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(lane) = state.fault {
            panic!("barrier poisoned by lane {lane}");
        }

        let generation = state.generation;
        state.arrived += 1;
        if state.arrived == self.lanes {
            state.arrived = 0;
            state.generation += 1;
            self.cvar.notify_all();
            return;
        }

        while state.generation == generation && state.fault.is_none() {
            state = self.cvar.wait(state).unwrap_or_else(PoisonError::into_inner);
        }
        if state.generation == generation {
            let lane = state.fault.unwrap_or_default();
            panic!("barrier poisoned by lane {lane}");
        }
    }

    /// Mark the barrier broken by `lane` and wake every waiter
    pub fn poison(&self, lane: usize) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        state.fault.get_or_insert(lane);
        self.cvar.notify_all();
    }

    /// Lane that poisoned the barrier first, if any
    pub fn fault(&self) -> Option<usize> {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .fault
    }

    pub fn lanes(&self) -> usize {
        self.lanes
    }
}

/// Poisons the barrier if dropped while its lane is unwinding
pub struct PoisonOnPanic<'a> {
    barrier: &'a LaneBarrier,
    lane: usize,
}

impl<'a> PoisonOnPanic<'a> {
    pub fn new(barrier: &'a LaneBarrier, lane: usize) -> Self {
        Self { barrier, lane }
    }
}

impl Drop for PoisonOnPanic<'_> {
    fn drop(&mut self) {
        if std::thread::panicking() {
            self.barrier.poison(self.lane);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_barrier_orders_phases() {
        let barrier = LaneBarrier::new(4);
        let counter = AtomicUsize::new(0);
        std::thread::scope(|s| {
            for _ in 0..4 {
                s.spawn(|| {
                    for round in 1..=3 {
                        counter.fetch_add(1, Ordering::SeqCst);
                        barrier.wait();
                        assert!(counter.load(Ordering::SeqCst) >= round * 4);
                        barrier.wait();
                    }
                });
            }
        });
        assert_eq!(counter.load(Ordering::SeqCst), 12);
    }

    #[test]
    fn test_single_lane_never_blocks() {
        let barrier = LaneBarrier::new(1);
        barrier.wait();
        barrier.wait();
        assert!(barrier.fault().is_none());
    }

    #[test]
    fn test_panicking_lane_releases_waiters() {
        let barrier = LaneBarrier::new(3);
        let results: Vec<bool> = std::thread::scope(|s| {
            let handles: Vec<_> = (0..3)
                .map(|lane| {
                    let barrier = &barrier;
                    s.spawn(move || {
                        let _guard = PoisonOnPanic::new(barrier, lane);
                        if lane == 2 {
                            panic!("lane 2 fault");
                        }
                        barrier.wait();
                    })
                })
                .collect();
            handles.into_iter().map(|h| h.join().is_ok()).collect()
        });

        assert_eq!(results, vec![false, false, false]);
        assert_eq!(barrier.fault(), Some(2));
    }
}
