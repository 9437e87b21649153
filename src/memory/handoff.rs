//! Shared scratch buffers with a single writer phase
//!
//! A [`HandoffBuffer`] alternates between two phases: the designated lane
//! fills it, then every lane reads it. The phases are separated by barrier
//! rendezvous in [`Lane::exchange`](crate::kernel::Lane::exchange); the lock
//! here only makes the hand-off visible across threads and never contends.

use std::sync::{PoisonError, RwLock};

/// Scratch-resident value populated by one lane and read by all
#[derive(Debug)]
pub struct HandoffBuffer<T> {
    cell: RwLock<T>,
}

impl<T> HandoffBuffer<T> {
    pub fn new(value: T) -> Self {
        Self {
            cell: RwLock::new(value),
        }
    }

    /// Writer phase
    pub fn fill<R>(&self, f: impl FnOnce(&mut T) -> R) -> R {
        let mut guard = self.cell.write().unwrap_or_else(PoisonError::into_inner);
        f(&mut guard)
    }

    /// Reader phase
    pub fn read<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        let guard = self.cell.read().unwrap_or_else(PoisonError::into_inner);
        f(&guard)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fill_then_read() {
        let buf = HandoffBuffer::new([0u8; 4]);
        buf.fill(|b| b.copy_from_slice(&[1, 2, 3, 4]));
        let sum: u32 = buf.read(|b| b.iter().map(|&x| x as u32).sum());
        assert_eq!(sum, 10);
    }

    #[test]
    fn test_concurrent_readers() {
        let buf = HandoffBuffer::new(vec![7i32; 16]);
        std::thread::scope(|s| {
            for _ in 0..4 {
                s.spawn(|| buf.read(|v| assert!(v.iter().all(|&x| x == 7))));
            }
        });
    }
}
