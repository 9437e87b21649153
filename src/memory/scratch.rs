//! Scratch memory (WRAM model)
//!
//! A per-unit byte budget. Lanes carve fixed-length, zeroed buffers out of it
//! once per launch and keep them for the whole launch; nothing grows. The
//! launcher resets the arena before any lane starts.

use crate::config::align8;
use crate::error::{PimError, PimResult};
use bytemuck::Pod;
use std::ops::{Deref, DerefMut};
use std::sync::atomic::{AtomicUsize, Ordering};

/// Scratch budget of one unit
#[derive(Debug)]
pub struct ScratchArena {
    capacity: usize,
    used: AtomicUsize,
    peak: AtomicUsize,
}

impl ScratchArena {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            used: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
        }
    }

    /// Forget every allocation of the previous launch
    pub fn reset(&self) {
        self.used.store(0, Ordering::SeqCst);
    }

    /// Reserve a zeroed buffer of `len` elements
    ///
    /// # Errors
    /// - [`PimError::ScratchExhausted`] if the aligned size does not fit
    pub fn try_alloc<T: Pod>(&self, len: usize) -> PimResult<ScratchBuf<T>> {
        let bytes = align8(len * std::mem::size_of::<T>());
        let reserved = self
            .used
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |used| {
                (used + bytes <= self.capacity).then_some(used + bytes)
            })
            .map_err(|used| PimError::ScratchExhausted {
                requested: bytes,
                available: self.capacity - used,
            })?;
        self.peak.fetch_max(reserved + bytes, Ordering::SeqCst);

        Ok(ScratchBuf {
            data: vec![<T as bytemuck::Zeroable>::zeroed(); len].into_boxed_slice(),
        })
    }

    /// Reserve a zeroed buffer from lane code
    ///
    /// # Panics
    /// If the arena is exhausted; geometry validation rules this out for
    /// every buffer the kernel allocates.
    pub fn alloc<T: Pod>(&self, len: usize) -> ScratchBuf<T> {
        match self.try_alloc(len) {
            Ok(buf) => buf,
            Err(e) => panic!("{e}"),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn used(&self) -> usize {
        self.used.load(Ordering::SeqCst)
    }

    /// Highest `used` value seen since creation
    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }
}

/// Fixed-length scratch buffer
#[derive(Debug)]
pub struct ScratchBuf<T: Pod> {
    data: Box<[T]>,
}

impl<T: Pod> ScratchBuf<T> {
    /// Byte view for an outgoing block transfer
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.data)
    }

    /// Byte view for an incoming block transfer
    pub fn as_bytes_mut(&mut self) -> &mut [u8] {
        bytemuck::cast_slice_mut(&mut self.data)
    }
}

impl<T: Pod> Deref for ScratchBuf<T> {
    type Target = [T];

    fn deref(&self) -> &[T] {
        &self.data
    }
}

impl<T: Pod> DerefMut for ScratchBuf<T> {
    fn deref_mut(&mut self) -> &mut [T] {
        &mut self.data
    }
}
