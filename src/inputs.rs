//! Deterministic input generation
//!
//! Inputs are uniform in `[-1, 1)` drawn from `ChaCha8Rng` seeded with
//! `42 + offset`, then quantized with the geometry's scales. Host tensors are
//! unpadded: slot `s` occupies elements `s * SEQ_LEN * HEAD_DIM ..` of each
//! of Q, K and V.

use crate::config::MhaGeometry;
use crate::error::{PimError, PimResult};
use crate::quant::{quantize, quantize_slice};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Base seed every offset is added to
pub const BASE_SEED: u64 = 42;

/// Seeded generator of uniform `[-1, 1)` values
pub struct InputGenerator {
    rng: ChaCha8Rng,
}

impl InputGenerator {
    pub fn uniform(seed_offset: u64) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(BASE_SEED + seed_offset),
        }
    }

    pub fn next_value(&mut self) -> f32 {
        self.rng.gen::<f32>() * 2.0 - 1.0
    }

    pub fn floats(&mut self, len: usize) -> Vec<f32> {
        (0..len).map(|_| self.next_value()).collect()
    }

    pub fn quantized(&mut self, len: usize, scale: i32) -> Vec<i8> {
        (0..len).map(|_| quantize(self.next_value(), scale)).collect()
    }
}

/// Seed offsets of one slot's Q, K and V
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlotSeeds {
    pub q: u64,
    pub k: u64,
    pub v: u64,
}

impl SlotSeeds {
    /// Multi-slot convention: Q `1 + slot`, K `100 + slot`, V `200 + slot`
    pub fn per_slot(slot: usize) -> Self {
        let slot = slot as u64;
        SlotSeeds {
            q: 1 + slot,
            k: 100 + slot,
            v: 200 + slot,
        }
    }

    /// Single-head scenario: seeds 43, 44 and 45
    pub fn scenario() -> Self {
        SlotSeeds { q: 1, k: 2, v: 3 }
    }
}

/// Quantized Q, K and V of every slot
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MhaInputs {
    pub q: Vec<i8>,
    pub k: Vec<i8>,
    pub v: Vec<i8>,
    slot_elems: usize,
}

impl MhaInputs {
    /// Generate all slots with seeds chosen by `seeds`
    pub fn from_seeds<G: MhaGeometry>(seeds: impl Fn(usize) -> SlotSeeds) -> Self {
        let n = G::SLOT_ELEMS;
        let mut inputs = MhaInputs {
            q: Vec::with_capacity(G::TOTAL_SLOTS * n),
            k: Vec::with_capacity(G::TOTAL_SLOTS * n),
            v: Vec::with_capacity(G::TOTAL_SLOTS * n),
            slot_elems: n,
        };
        for slot in 0..G::TOTAL_SLOTS {
            let s = seeds(slot);
            inputs
                .q
                .extend(InputGenerator::uniform(s.q).quantized(n, G::QK_SCALE));
            inputs
                .k
                .extend(InputGenerator::uniform(s.k).quantized(n, G::QK_SCALE));
            inputs
                .v
                .extend(InputGenerator::uniform(s.v).quantized(n, G::V_SCALE));
        }
        inputs
    }

    /// Per-slot seeds (`SlotSeeds::per_slot`)
    pub fn generate<G: MhaGeometry>() -> Self {
        Self::from_seeds::<G>(SlotSeeds::per_slot)
    }

    /// Every slot seeded like the single-head scenario
    pub fn scenario<G: MhaGeometry>() -> Self {
        Self::from_seeds::<G>(|_| SlotSeeds::scenario())
    }

    /// Quantize caller-provided float tensors
    ///
    /// # Errors
    /// - [`PimError::InputShapeMismatch`] unless every tensor holds
    ///   `TOTAL_SLOTS * SEQ_LEN * HEAD_DIM` values
    pub fn from_float<G: MhaGeometry>(q: &[f32], k: &[f32], v: &[f32]) -> PimResult<Self> {
        let expected = G::TOTAL_SLOTS * G::SLOT_ELEMS;
        for (name, t) in [("Q", q), ("K", k), ("V", v)] {
            if t.len() != expected {
                return Err(PimError::InputShapeMismatch(format!(
                    "{} has {} elements, expected {}",
                    name,
                    t.len(),
                    expected
                )));
            }
        }
        Ok(MhaInputs {
            q: quantize_slice(q, G::QK_SCALE),
            k: quantize_slice(k, G::QK_SCALE),
            v: quantize_slice(v, G::V_SCALE),
            slot_elems: G::SLOT_ELEMS,
        })
    }

    pub fn num_slots(&self) -> usize {
        if self.slot_elems == 0 {
            0
        } else {
            self.q.len() / self.slot_elems
        }
    }

    pub fn q_slot(&self, slot: usize) -> &[i8] {
        &self.q[slot * self.slot_elems..(slot + 1) * self.slot_elems]
    }

    pub fn k_slot(&self, slot: usize) -> &[i8] {
        &self.k[slot * self.slot_elems..(slot + 1) * self.slot_elems]
    }

    pub fn v_slot(&self, slot: usize) -> &[i8] {
        &self.v[slot * self.slot_elems..(slot + 1) * self.slot_elems]
    }
}
