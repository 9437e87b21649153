//! Exponential lookup table for the fixed-point softmax

use super::{LUT_BIAS, LUT_EXP_SCALE, LUT_SIZE};

/// The table as uploaded to bulk memory
pub type ExpLut = [u8; LUT_SIZE];

/// `LUT[i] = clamp(round(exp((i - 128) / 32)), 0, 255)`
///
/// Index 128 is a zero score delta and holds the table's `exp(0)` entry (1).
/// Every index the softmax can produce is at most 128, because the row
/// maximum is subtracted first.
pub fn build_exp_lut() -> ExpLut {
    let mut lut = [0u8; LUT_SIZE];
    for (i, entry) in lut.iter_mut().enumerate() {
        let x = (i as f64 - LUT_BIAS as f64) / LUT_EXP_SCALE;
        *entry = x.exp().round().clamp(0.0, 255.0) as u8;
    }
    lut
}

/// Biased, clamped table index of `score` in a row whose maximum is `row_max`
#[inline]
pub fn lut_index(score: i32, row_max: i32) -> usize {
    (score - row_max + LUT_BIAS).clamp(0, LUT_SIZE as i32 - 1) as usize
}
