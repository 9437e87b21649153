//! Float <-> fixed-point conversion

use rayon::prelude::*;

/// Quantize one value: `round(x * scale)` clamped to the `i8` range
///
/// Rounding is half away from zero on every side of the comparison.
#[inline]
pub fn quantize(x: f32, scale: i32) -> i8 {
    (x * scale as f32).round().clamp(i8::MIN as f32, i8::MAX as f32) as i8
}

/// Quantize a tensor element-wise
pub fn quantize_slice(values: &[f32], scale: i32) -> Vec<i8> {
    values.par_iter().map(|&x| quantize(x, scale)).collect()
}

/// Recover a real value from an `i32` accumulator built from two fixed-point factors
///
/// Kernel outputs are `sum_j p[j] * v[j][d]` with `p` scaled by
/// [`PROB_SCALE`](super::PROB_SCALE) and `v` by `V_SCALE`; pass those two here.
#[inline]
pub fn dequantize(acc: i32, scale_q: i32, scale_v: i32) -> f32 {
    acc as f32 / (scale_q as f32 * scale_v as f32)
}

/// Dequantize a whole output matrix
pub fn dequantize_output(acc: &[i32], scale_q: i32, scale_v: i32) -> Vec<f32> {
    acc.iter().map(|&a| dequantize(a, scale_q, scale_v)).collect()
}
