//! Host-side reference pipelines
//!
//! Two recomputations of every slot on unpadded host tensors, without tiling
//! or scratch limits:
//! - [`integer_attention`]: the same fixed-point pipeline as the kernel
//!   (unscaled scores, LUT softmax, undivided weighted sum); kernel output
//!   must match it exactly
//! - [`float_attention`]: exact softmax of `score / 32` in `f64` over the
//!   dequantized V; measures how far the LUT softmax strays from the exact
//!   one, so disagreement is reported rather than failed
//!
//! [`compare`] holds the comparison used by tests and the CLI.

pub mod compare;

pub use compare::{compare_slices, count_integer_mismatches, Comparison};

use crate::config::MhaGeometry;
use crate::inputs::MhaInputs;
use crate::quant::{lut_index, LUT_EXP_SCALE, PROB_SCALE};
use rayon::prelude::*;

/// Full `seq_len x seq_len` score matrix of one slot
pub fn score_matrix(q: &[i8], k: &[i8], seq_len: usize, head_dim: usize) -> Vec<i32> {
    let mut scores = vec![0i32; seq_len * seq_len];
    for i in 0..seq_len {
        for j in 0..seq_len {
            let mut acc = 0i32;
            for d in 0..head_dim {
                acc += q[i * head_dim + d] as i32 * k[j * head_dim + d] as i32;
            }
            scores[i * seq_len + j] = acc;
        }
    }
    scores
}

/// Fixed-point attention of one slot; `SEQ_LEN * HEAD_DIM` accumulators
pub fn integer_attention(
    q: &[i8],
    k: &[i8],
    v: &[i8],
    seq_len: usize,
    head_dim: usize,
    lut: &[u8],
) -> Vec<i32> {
    let scores = score_matrix(q, k, seq_len, head_dim);
    let mut out = vec![0i32; seq_len * head_dim];

    for (i, row) in scores.chunks_exact(seq_len).enumerate() {
        let row_max = row.iter().copied().max().unwrap_or(0);
        let e: Vec<u32> = row
            .iter()
            .map(|&s| lut[lut_index(s, row_max)] as u32)
            .collect();
        let sum = e.iter().sum::<u32>().max(1);

        for (j, &ej) in e.iter().enumerate() {
            let p = (ej * PROB_SCALE as u32 / sum) as i32;
            for d in 0..head_dim {
                out[i * head_dim + d] += p * v[j * head_dim + d] as i32;
            }
        }
    }
    out
}

/// Real-valued attention of one slot with an exact softmax
///
/// Scores are the same unscaled integer dot products the kernel computes;
/// the softmax temperature is the LUT's exponent scale.
pub fn float_attention(
    q: &[i8],
    k: &[i8],
    v: &[i8],
    seq_len: usize,
    head_dim: usize,
    v_scale: i32,
) -> Vec<f32> {
    let scores = score_matrix(q, k, seq_len, head_dim);
    let mut out = vec![0f32; seq_len * head_dim];

    for (i, row) in scores.chunks_exact(seq_len).enumerate() {
        let row_max = row.iter().copied().max().unwrap_or(0) as f64;
        let e: Vec<f64> = row
            .iter()
            .map(|&s| ((s as f64 - row_max) / LUT_EXP_SCALE).exp())
            .collect();
        let sum: f64 = e.iter().sum();

        for d in 0..head_dim {
            let acc: f64 = e
                .iter()
                .enumerate()
                .map(|(j, &ej)| ej / sum * v[j * head_dim + d] as f64 / v_scale as f64)
                .sum();
            out[i * head_dim + d] = acc as f32;
        }
    }
    out
}

/// Integer reference of every slot
pub fn integer_reference<G: MhaGeometry>(inputs: &MhaInputs, lut: &[u8]) -> Vec<Vec<i32>> {
    (0..inputs.num_slots())
        .into_par_iter()
        .map(|s| {
            integer_attention(
                inputs.q_slot(s),
                inputs.k_slot(s),
                inputs.v_slot(s),
                G::SEQ_LEN,
                G::HEAD_DIM,
                lut,
            )
        })
        .collect()
}

/// Float reference of every slot
pub fn float_reference<G: MhaGeometry>(inputs: &MhaInputs) -> Vec<Vec<f32>> {
    (0..inputs.num_slots())
        .into_par_iter()
        .map(|s| {
            float_attention(
                inputs.q_slot(s),
                inputs.k_slot(s),
                inputs.v_slot(s),
                G::SEQ_LEN,
                G::HEAD_DIM,
                G::V_SCALE,
            )
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::quant::{build_exp_lut, dequantize};

    #[test]
    fn test_integer_attention_one_hot() {
        // row 0 attends to key 1 only (score gap far beyond the LUT range)
        let q = [10i8, 0, 0, 10];
        let k = [0i8, 10, 10, 0];
        let v = [1i8, 2, 3, 4];
        let lut = build_exp_lut();
        let out = integer_attention(&q, &k, &v, 2, 2, &lut);
        // scores row 0: [0, 100] -> p = [0, 255]; row 1: [100, 0] -> [255, 0]
        assert_eq!(out, vec![255 * 3, 255 * 4, 255, 255 * 2]);
    }

    #[test]
    fn test_integer_attention_uniform() {
        let q = [0i8; 4];
        let k = [5i8; 4];
        let v = [10i8, -10, 20, 30];
        let lut = build_exp_lut();
        let out = integer_attention(&q, &k, &v, 2, 2, &lut);
        // equal scores: p = 127 each
        assert_eq!(out[..2], [127 * 30, 127 * 20]);
    }

    #[test]
    fn test_float_matches_integer_when_one_hot() {
        let q = [20i8, 0, 0, 20];
        let k = [0i8, 20, 20, 0];
        let v = [1i8, 2, 3, 4];
        let lut = build_exp_lut();
        let int = integer_attention(&q, &k, &v, 2, 2, &lut);
        let float = float_attention(&q, &k, &v, 2, 2, 127);
        for (a, b) in int.iter().zip(&float) {
            assert!((dequantize(*a, 255, 127) - b).abs() < 1e-6);
        }
    }

    #[test]
    fn test_float_uniform_is_mean() {
        let q = [0i8; 4];
        let k = [5i8; 4];
        let v = [10i8, -10, 20, 30];
        let out = float_attention(&q, &k, &v, 2, 2, 10);
        assert!((out[0] - 1.5).abs() < 1e-6);
        assert!((out[1] - 1.0).abs() < 1e-6);
    }
}
