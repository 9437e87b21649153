//! Numeric stages of the attention tile pipeline
//!
//! Pure functions over scratch-resident tiles. Q, K and V rows are `i8` with
//! a padded row stride; output rows are `i32` with a padded row stride.

use crate::config::MhaGeometry;
use crate::quant::{lut_index, PROB_SCALE};

/// Row geometry shared by all stages
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TileShape {
    pub seq_len: usize,
    pub head_dim: usize,
    /// Bytes between consecutive Q/K/V rows
    pub in_stride: usize,
    /// `i32` words between consecutive output rows
    pub out_stride: usize,
}

impl TileShape {
    pub const fn of<G: MhaGeometry>() -> Self {
        TileShape {
            seq_len: G::SEQ_LEN,
            head_dim: G::HEAD_DIM,
            in_stride: G::IN_ROW_BYTES,
            out_stride: G::OUT_ROW_BYTES / 4,
        }
    }
}

/// `scores[i][j] = sum_d q[i][d] * k[j][d]`, unscaled, for `rows` rows of `q`
pub fn matmul_score_tile(q: &[i8], k: &[i8], rows: usize, shape: &TileShape, scores: &mut [i32]) {
    let (n, d, stride) = (shape.seq_len, shape.head_dim, shape.in_stride);
    for i in 0..rows {
        let q_row = &q[i * stride..i * stride + d];
        let score_row = &mut scores[i * n..(i + 1) * n];
        for (j, score) in score_row.iter_mut().enumerate() {
            let k_row = &k[j * stride..j * stride + d];
            *score = q_row
                .iter()
                .zip(k_row)
                .map(|(&a, &b)| a as i32 * b as i32)
                .sum();
        }
    }
}

/// Fixed-point softmax of one score row
///
/// `p[j] = floor(LUT[clamp(s[j] - max + 128)] * 255 / sum)`, with the sum
/// floored at 1. The row sums to `255` minus at most `len - 1` from flooring.
pub fn softmax_row(scores: &[i32], lut: &[u8], probs: &mut [u8]) {
    let row_max = scores.iter().copied().max().unwrap_or(0);

    let mut sum: u32 = 0;
    for (p, &s) in probs.iter_mut().zip(scores) {
        *p = lut[lut_index(s, row_max)];
        sum += *p as u32;
    }
    let sum = sum.max(1);

    for p in probs.iter_mut() {
        *p = (*p as u32 * PROB_SCALE as u32 / sum) as u8;
    }
}

/// Row-wise softmax over a tile of `rows` score rows
pub fn softmax_tile(scores: &[i32], rows: usize, seq_len: usize, lut: &[u8], probs: &mut [u8]) {
    for i in 0..rows {
        let span = i * seq_len..(i + 1) * seq_len;
        softmax_row(&scores[span.clone()], lut, &mut probs[span]);
    }
}

/// `out[i][d] = sum_j p[i][j] * v[j][d]`, not divided by 255
///
/// Words of each output row past `head_dim` are zeroed; they are padding.
pub fn weighted_sum_tile(probs: &[u8], v: &[i8], rows: usize, shape: &TileShape, out: &mut [i32]) {
    let (n, d) = (shape.seq_len, shape.head_dim);
    for i in 0..rows {
        let p_row = &probs[i * n..(i + 1) * n];
        let out_row = &mut out[i * shape.out_stride..(i + 1) * shape.out_stride];
        out_row.fill(0);
        for (j, &p) in p_row.iter().enumerate() {
            if p == 0 {
                continue;
            }
            let v_row = &v[j * shape.in_stride..j * shape.in_stride + d];
            for (acc, &x) in out_row[..d].iter_mut().zip(v_row) {
                *acc += p as i32 * x as i32;
            }
        }
    }
}
