//! Fixed-point softmax and codec bounds

use pim_mha::kernel::softmax_row;
use pim_mha::quant::{build_exp_lut, dequantize, lut_index, quantize, PROB_SCALE};
use proptest::prelude::*;

#[test]
fn test_uniform_row_splits_evenly() {
    let lut = build_exp_lut();
    let mut probs = [0u8; 5];
    softmax_row(&[7; 5], &lut, &mut probs);
    assert_eq!(probs, [51; 5]);
}

#[test]
fn test_dominant_score_takes_everything() {
    let lut = build_exp_lut();
    let mut probs = [0u8; 4];
    // deltas below -22 map to zero entries
    softmax_row(&[100, 0, 0, 0], &lut, &mut probs);
    assert_eq!(probs, [255, 0, 0, 0]);
}

#[test]
fn test_quantize_saturates() {
    assert_eq!(quantize(1.0, 127), 127);
    assert_eq!(quantize(-1.0, 127), -127);
    assert_eq!(quantize(3.0, 127), 127);
    assert_eq!(quantize(-3.0, 127), -128);
    assert_eq!(dequantize(255 * 127, PROB_SCALE, 127), 1.0);
}

proptest! {
    #[test]
    fn test_softmax_row_sum_bounds(
        scores in prop::collection::vec(-20_000i32..20_000, 1..128),
    ) {
        let lut = build_exp_lut();
        let mut probs = vec![0u8; scores.len()];
        softmax_row(&scores, &lut, &mut probs);

        let sum: u32 = probs.iter().map(|&p| p as u32).sum();
        let floor = (PROB_SCALE as u32).saturating_sub(scores.len() as u32 - 1);
        prop_assert!(sum <= PROB_SCALE as u32);
        prop_assert!(sum >= floor);
    }

    #[test]
    fn test_row_max_gets_largest_probability(
        scores in prop::collection::vec(-500i32..500, 1..64),
    ) {
        let lut = build_exp_lut();
        let mut probs = vec![0u8; scores.len()];
        softmax_row(&scores, &lut, &mut probs);

        let argmax = scores
            .iter()
            .enumerate()
            .max_by_key(|&(_, &s)| s)
            .map(|(i, _)| i)
            .unwrap();
        prop_assert!(probs.iter().all(|&p| p <= probs[argmax]));
    }

    #[test]
    fn test_lut_index_never_above_zero_delta(
        row_max in -50_000i32..50_000,
        delta in 0i32..100_000,
    ) {
        prop_assert!(lut_index(row_max - delta, row_max) <= 128);
    }

    #[test]
    fn test_quantize_within_half_step(x in -1.0f32..1.0, scale in 1i32..128) {
        let q = quantize(x, scale) as f32;
        prop_assert!((q - x * scale as f32).abs() <= 0.5 + 1e-4);
    }
}
