//! Numeric comparison of kernel output against references

use crate::host::MhaResults;
use serde::Serialize;
use tracing::warn;

/// Outcome of comparing dequantized kernel output with the float reference
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Comparison {
    pub max_abs_diff: f32,
    pub mean_abs_diff: f32,
    /// Elements farther than `tolerance` from the reference
    pub mismatches: usize,
    pub elements: usize,
    pub tolerance: f32,
}

impl Comparison {
    pub fn passed(&self) -> bool {
        self.mismatches == 0
    }

    /// Combine two comparisons made with the same tolerance
    pub fn merge(&self, other: &Comparison) -> Comparison {
        let elements = self.elements + other.elements;
        let mean_abs_diff = if elements == 0 {
            0.0
        } else {
            (self.mean_abs_diff * self.elements as f32 + other.mean_abs_diff * other.elements as f32)
                / elements as f32
        };
        Comparison {
            max_abs_diff: self.max_abs_diff.max(other.max_abs_diff),
            mean_abs_diff,
            mismatches: self.mismatches + other.mismatches,
            elements,
            tolerance: self.tolerance,
        }
    }
}

/// Element-wise absolute comparison of two equally long slices
pub fn compare_slices(actual: &[f32], expected: &[f32], tolerance: f32) -> Comparison {
    debug_assert_eq!(actual.len(), expected.len());
    let mut max_abs_diff = 0f32;
    let mut sum = 0f64;
    let mut mismatches = 0;
    for (a, e) in actual.iter().zip(expected) {
        let diff = (a - e).abs();
        max_abs_diff = max_abs_diff.max(diff);
        sum += diff as f64;
        if diff > tolerance {
            mismatches += 1;
        }
    }
    let elements = actual.len().min(expected.len());
    Comparison {
        max_abs_diff,
        mean_abs_diff: if elements == 0 { 0.0 } else { (sum / elements as f64) as f32 },
        mismatches,
        elements,
        tolerance,
    }
}

/// Compare every slot of `results` (dequantized with `v_scale`) with `reference`
pub fn compare(
    results: &MhaResults,
    reference: &[Vec<f32>],
    v_scale: i32,
    tolerance: f32,
) -> Comparison {
    let mut total = compare_slices(&[], &[], tolerance);
    for (slot, expected) in reference.iter().enumerate().take(results.num_slots()) {
        let actual = results.dequantized(slot, v_scale);
        total = total.merge(&compare_slices(&actual, expected, tolerance));
    }
    if !total.passed() {
        warn!(
            mismatches = total.mismatches,
            max_abs_diff = total.max_abs_diff,
            tolerance,
            "kernel output outside float tolerance"
        );
    }
    total
}

/// Slots whose output is not bit-identical to the integer reference
pub fn count_integer_mismatches(results: &MhaResults, reference: &[Vec<i32>]) -> usize {
    let mismatched = results
        .slots
        .iter()
        .zip(reference)
        .filter(|(r, expected)| r.out != **expected)
        .count()
        + reference.len().abs_diff(results.num_slots());
    if mismatched > 0 {
        warn!(mismatched, "kernel output differs from integer reference");
    }
    mismatched
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::SlotResult;
    use crate::scheduler::SlotId;

    #[test]
    fn test_compare_slices() {
        let c = compare_slices(&[1.0, 2.0, 3.0], &[1.0, 2.5, 3.001], 0.01);
        assert_eq!(c.mismatches, 1);
        assert_eq!(c.elements, 3);
        assert!((c.max_abs_diff - 0.5).abs() < 1e-6);
        assert!(!c.passed());
    }

    #[test]
    fn test_merge() {
        let a = compare_slices(&[0.0, 0.0], &[0.1, 0.1], 0.01);
        let b = compare_slices(&[0.0, 0.0], &[0.0, 0.0], 0.01);
        let m = a.merge(&b);
        assert_eq!(m.elements, 4);
        assert_eq!(m.mismatches, 2);
        assert!((m.mean_abs_diff - 0.05).abs() < 1e-6);
    }

    #[test]
    fn test_integer_mismatches() {
        let results = MhaResults {
            seq_len: 1,
            head_dim: 2,
            slots: vec![
                SlotResult {
                    slot: 0,
                    id: SlotId::from_index(0, 1),
                    out: vec![1, 2],
                    cycles: 0,
                },
                SlotResult {
                    slot: 1,
                    id: SlotId::from_index(1, 1),
                    out: vec![3, 4],
                    cycles: 0,
                },
            ],
        };
        assert_eq!(count_integer_mismatches(&results, &[vec![1, 2], vec![3, 4]]), 0);
        assert_eq!(count_integer_mismatches(&results, &[vec![1, 2], vec![3, 5]]), 1);
        assert_eq!(count_integer_mismatches(&results, &[vec![1, 2]]), 1);
    }
}
