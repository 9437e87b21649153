//! Downloaded kernel results

use crate::memory::TransferStats;
use crate::profiling::CycleSummary;
use crate::quant::{dequantize, PROB_SCALE};
use crate::scheduler::SlotId;
use serde::Serialize;

/// Output and cycle count of one slot
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlotResult {
    /// Global slot index
    pub slot: usize,
    /// Head and batch item the slot belongs to
    pub id: SlotId,
    /// `SEQ_LEN * HEAD_DIM` accumulators, row-major, padding stripped
    pub out: Vec<i32>,
    pub cycles: u64,
}

/// Results of every slot, ordered by global slot index
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MhaResults {
    pub seq_len: usize,
    pub head_dim: usize,
    pub slots: Vec<SlotResult>,
}

impl MhaResults {
    pub fn num_slots(&self) -> usize {
        self.slots.len()
    }

    pub fn slot(&self, slot: usize) -> &SlotResult {
        &self.slots[slot]
    }

    /// One output row of one slot
    pub fn row(&self, slot: usize, row: usize) -> &[i32] {
        &self.slots[slot].out[row * self.head_dim..(row + 1) * self.head_dim]
    }

    pub fn cycles(&self) -> Vec<u64> {
        self.slots.iter().map(|s| s.cycles).collect()
    }

    /// Outputs with the cycle counts left out, for byte-level comparisons
    pub fn outputs(&self) -> Vec<&[i32]> {
        self.slots.iter().map(|s| s.out.as_slice()).collect()
    }

    /// Real-valued output of one slot (divides by `255 * v_scale`)
    pub fn dequantized(&self, slot: usize, v_scale: i32) -> Vec<f32> {
        self.slots[slot]
            .out
            .iter()
            .map(|&acc| dequantize(acc, PROB_SCALE, v_scale))
            .collect()
    }
}

/// Wall-clock time of each host phase
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct HostTimings {
    pub upload_ms: f64,
    pub launch_ms: f64,
    pub download_ms: f64,
}

/// Summary of one validated run, emitted by the CLI
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub geometry: &'static str,
    pub schedule: &'static str,
    pub seq_len: usize,
    pub head_dim: usize,
    pub total_slots: usize,
    pub units: usize,
    pub lanes_per_unit: usize,
    pub cycles: CycleSummary,
    pub timings: HostTimings,
    pub transfers: TransferStats,
    /// Slots whose output differs from the integer reference
    pub integer_mismatched_slots: usize,
    pub float_max_abs_diff: f32,
    pub float_mismatches: usize,
    pub tolerance: f32,
    pub passed: bool,
}
