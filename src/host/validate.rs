//! One validated run: launch, then check against both references

use crate::config::{MhaGeometry, SystemConfig};
use crate::error::PimResult;
use crate::host::results::{MhaResults, RunReport};
use crate::host::unit_set::UnitSet;
use crate::inputs::MhaInputs;
use crate::profiling::{CycleSummary, ScopedTimer};
use crate::quant::build_exp_lut;
use crate::reference::{self, compare::compare, count_integer_mismatches};
use tracing::info;

/// Default absolute tolerance on dequantized outputs
pub const DEFAULT_TOLERANCE: f32 = 1e-2;

/// Run geometry `G` on `inputs` and validate the output
///
/// The run passes when every slot matches the integer reference exactly.
/// The float comparison is reported alongside; its mismatches measure the
/// LUT softmax approximation, not kernel faults.
pub fn run_validated<G: MhaGeometry>(
    config: SystemConfig,
    inputs: &MhaInputs,
    tolerance: f32,
) -> PimResult<(MhaResults, RunReport)> {
    let clock_hz = config.clock_hz;
    let units = UnitSet::<G>::allocate(config)?;
    let (results, timings) = units.run(inputs)?;

    let _timer = ScopedTimer::new("reference validation");
    let integer = reference::integer_reference::<G>(inputs, &build_exp_lut());
    let integer_mismatched_slots = count_integer_mismatches(&results, &integer);
    let float = compare(
        &results,
        &reference::float_reference::<G>(inputs),
        G::V_SCALE,
        tolerance,
    );

    let report = RunReport {
        geometry: G::NAME,
        schedule: G::SCHEDULE.as_str(),
        seq_len: G::SEQ_LEN,
        head_dim: G::HEAD_DIM,
        total_slots: G::TOTAL_SLOTS,
        units: units.num_units(),
        lanes_per_unit: G::NR_LANES,
        cycles: CycleSummary::from_cycles(&results.cycles(), clock_hz),
        timings,
        transfers: units.transfer_stats(),
        integer_mismatched_slots,
        float_max_abs_diff: float.max_abs_diff,
        float_mismatches: float.mismatches,
        tolerance,
        passed: integer_mismatched_slots == 0,
    };
    info!(
        geometry = G::NAME,
        passed = report.passed,
        float_max_abs_diff = report.float_max_abs_diff,
        "validation finished"
    );
    Ok((results, report))
}
