//! Allocation, upload, launch and download over all units of a geometry

use crate::config::{MhaGeometry, SystemConfig};
use crate::error::{PimError, PimResult};
use crate::host::results::{HostTimings, MhaResults, SlotResult};
use crate::inputs::MhaInputs;
use crate::kernel::launch_unit;
use crate::memory::layout::{
    mha_layout, DPU_EXP_LUT, DPU_K, DPU_NSLOTS64, DPU_Q, DPU_RESULTS, DPU_SLOT0_64, DPU_V,
};
use crate::memory::{BulkMemory, MhaSymbols, ScratchArena, TransferStats};
use crate::profiling::{PerfCounter, PhaseTimer};
use crate::quant::build_exp_lut;
use crate::scheduler::{unit_assignments, SlotId, UnitAssignment};
use rayon::prelude::*;
use std::marker::PhantomData;
use tracing::{error, info};

/// Memories and counter of one unit
struct Unit {
    bulk: BulkMemory,
    symbols: MhaSymbols,
    scratch: ScratchArena,
    perf: PerfCounter,
}

/// Every unit the geometry needs, with its slot assignment
pub struct UnitSet<G: MhaGeometry> {
    config: SystemConfig,
    units: Vec<Unit>,
    assignments: Vec<UnitAssignment>,
    _geometry: PhantomData<G>,
}

impl<G: MhaGeometry> UnitSet<G> {
    /// Request `NR_UNITS` units from the rank
    ///
    /// # Errors
    /// - [`PimError::UnitCountMismatch`] if the rank grants a different
    ///   number of units; this is fatal, there is no partial run
    /// - [`PimError::ScratchExhausted`] if the geometry does not fit the
    ///   configured scratch capacity
    /// - [`PimError::BulkExhausted`] if one unit's layout does not fit the
    ///   configured bulk capacity
    pub fn allocate(config: SystemConfig) -> PimResult<Self> {
        let () = G::VALID;
        config.validate()?;

        let requested = G::NR_UNITS;
        let granted = requested.min(config.available_units);
        if granted != requested {
            error!(
                geometry = G::NAME,
                requested, granted, "rank granted the wrong number of units"
            );
            return Err(PimError::UnitCountMismatch {
                expected: requested,
                actual: granted,
            });
        }
        if G::SCRATCH_BYTES > config.scratch_capacity {
            return Err(PimError::ScratchExhausted {
                requested: G::SCRATCH_BYTES,
                available: config.scratch_capacity,
            });
        }

        let layout = mha_layout::<G>();
        let units = (0..granted)
            .map(|_| {
                let bulk = BulkMemory::new(&layout, config.bulk_capacity)?;
                let symbols = MhaSymbols::resolve(&bulk)?;
                Ok(Unit {
                    bulk,
                    symbols,
                    scratch: ScratchArena::new(config.scratch_capacity),
                    perf: PerfCounter::new(config.clock_hz),
                })
            })
            .collect::<PimResult<Vec<_>>>()?;

        info!(
            geometry = G::NAME,
            schedule = %G::SCHEDULE,
            units = granted,
            lanes = G::NR_LANES,
            bulk_bytes = layout.total_bytes(),
            scratch_bytes = G::SCRATCH_BYTES,
            "allocated units"
        );

        Ok(Self {
            config,
            units,
            assignments: unit_assignments(G::TOTAL_SLOTS, G::SLOTS_PER_UNIT, G::NR_UNITS),
            _geometry: PhantomData,
        })
    }

    pub fn num_units(&self) -> usize {
        self.units.len()
    }

    pub fn assignments(&self) -> &[UnitAssignment] {
        &self.assignments
    }

    pub fn config(&self) -> &SystemConfig {
        &self.config
    }

    /// Bulk memory of one unit
    pub fn bulk(&self, unit: usize) -> &BulkMemory {
        &self.units[unit].bulk
    }

    /// Upload every slot's Q/K/V, each unit's scalars, and the LUT
    pub fn upload(&self, inputs: &MhaInputs) -> PimResult<()> {
        let expected = G::TOTAL_SLOTS * G::SLOT_ELEMS;
        if inputs.q.len() != expected || inputs.k.len() != expected || inputs.v.len() != expected
        {
            return Err(PimError::InputShapeMismatch(format!(
                "inputs hold {} slots, geometry {} has {}",
                inputs.num_slots(),
                G::NAME,
                G::TOTAL_SLOTS
            )));
        }

        self.for_each_unit(|unit| {
            let assignment = self.assignments[unit];
            self.upload_assignment(unit, &assignment, inputs)
        })?;
        self.broadcast(DPU_EXP_LUT, &build_exp_lut())
    }

    /// Upload the slots of `assignment` into `unit` and set its scalars
    pub fn upload_assignment(
        &self,
        unit: usize,
        assignment: &UnitAssignment,
        inputs: &MhaInputs,
    ) -> PimResult<()> {
        let bulk = &self.unit(unit)?.bulk;
        let matrix_bytes = G::SEQ_LEN * G::IN_ROW_BYTES;
        for (local, slot) in assignment.slots().enumerate() {
            let offset = local * matrix_bytes;
            bulk.copy_to(DPU_Q, offset, &pad_rows::<G>(inputs.q_slot(slot)))?;
            bulk.copy_to(DPU_K, offset, &pad_rows::<G>(inputs.k_slot(slot)))?;
            bulk.copy_to(DPU_V, offset, &pad_rows::<G>(inputs.v_slot(slot)))?;
        }
        bulk.copy_to(DPU_NSLOTS64, 0, &(assignment.nslots as u64).to_le_bytes())?;
        bulk.copy_to(DPU_SLOT0_64, 0, &(assignment.slot0 as u64).to_le_bytes())?;
        Ok(())
    }

    /// Write the same bytes to `symbol` of every unit
    pub fn broadcast(&self, symbol: &str, bytes: &[u8]) -> PimResult<()> {
        self.for_each_unit(|unit| self.units[unit].bulk.copy_to(symbol, 0, bytes))
    }

    /// Run the kernel on every unit; returns once all units are done
    ///
    /// # Errors
    /// The first unit failure; a faulted unit aborts the whole launch.
    pub fn launch(&self) -> PimResult<()> {
        self.for_each_unit(|idx| {
            let unit = &self.units[idx];
            launch_unit::<G>(idx, &unit.bulk, unit.symbols, &unit.scratch, &unit.perf)
        })
        .map_err(|e| {
            error!(geometry = G::NAME, "launch failed: {}", e);
            e
        })
    }

    /// Read back one slot record of one unit
    ///
    /// Output words are copied out of typed scratch, so they are in native
    /// byte order; the cycle field is written little-endian.
    pub fn read_record(&self, unit: usize, local_slot: usize) -> PimResult<SlotResult> {
        let bulk = &self.unit(unit)?.bulk;
        let mut record = vec![0u8; G::RECORD_BYTES];
        bulk.copy_from(DPU_RESULTS, local_slot * G::RECORD_BYTES, &mut record)?;

        let mut out = Vec::with_capacity(G::SLOT_ELEMS);
        for row in record[..G::SEQ_LEN * G::OUT_ROW_BYTES].chunks_exact(G::OUT_ROW_BYTES) {
            out.extend(
                row[..G::HEAD_DIM * 4]
                    .chunks_exact(4)
                    .map(bytemuck::pod_read_unaligned::<i32>),
            );
        }
        let mut cycles = [0u8; 8];
        cycles.copy_from_slice(&record[G::SEQ_LEN * G::OUT_ROW_BYTES..]);

        let slot = self.assignments[unit].slot0 + local_slot;
        Ok(SlotResult {
            slot,
            id: SlotId::from_index(slot, G::BATCH_SIZE),
            out,
            cycles: u64::from_le_bytes(cycles),
        })
    }

    /// Gather every slot's record, ordered by global slot
    pub fn download(&self) -> PimResult<MhaResults> {
        let mut slots = Vec::with_capacity(G::TOTAL_SLOTS);
        for assignment in &self.assignments {
            for local in 0..assignment.nslots {
                slots.push(self.read_record(assignment.unit, local)?);
            }
        }
        Ok(MhaResults {
            seq_len: G::SEQ_LEN,
            head_dim: G::HEAD_DIM,
            slots,
        })
    }

    /// Upload, launch and download, timing each phase
    pub fn run(&self, inputs: &MhaInputs) -> PimResult<(MhaResults, HostTimings)> {
        let mut upload = PhaseTimer::for_phase("upload");
        let mut launch = PhaseTimer::for_phase("launch");
        let mut download = PhaseTimer::for_phase("download");

        upload.time(|| self.upload(inputs))?;
        launch.time(|| self.launch())?;
        let results = download.time(|| self.download())?;

        let timings = HostTimings {
            upload_ms: upload.elapsed_ms().unwrap_or_default(),
            launch_ms: launch.elapsed_ms().unwrap_or_default(),
            download_ms: download.elapsed_ms().unwrap_or_default(),
        };
        info!(
            geometry = G::NAME,
            slots = results.num_slots(),
            launch_ms = timings.launch_ms,
            "run complete"
        );
        Ok((results, timings))
    }

    /// Transfer counters summed over all units
    pub fn transfer_stats(&self) -> TransferStats {
        self.units
            .iter()
            .fold(TransferStats::default(), |acc, u| acc.merge(&u.bulk.stats()))
    }

    fn unit(&self, unit: usize) -> PimResult<&Unit> {
        self.units.get(unit).ok_or_else(|| {
            PimError::InvalidConfiguration(format!(
                "unit {} out of range ({} units)",
                unit,
                self.units.len()
            ))
        })
    }

    fn for_each_unit<F>(&self, f: F) -> PimResult<()>
    where
        F: Fn(usize) -> PimResult<()> + Sync + Send,
    {
        if self.config.parallel_units {
            (0..self.units.len()).into_par_iter().try_for_each(f)
        } else {
            (0..self.units.len()).try_for_each(f)
        }
    }
}

/// Copy an unpadded `SEQ_LEN x HEAD_DIM` matrix into rows of `IN_ROW_BYTES`
fn pad_rows<G: MhaGeometry>(matrix: &[i8]) -> Vec<u8> {
    let mut padded = vec![0u8; G::SEQ_LEN * G::IN_ROW_BYTES];
    for (dst, src) in padded
        .chunks_exact_mut(G::IN_ROW_BYTES)
        .zip(matrix.chunks_exact(G::HEAD_DIM))
    {
        dst[..G::HEAD_DIM].copy_from_slice(bytemuck::cast_slice(src));
    }
    padded
}
