//! Launching the lanes of one unit

use crate::config::{MhaGeometry, Schedule};
use crate::error::{PimError, PimResult};
use crate::kernel::barrier::{LaneBarrier, PoisonOnPanic};
use crate::kernel::{head_parallel, row_parallel, Lane};
use crate::memory::{BulkMemory, MhaSymbols, ScratchArena};
use crate::profiling::PerfCounter;
use tracing::{debug, debug_span, warn};

/// Everything the lanes of one unit share during a launch
pub struct UnitContext<'a> {
    pub unit: usize,
    pub bulk: &'a BulkMemory,
    pub symbols: MhaSymbols,
    pub scratch: &'a ScratchArena,
    pub perf: &'a PerfCounter,
    pub(crate) barrier: LaneBarrier,
}

/// Run the attention kernel on one unit, all `NR_LANES` lanes to completion
///
/// Scratch is reinitialized first; nothing from a previous launch survives.
///
/// # Errors
/// - [`PimError::LaneFault`] if any lane panicked; the unit's results are
///   then undefined
/// - [`PimError::Io`] if a lane thread could not be spawned
pub fn launch_unit<G: MhaGeometry>(
    unit: usize,
    bulk: &BulkMemory,
    symbols: MhaSymbols,
    scratch: &ScratchArena,
    perf: &PerfCounter,
) -> PimResult<()> {
    let () = G::VALID;
    scratch.reset();

    let ctx = UnitContext {
        unit,
        bulk,
        symbols,
        scratch,
        perf,
        barrier: LaneBarrier::new(G::NR_LANES),
    };

    match G::SCHEDULE {
        Schedule::HeadParallel => {
            let shared = head_parallel::Shared::alloc(scratch);
            run_lanes(&ctx, |lane| head_parallel::run::<G>(lane, &shared))
        }
        Schedule::RowParallel => {
            let shared = row_parallel::Shared::alloc::<G>(scratch);
            run_lanes(&ctx, |lane| row_parallel::run::<G>(lane, &shared))
        }
    }?;

    debug!(
        unit,
        scratch_used = scratch.used(),
        scratch_peak = scratch.peak(),
        "unit finished"
    );
    Ok(())
}

fn run_lanes<F>(ctx: &UnitContext<'_>, program: F) -> PimResult<()>
where
    F: Fn(&Lane<'_>) + Sync,
{
    let lanes = ctx.barrier.lanes();
    // lane threads do not inherit a scoped subscriber
    let dispatch = tracing::dispatcher::get_default(|d| d.clone());
    let (joined, spawn_error) = std::thread::scope(|s| {
        let mut handles = Vec::with_capacity(lanes);
        let mut spawn_error = None;
        for id in 0..lanes {
            let program = &program;
            let dispatch = &dispatch;
            let spawned = std::thread::Builder::new()
                .name(format!("unit{}-lane{}", ctx.unit, id))
                .spawn_scoped(s, move || {
                    let _guard = PoisonOnPanic::new(&ctx.barrier, id);
                    tracing::dispatcher::with_default(dispatch, || {
                        let _span = debug_span!("lane", unit = ctx.unit, lane = id).entered();
                        program(&Lane::new(id, ctx));
                    });
                });
            match spawned {
                Ok(handle) => handles.push(handle),
                Err(e) => {
                    // lanes already running would wait for this one forever
                    ctx.barrier.poison(id);
                    spawn_error = Some(e);
                    break;
                }
            }
        }
        let joined: Vec<bool> = handles.into_iter().map(|h| h.join().is_ok()).collect();
        (joined, spawn_error)
    });

    if let Some(e) = spawn_error {
        return Err(PimError::Io(e));
    }
    if let Some(first_failed) = joined.iter().position(|ok| !ok) {
        let lane = ctx.barrier.fault().unwrap_or(first_failed);
        warn!(unit = ctx.unit, lane, "lane faulted, unit aborted");
        return Err(PimError::LaneFault {
            unit: ctx.unit,
            lane,
        });
    }
    Ok(())
}
