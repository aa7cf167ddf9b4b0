//! Execution engine - reconciles a plan wave by wave with parallelism

use crate::client::ResourceClient;
use crate::context::{AutoConfirm, ConfirmCallback, NoProgress, ProgressCallback};
use crate::error::ExecuteError;
use crate::kind::Unit;
use crate::outcome::ReconcileOutcome;
use crate::planner::ExecutionPlan;
use crate::reconciler::Reconciler;
use crate::types::{ExecuteOptions, ExecuteSummary};
use rayon::prelude::*;

/// Execute a plan with the given options and callbacks
///
/// The plan is first previewed with a dry-run reconciliation of every unit.
/// Unless `opts.dry_run` is set, pending changes are then confirmed and
/// applied wave by wave; once a wave has failures, later waves are skipped.
pub fn execute<C, P, F>(
    client: &C,
    plan: &ExecutionPlan,
    opts: &ExecuteOptions,
    progress: &mut P,
    confirm: &mut F,
) -> Result<ExecuteSummary, ExecuteError>
where
    C: ResourceClient,
    P: ProgressCallback,
    F: ConfirmCallback,
{
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(opts.jobs.max(1))
        .build()?;

    if opts.dry_run {
        return Ok(run_waves(client, plan, opts, &pool, progress));
    }

    let preview_opts = ExecuteOptions {
        dry_run: true,
        ..opts.clone()
    };
    let preview = run_waves(client, plan, &preview_opts, &pool, &mut NoProgress);

    let pending: Vec<&ReconcileOutcome> = preview.outcomes.iter().filter(|o| o.changed).collect();
    if pending.is_empty() {
        return Ok(preview);
    }

    // Confirm before proceeding
    if !confirm.confirm(&pending)? {
        let mut summary = ExecuteSummary::default();
        for outcome in preview.outcomes {
            if outcome.changed {
                summary.skipped += 1;
            } else {
                summary.record(outcome);
            }
        }
        return Ok(summary);
    }

    Ok(run_waves(client, plan, opts, &pool, progress))
}

/// Run every wave in order, skipping the rest after a failing wave
fn run_waves<C, P>(
    client: &C,
    plan: &ExecutionPlan,
    opts: &ExecuteOptions,
    pool: &rayon::ThreadPool,
    progress: &mut P,
) -> ExecuteSummary
where
    C: ResourceClient,
    P: ProgressCallback,
{
    let reconciler = Reconciler::new(client)
        .dry_run(opts.dry_run)
        .with_diff(opts.diff);
    let mut summary = ExecuteSummary::default();

    for wave in plan.waves() {
        if summary.failed > 0 {
            log::warn!(
                "skipping {} unit(s) at tier {} after earlier failures",
                wave.units.len(),
                wave.tier
            );
            summary.skipped += wave.units.len();
            continue;
        }

        progress.on_wave_start(wave.tier, wave.ensure, wave.units.len());
        for outcome in execute_batch(&reconciler, &wave.units, opts.jobs, pool, progress) {
            summary.record(outcome);
        }
        progress.on_wave_complete();
    }

    summary
}

/// Execute a batch of units
fn execute_batch<C, P>(
    reconciler: &Reconciler<&C>,
    units: &[&Unit],
    jobs: usize,
    pool: &rayon::ThreadPool,
    progress: &mut P,
) -> Vec<ReconcileOutcome>
where
    C: ResourceClient,
    P: ProgressCallback,
{
    if jobs <= 1 || units.len() == 1 {
        // Sequential execution
        let mut outcomes = Vec::with_capacity(units.len());
        for unit in units {
            progress.on_unit_start(&unit.identity);
            let outcome = reconciler.run_unit(unit);
            progress.on_unit_complete(&outcome);
            outcomes.push(outcome);
        }
        outcomes
    } else {
        // Parallel execution; progress is reported once the batch is done
        let outcomes: Vec<ReconcileOutcome> =
            pool.install(|| units.par_iter().map(|unit| reconciler.run_unit(unit)).collect());
        for outcome in &outcomes {
            progress.on_unit_complete(outcome);
        }
        outcomes
    }
}

/// Simple execution without callbacks
///
/// For basic use cases where you don't need progress or confirmation.
pub fn execute_simple<C: ResourceClient>(
    client: &C,
    plan: &ExecutionPlan,
    opts: &ExecuteOptions,
) -> Result<ExecuteSummary, ExecuteError> {
    execute(client, plan, opts, &mut NoProgress, &mut AutoConfirm)
}
