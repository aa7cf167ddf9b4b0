//! `converge apply` and `converge plan`

use anyhow::{Result, bail};
use colored::Colorize;
use reconcile::{ExecuteOptions, ExecuteSummary, ReconcileOutcome};

use super::{Loaded, validate};
use crate::Context;
use crate::cli::ApplyArgs;
use crate::display;
use crate::progress::{PromptConfirm, WaveProgress};
use crate::provider;
use crate::ui;

pub fn run(ctx: &Context, args: &ApplyArgs) -> Result<()> {
    let Loaded {
        config,
        catalog,
        planned,
    } = super::load(ctx, &args.manifest)?;

    if !planned.problems.is_empty() {
        validate::report_problems(&planned.problems);
        bail!(
            "{} invalid resource(s) in {}; nothing was applied",
            planned.problems.len(),
            args.manifest
        );
    }

    let plan = planned.plan.filter_by_target(args.target.as_deref());
    if plan.is_empty() {
        if let Some(target) = &args.target {
            bail!("No resources match target '{target}'");
        }
        if ctx.chatty() {
            ui::info("Manifest declares no resources");
        }
        return Ok(());
    }

    let assume_yes = args.yes || !config.apply.confirm;
    if ctx.json() && !args.dry_run && !assume_yes {
        bail!("--output json cannot prompt; pass --yes or --dry-run");
    }

    let provider_kind = ctx.provider.unwrap_or(config.provider.kind);
    let client = provider::connect(provider_kind, &config, &catalog)?;

    let opts = ExecuteOptions {
        dry_run: args.dry_run,
        jobs: args.jobs.unwrap_or(config.apply.jobs).max(1),
        diff: args.diff,
    };
    log::info!(
        "Reconciling {} resource(s) with {} job(s){}",
        plan.len(),
        opts.jobs,
        if opts.dry_run { " (dry run)" } else { "" }
    );

    let mut progress = WaveProgress::new(ctx.chatty());
    let mut confirm = PromptConfirm::new(assume_yes, args.diff);
    let summary = reconcile::execute(&client, &plan, &opts, &mut progress, &mut confirm)?;

    if ctx.json() {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        report(ctx, &summary, args);
    }

    if !summary.is_success() {
        bail!("{} resource(s) failed to converge", summary.failed);
    }
    Ok(())
}

fn report(ctx: &Context, summary: &ExecuteSummary, args: &ApplyArgs) {
    if !ctx.quiet {
        let shown = summary
            .outcomes
            .iter()
            .filter(|o| worth_showing(o, ctx.verbose));
        let title = if args.dry_run { "Plan" } else { "Apply" };
        display::print_outcomes(title, shown, args.diff);
    }
    display::print_summary(summary, args.dry_run);

    if args.dry_run && summary.total_changes() > 0 && ctx.chatty() {
        println!();
        ui::dim(&format!(
            "Run {} to apply these changes",
            format!("converge apply {}", args.manifest).bold()
        ));
    }
}

/// Unchanged resources only show up with `-v`
fn worth_showing(outcome: &ReconcileOutcome, verbose: u8) -> bool {
    outcome.changed || outcome.error.is_some() || verbose > 0
}
