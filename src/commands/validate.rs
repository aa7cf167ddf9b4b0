//! `converge validate`: check a manifest without talking to any provider

use anyhow::{Result, bail};
use colored::Colorize;
use serde::Serialize;

use super::Loaded;
use crate::Context;
use crate::catalog::Catalog;
use crate::manifest::ResourceProblem;
use crate::ui;
use reconcile::Unit;

#[derive(Serialize)]
struct ValidResource {
    resource: String,
    /// Rendered ARM path; `None` when the kind cannot address it
    path: Option<String>,
    tier: u32,
}

#[derive(Serialize)]
struct Report<'a> {
    valid: &'a [ValidResource],
    problems: &'a [ResourceProblem],
}

pub fn run(ctx: &Context, manifest: &str) -> Result<()> {
    let Loaded {
        catalog, planned, ..
    } = super::load(ctx, manifest)?;

    let valid: Vec<ValidResource> = planned
        .plan
        .units()
        .iter()
        .map(|unit| describe(&catalog, unit))
        .collect();

    if ctx.json() {
        let report = Report {
            valid: &valid,
            problems: &planned.problems,
        };
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        ui::header(&format!("Validating {manifest}"));
        for resource in &valid {
            println!("  {} {}", "✓".green(), resource.resource);
            if ctx.verbose > 0
                && let Some(path) = &resource.path
            {
                ui::dim(&format!("  {path}"));
            }
        }
        report_problems(&planned.problems);
        println!();
    }

    if !planned.problems.is_empty() {
        bail!("{} invalid resource(s)", planned.problems.len());
    }
    if ctx.chatty() {
        ui::success(&format!("{} resource(s) valid", valid.len()));
    }
    Ok(())
}

fn describe(catalog: &Catalog, unit: &Unit) -> ValidResource {
    let path = catalog
        .entry_for(unit)
        .and_then(|entry| entry.render_path(&unit.identity).ok());
    ValidResource {
        resource: unit.identity.to_string(),
        path,
        tier: unit.tier,
    }
}

/// Print every planning problem
pub fn report_problems(problems: &[ResourceProblem]) {
    for problem in problems {
        ui::error(&format!("{}: {}", problem.label.bold(), problem.message));
    }
}
