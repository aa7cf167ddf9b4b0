//! Rendering of plans, outcomes and summaries

use colored::{ColoredString, Colorize};
use reconcile::{Action, DiffReport, ExecuteSummary, FieldChange, ReconcileOutcome};
use serde_json::Value;
use similar::{ChangeTag, TextDiff};
use std::collections::BTreeMap;

use crate::ui;

const VALUE_WIDTH: usize = 60;

/// One-character marker for an outcome
pub fn symbol(outcome: &ReconcileOutcome) -> ColoredString {
    if outcome.error.is_some() {
        return "✗".red();
    }
    match outcome.action {
        Action::Create => "+".green(),
        Action::Update => "~".yellow(),
        Action::Delete => "-".red(),
        Action::None => "○".dimmed(),
    }
}

/// What happened, or would happen in dry-run
pub fn describe(outcome: &ReconcileOutcome) -> &'static str {
    if outcome.error.is_some() {
        return "failed";
    }
    match (outcome.action, outcome.dry_run) {
        (Action::None, _) => "unchanged",
        (Action::Create, true) => "will be created",
        (Action::Update, true) => "will be updated",
        (Action::Delete, true) => "will be deleted",
        (Action::Create, false) => "created",
        (Action::Update, false) => "updated",
        (Action::Delete, false) => "deleted",
    }
}

/// Compact one-line rendering of a field value
pub fn format_value(value: Option<&Value>) -> String {
    match value {
        None => "(absent)".to_string(),
        Some(Value::String(s)) => ui::truncate(&format!("{s:?}"), VALUE_WIDTH),
        Some(other) => ui::truncate(&other.to_string(), VALUE_WIDTH),
    }
}

/// Line-level diff of the before/after records: `(tag, line)` for changed lines only
pub fn diff_lines(report: &DiffReport) -> Vec<(ChangeTag, String)> {
    let render = |record: Option<&reconcile::Record>| {
        record
            .and_then(|r| serde_json::to_string_pretty(r).ok())
            .map(|s| s + "\n")
            .unwrap_or_default()
    };
    let before = render(report.before.as_ref());
    let after = render(report.after.as_ref());

    TextDiff::from_lines(&before, &after)
        .iter_all_changes()
        .filter(|change| change.tag() != ChangeTag::Equal)
        .map(|change| (change.tag(), change.value().trim_end_matches('\n').to_string()))
        .collect()
}

fn print_change(change: &FieldChange) {
    println!(
        "│       {} {} → {}",
        format!("{}:", change.path).dimmed(),
        format_value(change.before.as_ref()),
        format_value(change.after.as_ref())
    );
}

fn print_diff(report: &DiffReport) {
    for (tag, line) in diff_lines(report) {
        match tag {
            ChangeTag::Delete => println!("│       {}", format!("- {line}").red()),
            ChangeTag::Insert => println!("│       {}", format!("+ {line}").green()),
            ChangeTag::Equal => {}
        }
    }
}

/// Print outcomes grouped by kind
pub fn print_outcomes<'a, I>(title: &str, outcomes: I, show_diff: bool)
where
    I: IntoIterator<Item = &'a ReconcileOutcome>,
{
    let mut by_kind: BTreeMap<&str, Vec<&ReconcileOutcome>> = BTreeMap::new();
    for outcome in outcomes {
        by_kind.entry(outcome.identity.kind()).or_default().push(outcome);
    }

    if by_kind.is_empty() {
        println!();
        println!("  {} No resources", "✓".green());
        return;
    }

    println!();
    println!("┌─ {} ─────────────────────────────────────────┐", title.bold());
    println!("│");

    for (kind, outcomes) in &by_kind {
        println!("│ {}", kind.bold());
        for outcome in outcomes {
            println!(
                "│   {} {:<48} {}",
                symbol(outcome),
                outcome.identity.to_string(),
                describe(outcome).dimmed()
            );
            if let Some(error) = &outcome.error {
                println!("│       {}", error.message.red());
                continue;
            }
            match (&outcome.diff, show_diff) {
                (Some(report), true) if outcome.changed => print_diff(report),
                _ => outcome.changes.iter().for_each(print_change),
            }
        }
        println!("│");
    }
    println!("└─────────────────────────────────────────────────────┘");
}

/// Print the final counts
pub fn print_summary(summary: &ExecuteSummary, dry_run: bool) {
    println!();
    if !summary.is_success() {
        println!("  {} Finished with errors", "⚠".yellow().bold());
    } else if dry_run {
        println!(
            "  {} Plan: {} change(s), nothing applied",
            "ℹ".blue().bold(),
            summary.total_changes()
        );
    } else if summary.total_changes() == 0 && summary.skipped > 0 {
        println!("  {} Nothing applied", "ℹ".blue().bold());
    } else if summary.total_changes() == 0 {
        println!("  {} Everything already converged", "✓".green().bold());
    } else {
        println!("  {} Converged", "✓".green().bold());
    }

    let verb = |done: &'static str, planned: &'static str| if dry_run { planned } else { done };
    if summary.created > 0 {
        println!("    • {} {}", summary.created, verb("created", "to create"));
    }
    if summary.updated > 0 {
        println!("    • {} {}", summary.updated, verb("updated", "to update"));
    }
    if summary.deleted > 0 {
        println!("    • {} {}", summary.deleted, verb("deleted", "to delete"));
    }
    if summary.unchanged > 0 {
        println!("    • {} unchanged", summary.unchanged);
    }
    if summary.skipped > 0 {
        println!("    • {} skipped", summary.skipped);
    }
    if summary.failed > 0 {
        println!("    • {} {}", summary.failed, "failed".red());
    }
}
