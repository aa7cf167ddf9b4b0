//! Terminal hooks for plan execution: progress bars and the confirm prompt

use colored::Colorize;
use dialoguer::Confirm;
use indicatif::{ProgressBar, ProgressStyle};
use reconcile::{ConfirmCallback, Ensure, ProgressCallback, ReconcileOutcome, ResourceIdentity};
use std::io::{self, IsTerminal};

use crate::display;

/// One progress bar per wave
pub struct WaveProgress {
    visible: bool,
    bar: Option<ProgressBar>,
}

impl WaveProgress {
    pub fn new(visible: bool) -> Self {
        Self { visible, bar: None }
    }
}

impl ProgressCallback for WaveProgress {
    fn on_wave_start(&mut self, tier: u32, ensure: Ensure, count: usize) {
        let bar = if self.visible {
            ProgressBar::new(count as u64)
        } else {
            ProgressBar::hidden()
        };
        if let Ok(style) =
            ProgressStyle::default_bar().template("{spinner:.green} {prefix} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
        {
            bar.set_style(style.progress_chars("=>-"));
        }
        let verb = match ensure {
            Ensure::Present => "converging",
            Ensure::Absent => "removing",
        };
        bar.set_prefix(format!("tier {tier} {verb}"));
        self.bar = Some(bar);
    }

    fn on_unit_start(&mut self, identity: &ResourceIdentity) {
        if let Some(bar) = &self.bar {
            bar.set_message(identity.to_string());
        }
    }

    fn on_unit_complete(&mut self, outcome: &ReconcileOutcome) {
        if let Some(bar) = &self.bar {
            bar.set_message(format!("{} {}", display::symbol(outcome), outcome.identity));
            bar.inc(1);
        }
    }

    fn on_wave_complete(&mut self) {
        if let Some(bar) = self.bar.take() {
            bar.finish_and_clear();
        }
    }
}

/// Shows the pending changes and asks before applying them
pub struct PromptConfirm {
    assume_yes: bool,
    show_diff: bool,
}

impl PromptConfirm {
    pub fn new(assume_yes: bool, show_diff: bool) -> Self {
        Self {
            assume_yes,
            show_diff,
        }
    }
}

impl ConfirmCallback for PromptConfirm {
    fn confirm(&mut self, pending: &[&ReconcileOutcome]) -> io::Result<bool> {
        if self.assume_yes {
            return Ok(true);
        }

        display::print_outcomes("Pending changes", pending.iter().copied(), self.show_diff);

        if !io::stdin().is_terminal() {
            return Err(io::Error::other(
                "stdin is not a terminal; pass --yes to apply without confirmation",
            ));
        }

        println!();
        Confirm::new()
            .with_prompt(format!("Apply {} change(s)?", pending.len().to_string().bold()))
            .default(false)
            .interact()
            .map_err(io::Error::other)
    }
}
