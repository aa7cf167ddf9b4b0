//! Execution options and summaries

use crate::outcome::{Action, ReconcileOutcome};
use serde::{Deserialize, Serialize};

/// Summary of execution results
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExecuteSummary {
    pub created: usize,
    pub updated: usize,
    pub deleted: usize,
    pub unchanged: usize,
    pub failed: usize,
    pub skipped: usize,
    /// Every outcome, in execution order
    pub outcomes: Vec<ReconcileOutcome>,
}

impl ExecuteSummary {
    /// Total number of changes made (or, in dry-run, that would be made)
    pub fn total_changes(&self) -> usize {
        self.created + self.updated + self.deleted
    }

    /// Check if execution was fully successful (no failures)
    pub fn is_success(&self) -> bool {
        self.failed == 0
    }

    /// Total number of units processed
    pub fn total(&self) -> usize {
        self.created + self.updated + self.deleted + self.unchanged + self.failed + self.skipped
    }

    /// Count an outcome and keep it
    pub fn record(&mut self, outcome: ReconcileOutcome) {
        if outcome.error.is_some() {
            self.failed += 1;
        } else {
            match outcome.action {
                Action::None => self.unchanged += 1,
                Action::Create => self.created += 1,
                Action::Update => self.updated += 1,
                Action::Delete => self.deleted += 1,
            }
        }
        self.outcomes.push(outcome);
    }

    /// Outcomes that failed
    pub fn failures(&self) -> impl Iterator<Item = &ReconcileOutcome> {
        self.outcomes.iter().filter(|o| o.error.is_some())
    }
}

/// Options for execution
#[derive(Debug, Clone)]
pub struct ExecuteOptions {
    /// Don't make changes, just show what would happen
    pub dry_run: bool,
    /// Number of parallel reconciliations per wave
    pub jobs: usize,
    /// Attach before/after records to outcomes
    pub diff: bool,
}

impl Default for ExecuteOptions {
    fn default() -> Self {
        Self {
            dry_run: false,
            jobs: 4,
            diff: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{Error, ValidationError};
    use crate::identity::ResourceIdentity;

    fn outcome(action: Action) -> ReconcileOutcome {
        ReconcileOutcome {
            identity: ResourceIdentity::builder("k").segment("name", "n").build(),
            changed: action != Action::None,
            action,
            dry_run: false,
            phases: Vec::new(),
            result: None,
            changes: Vec::new(),
            diff: None,
            error: None,
        }
    }

    #[test]
    fn test_record_counts() {
        let mut summary = ExecuteSummary::default();
        summary.record(outcome(Action::Create));
        summary.record(outcome(Action::Update));
        summary.record(outcome(Action::None));
        summary.record(ReconcileOutcome::failed(
            ResourceIdentity::builder("k").segment("name", "bad").build(),
            false,
            Vec::new(),
            &Error::from(ValidationError::single("boom")),
        ));

        assert_eq!(summary.total_changes(), 2);
        assert_eq!(summary.total(), 4);
        assert_eq!(summary.unchanged, 1);
        assert!(!summary.is_success());
        assert_eq!(summary.failures().count(), 1);
    }
}
