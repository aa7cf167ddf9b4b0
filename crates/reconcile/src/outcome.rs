//! Reconciliation outcomes and result normalization

use crate::diff::FieldChange;
use crate::error::{Error, ErrorKind};
use crate::field::{FieldPath, Record};
use crate::identity::ResourceIdentity;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Placeholder written over secret values in anything returned to the caller
pub const REDACTED: &str = "VALUE_SPECIFIED_IN_NO_LOG_PARAMETER";

/// Reconciler state machine phases
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    /// Nothing read yet
    Unknown,
    /// Provider reports no such resource
    Absent,
    /// Resource exists; not yet compared
    Present,
    PresentUnchanged,
    PresentNeedsCreate,
    PresentNeedsUpdate,
    NeedsDelete,
    Terminal,
}

/// The transition a reconciliation fired (or would fire, in dry-run)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    #[default]
    None,
    Create,
    Update,
    Delete,
}

/// Error summary carried by a failed outcome
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutcomeError {
    pub kind: ErrorKind,
    pub message: String,
}

impl From<&Error> for OutcomeError {
    fn from(err: &Error) -> Self {
        Self {
            kind: err.kind(),
            message: err.to_string(),
        }
    }
}

/// Before/after records for diff reporting
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct DiffReport {
    pub before: Option<Record>,
    pub after: Option<Record>,
}

/// Terminal result of one reconciliation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReconcileOutcome {
    pub identity: ResourceIdentity,
    pub changed: bool,
    pub action: Action,
    pub dry_run: bool,
    /// Phases visited, in order
    pub phases: Vec<Phase>,
    /// Normalized resource record; `None` once deleted or never existing
    pub result: Option<Record>,
    pub changes: Vec<FieldChange>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub diff: Option<DiffReport>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<OutcomeError>,
}

impl ReconcileOutcome {
    /// An outcome for a reconciliation that aborted; never reports a change
    pub fn failed(identity: ResourceIdentity, dry_run: bool, phases: Vec<Phase>, err: &Error) -> Self {
        Self {
            identity,
            changed: false,
            action: Action::None,
            dry_run,
            phases,
            result: None,
            changes: Vec::new(),
            diff: None,
            error: Some(err.into()),
        }
    }

    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

/// How records are shaped before they are returned
///
/// An optional projection keeps only the listed paths; secret paths are
/// always replaced with [`REDACTED`].
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ResultShape {
    #[serde(default)]
    pub returns: Option<Vec<FieldPath>>,
    #[serde(default)]
    pub secrets: Vec<FieldPath>,
}

impl ResultShape {
    pub fn new() -> Self {
        Self::default()
    }

    /// Only return these paths
    pub fn returning(mut self, paths: impl IntoIterator<Item = FieldPath>) -> Self {
        self.returns = Some(paths.into_iter().collect());
        self
    }

    /// Never return the value at this path
    pub fn secret(mut self, path: impl Into<FieldPath>) -> Self {
        self.secrets.push(path.into());
        self
    }

    /// Project and redact a record
    pub fn apply(&self, record: &Record) -> Record {
        let mut shaped = match &self.returns {
            Some(paths) => {
                let mut projected = Record::new();
                for path in paths {
                    path.project(record, &mut projected);
                }
                projected
            }
            None => record.clone(),
        };
        for secret in &self.secrets {
            if secret.lookup(&shaped).is_some_and(|v| !v.is_null()) {
                secret.assign(&mut shaped, Value::String(REDACTED.to_string()));
            }
        }
        shaped
    }

    /// Redact secret values inside field changes
    pub fn redact_changes(&self, changes: &mut [FieldChange]) {
        for change in changes {
            for secret in &self.secrets {
                if secret.contains(&change.path) {
                    redact_whole(&mut change.before);
                    redact_whole(&mut change.after);
                } else if let Some(relative) = secret.relative_to(&change.path) {
                    redact_within(&mut change.before, &relative);
                    redact_within(&mut change.after, &relative);
                }
            }
        }
    }
}

fn redact_whole(value: &mut Option<Value>) {
    if let Some(v) = value
        && !v.is_null()
    {
        *v = Value::String(REDACTED.to_string());
    }
}

fn redact_within(value: &mut Option<Value>, relative: &FieldPath) {
    if let Some(Value::Object(map)) = value
        && relative.lookup(map).is_some_and(|v| !v.is_null())
    {
        relative.assign(map, Value::String(REDACTED.to_string()));
    }
}
