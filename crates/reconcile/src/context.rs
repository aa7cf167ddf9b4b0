//! Progress and confirmation hooks
//!
//! These traits keep the executor free of any terminal UI; the CLI
//! provides implementations backed by progress bars and prompts.

use crate::identity::ResourceIdentity;
use crate::outcome::ReconcileOutcome;
use crate::state::Ensure;
use std::io;

/// Progress callback for plan execution
pub trait ProgressCallback: Send {
    /// Called when a wave of units starts
    fn on_wave_start(&mut self, tier: u32, ensure: Ensure, count: usize);

    /// Called when a single unit starts (sequential execution only)
    fn on_unit_start(&mut self, identity: &ResourceIdentity);

    /// Called when a unit finishes
    fn on_unit_complete(&mut self, outcome: &ReconcileOutcome);

    /// Called when a wave completes
    fn on_wave_complete(&mut self);
}

/// Confirmation callback for user interaction
pub trait ConfirmCallback: Send {
    /// Ask whether the pending changes should be applied
    ///
    /// `pending` holds the dry-run outcomes of every unit that would change.
    fn confirm(&mut self, pending: &[&ReconcileOutcome]) -> io::Result<bool>;
}

/// No-op progress callback
pub struct NoProgress;

impl ProgressCallback for NoProgress {
    fn on_wave_start(&mut self, _tier: u32, _ensure: Ensure, _count: usize) {}
    fn on_unit_start(&mut self, _identity: &ResourceIdentity) {}
    fn on_unit_complete(&mut self, _outcome: &ReconcileOutcome) {}
    fn on_wave_complete(&mut self) {}
}

/// Auto-confirm callback (always returns true)
pub struct AutoConfirm;

impl ConfirmCallback for AutoConfirm {
    fn confirm(&mut self, _pending: &[&ReconcileOutcome]) -> io::Result<bool> {
        Ok(true)
    }
}

/// Auto-decline callback (always returns false)
pub struct AutoDecline;

impl ConfirmCallback for AutoDecline {
    fn confirm(&mut self, _pending: &[&ReconcileOutcome]) -> io::Result<bool> {
        Ok(false)
    }
}
