//! Backoff for transient ARM failures
//!
//! Network errors, throttling (429) and 5xx responses are retried. When ARM
//! sends `Retry-After` it is honoured, but never beyond `max_delay`.

use crate::error::{Error, ErrorCategory, Result};
use crate::types::RetryConfig;
use std::thread;
use std::time::Duration;

/// What is about to be retried
#[derive(Debug)]
pub struct RetryNotice<'a> {
    /// Failed attempt, starting at 1
    pub attempt: u32,
    pub max_attempts: u32,
    pub error: &'a Error,
    pub delay: Duration,
    /// The delay came from the service rather than the backoff curve
    pub server_hinted: bool,
}

/// Observer for retries
pub trait RetryCallback {
    fn on_retry(&self, notice: &RetryNotice<'_>);
}

/// Logs retries at warn level; throttling gets its own wording
pub struct LogCallback;

impl RetryCallback for LogCallback {
    fn on_retry(&self, notice: &RetryNotice<'_>) {
        let wait = format!("{:.1}s", notice.delay.as_secs_f64());
        if notice.error.category() == ErrorCategory::Throttled {
            log::warn!(
                "Throttled by ARM (attempt {}/{}); waiting {wait}{}",
                notice.attempt,
                notice.max_attempts,
                if notice.server_hinted { " as asked" } else { "" }
            );
        } else {
            log::warn!(
                "Attempt {}/{} failed: {}; retrying in {wait}",
                notice.attempt,
                notice.max_attempts,
                notice.error
            );
        }
    }
}

/// Run `operation` until it succeeds, fails permanently or runs out of attempts
pub fn with_retry<T, F>(
    config: &RetryConfig,
    callback: Option<&dyn RetryCallback>,
    mut operation: F,
) -> Result<T>
where
    F: FnMut() -> Result<T>,
{
    let max_attempts = config.max_attempts.max(1);
    let mut attempt = 1;

    loop {
        let error = match operation() {
            Ok(value) => return Ok(value),
            Err(e) => e,
        };
        if attempt >= max_attempts || !error.is_retryable() {
            return Err(error);
        }

        let hinted = error.retry_after();
        let delay = match hinted {
            Some(after) => after.min(config.max_delay),
            None => config.delay_for_attempt(attempt - 1),
        };
        if let Some(cb) = callback {
            cb.on_retry(&RetryNotice {
                attempt,
                max_attempts,
                error: &error,
                delay,
                server_hinted: hinted.is_some(),
            });
        }

        thread::sleep(delay);
        attempt += 1;
    }
}
