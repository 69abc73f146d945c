//! Per-job run statistics.

use std::time::Instant;

use parking_lot::RwLock;

#[derive(Debug, Default)]
struct Counters {
    attempts: u64,
    successes: u64,
    consecutive_failures: u32,
    last_success: Option<Instant>,
    last_error: Option<String>,
}

/// Tracks the outcome of every sync attempt of one job.
#[derive(Debug, Default)]
pub struct JobStats {
    inner: RwLock<Counters>,
}

impl JobStats {
    /// Creates empty statistics.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a successful attempt.
    pub fn record_success(&self) {
        let mut inner = self.inner.write();
        inner.attempts += 1;
        inner.successes += 1;
        inner.consecutive_failures = 0;
        inner.last_success = Some(Instant::now());
        inner.last_error = None;
    }

    /// Records a failed attempt.
    pub fn record_failure(&self, error: impl Into<String>) {
        let mut inner = self.inner.write();
        inner.attempts += 1;
        inner.consecutive_failures += 1;
        inner.last_error = Some(error.into());
    }

    /// Returns the number of finished attempts.
    pub fn attempts(&self) -> u64 {
        self.inner.read().attempts
    }

    /// Returns the number of successful attempts.
    pub fn successes(&self) -> u64 {
        self.inner.read().successes
    }

    /// Returns the number of failures since the last success.
    pub fn consecutive_failures(&self) -> u32 {
        self.inner.read().consecutive_failures
    }

    /// Returns when the job last succeeded.
    pub fn last_success(&self) -> Option<Instant> {
        self.inner.read().last_success
    }

    /// Returns the error of the last attempt, if it failed.
    pub fn last_error(&self) -> Option<String> {
        self.inner.read().last_error.clone()
    }

    /// Returns true if the last attempt succeeded.
    pub fn is_healthy(&self) -> bool {
        let inner = self.inner.read();
        inner.successes > 0 && inner.last_error.is_none()
    }
}
