//! Jittered delays.

use std::fmt;
use std::time::Duration;

/// A base delay with a symmetric random perturbation.
///
/// Each [`sample`](Self::sample) draws a value uniformly from
/// `[delay - jitter, delay + jitter]`. Values that would be negative are
/// clamped to zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct JitteredDelay {
    /// Base delay.
    pub delay: Duration,
    /// Maximum perturbation in either direction.
    pub jitter: Duration,
}

impl JitteredDelay {
    /// Creates a new jittered delay.
    pub fn new(delay: Duration, jitter: Duration) -> Self {
        Self { delay, jitter }
    }

    /// Creates a delay without jitter.
    pub fn fixed(delay: Duration) -> Self {
        Self::new(delay, Duration::ZERO)
    }

    /// Creates a delay from fractional seconds. Negative inputs count as zero.
    pub fn from_secs_f64(delay: f64, jitter: f64) -> Self {
        Self::new(secs_to_duration(delay), secs_to_duration(jitter))
    }

    /// Smallest value [`sample`](Self::sample) can return.
    pub fn lower_bound(&self) -> Duration {
        self.delay.saturating_sub(self.jitter)
    }

    /// Largest value [`sample`](Self::sample) can return.
    pub fn upper_bound(&self) -> Duration {
        self.delay.saturating_add(self.jitter)
    }

    /// Draws a concrete wait duration.
    pub fn sample(&self) -> Duration {
        self.sample_with(fastrand::f64())
    }

    /// Maps `unit` in `[0, 1)` onto `[delay - jitter, delay + jitter]`.
    fn sample_with(&self, unit: f64) -> Duration {
        let offset = (unit * 2.0 - 1.0) * self.jitter.as_secs_f64();
        let secs = self.delay.as_secs_f64() + offset;

        if secs <= 0.0 {
            return Duration::ZERO;
        }

        Duration::try_from_secs_f64(secs)
            .unwrap_or(Duration::MAX)
            .clamp(self.lower_bound(), self.upper_bound())
    }
}

fn secs_to_duration(secs: f64) -> Duration {
    Duration::try_from_secs_f64(secs.max(0.0)).unwrap_or(Duration::MAX)
}

impl fmt::Display for JitteredDelay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:.1}±{:.1} seconds",
            self.delay.as_secs_f64(),
            self.jitter.as_secs_f64()
        )
    }
}
