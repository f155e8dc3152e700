//! Exponential backoff for retrying failed status checks.
//!
//! When a status request fails, the poller stretches the wait before the
//! next attempt with [`next_delay`] instead of hammering a struggling
//! provider. A successful check resets the delay to the base interval.

use std::time::Duration;

/// Tunable parameters for the exponential-backoff strategy.
#[derive(Debug, Clone)]
pub struct BackoffConfig {
    /// Delay used while everything is healthy.
    pub initial_delay: Duration,
    /// Upper bound on the delay between attempts.
    pub max_delay: Duration,
    /// Factor by which the delay grows after each failure.
    pub multiplier: f64,
}

impl BackoffConfig {
    /// Backoff starting at the polling interval, capped at `max_delay`
    /// (or at the interval itself if that is larger).
    pub fn for_interval(interval: Duration, max_delay: Duration) -> Self {
        Self {
            initial_delay: interval,
            max_delay: max_delay.max(interval),
            multiplier: 2.0,
        }
    }
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_secs(3),
            max_delay: Duration::from_secs(30),
            multiplier: 2.0,
        }
    }
}

/// Calculate the next backoff delay from the current delay and config.
///
/// The result is clamped to [`BackoffConfig::max_delay`].
pub fn next_delay(current: Duration, config: &BackoffConfig) -> Duration {
    let next_ms = (current.as_millis() as f64 * config.multiplier) as u64;
    Duration::from_millis(next_ms).min(config.max_delay)
}
