use std::time::Duration;

use backoff::{ExponentialBackoff, ExponentialBackoffBuilder};

/// How transient model failures are retried.
///
/// Only failures whose [`ErrorKind`](intellibot_model::ErrorKind) is
/// transient are retried, and only while starting a request. Once a
/// response has begun streaming, a failure ends the turn.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RetryPolicy {
    max_attempts: usize,
    initial_interval: Duration,
    max_interval: Duration,
}

impl RetryPolicy {
    /// Creates a policy that tries a request at most `max_attempts` times.
    /// Zero is treated as one.
    #[inline]
    pub fn new(max_attempts: usize) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            ..Default::default()
        }
    }

    /// A policy that never retries.
    #[inline]
    pub fn none() -> Self {
        Self::new(1)
    }

    /// Sets the first wait and the cap for the exponentially growing waits.
    #[inline]
    pub fn with_intervals(mut self, initial: Duration, max: Duration) -> Self {
        self.initial_interval = initial;
        self.max_interval = max.max(initial);
        self
    }

    /// Returns the maximum number of attempts.
    #[inline]
    pub fn max_attempts(&self) -> usize {
        self.max_attempts
    }

    pub(crate) fn backoff(&self) -> ExponentialBackoff {
        ExponentialBackoffBuilder::new()
            .with_initial_interval(self.initial_interval)
            .with_max_interval(self.max_interval)
            // Attempts are bounded by `max_attempts` instead.
            .with_max_elapsed_time(None)
            .build()
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 4,
            initial_interval: Duration::from_millis(500),
            max_interval: Duration::from_secs(8),
        }
    }
}
