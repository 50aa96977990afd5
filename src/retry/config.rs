//! Retry configuration and backoff delay computation.

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for retry behavior.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Maximum number of retries after the initial attempt, so an operation
    /// is attempted at most `max_retries + 1` times.
    pub max_retries: u32,

    /// Delay before the first retry. Each subsequent retry doubles it.
    pub initial_delay: Duration,

    /// Upper bound on the computed delay, before jitter.
    pub max_delay: Duration,

    /// Whether to add a random amount of up to 20% of the base delay.
    ///
    /// Jitter is additive only; it never shortens a delay. It spreads out
    /// retry storms when many callers back off in lockstep.
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(5),
            jitter: true,
        }
    }
}

impl RetryConfig {
    /// Creates a new retry configuration with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Disables retries; the operation is attempted exactly once.
    pub fn no_retry() -> Self {
        Self {
            max_retries: 0,
            ..Self::default()
        }
    }

    /// Sets the maximum number of retries.
    pub fn with_max_retries(mut self, retries: u32) -> Self {
        self.max_retries = retries;
        self
    }

    /// Sets the delay before the first retry.
    pub fn with_initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = delay;
        self
    }

    /// Sets the maximum delay.
    pub fn with_max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    /// Enables or disables jitter.
    pub fn with_jitter(mut self, jitter: bool) -> Self {
        self.jitter = jitter;
        self
    }

    /// Computes the delay before the retry with the given 0-based index.
    ///
    /// The base delay is `initial_delay * 2^retry_index`, capped at
    /// `max_delay`. With jitter enabled, a uniformly random amount in
    /// `[0, base / 5)` is added on top.
    pub fn delay_before_retry(&self, retry_index: u32) -> Duration {
        let initial_ms = self.initial_delay.as_millis() as u64;
        let max_ms = self.max_delay.as_millis() as u64;
        let base_ms = initial_ms
            .saturating_mul(2u64.saturating_pow(retry_index))
            .min(max_ms);

        let jitter_ms = if self.jitter {
            let bound = base_ms / 5;
            if bound > 0 {
                rand::thread_rng().gen_range(0..bound)
            } else {
                0
            }
        } else {
            0
        };

        Duration::from_millis(base_ms + jitter_ms)
    }
}
