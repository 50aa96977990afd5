//! Circuit breaker configuration.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for a circuit breaker.
///
/// A configuration is merged with defaults at construction and is immutable
/// for the lifetime of the breaker instance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CircuitBreakerConfig {
    /// Number of failures in the closed state that trips the circuit open.
    ///
    /// Failures do not need to be strictly consecutive: each success
    /// forgives exactly one prior failure, so sustained trouble still trips
    /// the breaker through intermittent successes.
    pub failure_threshold: u32,

    /// Number of consecutive successes in the half-open state required to
    /// close the circuit.
    pub success_threshold: u32,

    /// How long the circuit stays open before a probe is allowed.
    pub open_duration: Duration,

    /// Window after which the failure count would be eligible to decay.
    ///
    /// Retained for configuration compatibility; no timer currently enforces
    /// it. The per-success decay on `failure_threshold` is the only active
    /// decay mechanism.
    pub reset_window: Duration,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            success_threshold: 2,
            open_duration: Duration::from_secs(60),
            reset_window: Duration::from_secs(300),
        }
    }
}

impl CircuitBreakerConfig {
    /// Creates a new configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the failure threshold.
    pub fn with_failure_threshold(mut self, threshold: u32) -> Self {
        self.failure_threshold = threshold;
        self
    }

    /// Sets the success threshold.
    pub fn with_success_threshold(mut self, threshold: u32) -> Self {
        self.success_threshold = threshold;
        self
    }

    /// Sets the open duration.
    pub fn with_open_duration(mut self, duration: Duration) -> Self {
        self.open_duration = duration;
        self
    }

    /// Sets the reset window.
    pub fn with_reset_window(mut self, window: Duration) -> Self {
        self.reset_window = window;
        self
    }

    /// Creates a configuration that trips quickly and recovers cautiously.
    ///
    /// - Lower failure threshold (3)
    /// - More successes required to close (5)
    /// - Longer open duration (120 seconds)
    pub fn strict() -> Self {
        Self {
            failure_threshold: 3,
            success_threshold: 5,
            open_duration: Duration::from_secs(120),
            ..Self::default()
        }
    }

    /// Creates a configuration that favors availability over caution.
    ///
    /// - Higher failure threshold (10)
    /// - Fewer successes required to close (2)
    /// - Shorter open duration (10 seconds)
    pub fn high_availability() -> Self {
        Self {
            failure_threshold: 10,
            success_threshold: 2,
            open_duration: Duration::from_secs(10),
            ..Self::default()
        }
    }
}
