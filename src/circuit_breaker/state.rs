//! Circuit breaker states and observability snapshots.

use serde::{Deserialize, Serialize};
use std::time::Instant;

/// The operating mode of a circuit breaker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CircuitState {
    /// Normal operation; calls pass through and failures are counted.
    Closed,

    /// Calls are rejected; the breaker waits out its open duration before
    /// allowing a probe.
    Open,

    /// Trial mode; calls are attempted as probes. Enough consecutive
    /// successes close the circuit, any failure reopens it.
    HalfOpen,
}

impl CircuitState {
    /// Returns `true` if the circuit is closed.
    pub fn is_closed(&self) -> bool {
        matches!(self, Self::Closed)
    }

    /// Returns `true` if the circuit is open.
    pub fn is_open(&self) -> bool {
        matches!(self, Self::Open)
    }

    /// Returns `true` if the circuit is half-open.
    pub fn is_half_open(&self) -> bool {
        matches!(self, Self::HalfOpen)
    }

    /// Returns the name of the state.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Closed => "closed",
            Self::Open => "open",
            Self::HalfOpen => "half_open",
        }
    }
}

impl Default for CircuitState {
    fn default() -> Self {
        Self::Closed
    }
}

/// A point-in-time snapshot of a circuit breaker's state and counters.
///
/// Returned by [`CircuitBreaker::stats`](crate::CircuitBreaker::stats). The
/// snapshot is a copy; holding onto it cannot observe or corrupt later
/// breaker state.
#[derive(Debug, Clone)]
pub struct CircuitBreakerStats {
    /// Current operating mode.
    pub state: CircuitState,
    /// Failure count of the current closed streak. Decremented by one on
    /// each success, zeroed only when the circuit fully closes.
    pub failures: u32,
    /// Consecutive successes recorded while half-open.
    pub successes: u32,
    /// When the most recent failure was observed.
    pub last_failure_at: Option<Instant>,
    /// When the most recent success was observed.
    pub last_success_at: Option<Instant>,
    /// Lifetime count of calls submitted, including rejected ones.
    pub total_requests: u64,
    /// Lifetime count of failed invocations. Rejected calls are not
    /// failures; they were never attempted.
    pub total_failures: u64,
    /// Lifetime count of calls rejected by an open circuit.
    pub rejected_requests: u64,
    /// Lifetime count of transitions into the open state.
    pub times_opened: u64,
}

impl CircuitBreakerStats {
    /// Returns the lifetime failure rate (0.0 to 1.0) over submitted calls.
    pub fn failure_rate(&self) -> f64 {
        if self.total_requests == 0 {
            return 0.0;
        }
        self.total_failures as f64 / self.total_requests as f64
    }
}
