//! Error types for the tripswitch library.
//!
//! The breaker never swallows errors: a guarded call either returns the
//! primary result, a successful fallback value, or an error from this module.
//! Downstream failures are carried unmodified inside [`BreakerError::Inner`]
//! so callers retain the original error's type and message.

use std::time::Duration;
use thiserror::Error;

/// Error returned by a circuit-breaker guarded call.
///
/// Two cases are distinguished so callers can branch on "the breaker blocked
/// me" versus "the call itself failed":
///
/// - [`BreakerError::Open`] is synthetic: the circuit was open, no probe
///   window had arrived, and no fallback was supplied. The wrapped operation
///   was never invoked.
/// - [`BreakerError::Inner`] wraps the downstream error exactly as the
///   operation (or fallback) produced it.
#[derive(Debug, Error)]
pub enum BreakerError<E> {
    /// The circuit is open; the request was rejected without attempting
    /// the operation.
    #[error("circuit breaker is open")]
    Open {
        /// Time remaining until the breaker allows a probe, if known.
        retry_after: Option<Duration>,
    },

    /// The operation (or the fallback, when one was invoked) failed.
    #[error(transparent)]
    Inner(E),
}

impl<E> BreakerError<E> {
    /// Returns `true` if the request was rejected by an open circuit.
    pub fn is_open(&self) -> bool {
        matches!(self, Self::Open { .. })
    }

    /// Returns the downstream error, if the operation was actually attempted.
    pub fn into_inner(self) -> Option<E> {
        match self {
            Self::Inner(e) => Some(e),
            Self::Open { .. } => None,
        }
    }

    /// Returns the suggested wait before the next attempt, for open-circuit
    /// rejections that know when the probe window arrives.
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            Self::Open { retry_after } => *retry_after,
            Self::Inner(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_display() {
        let err: BreakerError<String> = BreakerError::Open {
            retry_after: Some(Duration::from_secs(30)),
        };
        assert_eq!(err.to_string(), "circuit breaker is open");
        assert!(err.is_open());
        assert_eq!(err.retry_after(), Some(Duration::from_secs(30)));
    }

    #[test]
    fn test_inner_passthrough() {
        let err: BreakerError<String> = BreakerError::Inner("connection refused".to_string());
        assert_eq!(err.to_string(), "connection refused");
        assert!(!err.is_open());
        assert_eq!(err.into_inner(), Some("connection refused".to_string()));
    }

    #[test]
    fn test_open_has_no_inner() {
        let err: BreakerError<String> = BreakerError::Open { retry_after: None };
        assert_eq!(err.into_inner(), None);
    }
}
