//! # Tripswitch
//!
//! Circuit breaker and backoff-retry primitives for protecting calls to
//! failing dependencies.
//!
//! ## Overview
//!
//! Tripswitch provides two independent, composable building blocks:
//!
//! - [`CircuitBreaker`]: a stateful guard around a remote call (a database
//!   query, an HTTP request, a model invocation). It tracks recent failures,
//!   fails fast while the dependency is known-bad, and periodically probes
//!   for recovery.
//! - [`retry_with_backoff`]: a stateless helper that re-invokes a failing
//!   operation with exponentially growing, optionally jittered delays.
//!
//! Either can be used alone. A retrying call may be wrapped inside a breaker
//! (retries happen within a single guarded attempt), or a guarded call inside
//! a retry loop (each attempt independently consults the breaker). Neither
//! composition happens automatically; that choice belongs to the caller.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use tripswitch::{CircuitBreaker, CircuitBreakerConfig};
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = CircuitBreakerConfig::default()
//!         .with_failure_threshold(5)
//!         .with_open_duration(Duration::from_secs(60));
//!     let breaker = CircuitBreaker::new(config);
//!
//!     let result = breaker
//!         .execute(|| async { fetch_recommendations().await })
//!         .await;
//! }
//! ```
//!
//! ## Architecture
//!
//! - **Circuit Breaker**: the three-state machine (closed, open, half-open),
//!   its configuration, and observability snapshots
//! - **Retry**: exponential backoff computation and the retry executor
//! - **Error**: a typed error that lets callers distinguish "the breaker
//!   blocked me" from "the call itself failed"
//!
//! Breaker state is in-process and per-instance. Construct one breaker per
//! protected dependency and share it (for example behind an `Arc`); there is
//! no global registry and no cross-process coordination.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod circuit_breaker;
pub mod error;
pub mod retry;

// Re-export commonly used types at the crate root
pub use crate::circuit_breaker::{
    CircuitBreaker, CircuitBreakerConfig, CircuitBreakerStats, CircuitState,
};
pub use crate::error::BreakerError;
pub use crate::retry::{retry_with_backoff, RetryConfig};

/// Prelude module for convenient imports.
///
/// ```rust
/// use tripswitch::prelude::*;
/// ```
pub mod prelude {
    pub use crate::circuit_breaker::{
        CircuitBreaker, CircuitBreakerConfig, CircuitBreakerStats, CircuitState,
    };
    pub use crate::error::BreakerError;
    pub use crate::retry::{retry_with_backoff, RetryConfig};
}
