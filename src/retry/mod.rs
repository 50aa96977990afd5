//! Retry with exponential backoff.
//!
//! [`retry_with_backoff`] re-invokes a failing async operation, sleeping
//! between attempts with exponentially growing, optionally jittered delays.
//! It is stateless and independent of the circuit breaker: it performs no
//! circuit-breaking of its own, so repeatedly retrying against a truly down
//! dependency is the caller's responsibility to avoid (combine with a
//! breaker, or bound `max_retries` conservatively).
//!
//! ## Usage
//!
//! ```rust,ignore
//! use tripswitch::retry::{retry_with_backoff, RetryConfig};
//! use std::time::Duration;
//!
//! let config = RetryConfig::default()
//!     .with_max_retries(4)
//!     .with_initial_delay(Duration::from_millis(100));
//!
//! let payload = retry_with_backoff(&config, || async {
//!     fetch_embedding().await
//! })
//! .await?;
//! ```

mod config;
mod executor;

pub use config::RetryConfig;
pub use executor::retry_with_backoff;
