//! Circuit breaker for protecting calls to failing dependencies.
//!
//! The circuit breaker pattern prevents cascading failures by temporarily
//! stopping traffic to a failing downstream dependency and periodically
//! probing it to detect recovery.
//!
//! ## States
//!
//! - **Closed**: Normal operation; calls pass through and failures are
//!   counted.
//! - **Open**: Calls are rejected immediately; a timer governs when the
//!   breaker may probe again.
//! - **Half-Open**: Trial mode; a limited number of successes fully recover
//!   the circuit, any failure reopens it.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use tripswitch::circuit_breaker::{CircuitBreaker, CircuitBreakerConfig};
//! use std::time::Duration;
//!
//! let config = CircuitBreakerConfig::default()
//!     .with_failure_threshold(5)
//!     .with_open_duration(Duration::from_secs(60));
//!
//! let breaker = CircuitBreaker::new(config);
//! let result = breaker.execute(|| async { call_downstream().await }).await;
//! ```

mod breaker;
mod config;
mod state;

pub use breaker::CircuitBreaker;
pub use config::CircuitBreakerConfig;
pub use state::{CircuitBreakerStats, CircuitState};
