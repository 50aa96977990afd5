//! Circuit breaker demo.
//!
//! This demo shows how to:
//! - Guard a flaky downstream call with a circuit breaker
//! - Serve a fallback while the circuit is open
//! - Watch the breaker trip, probe, and recover
//!
//! Run with: cargo run --example protected_call

use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;
use tripswitch::{BreakerError, CircuitBreaker, CircuitBreakerConfig};

/// A pretend downstream dependency that is down for its first three calls,
/// then recovers.
async fn flaky_lookup(calls: &AtomicU32) -> Result<String, String> {
    let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
    tokio::time::sleep(Duration::from_millis(10)).await;
    if n <= 3 {
        Err(format!("connection refused (call #{n})"))
    } else {
        Ok(format!("fresh result #{n}"))
    }
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("debug")),
        )
        .init();

    let config = CircuitBreakerConfig::default()
        .with_failure_threshold(3)
        .with_success_threshold(2)
        .with_open_duration(Duration::from_secs(2));
    let breaker = CircuitBreaker::new(config);

    let downstream_calls = AtomicU32::new(0);

    for i in 1..=12 {
        let outcome = breaker
            .execute_with_fallback(
                || flaky_lookup(&downstream_calls),
                || async { Ok("cached result".to_string()) },
            )
            .await;

        let stats = breaker.stats();
        match outcome {
            Ok(value) => println!("request #{i:2}: {value} [state={}]", stats.state.name()),
            Err(e) => println!("request #{i:2}: error: {e} [state={}]", stats.state.name()),
        }

        // Give the breaker time to reach its probe window partway through.
        if i == 8 {
            println!("-- waiting out the open duration --");
            tokio::time::sleep(Duration::from_millis(2100)).await;
        }
    }

    let stats = breaker.stats();
    println!(
        "\nfinal: state={} requests={} failures={} rejected={} opened={} ({}% failure rate)",
        stats.state.name(),
        stats.total_requests,
        stats.total_failures,
        stats.rejected_requests,
        stats.times_opened,
        (stats.failure_rate() * 100.0).round()
    );

    // A rejection without a fallback is distinguishable from a downstream
    // error, so callers can branch on it.
    let bare = CircuitBreaker::new(CircuitBreakerConfig::default().with_failure_threshold(1));
    let _ = bare
        .execute(|| async { Err::<(), String>("boom".into()) })
        .await;
    match bare.execute(|| async { Ok::<(), String>(()) }).await {
        Err(BreakerError::Open { retry_after }) => {
            println!("blocked by open circuit, retry after {retry_after:?}");
        }
        other => println!("unexpected: {other:?}"),
    }
}
