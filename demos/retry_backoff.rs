//! Retry with backoff demo.
//!
//! Run with: cargo run --example retry_backoff

use std::sync::atomic::{AtomicU32, Ordering};
use std::time::{Duration, Instant};
use tripswitch::{retry_with_backoff, RetryConfig};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("debug")),
        )
        .init();

    let config = RetryConfig::default()
        .with_max_retries(4)
        .with_initial_delay(Duration::from_millis(100))
        .with_max_delay(Duration::from_secs(1));

    println!("delays before each retry (jitter on):");
    for retry in 0..4 {
        println!("  retry {}: {:?}", retry + 1, config.delay_before_retry(retry));
    }

    let attempts = AtomicU32::new(0);
    let started = Instant::now();

    let result = retry_with_backoff(&config, || {
        let n = attempts.fetch_add(1, Ordering::SeqCst) + 1;
        async move {
            if n < 4 {
                Err(format!("transient failure on attempt {n}"))
            } else {
                Ok(format!("succeeded on attempt {n}"))
            }
        }
    })
    .await;

    println!(
        "\n{} after {:?} ({} attempts)",
        result.unwrap(),
        started.elapsed(),
        attempts.load(Ordering::SeqCst)
    );
}
