//! The retry executor.

use crate::retry::config::RetryConfig;
use std::future::Future;

/// Executes an async operation, retrying failures with exponential backoff.
///
/// The operation is attempted up to `max_retries + 1` times. Any success
/// returns immediately with no further delay. When the final allowed attempt
/// fails, that last error is returned; earlier attempts' errors are
/// discarded rather than aggregated.
///
/// # Example
///
/// ```rust,ignore
/// use tripswitch::retry::{retry_with_backoff, RetryConfig};
///
/// let config = RetryConfig::default();
/// let rows = retry_with_backoff(&config, || async {
///     run_query().await
/// })
/// .await?;
/// ```
pub async fn retry_with_backoff<F, Fut, T, E>(config: &RetryConfig, mut operation: F) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::fmt::Debug,
{
    let mut retries = 0;
    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(e) => {
                if retries >= config.max_retries {
                    return Err(e);
                }
                let delay = config.delay_before_retry(retries);
                tracing::debug!(
                    retry = retries + 1,
                    max_retries = config.max_retries,
                    delay_ms = delay.as_millis() as u64,
                    error = ?e,
                    "retrying after backoff"
                );
                tokio::time::sleep(delay).await;
                retries += 1;
            }
        }
    }
}
