//! Circuit breaker implementation.

use crate::circuit_breaker::config::CircuitBreakerConfig;
use crate::circuit_breaker::state::{CircuitBreakerStats, CircuitState};
use crate::error::BreakerError;

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;

/// A circuit breaker guarding calls to a single downstream dependency.
///
/// The breaker monitors failures and prevents cascading failures by
/// temporarily rejecting calls to an unhealthy dependency. Construct one
/// instance per protected dependency and keep it for the process lifetime;
/// share it across tasks behind an `Arc`.
///
/// # States
///
/// - **Closed**: Normal operation. Calls pass through, failures are counted;
///   each success forgives one prior failure.
/// - **Open**: The dependency is assumed down. Calls are rejected immediately
///   until the open duration elapses.
/// - **Half-Open**: Probing. Calls are attempted; enough consecutive
///   successes close the circuit, any failure reopens it.
///
/// Recovery is driven by two cooperating paths: a background timer scheduled
/// on every open transition flips the circuit to half-open after the open
/// duration even if no further calls arrive, and each call lazily performs
/// the same transition if the timer has not fired yet.
///
/// # Example
///
/// ```rust,ignore
/// use tripswitch::{CircuitBreaker, CircuitBreakerConfig};
///
/// let breaker = CircuitBreaker::with_defaults();
///
/// let result = breaker
///     .execute(|| async { query_database().await })
///     .await;
/// ```
#[derive(Debug)]
pub struct CircuitBreaker {
    shared: Arc<Shared>,
}

#[derive(Debug)]
struct Shared {
    /// Configuration, immutable for the breaker's lifetime.
    config: CircuitBreakerConfig,
    /// State and streak counters, mutated only under the write lock.
    cell: RwLock<BreakerCell>,
    /// Lifetime counter of submitted calls, including rejected ones.
    total_requests: AtomicU64,
    /// Lifetime counter of failed invocations.
    total_failures: AtomicU64,
    /// Lifetime counter of calls rejected by an open circuit.
    rejected_requests: AtomicU64,
    /// Lifetime counter of transitions into the open state.
    times_opened: AtomicU64,
    /// Pending open-to-half-open probe timer, if any.
    probe_timer: Mutex<Option<JoinHandle<()>>>,
}

#[derive(Debug)]
struct BreakerCell {
    state: CircuitState,
    /// Failures in the current closed streak. Decremented by one on each
    /// success, zeroed only when the circuit fully closes.
    failures: u32,
    /// Consecutive successes while half-open. Zeroed on every transition
    /// into and out of half-open.
    successes: u32,
    last_failure_at: Option<Instant>,
    last_success_at: Option<Instant>,
    /// Timer generation. A probe timer only fires if the generation it was
    /// scheduled under is still current, so superseded timers are inert even
    /// if abort loses the race.
    epoch: u64,
}

impl CircuitBreaker {
    /// Creates a new circuit breaker with the given configuration.
    pub fn new(config: CircuitBreakerConfig) -> Self {
        Self {
            shared: Arc::new(Shared {
                config,
                cell: RwLock::new(BreakerCell {
                    state: CircuitState::Closed,
                    failures: 0,
                    successes: 0,
                    last_failure_at: None,
                    last_success_at: None,
                    epoch: 0,
                }),
                total_requests: AtomicU64::new(0),
                total_failures: AtomicU64::new(0),
                rejected_requests: AtomicU64::new(0),
                times_opened: AtomicU64::new(0),
                probe_timer: Mutex::new(None),
            }),
        }
    }

    /// Creates a new circuit breaker with default configuration.
    pub fn with_defaults() -> Self {
        Self::new(CircuitBreakerConfig::default())
    }

    /// Returns the current state of the circuit.
    pub fn state(&self) -> CircuitState {
        self.cell_read().state
    }

    /// Returns `true` if the circuit is open.
    pub fn is_open(&self) -> bool {
        self.state().is_open()
    }

    /// Returns `true` if the circuit is closed.
    pub fn is_closed(&self) -> bool {
        self.state().is_closed()
    }

    /// Returns `true` if the circuit is half-open.
    pub fn is_half_open(&self) -> bool {
        self.state().is_half_open()
    }

    /// Returns a reference to the configuration.
    pub fn config(&self) -> &CircuitBreakerConfig {
        &self.shared.config
    }

    /// Returns a point-in-time snapshot of state and counters.
    ///
    /// The snapshot is a copy with no side effects; holding onto it cannot
    /// corrupt breaker state.
    pub fn stats(&self) -> CircuitBreakerStats {
        let cell = self.cell_read();
        CircuitBreakerStats {
            state: cell.state,
            failures: cell.failures,
            successes: cell.successes,
            last_failure_at: cell.last_failure_at,
            last_success_at: cell.last_success_at,
            total_requests: self.shared.total_requests.load(Ordering::Relaxed),
            total_failures: self.shared.total_failures.load(Ordering::Relaxed),
            rejected_requests: self.shared.rejected_requests.load(Ordering::Relaxed),
            times_opened: self.shared.times_opened.load(Ordering::Relaxed),
        }
    }

    /// Forces the circuit back to closed, clearing the streak counters and
    /// canceling any pending probe timer.
    ///
    /// Lifetime counters are not reset.
    pub fn reset(&self) {
        {
            let mut cell = self.cell_write();
            cell.state = CircuitState::Closed;
            cell.failures = 0;
            cell.successes = 0;
            cell.epoch += 1;
        }
        self.cancel_probe_timer();
        tracing::info!("circuit manually reset to closed");
    }

    /// Forces the circuit open, for example to take a dependency out of
    /// rotation during maintenance.
    ///
    /// A probe timer is scheduled exactly as for a failure-triggered trip,
    /// so the breaker recovers on its own once the open duration elapses.
    /// Must be called from within a Tokio runtime.
    pub fn force_open(&self) {
        let mut cell = self.cell_write();
        cell.state = CircuitState::Open;
        cell.successes = 0;
        cell.last_failure_at = Some(Instant::now());
        cell.epoch += 1;
        let epoch = cell.epoch;
        self.schedule_probe_timer(epoch);
        drop(cell);
        self.shared.times_opened.fetch_add(1, Ordering::Relaxed);
        tracing::warn!("circuit forced open");
    }

    /// Executes `operation` under the protection of the breaker.
    ///
    /// While the circuit is open and the probe window has not arrived, the
    /// operation is not invoked and [`BreakerError::Open`] is returned. A
    /// failure of the operation itself is propagated unmodified inside
    /// [`BreakerError::Inner`].
    pub async fn execute<F, Fut, T, E>(&self, operation: F) -> Result<T, BreakerError<E>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        self.shared.total_requests.fetch_add(1, Ordering::Relaxed);

        if let Err(retry_after) = self.begin_attempt() {
            self.shared.rejected_requests.fetch_add(1, Ordering::Relaxed);
            return Err(BreakerError::Open { retry_after });
        }

        match operation().await {
            Ok(value) => {
                self.on_success();
                Ok(value)
            }
            Err(e) => {
                self.on_failure();
                Err(BreakerError::Inner(e))
            }
        }
    }

    /// Executes `operation`, serving `fallback` when the call is rejected by
    /// an open circuit or when the operation itself fails.
    ///
    /// The fallback's outcome always wins once it is invoked: its success
    /// value is returned, and its error replaces both the open-circuit
    /// rejection and the original downstream error.
    pub async fn execute_with_fallback<F, Fut, G, GFut, T, E>(
        &self,
        operation: F,
        fallback: G,
    ) -> Result<T, BreakerError<E>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        G: FnOnce() -> GFut,
        GFut: Future<Output = Result<T, E>>,
    {
        self.shared.total_requests.fetch_add(1, Ordering::Relaxed);

        if self.begin_attempt().is_err() {
            self.shared.rejected_requests.fetch_add(1, Ordering::Relaxed);
            tracing::debug!("circuit open, serving fallback");
            return fallback().await.map_err(BreakerError::Inner);
        }

        match operation().await {
            Ok(value) => {
                self.on_success();
                Ok(value)
            }
            Err(_) => {
                self.on_failure();
                tracing::debug!("call failed, serving fallback");
                fallback().await.map_err(BreakerError::Inner)
            }
        }
    }

    /// Decides whether a call may proceed, lazily moving an expired open
    /// circuit to half-open. Returns the remaining open time on rejection.
    fn begin_attempt(&self) -> Result<(), Option<Duration>> {
        let mut cell = self.cell_write();
        let state = cell.state;
        match state {
            CircuitState::Closed | CircuitState::HalfOpen => Ok(()),
            CircuitState::Open => {
                let elapsed = cell.last_failure_at.map(|at| at.elapsed());
                match elapsed {
                    Some(elapsed) if elapsed >= self.shared.config.open_duration => {
                        cell.state = CircuitState::HalfOpen;
                        cell.successes = 0;
                        cell.epoch += 1;
                        drop(cell);
                        self.cancel_probe_timer();
                        tracing::info!("circuit half-open, probing for recovery");
                        Ok(())
                    }
                    Some(elapsed) => {
                        Err(Some(self.shared.config.open_duration.saturating_sub(elapsed)))
                    }
                    None => Err(None),
                }
            }
        }
    }

    /// Records a completed invocation that succeeded.
    fn on_success(&self) {
        let mut cell = self.cell_write();
        cell.last_success_at = Some(Instant::now());

        let state = cell.state;
        match state {
            CircuitState::HalfOpen => {
                cell.successes += 1;
                if cell.successes >= self.shared.config.success_threshold {
                    cell.state = CircuitState::Closed;
                    cell.failures = 0;
                    cell.successes = 0;
                    cell.epoch += 1;
                    drop(cell);
                    self.cancel_probe_timer();
                    tracing::info!("circuit closed, normal operation resumed");
                }
            }
            CircuitState::Closed => {
                // One success forgives exactly one prior failure.
                cell.failures = cell.failures.saturating_sub(1);
            }
            // An in-flight call landed after another caller tripped the
            // circuit; the outcome no longer changes state.
            CircuitState::Open => {}
        }
    }

    /// Records a completed invocation that failed.
    fn on_failure(&self) {
        self.shared.total_failures.fetch_add(1, Ordering::Relaxed);

        let mut cell = self.cell_write();
        cell.last_failure_at = Some(Instant::now());

        let state = cell.state;
        match state {
            CircuitState::HalfOpen => {
                // Any failure during probing reopens the circuit.
                cell.state = CircuitState::Open;
                cell.successes = 0;
                cell.epoch += 1;
                let epoch = cell.epoch;
                self.schedule_probe_timer(epoch);
                drop(cell);
                self.shared.times_opened.fetch_add(1, Ordering::Relaxed);
                tracing::warn!("probe failed, circuit reopened");
            }
            CircuitState::Closed => {
                cell.failures += 1;
                if cell.failures >= self.shared.config.failure_threshold {
                    cell.state = CircuitState::Open;
                    cell.successes = 0;
                    cell.epoch += 1;
                    let epoch = cell.epoch;
                    let failures = cell.failures;
                    self.schedule_probe_timer(epoch);
                    drop(cell);
                    self.shared.times_opened.fetch_add(1, Ordering::Relaxed);
                    tracing::warn!(failures, "failure threshold reached, circuit opened");
                }
            }
            CircuitState::Open => {}
        }
    }

    /// Schedules the open-to-half-open transition, replacing (never
    /// stacking) any previously pending timer.
    ///
    /// The timer fires independently of traffic; a breaker with no further
    /// calls still moves to half-open once the open duration elapses.
    fn schedule_probe_timer(&self, epoch: u64) {
        let shared = Arc::clone(&self.shared);
        let delay = self.shared.config.open_duration;
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let mut cell = shared
                .cell
                .write()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            if cell.state.is_open() && cell.epoch == epoch {
                cell.state = CircuitState::HalfOpen;
                cell.successes = 0;
                cell.epoch += 1;
                tracing::info!("circuit half-open, probing for recovery");
            }
        });

        let mut slot = self
            .shared
            .probe_timer
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Some(old) = slot.replace(handle) {
            old.abort();
        }
    }

    fn cancel_probe_timer(&self) {
        let mut slot = self
            .shared
            .probe_timer
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Some(handle) = slot.take() {
            handle.abort();
        }
    }

    fn cell_read(&self) -> std::sync::RwLockReadGuard<'_, BreakerCell> {
        self.shared
            .cell
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn cell_write(&self) -> std::sync::RwLockWriteGuard<'_, BreakerCell> {
        self.shared
            .cell
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Drop for CircuitBreaker {
    fn drop(&mut self) {
        self.cancel_probe_timer();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicU32;

    fn quick_config(failure_threshold: u32, open_ms: u64) -> CircuitBreakerConfig {
        CircuitBreakerConfig::default()
            .with_failure_threshold(failure_threshold)
            .with_success_threshold(2)
            .with_open_duration(Duration::from_millis(open_ms))
    }

    async fn fail(breaker: &CircuitBreaker) {
        let _ = breaker
            .execute(|| async { Err::<(), String>("downstream failure".into()) })
            .await;
    }

    async fn succeed(breaker: &CircuitBreaker) {
        breaker
            .execute(|| async { Ok::<(), String>(()) })
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_passes_through_when_closed() {
        let breaker = CircuitBreaker::with_defaults();

        let result = breaker.execute(|| async { Ok::<_, String>(42) }).await;

        assert_eq!(result.unwrap(), 42);
        assert!(breaker.is_closed());
        let stats = breaker.stats();
        assert_eq!(stats.total_requests, 1);
        assert_eq!(stats.total_failures, 0);
        assert!(stats.last_success_at.is_some());
    }

    #[tokio::test]
    async fn test_opens_after_failure_threshold() {
        let breaker = CircuitBreaker::new(quick_config(3, 60_000));

        for _ in 0..3 {
            fail(&breaker).await;
        }

        assert!(breaker.is_open());
        let stats = breaker.stats();
        assert_eq!(stats.failures, 3);
        assert_eq!(stats.total_failures, 3);
        assert_eq!(stats.times_opened, 1);
    }

    #[tokio::test]
    async fn test_downstream_error_propagates_unmodified() {
        let breaker = CircuitBreaker::with_defaults();

        let result = breaker
            .execute(|| async { Err::<(), String>("connection refused".into()) })
            .await;

        match result {
            Err(BreakerError::Inner(e)) => assert_eq!(e, "connection refused"),
            other => panic!("expected Inner error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_success_forgives_one_failure() {
        let breaker = CircuitBreaker::new(quick_config(3, 60_000));

        fail(&breaker).await;
        fail(&breaker).await;
        assert_eq!(breaker.stats().failures, 2);

        succeed(&breaker).await;
        assert_eq!(breaker.stats().failures, 1);
        assert!(breaker.is_closed());

        // Forgiveness is partial: two more failures still trip the breaker.
        fail(&breaker).await;
        fail(&breaker).await;
        assert!(breaker.is_open());
    }

    #[tokio::test]
    async fn test_forgiveness_floors_at_zero() {
        let breaker = CircuitBreaker::new(quick_config(3, 60_000));

        succeed(&breaker).await;
        succeed(&breaker).await;
        assert_eq!(breaker.stats().failures, 0);
    }

    #[tokio::test]
    async fn test_rejects_before_open_duration_elapses() {
        let breaker = CircuitBreaker::new(quick_config(1, 60_000));

        fail(&breaker).await;
        assert!(breaker.is_open());

        let result = breaker.execute(|| async { Ok::<_, String>(()) }).await;
        match result {
            Err(e) => {
                assert!(e.is_open());
                assert!(e.retry_after().is_some());
            }
            Ok(()) => panic!("expected open-circuit rejection"),
        }

        // Rejected calls count as requests but never as failures.
        let stats = breaker.stats();
        assert_eq!(stats.total_requests, 2);
        assert_eq!(stats.total_failures, 1);
        assert_eq!(stats.rejected_requests, 1);
    }

    #[tokio::test]
    async fn test_probe_allowed_after_open_duration() {
        let breaker = CircuitBreaker::new(quick_config(1, 100));

        fail(&breaker).await;
        assert!(breaker.is_open());

        tokio::time::sleep(Duration::from_millis(150)).await;

        let attempted = AtomicU32::new(0);
        let result = breaker
            .execute(|| async {
                attempted.fetch_add(1, Ordering::SeqCst);
                Ok::<_, String>(())
            })
            .await;

        assert!(result.is_ok());
        assert_eq!(attempted.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_background_timer_flips_without_traffic() {
        let breaker = CircuitBreaker::new(quick_config(1, 100));

        fail(&breaker).await;
        assert!(breaker.is_open());

        // No further calls; the scheduled timer alone performs the
        // transition.
        tokio::time::sleep(Duration::from_millis(200)).await;
        assert!(breaker.is_half_open());
    }

    #[tokio::test]
    async fn test_half_open_closes_after_success_threshold() {
        let breaker = CircuitBreaker::new(quick_config(2, 100));

        fail(&breaker).await;
        fail(&breaker).await;
        tokio::time::sleep(Duration::from_millis(150)).await;

        succeed(&breaker).await;
        assert!(breaker.is_half_open());
        assert_eq!(breaker.stats().successes, 1);

        succeed(&breaker).await;
        assert!(breaker.is_closed());
        let stats = breaker.stats();
        assert_eq!(stats.failures, 0);
        assert_eq!(stats.successes, 0);
    }

    #[tokio::test]
    async fn test_half_open_failure_reopens_with_fresh_timer() {
        let breaker = CircuitBreaker::new(quick_config(2, 100));

        fail(&breaker).await;
        fail(&breaker).await;
        tokio::time::sleep(Duration::from_millis(150)).await;

        succeed(&breaker).await;
        assert!(breaker.is_half_open());

        fail(&breaker).await;
        assert!(breaker.is_open());
        let stats = breaker.stats();
        assert_eq!(stats.successes, 0);
        assert_eq!(stats.times_opened, 2);

        // Immediately after the relapse the circuit rejects again.
        let result = breaker.execute(|| async { Ok::<_, String>(()) }).await;
        assert!(matches!(result, Err(BreakerError::Open { .. })));

        // The replacement timer drives recovery a second time.
        tokio::time::sleep(Duration::from_millis(200)).await;
        assert!(breaker.is_half_open());
    }

    #[tokio::test]
    async fn test_fallback_served_when_open_without_invoking_primary() {
        let breaker = CircuitBreaker::new(quick_config(1, 60_000));
        fail(&breaker).await;
        assert!(breaker.is_open());

        let primary_calls = AtomicU32::new(0);
        let result = breaker
            .execute_with_fallback(
                || async {
                    primary_calls.fetch_add(1, Ordering::SeqCst);
                    Ok::<_, String>("primary")
                },
                || async { Ok("cached") },
            )
            .await;

        assert_eq!(result.unwrap(), "cached");
        assert_eq!(primary_calls.load(Ordering::SeqCst), 0);
        // The blocked call is not a failure.
        assert_eq!(breaker.stats().total_failures, 1);
    }

    #[tokio::test]
    async fn test_fallback_served_on_primary_failure() {
        let breaker = CircuitBreaker::with_defaults();

        let result = breaker
            .execute_with_fallback(
                || async { Err::<&str, String>("downstream failure".into()) },
                || async { Ok("degraded") },
            )
            .await;

        assert_eq!(result.unwrap(), "degraded");
        // The primary failure was still recorded against the breaker.
        let stats = breaker.stats();
        assert_eq!(stats.failures, 1);
        assert_eq!(stats.total_failures, 1);
    }

    #[tokio::test]
    async fn test_fallback_error_wins() {
        let breaker = CircuitBreaker::new(quick_config(1, 60_000));
        fail(&breaker).await;

        let result = breaker
            .execute_with_fallback(
                || async { Ok::<_, String>("primary") },
                || async { Err("fallback also down".into()) },
            )
            .await;

        match result {
            Err(BreakerError::Inner(e)) => assert_eq!(e, "fallback also down"),
            other => panic!("expected fallback error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_reset_clears_streaks_but_not_totals() {
        let breaker = CircuitBreaker::new(quick_config(2, 100));

        fail(&breaker).await;
        fail(&breaker).await;
        assert!(breaker.is_open());

        breaker.reset();

        let stats = breaker.stats();
        assert!(stats.state.is_closed());
        assert_eq!(stats.failures, 0);
        assert_eq!(stats.successes, 0);
        assert_eq!(stats.total_requests, 2);
        assert_eq!(stats.total_failures, 2);

        // The canceled probe timer no longer fires.
        tokio::time::sleep(Duration::from_millis(150)).await;
        assert!(breaker.is_closed());
    }

    #[tokio::test]
    async fn test_force_open_then_recovers() {
        let breaker = CircuitBreaker::new(quick_config(5, 100));

        breaker.force_open();
        assert!(breaker.is_open());

        let result = breaker.execute(|| async { Ok::<_, String>(()) }).await;
        assert!(matches!(result, Err(BreakerError::Open { .. })));

        tokio::time::sleep(Duration::from_millis(150)).await;
        succeed(&breaker).await;
        succeed(&breaker).await;
        assert!(breaker.is_closed());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_failures_eventually_open() {
        let breaker = Arc::new(CircuitBreaker::new(quick_config(10, 60_000)));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let breaker = Arc::clone(&breaker);
            handles.push(tokio::spawn(async move {
                for _ in 0..5 {
                    let _ = breaker
                        .execute(|| async { Err::<(), String>("downstream failure".into()) })
                        .await;
                }
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        assert!(breaker.is_open());
        let stats = breaker.stats();
        assert!(stats.total_failures >= 10);
        assert_eq!(stats.total_requests, 40);
    }
}
