//! Resilient execution of provider operations.
//!
//! # Responsibilities
//! - Gate every attempt through the rate limiter, then the circuit breaker
//! - Run admitted attempts against the active provider on a blocking worker
//! - Retry failed attempts after a non-blocking delay until the budget is spent
//! - Resolve each submission's handle exactly once
//!
//! # State Machine
//! ```text
//! Attempting ──success──────────────▶ Done(Ok)
//!     │ ──rejected by a gate─────────▶ Done(Err)     (no retry, budget untouched)
//!     │ ──failed, budget spent───────▶ Done(Err(OperationFailed))
//!     └──failed, retries left──▶ Waiting(delay) ──timer──▶ Attempting
//!                                   │ ──cancel / shutdown / deadline──▶ Done(Err)
//! ```

use std::any::Any;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;

use tokio::sync::{oneshot, Notify};
use tracing::Instrument;
use uuid::Uuid;

use crate::error::{VaultError, VaultResult};
use crate::lifecycle::shutdown::{Shutdown, ShutdownSignal};
use crate::observability::metrics;
use crate::provider::{EconomyProvider, ProviderError, ProviderRegistry};
use crate::resilience::backoff::BackoffStrategy;
use crate::resilience::circuit_breaker::CircuitBreaker;
use crate::resilience::rate_limiter::RateLimiter;
use crate::resilience::retries::{RetryBudget, SubmitOptions};
use crate::resilience::timeouts::Deadline;

/// Orchestrates the admission gates and retries around provider operations.
///
/// Cheap to clone; clones share gates and shutdown state.
#[derive(Clone)]
pub struct ResilientExecutor {
    inner: Arc<ExecutorInner>,
}

struct ExecutorInner {
    limiter: Arc<RateLimiter>,
    breaker: Arc<CircuitBreaker>,
    registry: Arc<ProviderRegistry>,
    backoff: BackoffStrategy,
    default_deadline: Option<Duration>,
    shutdown: Shutdown,
}

enum Phase<T> {
    Attempting,
    Waiting(Duration),
    Done(VaultResult<T>),
}

enum Attempt<T> {
    Rejected(VaultError),
    Ran(Result<T, ProviderError>),
}

impl ResilientExecutor {
    pub fn new(
        limiter: Arc<RateLimiter>,
        breaker: Arc<CircuitBreaker>,
        registry: Arc<ProviderRegistry>,
        backoff: BackoffStrategy,
        default_deadline: Option<Duration>,
    ) -> Self {
        Self {
            inner: Arc::new(ExecutorInner {
                limiter,
                breaker,
                registry,
                backoff,
                default_deadline,
                shutdown: Shutdown::new(),
            }),
        }
    }

    /// Submit `op` with a retry budget of `max_retries`.
    ///
    /// Returns immediately. Called outside a Tokio runtime, the handle
    /// resolves with [`VaultError::NoRuntime`].
    pub fn submit<T, F>(&self, op: F, max_retries: u32) -> SubmissionHandle<T>
    where
        F: Fn(&dyn EconomyProvider) -> Result<T, ProviderError> + Send + Sync + 'static,
        T: Send + 'static,
    {
        self.submit_with(op, SubmitOptions::new(max_retries))
    }

    pub fn submit_with<T, F>(&self, op: F, options: SubmitOptions) -> SubmissionHandle<T>
    where
        F: Fn(&dyn EconomyProvider) -> Result<T, ProviderError> + Send + Sync + 'static,
        T: Send + 'static,
    {
        let id = Uuid::new_v4();
        let (tx, rx) = oneshot::channel();
        let cancel = Arc::new(CancelFlag::default());
        let handle = SubmissionHandle {
            id,
            rx,
            cancel: cancel.clone(),
        };

        if self.is_closed() {
            metrics::record_submission("shutting_down");
            let _ = tx.send(Err(VaultError::ShuttingDown));
            return handle;
        }
        let runtime = match tokio::runtime::Handle::try_current() {
            Ok(runtime) => runtime,
            Err(e) => {
                tracing::error!(error = %e, "Submission outside of a Tokio runtime");
                metrics::record_submission("no_runtime");
                let _ = tx.send(Err(VaultError::NoRuntime));
                return handle;
            }
        };

        let inner = self.inner.clone();
        let span = tracing::info_span!("submission", %id, max_retries = options.max_retries);
        runtime.spawn(
            async move {
                let outcome = inner.drive(op, options, &cancel).await;
                metrics::record_submission(outcome_label(&outcome));
                if tx.send(outcome).is_err() {
                    tracing::debug!("Submission handle dropped before resolution");
                }
            }
            .instrument(span),
        );
        handle
    }

    /// Stop accepting submissions and abort pending retry waits.
    pub fn close(&self) {
        if self.inner.shutdown.trigger() {
            tracing::info!("Executor closed to new submissions");
        }
    }

    pub fn is_closed(&self) -> bool {
        self.inner.shutdown.is_triggered()
    }

    pub fn limiter(&self) -> &Arc<RateLimiter> {
        &self.inner.limiter
    }

    pub fn breaker(&self) -> &Arc<CircuitBreaker> {
        &self.inner.breaker
    }

    pub fn registry(&self) -> &Arc<ProviderRegistry> {
        &self.inner.registry
    }

    pub fn backoff(&self) -> BackoffStrategy {
        self.inner.backoff
    }
}

impl ExecutorInner {
    async fn drive<T, F>(&self, op: F, options: SubmitOptions, cancel: &CancelFlag) -> VaultResult<T>
    where
        F: Fn(&dyn EconomyProvider) -> Result<T, ProviderError> + Send + Sync + 'static,
        T: Send + 'static,
    {
        let op = Arc::new(op);
        let deadline = Deadline::after(options.deadline.or(self.default_deadline));
        let mut closed = self.shutdown.subscribe();
        let mut budget = RetryBudget::new(options.max_retries);
        let mut phase = Phase::Attempting;

        loop {
            phase = match phase {
                Phase::Attempting => {
                    self.attempt_phase(&op, &deadline, &mut budget, cancel, &closed)
                        .await
                }
                Phase::Waiting(delay) => tokio::select! {
                    _ = tokio::time::sleep(delay) => Phase::Attempting,
                    _ = cancel.cancelled() => Phase::Done(Err(VaultError::Cancelled)),
                    _ = closed.recv() => Phase::Done(Err(VaultError::ShuttingDown)),
                    _ = deadline.expired() => Phase::Done(Err(VaultError::DeadlineExceeded {
                        attempts: budget.attempts(),
                    })),
                },
                Phase::Done(outcome) => return outcome,
            };
        }
    }

    async fn attempt_phase<T, F>(
        &self,
        op: &Arc<F>,
        deadline: &Deadline,
        budget: &mut RetryBudget,
        cancel: &CancelFlag,
        closed: &ShutdownSignal,
    ) -> Phase<T>
    where
        F: Fn(&dyn EconomyProvider) -> Result<T, ProviderError> + Send + Sync + 'static,
        T: Send + 'static,
    {
        if cancel.is_cancelled() {
            return Phase::Done(Err(VaultError::Cancelled));
        }
        if closed.is_triggered() {
            return Phase::Done(Err(VaultError::ShuttingDown));
        }
        if deadline.is_expired() {
            return Phase::Done(Err(VaultError::DeadlineExceeded {
                attempts: budget.attempts(),
            }));
        }

        let error = match self.attempt(op).await {
            Attempt::Rejected(err) => return Phase::Done(Err(err)),
            Attempt::Ran(Ok(value)) => {
                budget.record_attempt();
                tracing::debug!(attempts = budget.attempts(), "Operation succeeded");
                return Phase::Done(Ok(value));
            }
            Attempt::Ran(Err(error)) => {
                budget.record_attempt();
                error
            }
        };

        match budget.take_retry() {
            Some(retry) => {
                let delay = self.backoff.delay(retry);
                tracing::warn!(
                    attempt = budget.attempts(),
                    retries_left = budget.remaining(),
                    delay_ms = delay.as_millis() as u64,
                    error = %error,
                    "Operation failed, scheduling retry"
                );
                Phase::Waiting(delay)
            }
            None => {
                tracing::warn!(attempts = budget.attempts(), error = %error, "Operation failed, retries exhausted");
                Phase::Done(Err(VaultError::OperationFailed {
                    attempts: budget.attempts(),
                    source: error,
                }))
            }
        }
    }

    async fn attempt<T, F>(&self, op: &Arc<F>) -> Attempt<T>
    where
        F: Fn(&dyn EconomyProvider) -> Result<T, ProviderError> + Send + Sync + 'static,
        T: Send + 'static,
    {
        if !self.limiter.try_acquire() {
            tracing::debug!("Attempt rejected by rate limiter");
            metrics::record_admission_rejected("rate_limiter");
            return Attempt::Rejected(VaultError::RateLimited);
        }
        if self.breaker.is_open() {
            tracing::debug!("Attempt rejected by open circuit");
            metrics::record_admission_rejected("circuit_breaker");
            return Attempt::Rejected(VaultError::CircuitOpen);
        }
        let Some(entry) = self.registry.active() else {
            tracing::debug!("Attempt rejected, no active provider");
            metrics::record_admission_rejected("no_provider");
            return Attempt::Rejected(VaultError::NoProviderAvailable);
        };

        let lease = entry.lease();
        metrics::record_attempt(&lease.name);
        let op = Arc::clone(op);
        let joined = tokio::task::spawn_blocking(move || (*op)(lease.handle.as_ref())).await;
        let result = match joined {
            Ok(result) => result,
            Err(e) if e.is_panic() => Err(ProviderError::Panicked(panic_message(e.into_panic()))),
            Err(e) => Err(ProviderError::Backend(format!("worker cancelled: {}", e))),
        };

        match &result {
            Ok(_) => self.breaker.record_success(),
            Err(_) => self.breaker.record_failure(),
        }
        Attempt::Ran(result)
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

fn outcome_label<T>(outcome: &VaultResult<T>) -> &'static str {
    match outcome {
        Ok(_) => "success",
        Err(VaultError::RateLimited) => "rate_limited",
        Err(VaultError::CircuitOpen) => "circuit_open",
        Err(VaultError::NoProviderAvailable) => "no_provider",
        Err(VaultError::OperationFailed { .. }) => "failed",
        Err(VaultError::DeadlineExceeded { .. }) => "deadline_exceeded",
        Err(VaultError::Cancelled) => "cancelled",
        Err(VaultError::ShuttingDown) => "shutting_down",
        Err(VaultError::NoRuntime) => "no_runtime",
        Err(VaultError::DiscoveryEmpty | VaultError::Io(_) | VaultError::Server(_)) => "error",
    }
}

#[derive(Default)]
struct CancelFlag {
    cancelled: AtomicBool,
    notify: Notify,
}

impl CancelFlag {
    fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
        self.notify.notify_one();
    }

    fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    async fn cancelled(&self) {
        while !self.is_cancelled() {
            self.notify.notified().await;
        }
    }
}

/// Completion handle of a submission. Resolves exactly once.
pub struct SubmissionHandle<T> {
    id: Uuid,
    rx: oneshot::Receiver<VaultResult<T>>,
    cancel: Arc<CancelFlag>,
}

impl<T> SubmissionHandle<T> {
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Request cancellation. Takes effect before the next attempt; an attempt
    /// already running is allowed to finish.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }
}

impl<T> Future for SubmissionHandle<T> {
    type Output = VaultResult<T>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        // A dropped sender means the runtime tore the task down.
        Pin::new(&mut self.rx)
            .poll(cx)
            .map(|received| received.unwrap_or(Err(VaultError::ShuttingDown)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::EventBus;
    use crate::provider::{Candidate, InMemoryProvider};
    use std::sync::atomic::AtomicU32;

    fn executor_with(capacity: u32, threshold: u32, delay: Duration, provider: bool) -> ResilientExecutor {
        let registry = Arc::new(ProviderRegistry::new(EventBus::new()));
        if provider {
            registry.discover(vec![Candidate::new("memory", Arc::new(InMemoryProvider::new()))]);
            registry.select_active();
        }
        ResilientExecutor::new(
            Arc::new(RateLimiter::new(capacity, Duration::from_secs(60))),
            Arc::new(CircuitBreaker::new(threshold, Duration::from_secs(60))),
            registry,
            BackoffStrategy::Fixed(delay),
            None,
        )
    }

    #[tokio::test]
    async fn test_success_resolves_value() {
        let executor = executor_with(10, 5, Duration::from_millis(10), true);
        let handle = executor.submit(|p| p.balance("nobody"), 3);
        assert_eq!(handle.await.unwrap(), 0.0);
    }

    #[tokio::test]
    async fn test_no_provider_fails_fast() {
        let executor = executor_with(10, 5, Duration::from_millis(10), false);
        let calls = Arc::new(AtomicU32::new(0));
        let c = calls.clone();
        let result = executor
            .submit(
                move |_| {
                    c.fetch_add(1, Ordering::SeqCst);
                    Ok(())
                },
                3,
            )
            .await;

        assert!(matches!(result, Err(VaultError::NoProviderAvailable)));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert_eq!(executor.breaker().snapshot().failure_count, 0);
    }

    #[tokio::test]
    async fn test_rate_limited_is_terminal() {
        let executor = executor_with(1, 5, Duration::from_millis(10), true);
        executor.submit(|_| Ok(()), 0).await.unwrap();

        let result = executor.submit(|_| Ok(()), 5).await;
        assert!(matches!(result, Err(VaultError::RateLimited)));
    }

    #[tokio::test]
    async fn test_panic_is_a_failure() {
        let executor = executor_with(10, 5, Duration::from_millis(1), true);
        let result: VaultResult<()> = executor.submit(|_| panic!("boom"), 1).await;

        match result {
            Err(VaultError::OperationFailed { attempts, source }) => {
                assert_eq!(attempts, 2);
                assert_eq!(source, ProviderError::Panicked("boom".into()));
            }
            other => panic!("unexpected outcome: {:?}", other),
        }
        assert_eq!(executor.breaker().snapshot().failure_count, 2);
    }

    #[tokio::test]
    async fn test_closed_executor_rejects() {
        let executor = executor_with(10, 5, Duration::from_millis(1), true);
        executor.close();
        assert!(executor.is_closed());

        let result = executor.submit(|_| Ok(1), 0).await;
        assert!(matches!(result, Err(VaultError::ShuttingDown)));
    }

    #[test]
    fn test_handle_is_unpin() {
        fn assert_unpin<T: Unpin>() {}
        assert_unpin::<SubmissionHandle<f64>>();
    }

    #[test]
    fn test_submit_outside_runtime_reports_no_runtime() {
        let executor = executor_with(10, 5, Duration::from_millis(10), true);
        let handle = executor.submit(|p| p.balance("nobody"), 3);

        let runtime = tokio::runtime::Builder::new_current_thread().build().unwrap();
        assert!(matches!(runtime.block_on(handle), Err(VaultError::NoRuntime)));
    }

    #[tokio::test]
    async fn test_close_aborts_pending_retry() {
        let executor = executor_with(10, 50, Duration::from_secs(60), true);
        let handle = executor.submit(|_| Err::<(), _>(ProviderError::Backend("down".into())), 5);

        tokio::time::sleep(Duration::from_millis(50)).await;
        executor.close();

        let result = tokio::time::timeout(Duration::from_secs(5), handle).await.unwrap();
        assert!(matches!(result, Err(VaultError::ShuttingDown)));
    }

    #[tokio::test]
    async fn test_cancel_between_attempts() {
        let executor = executor_with(10, 50, Duration::from_secs(60), true);
        let calls = Arc::new(AtomicU32::new(0));
        let c = calls.clone();
        let handle = executor.submit(
            move |_| {
                c.fetch_add(1, Ordering::SeqCst);
                Err::<(), _>(ProviderError::Backend("down".into()))
            },
            5,
        );

        tokio::time::sleep(Duration::from_millis(50)).await;
        handle.cancel();

        let result = tokio::time::timeout(Duration::from_secs(5), handle).await.unwrap();
        assert!(matches!(result, Err(VaultError::Cancelled)));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_deadline_stops_retries() {
        let executor = executor_with(10, 50, Duration::from_millis(40), true);
        let options = SubmitOptions::new(100).with_deadline(Duration::from_millis(100));
        let result = executor
            .submit_with(|_| Err::<(), _>(ProviderError::Backend("down".into())), options)
            .await;

        match result {
            Err(VaultError::DeadlineExceeded { attempts }) => assert!((1..=4).contains(&attempts)),
            other => panic!("unexpected outcome: {:?}", other),
        }
    }
}
