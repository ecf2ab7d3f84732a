//! Composition of breaker, bulkhead, retry and timeout around one gateway
//!
//! The order is fixed:
//!
//! ```text
//! breaker gate ─► retry ┬► bulkhead permit ─► timeout ─► call
//!                       └─ (next attempt re-enters bulkhead and timeout)
//! ```
//!
//! The breaker is consulted once per [`Pipeline::execute`] and fed exactly one
//! outcome for it, so a single logical call never counts as several failures.
//! The outcome is reported against the [`Admission`] the gate handed out, so a
//! call that outlives the phase it was admitted in cannot act as a probe.

use crate::{
    EventKind,
    bulkhead::BulkheadSemaphore,
    circuit::{Admission, CircuitBreaker, CircuitState, CircuitStatus},
    classifier::{DefaultClassifier, FailureClassifier, FailureContext},
    errors::{AttemptFailure, CircuitError},
    retry::{RetryError, RetryPolicy, Retryable},
    timeout::TimeoutGuard,
};
use std::any::Any;
use std::fmt;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Resilience stack for one gateway
pub struct Pipeline {
    name: String,
    breaker: Mutex<CircuitBreaker>,
    bulkhead: Arc<BulkheadSemaphore>,
    retry: RetryPolicy,
    timeout: TimeoutGuard,
    classifier: Arc<dyn FailureClassifier>,
}

impl Pipeline {
    pub fn builder(breaker: CircuitBreaker) -> PipelineBuilder {
        PipelineBuilder::new(breaker)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Run `operation` through the full stack.
    ///
    /// Each attempt gets a child of `cancel`; the child is cancelled when
    /// that attempt overruns its deadline.
    pub async fn execute<T, E, F, Fut>(
        &self,
        cancel: &CancellationToken,
        mut operation: F,
    ) -> Result<T, CircuitError<E>>
    where
        F: FnMut(CancellationToken) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Retryable + fmt::Display + 'static,
    {
        let admission = self.gate::<E>()?;

        let limit = self.bulkhead.limit();
        let timeout = self.timeout;
        let started = Instant::now();

        let outcome = self
            .retry
            .execute(|attempt| {
                let permit = self.bulkhead.try_acquire();
                let token = cancel.child_token();
                let call = match permit {
                    Some(_) => Some(operation(token.clone())),
                    None => None,
                };
                debug!(circuit = %self.name, attempt, admitted = call.is_some(), "gateway attempt");

                async move {
                    let (Some(_permit), Some(call)) = (permit, call) else {
                        return Err(AttemptFailure::BulkheadFull { limit });
                    };
                    let attempt_started = Instant::now();
                    match timeout.run(token, call).await {
                        Ok(Ok(value)) => Ok((value, attempt_started.elapsed())),
                        Ok(Err(error)) => Err(AttemptFailure::Failed(error)),
                        Err(elapsed) => Err(AttemptFailure::TimedOut {
                            timeout_ms: elapsed.limit.as_millis() as u64,
                        }),
                    }
                }
            })
            .await;

        let (attempts, last, exhausted) = match outcome {
            Ok((value, elapsed)) => {
                self.record_success(admission, elapsed);
                return Ok(value);
            }
            Err(RetryError::Exhausted { attempts, last }) => (attempts, last, true),
            Err(RetryError::Aborted { attempt, error }) => (attempt, error, false),
        };

        match last {
            AttemptFailure::BulkheadFull { limit } => {
                // Earlier attempts reached the gateway and failed
                if attempts > 1 {
                    self.record(admission, EventKind::Failure, started.elapsed());
                } else {
                    self.breaker().report_ignored(admission);
                }
                debug!(circuit = %self.name, attempts, limit, "bulkhead full");
                Err(CircuitError::BulkheadFull {
                    circuit: self.name.clone(),
                    limit,
                })
            }
            AttemptFailure::Failed(error) if !exhausted => {
                let duration = started.elapsed();
                let trips = self.classifier.should_trip(&FailureContext {
                    circuit_name: &self.name,
                    error: &error as &dyn Any,
                    duration: duration.as_secs_f64(),
                });
                if trips {
                    self.record(admission, EventKind::Failure, duration);
                } else {
                    self.breaker().report_ignored(admission);
                }
                Err(CircuitError::Execution(error))
            }
            last => {
                self.record(admission, EventKind::Failure, started.elapsed());
                warn!(circuit = %self.name, attempts, error = %last, "retries exhausted");
                Err(CircuitError::RetriesExhausted {
                    circuit: self.name.clone(),
                    attempts,
                    last,
                })
            }
        }
    }

    /// Breaker gate check without running anything
    pub fn allow(&self) -> bool {
        self.breaker().allow()
    }

    pub fn state(&self) -> CircuitState {
        self.breaker().state()
    }

    pub fn status(&self) -> CircuitStatus {
        self.breaker().status()
    }

    pub fn reset(&self) {
        self.breaker().reset();
    }

    pub fn bulkhead(&self) -> &Arc<BulkheadSemaphore> {
        &self.bulkhead
    }

    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry
    }

    pub fn timeout(&self) -> Duration {
        self.timeout.limit()
    }

    fn gate<E>(&self) -> Result<Admission, CircuitError<E>> {
        self.breaker().permit()
    }

    fn record_success(&self, admission: Admission, elapsed: Duration) {
        let mut breaker = self.breaker();
        let secs = elapsed.as_secs_f64();
        let kind = breaker.classify_success(secs);
        breaker.report(admission, kind, secs);
    }

    fn record(&self, admission: Admission, kind: EventKind, elapsed: Duration) {
        self.breaker().report(admission, kind, elapsed.as_secs_f64());
    }

    // Never held across an await
    fn breaker(&self) -> MutexGuard<'_, CircuitBreaker> {
        self.breaker
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pipeline")
            .field("name", &self.name)
            .field("bulkhead", &self.bulkhead)
            .field("retry", &self.retry)
            .field("timeout", &self.timeout)
            .field("classifier", &self.classifier)
            .finish()
    }
}

/// Builder for [`Pipeline`]
pub struct PipelineBuilder {
    breaker: CircuitBreaker,
    max_concurrency: usize,
    retry: RetryPolicy,
    timeout: Duration,
    classifier: Arc<dyn FailureClassifier>,
}

impl PipelineBuilder {
    pub fn new(breaker: CircuitBreaker) -> Self {
        Self {
            breaker,
            max_concurrency: 10,
            retry: RetryPolicy::default(),
            timeout: Duration::from_secs(3),
            classifier: Arc::new(DefaultClassifier),
        }
    }

    /// Concurrent calls admitted by the bulkhead
    pub fn max_concurrency(mut self, limit: usize) -> Self {
        self.max_concurrency = limit;
        self
    }

    pub fn retry(mut self, policy: RetryPolicy) -> Self {
        self.retry = policy;
        self
    }

    /// Deadline for each individual attempt
    pub fn timeout(mut self, limit: Duration) -> Self {
        self.timeout = limit;
        self
    }

    /// Decide which non-retryable errors count as breaker failures
    pub fn failure_classifier(mut self, classifier: Arc<dyn FailureClassifier>) -> Self {
        self.classifier = classifier;
        self
    }

    pub fn build(self) -> Pipeline {
        Pipeline {
            name: self.breaker.name().to_string(),
            breaker: Mutex::new(self.breaker),
            bulkhead: Arc::new(BulkheadSemaphore::new(self.max_concurrency)),
            retry: self.retry,
            timeout: TimeoutGuard::new(self.timeout),
            classifier: self.classifier,
        }
    }
}
