//! Retry policy with exponential backoff and jitter
//!
//! Backoff jitter reuses the same `chrono-machines` formula the circuit applies
//! to its open duration.

use crate::errors::AttemptFailure;
use std::fmt;
use std::future::Future;
use std::time::Duration;
use thiserror::Error;

/// Errors that know whether another attempt could succeed
pub trait Retryable {
    fn is_retryable(&self) -> bool;
}

impl<E: Retryable> Retryable for AttemptFailure<E> {
    fn is_retryable(&self) -> bool {
        match self {
            AttemptFailure::TimedOut { .. } => true,
            // Saturation is local; hammering the same bulkhead will not help
            AttemptFailure::BulkheadFull { .. } => false,
            AttemptFailure::Failed(e) => e.is_retryable(),
        }
    }
}

/// Outcome of a retry loop that did not produce a value
#[derive(Debug, Error)]
pub enum RetryError<E> {
    /// Every attempt failed with a retryable error
    #[error("gave up after {attempts} attempts: {last}")]
    Exhausted { attempts: usize, last: E },

    /// An attempt failed with an error that must not be retried
    #[error("attempt {attempt} failed: {error}")]
    Aborted { attempt: usize, error: E },
}

/// Bounded re-attempts with exponential backoff
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Total attempts including the first one
    pub max_attempts: usize,
    pub base_delay: Duration,
    pub multiplier: f64,
    pub max_delay: Duration,
    /// 0.0 = no jitter, 1.0 = full jitter
    pub jitter_factor: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(100),
            multiplier: 2.0,
            max_delay: Duration::from_secs(2),
            jitter_factor: 0.0,
        }
    }
}

impl RetryPolicy {
    /// Same delay between every attempt
    pub fn fixed(max_attempts: usize, delay: Duration) -> Self {
        Self {
            max_attempts,
            base_delay: delay,
            multiplier: 1.0,
            max_delay: delay,
            jitter_factor: 0.0,
        }
    }

    pub fn exponential(
        max_attempts: usize,
        base_delay: Duration,
        multiplier: f64,
        max_delay: Duration,
    ) -> Self {
        Self {
            max_attempts,
            base_delay,
            multiplier,
            max_delay,
            jitter_factor: 0.0,
        }
    }

    /// A single attempt, never retried
    pub fn no_retry() -> Self {
        Self::fixed(1, Duration::ZERO)
    }

    pub fn with_jitter(mut self, factor: f64) -> Self {
        self.jitter_factor = factor.clamp(0.0, 1.0);
        self
    }

    /// Delay to wait after the given (1-based) attempt failed
    pub fn delay_for(&self, attempt: usize) -> Duration {
        let exponent = i32::try_from(attempt.saturating_sub(1)).unwrap_or(i32::MAX);
        let raw_ms = self.base_delay.as_millis() as f64 * self.multiplier.powi(exponent);
        let capped_ms = raw_ms.min(self.max_delay.as_millis() as f64).max(0.0) as u64;

        if self.jitter_factor > 0.0 && capped_ms > 0 {
            let policy = chrono_machines::Policy {
                max_attempts: 1,
                base_delay_ms: capped_ms,
                multiplier: 1.0,
                max_delay_ms: capped_ms,
            };
            Duration::from_millis(policy.calculate_delay(1, self.jitter_factor) as u64)
        } else {
            Duration::from_millis(capped_ms)
        }
    }

    /// Run `operation` until it succeeds, fails with a non-retryable error,
    /// or runs out of attempts. The closure receives the 1-based attempt number.
    pub async fn execute<T, E, F, Fut>(&self, mut operation: F) -> Result<T, RetryError<E>>
    where
        F: FnMut(usize) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Retryable + fmt::Display,
    {
        let max_attempts = self.max_attempts.max(1);
        let mut attempt = 1;

        loop {
            match operation(attempt).await {
                Ok(value) => return Ok(value),
                Err(error) if !error.is_retryable() => {
                    return Err(RetryError::Aborted { attempt, error });
                }
                Err(error) if attempt >= max_attempts => {
                    return Err(RetryError::Exhausted {
                        attempts: attempt,
                        last: error,
                    });
                }
                Err(error) => {
                    let delay = self.delay_for(attempt);
                    tracing::debug!(
                        attempt,
                        max_attempts,
                        delay_ms = delay.as_millis() as u64,
                        error = %error,
                        "retrying after retryable fault"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Debug, Error)]
    enum Fault {
        #[error("unavailable")]
        Unavailable,
        #[error("declined")]
        Declined,
    }

    impl Retryable for Fault {
        fn is_retryable(&self) -> bool {
            matches!(self, Fault::Unavailable)
        }
    }

    fn quick(max_attempts: usize) -> RetryPolicy {
        RetryPolicy::fixed(max_attempts, Duration::from_millis(1))
    }

    #[test]
    fn test_exponential_delays_are_capped() {
        let policy = RetryPolicy::exponential(
            5,
            Duration::from_millis(100),
            2.0,
            Duration::from_millis(300),
        );

        assert_eq!(policy.delay_for(1), Duration::from_millis(100));
        assert_eq!(policy.delay_for(2), Duration::from_millis(200));
        assert_eq!(policy.delay_for(3), Duration::from_millis(300));
        assert_eq!(policy.delay_for(40), Duration::from_millis(300));
    }

    #[test]
    fn test_jitter_stays_within_bounds() {
        let policy = RetryPolicy::fixed(3, Duration::from_millis(1000)).with_jitter(0.25);

        for attempt in 1..20 {
            let delay = policy.delay_for(attempt);
            assert!(delay >= Duration::from_millis(740), "{:?}", delay);
            assert!(delay <= Duration::from_millis(1010), "{:?}", delay);
        }
    }

    #[test]
    fn test_attempt_failure_retryability() {
        assert!(AttemptFailure::<Fault>::TimedOut { timeout_ms: 10 }.is_retryable());
        assert!(!AttemptFailure::<Fault>::BulkheadFull { limit: 1 }.is_retryable());
        assert!(AttemptFailure::Failed(Fault::Unavailable).is_retryable());
        assert!(!AttemptFailure::Failed(Fault::Declined).is_retryable());
    }

    #[tokio::test]
    async fn test_succeeds_after_transient_failures() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();

        let result = quick(3)
            .execute(|attempt| {
                counter.fetch_add(1, Ordering::SeqCst);
                async move {
                    if attempt < 3 {
                        Err(Fault::Unavailable)
                    } else {
                        Ok(attempt)
                    }
                }
            })
            .await;

        assert_eq!(result.unwrap(), 3);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_exhausts_attempts() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();

        let result: Result<(), _> = quick(3)
            .execute(|_| {
                counter.fetch_add(1, Ordering::SeqCst);
                async { Err(Fault::Unavailable) }
            })
            .await;

        assert!(matches!(
            result,
            Err(RetryError::Exhausted {
                attempts: 3,
                last: Fault::Unavailable
            })
        ));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_decline_is_never_retried() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();

        let result: Result<(), _> = quick(5)
            .execute(|_| {
                counter.fetch_add(1, Ordering::SeqCst);
                async { Err(Fault::Declined) }
            })
            .await;

        assert!(matches!(
            result,
            Err(RetryError::Aborted {
                attempt: 1,
                error: Fault::Declined
            })
        ));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_zero_attempts_still_runs_once() {
        let result: Result<u8, RetryError<Fault>> =
            quick(0).execute(|_| async { Ok(7) }).await;
        assert_eq!(result.unwrap(), 7);
    }
}
