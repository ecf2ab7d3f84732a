//! Deadline for a single gateway call

use std::future::Future;
use std::time::Duration;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

/// The call did not finish before its deadline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("call exceeded its {limit:?} deadline")]
pub struct Elapsed {
    pub limit: Duration,
}

/// Bounds the wall-clock duration of a call.
///
/// On expiry the call future is dropped and `token` is cancelled, so work the
/// call spawned elsewhere can observe that nobody is waiting for it anymore.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeoutGuard {
    limit: Duration,
}

impl TimeoutGuard {
    pub fn new(limit: Duration) -> Self {
        Self { limit }
    }

    pub fn limit(&self) -> Duration {
        self.limit
    }

    pub async fn run<F>(&self, token: CancellationToken, call: F) -> Result<F::Output, Elapsed>
    where
        F: Future,
    {
        match tokio::time::timeout(self.limit, call).await {
            Ok(output) => Ok(output),
            Err(_) => {
                token.cancel();
                Err(Elapsed { limit: self.limit })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_fast_call_completes() {
        let guard = TimeoutGuard::new(Duration::from_millis(200));
        let token = CancellationToken::new();

        let result = guard.run(token.clone(), async { 42 }).await;

        assert_eq!(result, Ok(42));
        assert!(!token.is_cancelled());
    }

    #[tokio::test]
    async fn test_overrun_cancels_token() {
        let guard = TimeoutGuard::new(Duration::from_millis(20));
        let token = CancellationToken::new();

        let result = guard
            .run(token.clone(), tokio::time::sleep(Duration::from_secs(5)))
            .await;

        assert_eq!(
            result,
            Err(Elapsed {
                limit: Duration::from_millis(20)
            })
        );
        assert!(token.is_cancelled());
    }

    #[tokio::test]
    async fn test_spawned_work_observes_cancellation() {
        let guard = TimeoutGuard::new(Duration::from_millis(10));
        let token = CancellationToken::new();
        let observer = token.clone();

        let background = tokio::spawn(async move {
            observer.cancelled().await;
            "stopped"
        });

        let _ = guard
            .run(token, tokio::time::sleep(Duration::from_secs(5)))
            .await;

        assert_eq!(background.await.unwrap(), "stopped");
    }
}
