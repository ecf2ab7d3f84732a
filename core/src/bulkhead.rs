//! Bulkhead for bounding concurrent gateway calls
//!
//! Permits are counted with a single atomic. Acquisition never waits: a caller
//! that finds the bulkhead full is rejected on the spot, so a slow gateway
//! cannot pile up queued work behind it.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Lock-free counting semaphore without a wait queue
#[derive(Debug)]
pub struct BulkheadSemaphore {
    limit: usize,
    in_use: AtomicUsize,
}

impl BulkheadSemaphore {
    /// Create a bulkhead admitting at most `limit` concurrent calls.
    /// A limit of 0 is raised to 1.
    pub fn new(limit: usize) -> Self {
        Self {
            limit: limit.max(1),
            in_use: AtomicUsize::new(0),
        }
    }

    /// Take a permit if one is free.
    ///
    /// The permit is returned when the guard drops, whichever way the
    /// guarded call ends (success, error, timeout, cancellation or panic).
    pub fn try_acquire(self: &Arc<Self>) -> Option<BulkheadGuard> {
        let mut current = self.in_use.load(Ordering::Acquire);

        loop {
            if current >= self.limit {
                return None;
            }

            match self.in_use.compare_exchange_weak(
                current,
                current + 1,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => {
                    return Some(BulkheadGuard {
                        semaphore: Arc::clone(self),
                    });
                }
                Err(actual) => current = actual,
            }
        }
    }

    pub fn in_use(&self) -> usize {
        self.in_use.load(Ordering::Acquire)
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    pub fn available(&self) -> usize {
        self.limit.saturating_sub(self.in_use())
    }

    fn release(&self) {
        self.in_use.fetch_sub(1, Ordering::Release);
    }
}

/// Permit held for the duration of one gateway call
#[derive(Debug)]
pub struct BulkheadGuard {
    semaphore: Arc<BulkheadSemaphore>,
}

impl Drop for BulkheadGuard {
    fn drop(&mut self) {
        self.semaphore.release();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_acquire_and_release() {
        let bulkhead = Arc::new(BulkheadSemaphore::new(2));

        let first = bulkhead.try_acquire();
        assert!(first.is_some());
        assert_eq!(bulkhead.in_use(), 1);
        assert_eq!(bulkhead.available(), 1);

        let second = bulkhead.try_acquire().expect("second permit");
        assert!(bulkhead.try_acquire().is_none(), "no queueing when full");

        drop(first);
        assert_eq!(bulkhead.available(), 1);
        let third = bulkhead.try_acquire();
        assert!(third.is_some());

        drop(second);
        drop(third);
        assert_eq!(bulkhead.in_use(), 0);
    }

    #[test]
    fn test_zero_limit_is_raised() {
        let bulkhead = Arc::new(BulkheadSemaphore::new(0));
        assert_eq!(bulkhead.limit(), 1);
        assert!(bulkhead.try_acquire().is_some());
    }

    #[tokio::test]
    async fn test_concurrent_tasks_never_exceed_limit() {
        let bulkhead = Arc::new(BulkheadSemaphore::new(3));
        let peak = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..12 {
            let bulkhead = Arc::clone(&bulkhead);
            let peak = Arc::clone(&peak);
            handles.push(tokio::spawn(async move {
                let Some(_permit) = bulkhead.try_acquire() else {
                    return false;
                };
                peak.fetch_max(bulkhead.in_use(), Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(20)).await;
                true
            }));
        }

        let mut admitted = 0;
        for handle in handles {
            if handle.await.unwrap() {
                admitted += 1;
            }
        }

        assert!(admitted >= 3);
        assert!(peak.load(Ordering::SeqCst) <= 3);
        assert_eq!(bulkhead.in_use(), 0);
    }

    #[tokio::test]
    async fn test_permit_released_when_call_is_abandoned() {
        let bulkhead = Arc::new(BulkheadSemaphore::new(1));
        let held = Arc::clone(&bulkhead);

        let abandoned = tokio::time::timeout(Duration::from_millis(10), async move {
            let _permit = held.try_acquire();
            tokio::time::sleep(Duration::from_secs(5)).await;
        })
        .await;

        assert!(abandoned.is_err());
        assert_eq!(bulkhead.in_use(), 0);
    }

    #[test]
    fn test_permit_released_on_panic() {
        let bulkhead = Arc::new(BulkheadSemaphore::new(2));

        let bulkhead_clone = Arc::clone(&bulkhead);
        let result = std::panic::catch_unwind(move || {
            let _guard = bulkhead_clone.try_acquire().unwrap();
            panic!("gateway client panicked");
        });

        assert!(result.is_err());
        assert_eq!(bulkhead.in_use(), 0);
    }
}
