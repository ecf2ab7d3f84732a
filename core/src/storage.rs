//! Outcome storage for circuit breakers
//!
//! `MemoryStorage` keeps a bounded, per-circuit log of call outcomes and
//! answers sliding-window queries over it. A window is bounded both by count
//! (the last N calls) and by age (calls newer than `window_seconds`).

use crate::{Event, EventKind};
use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Instant;

/// Outcome counts inside a sliding window
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WindowCounts {
    pub successes: usize,
    pub failures: usize,
    pub slow: usize,
}

impl WindowCounts {
    /// Number of calls buffered in the window
    pub fn total(&self) -> usize {
        self.successes + self.failures + self.slow
    }

    /// Ratio of failed-or-slow calls to all calls (0.0 when the window is empty)
    pub fn failure_ratio(&self) -> f64 {
        match self.total() {
            0 => 0.0,
            total => (self.failures + self.slow) as f64 / total as f64,
        }
    }
}

/// Abstract storage backend for circuit breaker outcomes
pub trait StorageBackend: Send + Sync + std::fmt::Debug {
    /// Record one outcome
    fn record(&self, circuit_name: &str, kind: EventKind, duration: f64);

    /// Count outcomes among the last `max_calls` events that are newer than `window_seconds`
    fn window_counts(&self, circuit_name: &str, window_seconds: f64, max_calls: usize) -> WindowCounts;

    /// Clear all outcomes for a circuit
    fn clear(&self, circuit_name: &str);

    /// Get monotonic time in seconds (relative to storage creation)
    fn monotonic_time(&self) -> f64;
}

/// Thread-safe in-memory outcome storage
#[derive(Debug)]
pub struct MemoryStorage {
    events: RwLock<HashMap<String, Vec<Event>>>,
    /// Maximum events kept per circuit
    max_events: usize,
    /// Monotonic time anchor (immune to wall-clock adjustments)
    start_time: Instant,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::with_max_events(1000)
    }

    /// Create storage with a custom per-circuit event cap
    pub fn with_max_events(max_events: usize) -> Self {
        Self {
            events: RwLock::new(HashMap::new()),
            max_events: max_events.max(1),
            start_time: Instant::now(),
        }
    }

    // A panic while holding the lock cannot leave the log half-written, so a
    // poisoned lock is still safe to use.
    fn read(&self) -> RwLockReadGuard<'_, HashMap<String, Vec<Event>>> {
        self.events.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<String, Vec<Event>>> {
        self.events.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Default for MemoryStorage {
    fn default() -> Self {
        Self::new()
    }
}

impl StorageBackend for MemoryStorage {
    fn record(&self, circuit_name: &str, kind: EventKind, duration: f64) {
        let timestamp = self.monotonic_time();
        let mut events = self.write();
        let circuit_events = events.entry(circuit_name.to_string()).or_default();

        circuit_events.push(Event {
            kind,
            timestamp,
            duration,
        });

        // Drop the oldest 10% at once instead of shifting on every insert
        if circuit_events.len() > self.max_events {
            let remove_count = (self.max_events / 10).max(1);
            circuit_events.drain(0..remove_count);
        }
    }

    fn window_counts(&self, circuit_name: &str, window_seconds: f64, max_calls: usize) -> WindowCounts {
        let cutoff = self.monotonic_time() - window_seconds;
        let events = self.read();

        let mut counts = WindowCounts::default();
        let Some(circuit_events) = events.get(circuit_name) else {
            return counts;
        };

        for event in circuit_events
            .iter()
            .rev()
            .take(max_calls)
            .take_while(|e| e.timestamp >= cutoff)
        {
            match event.kind {
                EventKind::Success => counts.successes += 1,
                EventKind::Failure => counts.failures += 1,
                EventKind::Slow => counts.slow += 1,
            }
        }

        counts
    }

    fn clear(&self, circuit_name: &str) {
        self.write().remove(circuit_name);
    }

    fn monotonic_time(&self) -> f64 {
        self.start_time.elapsed().as_secs_f64()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_and_count() {
        let storage = MemoryStorage::new();

        storage.record("card", EventKind::Success, 0.1);
        storage.record("card", EventKind::Success, 0.2);
        storage.record("card", EventKind::Failure, 0.5);
        storage.record("card", EventKind::Slow, 2.5);

        let counts = storage.window_counts("card", 60.0, 100);
        assert_eq!(counts.successes, 2);
        assert_eq!(counts.failures, 1);
        assert_eq!(counts.slow, 1);
        assert_eq!(counts.total(), 4);
        assert!((counts.failure_ratio() - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn test_count_window_keeps_only_latest_calls() {
        let storage = MemoryStorage::new();

        for _ in 0..5 {
            storage.record("card", EventKind::Failure, 0.1);
        }
        for _ in 0..3 {
            storage.record("card", EventKind::Success, 0.1);
        }

        let counts = storage.window_counts("card", 60.0, 4);
        assert_eq!(counts.total(), 4);
        assert_eq!(counts.successes, 3);
        assert_eq!(counts.failures, 1);
    }

    #[test]
    fn test_time_window_excludes_old_events() {
        let storage = MemoryStorage::new();

        storage.record("card", EventKind::Failure, 0.1);
        std::thread::sleep(std::time::Duration::from_millis(30));
        storage.record("card", EventKind::Success, 0.1);

        let counts = storage.window_counts("card", 0.02, 100);
        assert_eq!(counts.successes, 1);
        assert_eq!(counts.failures, 0);
    }

    #[test]
    fn test_circuits_are_isolated() {
        let storage = MemoryStorage::new();

        storage.record("card", EventKind::Failure, 0.1);
        storage.record("wallet", EventKind::Success, 0.1);

        assert_eq!(storage.window_counts("card", 60.0, 10).failures, 1);
        assert_eq!(storage.window_counts("wallet", 60.0, 10).failures, 0);
    }

    #[test]
    fn test_clear() {
        let storage = MemoryStorage::new();

        storage.record("card", EventKind::Success, 0.1);
        storage.clear("card");

        assert_eq!(storage.window_counts("card", 60.0, 10), WindowCounts::default());
    }

    #[test]
    fn test_max_events_cleanup() {
        let storage = MemoryStorage::with_max_events(5);

        for i in 0..20 {
            storage.record("card", EventKind::Success, i as f64 * 0.01);
        }

        let events = storage.events.read().unwrap();
        let circuit_events = events.get("card").unwrap();
        assert!(
            circuit_events.len() <= 5,
            "Expected <= 5 events, got {}",
            circuit_events.len()
        );
    }

    #[test]
    fn test_empty_window_ratio_is_zero() {
        assert_eq!(WindowCounts::default().failure_ratio(), 0.0);
    }
}
