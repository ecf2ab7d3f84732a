//! gateway-guard - resilience primitives for calls into external payment gateways
//!
//! This crate provides the pieces a payment orchestrator composes around each
//! gateway it talks to:
//! - Circuit breaker state machine (Closed → Open → HalfOpen) driven by a
//!   sliding window of call outcomes (success / failure / slow)
//! - Lock-free bulkhead that rejects instead of queueing
//! - Retry policy with exponential backoff and jitter
//! - Timeout guard that signals cancellation to the abandoned call
//! - [`Pipeline`], which applies all of the above in a fixed order
//!
//! # Example
//!
//! ```rust
//! use gateway_guard::{CircuitBreaker, EventKind};
//!
//! let mut circuit = CircuitBreaker::builder("card_gateway")
//!     .failure_rate(0.5)
//!     .minimum_calls(4)
//!     .sliding_window_size(10)
//!     .open_duration_secs(10.0)
//!     .half_open_probes(3)
//!     .build();
//!
//! if circuit.allow() {
//!     // ... call the gateway, then report what happened
//!     circuit.on_result(EventKind::Failure, 0.2);
//! }
//!
//! println!("state: {:?}", circuit.state());
//! ```

pub mod builder;
pub mod bulkhead;
pub mod callbacks;
pub mod circuit;
pub mod classifier;
pub mod errors;
pub mod pipeline;
pub mod retry;
pub mod storage;
pub mod timeout;

pub use builder::CircuitBuilder;
pub use bulkhead::{BulkheadGuard, BulkheadSemaphore};
pub use callbacks::{Callbacks, Transition};
pub use circuit::{Admission, CircuitBreaker, CircuitState, CircuitStatus, Config};
pub use classifier::{DefaultClassifier, FailureClassifier, FailureContext, PredicateClassifier};
pub use errors::{AttemptFailure, CircuitError};
pub use pipeline::{Pipeline, PipelineBuilder};
pub use retry::{RetryError, RetryPolicy, Retryable};
pub use storage::{MemoryStorage, StorageBackend, WindowCounts};
pub use timeout::{Elapsed, TimeoutGuard};

pub use tokio_util::sync::CancellationToken;

/// Outcome of a single guarded call as seen by the circuit breaker
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Success,
    Failure,
    /// The call succeeded but took longer than the slow-call threshold
    Slow,
}

/// A single outcome recorded by the circuit breaker
#[derive(Debug, Clone)]
pub struct Event {
    pub kind: EventKind,
    pub timestamp: f64,
    pub duration: f64,
}
