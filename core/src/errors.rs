//! Error types for guarded gateway calls

use std::error::Error;
use thiserror::Error;

/// Errors that can occur while running a call through a circuit
#[derive(Debug, Error)]
pub enum CircuitError<E = Box<dyn Error + Send + Sync>> {
    /// Circuit is open, calls are being rejected
    #[error("circuit '{circuit}' is open (opened at {opened_at})")]
    Open { circuit: String, opened_at: f64 },

    /// Half-open probe limit has been reached
    #[error("circuit '{circuit}' half-open probe limit reached")]
    HalfOpenLimitReached { circuit: String },

    /// Bulkhead is at capacity, cannot acquire permit
    #[error("circuit '{circuit}' bulkhead is full (limit: {limit})")]
    BulkheadFull { circuit: String, limit: usize },

    /// Every attempt ended in a retryable fault
    #[error("circuit '{circuit}' gave up after {attempts} attempts: {last}")]
    RetriesExhausted {
        circuit: String,
        attempts: usize,
        last: AttemptFailure<E>,
    },

    /// The wrapped operation failed with a non-retryable error
    #[error("circuit execution failed: {0}")]
    Execution(E),
}

impl<E> CircuitError<E> {
    /// True when the call was turned away before reaching the gateway
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            CircuitError::Open { .. }
                | CircuitError::HalfOpenLimitReached { .. }
                | CircuitError::BulkheadFull { .. }
        )
    }

    pub fn is_open(&self) -> bool {
        matches!(
            self,
            CircuitError::Open { .. } | CircuitError::HalfOpenLimitReached { .. }
        )
    }
}

/// Why a single attempt inside a retry loop failed
#[derive(Debug, Error)]
pub enum AttemptFailure<E> {
    #[error("bulkhead full (limit: {limit})")]
    BulkheadFull { limit: usize },

    #[error("timed out after {timeout_ms} ms")]
    TimedOut { timeout_ms: u64 },

    #[error("{0}")]
    Failed(E),
}
