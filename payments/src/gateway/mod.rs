//! Adapters for external payment processors

pub mod outcome;
pub mod simulated;

pub use outcome::{Always, Cyclic, Outcome, OutcomeGenerator, Scripted, Weighted};
pub use simulated::SimulatedGateway;

use crate::domain::{PaymentIntent, PaymentMethod};
use async_trait::async_trait;
use gateway_guard::{CancellationToken, Retryable};
use std::fmt;
use thiserror::Error;

/// What a processor can answer besides a transaction reference
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GatewayFault {
    /// Timeouts, outages and other faults worth another attempt
    #[error("{0}")]
    Transient(String),
    /// Business refusal of the charge; never retried on the same processor
    #[error("{0}")]
    Declined(String),
}

impl Retryable for GatewayFault {
    fn is_retryable(&self) -> bool {
        matches!(self, GatewayFault::Transient(_))
    }
}

/// One external payment processor
#[async_trait]
pub trait GatewayAdapter: Send + Sync + fmt::Debug {
    fn name(&self) -> &str;

    /// Method recorded on payments this processor handles
    fn method(&self) -> PaymentMethod;

    /// Charge the payer. Returns the processor's transaction reference.
    ///
    /// `cancel` fires when the caller stops waiting for this attempt.
    async fn charge(
        &self,
        intent: &PaymentIntent,
        cancel: CancellationToken,
    ) -> Result<String, GatewayFault>;

    /// One-line description for health reports
    fn status_line(&self) -> String;
}
