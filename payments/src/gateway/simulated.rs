//! In-process stand-in for an external processor

use super::{GatewayAdapter, GatewayFault, Outcome, OutcomeGenerator};
use crate::domain::{PaymentIntent, PaymentMethod};
use async_trait::async_trait;
use gateway_guard::CancellationToken;
use rand::Rng;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tracing::debug;
use uuid::Uuid;

/// Processor with uniform random latency and injectable outcomes
#[derive(Debug)]
pub struct SimulatedGateway {
    name: String,
    method: PaymentMethod,
    reference_prefix: String,
    min_latency: Duration,
    max_latency: Duration,
    outcomes: Arc<dyn OutcomeGenerator>,
    calls: AtomicU64,
}

impl SimulatedGateway {
    pub fn new(
        name: impl Into<String>,
        method: PaymentMethod,
        reference_prefix: impl Into<String>,
        outcomes: Arc<dyn OutcomeGenerator>,
    ) -> Self {
        Self {
            name: name.into(),
            method,
            reference_prefix: reference_prefix.into(),
            min_latency: Duration::ZERO,
            max_latency: Duration::ZERO,
            outcomes,
            calls: AtomicU64::new(0),
        }
    }

    /// Every call waits a uniformly drawn time in `min..=max` before answering
    pub fn with_latency(mut self, min: Duration, max: Duration) -> Self {
        self.min_latency = min;
        self.max_latency = max.max(min);
        self
    }

    /// Calls received so far, including cancelled ones
    pub fn calls(&self) -> u64 {
        self.calls.load(Ordering::Relaxed)
    }

    fn sample_latency(&self) -> Duration {
        let min = self.min_latency.as_millis() as u64;
        let max = self.max_latency.as_millis() as u64;
        if max <= min {
            return self.min_latency;
        }
        Duration::from_millis(rand::thread_rng().gen_range(min..=max))
    }

    fn new_reference(&self) -> String {
        let id = Uuid::new_v4().simple().to_string();
        format!("{}_{}", self.reference_prefix, &id[..8])
    }
}

#[async_trait]
impl GatewayAdapter for SimulatedGateway {
    fn name(&self) -> &str {
        &self.name
    }

    fn method(&self) -> PaymentMethod {
        self.method
    }

    async fn charge(
        &self,
        intent: &PaymentIntent,
        cancel: CancellationToken,
    ) -> Result<String, GatewayFault> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        let latency = self.sample_latency();
        debug!(
            gateway = %self.name,
            order_id = intent.order_id(),
            call,
            latency_ms = latency.as_millis() as u64,
            "charging"
        );

        tokio::select! {
            _ = cancel.cancelled() => {
                return Err(GatewayFault::Transient(format!("{} call cancelled", self.name)));
            }
            _ = tokio::time::sleep(latency) => {}
        }

        match self.outcomes.next(call) {
            Outcome::Approve => Ok(self.new_reference()),
            Outcome::Transient(reason) => Err(GatewayFault::Transient(reason)),
            Outcome::Decline(reason) => Err(GatewayFault::Declined(reason)),
        }
    }

    fn status_line(&self) -> String {
        format!(
            "{} gateway ({:?}) - calls: {}",
            self.name,
            self.method,
            self.calls()
        )
    }
}
