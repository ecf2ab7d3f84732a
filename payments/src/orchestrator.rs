//! Primary → secondary payment cascade
//!
//! Every gateway sits behind its own [`Pipeline`] (breaker, bulkhead, retry,
//! timeout). An intent is tried on the primary first; any failure there hands
//! it to the secondary; a failure on the secondary ends it as FAILED. The two
//! legs never run at the same time for one intent.

use crate::domain::{PaymentIntent, PaymentMethod, PaymentRecord};
use crate::error::{PaymentError, Result};
use crate::gateway::{
    Always, Cyclic, GatewayAdapter, GatewayFault, Outcome, OutcomeGenerator, SimulatedGateway,
    Weighted,
};
use crate::repository::PaymentRepository;
use crate::settings::{CascadeConfig, GatewayConfig, SimulationProfile, invalid};
use crate::stats::{GatewayStatsSnapshot, StatsRegistry};
use gateway_guard::{
    CancellationToken, CircuitBreaker, CircuitError, CircuitState, CircuitStatus, Pipeline,
    PredicateClassifier,
};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

/// A gateway together with the pipeline guarding it
#[derive(Debug)]
struct Lane {
    adapter: Arc<dyn GatewayAdapter>,
    pipeline: Pipeline,
}

impl Lane {
    fn new(config: &GatewayConfig, adapter: Arc<dyn GatewayAdapter>, decline_trips_breaker: bool) -> Self {
        let breaker = CircuitBreaker::builder(config.name.as_str())
            .config(config.circuit_config())
            .on_open(|t| {
                warn!(
                    gateway = t.circuit,
                    failure_rate = t.failure_ratio * 100.0,
                    "circuit opened, failing fast"
                )
            })
            .on_half_open(|t| info!(gateway = t.circuit, "circuit half-open, probing"))
            .on_close(|t| info!(gateway = t.circuit, "circuit closed"))
            .build();

        let mut builder = Pipeline::builder(breaker)
            .max_concurrency(config.max_concurrency)
            .retry(config.retry_policy())
            .timeout(config.timeout());

        if !decline_trips_breaker {
            builder = builder.failure_classifier(Arc::new(PredicateClassifier::new(|ctx| {
                !matches!(
                    ctx.error.downcast_ref::<GatewayFault>(),
                    Some(GatewayFault::Declined(_))
                )
            })));
        }

        Self {
            adapter,
            pipeline: builder.build(),
        }
    }

    fn name(&self) -> &str {
        self.pipeline.name()
    }

    fn method(&self) -> PaymentMethod {
        self.adapter.method()
    }
}

/// Gateway entry of [`HealthReport`]
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GatewayHealth {
    pub name: String,
    pub status: String,
    pub circuit: CircuitState,
    pub available_permits: usize,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthReport {
    pub service: &'static str,
    pub gateways: Vec<GatewayHealth>,
}

pub struct PaymentOrchestrator {
    primary: Lane,
    secondary: Lane,
    stats: StatsRegistry,
    repository: Arc<dyn PaymentRepository>,
    cascade_on_decline: bool,
}

impl PaymentOrchestrator {
    /// Wire the given adapters behind pipelines built from `config`
    pub fn new(
        config: &CascadeConfig,
        primary: Arc<dyn GatewayAdapter>,
        secondary: Arc<dyn GatewayAdapter>,
        repository: Arc<dyn PaymentRepository>,
    ) -> Result<Self> {
        config.validate()?;
        for (settings, adapter) in [
            (&config.primary, &primary),
            (&config.secondary, &secondary),
        ] {
            if adapter.name() != settings.name {
                return Err(invalid(format!(
                    "gateway '{}' is configured as '{}'",
                    adapter.name(),
                    settings.name
                )));
            }
        }

        let primary = Lane::new(&config.primary, primary, config.decline_trips_breaker);
        let secondary = Lane::new(&config.secondary, secondary, config.decline_trips_breaker);
        let stats = StatsRegistry::new([primary.name(), secondary.name()]);

        Ok(Self {
            primary,
            secondary,
            stats,
            repository,
            cascade_on_decline: config.cascade_on_decline,
        })
    }

    /// Orchestrator over simulated gateways described by `config`
    pub fn from_config(
        config: &CascadeConfig,
        repository: Arc<dyn PaymentRepository>,
    ) -> Result<Self> {
        let primary = simulated_gateway(&config.primary, PaymentMethod::Card, "card");
        let secondary = simulated_gateway(&config.secondary, PaymentMethod::Wallet, "wallet");
        Self::new(config, Arc::new(primary), Arc::new(secondary), repository)
    }

    /// Drive one intent to SETTLED or FAILED.
    ///
    /// Gateway faults never surface as `Err`; they end in a FAILED record.
    /// `Err` means the record could not be persisted or an internal
    /// invariant broke.
    pub async fn process_payment(&self, intent: PaymentIntent) -> Result<PaymentRecord> {
        let order_id = intent.order_id();
        let cancel = CancellationToken::new();

        let mut record =
            PaymentRecord::submitted(&intent, self.primary.name(), self.primary.method());
        record.start_processing(self.primary.name(), self.primary.method())?;
        let mut record = self.repository.save(record).await?;
        info!(
            order_id,
            amount = %intent.amount(),
            currency = intent.currency(),
            gateway = self.primary.name(),
            "processing payment"
        );

        let primary_fault = match self.attempt(&self.primary, &intent, &cancel).await {
            Ok(reference) => return self.settle(record, reference).await,
            Err(fault) => fault,
        };

        if !self.cascade_on_decline && is_decline(&primary_fault) {
            warn!(order_id, gateway = self.primary.name(), error = %primary_fault, "payment declined");
            record.fail(format!("Payment declined: {}", describe(&primary_fault)))?;
            return self.repository.save(record).await;
        }

        warn!(
            order_id,
            gateway = self.primary.name(),
            error = %primary_fault,
            "primary gateway failed, cascading to {}",
            self.secondary.name()
        );
        record.start_processing(self.secondary.name(), self.secondary.method())?;
        let record = self.repository.save(record).await?;

        match self.attempt(&self.secondary, &intent, &cancel).await {
            Ok(reference) => self.settle(record, reference).await,
            Err(fault) => self.fail(record, fault).await,
        }
    }

    pub fn gateway_stats(&self, gateway: &str) -> Option<GatewayStatsSnapshot> {
        self.stats.snapshot(gateway)
    }

    pub fn all_gateway_stats(&self) -> Vec<GatewayStatsSnapshot> {
        self.stats.snapshots()
    }

    pub fn circuit_breaker_status(&self, gateway: &str) -> Option<CircuitStatus> {
        self.lane(gateway).map(|lane| lane.pipeline.status())
    }

    /// Force a gateway's circuit back to CLOSED
    pub fn reset_circuit(&self, gateway: &str) -> Result<()> {
        let lane = self
            .lane(gateway)
            .ok_or_else(|| PaymentError::UnknownGateway(gateway.to_string()))?;
        lane.pipeline.reset();
        info!(gateway, "circuit reset");
        Ok(())
    }

    pub async fn payment_by_order_id(&self, order_id: u64) -> Result<Option<PaymentRecord>> {
        self.repository.find_by_order_id(order_id).await
    }

    pub async fn payments_by_payer_id(&self, payer_id: u64) -> Result<Vec<PaymentRecord>> {
        self.repository.find_by_payer_id(payer_id).await
    }

    pub async fn all_payments(&self) -> Result<Vec<PaymentRecord>> {
        self.repository.find_all().await
    }

    pub fn health(&self) -> HealthReport {
        let gateways = [&self.primary, &self.secondary]
            .into_iter()
            .map(|lane| GatewayHealth {
                name: lane.name().to_string(),
                status: lane.adapter.status_line(),
                circuit: lane.pipeline.state(),
                available_permits: lane.pipeline.bulkhead().available(),
            })
            .collect();

        HealthReport {
            service: "payment-cascade",
            gateways,
        }
    }

    /// One leg of the cascade: the full pipeline against one gateway
    async fn attempt(
        &self,
        lane: &Lane,
        intent: &PaymentIntent,
        cancel: &CancellationToken,
    ) -> std::result::Result<String, CircuitError<GatewayFault>> {
        let gateway = lane.name();
        self.stats.record_attempt(gateway);

        let adapter: &dyn GatewayAdapter = lane.adapter.as_ref();
        let result = lane
            .pipeline
            .execute(cancel, move |token| adapter.charge(intent, token))
            .await;

        match &result {
            Ok(reference) => {
                self.stats.record_success(gateway);
                info!(order_id = intent.order_id(), gateway, reference = %reference, "gateway approved payment");
            }
            Err(fault) => {
                self.stats.record_failure(gateway);
                if fault.is_rejection() {
                    warn!(order_id = intent.order_id(), gateway, error = %fault, "gateway call rejected");
                } else {
                    warn!(order_id = intent.order_id(), gateway, error = %fault, "gateway call failed");
                }
            }
        }

        result
    }

    async fn settle(&self, mut record: PaymentRecord, reference: String) -> Result<PaymentRecord> {
        record.settle(reference)?;
        info!(
            order_id = record.order_id(),
            gateway = record.gateway(),
            "payment settled"
        );
        self.repository.save(record).await
    }

    async fn fail(
        &self,
        mut record: PaymentRecord,
        fault: CircuitError<GatewayFault>,
    ) -> Result<PaymentRecord> {
        error!(
            order_id = record.order_id(),
            error = %fault,
            "all payment gateways failed"
        );
        record.fail(format!(
            "All payment gateways unavailable: {}",
            describe(&fault)
        ))?;
        self.repository.save(record).await
    }

    fn lane(&self, gateway: &str) -> Option<&Lane> {
        [&self.primary, &self.secondary]
            .into_iter()
            .find(|lane| lane.name() == gateway)
    }
}

fn is_decline(fault: &CircuitError<GatewayFault>) -> bool {
    matches!(fault, CircuitError::Execution(GatewayFault::Declined(_)))
}

/// Failure reason as stored on the record; processor answers are kept verbatim
fn describe(fault: &CircuitError<GatewayFault>) -> String {
    match fault {
        CircuitError::Execution(inner) => inner.to_string(),
        other => other.to_string(),
    }
}

fn simulated_gateway(
    config: &GatewayConfig,
    method: PaymentMethod,
    reference_prefix: &str,
) -> SimulatedGateway {
    let outcomes: Arc<dyn OutcomeGenerator> = match config.simulation.profile {
        SimulationProfile::Card => Arc::new(Cyclic::card_profile()),
        SimulationProfile::Wallet => Arc::new(Weighted::wallet_profile()),
        SimulationProfile::AlwaysApprove => Arc::new(Always(Outcome::Approve)),
        SimulationProfile::AlwaysDecline => {
            Arc::new(Always(Outcome::decline("payment declined")))
        }
        SimulationProfile::AlwaysTransient => Arc::new(Always(Outcome::transient(format!(
            "{} temporarily unavailable",
            config.name
        )))),
    };

    let method = match config.simulation.profile {
        SimulationProfile::Card => PaymentMethod::Card,
        SimulationProfile::Wallet => PaymentMethod::Wallet,
        _ => method,
    };

    SimulatedGateway::new(config.name.as_str(), method, reference_prefix, outcomes).with_latency(
        Duration::from_millis(config.simulation.min_latency_ms),
        Duration::from_millis(config.simulation.max_latency_ms),
    )
}

impl std::fmt::Debug for PaymentOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PaymentOrchestrator")
            .field("primary", &self.primary)
            .field("secondary", &self.secondary)
            .field("cascade_on_decline", &self.cascade_on_decline)
            .finish()
    }
}
