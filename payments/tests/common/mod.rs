#![allow(dead_code)]

use payment_cascade::gateway::{Always, Outcome, Scripted};
use payment_cascade::{
    CascadeConfig, InMemoryPaymentRepository, PaymentMethod, PaymentOrchestrator, SimulatedGateway,
};
use std::sync::Arc;
use std::time::Duration;

/// Defaults with millisecond backoff so tests run in real time
pub fn fast_config() -> CascadeConfig {
    let mut config = CascadeConfig::default();
    for gateway in [&mut config.primary, &mut config.secondary] {
        gateway.timeout_ms = 1000;
        gateway.retry.base_delay_ms = 1;
        gateway.retry.max_delay_ms = 5;
    }
    config
}

pub fn card(outcome: Outcome) -> Arc<SimulatedGateway> {
    Arc::new(SimulatedGateway::new(
        "primary",
        PaymentMethod::Card,
        "card",
        Arc::new(Always(outcome)),
    ))
}

pub fn wallet(outcome: Outcome) -> Arc<SimulatedGateway> {
    Arc::new(SimulatedGateway::new(
        "secondary",
        PaymentMethod::Wallet,
        "wallet",
        Arc::new(Always(outcome)),
    ))
}

pub fn scripted_card(script: Vec<Outcome>) -> Arc<SimulatedGateway> {
    Arc::new(SimulatedGateway::new(
        "primary",
        PaymentMethod::Card,
        "card",
        Arc::new(Scripted::new(script)),
    ))
}

pub fn slow_card(latency: Duration) -> Arc<SimulatedGateway> {
    Arc::new(
        SimulatedGateway::new(
            "primary",
            PaymentMethod::Card,
            "card",
            Arc::new(Always(Outcome::Approve)),
        )
        .with_latency(latency, latency),
    )
}

pub fn orchestrator(
    config: &CascadeConfig,
    primary: &Arc<SimulatedGateway>,
    secondary: &Arc<SimulatedGateway>,
) -> PaymentOrchestrator {
    PaymentOrchestrator::new(
        config,
        primary.clone(),
        secondary.clone(),
        Arc::new(InMemoryPaymentRepository::new()),
    )
    .expect("valid test configuration")
}
