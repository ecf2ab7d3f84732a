//! Fires a burst of concurrent payments at the simulated gateways and prints
//! what the cascade did with them.

use anyhow::Context;
use clap::Parser;
use payment_cascade::{
    CascadeConfig, InMemoryPaymentRepository, PaymentIntent, PaymentOrchestrator, PaymentStatus,
};
use rust_decimal::Decimal;
use serde_json::json;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::task::JoinSet;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Number of concurrent payments to submit
    #[arg(long, default_value_t = 20)]
    payments: u64,

    /// TOML configuration file (defaults to ./cascade.toml when present)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Amount charged per payment
    #[arg(long, default_value = "99.99")]
    amount: Decimal,

    #[arg(long, default_value = "USD")]
    currency: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let cli = Cli::parse();
    let config = CascadeConfig::load(cli.config.as_deref()).context("loading configuration")?;
    let orchestrator = Arc::new(PaymentOrchestrator::from_config(
        &config,
        Arc::new(InMemoryPaymentRepository::new()),
    )?);

    info!(payments = cli.payments, "starting cascade demo");

    let mut tasks = JoinSet::new();
    for i in 0..cli.payments {
        let intent = PaymentIntent::new(1000 + i, 1 + i % 5, cli.amount, &cli.currency)?;
        let orchestrator = Arc::clone(&orchestrator);
        tasks.spawn(async move { orchestrator.process_payment(intent).await });
    }

    let mut settled = 0u64;
    let mut failed = 0u64;
    let mut by_gateway = std::collections::BTreeMap::<String, u64>::new();
    while let Some(joined) = tasks.join_next().await {
        let record = joined.context("payment task panicked")??;
        match record.status() {
            PaymentStatus::Settled => {
                settled += 1;
                *by_gateway.entry(record.gateway().to_string()).or_default() += 1;
            }
            _ => failed += 1,
        }
    }

    let circuit_breakers: Vec<_> = [&config.primary.name, &config.secondary.name]
        .into_iter()
        .filter_map(|name| orchestrator.circuit_breaker_status(name))
        .collect();

    let report = json!({
        "payments": cli.payments,
        "settled": settled,
        "failed": failed,
        "settledByGateway": by_gateway,
        "gatewayStats": orchestrator.all_gateway_stats(),
        "circuitBreakers": circuit_breakers,
        "health": orchestrator.health(),
    });
    println!("{}", serde_json::to_string_pretty(&report)?);

    Ok(())
}
