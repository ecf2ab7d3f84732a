//! payment-cascade - resilient primary/secondary payment orchestration
//!
//! A [`PaymentOrchestrator`] takes a [`PaymentIntent`], tries the primary
//! gateway through its own circuit breaker, bulkhead, retry policy and
//! timeout, falls back to the secondary gateway with the same protection,
//! and returns a terminal [`PaymentRecord`] (SETTLED or FAILED).
//!
//! ```no_run
//! use payment_cascade::{
//!     CascadeConfig, InMemoryPaymentRepository, PaymentIntent, PaymentOrchestrator,
//! };
//! use rust_decimal::Decimal;
//! use std::sync::Arc;
//!
//! # async fn run() -> payment_cascade::Result<()> {
//! let orchestrator = PaymentOrchestrator::from_config(
//!     &CascadeConfig::load(None)?,
//!     Arc::new(InMemoryPaymentRepository::new()),
//! )?;
//!
//! let intent = PaymentIntent::usd(1001, 42, Decimal::new(9999, 2))?;
//! let record = orchestrator.process_payment(intent).await?;
//! println!("{}: {}", record.status(), record.status_message());
//! # Ok(())
//! # }
//! ```

pub mod domain;
pub mod error;
pub mod gateway;
pub mod orchestrator;
pub mod repository;
pub mod settings;
pub mod stats;

pub use domain::{PaymentIntent, PaymentMethod, PaymentRecord, PaymentStatus, TransitionError};
pub use error::{PaymentError, Result};
pub use gateway::{GatewayAdapter, GatewayFault, SimulatedGateway};
pub use orchestrator::{GatewayHealth, HealthReport, PaymentOrchestrator};
pub use repository::{InMemoryPaymentRepository, PaymentRepository};
pub use settings::CascadeConfig;
pub use stats::{GatewayStatsSnapshot, StatsRegistry};
