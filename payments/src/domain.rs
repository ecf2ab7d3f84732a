//! Payment intent and the record that tracks it through the cascade

use crate::error::PaymentError;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// A request to move money for one order.
///
/// Validated on construction and immutable afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentIntent {
    order_id: u64,
    payer_id: u64,
    amount: Decimal,
    currency: String,
}

impl PaymentIntent {
    pub fn new(
        order_id: u64,
        payer_id: u64,
        amount: Decimal,
        currency: &str,
    ) -> Result<Self, PaymentError> {
        if amount <= Decimal::ZERO {
            return Err(PaymentError::InvalidIntent(format!(
                "amount must be positive, got {}",
                amount
            )));
        }

        let currency = currency.trim();
        if currency.len() != 3 || !currency.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(PaymentError::InvalidIntent(format!(
                "currency must be a three-letter code, got '{}'",
                currency
            )));
        }

        Ok(Self {
            order_id,
            payer_id,
            amount,
            currency: currency.to_ascii_uppercase(),
        })
    }

    /// Intent in US dollars
    pub fn usd(order_id: u64, payer_id: u64, amount: Decimal) -> Result<Self, PaymentError> {
        Self::new(order_id, payer_id, amount, "USD")
    }

    pub fn order_id(&self) -> u64 {
        self.order_id
    }

    pub fn payer_id(&self) -> u64 {
        self.payer_id
    }

    pub fn amount(&self) -> Decimal {
        self.amount
    }

    pub fn currency(&self) -> &str {
        &self.currency
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentStatus {
    Submitted,
    Processing,
    Settled,
    Failed,
}

impl PaymentStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, PaymentStatus::Settled | PaymentStatus::Failed)
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PaymentStatus::Submitted => "SUBMITTED",
            PaymentStatus::Processing => "PROCESSING",
            PaymentStatus::Settled => "SETTLED",
            PaymentStatus::Failed => "FAILED",
        };
        f.write_str(name)
    }
}

/// How the processor that handled the payment charged the payer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentMethod {
    Card,
    Wallet,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("illegal payment transition from {from} to {to}")]
pub struct TransitionError {
    pub from: PaymentStatus,
    pub to: PaymentStatus,
}

/// Lifecycle of one intent.
///
/// Statuses only move forward: SUBMITTED → PROCESSING → SETTLED | FAILED.
/// A transaction reference is present exactly when the record is SETTLED.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentRecord {
    id: Option<u64>,
    order_id: u64,
    payer_id: u64,
    amount: Decimal,
    currency: String,
    method: PaymentMethod,
    gateway: String,
    transaction_reference: Option<String>,
    status: PaymentStatus,
    failure_reason: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl PaymentRecord {
    pub fn submitted(intent: &PaymentIntent, gateway: &str, method: PaymentMethod) -> Self {
        let now = Utc::now();
        Self {
            id: None,
            order_id: intent.order_id,
            payer_id: intent.payer_id,
            amount: intent.amount,
            currency: intent.currency.clone(),
            method,
            gateway: gateway.to_string(),
            transaction_reference: None,
            status: PaymentStatus::Submitted,
            failure_reason: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Hand the record to `gateway`. Allowed from SUBMITTED, and from
    /// PROCESSING when cascading to the next gateway.
    pub fn start_processing(
        &mut self,
        gateway: &str,
        method: PaymentMethod,
    ) -> Result<(), TransitionError> {
        self.check(
            matches!(
                self.status,
                PaymentStatus::Submitted | PaymentStatus::Processing
            ),
            PaymentStatus::Processing,
        )?;
        self.status = PaymentStatus::Processing;
        self.gateway = gateway.to_string();
        self.method = method;
        self.touch();
        Ok(())
    }

    pub fn settle(&mut self, transaction_reference: String) -> Result<(), TransitionError> {
        self.check(
            self.status == PaymentStatus::Processing,
            PaymentStatus::Settled,
        )?;
        self.status = PaymentStatus::Settled;
        self.transaction_reference = Some(transaction_reference);
        self.touch();
        Ok(())
    }

    pub fn fail(&mut self, reason: impl Into<String>) -> Result<(), TransitionError> {
        self.check(
            self.status == PaymentStatus::Processing,
            PaymentStatus::Failed,
        )?;
        self.status = PaymentStatus::Failed;
        self.failure_reason = Some(reason.into());
        self.touch();
        Ok(())
    }

    /// Set by persistence on first save
    pub fn assign_id(&mut self, id: u64) {
        self.id = Some(id);
    }

    /// Human-readable summary of the current status
    pub fn status_message(&self) -> String {
        match self.status {
            PaymentStatus::Submitted => "Payment is pending".to_string(),
            PaymentStatus::Processing => "Payment is being processed".to_string(),
            PaymentStatus::Settled => "Payment completed successfully".to_string(),
            PaymentStatus::Failed => format!(
                "Payment failed: {}",
                self.failure_reason.as_deref().unwrap_or("Unknown error")
            ),
        }
    }

    pub fn id(&self) -> Option<u64> {
        self.id
    }

    pub fn order_id(&self) -> u64 {
        self.order_id
    }

    pub fn payer_id(&self) -> u64 {
        self.payer_id
    }

    pub fn amount(&self) -> Decimal {
        self.amount
    }

    pub fn currency(&self) -> &str {
        &self.currency
    }

    pub fn method(&self) -> PaymentMethod {
        self.method
    }

    pub fn gateway(&self) -> &str {
        &self.gateway
    }

    pub fn transaction_reference(&self) -> Option<&str> {
        self.transaction_reference.as_deref()
    }

    pub fn status(&self) -> PaymentStatus {
        self.status
    }

    pub fn failure_reason(&self) -> Option<&str> {
        self.failure_reason.as_deref()
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    fn check(&self, allowed: bool, to: PaymentStatus) -> Result<(), TransitionError> {
        if allowed {
            Ok(())
        } else {
            Err(TransitionError {
                from: self.status,
                to,
            })
        }
    }

    fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}
