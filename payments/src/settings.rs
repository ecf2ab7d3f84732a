//! Cascade configuration
//!
//! Layering, lowest priority first: built-in defaults, an optional TOML file,
//! then `CASCADE__*` environment variables, e.g.
//! `CASCADE__PRIMARY__TIMEOUT_MS=2500` or
//! `CASCADE__SECONDARY__BREAKER__OPEN_DURATION_MS=5000`.

use crate::error::{PaymentError, Result};
use config::{ConfigError, Environment, File};
use gateway_guard::RetryPolicy;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CascadeConfig {
    pub primary: GatewayConfig,
    pub secondary: GatewayConfig,
    /// Count a business decline as a breaker failure
    pub decline_trips_breaker: bool,
    /// Try the secondary gateway after the primary declines
    pub cascade_on_decline: bool,
}

impl Default for CascadeConfig {
    fn default() -> Self {
        Self {
            primary: GatewayConfig::primary(),
            secondary: GatewayConfig::secondary(),
            decline_trips_breaker: true,
            cascade_on_decline: true,
        }
    }
}

impl CascadeConfig {
    /// Load from `path` (required when given, `cascade.toml` if present
    /// otherwise) and the environment.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let file = match path {
            Some(path) => File::from(path).required(true),
            None => File::with_name("cascade").required(false),
        };

        let config: CascadeConfig = config::Config::builder()
            .add_source(config::Config::try_from(&CascadeConfig::default())?)
            .add_source(file)
            .add_source(
                Environment::with_prefix("CASCADE")
                    .prefix_separator("__")
                    .separator("__"),
            )
            .build()?
            .try_deserialize()?;

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        self.primary.validate()?;
        self.secondary.validate()?;
        if self.primary.name == self.secondary.name {
            return Err(invalid(format!(
                "primary and secondary gateways share the name '{}'",
                self.primary.name
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct GatewayConfig {
    pub name: String,
    /// Deadline for each attempt
    pub timeout_ms: u64,
    /// Bulkhead permits
    pub max_concurrency: usize,
    pub retry: RetryConfig,
    pub breaker: BreakerConfig,
    pub simulation: SimulationConfig,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self::primary()
    }
}

impl GatewayConfig {
    pub fn primary() -> Self {
        Self {
            name: "primary".to_string(),
            timeout_ms: 3000,
            max_concurrency: 10,
            retry: RetryConfig::default(),
            breaker: BreakerConfig {
                slow_call_ms: Some(2000),
                ..BreakerConfig::default()
            },
            simulation: SimulationConfig {
                profile: SimulationProfile::Card,
                min_latency_ms: 500,
                max_latency_ms: 1500,
            },
        }
    }

    pub fn secondary() -> Self {
        Self {
            name: "secondary".to_string(),
            timeout_ms: 4000,
            max_concurrency: 10,
            retry: RetryConfig::default(),
            breaker: BreakerConfig {
                slow_call_ms: Some(3000),
                ..BreakerConfig::default()
            },
            simulation: SimulationConfig {
                profile: SimulationProfile::Wallet,
                min_latency_ms: 1000,
                max_latency_ms: 2500,
            },
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::exponential(
            self.retry.max_attempts,
            Duration::from_millis(self.retry.base_delay_ms),
            self.retry.multiplier,
            Duration::from_millis(self.retry.max_delay_ms),
        )
        .with_jitter(self.retry.jitter_factor)
    }

    pub fn circuit_config(&self) -> gateway_guard::Config {
        let breaker = &self.breaker;
        gateway_guard::Config {
            failure_threshold: None,
            failure_rate_threshold: Some(breaker.failure_rate_threshold),
            minimum_calls: breaker.minimum_calls,
            sliding_window_size: breaker.sliding_window_size,
            failure_window_secs: breaker.failure_window_secs,
            slow_call_secs: breaker.slow_call_ms.map(|ms| ms as f64 / 1000.0),
            open_duration_secs: breaker.open_duration_ms as f64 / 1000.0,
            half_open_probes: breaker.half_open_probes,
            jitter_factor: breaker.jitter_factor,
        }
    }

    fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(invalid("gateway name must not be empty"));
        }
        if self.max_concurrency == 0 {
            return Err(invalid(format!(
                "{}: max_concurrency must be at least 1",
                self.name
            )));
        }
        if self.retry.max_attempts == 0 {
            return Err(invalid(format!(
                "{}: retry.max_attempts must be at least 1",
                self.name
            )));
        }
        if !(0.0..=1.0).contains(&self.breaker.failure_rate_threshold) {
            return Err(invalid(format!(
                "{}: breaker.failure_rate_threshold must be within 0.0..=1.0",
                self.name
            )));
        }
        if self.breaker.half_open_probes == 0 || self.breaker.sliding_window_size == 0 {
            return Err(invalid(format!(
                "{}: breaker window and probe counts must be at least 1",
                self.name
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Total attempts including the first
    pub max_attempts: usize,
    pub base_delay_ms: u64,
    pub multiplier: f64,
    pub max_delay_ms: u64,
    pub jitter_factor: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_ms: 200,
            multiplier: 2.0,
            max_delay_ms: 2000,
            jitter_factor: 0.2,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct BreakerConfig {
    pub failure_rate_threshold: f64,
    pub minimum_calls: usize,
    pub sliding_window_size: usize,
    pub failure_window_secs: f64,
    pub slow_call_ms: Option<u64>,
    pub open_duration_ms: u64,
    pub half_open_probes: usize,
    pub jitter_factor: f64,
}

impl Default for BreakerConfig {
    fn default() -> Self {
        Self {
            failure_rate_threshold: 0.5,
            minimum_calls: 5,
            sliding_window_size: 10,
            failure_window_secs: 60.0,
            slow_call_ms: None,
            open_duration_ms: 10_000,
            half_open_probes: 3,
            jitter_factor: 0.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SimulationProfile {
    /// Cycles through approvals, timeouts, outages and declines by call count
    Card,
    /// Mostly approves, occasionally fails
    Wallet,
    AlwaysApprove,
    AlwaysDecline,
    AlwaysTransient,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SimulationConfig {
    pub profile: SimulationProfile,
    pub min_latency_ms: u64,
    pub max_latency_ms: u64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            profile: SimulationProfile::AlwaysApprove,
            min_latency_ms: 0,
            max_latency_ms: 0,
        }
    }
}

pub(crate) fn invalid(message: impl Into<String>) -> PaymentError {
    PaymentError::Config(ConfigError::Message(message.into()))
}
