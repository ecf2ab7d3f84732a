//! Per-gateway call counters

use serde::Serialize;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::warn;

/// Cumulative counters for one gateway; safe to bump from any task
#[derive(Debug, Default)]
pub struct GatewayStats {
    total_calls: AtomicU64,
    success_calls: AtomicU64,
    failed_calls: AtomicU64,
}

impl GatewayStats {
    pub fn record_attempt(&self) {
        self.total_calls.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_success(&self) {
        self.success_calls.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_failure(&self) {
        self.failed_calls.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self, gateway: &str) -> GatewayStatsSnapshot {
        let total_calls = self.total_calls.load(Ordering::Relaxed);
        let success_calls = self.success_calls.load(Ordering::Relaxed);
        let failed_calls = self.failed_calls.load(Ordering::Relaxed);

        let success_rate = if total_calls == 0 {
            0.0
        } else {
            success_calls as f64 / total_calls as f64 * 100.0
        };

        GatewayStatsSnapshot {
            gateway: gateway.to_string(),
            total_calls,
            success_calls,
            failed_calls,
            success_rate,
        }
    }
}

/// Read-only copy of a gateway's counters
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GatewayStatsSnapshot {
    pub gateway: String,
    pub total_calls: u64,
    pub success_calls: u64,
    pub failed_calls: u64,
    /// Percentage of calls that succeeded (0.0 when there were none)
    pub success_rate: f64,
}

/// Counters keyed by gateway name.
///
/// The set of gateways is fixed at construction, so lookups need no lock.
#[derive(Debug, Default)]
pub struct StatsRegistry {
    gateways: HashMap<String, GatewayStats>,
}

impl StatsRegistry {
    pub fn new<I, S>(gateways: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            gateways: gateways
                .into_iter()
                .map(|name| (name.into(), GatewayStats::default()))
                .collect(),
        }
    }

    pub fn record_attempt(&self, gateway: &str) {
        if let Some(stats) = self.lookup(gateway) {
            stats.record_attempt();
        }
    }

    pub fn record_success(&self, gateway: &str) {
        if let Some(stats) = self.lookup(gateway) {
            stats.record_success();
        }
    }

    pub fn record_failure(&self, gateway: &str) {
        if let Some(stats) = self.lookup(gateway) {
            stats.record_failure();
        }
    }

    pub fn snapshot(&self, gateway: &str) -> Option<GatewayStatsSnapshot> {
        self.gateways
            .get(gateway)
            .map(|stats| stats.snapshot(gateway))
    }

    /// Snapshots of every gateway, ordered by name
    pub fn snapshots(&self) -> Vec<GatewayStatsSnapshot> {
        let mut all: Vec<_> = self
            .gateways
            .iter()
            .map(|(name, stats)| stats.snapshot(name))
            .collect();
        all.sort_by(|a, b| a.gateway.cmp(&b.gateway));
        all
    }

    fn lookup(&self, gateway: &str) -> Option<&GatewayStats> {
        let stats = self.gateways.get(gateway);
        if stats.is_none() {
            warn!(gateway, "stats requested for unregistered gateway");
        }
        stats
    }
}
