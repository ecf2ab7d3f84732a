//! Circuit breaker implementation using state machines
//!
//! The breaker is a gate plus a feedback loop: callers ask [`CircuitBreaker::allow`]
//! before a call and report the outcome with [`CircuitBreaker::on_result`].
//! Window update and transition decision happen inside one `&mut self` call,
//! so wrapping the breaker in a mutex makes each recording atomic.

use crate::{
    EventKind, StorageBackend,
    callbacks::{Callbacks, Transition},
    errors::CircuitError,
    storage::WindowCounts,
};
use serde::Serialize;
use state_machines::state_machine;
use std::convert::Infallible;
use std::fmt;
use std::sync::Arc;

/// Circuit breaker configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Absolute number of failures in the window that opens the circuit.
    /// If None, only the rate-based threshold is used
    pub failure_threshold: Option<usize>,

    /// Failed-or-slow ratio (0.0-1.0) that opens the circuit.
    /// If None, only the absolute threshold is used
    pub failure_rate_threshold: Option<f64>,

    /// Minimum number of buffered calls before the rate is evaluated
    pub minimum_calls: usize,

    /// Number of most recent calls the window keeps
    pub sliding_window_size: usize,

    /// Maximum age in seconds of calls counted in the window
    pub failure_window_secs: f64,

    /// Successful calls slower than this are recorded as slow
    pub slow_call_secs: Option<f64>,

    /// Seconds the circuit stays open before letting probes through
    pub open_duration_secs: f64,

    /// Probe calls permitted while half-open; all must succeed to close
    pub half_open_probes: usize,

    /// Jitter factor for open_duration (0.0 = no jitter, 1.0 = full jitter)
    /// Uses chrono-machines formula: duration * (1 - jitter + rand * jitter)
    pub jitter_factor: f64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            failure_threshold: None,
            failure_rate_threshold: Some(0.5),
            minimum_calls: 5,
            sliding_window_size: 10,
            failure_window_secs: 60.0,
            slow_call_secs: None,
            open_duration_secs: 10.0,
            half_open_probes: 3,
            jitter_factor: 0.0,
        }
    }
}

/// Externally visible circuit state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CircuitState {
    Closed,
    Open,
    HalfOpen,
}

impl CircuitState {
    fn from_machine(name: &str) -> Self {
        match name {
            "Open" => CircuitState::Open,
            "HalfOpen" => CircuitState::HalfOpen,
            _ => CircuitState::Closed,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            CircuitState::Closed => "CLOSED",
            CircuitState::Open => "OPEN",
            CircuitState::HalfOpen => "HALF_OPEN",
        }
    }
}

impl fmt::Display for CircuitState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Point-in-time view of a circuit for monitoring
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CircuitStatus {
    pub name: String,
    pub state: CircuitState,
    /// Failed-or-slow calls as a percentage of buffered calls
    pub failure_rate: f64,
    pub buffered_calls: usize,
    pub failed_calls: usize,
    pub successful_calls: usize,
    pub slow_calls: usize,
}

/// Circuit breaker context - shared data across all states
#[derive(Clone)]
pub struct CircuitContext {
    pub name: String,
    pub config: Config,
    pub storage: Arc<dyn StorageBackend>,
}

impl CircuitContext {
    fn window(&self) -> WindowCounts {
        self.storage.window_counts(
            &self.name,
            self.config.failure_window_secs,
            self.config.sliding_window_size,
        )
    }

    /// Open duration for one trip, with jitter applied
    fn open_secs(&self) -> f64 {
        if self.config.jitter_factor > 0.0 {
            let open_ms = (self.config.open_duration_secs * 1000.0) as u64;
            let policy = chrono_machines::Policy {
                max_attempts: 1,
                base_delay_ms: open_ms,
                multiplier: 1.0,
                max_delay_ms: open_ms,
            };
            (policy.calculate_delay(1, self.config.jitter_factor) as f64) / 1000.0
        } else {
            self.config.open_duration_secs
        }
    }

    fn threshold_exceeded(&self) -> bool {
        let window = self.window();

        if let Some(threshold) = self.config.failure_threshold
            && window.failures >= threshold
        {
            return true;
        }

        if let Some(rate_threshold) = self.config.failure_rate_threshold
            && window.total() > 0
            && window.total() >= self.config.minimum_calls
            && window.failure_ratio() >= rate_threshold
        {
            return true;
        }

        false
    }
}

impl Default for CircuitContext {
    fn default() -> Self {
        Self {
            name: String::new(),
            config: Config::default(),
            storage: Arc::new(crate::MemoryStorage::new()),
        }
    }
}

impl fmt::Debug for CircuitContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CircuitContext")
            .field("name", &self.name)
            .field("config", &self.config)
            .field("storage", &"<dyn StorageBackend>")
            .finish()
    }
}

/// Data specific to the Open state
#[derive(Debug, Clone, Default)]
pub struct OpenData {
    pub opened_at: f64,
    /// Jittered open duration, drawn once when the circuit trips
    pub open_secs: f64,
}

/// Data specific to the HalfOpen state
#[derive(Debug, Clone, Default)]
pub struct HalfOpenData {
    pub consecutive_successes: usize,
    /// Probes admitted by `allow()` whose outcome has not been reported yet
    pub probes_in_flight: usize,
}

state_machine! {
    name: Circuit,
    context: CircuitContext,
    dynamic: true,

    initial: Closed,
    states: [
        Closed,
        Open(OpenData),
        HalfOpen(HalfOpenData),
    ],
    events {
        trip {
            guards: [should_open],
            transition: { from: [Closed, HalfOpen], to: Open }
        }
        attempt_reset {
            guards: [timeout_elapsed],
            transition: { from: Open, to: HalfOpen }
        }
        close {
            guards: [should_close],
            transition: { from: HalfOpen, to: Closed }
        }
    }
}

impl Circuit<Closed> {
    /// Open once the window crosses the absolute or rate threshold
    fn should_open(&self, ctx: &CircuitContext) -> bool {
        ctx.threshold_exceeded()
    }
}

impl Circuit<HalfOpen> {
    /// Any failed probe reopens the circuit
    fn should_open(&self, _ctx: &CircuitContext) -> bool {
        true
    }

    fn should_close(&self, ctx: &CircuitContext) -> bool {
        self.state_data_half_open()
            .map(|data| data.consecutive_successes >= ctx.config.half_open_probes)
            .unwrap_or(false)
    }
}

impl Circuit<Open> {
    fn timeout_elapsed(&self, ctx: &CircuitContext) -> bool {
        let Some(data) = self.state_data_open() else {
            return false;
        };
        ctx.storage.monotonic_time() - data.opened_at >= data.open_secs
    }
}

/// Proof that a call was let through by [`CircuitBreaker::permit`].
///
/// Carries the generation of the breaker phase that admitted the call. Every
/// transition starts a new generation; outcomes reported with an older one
/// still land in the window but never count as probes or drive transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Admission {
    generation: u64,
}

impl Admission {
    pub fn generation(&self) -> u64 {
        self.generation
    }
}

/// Circuit breaker public API
pub struct CircuitBreaker {
    machine: DynamicCircuit,
    context: CircuitContext,
    callbacks: Callbacks,
    generation: u64,
}

impl CircuitBreaker {
    /// Create a new circuit breaker (use builder() for more options)
    pub fn new(name: impl Into<String>, config: Config) -> Self {
        let context = CircuitContext {
            name: name.into(),
            config,
            storage: Arc::new(crate::MemoryStorage::new()),
        };
        Self::with_context_and_callbacks(context, Callbacks::new())
    }

    pub(crate) fn with_context_and_callbacks(
        context: CircuitContext,
        callbacks: Callbacks,
    ) -> Self {
        let machine = DynamicCircuit::new(context.clone());

        Self {
            machine,
            context,
            callbacks,
            generation: 0,
        }
    }

    /// Create a new circuit breaker builder
    pub fn builder(name: impl Into<String>) -> crate::builder::CircuitBuilder {
        crate::builder::CircuitBuilder::new(name)
    }

    pub fn name(&self) -> &str {
        &self.context.name
    }

    pub fn config(&self) -> &Config {
        &self.context.config
    }

    /// Gate check before a call. `false` means fail fast without calling.
    pub fn allow(&mut self) -> bool {
        self.permit::<Infallible>().is_ok()
    }

    /// Same as [`allow`](Self::allow) but explains a rejection.
    ///
    /// An open circuit whose open duration has elapsed moves to HalfOpen here,
    /// and the call is admitted as one of the limited probes.
    pub fn permit<E>(&mut self) -> Result<Admission, CircuitError<E>> {
        if self.machine.current_state() == "Open"
            && self.machine.handle(CircuitEvent::AttemptReset).is_ok()
        {
            self.context.storage.clear(&self.context.name);
            self.transitioned(CircuitState::Open, CircuitState::HalfOpen, 0.0);
        }

        match self.state() {
            CircuitState::Closed => Ok(self.admission()),
            CircuitState::Open => Err(CircuitError::Open {
                circuit: self.context.name.clone(),
                opened_at: self.opened_at().unwrap_or(0.0),
            }),
            CircuitState::HalfOpen => {
                let probes = self.context.config.half_open_probes;
                if let Some(data) = self.machine.half_open_data_mut() {
                    if data.consecutive_successes + data.probes_in_flight >= probes {
                        return Err(CircuitError::HalfOpenLimitReached {
                            circuit: self.context.name.clone(),
                        });
                    }
                    data.probes_in_flight += 1;
                }
                Ok(self.admission())
            }
        }
    }

    /// Record an outcome as belonging to the current phase.
    ///
    /// Callers that may report after the circuit has moved on should use
    /// [`report`](Self::report) with the admission they were given.
    pub fn on_result(&mut self, kind: EventKind, duration: f64) {
        self.report(self.admission(), kind, duration);
    }

    /// Feed the outcome of an admitted call back into the breaker
    pub fn report(&mut self, admission: Admission, kind: EventKind, duration: f64) {
        self.context
            .storage
            .record(&self.context.name, kind, duration);

        if admission.generation != self.generation {
            return;
        }

        match self.state() {
            CircuitState::Closed => self.try_trip(CircuitState::Closed),
            CircuitState::HalfOpen => {
                self.release_probe();
                match kind {
                    EventKind::Success => {
                        if let Some(data) = self.machine.half_open_data_mut() {
                            data.consecutive_successes += 1;
                        }
                        if self.machine.handle(CircuitEvent::Close).is_ok() {
                            self.context.storage.clear(&self.context.name);
                            self.transitioned(CircuitState::HalfOpen, CircuitState::Closed, 0.0);
                        }
                    }
                    EventKind::Failure | EventKind::Slow => {
                        self.try_trip(CircuitState::HalfOpen)
                    }
                }
            }
            // Only reachable through on_result; the window is cleared when
            // the circuit half-opens.
            CircuitState::Open => {}
        }
    }

    pub fn on_ignored(&mut self) {
        self.report_ignored(self.admission());
    }

    /// Report that an admitted call ended without an outcome worth recording
    /// (e.g. rejected further down the pipeline). Frees its probe slot.
    pub fn report_ignored(&mut self, admission: Admission) {
        if admission.generation == self.generation {
            self.release_probe();
        }
    }

    /// Classify a successful call by its duration
    pub fn classify_success(&self, duration: f64) -> EventKind {
        match self.context.config.slow_call_secs {
            Some(limit) if duration >= limit => EventKind::Slow,
            _ => EventKind::Success,
        }
    }

    pub fn state(&self) -> CircuitState {
        CircuitState::from_machine(self.machine.current_state())
    }

    pub fn is_open(&self) -> bool {
        self.machine.current_state() == "Open"
    }

    pub fn is_closed(&self) -> bool {
        self.machine.current_state() == "Closed"
    }

    /// Monotonic timestamp (seconds) at which the circuit last opened
    pub fn opened_at(&self) -> Option<f64> {
        self.machine.open_data().map(|d| d.opened_at)
    }

    /// Monotonic timestamp (seconds) after which probes are let through
    pub fn reopens_at(&self) -> Option<f64> {
        self.machine.open_data().map(|d| d.opened_at + d.open_secs)
    }

    pub fn status(&self) -> CircuitStatus {
        let window = self.context.window();
        CircuitStatus {
            name: self.context.name.clone(),
            state: self.state(),
            failure_rate: window.failure_ratio() * 100.0,
            buffered_calls: window.total(),
            failed_calls: window.failures,
            successful_calls: window.successes,
            slow_calls: window.slow,
        }
    }

    /// Clear the window and reset the circuit to Closed
    pub fn reset(&mut self) {
        let from = self.state();
        self.context.storage.clear(&self.context.name);
        self.machine = DynamicCircuit::new(self.context.clone());
        self.generation = self.generation.wrapping_add(1);
        if from != CircuitState::Closed {
            self.notify(from, CircuitState::Closed, 0.0);
        }
    }

    fn try_trip(&mut self, from: CircuitState) {
        let failure_ratio = self.context.window().failure_ratio();
        if self.machine.handle(CircuitEvent::Trip).is_ok() {
            let opened_at = self.context.storage.monotonic_time();
            let open_secs = self.context.open_secs();
            if let Some(data) = self.machine.open_data_mut() {
                data.opened_at = opened_at;
                data.open_secs = open_secs;
            }
            self.transitioned(from, CircuitState::Open, failure_ratio);
        }
    }

    fn release_probe(&mut self) {
        if let Some(data) = self.machine.half_open_data_mut() {
            data.probes_in_flight = data.probes_in_flight.saturating_sub(1);
        }
    }

    fn admission(&self) -> Admission {
        Admission {
            generation: self.generation,
        }
    }

    fn transitioned(&mut self, from: CircuitState, to: CircuitState, failure_ratio: f64) {
        self.generation = self.generation.wrapping_add(1);
        self.notify(from, to, failure_ratio);
    }

    fn notify(&self, from: CircuitState, to: CircuitState, failure_ratio: f64) {
        self.callbacks.trigger(&Transition {
            circuit: &self.context.name,
            from,
            to,
            failure_ratio,
        });
    }
}

impl fmt::Debug for CircuitBreaker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CircuitBreaker")
            .field("name", &self.context.name)
            .field("state", &self.state())
            .field("callbacks", &self.callbacks)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn fast_config() -> Config {
        Config {
            failure_rate_threshold: Some(0.5),
            minimum_calls: 4,
            sliding_window_size: 10,
            open_duration_secs: 0.02,
            half_open_probes: 2,
            ..Default::default()
        }
    }

    fn trip(circuit: &mut CircuitBreaker) {
        for _ in 0..circuit.config().minimum_calls {
            assert!(circuit.allow());
            circuit.on_result(EventKind::Failure, 0.01);
        }
        assert!(circuit.is_open());
    }

    #[test]
    fn test_circuit_breaker_creation() {
        let circuit = CircuitBreaker::new("card", Config::default());

        assert!(circuit.is_closed());
        assert_eq!(circuit.state(), CircuitState::Closed);
        assert_eq!(circuit.opened_at(), None);
    }

    #[test]
    fn test_opens_at_failure_rate() {
        let mut circuit = CircuitBreaker::new("card", fast_config());

        circuit.on_result(EventKind::Success, 0.01);
        circuit.on_result(EventKind::Success, 0.01);
        circuit.on_result(EventKind::Failure, 0.01);
        assert!(circuit.is_closed(), "1/3 failures below minimum calls");

        circuit.on_result(EventKind::Failure, 0.01);
        assert!(circuit.is_open(), "2/4 failures reaches 50%");
        assert!(circuit.opened_at().is_some());
    }

    #[test]
    fn test_minimum_calls_prevents_premature_trip() {
        let mut circuit = CircuitBreaker::new(
            "card",
            Config {
                minimum_calls: 20,
                sliding_window_size: 50,
                ..fast_config()
            },
        );

        for _ in 0..10 {
            circuit.on_result(EventKind::Failure, 0.01);
        }
        assert!(circuit.is_closed());
    }

    #[test]
    fn test_below_rate_stays_closed() {
        let mut circuit = CircuitBreaker::new("card", fast_config());

        for i in 0..20 {
            let kind = if i % 3 == 0 {
                EventKind::Failure
            } else {
                EventKind::Success
            };
            circuit.on_result(kind, 0.01);
        }
        assert!(circuit.is_closed());
    }

    #[test]
    fn test_slow_calls_count_toward_rate() {
        let mut circuit = CircuitBreaker::new(
            "card",
            Config {
                slow_call_secs: Some(1.0),
                ..fast_config()
            },
        );

        assert_eq!(circuit.classify_success(0.2), EventKind::Success);
        assert_eq!(circuit.classify_success(1.5), EventKind::Slow);

        circuit.on_result(EventKind::Success, 0.2);
        circuit.on_result(EventKind::Success, 0.2);
        circuit.on_result(EventKind::Slow, 1.5);
        circuit.on_result(EventKind::Slow, 1.6);

        assert!(circuit.is_open());
        assert_eq!(circuit.status().slow_calls, 2);
    }

    #[test]
    fn test_absolute_threshold() {
        let mut circuit = CircuitBreaker::new(
            "card",
            Config {
                failure_threshold: Some(2),
                failure_rate_threshold: None,
                ..fast_config()
            },
        );

        circuit.on_result(EventKind::Failure, 0.01);
        assert!(circuit.is_closed());
        circuit.on_result(EventKind::Failure, 0.01);
        assert!(circuit.is_open());
    }

    #[test]
    fn test_open_rejects_until_duration_elapses() {
        let mut circuit = CircuitBreaker::new(
            "card",
            Config {
                open_duration_secs: 0.05,
                ..fast_config()
            },
        );
        trip(&mut circuit);

        assert!(!circuit.allow());
        match circuit.permit::<()>() {
            Err(CircuitError::Open { circuit: name, .. }) => assert_eq!(name, "card"),
            other => panic!("expected Open, got {:?}", other),
        }

        std::thread::sleep(Duration::from_millis(70));
        assert!(circuit.allow(), "first probe admitted after open duration");
        assert_eq!(circuit.state(), CircuitState::HalfOpen);
    }

    #[test]
    fn test_half_open_limits_probes() {
        let mut circuit = CircuitBreaker::new("card", fast_config());
        trip(&mut circuit);
        std::thread::sleep(Duration::from_millis(30));

        assert!(circuit.allow());
        assert!(circuit.allow());
        assert!(matches!(
            circuit.permit::<()>(),
            Err(CircuitError::HalfOpenLimitReached { .. })
        ));
    }

    #[test]
    fn test_all_probes_succeed_closes_and_resets_window() {
        let mut circuit = CircuitBreaker::new("card", fast_config());
        trip(&mut circuit);
        std::thread::sleep(Duration::from_millis(30));

        assert!(circuit.allow());
        assert!(circuit.allow());
        circuit.on_result(EventKind::Success, 0.01);
        assert_eq!(circuit.state(), CircuitState::HalfOpen);
        circuit.on_result(EventKind::Success, 0.01);

        assert!(circuit.is_closed());
        assert_eq!(circuit.status().buffered_calls, 0);
    }

    #[test]
    fn test_failed_probe_reopens_and_restarts_timer() {
        let mut circuit = CircuitBreaker::new("card", fast_config());
        trip(&mut circuit);
        let first_opened_at = circuit.opened_at().unwrap();
        std::thread::sleep(Duration::from_millis(30));

        assert!(circuit.allow());
        circuit.on_result(EventKind::Success, 0.01);
        assert!(circuit.allow());
        circuit.on_result(EventKind::Failure, 0.01);

        assert!(circuit.is_open());
        assert!(circuit.opened_at().unwrap() > first_opened_at);
        assert!(!circuit.allow());
    }

    #[test]
    fn test_ignored_probe_frees_its_slot() {
        let mut circuit = CircuitBreaker::new("card", fast_config());
        trip(&mut circuit);
        std::thread::sleep(Duration::from_millis(30));

        assert!(circuit.allow());
        assert!(circuit.allow());
        assert!(!circuit.allow());

        circuit.on_ignored();
        assert!(circuit.allow());
    }

    #[test]
    fn test_stale_admission_is_not_a_probe() {
        let mut circuit = CircuitBreaker::new(
            "card",
            Config {
                half_open_probes: 1,
                ..fast_config()
            },
        );
        let before_trip = circuit.permit::<()>().unwrap();
        trip(&mut circuit);
        std::thread::sleep(Duration::from_millis(30));

        let probe = circuit.permit::<()>().unwrap();
        assert_ne!(probe, before_trip);

        circuit.report(before_trip, EventKind::Success, 0.01);
        assert_eq!(circuit.state(), CircuitState::HalfOpen);
        circuit.report_ignored(before_trip);
        assert!(!circuit.allow(), "probe slot still held");

        circuit.report(probe, EventKind::Failure, 0.01);
        assert!(circuit.is_open());
    }

    #[test]
    fn test_stale_failure_does_not_reopen() {
        let mut circuit = CircuitBreaker::new("card", fast_config());
        let before_trip = circuit.permit::<()>().unwrap();
        trip(&mut circuit);
        std::thread::sleep(Duration::from_millis(30));

        assert!(circuit.allow());
        circuit.report(before_trip, EventKind::Failure, 0.01);

        assert_eq!(circuit.state(), CircuitState::HalfOpen);
    }

    #[test]
    fn test_jittered_open_duration_is_drawn_once() {
        let mut circuit = CircuitBreaker::new(
            "card",
            Config {
                open_duration_secs: 1.0,
                jitter_factor: 0.5,
                ..fast_config()
            },
        );
        trip(&mut circuit);

        let opened_at = circuit.opened_at().unwrap();
        let reopens_at = circuit.reopens_at().unwrap();
        let open_secs = reopens_at - opened_at;
        assert!((0.499..=1.001).contains(&open_secs), "{}", open_secs);

        for _ in 0..100 {
            assert!(!circuit.allow());
        }
        assert_eq!(circuit.reopens_at(), Some(reopens_at));
    }

    #[test]
    fn test_status_reports_window() {
        let mut circuit = CircuitBreaker::new(
            "card",
            Config {
                minimum_calls: 100,
                ..fast_config()
            },
        );

        circuit.on_result(EventKind::Success, 0.01);
        circuit.on_result(EventKind::Success, 0.01);
        circuit.on_result(EventKind::Success, 0.01);
        circuit.on_result(EventKind::Failure, 0.01);

        let status = circuit.status();
        assert_eq!(status.name, "card");
        assert_eq!(status.state, CircuitState::Closed);
        assert_eq!(status.buffered_calls, 4);
        assert_eq!(status.failed_calls, 1);
        assert_eq!(status.successful_calls, 3);
        assert!((status.failure_rate - 25.0).abs() < 1e-9);
    }

    #[test]
    fn test_reset_clears_state() {
        let mut circuit = CircuitBreaker::new("card", fast_config());
        trip(&mut circuit);

        circuit.reset();
        assert!(circuit.is_closed());
        assert_eq!(circuit.status().buffered_calls, 0);
    }

    #[test]
    fn test_state_machine_closed_to_open_guard() {
        let storage = Arc::new(crate::MemoryStorage::new());
        let ctx = CircuitContext {
            name: "card".to_string(),
            config: fast_config(),
            storage: storage.clone(),
        };

        let mut circuit = DynamicCircuit::new(ctx);

        let result = circuit.handle(CircuitEvent::Trip);
        assert!(result.is_err(), "Should fail guard when window is empty");

        for _ in 0..4 {
            storage.record("card", EventKind::Failure, 0.1);
        }

        circuit
            .handle(CircuitEvent::Trip)
            .expect("Should open after reaching threshold");
        assert_eq!(circuit.current_state(), "Open");
    }

    #[test]
    fn test_zero_jitter_produces_constant_open_duration() {
        let policy = chrono_machines::Policy {
            max_attempts: 1,
            base_delay_ms: 1000,
            multiplier: 1.0,
            max_delay_ms: 1000,
        };

        let mut values = std::collections::HashSet::new();
        for _ in 0..10 {
            values.insert(policy.calculate_delay(1, 0.0));
        }

        assert_eq!(values.len(), 1, "Zero jitter should produce constant timeout");
        assert!(values.contains(&1000));
    }

    #[test]
    fn test_state_serializes_in_canonical_form() {
        assert_eq!(CircuitState::HalfOpen.to_string(), "HALF_OPEN");
        assert_eq!(CircuitState::Open.as_str(), "OPEN");
    }
}
