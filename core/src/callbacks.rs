//! Hooks fired on circuit breaker state transitions

use crate::circuit::CircuitState;
use std::sync::Arc;

/// Describes a state change of one circuit
#[derive(Debug, Clone, Copy)]
pub struct Transition<'a> {
    pub circuit: &'a str,
    pub from: CircuitState,
    pub to: CircuitState,
    /// Failed-or-slow ratio of the window that drove the transition (0.0-1.0)
    pub failure_ratio: f64,
}

pub type TransitionHook = Arc<dyn Fn(&Transition<'_>) + Send + Sync>;

/// Per-target-state transition hooks
#[derive(Clone, Default)]
pub struct Callbacks {
    pub on_open: Option<TransitionHook>,
    pub on_close: Option<TransitionHook>,
    pub on_half_open: Option<TransitionHook>,
}

impl Callbacks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Dispatch to the hook registered for `transition.to`
    pub fn trigger(&self, transition: &Transition<'_>) {
        let hook = match transition.to {
            CircuitState::Open => &self.on_open,
            CircuitState::Closed => &self.on_close,
            CircuitState::HalfOpen => &self.on_half_open,
        };
        if let Some(callback) = hook {
            callback(transition);
        }
    }
}

impl std::fmt::Debug for Callbacks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Callbacks")
            .field("on_open", &self.on_open.is_some())
            .field("on_close", &self.on_close.is_some())
            .field("on_half_open", &self.on_half_open.is_some())
            .finish()
    }
}
