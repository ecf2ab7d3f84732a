//! Fault injection for simulated processors
//!
//! An [`OutcomeGenerator`] decides how the n-th call to a simulated processor
//! ends. Deterministic generators (`Cyclic`, `Scripted`, `Always`) make
//! failure scenarios reproducible; `Weighted` draws from a distribution.

use rand::Rng;
use std::collections::VecDeque;
use std::fmt;
use std::sync::Mutex;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Approve,
    Transient(String),
    Decline(String),
}

impl Outcome {
    pub fn transient(reason: impl Into<String>) -> Self {
        Outcome::Transient(reason.into())
    }

    pub fn decline(reason: impl Into<String>) -> Self {
        Outcome::Decline(reason.into())
    }
}

pub trait OutcomeGenerator: Send + Sync + fmt::Debug {
    /// `call` is the 1-based number of calls the processor has received
    fn next(&self, call: u64) -> Outcome;
}

/// Same outcome every time
#[derive(Debug, Clone)]
pub struct Always(pub Outcome);

impl OutcomeGenerator for Always {
    fn next(&self, _call: u64) -> Outcome {
        self.0.clone()
    }
}

/// Outcome picked by `call % pattern.len()`
#[derive(Debug, Clone)]
pub struct Cyclic {
    pattern: Vec<Outcome>,
}

impl Cyclic {
    pub fn new(pattern: Vec<Outcome>) -> Self {
        Self { pattern }
    }

    /// Card processor profile over every ten calls: 60% approve, 20% timeout,
    /// 10% unavailable, 10% declined by the issuing bank
    pub fn card_profile() -> Self {
        let mut pattern = vec![Outcome::Approve; 10];
        pattern[1] = Outcome::transient("card processor timeout");
        pattern[2] = Outcome::transient("card processor timeout");
        pattern[3] = Outcome::transient("card processor temporarily unavailable");
        pattern[4] = Outcome::decline("Payment declined by bank");
        Self::new(pattern)
    }
}

impl OutcomeGenerator for Cyclic {
    fn next(&self, call: u64) -> Outcome {
        if self.pattern.is_empty() {
            return Outcome::Approve;
        }
        let index = (call % self.pattern.len() as u64) as usize;
        self.pattern[index].clone()
    }
}

/// Explicit sequence of outcomes; the last one repeats once the script runs out
#[derive(Debug)]
pub struct Scripted {
    remaining: Mutex<VecDeque<Outcome>>,
    last: Mutex<Outcome>,
}

impl Scripted {
    pub fn new(script: impl IntoIterator<Item = Outcome>) -> Self {
        Self {
            remaining: Mutex::new(script.into_iter().collect()),
            last: Mutex::new(Outcome::Approve),
        }
    }
}

impl OutcomeGenerator for Scripted {
    fn next(&self, _call: u64) -> Outcome {
        let mut remaining = self
            .remaining
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let mut last = self
            .last
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        if let Some(outcome) = remaining.pop_front() {
            *last = outcome;
        }
        last.clone()
    }
}

/// Random outcome drawn from integer weights
#[derive(Debug, Clone)]
pub struct Weighted {
    approve: u32,
    transient: u32,
    decline: u32,
    transient_reason: String,
    decline_reason: String,
}

impl Weighted {
    pub fn new(approve: u32, transient: u32, decline: u32) -> Self {
        Self {
            approve,
            transient,
            decline,
            transient_reason: "processor temporarily unavailable".to_string(),
            decline_reason: "payment declined".to_string(),
        }
    }

    pub fn with_reasons(
        mut self,
        transient_reason: impl Into<String>,
        decline_reason: impl Into<String>,
    ) -> Self {
        self.transient_reason = transient_reason.into();
        self.decline_reason = decline_reason.into();
        self
    }

    /// Wallet processor profile: 90% approve, 10% failed
    pub fn wallet_profile() -> Self {
        Self::new(9, 0, 1).with_reasons("wallet processor unavailable", "Wallet payment failed")
    }
}

impl OutcomeGenerator for Weighted {
    fn next(&self, _call: u64) -> Outcome {
        let total = self.approve + self.transient + self.decline;
        if total == 0 {
            return Outcome::Approve;
        }

        let roll = rand::thread_rng().gen_range(0..total);
        if roll < self.approve {
            Outcome::Approve
        } else if roll < self.approve + self.transient {
            Outcome::Transient(self.transient_reason.clone())
        } else {
            Outcome::Decline(self.decline_reason.clone())
        }
    }
}
