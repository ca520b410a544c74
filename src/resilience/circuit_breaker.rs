//! Circuit breaker for provider protection.
//!
//! # States
//! - Closed: normal operation, attempts pass through
//! - Open: provider assumed down, attempts fail fast
//!
//! # State Transitions
//! ```text
//! Closed → Open: failure_count >= threshold
//! Open → Closed: now - last_failure > cooldown (failure_count reset to 0)
//! Any → Closed: recorded success (failure_count reset to 0)
//! ```
//!
//! # Design Decisions
//! - Single breaker in front of the active provider
//! - No half-open state: after the cooldown the circuit closes outright
//! - The cooldown reset is an explicit transition (`poll`) run once per admission decision
//! - Every failure stamps `last_failure`, so failures while open extend the cooldown

use std::sync::Mutex;
use std::time::Duration;

use serde::Serialize;
use tokio::time::Instant;

use crate::observability::metrics;

/// Breaker state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CircuitState {
    Closed,
    Open,
}

/// Result of evaluating the cooldown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// No state change.
    Stayed,
    /// The circuit was open and the cooldown elapsed; it is now closed.
    Reset,
}

/// Point-in-time view for monitoring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BreakerSnapshot {
    pub state: CircuitState,
    pub failure_count: u32,
}

struct BreakerState {
    failure_count: u32,
    last_failure: Option<Instant>,
    state: CircuitState,
}

/// Failure-state tracker guarding the active provider.
pub struct CircuitBreaker {
    failure_threshold: u32,
    cooldown: Duration,
    inner: Mutex<BreakerState>,
}

impl CircuitBreaker {
    pub fn new(failure_threshold: u32, cooldown: Duration) -> Self {
        Self {
            failure_threshold,
            cooldown,
            inner: Mutex::new(BreakerState {
                failure_count: 0,
                last_failure: None,
                state: CircuitState::Closed,
            }),
        }
    }

    /// Evaluate the cooldown transition without reporting admission.
    pub fn poll(&self, now: Instant) -> Transition {
        let mut inner = self.inner.lock().unwrap_or_else(|p| p.into_inner());
        self.transition(&mut inner, now)
    }

    /// Admission check: applies the cooldown transition, then reports whether
    /// the circuit is open. Not a pure read.
    pub fn is_open(&self) -> bool {
        self.is_open_at(Instant::now())
    }

    pub fn is_open_at(&self, now: Instant) -> bool {
        let mut inner = self.inner.lock().unwrap_or_else(|p| p.into_inner());
        self.transition(&mut inner, now);
        inner.state == CircuitState::Open
    }

    pub fn record_failure(&self) {
        self.record_failure_at(Instant::now());
    }

    pub fn record_failure_at(&self, now: Instant) {
        let mut inner = self.inner.lock().unwrap_or_else(|p| p.into_inner());
        inner.failure_count = inner.failure_count.saturating_add(1);
        inner.last_failure = Some(now);
        if inner.failure_count >= self.failure_threshold && inner.state == CircuitState::Closed {
            inner.state = CircuitState::Open;
            tracing::warn!(
                failures = inner.failure_count,
                cooldown_ms = self.cooldown.as_millis() as u64,
                "Circuit breaker opened"
            );
            metrics::record_circuit_state(true);
        }
    }

    pub fn record_success(&self) {
        let mut inner = self.inner.lock().unwrap_or_else(|p| p.into_inner());
        inner.failure_count = 0;
        if inner.state == CircuitState::Open {
            tracing::info!("Circuit breaker closed after success");
            metrics::record_circuit_state(false);
        }
        inner.state = CircuitState::Closed;
    }

    /// Current state without applying the cooldown transition.
    pub fn state(&self) -> CircuitState {
        self.inner.lock().unwrap_or_else(|p| p.into_inner()).state
    }

    pub fn snapshot(&self) -> BreakerSnapshot {
        let inner = self.inner.lock().unwrap_or_else(|p| p.into_inner());
        BreakerSnapshot {
            state: inner.state,
            failure_count: inner.failure_count,
        }
    }

    pub fn failure_threshold(&self) -> u32 {
        self.failure_threshold
    }

    fn transition(&self, inner: &mut BreakerState, now: Instant) -> Transition {
        if inner.state != CircuitState::Open {
            return Transition::Stayed;
        }
        let cooled = inner
            .last_failure
            .map(|at| now.saturating_duration_since(at) > self.cooldown)
            .unwrap_or(true);
        if !cooled {
            return Transition::Stayed;
        }

        inner.state = CircuitState::Closed;
        inner.failure_count = 0;
        tracing::info!("Circuit breaker closed after cooldown");
        metrics::record_circuit_state(false);
        Transition::Reset
    }
}
