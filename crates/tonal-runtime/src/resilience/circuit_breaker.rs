//! Circuit breaker to stop calling a failing model endpoint.
//!
//! After repeated provider failures for an operation the circuit opens and
//! calls for that operation fail immediately until the recovery timeout
//! has passed.

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;
use tokio::time::Instant;

use crate::collaborator::Operation;

/// Circuit breaker configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CircuitBreakerConfig {
    /// Consecutive failures before opening the circuit
    pub failure_threshold: u32,

    /// Time the circuit stays open before a trial call is allowed
    #[serde(with = "crate::config::duration_str")]
    pub recovery_timeout: Duration,

    /// Successful trial calls needed to close the circuit again
    pub success_threshold: u32,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 3,
            recovery_timeout: Duration::from_secs(30),
            success_threshold: 2,
        }
    }
}

/// State of one operation's circuit.
#[derive(Debug, Clone, PartialEq)]
pub enum CircuitState {
    /// Normal operation
    Closed { failures: u32 },

    /// Calls are refused
    Open { opened_at: Instant },

    /// Trial calls allowed; a failure reopens
    HalfOpen { successes: u32 },
}

/// Per-operation circuit breaker.
///
/// Analyze, rewrite and evaluate have independent circuits so a broken
/// evaluation prompt does not stop rewrites.
pub struct CircuitBreaker {
    states: Mutex<HashMap<Operation, CircuitState>>,
    config: CircuitBreakerConfig,
}

impl CircuitBreaker {
    pub fn new(config: CircuitBreakerConfig) -> Self {
        Self {
            states: Mutex::new(HashMap::new()),
            config,
        }
    }

    /// Whether a call for `op` may proceed.
    ///
    /// An open circuit whose recovery timeout has elapsed moves to half-open
    /// and admits the call.
    pub fn allow(&self, op: Operation) -> bool {
        let mut states = self.states.lock();
        match states.get(&op) {
            Some(CircuitState::Open { opened_at }) => {
                if opened_at.elapsed() >= self.config.recovery_timeout {
                    states.insert(op, CircuitState::HalfOpen { successes: 0 });
                    tracing::info!(operation = %op, "Circuit half-open, admitting trial call");
                    true
                } else {
                    false
                }
            }
            _ => true,
        }
    }

    pub fn record_success(&self, op: Operation) {
        let mut states = self.states.lock();
        match states.get(&op).cloned() {
            Some(CircuitState::HalfOpen { successes }) => {
                if successes + 1 >= self.config.success_threshold {
                    states.insert(op, CircuitState::Closed { failures: 0 });
                    tracing::info!(operation = %op, "Circuit closed after recovery");
                } else {
                    states.insert(
                        op,
                        CircuitState::HalfOpen {
                            successes: successes + 1,
                        },
                    );
                }
            }
            Some(CircuitState::Closed { .. }) => {
                states.insert(op, CircuitState::Closed { failures: 0 });
            }
            _ => {}
        }
    }

    pub fn record_failure(&self, op: Operation) {
        let mut states = self.states.lock();
        let failures = match states.get(&op) {
            Some(CircuitState::Closed { failures }) => failures + 1,
            None => 1,
            Some(CircuitState::HalfOpen { .. }) => {
                states.insert(
                    op,
                    CircuitState::Open {
                        opened_at: Instant::now(),
                    },
                );
                tracing::warn!(operation = %op, "Circuit reopened after failed trial call");
                return;
            }
            Some(CircuitState::Open { .. }) => return,
        };

        if failures >= self.config.failure_threshold {
            states.insert(
                op,
                CircuitState::Open {
                    opened_at: Instant::now(),
                },
            );
            tracing::warn!(operation = %op, failures, "Circuit opened after repeated failures");
        } else {
            states.insert(op, CircuitState::Closed { failures });
        }
    }

    pub fn state(&self, op: Operation) -> CircuitState {
        self.states
            .lock()
            .get(&op)
            .cloned()
            .unwrap_or(CircuitState::Closed { failures: 0 })
    }

    /// Close every circuit.
    pub fn reset(&self) {
        self.states.lock().clear();
    }
}

impl Default for CircuitBreaker {
    fn default() -> Self {
        Self::new(CircuitBreakerConfig::default())
    }
}
