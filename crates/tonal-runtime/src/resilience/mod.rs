//! Resilience patterns for the LLM-backed collaborator.
//!
//! This module provides:
//! - Circuit breaker so a failing model endpoint is not hammered
//! - Token usage accounting with an optional global budget
//!
//! Neither ever fabricates a result. An open circuit or exhausted budget
//! fails the call with the operation's collaborator error.

mod budget;
mod circuit_breaker;

pub use budget::{BudgetTracker, LlmUsage, TokenBudget};
pub use circuit_breaker::{CircuitBreaker, CircuitBreakerConfig, CircuitState};
