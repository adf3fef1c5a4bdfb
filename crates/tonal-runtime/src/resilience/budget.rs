//! Token accounting for model calls.
//!
//! Usage is always tracked. A global token budget is only enforced when one
//! is configured.

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU32, Ordering};

use crate::collaborator::Operation;
use crate::providers::TokenUsage;

/// Token budget for a scope.
pub struct TokenBudget {
    pub max_tokens: u32,
    used: AtomicU32,
}

impl TokenBudget {
    pub fn new(max_tokens: u32) -> Self {
        Self {
            max_tokens,
            used: AtomicU32::new(0),
        }
    }

    pub fn can_afford(&self, tokens: u32) -> bool {
        self.remaining() >= tokens
    }

    pub fn record(&self, tokens: u32) {
        let _ = self
            .used
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |used| {
                Some(used.saturating_add(tokens))
            });
    }

    pub fn remaining(&self) -> u32 {
        self.max_tokens.saturating_sub(self.used.load(Ordering::SeqCst))
    }
}

/// Accumulated model usage.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LlmUsage {
    pub total_tokens: u32,
    pub prompt_tokens: u32,
    pub completion_tokens: u32,

    /// Number of model calls made
    pub llm_calls: u32,

    /// Estimated cost in USD
    pub estimated_cost: f64,

    /// Calls per operation
    pub calls_by_operation: BTreeMap<Operation, u32>,
}

impl LlmUsage {
    /// Add token usage from one provider response.
    pub fn add(&mut self, op: Operation, usage: &TokenUsage, model: &str) {
        self.prompt_tokens = self.prompt_tokens.saturating_add(usage.prompt_tokens);
        self.completion_tokens = self.completion_tokens.saturating_add(usage.completion_tokens);
        self.total_tokens = self.total_tokens.saturating_add(usage.total());
        self.llm_calls = self.llm_calls.saturating_add(1);
        let calls = self.calls_by_operation.entry(op).or_insert(0);
        *calls = calls.saturating_add(1);
        self.estimated_cost += Self::estimate_cost(usage, model);
    }

    fn estimate_cost(usage: &TokenUsage, model: &str) -> f64 {
        // USD per million tokens. More specific names first.
        let (input_rate, output_rate) = match model {
            m if m.contains("gpt-4o-mini") => (0.15, 0.6),
            m if m.contains("gpt-4o") => (2.5, 10.0),
            m if m.contains("gpt-4-turbo") => (10.0, 30.0),
            m if m.contains("gpt-4") => (30.0, 60.0),
            m if m.contains("gpt-3.5-turbo") => (0.5, 1.5),
            _ => (30.0, 60.0),
        };

        let input_cost = (usage.prompt_tokens as f64 / 1_000_000.0) * input_rate;
        let output_cost = (usage.completion_tokens as f64 / 1_000_000.0) * output_rate;
        input_cost + output_cost
    }
}

/// Tracks usage across all collaborator calls.
pub struct BudgetTracker {
    global_budget: Option<TokenBudget>,
    usage: RwLock<LlmUsage>,
}

impl BudgetTracker {
    /// Track usage with no token ceiling.
    pub fn unlimited() -> Self {
        Self {
            global_budget: None,
            usage: RwLock::new(LlmUsage::default()),
        }
    }

    /// Track usage and refuse calls once `max_tokens` have been spent.
    pub fn with_limit(max_tokens: u32) -> Self {
        Self {
            global_budget: Some(TokenBudget::new(max_tokens)),
            usage: RwLock::new(LlmUsage::default()),
        }
    }

    pub fn from_limit(max_tokens: Option<u32>) -> Self {
        match max_tokens {
            Some(max) => Self::with_limit(max),
            None => Self::unlimited(),
        }
    }

    pub fn can_afford(&self, estimated_tokens: u32) -> bool {
        self.global_budget
            .as_ref()
            .map(|b| b.can_afford(estimated_tokens))
            .unwrap_or(true)
    }

    pub fn record_usage(&self, op: Operation, usage: &TokenUsage, model: &str) {
        if let Some(budget) = &self.global_budget {
            budget.record(usage.total());
        }
        self.usage.write().add(op, usage, model);
    }

    pub fn usage(&self) -> LlmUsage {
        self.usage.read().clone()
    }

    /// Remaining tokens, or `None` when unlimited.
    pub fn remaining(&self) -> Option<u32> {
        self.global_budget.as_ref().map(TokenBudget::remaining)
    }
}

impl Default for BudgetTracker {
    fn default() -> Self {
        Self::unlimited()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn usage(prompt: u32, completion: u32) -> TokenUsage {
        TokenUsage {
            prompt_tokens: prompt,
            completion_tokens: completion,
        }
    }

    #[test]
    fn test_budget_enforcement() {
        let budget = TokenBudget::new(100);

        assert!(budget.can_afford(100));
        assert!(!budget.can_afford(101));

        budget.record(60);
        assert_eq!(budget.remaining(), 40);
        assert!(!budget.can_afford(50));

        budget.record(u32::MAX);
        assert_eq!(budget.remaining(), 0);
    }

    #[test]
    fn test_limited_tracker() {
        let tracker = BudgetTracker::with_limit(500);
        tracker.record_usage(Operation::Analyze, &usage(300, 100), "gpt-4");

        assert_eq!(tracker.remaining(), Some(100));
        assert!(tracker.can_afford(100));
        assert!(!tracker.can_afford(101));
    }

    #[test]
    fn test_unlimited_tracker_still_counts() {
        let tracker = BudgetTracker::unlimited();
        tracker.record_usage(Operation::Rewrite, &usage(10_000, 10_000), "gpt-4");
        tracker.record_usage(Operation::Rewrite, &usage(5, 5), "gpt-4");
        tracker.record_usage(Operation::Evaluate, &usage(5, 5), "gpt-4");

        assert!(tracker.can_afford(u32::MAX));
        assert_eq!(tracker.remaining(), None);

        let used = tracker.usage();
        assert_eq!(used.llm_calls, 3);
        assert_eq!(used.total_tokens, 20_020);
        assert_eq!(used.calls_by_operation.get(&Operation::Rewrite), Some(&2));
        assert_eq!(used.calls_by_operation.get(&Operation::Analyze), None);
    }

    #[test]
    fn test_cost_estimation_by_model() {
        let mut gpt4 = LlmUsage::default();
        gpt4.add(Operation::Analyze, &usage(1000, 500), "gpt-4");
        // 1000 * $30/MTok + 500 * $60/MTok = $0.06
        assert!((gpt4.estimated_cost - 0.06).abs() < 1e-9);

        let mut mini = LlmUsage::default();
        mini.add(Operation::Analyze, &usage(1000, 500), "gpt-4o-mini");
        assert!(mini.estimated_cost < gpt4.estimated_cost / 100.0);
    }

    #[test]
    fn test_usage_totals_saturate() {
        let mut totals = LlmUsage::default();
        totals.add(Operation::Rewrite, &usage(u32::MAX, 10), "gpt-4");
        totals.add(Operation::Rewrite, &usage(10, u32::MAX), "gpt-4");

        assert_eq!(totals.prompt_tokens, u32::MAX);
        assert_eq!(totals.completion_tokens, u32::MAX);
        assert_eq!(totals.total_tokens, u32::MAX);
        assert_eq!(totals.llm_calls, 2);
    }
}
