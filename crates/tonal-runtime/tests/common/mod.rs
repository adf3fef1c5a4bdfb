//! Shared fixtures for workflow tests.

#![allow(dead_code)]

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tonal_core::{EvaluationResult, ToneError};
use tonal_runtime::{Operation, RuntimeConfig, ToneCollaborator, ToneOrchestrator};

/// Deterministic collaborator that counts calls per operation.
#[derive(Default)]
pub struct FixtureCollaborator {
    calls: [AtomicUsize; 3],
    failing: Mutex<Option<Operation>>,
    analyze_delay: Mutex<Option<Duration>>,
}

impl FixtureCollaborator {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn fail(&self, op: Operation) {
        *self.failing.lock() = Some(op);
    }

    pub fn recover(&self) {
        *self.failing.lock() = None;
    }

    pub fn slow_analysis(&self, delay: Duration) {
        *self.analyze_delay.lock() = Some(delay);
    }

    /// (analyze, rewrite, evaluate) call counts.
    pub fn calls(&self) -> (usize, usize, usize) {
        (
            self.calls[0].load(Ordering::SeqCst),
            self.calls[1].load(Ordering::SeqCst),
            self.calls[2].load(Ordering::SeqCst),
        )
    }

    fn enter(&self, op: Operation) -> Result<(), ToneError> {
        let slot = match op {
            Operation::Analyze => 0,
            Operation::Rewrite => 1,
            Operation::Evaluate => 2,
        };
        self.calls[slot].fetch_add(1, Ordering::SeqCst);
        match *self.failing.lock() {
            Some(failing) if failing == op => Err(op.error(format!("{} backend down", op))),
            _ => Ok(()),
        }
    }
}

#[async_trait]
impl ToneCollaborator for FixtureCollaborator {
    async fn analyze(&self, text: &str) -> Result<String, ToneError> {
        self.enter(Operation::Analyze)?;
        let delay = *self.analyze_delay.lock();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        let words = text.split_whitespace().count();
        Ok(format!("tone: professional; words: {}", words))
    }

    async fn rewrite(
        &self,
        text: &str,
        signature: &str,
        preserve_keywords: &[String],
    ) -> Result<String, ToneError> {
        self.enter(Operation::Rewrite)?;
        Ok(format!(
            "{} [{}; keep: {}]",
            text.trim(),
            signature,
            preserve_keywords.join(",")
        ))
    }

    async fn evaluate(
        &self,
        _original: &str,
        _rewritten: &str,
        _signature: &str,
    ) -> Result<EvaluationResult, ToneError> {
        self.enter(Operation::Evaluate)?;
        Ok(EvaluationResult {
            fluency: 0.9,
            authenticity: 0.8,
            tone_alignment: 0.85,
            readability: 0.95,
            overall_score: 0.87,
            strengths: vec!["clear".to_string()],
            suggestions: vec!["shorter sentences".to_string()],
            tone_characteristics_match: BTreeMap::from([("tone".to_string(), 0.9)]),
            detailed_feedback: BTreeMap::new(),
        })
    }

    fn name(&self) -> &str {
        "fixture"
    }
}

pub fn orchestrator(collaborator: Arc<FixtureCollaborator>) -> ToneOrchestrator {
    ToneOrchestrator::builder()
        .collaborator(collaborator)
        .config(RuntimeConfig::default())
        .build()
        .expect("default config is valid")
}
