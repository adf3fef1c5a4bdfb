//! Append-only evaluation store.

use chrono::Utc;
use parking_lot::RwLock;
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use tonal_core::{Evaluation, EvaluationResult, ResourceKind, ToneError};
use uuid::Uuid;

/// Persists evaluations under random 128-bit identifiers.
///
/// Records never expire and are never updated or deleted.
#[derive(Debug, Default)]
pub struct EvaluationStore {
    evaluations: RwLock<HashMap<String, Evaluation>>,
}

impl EvaluationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a new evaluation under a fresh id and return the full record.
    pub fn create(
        &self,
        brand_id: &str,
        original_text: &str,
        rewritten_text: &str,
        result: EvaluationResult,
    ) -> Evaluation {
        let mut evaluation = Evaluation {
            evaluation_id: Uuid::new_v4().to_string(),
            brand_id: brand_id.to_string(),
            original_text: original_text.to_string(),
            rewritten_text: rewritten_text.to_string(),
            result,
            timestamp: Utc::now(),
        };

        let mut evaluations = self.evaluations.write();
        loop {
            match evaluations.entry(evaluation.evaluation_id.clone()) {
                Entry::Vacant(slot) => {
                    slot.insert(evaluation.clone());
                    break;
                }
                Entry::Occupied(_) => {
                    evaluation.evaluation_id = Uuid::new_v4().to_string();
                }
            }
        }
        drop(evaluations);

        tracing::info!(
            evaluation_id = %evaluation.evaluation_id,
            brand_id,
            overall_score = evaluation.result.overall_score,
            "Stored evaluation"
        );
        evaluation
    }

    pub fn get(&self, evaluation_id: &str) -> Result<Evaluation, ToneError> {
        self.evaluations
            .read()
            .get(evaluation_id)
            .cloned()
            .ok_or_else(|| ToneError::not_found(ResourceKind::Evaluation, evaluation_id))
    }

    /// A brand's evaluations, oldest first.
    pub fn for_brand(&self, brand_id: &str) -> Vec<Evaluation> {
        let mut found: Vec<Evaluation> = self
            .evaluations
            .read()
            .values()
            .filter(|e| e.brand_id == brand_id)
            .cloned()
            .collect();
        found.sort_by(|a, b| {
            a.timestamp
                .cmp(&b.timestamp)
                .then_with(|| a.evaluation_id.cmp(&b.evaluation_id))
        });
        found
    }

    pub fn len(&self) -> usize {
        self.evaluations.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
