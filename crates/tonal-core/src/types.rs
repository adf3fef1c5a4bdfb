//! Records produced and persisted by the tone workflow.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Version assigned to a signature when it is first created.
pub const INITIAL_SIGNATURE_VERSION: &str = "1.0";

/// Description given to brands created implicitly by a workflow call.
pub const AUTO_BRAND_DESCRIPTION: &str = "Automatically created brand for tone analysis";

/// The identity under which a signature and its evaluations are grouped.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Brand {
    /// Opaque unique identifier
    pub brand_id: String,

    /// Display name
    pub name: String,

    /// Free-form description
    #[serde(default)]
    pub description: Option<String>,

    pub created_at: DateTime<Utc>,
}

impl Brand {
    /// Create a brand stamped with the current time.
    pub fn new(brand_id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            brand_id: brand_id.into(),
            name: name.into(),
            description: None,
            created_at: Utc::now(),
        }
    }

    /// Attach a description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Display name used when a caller does not supply one.
    pub fn default_name(brand_id: &str) -> String {
        format!("Brand {}", brand_id)
    }
}

/// A brand's tone signature.
///
/// At most one live signature exists per brand. A signature is never edited
/// in place; replacement produces a new record with a fresh `created_at`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Signature {
    pub brand_id: String,

    /// Opaque profile text produced by the analysis collaborator
    pub signature_text: String,

    pub created_at: DateTime<Utc>,

    /// Always [`INITIAL_SIGNATURE_VERSION`]; replacements keep it
    pub version: String,
}

impl Signature {
    /// Create a first-version signature for a brand.
    pub fn new(brand_id: impl Into<String>, signature_text: impl Into<String>) -> Self {
        Self {
            brand_id: brand_id.into(),
            signature_text: signature_text.into(),
            created_at: Utc::now(),
            version: INITIAL_SIGNATURE_VERSION.to_string(),
        }
    }

    /// Build the signature that replaces `self`.
    pub fn superseded_by(&self, signature_text: impl Into<String>) -> Self {
        Self {
            brand_id: self.brand_id.clone(),
            signature_text: signature_text.into(),
            created_at: Utc::now(),
            version: self.version.clone(),
        }
    }
}

/// Scores and feedback for how well a rewrite matches a signature.
///
/// All scores are in `0.0..=1.0`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationResult {
    pub fluency: f64,
    pub authenticity: f64,
    pub tone_alignment: f64,
    pub readability: f64,
    pub overall_score: f64,

    #[serde(default)]
    pub strengths: Vec<String>,

    #[serde(default)]
    pub suggestions: Vec<String>,

    /// Per-characteristic match scores (tone, language_style, ...)
    #[serde(default)]
    pub tone_characteristics_match: BTreeMap<String, f64>,

    /// Feedback grouped by aspect (tone, language, structure, style)
    #[serde(default)]
    pub detailed_feedback: BTreeMap<String, Vec<String>>,
}

impl EvaluationResult {
    /// Check every score lies in `0.0..=1.0`.
    ///
    /// Returns the name of the first offending score.
    pub fn check_ranges(&self) -> Result<(), String> {
        let named = [
            ("fluency", self.fluency),
            ("authenticity", self.authenticity),
            ("tone_alignment", self.tone_alignment),
            ("readability", self.readability),
            ("overall_score", self.overall_score),
        ];

        for (name, score) in named
            .iter()
            .map(|(n, s)| (n.to_string(), *s))
            .chain(
                self.tone_characteristics_match
                    .iter()
                    .map(|(n, s)| (format!("tone_characteristics_match.{}", n), *s)),
            )
        {
            if !(0.0..=1.0).contains(&score) {
                return Err(format!("{} = {} is outside 0..1", name, score));
            }
        }
        Ok(())
    }
}

/// A persisted evaluation. Append-only: never updated after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Evaluation {
    pub evaluation_id: String,
    pub brand_id: String,
    pub original_text: String,
    pub rewritten_text: String,
    pub result: EvaluationResult,
    pub timestamp: DateTime<Utc>,
}

/// Output of a standalone tone analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToneAnalysis {
    pub signature: String,
    pub analyzed_at: DateTime<Utc>,
}

/// Output of the composite rewrite-and-evaluate operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RewriteOutcome {
    pub evaluation_id: String,
    pub brand: Brand,
    pub timestamp: DateTime<Utc>,
    pub original_text: String,
    pub rewritten_text: String,
    pub result: EvaluationResult,
}

impl RewriteOutcome {
    pub fn new(brand: Brand, evaluation: Evaluation) -> Self {
        Self {
            evaluation_id: evaluation.evaluation_id,
            brand,
            timestamp: evaluation.timestamp,
            original_text: evaluation.original_text,
            rewritten_text: evaluation.rewritten_text,
            result: evaluation.result,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectionStatus {
    Rejected,
}

/// A human rejection of a text, with follow-up suggestions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rejection {
    pub status: RejectionStatus,
    pub text: String,
    pub reason: String,
    pub suggestions: Vec<String>,
    #[serde(default)]
    pub category: Option<String>,
}

impl Rejection {
    pub fn new(text: impl Into<String>, reason: impl Into<String>, category: Option<String>) -> Self {
        Self {
            status: RejectionStatus::Rejected,
            text: text.into(),
            reason: reason.into(),
            suggestions: vec![
                "Consider revising the text to better align with brand voice".to_string(),
            ],
            category,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_result() -> EvaluationResult {
        EvaluationResult {
            fluency: 0.9,
            authenticity: 0.8,
            tone_alignment: 0.85,
            readability: 0.95,
            overall_score: 0.87,
            strengths: vec!["Clear".into()],
            suggestions: vec![],
            tone_characteristics_match: BTreeMap::from([("tone".to_string(), 0.9)]),
            detailed_feedback: BTreeMap::new(),
        }
    }

    #[test]
    fn test_signature_starts_at_initial_version() {
        let sig = Signature::new("acme", "formal");
        assert_eq!(sig.version, INITIAL_SIGNATURE_VERSION);
        assert_eq!(sig.brand_id, "acme");
    }

    #[test]
    fn test_superseding_keeps_version_and_refreshes_timestamp() {
        let first = Signature::new("acme", "formal");
        let second = first.superseded_by("casual");
        assert_eq!(second.version, INITIAL_SIGNATURE_VERSION);
        assert_eq!(second.brand_id, "acme");
        assert_eq!(second.signature_text, "casual");
        assert!(second.created_at >= first.created_at);
        assert_eq!(second.superseded_by("warm").version, "1.0");
    }

    #[test]
    fn test_score_ranges() {
        assert!(sample_result().check_ranges().is_ok());

        let mut bad = sample_result();
        bad.readability = 1.2;
        assert!(bad.check_ranges().unwrap_err().contains("readability"));

        let mut bad_match = sample_result();
        bad_match
            .tone_characteristics_match
            .insert("formality_level".into(), -0.1);
        assert!(bad_match
            .check_ranges()
            .unwrap_err()
            .contains("tone_characteristics_match.formality_level"));
    }

    #[test]
    fn test_outcome_carries_evaluation_fields() {
        let brand = Brand::new("acme", "Acme").with_description(AUTO_BRAND_DESCRIPTION);
        let evaluation = Evaluation {
            evaluation_id: "e1".into(),
            brand_id: "acme".into(),
            original_text: "original".into(),
            rewritten_text: "rewritten".into(),
            result: sample_result(),
            timestamp: Utc::now(),
        };
        let outcome = RewriteOutcome::new(brand.clone(), evaluation.clone());
        assert_eq!(outcome.evaluation_id, "e1");
        assert_eq!(outcome.brand, brand);
        assert_eq!(outcome.timestamp, evaluation.timestamp);
        assert_eq!(outcome.rewritten_text, "rewritten");
    }

    #[test]
    fn test_rejection_serializes_status() {
        let rejection = Rejection::new("Some text here", "Off-brand wording", None);
        let json = serde_json::to_value(&rejection).unwrap();
        assert_eq!(json["status"], "rejected");
        assert_eq!(rejection.suggestions.len(), 1);
    }
}
