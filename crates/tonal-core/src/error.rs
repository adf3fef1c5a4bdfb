//! Error taxonomy shared by every tonal crate.
//!
//! Each failure kind maps to a stable [`ErrorCode`] so a presentation layer
//! can render it without inspecting messages.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Stable machine-readable error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    NotFound,
    ValidationError,
    AnalysisError,
    RewriteError,
    EvaluationError,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::NotFound => "NOT_FOUND",
            ErrorCode::ValidationError => "VALIDATION_ERROR",
            ErrorCode::AnalysisError => "ANALYSIS_ERROR",
            ErrorCode::RewriteError => "REWRITE_ERROR",
            ErrorCode::EvaluationError => "EVALUATION_ERROR",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The kind of record a read path failed to find.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    Brand,
    Signature,
    Evaluation,
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResourceKind::Brand => write!(f, "brand"),
            ResourceKind::Signature => write!(f, "signature"),
            ResourceKind::Evaluation => write!(f, "evaluation"),
        }
    }
}

/// Errors surfaced by tone workflow operations.
///
/// Collaborator variants carry the originating collaborator's message
/// verbatim. Nothing in the workflow substitutes a default value for a
/// failed call.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ToneError {
    #[error("{kind} not found: {id}")]
    NotFound { kind: ResourceKind, id: String },

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Tone analysis failed: {0}")]
    Analysis(String),

    #[error("Text rewriting failed: {0}")]
    Rewrite(String),

    #[error("Text evaluation failed: {0}")]
    Evaluation(String),
}

impl ToneError {
    /// Build a `NotFound` error.
    pub fn not_found(kind: ResourceKind, id: impl Into<String>) -> Self {
        ToneError::NotFound {
            kind,
            id: id.into(),
        }
    }

    /// Build a `Validation` error.
    pub fn validation(message: impl Into<String>) -> Self {
        ToneError::Validation(message.into())
    }

    /// The stable code for this failure.
    pub fn code(&self) -> ErrorCode {
        match self {
            ToneError::NotFound { .. } => ErrorCode::NotFound,
            ToneError::Validation(_) => ErrorCode::ValidationError,
            ToneError::Analysis(_) => ErrorCode::AnalysisError,
            ToneError::Rewrite(_) => ErrorCode::RewriteError,
            ToneError::Evaluation(_) => ErrorCode::EvaluationError,
        }
    }

    /// Whether the failure came from an external collaborator call.
    pub fn is_collaborator_failure(&self) -> bool {
        matches!(
            self,
            ToneError::Analysis(_) | ToneError::Rewrite(_) | ToneError::Evaluation(_)
        )
    }

    /// Render the error as a serializable report.
    pub fn report(&self) -> ErrorReport {
        let details = match self {
            ToneError::NotFound { kind, id } => Some(serde_json::json!({
                "resource": kind,
                "id": id,
            })),
            ToneError::Analysis(msg) | ToneError::Rewrite(msg) | ToneError::Evaluation(msg) => {
                Some(serde_json::json!({ "original_error": msg }))
            }
            ToneError::Validation(_) => None,
        };

        ErrorReport {
            error: self.to_string(),
            code: self.code(),
            details,
        }
    }
}

/// Serializable error payload for an outer request layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorReport {
    pub error: String,
    pub code: ErrorCode,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

pub type Result<T, E = ToneError> = std::result::Result<T, E>;
