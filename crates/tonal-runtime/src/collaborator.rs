//! The seam between the workflow and whatever performs the actual text work.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use tonal_core::{EvaluationResult, ToneError};

/// The three collaborator operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    Analyze,
    Rewrite,
    Evaluate,
}

impl Operation {
    pub const ALL: [Operation; 3] = [Operation::Analyze, Operation::Rewrite, Operation::Evaluate];

    /// Wrap a failure message in the error variant for this operation.
    pub fn error(&self, message: impl Into<String>) -> ToneError {
        match self {
            Operation::Analyze => ToneError::Analysis(message.into()),
            Operation::Rewrite => ToneError::Rewrite(message.into()),
            Operation::Evaluate => ToneError::Evaluation(message.into()),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::Analyze => "analyze",
            Operation::Rewrite => "rewrite",
            Operation::Evaluate => "evaluate",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// External text-transformation functions consumed by the workflow.
///
/// # Contract
/// - `analyze` fails only with [`ToneError::Analysis`], `rewrite` only with
///   [`ToneError::Rewrite`], `evaluate` only with [`ToneError::Evaluation`],
///   each carrying the collaborator's own message
/// - Results for identical inputs must be reusable, since the workflow
///   caches them
/// - Retries and timeouts are the implementation's business; the workflow
///   calls each function once per cache miss
#[async_trait]
pub trait ToneCollaborator: Send + Sync {
    /// Produce a tone signature for `text`.
    async fn analyze(&self, text: &str) -> Result<String, ToneError>;

    /// Rewrite `text` to match `signature`, keeping `preserve_keywords` intact.
    async fn rewrite(
        &self,
        text: &str,
        signature: &str,
        preserve_keywords: &[String],
    ) -> Result<String, ToneError>;

    /// Score how well `rewritten` matches `signature`.
    async fn evaluate(
        &self,
        original: &str,
        rewritten: &str,
        signature: &str,
    ) -> Result<EvaluationResult, ToneError>;

    /// Name for logs.
    fn name(&self) -> &str {
        "collaborator"
    }
}
