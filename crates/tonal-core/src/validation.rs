//! Input validation applied before any cache or collaborator interaction.

use serde::{Deserialize, Serialize};

use crate::error::ToneError;

/// Minimum characters a text field must carry, matching the request layer.
pub const DEFAULT_MIN_TEXT_CHARS: usize = 10;

/// Rules for caller-supplied text fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TextRules {
    /// Minimum non-whitespace-trimmed character count
    pub min_text_chars: usize,
}

impl Default for TextRules {
    fn default() -> Self {
        Self {
            min_text_chars: DEFAULT_MIN_TEXT_CHARS,
        }
    }
}

impl TextRules {
    pub fn new(min_text_chars: usize) -> Self {
        Self { min_text_chars }
    }

    /// Reject empty or too-short text.
    pub fn check_text(&self, field: &str, text: &str) -> Result<(), ToneError> {
        let chars = text.trim().chars().count();
        if chars == 0 {
            return Err(ToneError::validation(format!("{} must not be empty", field)));
        }
        if chars < self.min_text_chars {
            return Err(ToneError::validation(format!(
                "{} must be at least {} characters (got {})",
                field, self.min_text_chars, chars
            )));
        }
        Ok(())
    }

    /// Reject an empty signature. Signatures are opaque, so no length floor.
    pub fn check_signature(&self, signature: &str) -> Result<(), ToneError> {
        if signature.trim().is_empty() {
            return Err(ToneError::validation("signature must not be empty"));
        }
        Ok(())
    }
}

/// Reject identifiers that are empty or contain whitespace or control characters.
pub fn check_id(field: &str, id: &str) -> Result<(), ToneError> {
    if id.is_empty() {
        return Err(ToneError::validation(format!("{} must not be empty", field)));
    }
    if id.chars().any(|c| c.is_whitespace() || c.is_control()) {
        return Err(ToneError::validation(format!(
            "{} must not contain whitespace: {:?}",
            field, id
        )));
    }
    Ok(())
}

/// Reject blank keywords in a preserve list.
pub fn check_keywords(keywords: &[String]) -> Result<(), ToneError> {
    if let Some(pos) = keywords.iter().position(|k| k.trim().is_empty()) {
        return Err(ToneError::validation(format!(
            "preserve_keywords[{}] must not be blank",
            pos
        )));
    }
    Ok(())
}
