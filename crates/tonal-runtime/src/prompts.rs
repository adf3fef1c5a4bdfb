//! Prompts for the LLM-backed collaborator.
//!
//! Templates use `{name}` placeholders filled by [`render`] in a single
//! pass, so placeholder-like text inside user content is never expanded.

use lazy_static::lazy_static;
use regex::{Captures, Regex};

use crate::collaborator::Operation;

lazy_static! {
    static ref PLACEHOLDER: Regex = Regex::new(r"\{([a-z_]+)\}").unwrap();
}

/// System prompt shared by every operation.
pub const SYSTEM_PROMPT: &str = r#"
You are a brand voice specialist. You describe, apply and score tone of voice.
You follow the requested output format exactly and add nothing else.
"#;

/// Tone analysis. Placeholders: `text`.
pub const ANALYSIS_PROMPT: &str = r#"
Analyze the tone of the following text and classify its characteristics.

Text:
{text}

Respond with a single JSON object using ONLY the listed values for each field:
{
  "tone": "one of: formal, casual, friendly, professional, authoritative, warm, direct",
  "language_style": "one of: technical, conversational, academic, professional, creative",
  "formality_level": "one of: formal, semi-formal, informal",
  "address_style": "one of: direct, indirect, personal, impersonal, collective",
  "emotional_appeal": "one of: rational, emotional, inspirational, humorous, authoritative"
}

Use EXACTLY one of the listed values per field. Do not combine values.
Do not add explanations. Ensure the response is valid JSON.
"#;

/// Rewrite. Placeholders: `text`, `signature`, `preserve_keywords`.
pub const REWRITE_PROMPT: &str = r#"
Rewrite the following text to match the tone signature while preserving its key information.

Original text:
{text}

Tone signature:
{signature}

Keywords to preserve verbatim: {preserve_keywords}

Keep the original meaning. Adopt the signature's tone characteristics.
Respond with the rewritten text only, without quotes, headings or commentary.
"#;

/// Evaluation. Placeholders: `original`, `rewritten`, `signature`.
pub const EVALUATION_PROMPT: &str = r#"
Evaluate how well the rewritten text matches the target tone signature.

Original text:
{original}

Rewritten text:
{rewritten}

Target signature:
{signature}

Respond with a single JSON object. Every score is a number between 0 and 1.
{
  "fluency": 0.0,
  "authenticity": 0.0,
  "tone_alignment": 0.0,
  "readability": 0.0,
  "overall_score": 0.0,
  "strengths": ["..."],
  "suggestions": ["..."],
  "tone_characteristics_match": {
    "tone": 0.0,
    "language_style": 0.0,
    "formality_level": 0.0,
    "address_style": 0.0,
    "emotional_appeal": 0.0
  },
  "detailed_feedback": {
    "tone": ["..."],
    "language": ["..."],
    "structure": ["..."],
    "style": ["..."]
  }
}

Ensure the response is valid JSON.
"#;

/// Template for an operation.
pub fn template(op: Operation) -> &'static str {
    match op {
        Operation::Analyze => ANALYSIS_PROMPT,
        Operation::Rewrite => REWRITE_PROMPT,
        Operation::Evaluate => EVALUATION_PROMPT,
    }
}

/// Fill `{name}` placeholders from `values`. Unknown placeholders are left
/// as they are.
pub fn render(template: &str, values: &[(&str, &str)]) -> String {
    PLACEHOLDER
        .replace_all(template, |caps: &Captures| {
            let name = &caps[1];
            values
                .iter()
                .find(|(key, _)| *key == name)
                .map(|(_, value)| value.to_string())
                .unwrap_or_else(|| caps[0].to_string())
        })
        .trim()
        .to_string()
}

/// Keyword list as shown to the model.
pub fn keyword_list(keywords: &[String]) -> String {
    if keywords.is_empty() {
        "none".to_string()
    } else {
        keywords.join(", ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_fills_placeholders() {
        let prompt = render(
            REWRITE_PROMPT,
            &[
                ("text", "Our results are in."),
                ("signature", "tone: warm"),
                ("preserve_keywords", "Acme"),
            ],
        );
        assert!(prompt.contains("Our results are in."));
        assert!(prompt.contains("tone: warm"));
        assert!(prompt.contains("verbatim: Acme"));
        assert!(!prompt.contains("{text}"));
    }

    #[test]
    fn test_render_does_not_expand_user_content() {
        let prompt = render(
            "A: {text}\nB: {signature}",
            &[("text", "literal {signature}"), ("signature", "sig")],
        );
        assert_eq!(prompt, "A: literal {signature}\nB: sig");
    }

    #[test]
    fn test_json_examples_survive_rendering() {
        let prompt = render(ANALYSIS_PROMPT, &[("text", "hello there")]);
        assert!(prompt.contains("\"formality_level\": \"one of: formal, semi-formal, informal\""));

        let prompt = render(
            EVALUATION_PROMPT,
            &[("original", "a"), ("rewritten", "b"), ("signature", "c")],
        );
        assert!(prompt.contains("\"tone_characteristics_match\""));
    }

    #[test]
    fn test_every_operation_has_a_template() {
        for op in Operation::ALL {
            assert!(!template(op).trim().is_empty());
        }
    }

    #[test]
    fn test_keyword_list() {
        assert_eq!(keyword_list(&[]), "none");
        assert_eq!(
            keyword_list(&["Acme".to_string(), "Q3".to_string()]),
            "Acme, Q3"
        );
    }
}
