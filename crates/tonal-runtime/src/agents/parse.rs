//! Strict parsing of model completions.
//!
//! A completion that does not carry every required field with an accepted
//! value is rejected. Nothing is filled in with defaults.

use lazy_static::lazy_static;
use regex::Regex;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use thiserror::Error;
use tonal_core::{EvaluationResult, ToneCharacteristics};

lazy_static! {
    static ref FENCED_JSON: Regex = Regex::new(r"(?s)```(?:json)?\s*(\{.*?\})\s*```").unwrap();
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParseError {
    #[error("no JSON object found in response")]
    NoJson,

    #[error("invalid JSON: {0}")]
    InvalidJson(String),

    #[error("missing field: {0}")]
    MissingField(String),

    #[error("invalid value for {field}: {message}")]
    InvalidValue { field: String, message: String },

    #[error("score out of range: {0}")]
    OutOfRange(String),

    #[error("empty response")]
    Empty,
}

/// Locate the JSON object in a completion: a fenced block if present,
/// otherwise the outermost braces.
pub fn extract_json(content: &str) -> Result<Map<String, Value>, ParseError> {
    let candidate = match FENCED_JSON.captures(content) {
        Some(caps) => caps.get(1).map(|m| m.as_str()).ok_or(ParseError::NoJson)?,
        None => {
            let start = content.find('{').ok_or(ParseError::NoJson)?;
            let end = content.rfind('}').ok_or(ParseError::NoJson)?;
            if end < start {
                return Err(ParseError::NoJson);
            }
            &content[start..=end]
        }
    };

    match serde_json::from_str::<Value>(candidate) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) => Err(ParseError::NoJson),
        Err(e) => Err(ParseError::InvalidJson(e.to_string())),
    }
}

/// Parse an analysis completion into validated characteristics.
pub fn parse_characteristics(content: &str) -> Result<ToneCharacteristics, ParseError> {
    let map = extract_json(content)?;

    Ok(ToneCharacteristics {
        tone: enum_field(&map, "tone")?,
        language_style: enum_field(&map, "language_style")?,
        formality_level: enum_field(&map, "formality_level")?,
        address_style: enum_field(&map, "address_style")?,
        emotional_appeal: enum_field(&map, "emotional_appeal")?,
    })
}

/// Parse an evaluation completion. All five scores plus `strengths` and
/// `suggestions` are required; the per-characteristic and detailed
/// feedback maps may be absent.
pub fn parse_evaluation(content: &str) -> Result<EvaluationResult, ParseError> {
    let map = extract_json(content)?;

    let result = EvaluationResult {
        fluency: score_field(&map, "fluency")?,
        authenticity: score_field(&map, "authenticity")?,
        tone_alignment: score_field(&map, "tone_alignment")?,
        readability: score_field(&map, "readability")?,
        overall_score: score_field(&map, "overall_score")?,
        strengths: string_list(&map, "strengths")?,
        suggestions: string_list(&map, "suggestions")?,
        tone_characteristics_match: optional_scores(&map, "tone_characteristics_match")?,
        detailed_feedback: optional_feedback(&map, "detailed_feedback")?,
    };

    result.check_ranges().map_err(ParseError::OutOfRange)?;
    Ok(result)
}

/// Clean a rewrite completion: trims whitespace and a wrapping code fence
/// or quote pair.
pub fn parse_rewrite(content: &str) -> Result<String, ParseError> {
    let mut text = content.trim();

    if let Some(inner) = text.strip_prefix("```").and_then(|t| t.strip_suffix("```")) {
        // Drop an optional language tag on the opening fence line
        text = match inner.split_once('\n') {
            Some((first, rest)) if !first.trim().contains(' ') => rest,
            _ => inner,
        }
        .trim();
    }

    // Only a pair that wraps the whole reply; quotes inside belong to the text
    for (open, close) in [('"', '"'), ('\u{201c}', '\u{201d}')] {
        if let Some(inner) = text.strip_prefix(open).and_then(|t| t.strip_suffix(close)) {
            if !inner.contains([open, close]) {
                text = inner.trim();
            }
        }
    }

    if text.is_empty() {
        return Err(ParseError::Empty);
    }
    Ok(text.to_string())
}

fn enum_field<T>(map: &Map<String, Value>, field: &str) -> Result<T, ParseError>
where
    T: std::str::FromStr<Err = String>,
{
    let raw = map
        .get(field)
        .ok_or_else(|| ParseError::MissingField(field.to_string()))?
        .as_str()
        .ok_or_else(|| ParseError::InvalidValue {
            field: field.to_string(),
            message: "expected a string".to_string(),
        })?;

    raw.parse().map_err(|message| ParseError::InvalidValue {
        field: field.to_string(),
        message,
    })
}

fn score_field(map: &Map<String, Value>, field: &str) -> Result<f64, ParseError> {
    map.get(field)
        .ok_or_else(|| ParseError::MissingField(field.to_string()))?
        .as_f64()
        .ok_or_else(|| ParseError::InvalidValue {
            field: field.to_string(),
            message: "expected a number".to_string(),
        })
}

fn string_list(map: &Map<String, Value>, field: &str) -> Result<Vec<String>, ParseError> {
    let value = map
        .get(field)
        .ok_or_else(|| ParseError::MissingField(field.to_string()))?;
    strings(value, field)
}

fn strings(value: &Value, field: &str) -> Result<Vec<String>, ParseError> {
    let invalid = || ParseError::InvalidValue {
        field: field.to_string(),
        message: "expected a list of strings".to_string(),
    };

    value
        .as_array()
        .ok_or_else(invalid)?
        .iter()
        .map(|item| item.as_str().map(str::to_string).ok_or_else(invalid))
        .collect()
}

fn optional_scores(
    map: &Map<String, Value>,
    field: &str,
) -> Result<BTreeMap<String, f64>, ParseError> {
    let Some(value) = map.get(field) else {
        return Ok(BTreeMap::new());
    };
    let object = value.as_object().ok_or_else(|| ParseError::InvalidValue {
        field: field.to_string(),
        message: "expected an object".to_string(),
    })?;

    object
        .iter()
        .map(|(name, score)| {
            score
                .as_f64()
                .map(|s| (name.clone(), s))
                .ok_or_else(|| ParseError::InvalidValue {
                    field: format!("{}.{}", field, name),
                    message: "expected a number".to_string(),
                })
        })
        .collect()
}

fn optional_feedback(
    map: &Map<String, Value>,
    field: &str,
) -> Result<BTreeMap<String, Vec<String>>, ParseError> {
    let Some(value) = map.get(field) else {
        return Ok(BTreeMap::new());
    };
    let object = value.as_object().ok_or_else(|| ParseError::InvalidValue {
        field: field.to_string(),
        message: "expected an object".to_string(),
    })?;

    object
        .iter()
        .map(|(aspect, notes)| -> Result<(String, Vec<String>), ParseError> {
            let notes = strings(notes, &format!("{}.{}", field, aspect))?;
            Ok((aspect.clone(), notes))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tonal_core::{AddressStyle, EmotionalAppeal, FormalityLevel, LanguageStyle, Tone};

    const ANALYSIS: &str = r#"{
        "tone": "professional",
        "language_style": "conversational",
        "formality_level": "semi-formal",
        "address_style": "collective",
        "emotional_appeal": "inspirational"
    }"#;

    const EVALUATION: &str = r#"{
        "fluency": 0.9,
        "authenticity": 0.8,
        "tone_alignment": 0.85,
        "readability": 0.95,
        "overall_score": 0.87,
        "strengths": ["clear"],
        "suggestions": ["shorter sentences"],
        "tone_characteristics_match": {"tone": 0.9},
        "detailed_feedback": {"style": ["consistent"]}
    }"#;

    #[test]
    fn test_parse_characteristics() {
        let parsed = parse_characteristics(ANALYSIS).unwrap();
        assert_eq!(parsed.tone, Tone::Professional);
        assert_eq!(parsed.language_style, LanguageStyle::Conversational);
        assert_eq!(parsed.formality_level, FormalityLevel::SemiFormal);
        assert_eq!(parsed.address_style, AddressStyle::Collective);
        assert_eq!(parsed.emotional_appeal, EmotionalAppeal::Inspirational);
    }

    #[test]
    fn test_fenced_json_with_prose() {
        let content = format!("Here is the analysis:\n```json\n{}\n```\nHope this helps.", ANALYSIS);
        assert!(parse_characteristics(&content).is_ok());
    }

    #[test]
    fn test_bare_json_with_prose() {
        let content = format!("Sure. {} Done.", ANALYSIS);
        assert!(parse_characteristics(&content).is_ok());
    }

    #[test]
    fn test_missing_field_is_not_defaulted() {
        let err = parse_characteristics(r#"{"tone": "formal"}"#).unwrap_err();
        assert_eq!(err, ParseError::MissingField("language_style".to_string()));
    }

    #[test]
    fn test_unknown_value_rejected() {
        let content = ANALYSIS.replace("\"professional\"", "\"sarcastic\"");
        let err = parse_characteristics(&content).unwrap_err();
        assert!(matches!(err, ParseError::InvalidValue { ref field, .. } if field == "tone"));
    }

    #[test]
    fn test_not_json() {
        assert_eq!(
            parse_characteristics("The tone is formal.").unwrap_err(),
            ParseError::NoJson
        );
        assert!(matches!(
            parse_characteristics("{ tone: formal }").unwrap_err(),
            ParseError::InvalidJson(_)
        ));
    }

    #[test]
    fn test_parse_evaluation() {
        let result = parse_evaluation(EVALUATION).unwrap();
        assert_eq!(result.overall_score, 0.87);
        assert_eq!(result.strengths, vec!["clear"]);
        assert_eq!(result.tone_characteristics_match.get("tone"), Some(&0.9));
        assert_eq!(
            result.detailed_feedback.get("style"),
            Some(&vec!["consistent".to_string()])
        );
    }

    #[test]
    fn test_evaluation_requires_scores() {
        let content = EVALUATION.replace("\"readability\": 0.95,", "");
        assert_eq!(
            parse_evaluation(&content).unwrap_err(),
            ParseError::MissingField("readability".to_string())
        );
    }

    #[test]
    fn test_evaluation_score_out_of_range() {
        let content = EVALUATION.replace("0.87", "1.7");
        assert!(matches!(
            parse_evaluation(&content).unwrap_err(),
            ParseError::OutOfRange(_)
        ));
    }

    #[test]
    fn test_evaluation_optional_maps() {
        let content = r#"{"fluency": 1, "authenticity": 0, "tone_alignment": 0.5,
            "readability": 0.5, "overall_score": 0.5, "strengths": [], "suggestions": []}"#;
        let result = parse_evaluation(content).unwrap();
        assert!(result.tone_characteristics_match.is_empty());
        assert!(result.detailed_feedback.is_empty());
        assert_eq!(result.fluency, 1.0);
    }

    #[test]
    fn test_parse_rewrite() {
        assert_eq!(parse_rewrite("  Hello there.  \n").unwrap(), "Hello there.");
        assert_eq!(parse_rewrite("\"Quoted text.\"").unwrap(), "Quoted text.");
        assert_eq!(parse_rewrite("```text\nFenced text.\n```").unwrap(), "Fenced text.");
        assert_eq!(parse_rewrite("   ").unwrap_err(), ParseError::Empty);
    }

    #[test]
    fn test_parse_rewrite_keeps_inner_quotes() {
        let quoted = "\"Innovation drives us,\" said the CEO. \"We are thrilled.\"";
        assert_eq!(parse_rewrite(quoted).unwrap(), quoted);

        let curly = "\u{201c}Innovation drives us,\u{201d} said the CEO. \u{201c}We are thrilled.\u{201d}";
        assert_eq!(parse_rewrite(curly).unwrap(), curly);

        assert_eq!(
            parse_rewrite("\u{201c}One quoted sentence.\u{201d}").unwrap(),
            "One quoted sentence."
        );
    }
}
