//! Runtime configuration.
//!
//! Loaded from YAML. Every section and field is optional; missing values
//! take the defaults below. Durations are humantime strings (`"1h"`,
//! `"30s"`, `"5m 30s"`).
//!
//! ```yaml
//! cache:
//!   default_ttl: 1h
//!   sweep_interval: 10m
//! validation:
//!   min_text_chars: 10
//! llm:
//!   model: gpt-4
//!   timeout: 30s
//! circuit_breaker:
//!   failure_threshold: 3
//!   recovery_timeout: 30s
//! budget:
//!   max_tokens: 200000
//! ```

use secrecy::SecretString;
use serde::{Deserialize, Deserializer, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;
use tonal_core::TextRules;

use crate::cache::DEFAULT_TTL;
use crate::resilience::CircuitBreakerConfig;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Failed to parse YAML: {0}")]
    YamlError(#[from] serde_yaml::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Top-level configuration for the runtime and the `tonal` binary.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    pub cache: CacheConfig,
    pub validation: TextRules,
    pub llm: LlmConfig,
    pub circuit_breaker: CircuitBreakerConfig,
    pub budget: BudgetConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// How long analysis, rewrite and evaluation results stay reusable
    #[serde(with = "duration_str")]
    pub default_ttl: Duration,

    /// Interval of the background purge of expired entries; off when unset
    #[serde(with = "opt_duration_str", skip_serializing_if = "Option::is_none")]
    pub sweep_interval: Option<Duration>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            default_ttl: DEFAULT_TTL,
            sweep_interval: None,
        }
    }
}

/// Settings for the LLM-backed collaborator.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    pub model: String,
    pub max_tokens: u32,
    pub analysis_temperature: f32,
    pub rewrite_temperature: f32,
    pub evaluation_temperature: f32,

    #[serde(with = "duration_str")]
    pub timeout: Duration,

    pub base_url: String,

    /// Falls back to `OPENAI_API_KEY` when unset. Never serialized.
    #[serde(skip_serializing, deserialize_with = "secret_from_string")]
    pub api_key: Option<SecretString>,

    /// Extra attempts on rate limits and transient provider errors
    pub max_retries: usize,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            model: "gpt-4".to_string(),
            max_tokens: 1000,
            analysis_temperature: 0.0,
            rewrite_temperature: 0.7,
            evaluation_temperature: 0.0,
            timeout: Duration::from_secs(30),
            base_url: "https://api.openai.com/v1".to_string(),
            api_key: None,
            max_retries: 2,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BudgetConfig {
    /// Global token ceiling across all model calls; unlimited when unset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
}

impl RuntimeConfig {
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        // An empty document means all defaults
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        let config: RuntimeConfig = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path)?;
        Self::from_yaml(&contents)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.cache.default_ttl.is_zero() {
            return Err(ConfigError::Invalid(
                "cache.default_ttl must be greater than zero".to_string(),
            ));
        }
        if self.cache.sweep_interval.is_some_and(|d| d.is_zero()) {
            return Err(ConfigError::Invalid(
                "cache.sweep_interval must be greater than zero".to_string(),
            ));
        }
        if self.llm.model.trim().is_empty() {
            return Err(ConfigError::Invalid("llm.model must not be empty".to_string()));
        }
        if self.llm.max_tokens == 0 {
            return Err(ConfigError::Invalid(
                "llm.max_tokens must be greater than zero".to_string(),
            ));
        }
        for (name, value) in [
            ("llm.analysis_temperature", self.llm.analysis_temperature),
            ("llm.rewrite_temperature", self.llm.rewrite_temperature),
            ("llm.evaluation_temperature", self.llm.evaluation_temperature),
        ] {
            if !(0.0..=2.0).contains(&value) {
                return Err(ConfigError::Invalid(format!(
                    "{} must be between 0 and 2 (got {})",
                    name, value
                )));
            }
        }
        if self.circuit_breaker.failure_threshold == 0 || self.circuit_breaker.success_threshold == 0
        {
            return Err(ConfigError::Invalid(
                "circuit_breaker thresholds must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

fn secret_from_string<'de, D>(deserializer: D) -> Result<Option<SecretString>, D::Error>
where
    D: Deserializer<'de>,
{
    let value: Option<String> = Option::deserialize(deserializer)?;
    Ok(value
        .filter(|v| !v.trim().is_empty())
        .map(SecretString::from))
}

/// Serde adapter for humantime duration strings.
pub(crate) mod duration_str {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&humantime::format_duration(*duration).to_string())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let text = String::deserialize(deserializer)?;
        humantime::parse_duration(&text).map_err(serde::de::Error::custom)
    }
}

pub(crate) mod opt_duration_str {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Option<Duration>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match duration {
            Some(d) => serializer.serialize_str(&humantime::format_duration(*d).to_string()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let text: Option<String> = Option::deserialize(deserializer)?;
        text.map(|t| humantime::parse_duration(&t).map_err(serde::de::Error::custom))
            .transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;

    #[test]
    fn test_defaults() {
        let config = RuntimeConfig::default();
        assert_eq!(config.cache.default_ttl, Duration::from_secs(3600));
        assert_eq!(config.cache.sweep_interval, None);
        assert_eq!(config.validation.min_text_chars, 10);
        assert_eq!(config.llm.model, "gpt-4");
        assert_eq!(config.llm.rewrite_temperature, 0.7);
        assert_eq!(config.llm.max_retries, 2);
        assert!(config.budget.max_tokens.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_empty_document_is_default() {
        let config = RuntimeConfig::from_yaml("").unwrap();
        assert_eq!(config.cache.default_ttl, DEFAULT_TTL);
    }

    #[test]
    fn test_partial_yaml() {
        let yaml = r#"
cache:
  default_ttl: 5m
  sweep_interval: 30s
validation:
  min_text_chars: 3
llm:
  model: gpt-4o-mini
  api_key: sk-from-config
circuit_breaker:
  recovery_timeout: 1m
budget:
  max_tokens: 5000
"#;
        let config = RuntimeConfig::from_yaml(yaml).unwrap();

        assert_eq!(config.cache.default_ttl, Duration::from_secs(300));
        assert_eq!(config.cache.sweep_interval, Some(Duration::from_secs(30)));
        assert_eq!(config.validation.min_text_chars, 3);
        assert_eq!(config.llm.model, "gpt-4o-mini");
        // Untouched fields keep their defaults
        assert_eq!(config.llm.max_tokens, 1000);
        assert_eq!(
            config.llm.api_key.as_ref().map(|k| k.expose_secret().to_string()),
            Some("sk-from-config".to_string())
        );
        assert_eq!(config.circuit_breaker.recovery_timeout, Duration::from_secs(60));
        assert_eq!(config.circuit_breaker.failure_threshold, 3);
        assert_eq!(config.budget.max_tokens, Some(5000));
    }

    #[test]
    fn test_api_key_never_serialized() {
        let mut config = RuntimeConfig::default();
        config.llm.api_key = Some(SecretString::from("sk-secret".to_string()));

        let yaml = serde_yaml::to_string(&config).unwrap();
        assert!(!yaml.contains("sk-secret"));
        assert!(yaml.contains("default_ttl: 1h"));

        let debug = format!("{:?}", config);
        assert!(!debug.contains("sk-secret"));
    }

    #[test]
    fn test_rejects_bad_duration() {
        let err = RuntimeConfig::from_yaml("cache:\n  default_ttl: soon\n").unwrap_err();
        assert!(matches!(err, ConfigError::YamlError(_)));
    }

    #[test]
    fn test_rejects_zero_ttl() {
        let err = RuntimeConfig::from_yaml("cache:\n  default_ttl: 0s\n").unwrap_err();
        assert!(err.to_string().contains("default_ttl"));
    }

    #[test]
    fn test_rejects_out_of_range_temperature() {
        let err = RuntimeConfig::from_yaml("llm:\n  rewrite_temperature: 3.5\n").unwrap_err();
        assert!(err.to_string().contains("rewrite_temperature"));
    }

    #[test]
    fn test_missing_file() {
        let err = RuntimeConfig::from_yaml_file("/nonexistent/tonal.yaml").unwrap_err();
        assert!(matches!(err, ConfigError::IoError(_)));
    }
}
