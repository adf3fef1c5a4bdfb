//! # tonal-runtime
//!
//! The tone workflow: stores, result cache and collaborator orchestration.
//!
//! This crate composes the records from `tonal-core` into the operations a
//! request layer exposes:
//! - analyze a text into a tone signature
//! - rewrite a text to match a signature, preserving keywords
//! - score a rewrite against a signature and persist the evaluation
//! - the composite rewrite-and-evaluate workflow for a brand
//!
//! The text work itself happens behind the [`ToneCollaborator`] trait.
//! [`LlmToneCollaborator`] implements it over an [`providers::LlmProvider`]
//! with retries, a circuit breaker and token accounting. Any other
//! implementation (a fixture, a rules engine) plugs in the same way.
//!
//! ## Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use tonal_runtime::{
//!     LlmToneCollaborator, OpenAiProvider, RewriteRequest, RuntimeConfig, ToneOrchestrator,
//! };
//!
//! let config = RuntimeConfig::from_yaml_file("tonal.yaml")?;
//! let provider = Arc::new(OpenAiProvider::from_config(&config.llm)?);
//! let collaborator = Arc::new(LlmToneCollaborator::new(provider, &config));
//!
//! let orchestrator = ToneOrchestrator::builder()
//!     .collaborator(collaborator)
//!     .config(config)
//!     .build()?;
//!
//! let outcome = orchestrator
//!     .rewrite_and_evaluate(RewriteRequest::new("We are pleased to announce...").brand("acme"))
//!     .await?;
//! println!("{}: {}", outcome.result.overall_score, outcome.rewritten_text);
//! ```

pub mod agents;
pub mod cache;
pub mod collaborator;
pub mod config;
pub mod orchestrator;
pub mod prompts;
pub mod providers;
pub mod resilience;
pub mod stores;

pub use agents::LlmToneCollaborator;
pub use cache::{compose_key, namespaces, CacheKey, CacheStats, ExpiringCache, DEFAULT_TTL};
pub use collaborator::{Operation, ToneCollaborator};
pub use config::{BudgetConfig, CacheConfig, ConfigError, LlmConfig, RuntimeConfig};
pub use orchestrator::{
    CachedValue, RewriteRequest, RuntimeError, ToneOrchestrator, ToneOrchestratorBuilder,
};
#[cfg(feature = "openai")]
pub use providers::OpenAiProvider;
pub use stores::{BrandRegistry, EvaluationStore, SignatureStore};
