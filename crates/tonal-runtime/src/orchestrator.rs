//! The tone workflow.
//!
//! [`ToneOrchestrator`] owns the brand registry, the signature and
//! evaluation stores and the result cache, and composes them with a
//! [`ToneCollaborator`] into the upward operations:
//! - analyze, rewrite and evaluate single texts, each memoized in the cache
//! - the composite rewrite-and-evaluate workflow
//! - signature and evaluation lookups, rejections, cache administration
//!
//! Every input is validated before the cache or the collaborator is
//! touched. Collaborator failures are returned to the caller unchanged.

use chrono::Utc;
use std::iter;
use std::sync::{Arc, Weak};
use std::time::Duration;
use thiserror::Error;
use tokio::task::JoinHandle;
use tonal_core::{
    check_id, check_keywords, Brand, Evaluation, EvaluationResult, Rejection, RewriteOutcome,
    Signature, TextRules, ToneAnalysis, ToneError,
};

use crate::cache::{compose_key, namespaces, CacheStats, ExpiringCache};
use crate::collaborator::ToneCollaborator;
use crate::config::{ConfigError, RuntimeConfig};
use crate::stores::{BrandRegistry, EvaluationStore, SignatureStore};

/// Errors from building an orchestrator.
#[derive(Error, Debug)]
pub enum RuntimeError {
    #[error("Collaborator not configured")]
    CollaboratorNotConfigured,

    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// A memoized collaborator result.
#[derive(Debug, Clone, PartialEq)]
pub enum CachedValue {
    Analysis(String),
    Rewrite(String),
    Evaluation(EvaluationResult),
}

/// Input to [`ToneOrchestrator::rewrite_and_evaluate`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RewriteRequest {
    pub text: String,

    /// Existing or new brand id; a fresh id is allocated when absent
    pub brand_id: Option<String>,

    /// Display name for a newly created brand
    pub brand_name: Option<String>,

    pub preserve_keywords: Vec<String>,
}

impl RewriteRequest {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Self::default()
        }
    }

    pub fn brand(mut self, brand_id: impl Into<String>) -> Self {
        self.brand_id = Some(brand_id.into());
        self
    }

    pub fn brand_name(mut self, name: impl Into<String>) -> Self {
        self.brand_name = Some(name.into());
        self
    }

    pub fn preserve<I, S>(mut self, keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.preserve_keywords = keywords.into_iter().map(Into::into).collect();
        self
    }
}

pub struct ToneOrchestrator {
    collaborator: Arc<dyn ToneCollaborator>,
    brands: Arc<BrandRegistry>,
    signatures: Arc<SignatureStore>,
    evaluations: Arc<EvaluationStore>,
    cache: Arc<ExpiringCache<CachedValue>>,
    rules: TextRules,
    sweep_interval: Option<Duration>,
}

impl ToneOrchestrator {
    /// Orchestrator with fresh stores configured from `config`.
    pub fn new(collaborator: Arc<dyn ToneCollaborator>, config: &RuntimeConfig) -> Self {
        Self {
            collaborator,
            brands: Arc::new(BrandRegistry::new()),
            signatures: Arc::new(SignatureStore::new()),
            evaluations: Arc::new(EvaluationStore::new()),
            cache: Arc::new(ExpiringCache::new(config.cache.default_ttl)),
            rules: config.validation,
            sweep_interval: config.cache.sweep_interval,
        }
    }

    pub fn builder() -> ToneOrchestratorBuilder {
        ToneOrchestratorBuilder::new()
    }

    /// Analyze `text` into a tone signature.
    pub async fn analyze_text(&self, text: &str) -> Result<ToneAnalysis, ToneError> {
        self.rules.check_text("text", text)?;
        let signature = self.cached_analyze(text).await?;
        Ok(ToneAnalysis {
            signature,
            analyzed_at: Utc::now(),
        })
    }

    /// Rewrite `text` to match `signature`.
    pub async fn rewrite_text(
        &self,
        text: &str,
        signature: &str,
        preserve_keywords: &[String],
    ) -> Result<String, ToneError> {
        self.rules.check_text("text", text)?;
        self.rules.check_signature(signature)?;
        check_keywords(preserve_keywords)?;
        self.cached_rewrite(text, signature, preserve_keywords).await
    }

    /// Score `rewritten` against `signature` and persist a new evaluation.
    ///
    /// The brand does not have to be registered. The score itself is
    /// memoized, but every call stores a fresh record.
    pub async fn evaluate_text(
        &self,
        brand_id: &str,
        original: &str,
        rewritten: &str,
        signature: &str,
    ) -> Result<Evaluation, ToneError> {
        check_id("brand_id", brand_id)?;
        self.rules.check_text("original_text", original)?;
        self.rules.check_text("rewritten_text", rewritten)?;
        self.rules.check_signature(signature)?;

        let result = self.cached_evaluate(original, rewritten, signature).await?;
        Ok(self.evaluations.create(brand_id, original, rewritten, result))
    }

    pub fn get_signature(&self, brand_id: &str) -> Result<Signature, ToneError> {
        self.signatures.get(brand_id)
    }

    /// Explicitly create or replace a brand's signature. The brand is
    /// registered if unknown.
    pub fn put_signature(&self, brand_id: &str, signature_text: &str) -> Result<Signature, ToneError> {
        check_id("brand_id", brand_id)?;
        self.rules.check_signature(signature_text)?;
        self.brands.resolve(Some(brand_id), None)?;
        self.signatures.put(brand_id, signature_text)
    }

    pub fn get_evaluation(&self, evaluation_id: &str) -> Result<Evaluation, ToneError> {
        self.evaluations.get(evaluation_id)
    }

    /// Rewrite a text in a brand's voice and score the result.
    ///
    /// Steps, in order:
    /// 1. resolve or create the brand
    /// 2. fetch the brand's signature, analyzing `text` if it has none
    /// 3. rewrite (memoized under `"rewrite"`)
    /// 4. evaluate (memoized under `"evaluation"`)
    /// 5. persist the evaluation
    ///
    /// A failure in steps 2-4 aborts the call and nothing is persisted for
    /// it beyond what already succeeded: a brand created in step 1 stays, a
    /// signature exists only if analysis succeeded.
    pub async fn rewrite_and_evaluate(
        &self,
        request: RewriteRequest,
    ) -> Result<RewriteOutcome, ToneError> {
        let RewriteRequest {
            text,
            brand_id,
            brand_name,
            preserve_keywords,
        } = request;

        self.rules.check_text("text", &text)?;
        check_keywords(&preserve_keywords)?;
        if let Some(id) = &brand_id {
            check_id("brand_id", id)?;
        }

        let brand = self.resolve_brand(brand_id.as_deref(), brand_name.as_deref())?;

        let signature = self
            .signatures
            .get_or_create(&brand.brand_id, &text, |source| async move {
                self.cached_analyze(&source).await
            })
            .await?;

        let rewritten = self
            .cached_rewrite(&text, &signature.signature_text, &preserve_keywords)
            .await?;

        let result = self
            .cached_evaluate(&text, &rewritten, &signature.signature_text)
            .await?;

        let evaluation = self
            .evaluations
            .create(&brand.brand_id, &text, &rewritten, result);
        Ok(RewriteOutcome::new(brand, evaluation))
    }

    /// Record a human rejection of `text`.
    pub fn reject_text(
        &self,
        text: &str,
        reason: &str,
        category: Option<&str>,
    ) -> Result<Rejection, ToneError> {
        self.rules.check_text("text", text)?;
        self.rules.check_text("reason", reason)?;

        tracing::info!(category = category.unwrap_or("uncategorized"), "Text rejected");
        Ok(Rejection::new(text, reason, category.map(str::to_string)))
    }

    /// A brand's evaluations, oldest first.
    pub fn evaluations_for_brand(&self, brand_id: &str) -> Vec<Evaluation> {
        self.evaluations.for_brand(brand_id)
    }

    /// Return the brand for `brand_id`, creating it if unknown or if no id
    /// is given. This is step 1 of [`rewrite_and_evaluate`](Self::rewrite_and_evaluate).
    pub fn resolve_brand(
        &self,
        brand_id: Option<&str>,
        brand_name: Option<&str>,
    ) -> Result<Brand, ToneError> {
        self.brands.resolve(brand_id, brand_name)
    }

    pub fn get_brand(&self, brand_id: &str) -> Result<Brand, ToneError> {
        self.brands.get(brand_id)
    }

    pub fn brands(&self) -> Vec<Brand> {
        self.brands.list()
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    /// Drop cached results in `namespace`, or all of them.
    pub fn clear_cache(&self, namespace: Option<&str>) -> usize {
        let removed = self.cache.clear(namespace);
        tracing::info!(namespace = namespace.unwrap_or("*"), removed, "Cleared cache");
        removed
    }

    /// Start the background purge of expired cache entries.
    ///
    /// Returns `None` when no sweep interval is configured. The task holds
    /// only a weak reference and ends once the orchestrator is dropped.
    pub fn spawn_sweeper(self: &Arc<Self>) -> Option<JoinHandle<()>> {
        let period = self.sweep_interval.filter(|p| !p.is_zero())?;
        let weak: Weak<Self> = Arc::downgrade(self);

        Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            loop {
                ticker.tick().await;
                let Some(orchestrator) = weak.upgrade() else {
                    break;
                };
                let purged = orchestrator.cache.purge_expired();
                if purged > 0 {
                    tracing::debug!(purged, "Purged expired cache entries");
                }
            }
            tracing::debug!("Cache sweeper stopped");
        }))
    }

    async fn cached_analyze(&self, text: &str) -> Result<String, ToneError> {
        if let Some(CachedValue::Analysis(signature)) = self.cache.get(namespaces::ANALYSIS, text) {
            return Ok(signature);
        }

        let signature = self.collaborator.analyze(text).await?;
        if signature.trim().is_empty() {
            return Err(ToneError::Analysis(
                "analysis returned an empty signature".to_string(),
            ));
        }
        self.cache.put(
            namespaces::ANALYSIS,
            text,
            CachedValue::Analysis(signature.clone()),
        );
        Ok(signature)
    }

    async fn cached_rewrite(
        &self,
        text: &str,
        signature: &str,
        preserve_keywords: &[String],
    ) -> Result<String, ToneError> {
        let key = compose_key(
            iter::once(text)
                .chain(iter::once(signature))
                .chain(preserve_keywords.iter().map(String::as_str)),
        );

        if let Some(CachedValue::Rewrite(rewritten)) = self.cache.get(namespaces::REWRITE, &key) {
            return Ok(rewritten);
        }

        let rewritten = self
            .collaborator
            .rewrite(text, signature, preserve_keywords)
            .await?;
        self.cache.put(
            namespaces::REWRITE,
            &key,
            CachedValue::Rewrite(rewritten.clone()),
        );
        Ok(rewritten)
    }

    async fn cached_evaluate(
        &self,
        original: &str,
        rewritten: &str,
        signature: &str,
    ) -> Result<EvaluationResult, ToneError> {
        let key = compose_key([original, rewritten, signature]);

        if let Some(CachedValue::Evaluation(result)) = self.cache.get(namespaces::EVALUATION, &key) {
            return Ok(result);
        }

        let result = self
            .collaborator
            .evaluate(original, rewritten, signature)
            .await?;
        self.cache.put(
            namespaces::EVALUATION,
            &key,
            CachedValue::Evaluation(result.clone()),
        );
        Ok(result)
    }
}

/// Builder for [`ToneOrchestrator`] with explicitly shared stores.
pub struct ToneOrchestratorBuilder {
    collaborator: Option<Arc<dyn ToneCollaborator>>,
    config: RuntimeConfig,
    brands: Option<Arc<BrandRegistry>>,
    signatures: Option<Arc<SignatureStore>>,
    evaluations: Option<Arc<EvaluationStore>>,
    cache: Option<Arc<ExpiringCache<CachedValue>>>,
}

impl ToneOrchestratorBuilder {
    pub fn new() -> Self {
        Self {
            collaborator: None,
            config: RuntimeConfig::default(),
            brands: None,
            signatures: None,
            evaluations: None,
            cache: None,
        }
    }

    pub fn collaborator(mut self, collaborator: Arc<dyn ToneCollaborator>) -> Self {
        self.collaborator = Some(collaborator);
        self
    }

    pub fn config(mut self, config: RuntimeConfig) -> Self {
        self.config = config;
        self
    }

    pub fn brands(mut self, brands: Arc<BrandRegistry>) -> Self {
        self.brands = Some(brands);
        self
    }

    pub fn signatures(mut self, signatures: Arc<SignatureStore>) -> Self {
        self.signatures = Some(signatures);
        self
    }

    pub fn evaluations(mut self, evaluations: Arc<EvaluationStore>) -> Self {
        self.evaluations = Some(evaluations);
        self
    }

    /// Share a cache; its own TTL applies instead of the configured one.
    pub fn cache(mut self, cache: Arc<ExpiringCache<CachedValue>>) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn build(self) -> Result<ToneOrchestrator, RuntimeError> {
        let collaborator = self
            .collaborator
            .ok_or(RuntimeError::CollaboratorNotConfigured)?;
        self.config.validate()?;

        let mut orchestrator = ToneOrchestrator::new(collaborator, &self.config);
        if let Some(brands) = self.brands {
            orchestrator.brands = brands;
        }
        if let Some(signatures) = self.signatures {
            orchestrator.signatures = signatures;
        }
        if let Some(evaluations) = self.evaluations {
            orchestrator.evaluations = evaluations;
        }
        if let Some(cache) = self.cache {
            orchestrator.cache = cache;
        }
        Ok(orchestrator)
    }
}

impl Default for ToneOrchestratorBuilder {
    fn default() -> Self {
        Self::new()
    }
}
