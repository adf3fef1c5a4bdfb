//! Collaborator backed by a language model provider.

use async_trait::async_trait;
use backon::{ExponentialBuilder, Retryable};
use std::sync::Arc;
use std::time::Duration;
use tonal_core::{EvaluationResult, ToneError};

use super::parse::{parse_characteristics, parse_evaluation, parse_rewrite, ParseError};
use crate::collaborator::{Operation, ToneCollaborator};
use crate::config::{LlmConfig, RuntimeConfig};
use crate::prompts::{self, SYSTEM_PROMPT};
use crate::providers::{ChatMessage, CompletionConfig, LlmProvider, ProviderError};
use crate::resilience::{BudgetTracker, CircuitBreaker, CircuitState, LlmUsage};

/// [`ToneCollaborator`] that prompts a model for every operation.
///
/// Each call passes through the operation's circuit breaker and the token
/// budget, and is retried with exponential backoff on rate limits and
/// transient provider errors. Completions are parsed strictly; a reply
/// that cannot be parsed fails the operation.
pub struct LlmToneCollaborator {
    provider: Arc<dyn LlmProvider>,
    settings: LlmConfig,
    breaker: CircuitBreaker,
    budget: BudgetTracker,
}

impl LlmToneCollaborator {
    pub fn new(provider: Arc<dyn LlmProvider>, config: &RuntimeConfig) -> Self {
        Self {
            provider,
            settings: config.llm.clone(),
            breaker: CircuitBreaker::new(config.circuit_breaker.clone()),
            budget: BudgetTracker::from_limit(config.budget.max_tokens),
        }
    }

    /// Usage accumulated over every completed call.
    pub fn usage(&self) -> LlmUsage {
        self.budget.usage()
    }

    /// Tokens left in the global budget, or `None` when unlimited.
    pub fn remaining_budget(&self) -> Option<u32> {
        self.budget.remaining()
    }

    pub fn circuit_state(&self, op: Operation) -> CircuitState {
        self.breaker.state(op)
    }

    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    pub async fn provider_healthy(&self) -> bool {
        self.provider.health_check().await
    }

    fn completion_config(&self, op: Operation) -> CompletionConfig {
        let temperature = match op {
            Operation::Analyze => self.settings.analysis_temperature,
            Operation::Rewrite => self.settings.rewrite_temperature,
            Operation::Evaluate => self.settings.evaluation_temperature,
        };
        CompletionConfig {
            model: self.settings.model.clone(),
            max_tokens: self.settings.max_tokens,
            temperature,
            timeout: self.settings.timeout,
        }
    }

    /// Run one operation: prompt the model and parse the reply.
    async fn run<T>(
        &self,
        op: Operation,
        prompt: String,
        parse: impl FnOnce(&str) -> Result<T, ParseError>,
    ) -> Result<T, ToneError> {
        if !self.breaker.allow(op) {
            return Err(op.error(format!(
                "circuit open for {}, model calls suspended",
                op
            )));
        }

        let estimated = self
            .provider
            .estimate_tokens(&prompt)
            .saturating_add(self.settings.max_tokens);
        if !self.budget.can_afford(estimated) {
            tracing::warn!(operation = %op, estimated, "Token budget exhausted");
            return Err(op.error("token budget exhausted"));
        }

        let messages = vec![
            ChatMessage::system(SYSTEM_PROMPT.trim()),
            ChatMessage::user(prompt),
        ];
        let config = self.completion_config(op);

        let provider = &self.provider;
        let (messages, config) = (&messages, &config);
        let response = (|| async move { provider.complete(messages.clone(), config).await })
            .retry(ExponentialBuilder::default().with_max_times(self.settings.max_retries))
            .when(ProviderError::is_retryable)
            .notify(|err: &ProviderError, after: Duration| {
                tracing::warn!(operation = %op, error = %err, retry_in = ?after, "Retrying model call");
            })
            .await;

        let response = match response {
            Ok(response) => response,
            Err(e) => {
                self.breaker.record_failure(op);
                tracing::warn!(operation = %op, provider = self.provider.name(), error = %e, "Model call failed");
                return Err(op.error(e.to_string()));
            }
        };

        self.budget.record_usage(op, &response.usage, &response.model);

        match parse(&response.content) {
            Ok(parsed) => {
                self.breaker.record_success(op);
                Ok(parsed)
            }
            Err(e) => {
                self.breaker.record_failure(op);
                tracing::warn!(operation = %op, error = %e, "Unusable model response");
                Err(op.error(format!("unusable model response: {}", e)))
            }
        }
    }
}

#[async_trait]
impl ToneCollaborator for LlmToneCollaborator {
    async fn analyze(&self, text: &str) -> Result<String, ToneError> {
        let prompt = prompts::render(prompts::template(Operation::Analyze), &[("text", text)]);
        let characteristics = self
            .run(Operation::Analyze, prompt, parse_characteristics)
            .await?;
        Ok(characteristics.render())
    }

    async fn rewrite(
        &self,
        text: &str,
        signature: &str,
        preserve_keywords: &[String],
    ) -> Result<String, ToneError> {
        let keywords = prompts::keyword_list(preserve_keywords);
        let prompt = prompts::render(
            prompts::template(Operation::Rewrite),
            &[
                ("text", text),
                ("signature", signature),
                ("preserve_keywords", &keywords),
            ],
        );
        self.run(Operation::Rewrite, prompt, parse_rewrite).await
    }

    async fn evaluate(
        &self,
        original: &str,
        rewritten: &str,
        signature: &str,
    ) -> Result<EvaluationResult, ToneError> {
        let prompt = prompts::render(
            prompts::template(Operation::Evaluate),
            &[
                ("original", original),
                ("rewritten", rewritten),
                ("signature", signature),
            ],
        );
        self.run(Operation::Evaluate, prompt, parse_evaluation).await
    }

    fn name(&self) -> &str {
        "llm"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::{CompletionResponse, TokenUsage};
    use parking_lot::Mutex;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tonal_core::{ErrorCode, ToneCharacteristics};

    /// Provider replaying a fixed script of replies.
    struct ScriptedProvider {
        replies: Mutex<VecDeque<Result<String, ProviderError>>>,
        prompts: Mutex<Vec<String>>,
        calls: AtomicUsize,
    }

    impl ScriptedProvider {
        fn new(replies: Vec<Result<&str, ProviderError>>) -> Arc<Self> {
            Arc::new(Self {
                replies: Mutex::new(
                    replies
                        .into_iter()
                        .map(|r| r.map(str::to_string))
                        .collect(),
                ),
                prompts: Mutex::new(Vec::new()),
                calls: AtomicUsize::new(0),
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }

        fn last_prompt(&self) -> String {
            self.prompts.lock().last().cloned().unwrap_or_default()
        }
    }

    #[async_trait]
    impl LlmProvider for ScriptedProvider {
        async fn complete(
            &self,
            messages: Vec<ChatMessage>,
            config: &CompletionConfig,
        ) -> Result<CompletionResponse, ProviderError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if let Some(user) = messages.iter().find(|m| m.role == "user") {
                self.prompts.lock().push(user.content.clone());
            }
            let reply = self
                .replies
                .lock()
                .pop_front()
                .unwrap_or_else(|| Err(ProviderError::NotConfigured("script exhausted".into())))?;
            Ok(CompletionResponse {
                content: reply,
                usage: TokenUsage {
                    prompt_tokens: 100,
                    completion_tokens: 20,
                },
                model: config.model.clone(),
                stop_reason: Some("stop".to_string()),
            })
        }

        async fn health_check(&self) -> bool {
            true
        }

        fn name(&self) -> &str {
            "scripted"
        }
    }

    const ANALYSIS_REPLY: &str = r#"{"tone": "warm", "language_style": "conversational",
        "formality_level": "informal", "address_style": "personal", "emotional_appeal": "emotional"}"#;

    const EVALUATION_REPLY: &str = r#"{"fluency": 0.9, "authenticity": 0.8, "tone_alignment": 0.7,
        "readability": 0.9, "overall_score": 0.82, "strengths": ["warm"], "suggestions": []}"#;

    fn collaborator(provider: Arc<ScriptedProvider>, config: RuntimeConfig) -> LlmToneCollaborator {
        LlmToneCollaborator::new(provider, &config)
    }

    fn fast_config() -> RuntimeConfig {
        let mut config = RuntimeConfig::default();
        config.llm.max_retries = 2;
        config
    }

    #[tokio::test]
    async fn test_analyze_renders_characteristics() {
        let provider = ScriptedProvider::new(vec![Ok(ANALYSIS_REPLY)]);
        let llm = collaborator(Arc::clone(&provider), fast_config());

        let signature = llm.analyze("Hi friend, thanks for being here.").await.unwrap();
        let parsed = ToneCharacteristics::parse_rendered(&signature).unwrap();
        assert_eq!(parsed.render(), signature);
        assert!(signature.starts_with("tone: warm"));
        assert!(provider.last_prompt().contains("Hi friend, thanks for being here."));
    }

    #[tokio::test]
    async fn test_malformed_analysis_is_an_error() {
        let provider = ScriptedProvider::new(vec![Ok("I think it is rather formal.")]);
        let llm = collaborator(provider, fast_config());

        let err = llm.analyze("some text to analyze").await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::AnalysisError);
        assert!(err.to_string().contains("no JSON object"));
    }

    #[tokio::test]
    async fn test_rewrite_includes_keywords() {
        let provider = ScriptedProvider::new(vec![Ok("  Acme is thrilled to share Q3 results!  ")]);
        let llm = collaborator(Arc::clone(&provider), fast_config());

        let rewritten = llm
            .rewrite(
                "Acme announces Q3 results.",
                "tone: warm",
                &["Acme".to_string(), "Q3".to_string()],
            )
            .await
            .unwrap();

        assert_eq!(rewritten, "Acme is thrilled to share Q3 results!");
        assert!(provider.last_prompt().contains("Keywords to preserve verbatim: Acme, Q3"));
    }

    #[tokio::test]
    async fn test_evaluate_parses_scores() {
        let provider = ScriptedProvider::new(vec![Ok(EVALUATION_REPLY)]);
        let llm = collaborator(provider, fast_config());

        let result = llm.evaluate("original", "rewritten", "tone: warm").await.unwrap();
        assert_eq!(result.overall_score, 0.82);
        assert_eq!(result.strengths, vec!["warm"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_retries_transient_errors() {
        let provider = ScriptedProvider::new(vec![
            Err(ProviderError::RateLimited { retry_after: None }),
            Err(ProviderError::HttpError("connection reset".into())),
            Ok(ANALYSIS_REPLY),
        ]);
        let llm = collaborator(Arc::clone(&provider), fast_config());

        assert!(llm.analyze("retry this text please").await.is_ok());
        assert_eq!(provider.calls(), 3);
        assert_eq!(llm.usage().llm_calls, 1);
    }

    #[tokio::test]
    async fn test_does_not_retry_auth_errors() {
        let provider = ScriptedProvider::new(vec![Err(ProviderError::AuthError), Ok(ANALYSIS_REPLY)]);
        let llm = collaborator(Arc::clone(&provider), fast_config());

        let err = llm.analyze("some text to analyze").await.unwrap_err();
        assert_eq!(err, ToneError::Analysis("Authentication failed".to_string()));
        assert_eq!(provider.calls(), 1);
    }

    #[tokio::test]
    async fn test_open_circuit_fails_fast() {
        let mut config = fast_config();
        config.llm.max_retries = 0;
        config.circuit_breaker.failure_threshold = 2;
        let provider = ScriptedProvider::new(vec![
            Err(ProviderError::AuthError),
            Err(ProviderError::AuthError),
            Ok(EVALUATION_REPLY),
        ]);
        let llm = collaborator(Arc::clone(&provider), config);

        for _ in 0..2 {
            assert!(llm.evaluate("a", "b", "c").await.is_err());
        }
        assert!(matches!(
            llm.circuit_state(Operation::Evaluate),
            CircuitState::Open { .. }
        ));

        let err = llm.evaluate("a", "b", "c").await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::EvaluationError);
        assert!(err.to_string().contains("circuit open"));
        assert_eq!(provider.calls(), 2);

        // Other operations are unaffected
        assert_eq!(
            llm.circuit_state(Operation::Rewrite),
            CircuitState::Closed { failures: 0 }
        );
    }

    #[tokio::test]
    async fn test_budget_exhaustion_blocks_calls() {
        let mut config = fast_config();
        config.budget.max_tokens = Some(1150);
        let provider = ScriptedProvider::new(vec![Ok("first rewrite"), Ok("second rewrite")]);
        let llm = collaborator(Arc::clone(&provider), config);

        assert_eq!(llm.rewrite("text one here", "sig", &[]).await.unwrap(), "first rewrite");

        // 120 tokens spent; the next call's estimate includes max_tokens (1000)
        let err = llm.rewrite("text two here", "sig", &[]).await.unwrap_err();
        assert_eq!(err, ToneError::Rewrite("token budget exhausted".to_string()));
        assert_eq!(provider.calls(), 1);
        assert_eq!(llm.remaining_budget(), Some(1030));
    }

    #[tokio::test]
    async fn test_huge_completion_limit_is_refused_by_budget() {
        let config = RuntimeConfig::from_yaml(
            "llm:\n  max_tokens: 4294967295\nbudget:\n  max_tokens: 5000\n",
        )
        .unwrap();
        let provider = ScriptedProvider::new(vec![Ok("rewritten text")]);
        let llm = collaborator(Arc::clone(&provider), config);

        let err = llm.rewrite("text to rewrite", "sig", &[]).await.unwrap_err();
        assert_eq!(err, ToneError::Rewrite("token budget exhausted".to_string()));
        assert_eq!(provider.calls(), 0);
    }

    #[tokio::test]
    async fn test_huge_completion_limit_without_budget() {
        let config = RuntimeConfig::from_yaml("llm:\n  max_tokens: 4294967295\n").unwrap();
        let provider = ScriptedProvider::new(vec![Ok("rewritten text")]);
        let llm = collaborator(Arc::clone(&provider), config);

        assert_eq!(llm.rewrite("text to rewrite", "sig", &[]).await.unwrap(), "rewritten text");
        assert_eq!(llm.remaining_budget(), None);
    }

    #[tokio::test]
    async fn test_usage_is_tracked_per_operation() {
        let provider = ScriptedProvider::new(vec![Ok(ANALYSIS_REPLY), Ok("rewritten text"), Ok(EVALUATION_REPLY)]);
        let llm = collaborator(provider, fast_config());

        llm.analyze("text to analyze").await.unwrap();
        llm.rewrite("text to rewrite", "sig", &[]).await.unwrap();
        llm.evaluate("a", "b", "sig").await.unwrap();

        let usage = llm.usage();
        assert_eq!(usage.llm_calls, 3);
        assert_eq!(usage.total_tokens, 360);
        assert_eq!(usage.calls_by_operation.get(&Operation::Evaluate), Some(&1));
        assert!(usage.estimated_cost > 0.0);
    }
}
