//! `tonal`: analyze, rewrite and score text against a brand tone signature.
//!
//! # Usage
//!
//! ```text
//! tonal analyze release.txt
//! tonal rewrite draft.txt --signature @acme.sig --keep Acme
//! tonal evaluate draft.txt rewritten.txt --signature @acme.sig --brand acme
//! tonal run --brand acme --brand-name "Acme Corp" releases/*.txt
//! tonal check --config tonal.yaml
//! ```
//!
//! Inputs are file paths, or `-` for stdin. The OpenAI key is read from
//! `llm.api_key` in the config file or from `OPENAI_API_KEY`.

use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use tonal_core::{RewriteOutcome, ToneError};
use tonal_runtime::{
    LlmToneCollaborator, OpenAiProvider, Operation, RewriteRequest, RuntimeConfig,
    ToneOrchestrator,
};
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

/// Brand `evaluate` files its records under when none is given.
const DEFAULT_BRAND: &str = "cli";

#[derive(Parser, Debug)]
#[command(name = "tonal", version, about = "Brand tone-of-voice analysis and rewriting")]
struct Cli {
    /// Path to a YAML config file
    #[arg(short, long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    /// Print results and errors as JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Derive a tone signature from a text
    Analyze {
        /// Text file, or `-` for stdin
        input: PathBuf,
    },

    /// Rewrite a text to match a signature
    Rewrite {
        /// Text file, or `-` for stdin
        input: PathBuf,

        /// Target signature, or `@path` to read it from a file
        #[arg(long)]
        signature: String,

        /// Keyword to keep verbatim (repeatable)
        #[arg(long = "keep", value_name = "KEYWORD")]
        keep: Vec<String>,
    },

    /// Score a rewrite against a signature
    Evaluate {
        original: PathBuf,

        rewritten: PathBuf,

        /// Target signature, or `@path` to read it from a file
        #[arg(long)]
        signature: String,

        #[arg(long, default_value = DEFAULT_BRAND)]
        brand: String,
    },

    /// Rewrite and score each file in one brand's voice
    ///
    /// The first file seeds the brand's signature unless the brand already
    /// has one; the rest reuse it.
    Run {
        #[arg(required = true)]
        inputs: Vec<PathBuf>,

        /// Brand id; a new brand is created when omitted
        #[arg(long)]
        brand: Option<String>,

        /// Display name for a newly created brand
        #[arg(long)]
        brand_name: Option<String>,

        /// Use this signature instead of analyzing the first file
        #[arg(long)]
        signature: Option<String>,

        #[arg(long = "keep", value_name = "KEYWORD")]
        keep: Vec<String>,
    },

    /// Validate the configuration and check the provider
    Check,
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_env_filter(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .from_env_lossy(),
        )
        .init();

    let cli = Cli::parse();
    let json = cli.json;

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            match e.downcast_ref::<ToneError>() {
                Some(tone) if json => {
                    if let Ok(report) = serde_json::to_string_pretty(&tone.report()) {
                        println!("{report}");
                    }
                }
                Some(tone) => eprintln!("error [{}]: {tone}", tone.code()),
                None => eprintln!("error: {e:#}"),
            }
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = load_config(cli.config.as_deref())?;
    let json = cli.json;

    match cli.command {
        Command::Check => check(config, json).await?,
        Command::Analyze { input } => {
            let (collaborator, orchestrator) = build(config)?;
            let analysis = orchestrator.analyze_text(&read_input(&input)?).await?;
            emit(json, &analysis, || analysis.signature.clone())?;
            log_usage(&collaborator, &orchestrator);
        }
        Command::Rewrite {
            input,
            signature,
            keep,
        } => {
            let (collaborator, orchestrator) = build(config)?;
            let rewritten = orchestrator
                .rewrite_text(&read_input(&input)?, &read_signature(&signature)?, &keep)
                .await?;
            emit(json, &serde_json::json!({ "rewritten_text": rewritten }), || {
                rewritten.clone()
            })?;
            log_usage(&collaborator, &orchestrator);
        }
        Command::Evaluate {
            original,
            rewritten,
            signature,
            brand,
        } => {
            let (collaborator, orchestrator) = build(config)?;
            let evaluation = orchestrator
                .evaluate_text(
                    &brand,
                    &read_input(&original)?,
                    &read_input(&rewritten)?,
                    &read_signature(&signature)?,
                )
                .await?;
            emit(json, &evaluation, || {
                format!(
                    "{}\noverall {:.2}  fluency {:.2}  authenticity {:.2}  tone {:.2}  readability {:.2}",
                    evaluation.evaluation_id,
                    evaluation.result.overall_score,
                    evaluation.result.fluency,
                    evaluation.result.authenticity,
                    evaluation.result.tone_alignment,
                    evaluation.result.readability,
                )
            })?;
            log_usage(&collaborator, &orchestrator);
        }
        Command::Run {
            inputs,
            brand,
            brand_name,
            signature,
            keep,
        } => {
            let (collaborator, orchestrator) = build(config)?;
            let mut brand = brand;

            if let Some(signature) = signature {
                let resolved =
                    orchestrator.resolve_brand(brand.as_deref(), brand_name.as_deref())?;
                orchestrator.put_signature(&resolved.brand_id, &read_signature(&signature)?)?;
                brand = Some(resolved.brand_id);
            }

            let mut outcomes: Vec<RewriteOutcome> = Vec::with_capacity(inputs.len());
            for input in &inputs {
                let mut request = RewriteRequest::new(read_input(input)?).preserve(keep.clone());
                request.brand_id = brand.clone();
                request.brand_name = brand_name.clone();

                let outcome = orchestrator
                    .rewrite_and_evaluate(request)
                    .await
                    .with_context(|| format!("processing {}", input.display()))?;
                tracing::info!(
                    input = %input.display(),
                    evaluation_id = %outcome.evaluation_id,
                    overall = outcome.result.overall_score,
                    "Rewrote"
                );

                // Later files reuse the brand, and with it the signature
                if brand.is_none() {
                    brand = Some(outcome.brand.brand_id.clone());
                }
                outcomes.push(outcome);
            }

            emit(json, &outcomes, || {
                outcomes
                    .iter()
                    .zip(&inputs)
                    .map(|(outcome, input)| {
                        format!(
                            "== {} (brand {}, overall {:.2})\n{}\nstrengths: {}\nsuggestions: {}",
                            input.display(),
                            outcome.brand.brand_id,
                            outcome.result.overall_score,
                            outcome.rewritten_text,
                            outcome.result.strengths.join("; "),
                            outcome.result.suggestions.join("; "),
                        )
                    })
                    .collect::<Vec<_>>()
                    .join("\n\n")
            })?;
            log_usage(&collaborator, &orchestrator);
        }
    }
    Ok(())
}

fn build(config: RuntimeConfig) -> Result<(Arc<LlmToneCollaborator>, ToneOrchestrator)> {
    let provider =
        OpenAiProvider::from_config(&config.llm).context("configuring OpenAI provider")?;
    let collaborator = Arc::new(LlmToneCollaborator::new(Arc::new(provider), &config));
    let orchestrator = ToneOrchestrator::builder()
        .collaborator(collaborator.clone())
        .config(config)
        .build()?;
    Ok((collaborator, orchestrator))
}

fn log_usage(collaborator: &LlmToneCollaborator, orchestrator: &ToneOrchestrator) {
    let usage = collaborator.usage();
    tracing::info!(
        calls = usage.llm_calls,
        tokens = usage.total_tokens,
        cost = usage.estimated_cost,
        budget_remaining = ?collaborator.remaining_budget(),
        "Model usage"
    );
    let stats = orchestrator.cache_stats();
    tracing::debug!(
        entries = stats.total_entries,
        hits = stats.hits,
        hit_rate = stats.hit_rate(),
        "Cache"
    );
    for op in Operation::ALL {
        tracing::debug!(operation = %op, state = ?collaborator.circuit_state(op), "Circuit");
    }
}

fn load_config(path: Option<&Path>) -> Result<RuntimeConfig> {
    match path {
        Some(path) => RuntimeConfig::from_yaml_file(path)
            .with_context(|| format!("loading config file {}", path.display())),
        None => Ok(RuntimeConfig::default()),
    }
}

async fn check(config: RuntimeConfig, json: bool) -> Result<()> {
    config.validate()?;

    let (provider, healthy) = match OpenAiProvider::from_config(&config.llm) {
        Ok(provider) => {
            let collaborator = LlmToneCollaborator::new(Arc::new(provider), &config);
            let healthy = collaborator.provider_healthy().await;
            (collaborator.provider_name().to_string(), healthy)
        }
        Err(e) => {
            tracing::warn!(error = %e, "Provider not configured");
            ("openai".to_string(), false)
        }
    };

    if json {
        let out = serde_json::json!({
            "valid": true,
            "provider": provider,
            "provider_healthy": healthy,
            "config": config,
        });
        println!("{}", serde_json::to_string_pretty(&out)?);
    } else {
        print!("{}", serde_yaml::to_string(&config)?);
        println!(
            "# provider {}: {}",
            provider,
            if healthy { "ready" } else { "not ready" }
        );
    }
    Ok(())
}

/// Read a text input; `-` is stdin.
fn read_input(path: &Path) -> Result<String> {
    if path.as_os_str() == "-" {
        let mut text = String::new();
        io::stdin()
            .read_to_string(&mut text)
            .context("reading text from stdin")?;
        return Ok(text);
    }
    fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))
}

/// `@path` reads the signature from a file, anything else is literal.
fn read_signature(arg: &str) -> Result<String> {
    match arg.strip_prefix('@') {
        Some(path) => read_input(Path::new(path)),
        None => Ok(arg.to_string()),
    }
}

fn emit<T: Serialize>(json: bool, value: &T, plain: impl FnOnce() -> String) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(value)?);
    } else {
        println!("{}", plain());
    }
    Ok(())
}
