//! # tonal-core
//!
//! Data model for brand tone-of-voice workflows.
//!
//! This crate holds the records the workflow produces and the rules it
//! enforces on its inputs:
//! - **Brand**: identity under which signatures and evaluations are grouped
//! - **Signature**: a brand's opaque tone profile, at most one per brand
//! - **Evaluation**: an append-only score record for a rewrite
//! - **ToneError**: the failure taxonomy, each kind with a stable code
//!
//! It performs no I/O and never calls a language model. The stores, the
//! cache and the orchestrated workflow live in `tonal-runtime`.
//!
//! ## Example
//!
//! ```rust
//! use tonal_core::{Signature, TextRules, ToneError, ErrorCode};
//!
//! let sig = Signature::new("acme", "tone: formal");
//! assert_eq!(sig.version, "1.0");
//!
//! let err: ToneError = TextRules::default().check_text("text", "").unwrap_err();
//! assert_eq!(err.code(), ErrorCode::ValidationError);
//! ```

pub mod characteristics;
pub mod error;
pub mod types;
pub mod validation;

// Re-export main types at crate root
pub use characteristics::{
    AddressStyle, EmotionalAppeal, FormalityLevel, LanguageStyle, Tone, ToneCharacteristics,
};
pub use error::{ErrorCode, ErrorReport, ResourceKind, Result, ToneError};
pub use types::{
    Brand, Evaluation, EvaluationResult, Rejection, RejectionStatus, RewriteOutcome, Signature,
    ToneAnalysis, AUTO_BRAND_DESCRIPTION, INITIAL_SIGNATURE_VERSION,
};
pub use validation::{check_id, check_keywords, TextRules, DEFAULT_MIN_TEXT_CHARS};
