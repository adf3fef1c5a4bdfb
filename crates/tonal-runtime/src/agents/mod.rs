//! Model-backed implementation of the collaborator seam.
//!
//! The workflow never talks to a model directly; it goes through
//! [`ToneCollaborator`](crate::ToneCollaborator). This module provides the
//! implementation that prompts a model and parses its replies strictly.

mod llm;
pub mod parse;

pub use llm::LlmToneCollaborator;
pub use parse::ParseError;
