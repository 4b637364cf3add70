//! Prompt Context Module
//!
//! Builds the grounded system prompt for questions and counts the tokens it
//! costs.

pub mod prompt;
pub mod tokens;

pub use prompt::{build_grounded_prompt, GroundedPrompt, RetrievedChunk, NO_CONTEXT_PROMPT};
pub use tokens::{count_tokens, count_tokens_batch, estimate_tokens_quick};
