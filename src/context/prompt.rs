//! Grounded prompt assembly.
//!
//! Turns the chunks a vector search returned into the system prompt handed
//! to the chat model. Input order is kept as given; nothing is re-ranked,
//! deduplicated or truncated here.

use serde::{Deserialize, Serialize};

/// Line placed between consecutive excerpts
pub const EXCERPT_DELIMITER: &str = "\n\n---\n\n";

/// System prompt used when the search found nothing relevant
pub const NO_CONTEXT_PROMPT: &str = "You are a helpful AI assistant for a document Q&A system. \
No relevant content was found in the user's documents for this question. \
Answer as a general assistant if you can, and make it clear that your answer is not based on their documents. \
Suggest that the user upload more documents or rephrase the question.";

const GROUNDED_PREAMBLE: &str = "You are a helpful AI assistant for a document Q&A system. \
Answer the user's question using the excerpts from their documents below.

Guidelines:
- Base your answer primarily on the provided context.
- If the context does not contain the answer, say so explicitly.
- Keep the answer concise.
- When helpful, mention which document a fact came from.

Context:
";

/// A retrieved chunk with its source label and similarity score
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RetrievedChunk {
    pub text: String,
    pub document_label: String,
    pub score: f32,
}

/// System prompt that grounds a chat answer in document excerpts
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroundedPrompt {
    pub text: String,
    /// Number of excerpts embedded in the prompt (0 for the fallback)
    pub excerpt_count: usize,
}

impl GroundedPrompt {
    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn is_fallback(&self) -> bool {
        self.excerpt_count == 0
    }
}

/// Build the system prompt for a question from its retrieved chunks.
pub fn build_grounded_prompt(chunks: &[RetrievedChunk]) -> GroundedPrompt {
    if chunks.is_empty() {
        return GroundedPrompt {
            text: NO_CONTEXT_PROMPT.to_string(),
            excerpt_count: 0,
        };
    }

    let context = chunks
        .iter()
        .map(|c| format!("[Document: {}]\n{}", c.document_label, c.text))
        .collect::<Vec<_>>()
        .join(EXCERPT_DELIMITER);

    GroundedPrompt {
        text: format!("{GROUNDED_PREAMBLE}{context}"),
        excerpt_count: chunks.len(),
    }
}
