//! One-line document summarizers used to build reference search queries.

use async_trait::async_trait;

use super::query::truncate_chars;
use crate::services::{ChatModel, ChatRequest, ServiceError, Summarizer};

/// Characters of content included in the summarization prompt
pub const SUMMARY_PROMPT_CHARS: usize = 4000;
/// Word cap for extractive summaries
const MAX_SUMMARY_WORDS: usize = 25;

const SUMMARY_SYSTEM_PROMPT: &str = "You distill long documents into a single short descriptive \
sentence that can be used as a search query.";

/// Summarizes through a chat model
pub struct ChatSummarizer<C> {
    chat: C,
}

impl<C: ChatModel> ChatSummarizer<C> {
    pub fn new(chat: C) -> Self {
        Self { chat }
    }

    fn prompt(content: &str) -> String {
        format!(
            "Summarize the following document in a single short sentence (max 25 words) that \
highlights what the document is about. Avoid marketing language and just state the subject matter.

Document content:
{}",
            truncate_chars(content, SUMMARY_PROMPT_CHARS)
        )
    }
}

#[async_trait]
impl<C: ChatModel> Summarizer for ChatSummarizer<C> {
    async fn summarize_one_liner(&self, content: &str, fallback: &str) -> Result<String, ServiceError> {
        let content = content.trim();
        if content.is_empty() {
            return Ok(fallback.to_string());
        }

        let reply = self
            .chat
            .chat(ChatRequest {
                message: Self::prompt(content),
                system_prompt: SUMMARY_SYSTEM_PROMPT.to_string(),
                max_tokens: 80,
                temperature: 0.3,
            })
            .await?;

        Ok(match reply.trim() {
            "" => fallback.to_string(),
            summary => summary.to_string(),
        })
    }
}

/// Offline summarizer: the document's first sentence, capped at 25 words
#[derive(Debug, Clone, Copy, Default)]
pub struct LeadSentenceSummarizer;

impl LeadSentenceSummarizer {
    pub fn lead_sentence(content: &str) -> Option<String> {
        let content = content.trim_start();
        let end = content
            .char_indices()
            .find(|&(i, c)| {
                c == '\n'
                    || (matches!(c, '.' | '!' | '?')
                        && content[i + c.len_utf8()..].chars().next().map_or(true, char::is_whitespace))
            })
            .map(|(i, c)| if c == '\n' { i } else { i + c.len_utf8() })
            .unwrap_or(content.len());

        let words: Vec<&str> = content[..end].split_whitespace().take(MAX_SUMMARY_WORDS).collect();
        if words.is_empty() {
            None
        } else {
            Some(words.join(" "))
        }
    }
}

#[async_trait]
impl Summarizer for LeadSentenceSummarizer {
    async fn summarize_one_liner(&self, content: &str, fallback: &str) -> Result<String, ServiceError> {
        Ok(Self::lead_sentence(content).unwrap_or_else(|| fallback.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::RecordingChat;

    #[tokio::test]
    async fn test_chat_summarizer_request() {
        let summarizer = ChatSummarizer::new(RecordingChat::replying("  A guide to sourdough baking.\n"));
        let content = format!("Sourdough needs a starter. {}", "x".repeat(5000));

        let summary = summarizer.summarize_one_liner(&content, "bread.txt").await.unwrap();
        assert_eq!(summary, "A guide to sourdough baking.");

        let request = summarizer.chat.last_request().unwrap();
        assert_eq!(request.max_tokens, 80);
        assert!((request.temperature - 0.3).abs() < f32::EPSILON);
        assert_eq!(request.system_prompt, SUMMARY_SYSTEM_PROMPT);
        assert!(request.message.contains("max 25 words"));
        assert!(request.message.contains("Document content:\nSourdough needs a starter."));
        let included = request.message.split("Document content:\n").nth(1).unwrap();
        assert_eq!(included.chars().count(), SUMMARY_PROMPT_CHARS);
    }

    #[tokio::test]
    async fn test_chat_summarizer_empty_content_skips_chat() {
        let summarizer = ChatSummarizer::new(RecordingChat::replying("unused"));
        let summary = summarizer.summarize_one_liner("   ", "notes.txt").await.unwrap();
        assert_eq!(summary, "notes.txt");
        assert_eq!(summarizer.chat.request_count(), 0);
    }

    #[tokio::test]
    async fn test_chat_summarizer_blank_reply_uses_fallback() {
        let summarizer = ChatSummarizer::new(RecordingChat::replying("  \n"));
        let summary = summarizer.summarize_one_liner("Real content.", "notes.txt").await.unwrap();
        assert_eq!(summary, "notes.txt");
    }

    #[tokio::test]
    async fn test_chat_summarizer_propagates_errors() {
        let summarizer = ChatSummarizer::new(RecordingChat::failing("upstream 500"));
        let err = summarizer.summarize_one_liner("Real content.", "notes.txt").await.unwrap_err();
        assert_eq!(err.to_string(), "upstream 500");
    }

    #[test]
    fn test_lead_sentence() {
        assert_eq!(
            LeadSentenceSummarizer::lead_sentence("  Rust 1.75 adds async traits. More follows."),
            Some("Rust 1.75 adds async traits.".to_string())
        );
        assert_eq!(
            LeadSentenceSummarizer::lead_sentence("Heading line\nBody text."),
            Some("Heading line".to_string())
        );
        assert_eq!(LeadSentenceSummarizer::lead_sentence("   "), None);
    }

    #[test]
    fn test_lead_sentence_word_cap() {
        let long = "word ".repeat(40);
        let lead = LeadSentenceSummarizer::lead_sentence(&long).unwrap();
        assert_eq!(lead.split_whitespace().count(), MAX_SUMMARY_WORDS);
    }

    #[tokio::test]
    async fn test_lead_sentence_summarizer_fallback() {
        let summary = LeadSentenceSummarizer.summarize_one_liner("", "empty.txt").await.unwrap();
        assert_eq!(summary, "empty.txt");
    }
}
