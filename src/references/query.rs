//! Search query derivation for web references.

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{ReferenceError, ReferenceSource};
use crate::services::Summarizer;

/// The query to run and where it came from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DerivedQuery {
    pub query: String,
    /// True when the query is a summary of the document
    pub summary_used: bool,
}

/// Pick the search query for a document.
///
/// A non-blank `explicit_query` is used as given (trimmed). Otherwise the
/// document's content, cut to `prefix_chars` characters, is summarized to one
/// sentence with the document label as the summarizer's fallback. Content
/// that is only whitespace still goes to the summarizer, which answers with
/// the label. Summarizer failures propagate.
pub async fn derive_query(
    summarizer: &dyn Summarizer,
    source: &ReferenceSource,
    explicit_query: Option<&str>,
    prefix_chars: usize,
) -> Result<DerivedQuery, ReferenceError> {
    if let Some(query) = explicit_query.map(str::trim).filter(|q| !q.is_empty()) {
        return Ok(DerivedQuery {
            query: query.to_string(),
            summary_used: false,
        });
    }

    let label = source.label().ok_or(ReferenceError::MissingQueryInput)?;
    if source.content.is_empty() {
        return Err(ReferenceError::MissingQueryInput);
    }

    let prefix = truncate_chars(source.content.trim(), prefix_chars);
    debug!(document_id = %source.id, chars = prefix.chars().count(), "Summarizing document for query");

    let summary = summarizer
        .summarize_one_liner(prefix, label)
        .await
        .map_err(ReferenceError::Summarizer)?;

    Ok(DerivedQuery {
        query: summary.trim().to_string(),
        summary_used: true,
    })
}

/// Longest prefix of `text` with at most `max_chars` characters
pub(crate) fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::references::LeadSentenceSummarizer;
    use crate::test_utils::StaticSummarizer;

    fn source(title: Option<&str>, file_name: &str, content: &str) -> ReferenceSource {
        ReferenceSource {
            id: "doc1".to_string(),
            title: title.map(str::to_string),
            file_name: file_name.to_string(),
            content: content.to_string(),
        }
    }

    #[tokio::test]
    async fn test_explicit_query_used_verbatim() {
        let summarizer = StaticSummarizer::returning("unused");
        let doc = source(Some("Report"), "report.txt", "content");

        let derived = derive_query(&summarizer, &doc, Some("  rust async runtimes "), 4000).await.unwrap();
        assert_eq!(derived.query, "rust async runtimes");
        assert!(!derived.summary_used);
        assert!(summarizer.calls().is_empty());
    }

    #[tokio::test]
    async fn test_blank_explicit_query_falls_back_to_summary() {
        let summarizer = StaticSummarizer::returning(" A report on quarterly revenue. ");
        let doc = source(Some("Q3 Report"), "q3.txt", "Revenue grew in every region.");

        let derived = derive_query(&summarizer, &doc, Some("   "), 4000).await.unwrap();
        assert_eq!(derived.query, "A report on quarterly revenue.");
        assert!(derived.summary_used);
        assert_eq!(
            summarizer.calls(),
            vec![("Revenue grew in every region.".to_string(), "Q3 Report".to_string())]
        );
    }

    #[tokio::test]
    async fn test_missing_content_and_label() {
        let summarizer = StaticSummarizer::returning("unused");
        let doc = source(None, "", "");

        let err = derive_query(&summarizer, &doc, Some(""), 4000).await.unwrap_err();
        assert!(matches!(err, ReferenceError::MissingQueryInput));
        assert!(err.to_string().contains("Provide a `query`"));
    }

    #[tokio::test]
    async fn test_empty_content_with_label() {
        let summarizer = StaticSummarizer::returning("unused");
        let doc = source(Some("Title"), "t.txt", "");
        let err = derive_query(&summarizer, &doc, None, 4000).await.unwrap_err();
        assert!(matches!(err, ReferenceError::MissingQueryInput));
        assert!(summarizer.calls().is_empty());
    }

    #[tokio::test]
    async fn test_whitespace_content_uses_label() {
        let doc = source(Some("Title"), "t.txt", "   \n");
        let derived = derive_query(&LeadSentenceSummarizer, &doc, None, 4000).await.unwrap();
        assert_eq!(derived.query, "Title");
        assert!(derived.summary_used);
    }

    #[tokio::test]
    async fn test_file_name_is_fallback_label() {
        let summarizer = StaticSummarizer::returning("summary");
        let doc = source(Some("  "), "notes.md", "Some content.");
        derive_query(&summarizer, &doc, None, 4000).await.unwrap();
        assert_eq!(summarizer.calls()[0].1, "notes.md");
    }

    #[tokio::test]
    async fn test_content_truncated_to_prefix() {
        let summarizer = StaticSummarizer::returning("summary");
        let doc = source(Some("Long"), "long.txt", &"ü".repeat(5000));
        derive_query(&summarizer, &doc, None, 4000).await.unwrap();
        assert_eq!(summarizer.calls()[0].0.chars().count(), 4000);
    }

    #[tokio::test]
    async fn test_summarizer_failure_propagates() {
        let summarizer = StaticSummarizer::failing("chat API error (429)");
        let doc = source(Some("Title"), "t.txt", "Content here.");

        let err = derive_query(&summarizer, &doc, None, 4000).await.unwrap_err();
        assert!(matches!(err, ReferenceError::Summarizer(_)));
        assert!(err.to_string().contains("chat API error (429)"));
    }

    #[test]
    fn test_truncate_chars() {
        assert_eq!(truncate_chars("héllo", 2), "hé");
        assert_eq!(truncate_chars("hi", 10), "hi");
        assert_eq!(truncate_chars("abc", 0), "");
    }
}
