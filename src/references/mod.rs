//! Web References
//!
//! Finds web pages related to an uploaded document. The search query is the
//! caller's own, or a one-sentence summary of the document.

pub mod query;
pub mod summary;
pub mod tavily;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use crate::config::ReferencesConfig;
use crate::services::{ServiceError, Summarizer, WebReference, WebSearch};

pub use query::{derive_query, DerivedQuery};
pub use summary::{ChatSummarizer, LeadSentenceSummarizer};
pub use tavily::TavilyClient;

/// Results returned when neither the caller nor the config gives a limit
pub const DEFAULT_REFERENCE_LIMIT: usize = 5;
/// Upper bound on results per lookup
pub const MAX_REFERENCE_LIMIT: usize = 8;

#[derive(Error, Debug)]
pub enum ReferenceError {
    #[error("Unable to derive a search query for this document. Provide a `query` in the request body.")]
    MissingQueryInput,
    #[error("{0}")]
    Summarizer(ServiceError),
    #[error("{0}")]
    Search(ServiceError),
}

impl Serialize for ReferenceError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

/// What the reference finder needs to know about a document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReferenceSource {
    pub id: String,
    pub title: Option<String>,
    pub file_name: String,
    pub content: String,
}

impl ReferenceSource {
    /// Title, else file name; `None` when both are blank.
    pub fn label(&self) -> Option<&str> {
        self.title
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .or_else(|| Some(self.file_name.trim()).filter(|f| !f.is_empty()))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReferenceRequest {
    pub query: Option<String>,
    pub limit: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReferencesResponse {
    pub document_id: String,
    pub query_used: String,
    pub query_summary: String,
    pub summary_used: bool,
    pub references: Vec<WebReference>,
}

/// Clamp a requested result count to `1..=8`; absent means `default`,
/// itself clamped to the same range.
pub fn clamp_limit(limit: Option<i64>, default: usize) -> usize {
    match limit {
        Some(n) => n.clamp(1, MAX_REFERENCE_LIMIT as i64) as usize,
        None => default.clamp(1, MAX_REFERENCE_LIMIT),
    }
}

/// Derive a query for `source` and run it against the web search.
pub async fn find_references(
    summarizer: &dyn Summarizer,
    search: &dyn WebSearch,
    source: &ReferenceSource,
    request: &ReferenceRequest,
    config: &ReferencesConfig,
) -> Result<ReferencesResponse, ReferenceError> {
    let limit = clamp_limit(request.limit, config.default_limit);
    let derived = derive_query(
        summarizer,
        source,
        request.query.as_deref(),
        config.summary_prefix_chars,
    )
    .await?;

    let references = search
        .search(&derived.query, limit)
        .await
        .map_err(ReferenceError::Search)?;

    info!(
        document_id = %source.id,
        summary_used = derived.summary_used,
        results = references.len(),
        "Found web references"
    );

    Ok(ReferencesResponse {
        document_id: source.id.clone(),
        query_summary: derived.query.clone(),
        query_used: derived.query,
        summary_used: derived.summary_used,
        references,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{StaticSearch, StaticSummarizer};

    fn source() -> ReferenceSource {
        ReferenceSource {
            id: "doc42".to_string(),
            title: Some("Garden Notes".to_string()),
            file_name: "garden.txt".to_string(),
            content: "Tomatoes need full sun and regular watering.".to_string(),
        }
    }

    #[test]
    fn test_clamp_limit() {
        assert_eq!(clamp_limit(None, DEFAULT_REFERENCE_LIMIT), 5);
        assert_eq!(clamp_limit(None, 2), 2);
        assert_eq!(clamp_limit(None, 0), 1);
        assert_eq!(clamp_limit(None, 50), 8);
        assert_eq!(clamp_limit(Some(0), 5), 1);
        assert_eq!(clamp_limit(Some(-3), 5), 1);
        assert_eq!(clamp_limit(Some(3), 5), 3);
        assert_eq!(clamp_limit(Some(100), 5), 8);
    }

    #[test]
    fn test_source_label() {
        let mut doc = source();
        assert_eq!(doc.label(), Some("Garden Notes"));
        doc.title = Some(" ".to_string());
        assert_eq!(doc.label(), Some("garden.txt"));
        doc.title = None;
        doc.file_name = String::new();
        assert_eq!(doc.label(), None);
    }

    #[tokio::test]
    async fn test_find_references_with_summary() {
        let summarizer = StaticSummarizer::returning("Growing tomatoes at home.");
        let search = StaticSearch::default();

        let response = find_references(&summarizer, &search, &source(), &ReferenceRequest::default(), &ReferencesConfig::default())
            .await
            .unwrap();

        assert_eq!(response.document_id, "doc42");
        assert_eq!(response.query_used, "Growing tomatoes at home.");
        assert_eq!(response.query_summary, response.query_used);
        assert!(response.summary_used);
        assert_eq!(response.references.len(), 5);
        assert_eq!(search.queries(), vec![("Growing tomatoes at home.".to_string(), 5)]);
    }

    #[tokio::test]
    async fn test_find_references_with_explicit_query() {
        let summarizer = StaticSummarizer::returning("unused");
        let search = StaticSearch::default();
        let request = ReferenceRequest {
            query: Some("heirloom tomato varieties".to_string()),
            limit: Some(20),
        };

        let response = find_references(&summarizer, &search, &source(), &request, &ReferencesConfig::default()).await.unwrap();

        assert!(!response.summary_used);
        assert_eq!(response.references.len(), 8);
        assert!(summarizer.calls().is_empty());
    }

    #[tokio::test]
    async fn test_configured_default_limit() {
        let summarizer = StaticSummarizer::returning("Growing tomatoes at home.");
        let search = StaticSearch::default();
        let config = ReferencesConfig {
            default_limit: 3,
            ..ReferencesConfig::default()
        };

        let response = find_references(&summarizer, &search, &source(), &ReferenceRequest::default(), &config)
            .await
            .unwrap();

        assert_eq!(response.references.len(), 3);
        assert_eq!(search.queries(), vec![("Growing tomatoes at home.".to_string(), 3)]);
    }

    #[tokio::test]
    async fn test_summary_prefix_from_config() {
        let summarizer = StaticSummarizer::returning("summary");
        let search = StaticSearch::default();
        let config = ReferencesConfig {
            summary_prefix_chars: 8,
            ..ReferencesConfig::default()
        };

        find_references(&summarizer, &search, &source(), &ReferenceRequest::default(), &config)
            .await
            .unwrap();

        assert_eq!(summarizer.calls()[0].0, "Tomatoes");
    }

    #[tokio::test]
    async fn test_summary_failure_skips_search() {
        let summarizer = StaticSummarizer::failing("model overloaded");
        let search = StaticSearch::default();

        let err = find_references(&summarizer, &search, &source(), &ReferenceRequest::default(), &ReferencesConfig::default())
            .await
            .unwrap_err();

        assert!(matches!(err, ReferenceError::Summarizer(_)));
        // Surfaced to the caller exactly as the summarizer reported it
        assert_eq!(err.to_string(), "model overloaded");
        assert!(search.queries().is_empty());
    }

    #[tokio::test]
    async fn test_search_failure_propagates() {
        struct DownSearch;
        #[async_trait::async_trait]
        impl WebSearch for DownSearch {
            async fn search(&self, _: &str, _: usize) -> Result<Vec<WebReference>, ServiceError> {
                Err(ServiceError::NotConfigured("TAVILY_API_KEY is not configured.".to_string()))
            }
        }

        let summarizer = StaticSummarizer::returning("unused");
        let request = ReferenceRequest {
            query: Some("q".to_string()),
            limit: None,
        };
        let err = find_references(&summarizer, &DownSearch, &source(), &request, &ReferencesConfig::default())
            .await
            .unwrap_err();
        assert!(matches!(err, ReferenceError::Search(ServiceError::NotConfigured(_))));
        assert_eq!(err.to_string(), "TAVILY_API_KEY is not configured.");
    }
}
