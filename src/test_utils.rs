//! In-memory fakes for the external service traits.

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;

use crate::services::{
    ChatModel, ChatRequest, Embedder, Embedding, SearchFilter, ServiceError, Summarizer,
    VectorIndex, VectorMatch, VectorRecord, WebReference, WebSearch,
};

pub struct FailingEmbedder;

#[async_trait]
impl Embedder for FailingEmbedder {
    fn dimensions(&self) -> usize {
        8
    }

    async fn embed_documents(&self, _texts: &[String]) -> Result<Vec<Embedding>, ServiceError> {
        Err(ServiceError::Failed("embedding service down".to_string()))
    }

    async fn embed_query(&self, _text: &str) -> Result<Embedding, ServiceError> {
        Err(ServiceError::Failed("embedding service down".to_string()))
    }
}

pub struct FailingIndex;

#[async_trait]
impl VectorIndex for FailingIndex {
    async fn upsert(&self, _records: Vec<VectorRecord>) -> Result<(), ServiceError> {
        Err(ServiceError::Failed("index unavailable".to_string()))
    }

    async fn query(
        &self,
        _vector: &[f32],
        _filter: &SearchFilter,
        _top_k: usize,
    ) -> Result<Vec<VectorMatch>, ServiceError> {
        Err(ServiceError::Failed("index unavailable".to_string()))
    }

    async fn delete_document(&self, _document_id: &str) -> Result<(), ServiceError> {
        Err(ServiceError::Failed("index unavailable".to_string()))
    }
}

/// Chat model that records requests and returns a fixed reply or error
pub struct RecordingChat {
    reply: Result<String, String>,
    requests: Mutex<Vec<ChatRequest>>,
}

impl RecordingChat {
    pub fn replying(reply: &str) -> Self {
        Self {
            reply: Ok(reply.to_string()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(message: &str) -> Self {
        Self {
            reply: Err(message.to_string()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn last_request(&self) -> Option<ChatRequest> {
        self.requests.lock().last().cloned()
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().len()
    }
}

#[async_trait]
impl ChatModel for RecordingChat {
    async fn chat(&self, request: ChatRequest) -> Result<String, ServiceError> {
        self.requests.lock().push(request);
        self.reply.clone().map_err(ServiceError::Failed)
    }
}

/// Summarizer returning a canned sentence, or failing
pub struct StaticSummarizer {
    summary: Result<String, String>,
    calls: Mutex<Vec<(String, String)>>,
}

impl StaticSummarizer {
    pub fn returning(summary: &str) -> Self {
        Self {
            summary: Ok(summary.to_string()),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(message: &str) -> Self {
        Self {
            summary: Err(message.to_string()),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// `(content, fallback)` pairs received
    pub fn calls(&self) -> Vec<(String, String)> {
        self.calls.lock().clone()
    }
}

#[async_trait]
impl Summarizer for StaticSummarizer {
    async fn summarize_one_liner(&self, content: &str, fallback: &str) -> Result<String, ServiceError> {
        self.calls.lock().push((content.to_string(), fallback.to_string()));
        self.summary.clone().map_err(ServiceError::Failed)
    }
}

/// Web search returning `limit` generated references
#[derive(Default)]
pub struct StaticSearch {
    queries: Mutex<Vec<(String, usize)>>,
}

impl StaticSearch {
    pub fn queries(&self) -> Vec<(String, usize)> {
        self.queries.lock().clone()
    }
}

#[async_trait]
impl WebSearch for StaticSearch {
    async fn search(&self, query: &str, limit: usize) -> Result<Vec<WebReference>, ServiceError> {
        self.queries.lock().push((query.to_string(), limit));
        let fetched_at = Utc::now();
        Ok((0..limit)
            .map(|i| WebReference {
                title: format!("Result {i}"),
                url: format!("https://example.com/{i}"),
                snippet: format!("About {query}"),
                source: Some("example.com".to_string()),
                fetched_at,
                score: None,
            })
            .collect())
    }
}
