//! External Service Interfaces
//!
//! The hosted collaborators the question-answering pipeline talks to:
//! embedding model, vector index, chat model, summarizer and web search.
//! Everything behind these traits is fallible and network bound; callers
//! propagate failures rather than substituting content.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Maximum characters of chunk text stored alongside a vector
pub const METADATA_TEXT_LIMIT: usize = 1000;

#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("{0}")]
    NotConfigured(String),
    #[error("{service} failed ({status}): {body}")]
    Http {
        service: &'static str,
        status: u16,
        body: String,
    },
    #[error("Request error: {0}")]
    Request(String),
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
    #[error("{0}")]
    Failed(String),
}

impl Serialize for ServiceError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl From<reqwest::Error> for ServiceError {
    fn from(e: reqwest::Error) -> Self {
        ServiceError::Request(e.to_string())
    }
}

/// Embedding vector
pub type Embedding = Vec<f32>;

/// Produces fixed-dimension vectors for texts
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Vector length this embedder produces
    fn dimensions(&self) -> usize;

    /// Embed document chunks, one vector per input, in order.
    async fn embed_documents(&self, texts: &[String]) -> Result<Vec<Embedding>, ServiceError>;

    /// Embed a search query.
    async fn embed_query(&self, text: &str) -> Result<Embedding, ServiceError>;
}

/// Metadata stored with each chunk vector
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VectorMetadata {
    pub chunk_id: String,
    pub document_id: String,
    pub document_label: String,
    pub text: String,
    pub chunk_length: usize,
}

impl VectorMetadata {
    pub fn new(chunk_id: &str, document_id: &str, document_label: &str, text: &str) -> Self {
        Self {
            chunk_id: chunk_id.to_string(),
            document_id: document_id.to_string(),
            document_label: document_label.to_string(),
            text: text.chars().take(METADATA_TEXT_LIMIT).collect(),
            chunk_length: text.chars().count(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VectorRecord {
    pub id: String,
    pub values: Embedding,
    pub metadata: VectorMetadata,
}

/// Restricts a vector search
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchFilter {
    pub document_id: Option<String>,
}

impl SearchFilter {
    pub fn document(document_id: &str) -> Self {
        Self {
            document_id: Some(document_id.to_string()),
        }
    }

    pub fn matches(&self, metadata: &VectorMetadata) -> bool {
        self.document_id
            .as_deref()
            .map_or(true, |id| id == metadata.document_id)
    }
}

/// A ranked search hit; higher score is more relevant
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VectorMatch {
    pub id: String,
    pub score: f32,
    pub metadata: VectorMetadata,
}

#[async_trait]
pub trait VectorIndex: Send + Sync {
    async fn upsert(&self, records: Vec<VectorRecord>) -> Result<(), ServiceError>;

    async fn query(
        &self,
        vector: &[f32],
        filter: &SearchFilter,
        top_k: usize,
    ) -> Result<Vec<VectorMatch>, ServiceError>;

    /// Remove every vector belonging to a document.
    async fn delete_document(&self, document_id: &str) -> Result<(), ServiceError>;
}

/// A single-turn chat completion request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    pub message: String,
    pub system_prompt: String,
    pub max_tokens: u32,
    pub temperature: f32,
}

#[async_trait]
pub trait ChatModel: Send + Sync {
    async fn chat(&self, request: ChatRequest) -> Result<String, ServiceError>;
}

/// Condenses a document into one sentence usable as a search query
#[async_trait]
pub trait Summarizer: Send + Sync {
    /// Returns `fallback` when the content yields no summary.
    async fn summarize_one_liner(&self, content: &str, fallback: &str) -> Result<String, ServiceError>;
}

/// A web page related to a document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WebReference {
    pub title: String,
    pub url: String,
    pub snippet: String,
    pub source: Option<String>,
    pub fetched_at: DateTime<Utc>,
    pub score: Option<f64>,
}

#[async_trait]
pub trait WebSearch: Send + Sync {
    async fn search(&self, query: &str, limit: usize) -> Result<Vec<WebReference>, ServiceError>;
}
