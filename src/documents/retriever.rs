//! Document Retrieval
//!
//! Owns the uploaded documents and their chunks, pushes chunk vectors to the
//! vector index, and answers questions from the best-matching chunks.
//!
//! A document is committed before its chunks are embedded. If embedding or
//! indexing fails afterwards the document stays, and the ingest report says
//! how far it got; the store and the index are separate failure domains.

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, error, info, warn};
use ulid::Ulid;

use super::chunker::{chunk_text, ChunkingConfig, TextChunk};
use super::upload::ExtractedDocument;
use crate::config::RetrievalConfig;
use crate::context::prompt::{build_grounded_prompt, GroundedPrompt, RetrievedChunk};
use crate::references::ReferenceSource;
use crate::services::{
    ChatModel, ChatRequest, Embedder, SearchFilter, ServiceError, VectorIndex, VectorMetadata,
    VectorRecord,
};

/// Vectors sent per upsert call
pub const UPSERT_BATCH_SIZE: usize = 100;

#[derive(Error, Debug)]
pub enum RetrieverError {
    #[error("Document not found: {0}")]
    NotFound(String),
    #[error("Query is required and must be a non-empty string")]
    EmptyQuery,
    #[error(transparent)]
    Service(#[from] ServiceError),
}

impl Serialize for RetrieverError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

/// Stored document with its chunks
#[derive(Debug, Clone)]
struct StoredDocument {
    id: String,
    document: ExtractedDocument,
    chunks: Vec<TextChunk>,
    created_at: DateTime<Utc>,
}

impl StoredDocument {
    fn label(&self) -> &str {
        document_label(&self.document.title, &self.document.file_name)
    }

    fn summary(&self) -> DocumentSummary {
        DocumentSummary {
            id: self.id.clone(),
            title: self.document.title.clone(),
            file_name: self.document.file_name.clone(),
            file_type: self.document.file_type.clone(),
            created_at: self.created_at,
            chunk_count: self.chunks.len(),
        }
    }
}

/// Listing entry for an uploaded document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentSummary {
    pub id: String,
    pub title: String,
    pub file_name: String,
    pub file_type: String,
    pub created_at: DateTime<Utc>,
    pub chunk_count: usize,
}

/// Outcome of adding a document
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestReport {
    pub document: DocumentSummary,
    pub chunk_count: usize,
    pub indexed_chunks: usize,
    /// Set when the document was stored but its vectors were not
    pub embedding_error: Option<String>,
}

impl IngestReport {
    pub fn fully_indexed(&self) -> bool {
        self.embedding_error.is_none() && self.indexed_chunks == self.chunk_count
    }
}

/// A chat reply with the prompt and sources behind it
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Answer {
    pub reply: String,
    pub prompt: GroundedPrompt,
    pub sources: Vec<RetrievedChunk>,
}

/// Title if present, else file name
pub fn document_label<'a>(title: &'a str, file_name: &'a str) -> &'a str {
    match title.trim() {
        "" => file_name,
        t => t,
    }
}

pub fn chunk_id(document_id: &str, index: usize) -> String {
    format!("{}_{}", document_id, index)
}

pub struct DocumentLibrary {
    chunking: ChunkingConfig,
    retrieval: RetrievalConfig,
    embedder: Arc<dyn Embedder>,
    index: Arc<dyn VectorIndex>,
    documents: RwLock<HashMap<String, StoredDocument>>,
}

impl DocumentLibrary {
    pub fn new(
        chunking: ChunkingConfig,
        retrieval: RetrievalConfig,
        embedder: Arc<dyn Embedder>,
        index: Arc<dyn VectorIndex>,
    ) -> Self {
        Self {
            chunking,
            retrieval,
            embedder,
            index,
            documents: RwLock::new(HashMap::new()),
        }
    }

    /// Chunk, store and index a document.
    pub async fn add_document(&self, document: ExtractedDocument) -> Result<IngestReport, RetrieverError> {
        let id = Ulid::new().to_string();
        let chunks = chunk_text(&document.content, &self.chunking);

        let stored = StoredDocument {
            id: id.clone(),
            document,
            chunks,
            created_at: Utc::now(),
        };
        let summary = stored.summary();
        let label = stored.label().to_string();
        let texts: Vec<String> = stored.chunks.iter().map(|c| c.text.clone()).collect();

        self.documents.write().insert(id.clone(), stored);
        info!(document_id = %id, chunks = texts.len(), "Stored document");

        let chunk_count = texts.len();
        let (indexed_chunks, embedding_error) = match self.index_chunks(&id, &label, &texts).await {
            Ok(()) => (chunk_count, None),
            Err((indexed, e)) => {
                error!(document_id = %id, indexed = indexed, error = %e, "Embedding failed after document was stored");
                (indexed, Some(e.to_string()))
            }
        };

        Ok(IngestReport {
            document: summary,
            chunk_count,
            indexed_chunks,
            embedding_error,
        })
    }

    /// Embed and upsert chunk texts; on failure reports how many made it in.
    async fn index_chunks(
        &self,
        document_id: &str,
        label: &str,
        texts: &[String],
    ) -> Result<(), (usize, ServiceError)> {
        if texts.is_empty() {
            return Ok(());
        }

        let vectors = self.embedder.embed_documents(texts).await.map_err(|e| (0, e))?;
        if vectors.len() != texts.len() {
            return Err((
                0,
                ServiceError::InvalidResponse(format!(
                    "expected {} embeddings, got {}",
                    texts.len(),
                    vectors.len()
                )),
            ));
        }

        let records: Vec<VectorRecord> = texts
            .iter()
            .zip(vectors)
            .enumerate()
            .map(|(i, (text, values))| {
                let id = chunk_id(document_id, i);
                VectorRecord {
                    metadata: VectorMetadata::new(&id, document_id, label, text),
                    id,
                    values,
                }
            })
            .collect();

        let mut indexed = 0usize;
        for batch in records.chunks(UPSERT_BATCH_SIZE) {
            self.index.upsert(batch.to_vec()).await.map_err(|e| (indexed, e))?;
            indexed += batch.len();
        }
        debug!(document_id = %document_id, indexed = indexed, "Indexed chunks");
        Ok(())
    }

    /// Documents, newest first
    pub fn list_documents(&self) -> Vec<DocumentSummary> {
        let mut docs: Vec<DocumentSummary> = self.documents.read().values().map(|d| d.summary()).collect();
        docs.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| b.id.cmp(&a.id)));
        docs
    }

    pub fn get_chunks(&self, document_id: &str) -> Result<Vec<TextChunk>, RetrieverError> {
        self.documents
            .read()
            .get(document_id)
            .map(|d| d.chunks.clone())
            .ok_or_else(|| RetrieverError::NotFound(document_id.to_string()))
    }

    /// The fields the reference finder needs from a document
    pub fn reference_source(&self, document_id: &str) -> Result<ReferenceSource, RetrieverError> {
        self.documents
            .read()
            .get(document_id)
            .map(|d| ReferenceSource {
                id: d.id.clone(),
                title: Some(d.document.title.clone()),
                file_name: d.document.file_name.clone(),
                content: d.document.content.clone(),
            })
            .ok_or_else(|| RetrieverError::NotFound(document_id.to_string()))
    }

    /// Delete a document's vectors, then the document.
    pub async fn remove_document(&self, document_id: &str) -> Result<(), RetrieverError> {
        if !self.documents.read().contains_key(document_id) {
            return Err(RetrieverError::NotFound(document_id.to_string()));
        }

        if let Err(e) = self.index.delete_document(document_id).await {
            warn!(document_id = %document_id, error = %e, "Failed to delete document vectors");
            return Err(e.into());
        }

        self.documents.write().remove(document_id);
        info!(document_id = %document_id, "Removed document");
        Ok(())
    }

    /// Semantic search over chunks, best first.
    pub async fn search(
        &self,
        query: &str,
        top_k: usize,
        document_id: Option<&str>,
    ) -> Result<Vec<RetrievedChunk>, RetrieverError> {
        let query = query.trim();
        if query.is_empty() {
            return Err(RetrieverError::EmptyQuery);
        }

        let vector = self.embedder.embed_query(query).await?;
        let filter = SearchFilter {
            document_id: document_id.map(str::to_string),
        };
        let matches = self.index.query(&vector, &filter, top_k).await?;

        let documents = self.documents.read();
        let mut results: Vec<RetrievedChunk> = matches
            .into_iter()
            .map(|m| {
                // Prefer the stored chunk text; index metadata may be truncated
                let stored = documents.get(&m.metadata.document_id);
                let text = stored
                    .and_then(|d| {
                        let idx = m.metadata.chunk_id.rsplit('_').next()?.parse::<usize>().ok()?;
                        d.chunks.get(idx).map(|c| c.text.clone())
                    })
                    .unwrap_or_else(|| m.metadata.text.clone());
                let document_label = stored
                    .map(|d| d.label().to_string())
                    .unwrap_or_else(|| m.metadata.document_label.clone());
                RetrievedChunk {
                    text,
                    document_label,
                    score: m.score,
                }
            })
            .collect();

        results.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        debug!(query = %query, results = results.len(), "Search complete");
        Ok(results)
    }

    /// Retrieve context for `question` and build the grounded prompt.
    pub async fn grounded_prompt(
        &self,
        question: &str,
        document_id: Option<&str>,
    ) -> Result<(GroundedPrompt, Vec<RetrievedChunk>), RetrieverError> {
        let sources = self.search(question, self.retrieval.top_k, document_id).await?;
        Ok((build_grounded_prompt(&sources), sources))
    }

    /// Answer a question from the library's documents.
    pub async fn ask(
        &self,
        chat: &dyn ChatModel,
        question: &str,
        document_id: Option<&str>,
    ) -> Result<Answer, RetrieverError> {
        let (prompt, sources) = self.grounded_prompt(question, document_id).await?;

        let reply = chat
            .chat(ChatRequest {
                message: question.trim().to_string(),
                system_prompt: prompt.text.clone(),
                max_tokens: self.retrieval.max_tokens,
                temperature: self.retrieval.temperature,
            })
            .await?;

        Ok(Answer { reply, prompt, sources })
    }
}
