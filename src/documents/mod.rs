//! Document Management Module
//!
//! Handles upload intake, chunking, embedding, indexing and retrieval for
//! uploaded documents.

pub mod chunker;
pub mod embeddings;
pub mod index;
pub mod retriever;
pub mod upload;

// Re-export key public types
pub use chunker::{chunk_text, preview_chunking, ChunkingConfig, ChunkingPreview, TextChunk};
pub use embeddings::{cosine_similarity, HashingEmbedder};
pub use index::InMemoryIndex;
pub use retriever::{Answer, DocumentLibrary, DocumentSummary, IngestReport, RetrieverError};
pub use upload::{
    prepare_upload, ChunkerError, ExtractedDocument, FileKind, PlainTextExtractor, TextExtractor,
    UploadedFile,
};
