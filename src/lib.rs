// Ask My Doc Library
// Document chunking, grounded prompt assembly and web reference lookup,
// used by the askdocs CLI.

pub mod config;
pub mod context;
pub mod documents;
pub mod logging;
pub mod references;
pub mod services;

#[cfg(test)]
mod test_utils;

// Re-export commonly used types for the CLI
pub use config::{AppConfig, ConfigError, LoggingConfig, ReferencesConfig, RetrievalConfig};
pub use context::{build_grounded_prompt, count_tokens, GroundedPrompt, RetrievedChunk};
pub use documents::{
    chunk_text, prepare_upload, preview_chunking, Answer, ChunkerError, ChunkingConfig,
    DocumentLibrary, DocumentSummary, ExtractedDocument, HashingEmbedder, InMemoryIndex,
    IngestReport, PlainTextExtractor, RetrieverError, TextChunk, UploadedFile,
};
pub use references::{
    clamp_limit, derive_query, find_references, DerivedQuery, LeadSentenceSummarizer,
    ReferenceError, ReferenceRequest, ReferenceSource, ReferencesResponse, TavilyClient,
};
pub use services::{
    ChatModel, ChatRequest, Embedder, ServiceError, Summarizer, VectorIndex, WebReference,
    WebSearch,
};
