//! Application configuration.
//!
//! Built once at startup (the CLI fills it from flags and environment
//! variables) and handed to the components that need it. Library code never
//! reads the process environment.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::documents::chunker::ChunkingConfig;

pub const DEFAULT_TAVILY_ENDPOINT: &str = "https://api.tavily.com/search";

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("chunk_size must be greater than zero")]
    ZeroChunkSize,
    #[error("overlap ({overlap}) must be smaller than chunk_size ({chunk_size})")]
    OverlapTooLarge { overlap: usize, chunk_size: usize },
    #[error("min_chunk_size ({min}) must not exceed chunk_size ({chunk_size})")]
    MinChunkTooLarge { min: usize, chunk_size: usize },
    #[error("top_k must be at least 1")]
    ZeroTopK,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub chunking: ChunkingConfig,
    pub retrieval: RetrievalConfig,
    pub references: ReferencesConfig,
    pub logging: LoggingConfig,
}

/// Question answering parameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RetrievalConfig {
    /// Chunks placed in a grounded prompt
    pub top_k: usize,
    /// Results returned by a plain search
    pub search_top_k: usize,
    pub max_tokens: u32,
    pub temperature: f32,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: 3,
            search_top_k: 5,
            max_tokens: 500,
            temperature: 0.7,
        }
    }
}

/// Web reference lookup parameters
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ReferencesConfig {
    #[serde(skip_serializing)]
    pub tavily_api_key: Option<String>,
    pub tavily_endpoint: String,
    /// Results per lookup when the request gives no limit
    pub default_limit: usize,
    /// Characters of document content sent to the summarizer
    pub summary_prefix_chars: usize,
    pub request_timeout_secs: u64,
}

impl Default for ReferencesConfig {
    fn default() -> Self {
        Self {
            tavily_api_key: None,
            tavily_endpoint: DEFAULT_TAVILY_ENDPOINT.to_string(),
            default_limit: 5,
            summary_prefix_chars: 4000,
            request_timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter used when `RUST_LOG` is unset
    pub default: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            default: "warn".to_string(),
        }
    }
}

impl AppConfig {
    /// Reject parameters the chunker cannot make sensible progress with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let c = &self.chunking;
        if c.chunk_size == 0 {
            return Err(ConfigError::ZeroChunkSize);
        }
        if c.overlap >= c.chunk_size {
            return Err(ConfigError::OverlapTooLarge {
                overlap: c.overlap,
                chunk_size: c.chunk_size,
            });
        }
        if c.min_chunk_size > c.chunk_size {
            return Err(ConfigError::MinChunkTooLarge {
                min: c.min_chunk_size,
                chunk_size: c.chunk_size,
            });
        }
        if self.retrieval.top_k == 0 || self.retrieval.search_top_k == 0 {
            return Err(ConfigError::ZeroTopK);
        }
        Ok(())
    }
}
