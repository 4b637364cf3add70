//! Document Chunking
//!
//! Splits extracted document text into overlapping, size-bounded chunks that
//! end at natural language boundaries where possible.
//!
//! Sizes and offsets count characters (Unicode scalar values) in the trimmed
//! text, not bytes.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::context::tokens::count_tokens;

/// Default target maximum chunk size
pub const DEFAULT_CHUNK_SIZE: usize = 1000;
/// Default overlap between consecutive chunks
pub const DEFAULT_OVERLAP: usize = 200;
/// Default minimum size for a chunk to be kept
pub const DEFAULT_MIN_CHUNK_SIZE: usize = 100;

/// How far back from a tentative cut we look for a natural boundary.
const BOUNDARY_LOOKBACK: usize = 200;

/// Length of the text preview shown per chunk.
const PREVIEW_LEN: usize = 100;

/// A contiguous slice of a document's trimmed text
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextChunk {
    /// Trimmed chunk content
    pub text: String,
    /// Start of the window in the trimmed document (inclusive)
    pub start_index: usize,
    /// End of the window in the trimmed document (exclusive)
    pub end_index: usize,
}

/// Controls how text is split
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ChunkingConfig {
    pub chunk_size: usize,
    pub overlap: usize,
    pub min_chunk_size: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            overlap: DEFAULT_OVERLAP,
            min_chunk_size: DEFAULT_MIN_CHUNK_SIZE,
        }
    }
}

/// Summary of how a text would be chunked
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChunkingPreview {
    pub total_chunks: usize,
    pub average_chunk_size: usize,
    pub chunks: Vec<ChunkPreview>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChunkPreview {
    pub preview: String,
    pub size: usize,
    pub tokens: u32,
}

/// Split text into overlapping chunks, preferring sentence, then paragraph,
/// then word boundaries.
///
/// Empty or whitespace-only input yields no chunks. The caller is expected
/// to keep `overlap < chunk_size`; if it does not, the scan still advances by
/// at least one character per iteration and terminates.
pub fn chunk_text(text: &str, config: &ChunkingConfig) -> Vec<TextChunk> {
    let text = text.trim();
    if text.is_empty() {
        return Vec::new();
    }

    // Byte offset of each character position, plus one past the end
    let offsets: Vec<usize> = text
        .char_indices()
        .map(|(idx, _)| idx)
        .chain(std::iter::once(text.len()))
        .collect();
    let len = offsets.len() - 1;
    let mut chunks = Vec::new();
    let mut start = 0usize;

    while start < len {
        let mut end = start.saturating_add(config.chunk_size).min(len);

        if end < len {
            if let Some(boundary) = find_break(text, &offsets, start, end) {
                end = boundary;
            }
        }

        let candidate = text[offsets[start]..offsets[end]].trim();
        if !candidate.is_empty() && candidate.chars().count() >= config.min_chunk_size {
            chunks.push(TextChunk {
                text: candidate.to_string(),
                start_index: start,
                end_index: end,
            });
        }

        if end >= len {
            break;
        }

        start = end.saturating_sub(config.overlap).max(start + 1);
    }

    debug!(chunks = chunks.len(), chars = len, "Chunked text");
    chunks
}

/// Preview the chunking of a text (for debugging and the CLI)
pub fn preview_chunking(text: &str, config: &ChunkingConfig) -> ChunkingPreview {
    let chunks = chunk_text(text, config);

    let average_chunk_size = if chunks.is_empty() {
        0
    } else {
        let total: usize = chunks.iter().map(|c| c.text.chars().count()).sum();
        (total as f64 / chunks.len() as f64).round() as usize
    };

    let previews = chunks
        .iter()
        .map(|chunk| {
            let mut preview: String = chunk.text.chars().take(PREVIEW_LEN).collect();
            if chunk.text.chars().count() > PREVIEW_LEN {
                preview.push_str("...");
            }
            ChunkPreview {
                preview,
                size: chunk.text.chars().count(),
                tokens: count_tokens(&chunk.text),
            }
        })
        .collect();

    ChunkingPreview {
        total_chunks: chunks.len(),
        average_chunk_size,
        chunks: previews,
    }
}

/// Find a natural place to end a chunk inside `[max(end - lookback, start), end)`.
///
/// Positions are character indexes; `offsets` maps them to bytes. Returns
/// `None` when the window offers no boundary.
fn find_break(text: &str, offsets: &[usize], start: usize, end: usize) -> Option<usize> {
    let window_start = end.saturating_sub(BOUNDARY_LOOKBACK).max(start);
    let window = &text[offsets[window_start]..offsets[end]];
    let to_position = |byte_idx: usize| window_start + window[..byte_idx].chars().count();

    if let Some(pos) = last_sentence_end(window) {
        return Some(to_position(pos));
    }
    // A break at the very start of the window would produce an empty chunk
    if let Some(pos) = window.rfind("\n\n").filter(|&p| p > 0) {
        return Some(to_position(pos + 2));
    }
    window.rfind(' ').filter(|&p| p > 0).map(to_position)
}

/// Byte offset just past the whitespace that follows the last `.`, `!` or `?`
/// in `window`. The whitespace run must lie inside the window.
fn last_sentence_end(window: &str) -> Option<usize> {
    let mut run_end: Option<usize> = None;

    for (idx, ch) in window.char_indices().rev() {
        if ch.is_whitespace() {
            if run_end.is_none() {
                run_end = Some(idx + ch.len_utf8());
            }
            continue;
        }
        if matches!(ch, '.' | '!' | '?') {
            if let Some(end) = run_end {
                return Some(end);
            }
        }
        run_end = None;
    }

    None
}
