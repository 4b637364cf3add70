//! Upload intake: size and type checks, then text extraction.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Maximum upload size (5 MB)
pub const MAX_UPLOAD_BYTES: usize = 5 * 1024 * 1024;

/// Characters shown in an upload's content preview
const CONTENT_PREVIEW_LEN: usize = 300;

#[derive(Error, Debug)]
pub enum ChunkerError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Unsupported file type: {0}")]
    UnsupportedType(String),
    #[error("File too large: {0} bytes (max {1} bytes)")]
    FileTooLarge(usize, usize),
    #[error("No file content uploaded")]
    EmptyFile,
}

impl Serialize for ChunkerError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

/// Document formats the upload path recognises
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileKind {
    Text,
    Pdf,
    Docx,
}

impl FileKind {
    pub fn from_extension(ext: &str) -> Result<Self, ChunkerError> {
        match ext {
            "txt" | "md" | "markdown" => Ok(FileKind::Text),
            "pdf" => Ok(FileKind::Pdf),
            "docx" => Ok(FileKind::Docx),
            other => Err(ChunkerError::UnsupportedType(other.to_string())),
        }
    }
}

/// Raw uploaded bytes with the client-supplied file name
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

impl UploadedFile {
    pub fn from_path(path: &std::path::Path) -> Result<Self, ChunkerError> {
        let size = std::fs::metadata(path)?.len() as usize;
        if size > MAX_UPLOAD_BYTES {
            return Err(ChunkerError::FileTooLarge(size, MAX_UPLOAD_BYTES));
        }
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        Ok(Self {
            file_name,
            bytes: std::fs::read(path)?,
        })
    }
}

/// Text pulled out of an upload, ready to chunk
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractedDocument {
    pub title: String,
    pub file_name: String,
    pub file_type: String,
    pub content: String,
}

impl ExtractedDocument {
    pub fn content_preview(&self) -> String {
        self.content.chars().take(CONTENT_PREVIEW_LEN).collect()
    }
}

/// Turns file bytes into plain text
pub trait TextExtractor: Send + Sync {
    fn extract(&self, kind: FileKind, extension: &str, bytes: &[u8]) -> Result<String, ChunkerError>;
}

/// Decodes text formats; binary formats need a dedicated extractor.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlainTextExtractor;

impl TextExtractor for PlainTextExtractor {
    fn extract(&self, kind: FileKind, extension: &str, bytes: &[u8]) -> Result<String, ChunkerError> {
        match kind {
            FileKind::Text => Ok(String::from_utf8_lossy(bytes).into_owned()),
            FileKind::Pdf | FileKind::Docx => Err(ChunkerError::UnsupportedType(extension.to_string())),
        }
    }
}

/// Validate an upload and extract its text.
pub fn prepare_upload(
    file: &UploadedFile,
    extractor: &dyn TextExtractor,
) -> Result<ExtractedDocument, ChunkerError> {
    if file.bytes.is_empty() {
        return Err(ChunkerError::EmptyFile);
    }
    if file.bytes.len() > MAX_UPLOAD_BYTES {
        return Err(ChunkerError::FileTooLarge(file.bytes.len(), MAX_UPLOAD_BYTES));
    }

    let safe_name = match file.file_name.trim() {
        "" => "Untitled".to_string(),
        name => name.to_string(),
    };
    let extension = safe_name
        .rsplit('.')
        .next()
        .unwrap_or_default()
        .to_lowercase();

    let kind = FileKind::from_extension(&extension)?;
    let content = extractor.extract(kind, &extension, &file.bytes)?;

    Ok(ExtractedDocument {
        title: safe_name.clone(),
        file_name: safe_name,
        file_type: extension,
        content,
    })
}
