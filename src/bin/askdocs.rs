//! Ask My Doc CLI
//!
//! Command-line interface for chunking documents, searching them, building
//! grounded prompts and finding related web references. Every command prints
//! a single JSON object on stdout.

use anyhow::{anyhow, Context, Result};
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use askdocs_lib::config::DEFAULT_TAVILY_ENDPOINT;
use askdocs_lib::documents::chunker::{DEFAULT_CHUNK_SIZE, DEFAULT_MIN_CHUNK_SIZE, DEFAULT_OVERLAP};
use askdocs_lib::{
    chunk_text, count_tokens, find_references, logging, prepare_upload, preview_chunking,
    AppConfig, ChunkingConfig, DocumentLibrary, ExtractedDocument, HashingEmbedder, InMemoryIndex,
    IngestReport, LeadSentenceSummarizer, PlainTextExtractor, ReferenceRequest, RetrievedChunk,
    TavilyClient, TextChunk, UploadedFile,
};

#[derive(Parser)]
#[command(name = "askdocs")]
#[command(about = "Ask My Doc CLI - document chunking, grounded prompts and web references", long_about = None)]
struct Cli {
    #[command(flatten)]
    options: GlobalOptions,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct GlobalOptions {
    /// Target maximum chunk size
    #[arg(long, global = true, env = "ASKDOCS_CHUNK_SIZE", default_value_t = DEFAULT_CHUNK_SIZE)]
    chunk_size: usize,
    /// Overlap between consecutive chunks
    #[arg(long, global = true, env = "ASKDOCS_CHUNK_OVERLAP", default_value_t = DEFAULT_OVERLAP)]
    overlap: usize,
    /// Minimum size for a chunk to be kept
    #[arg(long, global = true, env = "ASKDOCS_MIN_CHUNK_SIZE", default_value_t = DEFAULT_MIN_CHUNK_SIZE)]
    min_chunk_size: usize,
    /// Chunks included in a grounded prompt
    #[arg(long, global = true, env = "ASKDOCS_TOP_K", default_value_t = 3)]
    top_k: usize,
    #[arg(long, global = true, env = "TAVILY_API_KEY", hide_env_values = true)]
    tavily_api_key: Option<String>,
    #[arg(long, global = true, env = "TAVILY_ENDPOINT", default_value = DEFAULT_TAVILY_ENDPOINT)]
    tavily_endpoint: String,
    /// Log filter used when RUST_LOG is unset
    #[arg(long, global = true, env = "ASKDOCS_LOG", default_value = "warn")]
    log_level: String,
}

impl GlobalOptions {
    fn to_config(&self) -> AppConfig {
        let mut config = AppConfig::default();
        config.chunking = ChunkingConfig {
            chunk_size: self.chunk_size,
            overlap: self.overlap,
            min_chunk_size: self.min_chunk_size,
        };
        config.retrieval.top_k = self.top_k;
        config.references.tavily_api_key = self.tavily_api_key.clone();
        config.references.tavily_endpoint = self.tavily_endpoint.clone();
        config.logging.default = self.log_level.clone();
        config
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Split a document into chunks
    Chunk {
        /// Path to a .txt or .md file
        path: PathBuf,
        /// Print size statistics and short previews instead of full chunks
        #[arg(long)]
        preview: bool,
    },
    /// Semantic search across documents
    Search {
        query: String,
        /// Documents to search (repeatable)
        #[arg(long = "doc", required = true)]
        docs: Vec<PathBuf>,
        /// Restrict results to the document with this file name
        #[arg(long)]
        only: Option<String>,
        /// Number of results (default: 5)
        #[arg(short = 'k', long)]
        limit: Option<usize>,
    },
    /// Build the grounded prompt for a question
    Ask {
        question: String,
        /// Documents to answer from (repeatable)
        #[arg(long = "doc", required = true)]
        docs: Vec<PathBuf>,
        /// Restrict context to the document with this file name
        #[arg(long)]
        only: Option<String>,
    },
    /// Find web pages related to a document
    References {
        path: PathBuf,
        /// Search query; summarized from the document when omitted
        #[arg(short, long)]
        query: Option<String>,
        /// Number of references (1-8, default: 5)
        #[arg(short, long)]
        limit: Option<i64>,
    },
}

// ============ Output Types ============

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ChunkOutput {
    file_name: String,
    file_type: String,
    content_preview: String,
    chunk_count: usize,
    chunks: Vec<TextChunk>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SearchOutput {
    query: String,
    total_found: usize,
    results: Vec<RetrievedChunk>,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<String>,
    documents: Vec<IngestReport>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct AskOutput {
    question: String,
    system_prompt: String,
    prompt_tokens: u32,
    excerpt_count: usize,
    sources: Vec<RetrievedChunk>,
}

// ============ Main ============

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();

    let config = cli.options.to_config();
    logging::init(&config.logging);

    let result = match config.validate() {
        Ok(()) => run(cli.command, &config).await,
        Err(e) => Err(e.into()),
    };

    match result {
        Ok(json) => println!("{}", json),
        Err(e) => {
            println!("{}", serde_json::json!({ "error": format!("{:#}", e) }));
            std::process::exit(1);
        }
    }
}

async fn run(command: Commands, config: &AppConfig) -> Result<String> {
    match command {
        Commands::Chunk { path, preview } => handle_chunk(&path, preview, config),
        Commands::Search { query, docs, only, limit } => {
            handle_search(&query, &docs, only.as_deref(), limit, config).await
        }
        Commands::Ask { question, docs, only } => {
            handle_ask(&question, &docs, only.as_deref(), config).await
        }
        Commands::References { path, query, limit } => {
            handle_references(&path, query, limit, config).await
        }
    }
}

// ============ Handlers ============

fn load_document(path: &Path) -> Result<ExtractedDocument> {
    let file = UploadedFile::from_path(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    Ok(prepare_upload(&file, &PlainTextExtractor)?)
}

/// Load documents into a fresh in-process library.
async fn build_library(paths: &[PathBuf], config: &AppConfig) -> Result<(DocumentLibrary, Vec<IngestReport>)> {
    let library = DocumentLibrary::new(
        config.chunking,
        config.retrieval,
        Arc::new(HashingEmbedder::default()),
        Arc::new(InMemoryIndex::new()),
    );

    let documents = paths.iter().map(|p| load_document(p)).collect::<Result<Vec<_>>>()?;
    let reports = futures::future::try_join_all(documents.into_iter().map(|d| library.add_document(d))).await?;

    Ok((library, reports))
}

fn resolve_only(reports: &[IngestReport], only: Option<&str>) -> Result<Option<String>> {
    only.map(|name| {
        reports.iter()
            .find(|r| r.document.file_name == name)
            .map(|r| r.document.id.clone())
            .ok_or_else(|| anyhow!("No loaded document named {}", name))
    })
    .transpose()
}

fn handle_chunk(path: &Path, preview: bool, config: &AppConfig) -> Result<String> {
    let document = load_document(path)?;

    if preview {
        return Ok(serde_json::to_string(&preview_chunking(&document.content, &config.chunking))?);
    }

    let chunks = chunk_text(&document.content, &config.chunking);
    let output = ChunkOutput {
        content_preview: document.content_preview(),
        file_name: document.file_name,
        file_type: document.file_type,
        chunk_count: chunks.len(),
        chunks,
    };
    Ok(serde_json::to_string(&output)?)
}

async fn handle_search(
    query: &str,
    docs: &[PathBuf],
    only: Option<&str>,
    limit: Option<usize>,
    config: &AppConfig,
) -> Result<String> {
    let (library, reports) = build_library(docs, config).await?;
    let document_id = resolve_only(&reports, only)?;

    let top_k = limit.unwrap_or(config.retrieval.search_top_k);
    let results = library.search(query, top_k, document_id.as_deref()).await?;

    let output = SearchOutput {
        query: query.to_string(),
        total_found: results.len(),
        message: results.is_empty().then(|| "No relevant content found in your documents.".to_string()),
        results,
        documents: reports,
    };
    Ok(serde_json::to_string(&output)?)
}

async fn handle_ask(question: &str, docs: &[PathBuf], only: Option<&str>, config: &AppConfig) -> Result<String> {
    let (library, reports) = build_library(docs, config).await?;
    let document_id = resolve_only(&reports, only)?;

    let (prompt, sources) = library.grounded_prompt(question, document_id.as_deref()).await?;

    let output = AskOutput {
        question: question.trim().to_string(),
        prompt_tokens: count_tokens(prompt.as_str()),
        excerpt_count: prompt.excerpt_count,
        system_prompt: prompt.text,
        sources,
    };
    Ok(serde_json::to_string(&output)?)
}

async fn handle_references(
    path: &Path,
    query: Option<String>,
    limit: Option<i64>,
    config: &AppConfig,
) -> Result<String> {
    let (library, reports) = build_library(&[path.to_path_buf()], config).await?;
    let report = reports.first().ok_or_else(|| anyhow!("No document loaded"))?;
    let source = library.reference_source(&report.document.id)?;

    let search = TavilyClient::from_config(&config.references);
    let request = ReferenceRequest { query, limit };

    let response = find_references(&LeadSentenceSummarizer, &search, &source, &request, &config.references).await?;

    Ok(serde_json::to_string(&response)?)
}
