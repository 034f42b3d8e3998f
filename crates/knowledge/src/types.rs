//! Knowledge system type definitions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::embeddings::EmbeddingConfig;
use crate::progress::ProgressReporter;

/// Configuration for a knowledge base.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct KnowledgeBaseConfig {
    /// Name of the knowledge base
    pub name: String,

    /// Embedding provider settings
    #[serde(default)]
    pub embedding: EmbeddingConfig,

    /// Chunk size in characters
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    /// Overlap between consecutive chunks in characters
    #[serde(default = "default_chunk_overlap")]
    pub chunk_overlap: usize,

    /// Number of chunks returned when a query does not specify k
    #[serde(default = "default_top_k")]
    pub top_k: usize,
}

fn default_chunk_size() -> usize {
    1000
}

fn default_chunk_overlap() -> usize {
    200
}

fn default_top_k() -> usize {
    3
}

impl Default for KnowledgeBaseConfig {
    fn default() -> Self {
        Self {
            name: String::new(),
            embedding: EmbeddingConfig::default(),
            chunk_size: default_chunk_size(),
            chunk_overlap: default_chunk_overlap(),
            top_k: default_top_k(),
        }
    }
}

/// A raw document handed to ingestion.
///
/// Only its chunks survive ingestion; the document itself is dropped.
#[derive(Debug, Clone)]
pub struct Document {
    /// Provenance identifier (usually the source path)
    pub id: String,

    /// Raw text content
    pub text: String,

    /// Content type label ("text", "pdf")
    pub content_type: String,
}

impl Document {
    /// Create a plain-text document.
    pub fn new(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
            content_type: "text".to_string(),
        }
    }
}

/// A window of a document's cleaned text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    /// Chunk text
    pub text: String,

    /// Provenance identifier of the owning document
    pub source_document_id: String,

    /// Character offset of the chunk within the cleaned document text
    pub start_offset: usize,

    /// Index of the chunk within its document
    pub ordinal: u32,
}

/// Per-document record kept alongside the chunks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceRecord {
    /// Provenance identifier
    pub id: String,

    /// Content type label
    pub content_type: String,

    /// Raw size of the document text in bytes
    pub byte_count: u64,

    /// Number of chunks the document produced
    pub chunk_count: u32,

    /// When the document was ingested
    pub ingested_at: DateTime<Utc>,
}

/// A retrieved chunk with its similarity score.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoredChunk {
    /// Co-index position of the chunk
    pub position: usize,

    /// Inner product between query and chunk vectors
    pub score: f32,

    /// The chunk itself
    pub chunk: Chunk,
}

/// A document that could not be ingested.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestFailure {
    /// Path or identifier of the document
    pub source: String,

    /// Human-readable cause
    pub error: String,
}

/// Outcome of a single ingestion call.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IngestReport {
    /// Documents that produced at least one chunk
    pub documents_indexed: u32,

    /// Chunks appended to the corpus
    pub chunks_indexed: u32,

    /// Bytes of raw text processed
    pub bytes_processed: u64,

    /// Documents that were skipped, with reasons
    pub failures: Vec<IngestFailure>,
}

/// Options for the learn operation.
#[derive(Debug, Clone, Default)]
pub struct LearnOptions {
    /// Knowledge base name
    pub base_name: String,

    /// Files or directories to learn from
    pub paths: Vec<PathBuf>,

    /// Include patterns (substring match on the path)
    pub include: Vec<String>,

    /// Exclude patterns (substring match on the path)
    pub exclude: Vec<String>,

    /// Discard the existing snapshot before learning
    pub reset: bool,

    /// Embedding provider override
    pub provider: Option<String>,

    /// Embedding model override
    pub model: Option<String>,

    /// Receives ingestion progress events
    pub progress: ProgressReporter,
}

/// Statistics from a learn operation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LearnStats {
    /// Documents indexed in this run
    pub documents_count: u32,

    /// Chunks indexed in this run
    pub chunks_count: u32,

    /// Total chunks in the base after the run
    pub total_chunks: usize,

    /// Bytes of raw text processed
    pub bytes_processed: u64,

    /// Documents that failed to load
    pub failures: Vec<IngestFailure>,

    /// Duration in seconds
    pub duration_secs: f64,
}

/// Options for search and ask operations.
#[derive(Debug, Clone)]
pub struct SearchOptions {
    /// Knowledge base name
    pub base_name: String,

    /// Query text
    pub query: String,

    /// Number of chunks to retrieve (base default when `None`)
    pub top_k: Option<usize>,
}

/// Result from a knowledge retrieval.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResult {
    /// Query text
    pub query: String,

    /// Retrieved chunks, highest score first
    pub hits: Vec<ScoredChunk>,
}

/// Statistics for a knowledge base.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BaseStats {
    /// Base name
    pub base_name: String,

    /// Number of ingested documents
    pub documents_count: usize,

    /// Number of chunks (and vectors)
    pub chunks_count: usize,

    /// Embedding dimension
    pub dimension: usize,

    /// Size of the snapshot pair on disk
    pub snapshot_bytes: u64,

    /// Most recent ingestion time
    pub last_learn_at: Option<DateTime<Utc>>,
}
