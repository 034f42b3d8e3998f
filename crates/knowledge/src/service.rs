//! Retrieval service: ingestion and querying over one corpus.
//!
//! The service moves between two states. It starts `Empty`; a successful
//! ingestion that produced chunks, or a load of a non-empty snapshot, moves it
//! to `Indexed`. Only `reset` moves it back. Queries in `Empty` fail with
//! `NotInitialized`.

use crate::chunker;
use crate::corpus::{Corpus, Entry};
use crate::embeddings::EmbeddingEngine;
use crate::parser;
use crate::persist::{self, EmbeddingStamp};
use crate::progress::{Phase, ProgressReporter};
use crate::types::{
    Chunk, Document, IngestFailure, IngestReport, KnowledgeBaseConfig, ScoredChunk, SourceRecord,
};
use chrono::Utc;
use recall_core::{AppError, AppResult};
use std::path::{Path, PathBuf};
use tokio::sync::RwLock;

#[derive(Debug)]
enum State {
    Empty,
    Indexed(Corpus),
}

/// Summary of the service's current corpus.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CorpusSummary {
    pub documents: usize,
    pub chunks: usize,
    pub dimension: usize,
    pub sources: Vec<SourceRecord>,
}

/// Chunks, embeds, indexes and searches documents.
///
/// Ingestion holds the write lock only while appending already-embedded
/// chunks; queries share the read lock.
#[derive(Debug)]
pub struct RetrievalService {
    engine: EmbeddingEngine,
    chunk_size: usize,
    chunk_overlap: usize,
    state: RwLock<State>,
    progress: ProgressReporter,
}

impl RetrievalService {
    /// Create a service around an embedding engine.
    ///
    /// Fails with `InvalidConfiguration` when `chunk_overlap >= chunk_size`.
    pub fn new(engine: EmbeddingEngine, chunk_size: usize, chunk_overlap: usize) -> AppResult<Self> {
        chunker::stride(chunk_size, chunk_overlap)?;
        Ok(Self {
            engine,
            chunk_size,
            chunk_overlap,
            state: RwLock::new(State::Empty),
            progress: ProgressReporter::noop(),
        })
    }

    /// Build the embedding provider named by `config` and create a service.
    ///
    /// An unknown or unreachable provider fails here, once.
    pub async fn from_config(config: &KnowledgeBaseConfig) -> AppResult<Self> {
        chunker::stride(config.chunk_size, config.chunk_overlap)?;
        let engine = EmbeddingEngine::from_config(&config.embedding).await?;
        Self::new(engine, config.chunk_size, config.chunk_overlap)
    }

    /// Attach a progress reporter.
    pub fn with_progress(mut self, progress: ProgressReporter) -> Self {
        self.progress = progress;
        self
    }

    /// Whether queries can be answered.
    pub async fn is_initialized(&self) -> bool {
        matches!(*self.state.read().await, State::Indexed(_))
    }

    /// Counts and source records of the current corpus.
    pub async fn summary(&self) -> CorpusSummary {
        match &*self.state.read().await {
            State::Empty => CorpusSummary {
                dimension: self.engine.dimensions(),
                ..Default::default()
            },
            State::Indexed(corpus) => CorpusSummary {
                documents: corpus.store().sources().len(),
                chunks: corpus.len(),
                dimension: corpus.dimension(),
                sources: corpus.store().sources().to_vec(),
            },
        }
    }

    /// Chunk, embed and index documents.
    ///
    /// Documents without any text are reported as failures and skipped. An
    /// embedding failure fails the whole call and commits nothing.
    pub async fn ingest_documents(&self, documents: Vec<Document>) -> AppResult<IngestReport> {
        let mut report = IngestReport::default();
        let total = documents.len() as u64;
        let mut pending: Vec<(SourceRecord, Vec<Chunk>)> = Vec::with_capacity(documents.len());

        for (i, document) in documents.into_iter().enumerate() {
            let chunks = chunker::chunk_document(&document, self.chunk_size, self.chunk_overlap)?;
            report.bytes_processed += document.text.len() as u64;
            self.progress.emit(
                Phase::Chunk,
                i as u64 + 1,
                Some(total),
                format!("{} chunks from {}", chunks.len(), document.id),
            );

            if chunks.is_empty() {
                tracing::warn!("Skipping '{}': no text to index", document.id);
                report.failures.push(IngestFailure {
                    source: document.id,
                    error: "no text to index".to_string(),
                });
                continue;
            }

            let source = SourceRecord {
                id: document.id,
                content_type: document.content_type,
                byte_count: document.text.len() as u64,
                chunk_count: chunks.len() as u32,
                ingested_at: Utc::now(),
            };
            pending.push((source, chunks));
        }

        let texts: Vec<String> = pending
            .iter()
            .flat_map(|(_, chunks)| chunks.iter().map(|c| c.text.clone()))
            .collect();
        if texts.is_empty() {
            return Ok(report);
        }

        self.progress.emit(
            Phase::Embed,
            0,
            Some(texts.len() as u64),
            format!("model={}", self.engine.provider().model_name()),
        );
        let mut vectors = self.engine.embed_texts(&texts).await?.into_iter();

        let mut batch = Vec::with_capacity(pending.len());
        for (source, chunks) in pending {
            let entries: Vec<Entry> = chunks
                .into_iter()
                .zip(vectors.by_ref())
                .map(|(chunk, vector)| Entry { chunk, vector })
                .collect();
            if entries.len() as u32 != source.chunk_count {
                return Err(AppError::Embedding(format!(
                    "Embedding count does not cover every chunk of '{}'",
                    source.id
                )));
            }
            report.documents_indexed += 1;
            report.chunks_indexed += source.chunk_count;
            batch.push((source, entries));
        }

        let indexed = {
            let mut guard = self.state.write().await;
            let state: &mut State = &mut guard;
            match state {
                State::Indexed(corpus) => {
                    corpus.append_batch(batch)?;
                    corpus.len()
                }
                State::Empty => {
                    let mut corpus = Corpus::new(self.engine.dimensions())?;
                    corpus.append_batch(batch)?;
                    let len = corpus.len();
                    *state = State::Indexed(corpus);
                    len
                }
            }
        };
        self.progress.emit(
            Phase::Index,
            indexed as u64,
            None,
            format!("{} chunks indexed", report.chunks_indexed),
        );

        tracing::info!(
            "Ingested {} documents ({} chunks, {} failures)",
            report.documents_indexed,
            report.chunks_indexed,
            report.failures.len()
        );
        Ok(report)
    }

    /// Load files and ingest them.
    ///
    /// A file that cannot be read or has an unsupported type is recorded in
    /// the report and does not stop the others.
    pub async fn ingest_files(&self, files: &[PathBuf]) -> AppResult<IngestReport> {
        let total = files.len() as u64;
        let mut documents = Vec::with_capacity(files.len());
        let mut failures = Vec::new();

        for (i, path) in files.iter().enumerate() {
            self.progress.emit(
                Phase::Parse,
                i as u64 + 1,
                Some(total),
                format!("reading {}", path.display()),
            );
            match parser::load_document(path) {
                Ok(document) => documents.push(document),
                Err(e) => {
                    tracing::warn!("Could not load {:?}: {}", path, e);
                    failures.push(IngestFailure {
                        source: path.to_string_lossy().into_owned(),
                        error: e.to_string(),
                    });
                }
            }
        }

        let mut report = self.ingest_documents(documents).await?;
        failures.append(&mut report.failures);
        report.failures = failures;
        Ok(report)
    }

    /// Return the `k` chunks most similar to `query`, highest score first.
    pub async fn query(&self, query: &str, k: usize) -> AppResult<Vec<ScoredChunk>> {
        if !self.is_initialized().await {
            return Err(AppError::NotInitialized);
        }

        let vector = self.engine.embed_query(query).await?;

        let hits = match &*self.state.read().await {
            State::Empty => return Err(AppError::NotInitialized),
            State::Indexed(corpus) => corpus.search(&vector, k)?,
        };

        tracing::debug!(
            "Query returned {} hits (requested top-{}), scores: {:?}",
            hits.len(),
            k,
            hits.iter().map(|h| h.score).collect::<Vec<_>>()
        );
        Ok(hits)
    }

    /// Write the current corpus to `<prefix>.vectors` and `<prefix>.chunks.json`.
    pub async fn save(&self, prefix: &Path) -> AppResult<()> {
        match &*self.state.read().await {
            State::Empty => Err(AppError::NotInitialized),
            State::Indexed(corpus) => persist::save(corpus, &self.embedding_stamp(), prefix),
        }
    }

    /// Provider and model of this service's embedding engine.
    pub fn embedding_stamp(&self) -> EmbeddingStamp {
        let provider = self.engine.provider();
        EmbeddingStamp::new(provider.provider_name(), provider.model_name())
    }

    /// Replace the current corpus with a snapshot.
    ///
    /// The snapshot must have been built by the same provider and model, with
    /// the same dimension, as this service's embedding engine.
    pub async fn load(&self, prefix: &Path) -> AppResult<()> {
        let persist::Snapshot { corpus, embedding } = persist::load_snapshot(prefix)?;
        if corpus.dimension() != self.engine.dimensions() {
            return Err(AppError::DimensionMismatch {
                expected: self.engine.dimensions(),
                actual: corpus.dimension(),
            });
        }
        let expected = self.embedding_stamp();
        if embedding != expected {
            return Err(AppError::InvalidConfiguration(format!(
                "Snapshot {:?} was built with {}/{} but the embedding engine is {}/{}",
                prefix, embedding.provider, embedding.model, expected.provider, expected.model
            )));
        }

        let mut state = self.state.write().await;
        *state = if corpus.is_empty() {
            State::Empty
        } else {
            State::Indexed(corpus)
        };
        Ok(())
    }

    /// Drop every indexed chunk.
    pub async fn reset(&self) {
        *self.state.write().await = State::Empty;
        tracing::info!("Reset retrieval service");
    }
}
