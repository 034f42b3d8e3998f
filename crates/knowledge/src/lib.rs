//! Local document retrieval.
//!
//! Documents are split into overlapping chunks, embedded, and held in an
//! exact inner-product index co-indexed with a chunk store. A corpus is
//! persisted per knowledge base under `.recall/knowledge/<base>/`.

pub mod answer;
pub mod chunker;
pub mod config;
pub mod corpus;
pub mod embeddings;
pub mod parser;
pub mod persist;
pub mod progress;
pub mod service;
pub mod store;
pub mod types;
pub mod vector_index;

#[cfg(test)]
mod tests;

pub use answer::{compose_answer, Answer, NO_RESULTS_ANSWER};
pub use corpus::Corpus;
pub use embeddings::{EmbeddingConfig, EmbeddingEngine, EmbeddingProvider};
pub use progress::{Phase, ProgressCallback, ProgressEvent, ProgressReporter};
pub use service::RetrievalService;
pub use types::{
    BaseStats, Chunk, Document, IngestFailure, IngestReport, KnowledgeBaseConfig, LearnOptions,
    LearnStats, ScoredChunk, SearchOptions, SearchResult, SourceRecord,
};

use parser::ContentType;
use recall_core::{AppError, AppResult};
use std::path::{Path, PathBuf};
use std::time::Instant;
use walkdir::WalkDir;

/// Ingest files and directories into a knowledge base and save its snapshot.
///
/// The existing snapshot is extended unless `options.reset` is set. Extending
/// requires the provider and model the snapshot was built with, so overrides
/// that name a different embedding space fail unless the base is reset.
pub async fn learn(workspace: &Path, options: LearnOptions) -> AppResult<LearnStats> {
    let start = Instant::now();

    tracing::info!("Starting learn operation for base '{}'", options.base_name);

    let saved = config::load_config(workspace, &options.base_name)?;
    let mut config = saved.clone();
    config::apply_overrides(
        &mut config,
        options.provider.as_deref(),
        options.model.as_deref(),
    );
    config::validate(&config)?;

    let prefix = config::get_snapshot_prefix(workspace, &options.base_name);
    if !options.reset && persist::exists(&prefix) {
        saved.embedding.validate_consistency(&config.embedding)?;
    }

    let service = RetrievalService::from_config(&config)
        .await?
        .with_progress(options.progress.clone());

    if options.reset {
        tracing::info!("Resetting knowledge base '{}'", options.base_name);
    }

    let files = discover_files(&options);
    tracing::debug!("Discovered {} candidate files", files.len());

    let report = commit_to_base(&service, &prefix, &files, options.reset).await?;
    let total_chunks = service.summary().await.chunks;
    config::save_config(workspace, &config)?;

    let duration = start.elapsed();
    tracing::info!(
        "Learn operation completed: {} documents, {} chunks, {} bytes in {:.2}s",
        report.documents_indexed,
        report.chunks_indexed,
        report.bytes_processed,
        duration.as_secs_f64()
    );

    Ok(LearnStats {
        documents_count: report.documents_indexed,
        chunks_count: report.chunks_indexed,
        total_chunks,
        bytes_processed: report.bytes_processed,
        failures: report.failures,
        duration_secs: duration.as_secs_f64(),
    })
}

/// Ingest `files` into the base at `prefix` and write the result back.
///
/// Without `reset` the existing snapshot is loaded first. The old snapshot is
/// only replaced once ingestion has succeeded; a reset that indexed nothing
/// removes it.
pub(crate) async fn commit_to_base(
    service: &RetrievalService,
    prefix: &Path,
    files: &[PathBuf],
    reset: bool,
) -> AppResult<IngestReport> {
    if !reset && persist::exists(prefix) {
        service.load(prefix).await?;
    }

    let report = service.ingest_files(files).await?;

    if service.is_initialized().await {
        service.save(prefix).await?;
    } else if reset {
        persist::remove(prefix)?;
    }
    Ok(report)
}

/// Expand `options.paths` into the list of files to ingest.
///
/// Directories are walked recursively in file-name order and only files with
/// a supported extension that pass the include/exclude filters are kept.
/// Explicit file paths are kept as given so that load failures get reported.
fn discover_files(options: &LearnOptions) -> Vec<PathBuf> {
    let mut files = Vec::new();

    for path in &options.paths {
        if !path.is_dir() {
            files.push(path.clone());
            continue;
        }

        for entry in WalkDir::new(path)
            .follow_links(false)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|e| match e {
                Ok(entry) => Some(entry),
                Err(err) => {
                    tracing::warn!("Skipping unreadable entry: {}", err);
                    None
                }
            })
        {
            let entry_path = entry.path();
            if !entry.file_type().is_file() || !should_include(entry_path, options) {
                continue;
            }
            if ContentType::from_path(entry_path).is_none() {
                tracing::debug!("Skipping unsupported file {:?}", entry_path);
                continue;
            }
            files.push(entry_path.to_path_buf());
        }
    }

    files
}

/// Check if a file should be included based on patterns.
fn should_include(path: &Path, options: &LearnOptions) -> bool {
    let path_str = path.to_string_lossy();

    if options.exclude.iter().any(|p| path_str.contains(p.as_str())) {
        return false;
    }

    options.include.is_empty()
        || options
            .include
            .iter()
            .any(|p| path_str.contains(p.as_str()))
}

/// Load a base's service and snapshot for querying.
async fn open_base(
    workspace: &Path,
    base_name: &str,
) -> AppResult<(RetrievalService, KnowledgeBaseConfig)> {
    let config = config::load_config(workspace, base_name)?;
    let prefix = config::get_snapshot_prefix(workspace, base_name);
    if !persist::exists(&prefix) {
        tracing::debug!("No snapshot for base '{}' at {:?}", base_name, prefix);
        return Err(AppError::NotInitialized);
    }

    let service = RetrievalService::from_config(&config).await?;
    service.load(&prefix).await?;
    Ok((service, config))
}

/// Return the chunks of a base most similar to a query.
pub async fn search(workspace: &Path, options: SearchOptions) -> AppResult<SearchResult> {
    tracing::info!(
        "Searching knowledge base '{}' with query: {}",
        options.base_name,
        options.query
    );

    let (service, config) = open_base(workspace, &options.base_name).await?;
    let k = options.top_k.unwrap_or(config.top_k);
    let hits = service.query(&options.query, k).await?;

    if let Some(best) = hits.first() {
        tracing::info!("Retrieved {} chunks (top score: {:.3})", hits.len(), best.score);
    }

    Ok(SearchResult {
        query: options.query,
        hits,
    })
}

/// Answer a question by quoting the best-matching chunks.
pub async fn ask(workspace: &Path, options: SearchOptions) -> AppResult<Answer> {
    let result = search(workspace, options).await?;
    Ok(compose_answer(&result.query, &result.hits))
}

/// Document, chunk and on-disk statistics for a base.
pub fn stats(workspace: &Path, base_name: &str) -> AppResult<BaseStats> {
    tracing::info!("Getting stats for knowledge base '{}'", base_name);

    let prefix = config::get_snapshot_prefix(workspace, base_name);
    if !persist::exists(&prefix) {
        return Err(AppError::NotInitialized);
    }

    let corpus = persist::load(&prefix)?;
    let sources = corpus.store().sources();

    Ok(BaseStats {
        base_name: base_name.to_string(),
        documents_count: sources.len(),
        chunks_count: corpus.len(),
        dimension: corpus.dimension(),
        snapshot_bytes: persist::snapshot_size(&prefix),
        last_learn_at: sources.iter().map(|s| s.ingested_at).max(),
    })
}

/// Delete a base's snapshot. The base's config is kept.
pub fn clean(workspace: &Path, base_name: &str) -> AppResult<()> {
    tracing::info!("Cleaning knowledge base '{}'", base_name);

    let prefix = config::get_snapshot_prefix(workspace, base_name);
    if !persist::exists(&prefix) {
        return Err(AppError::NotInitialized);
    }

    persist::remove(&prefix)?;

    tracing::info!("Knowledge base '{}' cleaned", base_name);
    Ok(())
}
