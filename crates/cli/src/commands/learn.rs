//! Learn command handler.

use clap::Args;
use recall_core::{config::AppConfig, AppResult};
use recall_knowledge::{LearnOptions, Phase, ProgressEvent, ProgressReporter};
use std::path::PathBuf;
use std::sync::Arc;

/// Ingest files and directories into a knowledge base
#[derive(Args, Debug)]
pub struct LearnCommand {
    /// Knowledge base name
    pub base: String,

    /// Files or directories to learn from
    #[arg(required = true)]
    pub paths: Vec<PathBuf>,

    /// Only include paths containing this substring (repeatable)
    #[arg(long)]
    pub include: Vec<String>,

    /// Skip paths containing this substring (repeatable)
    #[arg(long)]
    pub exclude: Vec<String>,

    /// Discard the existing index before learning
    #[arg(long)]
    pub reset: bool,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl LearnCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing learn command for base '{}'", self.base);

        let progress = if self.json {
            ProgressReporter::noop()
        } else {
            ProgressReporter::new(Arc::new(|event: &ProgressEvent| {
                if event.phase == Phase::Parse {
                    eprintln!("{}", event.format_simple());
                }
            }))
        };

        let options = LearnOptions {
            base_name: self.base.clone(),
            paths: self.paths.clone(),
            include: self.include.clone(),
            exclude: self.exclude.clone(),
            reset: self.reset,
            provider: config.provider.clone(),
            model: config.model.clone(),
            progress,
        };

        let stats = recall_knowledge::learn(&config.workspace, options).await?;

        if self.json {
            let output = serde_json::json!({
                "base": self.base,
                "documentsCount": stats.documents_count,
                "chunksCount": stats.chunks_count,
                "totalChunks": stats.total_chunks,
                "bytesProcessed": stats.bytes_processed,
                "failures": stats.failures,
                "durationSecs": stats.duration_secs,
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        } else {
            println!(
                "Learned {} documents ({} chunks, {} bytes) in {:.2}s; base '{}' now holds {} chunks",
                stats.documents_count,
                stats.chunks_count,
                stats.bytes_processed,
                stats.duration_secs,
                self.base,
                stats.total_chunks
            );
            for failure in &stats.failures {
                println!("  skipped {}: {}", failure.source, failure.error);
            }
        }

        Ok(())
    }
}
