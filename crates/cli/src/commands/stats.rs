//! Stats command handler.

use clap::Args;
use recall_core::{config::AppConfig, AppResult};

/// Show knowledge base statistics
#[derive(Args, Debug)]
pub struct StatsCommand {
    /// Knowledge base name
    pub base: String,

    /// List every ingested document
    #[arg(short, long)]
    pub detailed: bool,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl StatsCommand {
    pub fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing stats command for base '{}'", self.base);

        let stats = recall_knowledge::stats(&config.workspace, &self.base)?;

        if self.json {
            let output = serde_json::json!({
                "base": stats.base_name,
                "documentsCount": stats.documents_count,
                "chunksCount": stats.chunks_count,
                "dimension": stats.dimension,
                "snapshotBytes": stats.snapshot_bytes,
                "lastLearnAt": stats.last_learn_at,
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
            return Ok(());
        }

        println!("Knowledge base: {}", stats.base_name);
        println!("  Documents: {}", stats.documents_count);
        println!("  Chunks: {}", stats.chunks_count);
        println!("  Dimension: {}", stats.dimension);
        println!("  Snapshot size: {} bytes", stats.snapshot_bytes);
        if let Some(last_learn) = stats.last_learn_at {
            println!("  Last learn: {}", last_learn);
        }

        if self.detailed {
            let corpus = recall_knowledge::persist::load(
                &recall_knowledge::config::get_snapshot_prefix(&config.workspace, &self.base),
            )?;
            for source in corpus.store().sources() {
                println!(
                    "  - {} ({}, {} bytes, {} chunks)",
                    source.id, source.content_type, source.byte_count, source.chunk_count
                );
            }
        }

        Ok(())
    }
}
