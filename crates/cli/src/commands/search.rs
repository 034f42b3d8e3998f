//! Search command handler.

use clap::Args;
use recall_core::{config::AppConfig, AppResult};
use recall_knowledge::SearchOptions;

/// Show the chunks most similar to a query
#[derive(Args, Debug)]
pub struct SearchCommand {
    /// Knowledge base name
    pub base: String,

    /// Query text
    pub query: String,

    /// Number of chunks to retrieve (defaults to the base's top_k)
    #[arg(short = 'k', long)]
    pub top_k: Option<usize>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl SearchCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing search command for base '{}'", self.base);

        let options = SearchOptions {
            base_name: self.base.clone(),
            query: self.query.clone(),
            top_k: self.top_k,
        };
        let result = recall_knowledge::search(&config.workspace, options).await?;

        if self.json {
            println!("{}", serde_json::to_string_pretty(&result)?);
            return Ok(());
        }

        if result.hits.is_empty() {
            println!("No results.");
        }
        for (rank, hit) in result.hits.iter().enumerate() {
            println!(
                "{}. [{:.3}] {} (chunk {})",
                rank + 1,
                hit.score,
                hit.chunk.source_document_id,
                hit.chunk.ordinal
            );
            println!("   {}", hit.chunk.text);
        }

        Ok(())
    }
}
