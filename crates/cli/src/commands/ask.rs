//! Ask command handler.

use clap::Args;
use recall_core::{config::AppConfig, AppResult};
use recall_knowledge::SearchOptions;

/// Answer a question from a knowledge base
#[derive(Args, Debug)]
pub struct AskCommand {
    /// Knowledge base name
    pub base: String,

    /// Question text
    pub question: String,

    /// Number of chunks to retrieve (defaults to the base's top_k)
    #[arg(short = 'k', long)]
    pub top_k: Option<usize>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl AskCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing ask command for base '{}'", self.base);

        let options = SearchOptions {
            base_name: self.base.clone(),
            query: self.question.clone(),
            top_k: self.top_k,
        };
        let answer = recall_knowledge::ask(&config.workspace, options).await?;

        tracing::debug!("Answer composed from {} chunks", answer.sources.len());

        if self.json {
            println!("{}", serde_json::to_string_pretty(&answer)?);
            return Ok(());
        }

        println!("{}", answer.answer);
        if !answer.sources.is_empty() {
            println!("Sources:");
            for hit in &answer.sources {
                println!("- {} [{:.3}]", hit.chunk.source_document_id, hit.score);
            }
        }

        Ok(())
    }
}
