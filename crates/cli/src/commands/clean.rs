//! Clean command handler.

use clap::Args;
use recall_core::{config::AppConfig, AppResult};

/// Delete a knowledge base's index
#[derive(Args, Debug)]
pub struct CleanCommand {
    /// Knowledge base name
    pub base: String,
}

impl CleanCommand {
    pub fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing clean command for base '{}'", self.base);

        recall_knowledge::clean(&config.workspace, &self.base)?;

        println!("Knowledge base '{}' cleaned", self.base);
        Ok(())
    }
}
