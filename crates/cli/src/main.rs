//! Recall CLI
//!
//! Learn documents into local knowledge bases and query them.

mod commands;

use anyhow::Context;
use clap::{Parser, Subcommand};
use commands::{AskCommand, CleanCommand, LearnCommand, SearchCommand, StatsCommand};
use recall_core::{config::AppConfig, logging};
use std::path::PathBuf;

/// Recall - local document retrieval
#[derive(Parser, Debug)]
#[command(name = "recall")]
#[command(about = "Index local documents and retrieve the passages that match a question", long_about = None)]
#[command(version)]
struct Cli {
    /// Path to workspace directory (default: current directory)
    #[arg(short, long, global = true, env = "RECALL_WORKSPACE")]
    workspace: Option<PathBuf>,

    /// Path to config file
    #[arg(short, long, global = true, env = "RECALL_CONFIG")]
    config: Option<PathBuf>,

    /// Log level or filter directive (error, warn, info, debug, trace)
    #[arg(long, global = true, env = "RUST_LOG")]
    log_level: Option<String>,

    /// Enable verbose output (sets log level to debug)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Disable colored output
    #[arg(long, global = true, env = "NO_COLOR")]
    no_color: bool,

    /// Embedding provider (mock, ollama)
    #[arg(short, long, global = true, env = "RECALL_PROVIDER")]
    provider: Option<String>,

    /// Embedding model identifier
    #[arg(short, long, global = true, env = "RECALL_MODEL")]
    model: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Ingest files and directories into a knowledge base
    Learn(LearnCommand),

    /// Show the chunks most similar to a query
    Search(SearchCommand),

    /// Answer a question from a knowledge base
    Ask(AskCommand),

    /// Show knowledge base statistics
    Stats(StatsCommand),

    /// Delete a knowledge base's index
    Clean(CleanCommand),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = AppConfig::load()
        .context("Failed to load configuration")?
        .with_overrides(
            cli.workspace,
            cli.config,
            cli.provider,
            cli.model,
            cli.log_level,
            cli.verbose,
            cli.no_color,
        );
    config.validate()?;

    logging::init_logging(config.log_level.as_deref(), config.no_color)?;

    tracing::info!("Recall CLI starting");
    tracing::debug!("Workspace: {:?}", config.workspace);
    tracing::debug!(
        "Embedding override: provider={:?}, model={:?}",
        config.provider,
        config.model
    );

    config.ensure_state_dir()?;

    let command_name = match &cli.command {
        Commands::Learn(_) => "learn",
        Commands::Search(_) => "search",
        Commands::Ask(_) => "ask",
        Commands::Stats(_) => "stats",
        Commands::Clean(_) => "clean",
    };
    let _span = tracing::info_span!("command", name = command_name).entered();

    let result = match cli.command {
        Commands::Learn(cmd) => cmd.execute(&config).await,
        Commands::Search(cmd) => cmd.execute(&config).await,
        Commands::Ask(cmd) => cmd.execute(&config).await,
        Commands::Stats(cmd) => cmd.execute(&config),
        Commands::Clean(cmd) => cmd.execute(&config),
    };

    match &result {
        Ok(_) => tracing::info!("Command completed successfully"),
        Err(e) => tracing::error!("Command failed: {}", e),
    }

    result.with_context(|| format!("recall {} failed", command_name))
}
