//! Logging setup for Recall.
//!
//! Logs go to stderr; stdout carries command output (search hits, JSON).

use std::io::IsTerminal;

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::error::{AppError, AppResult};

/// Default filter when neither a level nor `RUST_LOG` is given.
const DEFAULT_FILTER: &str = "info";

/// Initialize the global tracing subscriber.
///
/// # Arguments
/// * `log_level` - Filter directive override (e.g., "debug", "recall_knowledge=trace")
/// * `no_color` - Disable ANSI colors
///
/// # Example
/// ```no_run
/// use recall_core::logging::init_logging;
///
/// init_logging(Some("debug"), false).expect("Failed to initialize logging");
/// ```
pub fn init_logging(log_level: Option<&str>, no_color: bool) -> AppResult<()> {
    let env_filter = build_filter(log_level)?;

    let fmt_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_level(true)
        .with_ansi(!no_color && supports_color());

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .try_init()
        .map_err(|e| AppError::Config(format!("Failed to init logging: {}", e)))?;

    Ok(())
}

/// Resolve the filter: explicit level, then `RUST_LOG`, then `info`.
fn build_filter(log_level: Option<&str>) -> AppResult<EnvFilter> {
    let from_env = std::env::var("RUST_LOG").ok();
    let filter_str = log_level
        .or(from_env.as_deref())
        .unwrap_or(DEFAULT_FILTER);

    EnvFilter::try_new(filter_str)
        .map_err(|e| AppError::Config(format!("Invalid log filter '{}': {}", filter_str, e)))
}

fn supports_color() -> bool {
    if std::env::var("NO_COLOR").is_ok() {
        return false;
    }
    std::io::stderr().is_terminal()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_filter_explicit_level() {
        assert!(build_filter(Some("debug")).is_ok());
        assert!(build_filter(Some("recall_knowledge=trace,warn")).is_ok());
    }

    #[test]
    fn test_build_filter_rejects_garbage() {
        let result = build_filter(Some("recall_core=loudest"));
        assert!(matches!(result, Err(AppError::Config(_))));
    }
}
