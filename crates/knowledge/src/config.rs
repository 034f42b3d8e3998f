//! Knowledge base configuration and on-disk layout.

use crate::types::KnowledgeBaseConfig;
use recall_core::config::STATE_DIR;
use recall_core::{AppError, AppResult};
use std::fs;
use std::path::{Path, PathBuf};

/// Load knowledge base configuration.
///
/// Loads from `.recall/knowledge/<base>/config.yaml` if it exists,
/// otherwise returns defaults named after the base.
pub fn load_config(workspace: &Path, base_name: &str) -> AppResult<KnowledgeBaseConfig> {
    let config_path = get_config_path(workspace, base_name);

    let mut config = if config_path.exists() {
        let content = fs::read_to_string(&config_path)?;
        let config: KnowledgeBaseConfig = serde_yaml::from_str(&content).map_err(|e| {
            AppError::Config(format!("Failed to parse config at {:?}: {}", config_path, e))
        })?;
        tracing::debug!("Loaded knowledge base config for '{}'", base_name);
        config
    } else {
        tracing::debug!(
            "Using default knowledge base config for '{}' (no config file found)",
            base_name
        );
        KnowledgeBaseConfig::default()
    };

    config.name = base_name.to_string();
    validate(&config)?;
    Ok(config)
}

/// Save knowledge base configuration.
pub fn save_config(workspace: &Path, config: &KnowledgeBaseConfig) -> AppResult<()> {
    let config_path = get_config_path(workspace, &config.name);
    if let Some(parent) = config_path.parent() {
        fs::create_dir_all(parent)?;
    }

    fs::write(&config_path, serde_yaml::to_string(config)?)?;

    tracing::debug!("Saved knowledge base config for '{}'", config.name);
    Ok(())
}

/// Apply provider and model overrides from the command line or environment.
///
/// Switching provider without naming a model selects that provider's default
/// model.
pub fn apply_overrides(
    config: &mut KnowledgeBaseConfig,
    provider: Option<&str>,
    model: Option<&str>,
) {
    if let Some(provider) = provider {
        if provider != config.embedding.provider {
            config.embedding.provider = provider.to_string();
            config.embedding.model = default_model(provider).to_string();
        }
    }
    if let Some(model) = model {
        config.embedding.model = model.to_string();
    }
}

fn default_model(provider: &str) -> &'static str {
    match provider {
        "mock" => "trigram-v1",
        _ => "all-minilm",
    }
}

/// Reject settings no service could run with.
pub fn validate(config: &KnowledgeBaseConfig) -> AppResult<()> {
    if config.name.is_empty() || config.name.contains(['/', '\\']) || config.name == ".." {
        return Err(AppError::InvalidConfiguration(format!(
            "Invalid knowledge base name '{}'",
            config.name
        )));
    }
    if config.top_k == 0 {
        return Err(AppError::InvalidConfiguration(
            "top_k must be at least 1".to_string(),
        ));
    }
    crate::chunker::stride(config.chunk_size, config.chunk_overlap)?;
    config.embedding.validate()
}

/// Directory holding everything for one base.
pub fn get_base_dir(workspace: &Path, base_name: &str) -> PathBuf {
    workspace.join(STATE_DIR).join("knowledge").join(base_name)
}

/// Path to a base's config file.
pub fn get_config_path(workspace: &Path, base_name: &str) -> PathBuf {
    get_base_dir(workspace, base_name).join("config.yaml")
}

/// Prefix of a base's snapshot pair.
pub fn get_snapshot_prefix(workspace: &Path, base_name: &str) -> PathBuf {
    get_base_dir(workspace, base_name).join("index")
}
