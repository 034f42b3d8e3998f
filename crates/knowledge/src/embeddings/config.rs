//! Embedding configuration types.

use recall_core::{AppError, AppResult};
use serde::{Deserialize, Serialize};

/// Embedding configuration for a knowledge base.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EmbeddingConfig {
    /// Provider name: "mock", "ollama"
    pub provider: String,

    /// Model identifier (provider-specific)
    pub model: String,

    /// Embedding vector dimensions
    pub dimensions: usize,

    /// Whether to re-normalize returned vectors to unit length
    #[serde(default = "default_normalize")]
    pub normalize: bool,

    /// Maximum number of texts per provider call
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Provider endpoint override (Ollama base URL)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,

    /// Per-request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_normalize() -> bool {
    true
}

fn default_batch_size() -> usize {
    64
}

fn default_timeout_secs() -> u64 {
    30
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: "ollama".to_string(),
            model: "all-minilm".to_string(),
            dimensions: 384,
            normalize: default_normalize(),
            batch_size: default_batch_size(),
            endpoint: None,
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl EmbeddingConfig {
    /// Deterministic offline configuration.
    pub fn mock(dimensions: usize) -> Self {
        Self {
            provider: "mock".to_string(),
            model: "trigram-v1".to_string(),
            dimensions,
            ..Default::default()
        }
    }

    /// Reject settings no provider can work with.
    pub fn validate(&self) -> AppResult<()> {
        if self.dimensions == 0 {
            return Err(AppError::InvalidConfiguration(
                "Embedding dimensions must be positive".to_string(),
            ));
        }
        if self.batch_size == 0 {
            return Err(AppError::InvalidConfiguration(
                "Embedding batch_size must be positive".to_string(),
            ));
        }
        Ok(())
    }

    /// Check that a snapshot built with `other` can be queried with `self`.
    pub fn validate_consistency(&self, other: &Self) -> AppResult<()> {
        if self.provider != other.provider {
            return Err(AppError::InvalidConfiguration(format!(
                "Provider mismatch: expected '{}', got '{}'",
                self.provider, other.provider
            )));
        }

        if self.model != other.model {
            return Err(AppError::InvalidConfiguration(format!(
                "Model mismatch: expected '{}', got '{}'",
                self.model, other.model
            )));
        }

        if self.dimensions != other.dimensions {
            return Err(AppError::DimensionMismatch {
                expected: self.dimensions,
                actual: other.dimensions,
            });
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = EmbeddingConfig::default();
        assert_eq!(config.provider, "ollama");
        assert_eq!(config.dimensions, 384);
        assert!(config.normalize);
        assert_eq!(config.batch_size, 64);
    }

    #[test]
    fn test_yaml_defaults_fill_in() {
        let config: EmbeddingConfig =
            serde_yaml::from_str("provider: mock\nmodel: trigram-v1\ndimensions: 16\n").unwrap();
        assert_eq!(config, EmbeddingConfig::mock(16));
    }

    #[test]
    fn test_validate_rejects_zero_batch() {
        let config = EmbeddingConfig {
            batch_size: 0,
            ..EmbeddingConfig::mock(8)
        };
        assert!(matches!(
            config.validate(),
            Err(AppError::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn test_validate_consistency_dimension_mismatch() {
        let a = EmbeddingConfig::mock(8);
        let b = EmbeddingConfig::mock(16);
        assert!(matches!(
            a.validate_consistency(&b),
            Err(AppError::DimensionMismatch { expected: 8, actual: 16 })
        ));
        assert!(a.validate_consistency(&a.clone()).is_ok());
    }
}
