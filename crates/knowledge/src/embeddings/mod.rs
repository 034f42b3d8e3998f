//! Embedding engine for knowledge bases.
//!
//! Wraps a provider with batching, output validation and normalization.

pub mod config;
pub mod provider;
pub mod providers;

pub use config::EmbeddingConfig;
pub use provider::{create_provider, EmbeddingProvider};

use crate::vector_index::normalize;
use recall_core::{AppError, AppResult};
use std::sync::Arc;

/// A provider plus the settings that govern how it is called.
#[derive(Debug, Clone)]
pub struct EmbeddingEngine {
    provider: Arc<dyn EmbeddingProvider>,
    batch_size: usize,
    normalize: bool,
}

impl EmbeddingEngine {
    /// Build the provider named by `config` and wrap it.
    pub async fn from_config(config: &EmbeddingConfig) -> AppResult<Self> {
        let provider = create_provider(config).await?;
        tracing::debug!(
            "Created embedding provider: provider={}, model={}, dimensions={}",
            provider.provider_name(),
            provider.model_name(),
            provider.dimensions()
        );
        Ok(Self::new(provider, config.batch_size, config.normalize))
    }

    /// Wrap an existing provider.
    pub fn new(provider: Arc<dyn EmbeddingProvider>, batch_size: usize, normalize: bool) -> Self {
        Self {
            provider,
            batch_size: batch_size.max(1),
            normalize,
        }
    }

    pub fn dimensions(&self) -> usize {
        self.provider.dimensions()
    }

    pub fn provider(&self) -> &Arc<dyn EmbeddingProvider> {
        &self.provider
    }

    /// Embed texts in provider batches, preserving input order.
    ///
    /// Any failed batch fails the call. Every returned vector has the
    /// provider's dimension and, when normalization is on, unit length.
    pub async fn embed_texts(&self, texts: &[String]) -> AppResult<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        tracing::info!(
            "Embedding {} texts using provider '{}' (model: {})",
            texts.len(),
            self.provider.provider_name(),
            self.provider.model_name()
        );

        let dimensions = self.dimensions();
        let mut embeddings = Vec::with_capacity(texts.len());

        for batch in texts.chunks(self.batch_size) {
            let mut vectors = self.provider.embed_batch(batch).await?;

            if vectors.len() != batch.len() {
                return Err(AppError::Embedding(format!(
                    "Provider returned {} vectors for {} texts",
                    vectors.len(),
                    batch.len()
                )));
            }
            if let Some(bad) = vectors.iter().find(|v| v.len() != dimensions) {
                return Err(AppError::Embedding(format!(
                    "Provider returned a vector of dimension {}, expected {}",
                    bad.len(),
                    dimensions
                )));
            }
            if self.normalize {
                vectors.iter_mut().for_each(|v| normalize(v));
            }

            embeddings.extend(vectors);
        }

        tracing::debug!(
            "Generated {} embeddings of dimension {}",
            embeddings.len(),
            dimensions
        );

        Ok(embeddings)
    }

    /// Embed a single query text.
    pub async fn embed_query(&self, text: &str) -> AppResult<Vec<f32>> {
        self.embed_texts(&[text.to_string()])
            .await?
            .pop()
            .ok_or_else(|| AppError::Embedding("No embedding returned".to_string()))
    }
}
