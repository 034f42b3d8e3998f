//! Embedding provider trait and factory.

use crate::embeddings::config::EmbeddingConfig;
use crate::embeddings::providers::{mock::MockProvider, ollama::OllamaProvider};
use recall_core::{AppError, AppResult};
use std::sync::Arc;

/// Trait for embedding providers.
///
/// `embed_batch` returns one vector per input, in input order, each of
/// `dimensions()` components. A failure for any input fails the whole batch.
#[async_trait::async_trait]
pub trait EmbeddingProvider: Send + Sync + std::fmt::Debug {
    /// Get provider name (e.g., "mock", "ollama")
    fn provider_name(&self) -> &str;

    /// Get model identifier
    fn model_name(&self) -> &str;

    /// Get embedding dimensions
    fn dimensions(&self) -> usize;

    /// Generate embeddings for multiple texts in a batch.
    async fn embed_batch(&self, texts: &[String]) -> AppResult<Vec<Vec<f32>>>;

    /// Generate embedding for a single text.
    async fn embed(&self, text: &str) -> AppResult<Vec<f32>> {
        let mut results = self.embed_batch(&[text.to_string()]).await?;
        results
            .pop()
            .ok_or_else(|| AppError::Embedding("No embedding returned".to_string()))
    }
}

/// Create an embedding provider based on configuration.
///
/// Remote providers are contacted once here so an unreachable backend fails at
/// startup rather than on the first query.
pub async fn create_provider(config: &EmbeddingConfig) -> AppResult<Arc<dyn EmbeddingProvider>> {
    config.validate()?;

    match config.provider.as_str() {
        "mock" => Ok(Arc::new(MockProvider::new(config.dimensions))),

        "ollama" => Ok(Arc::new(OllamaProvider::new(config).await?)),

        _ => Err(AppError::InvalidConfiguration(format!(
            "Unknown embedding provider: '{}'. Supported providers: mock, ollama",
            config.provider
        ))),
    }
}
