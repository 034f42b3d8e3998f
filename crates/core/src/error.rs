//! Error types for Recall.
//!
//! A single error enum covers configuration, ingestion, embedding, retrieval
//! and persistence failures so every layer can propagate with `?`.

use thiserror::Error;

/// Unified error type for Recall.
///
/// All fallible functions return `Result<T, AppError>`.
#[derive(Error, Debug)]
pub enum AppError {
    /// Application configuration errors (config files, log filters, workspace)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Invalid retrieval parameters, e.g. a non-positive chunk stride
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// Ingestion input whose file type is not recognized
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    /// The embedding collaborator failed or returned unusable vectors
    #[error("Embedding error: {0}")]
    Embedding(String),

    /// A search was attempted against an index with no vectors
    #[error("Vector index is empty")]
    EmptyIndex,

    /// A query was attempted before any documents were ingested or loaded
    #[error("Retrieval service is not initialized: ingest documents or load a snapshot first")]
    NotInitialized,

    /// A document store lookup past the end of the store
    #[error("Position {position} is out of range (length {len})")]
    OutOfRange { position: usize, len: usize },

    /// A vector whose length differs from the index dimension
    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// Persisted snapshot that cannot be trusted
    #[error("Corrupt persisted state: {0}")]
    CorruptPersistedState(String),

    /// I/O and filesystem errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

impl From<serde_yaml::Error> for AppError {
    fn from(err: serde_yaml::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

/// Convenience type alias for Results with AppError.
pub type AppResult<T> = Result<T, AppError>;
