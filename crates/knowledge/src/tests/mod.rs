//! Cross-module tests for ingestion, retrieval and persistence.

mod retrieval;
