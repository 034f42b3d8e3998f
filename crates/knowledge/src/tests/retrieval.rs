//! Retrieval service behavior with fixed, hand-picked vectors.

use crate::embeddings::{EmbeddingEngine, EmbeddingProvider};
use crate::{commit_to_base, persist};
use crate::service::RetrievalService;
use crate::types::Document;
use async_trait::async_trait;
use recall_core::{AppError, AppResult};
use std::sync::Arc;
use tempfile::TempDir;

/// Maps known words to fixed 2-d vectors.
#[derive(Debug)]
struct StaticProvider;

fn vector_for(text: &str) -> Vec<f32> {
    match text {
        "east" => vec![1.0, 0.0],
        "north" => vec![0.0, 1.0],
        "northeast" => vec![0.6, 0.8],
        "west" => vec![-1.0, 0.0],
        _ => vec![0.8, 0.6],
    }
}

#[async_trait]
impl EmbeddingProvider for StaticProvider {
    fn provider_name(&self) -> &str {
        "static"
    }

    fn model_name(&self) -> &str {
        "fixed"
    }

    fn dimensions(&self) -> usize {
        2
    }

    async fn embed_batch(&self, texts: &[String]) -> AppResult<Vec<Vec<f32>>> {
        if texts.iter().any(|t| t == "unembeddable") {
            return Err(AppError::Embedding("backend rejected input".to_string()));
        }
        Ok(texts.iter().map(|t| vector_for(t)).collect())
    }
}

fn static_service() -> RetrievalService {
    let engine = EmbeddingEngine::new(Arc::new(StaticProvider), 16, true);
    RetrievalService::new(engine, 100, 10).unwrap()
}

fn docs(words: &[&str]) -> Vec<Document> {
    words
        .iter()
        .enumerate()
        .map(|(i, w)| Document::new(format!("doc{}.txt", i + 1), *w))
        .collect()
}

#[tokio::test]
async fn test_orthogonal_documents_top_hit() {
    let service = static_service();
    service.ingest_documents(docs(&["east", "north"])).await.unwrap();

    let hits = service.query("east", 1).await.unwrap();

    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].chunk.source_document_id, "doc1.txt");
    assert_eq!(hits[0].position, 0);
    assert!((hits[0].score - 1.0).abs() < 1e-6);
}

#[tokio::test]
async fn test_results_ordered_and_capped_by_corpus_size() {
    let service = static_service();
    service
        .ingest_documents(docs(&["east", "north", "northeast", "west"]))
        .await
        .unwrap();

    let hits = service.query("east", 10).await.unwrap();

    assert_eq!(hits.len(), 4);
    for pair in hits.windows(2) {
        assert!(pair[0].score >= pair[1].score);
    }
    let order: Vec<&str> = hits.iter().map(|h| h.chunk.text.as_str()).collect();
    assert_eq!(order, vec!["east", "northeast", "north", "west"]);
}

#[tokio::test]
async fn test_equal_scores_prefer_earlier_position() {
    let service = static_service();
    service
        .ingest_documents(docs(&["north", "east", "east"]))
        .await
        .unwrap();

    let hits = service.query("east", 2).await.unwrap();
    assert_eq!(hits[0].position, 1);
    assert_eq!(hits[1].position, 2);
}

#[tokio::test]
async fn test_repeated_ingestion_keeps_halves_aligned() {
    let service = static_service();
    service.ingest_documents(docs(&["east"])).await.unwrap();
    service
        .ingest_documents(docs(&["north", "west"]))
        .await
        .unwrap();

    let summary = service.summary().await;
    assert_eq!(summary.chunks, 3);
    assert_eq!(summary.documents, 3);

    let hits = service.query("west", 1).await.unwrap();
    assert_eq!(hits[0].position, 2);
    assert_eq!(hits[0].chunk.text, "west");
}

#[tokio::test]
async fn test_embedding_failure_commits_nothing() {
    let service = static_service();
    service.ingest_documents(docs(&["east"])).await.unwrap();

    let result = service
        .ingest_documents(docs(&["north", "unembeddable"]))
        .await;

    assert!(matches!(result, Err(AppError::Embedding(_))));
    let summary = service.summary().await;
    assert_eq!(summary.chunks, 1);
    assert_eq!(summary.documents, 1);
}

#[tokio::test]
async fn test_query_before_any_ingest() {
    let service = static_service();
    assert!(matches!(
        service.query("east", 1).await,
        Err(AppError::NotInitialized)
    ));
}

#[tokio::test]
async fn test_save_load_reproduces_results() {
    let temp = TempDir::new().unwrap();
    let prefix = temp.path().join("snap").join("index");

    let original = static_service();
    original
        .ingest_documents(docs(&["east", "north", "northeast"]))
        .await
        .unwrap();
    original.save(&prefix).await.unwrap();

    let restored = static_service();
    restored.load(&prefix).await.unwrap();

    for query in ["east", "north", "west", "anything else"] {
        let before = original.query(query, 3).await.unwrap();
        let after = restored.query(query, 3).await.unwrap();
        assert_eq!(before.len(), after.len());
        for (a, b) in before.iter().zip(after.iter()) {
            assert_eq!(a.position, b.position);
            assert_eq!(a.chunk, b.chunk);
            assert!((a.score - b.score).abs() < 1e-6);
        }
    }
}

#[tokio::test]
async fn test_load_rejects_store_longer_than_index() {
    let temp = TempDir::new().unwrap();
    let prefix = temp.path().join("index");

    let service = static_service();
    service
        .ingest_documents(docs(&["east", "north", "northeast", "west"]))
        .await
        .unwrap();
    service.save(&prefix).await.unwrap();

    // Add a fifth chunk to the store file without touching the vectors.
    let chunks_file = persist::chunks_path(&prefix);
    let mut snapshot: serde_json::Value =
        serde_json::from_slice(&std::fs::read(&chunks_file).unwrap()).unwrap();
    let extra = snapshot["chunks"][0].clone();
    snapshot["chunks"].as_array_mut().unwrap().push(extra);
    assert_eq!(snapshot["chunks"].as_array().unwrap().len(), 5);
    std::fs::write(&chunks_file, serde_json::to_vec(&snapshot).unwrap()).unwrap();

    let fresh = static_service();
    let result = fresh.load(&prefix).await;

    assert!(matches!(result, Err(AppError::CorruptPersistedState(_))));
    assert!(!fresh.is_initialized().await);
}

#[tokio::test]
async fn test_load_rejects_other_dimension() {
    let temp = TempDir::new().unwrap();
    let prefix = temp.path().join("index");

    let service = static_service();
    service.ingest_documents(docs(&["east"])).await.unwrap();
    service.save(&prefix).await.unwrap();

    let engine = EmbeddingEngine::from_config(&crate::EmbeddingConfig::mock(8))
        .await
        .unwrap();
    let other = RetrievalService::new(engine, 100, 10).unwrap();

    assert!(matches!(
        other.load(&prefix).await,
        Err(AppError::DimensionMismatch { expected: 8, actual: 2 })
    ));
}

#[tokio::test]
async fn test_load_rejects_other_embedding_model() {
    let temp = TempDir::new().unwrap();
    let prefix = temp.path().join("index");

    let service = static_service();
    service.ingest_documents(docs(&["east"])).await.unwrap();
    service.save(&prefix).await.unwrap();
    assert_eq!(
        persist::load_snapshot(&prefix).unwrap().embedding,
        persist::EmbeddingStamp::new("static", "fixed")
    );

    // Same dimension, different embedding space.
    let engine = EmbeddingEngine::from_config(&crate::EmbeddingConfig::mock(2))
        .await
        .unwrap();
    let other = RetrievalService::new(engine, 100, 10).unwrap();

    assert!(matches!(
        other.load(&prefix).await,
        Err(AppError::InvalidConfiguration(_))
    ));
    assert!(!other.is_initialized().await);
}

#[tokio::test]
async fn test_failed_reset_keeps_previous_snapshot() {
    let temp = TempDir::new().unwrap();
    let prefix = temp.path().join("index");

    let service = static_service();
    service
        .ingest_documents(docs(&["east", "north"]))
        .await
        .unwrap();
    service.save(&prefix).await.unwrap();

    let bad = temp.path().join("bad.txt");
    std::fs::write(&bad, "unembeddable").unwrap();
    let result = commit_to_base(&static_service(), &prefix, &[bad], true).await;

    assert!(matches!(result, Err(AppError::Embedding(_))));
    assert_eq!(persist::load(&prefix).unwrap().len(), 2);
}

#[tokio::test]
async fn test_reset_replaces_or_removes_snapshot() {
    let temp = TempDir::new().unwrap();
    let prefix = temp.path().join("index");

    let service = static_service();
    service
        .ingest_documents(docs(&["east", "north"]))
        .await
        .unwrap();
    service.save(&prefix).await.unwrap();

    let good = temp.path().join("good.txt");
    std::fs::write(&good, "west").unwrap();
    let report = commit_to_base(&static_service(), &prefix, &[good], true)
        .await
        .unwrap();
    assert_eq!(report.chunks_indexed, 1);

    let corpus = persist::load(&prefix).unwrap();
    assert_eq!(corpus.len(), 1);
    assert_eq!(corpus.store().get(0).unwrap().text, "west");

    // A reset that indexes nothing leaves no snapshot behind.
    commit_to_base(&static_service(), &prefix, &[], true)
        .await
        .unwrap();
    assert!(!persist::exists(&prefix));
}
