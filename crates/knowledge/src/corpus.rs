//! Vector index and document store held as one unit.
//!
//! Every mutation appends to both sides together, so `index.len() ==
//! store.len()` holds after every call.

use crate::store::DocumentStore;
use crate::types::{Chunk, ScoredChunk, SourceRecord};
use crate::vector_index::{FlatIndex, VectorIndex};
use recall_core::{AppError, AppResult};
use std::ops::Range;

/// A chunk paired with its embedding, ready to be appended.
#[derive(Debug, Clone)]
pub struct Entry {
    pub chunk: Chunk,
    pub vector: Vec<f32>,
}

/// Co-indexed vector index and document store.
#[derive(Debug, Clone, PartialEq)]
pub struct Corpus {
    index: FlatIndex,
    store: DocumentStore,
}

impl Corpus {
    /// Create an empty corpus for vectors of `dimension` components.
    pub fn new(dimension: usize) -> AppResult<Self> {
        Ok(Self {
            index: FlatIndex::new(dimension)?,
            store: DocumentStore::new(),
        })
    }

    /// Assemble a corpus from independently loaded halves.
    ///
    /// Fails with `CorruptPersistedState` when the halves disagree in length.
    pub fn from_parts(index: FlatIndex, store: DocumentStore) -> AppResult<Self> {
        if index.len() != store.len() {
            return Err(AppError::CorruptPersistedState(format!(
                "vector index holds {} vectors but document store holds {} chunks",
                index.len(),
                store.len()
            )));
        }
        Ok(Self { index, store })
    }

    pub fn dimension(&self) -> usize {
        self.index.dimension()
    }

    pub fn len(&self) -> usize {
        self.store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }

    pub fn index(&self) -> &FlatIndex {
        &self.index
    }

    pub fn store(&self) -> &DocumentStore {
        &self.store
    }

    /// Append a document's entries and its source record.
    ///
    /// Returns the positions assigned to the entries.
    pub fn append_document(
        &mut self,
        source: SourceRecord,
        entries: Vec<Entry>,
    ) -> AppResult<Range<usize>> {
        let start = self.len();
        self.append_batch(vec![(source, entries)])?;
        Ok(start..self.len())
    }

    /// Append several documents as one unit.
    ///
    /// Every vector is checked before anything is written, so on error the
    /// corpus is unchanged.
    pub fn append_batch(&mut self, documents: Vec<(SourceRecord, Vec<Entry>)>) -> AppResult<()> {
        let dimension = self.dimension();
        if let Some(bad) = documents
            .iter()
            .flat_map(|(_, entries)| entries)
            .find(|e| e.vector.len() != dimension)
        {
            return Err(AppError::DimensionMismatch {
                expected: dimension,
                actual: bad.vector.len(),
            });
        }

        for (source, entries) in documents {
            let (chunks, vectors): (Vec<Chunk>, Vec<Vec<f32>>) =
                entries.into_iter().map(|e| (e.chunk, e.vector)).unzip();
            self.index.add(&vectors)?;
            for chunk in chunks {
                self.store.append(chunk);
            }
            self.store.record_source(source);
        }

        debug_assert_eq!(self.index.len(), self.store.len());
        Ok(())
    }

    /// Top-k chunks for a query vector, highest score first.
    pub fn search(&self, query: &[f32], k: usize) -> AppResult<Vec<ScoredChunk>> {
        self.index
            .search(query, k)?
            .into_iter()
            .map(|(position, score)| {
                Ok(ScoredChunk {
                    position,
                    score,
                    chunk: self.store.get(position)?.clone(),
                })
            })
            .collect()
    }

    /// Chunk at `position`.
    pub fn chunk(&self, position: usize) -> AppResult<&Chunk> {
        self.store.get(position)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn source(id: &str, chunk_count: u32) -> SourceRecord {
        SourceRecord {
            id: id.to_string(),
            content_type: "text".to_string(),
            byte_count: 10,
            chunk_count,
            ingested_at: Utc::now(),
        }
    }

    fn entry(doc: &str, text: &str, vector: Vec<f32>) -> Entry {
        Entry {
            chunk: Chunk {
                text: text.to_string(),
                source_document_id: doc.to_string(),
                start_offset: 0,
                ordinal: 0,
            },
            vector,
        }
    }

    #[test]
    fn test_append_keeps_halves_aligned() {
        let mut corpus = Corpus::new(2).unwrap();
        let range = corpus
            .append_document(
                source("a", 2),
                vec![
                    entry("a", "first", vec![1.0, 0.0]),
                    entry("a", "second", vec![0.0, 1.0]),
                ],
            )
            .unwrap();

        assert_eq!(range, 0..2);
        assert_eq!(corpus.index().len(), corpus.store().len());
        assert_eq!(corpus.store().sources().len(), 1);
    }

    #[test]
    fn test_rejected_append_leaves_corpus_unchanged() {
        let mut corpus = Corpus::new(2).unwrap();
        corpus
            .append_document(source("a", 1), vec![entry("a", "ok", vec![1.0, 0.0])])
            .unwrap();
        let before = corpus.clone();

        let result = corpus.append_document(
            source("b", 2),
            vec![
                entry("b", "fine", vec![0.0, 1.0]),
                entry("b", "bad", vec![0.0, 1.0, 0.0]),
            ],
        );

        assert!(matches!(result, Err(AppError::DimensionMismatch { .. })));
        assert_eq!(corpus, before);
    }

    #[test]
    fn test_search_joins_store() {
        let mut corpus = Corpus::new(2).unwrap();
        corpus
            .append_document(source("one", 1), vec![entry("one", "east", vec![1.0, 0.0])])
            .unwrap();
        corpus
            .append_document(source("two", 1), vec![entry("two", "north", vec![0.0, 1.0])])
            .unwrap();

        let hits = corpus.search(&[1.0, 0.0], 1).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].chunk.text, "east");
        assert_eq!(hits[0].chunk.source_document_id, "one");
        assert!((hits[0].score - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_from_parts_rejects_mismatch() {
        let mut index = FlatIndex::new(2).unwrap();
        index.add(&[vec![1.0, 0.0]]).unwrap();
        let result = Corpus::from_parts(index, DocumentStore::new());
        assert!(matches!(result, Err(AppError::CorruptPersistedState(_))));
    }
}
