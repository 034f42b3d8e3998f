//! Positional chunk store co-indexed with the vector index.

use crate::types::{Chunk, SourceRecord};
use recall_core::{AppError, AppResult};

/// Ordered chunks plus one record per ingested document.
///
/// Position `i` here is position `i` in the vector index. Appends are
/// crate-private; outside code mutates through [`crate::corpus::Corpus`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DocumentStore {
    chunks: Vec<Chunk>,
    sources: Vec<SourceRecord>,
}

impl DocumentStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn from_parts(chunks: Vec<Chunk>, sources: Vec<SourceRecord>) -> Self {
        Self { chunks, sources }
    }

    /// Append a chunk and return its position.
    pub(crate) fn append(&mut self, chunk: Chunk) -> usize {
        let position = self.chunks.len();
        self.chunks.push(chunk);
        position
    }

    pub(crate) fn record_source(&mut self, source: SourceRecord) {
        self.sources.push(source);
    }

    /// Chunk at `position`.
    pub fn get(&self, position: usize) -> AppResult<&Chunk> {
        self.chunks.get(position).ok_or(AppError::OutOfRange {
            position,
            len: self.chunks.len(),
        })
    }

    /// Number of chunks.
    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    pub fn chunks(&self) -> &[Chunk] {
        &self.chunks
    }

    pub fn sources(&self) -> &[SourceRecord] {
        &self.sources
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk(text: &str) -> Chunk {
        Chunk {
            text: text.to_string(),
            source_document_id: "doc".to_string(),
            start_offset: 0,
            ordinal: 0,
        }
    }

    #[test]
    fn test_append_returns_old_length() {
        let mut store = DocumentStore::new();
        assert_eq!(store.append(chunk("a")), 0);
        assert_eq!(store.append(chunk("b")), 1);
        assert_eq!(store.len(), 2);
        assert_eq!(store.get(1).unwrap().text, "b");
    }

    #[test]
    fn test_get_out_of_range() {
        let mut store = DocumentStore::new();
        store.append(chunk("a"));
        assert!(matches!(
            store.get(1),
            Err(AppError::OutOfRange { position: 1, len: 1 })
        ));
    }
}
