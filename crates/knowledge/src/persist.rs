//! Snapshot persistence for a [`Corpus`].
//!
//! A snapshot is two files sharing a prefix:
//! - `<prefix>.vectors`: magic `RCLV`, version (u32 LE), dimension (u32 LE),
//!   count (u64 LE), then `count * dimension` f32 LE components.
//! - `<prefix>.chunks.json`: ordered chunks and source records, the embedding
//!   provider and model that produced the vectors, and the SHA-256 of the
//!   vectors file it was written with.
//!
//! The pair is only ever loaded together.

use crate::corpus::Corpus;
use crate::store::DocumentStore;
use crate::types::{Chunk, SourceRecord};
use crate::vector_index::{FlatIndex, VectorIndex};
use chrono::{DateTime, Utc};
use recall_core::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};

const MAGIC: &[u8; 4] = b"RCLV";
const FORMAT_VERSION: u32 = 1;
const HEADER_LEN: usize = 4 + 4 + 4 + 8;

const VECTORS_SUFFIX: &str = ".vectors";
const CHUNKS_SUFFIX: &str = ".chunks.json";

/// Provider and model whose vectors a snapshot holds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmbeddingStamp {
    pub provider: String,
    pub model: String,
}

impl EmbeddingStamp {
    pub fn new(provider: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            provider: provider.into(),
            model: model.into(),
        }
    }
}

/// A loaded snapshot pair.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub corpus: Corpus,
    pub embedding: EmbeddingStamp,
}

/// On-disk form of the document store.
#[derive(Debug, Serialize, Deserialize)]
struct StoreSnapshot {
    version: u32,
    dimension: usize,
    embedding: EmbeddingStamp,
    vectors_sha256: String,
    saved_at: DateTime<Utc>,
    sources: Vec<SourceRecord>,
    chunks: Vec<Chunk>,
}

/// Path of the binary vector file for `prefix`.
pub fn vectors_path(prefix: &Path) -> PathBuf {
    with_suffix(prefix, VECTORS_SUFFIX)
}

/// Path of the chunk snapshot for `prefix`.
pub fn chunks_path(prefix: &Path) -> PathBuf {
    with_suffix(prefix, CHUNKS_SUFFIX)
}

fn with_suffix(prefix: &Path, suffix: &str) -> PathBuf {
    let mut name = OsString::from(prefix.as_os_str());
    name.push(suffix);
    PathBuf::from(name)
}

/// Whether any file of the snapshot pair exists.
pub fn exists(prefix: &Path) -> bool {
    vectors_path(prefix).exists() || chunks_path(prefix).exists()
}

/// Combined size in bytes of the snapshot files that exist.
pub fn snapshot_size(prefix: &Path) -> u64 {
    [vectors_path(prefix), chunks_path(prefix)]
        .iter()
        .filter_map(|p| fs::metadata(p).ok())
        .map(|m| m.len())
        .sum()
}

/// Write both snapshot files for `corpus`, whose vectors came from `embedding`.
///
/// Each file is replaced by rename, so an existing pair stays in place until
/// the new one is fully written.
pub fn save(corpus: &Corpus, embedding: &EmbeddingStamp, prefix: &Path) -> AppResult<()> {
    if let Some(parent) = prefix.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }

    let vector_bytes = encode_vectors(corpus.index())?;
    let snapshot = StoreSnapshot {
        version: FORMAT_VERSION,
        dimension: corpus.dimension(),
        embedding: embedding.clone(),
        vectors_sha256: sha256_hex(&vector_bytes),
        saved_at: Utc::now(),
        sources: corpus.store().sources().to_vec(),
        chunks: corpus.store().chunks().to_vec(),
    };
    let json = serde_json::to_vec_pretty(&snapshot)?;

    write_atomic(&vectors_path(prefix), &vector_bytes)?;
    write_atomic(&chunks_path(prefix), &json)?;

    tracing::info!(
        "Saved snapshot {:?}: {} vectors of dimension {}",
        prefix,
        corpus.len(),
        corpus.dimension()
    );
    Ok(())
}

/// Rebuild a corpus from its snapshot pair.
pub fn load(prefix: &Path) -> AppResult<Corpus> {
    load_snapshot(prefix).map(|snapshot| snapshot.corpus)
}

/// Rebuild a corpus and read the embedding stamp it was saved with.
pub fn load_snapshot(prefix: &Path) -> AppResult<Snapshot> {
    let vectors_file = vectors_path(prefix);
    let chunks_file = chunks_path(prefix);

    match (vectors_file.exists(), chunks_file.exists()) {
        (true, true) => {}
        (false, false) => {
            return Err(AppError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("No snapshot at {:?}", prefix),
            )))
        }
        (has_vectors, _) => {
            let missing = if has_vectors { &chunks_file } else { &vectors_file };
            return Err(AppError::CorruptPersistedState(format!(
                "Snapshot is missing {:?}",
                missing
            )));
        }
    }

    let vector_bytes = fs::read(&vectors_file)?;
    let snapshot: StoreSnapshot = serde_json::from_slice(&fs::read(&chunks_file)?)
        .map_err(|e| {
            AppError::CorruptPersistedState(format!("Unreadable {:?}: {}", chunks_file, e))
        })?;

    if snapshot.version != FORMAT_VERSION {
        return Err(AppError::CorruptPersistedState(format!(
            "Unsupported chunk snapshot version {}",
            snapshot.version
        )));
    }

    if snapshot.vectors_sha256 != sha256_hex(&vector_bytes) {
        return Err(AppError::CorruptPersistedState(format!(
            "{:?} does not match the checksum recorded in {:?}",
            vectors_file, chunks_file
        )));
    }

    let index = decode_vectors(&vector_bytes)?;
    if index.dimension() != snapshot.dimension {
        return Err(AppError::CorruptPersistedState(format!(
            "Vector dimension {} disagrees with recorded dimension {}",
            index.dimension(),
            snapshot.dimension
        )));
    }

    let store = DocumentStore::from_parts(snapshot.chunks, snapshot.sources);
    let corpus = Corpus::from_parts(index, store)?;

    tracing::info!(
        "Loaded snapshot {:?}: {} vectors of dimension {} ({}/{})",
        prefix,
        corpus.len(),
        corpus.dimension(),
        snapshot.embedding.provider,
        snapshot.embedding.model
    );
    Ok(Snapshot {
        corpus,
        embedding: snapshot.embedding,
    })
}

/// Delete both snapshot files. Missing files are ignored.
pub fn remove(prefix: &Path) -> AppResult<()> {
    for path in [vectors_path(prefix), chunks_path(prefix)] {
        match fs::remove_file(&path) {
            Ok(()) => tracing::debug!("Removed {:?}", path),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }
    }
    Ok(())
}

fn encode_vectors(index: &FlatIndex) -> AppResult<Vec<u8>> {
    let dimension = u32::try_from(index.dimension()).map_err(|_| {
        AppError::InvalidConfiguration(format!("Dimension {} too large", index.dimension()))
    })?;
    let raw = index.as_raw();

    let mut bytes = Vec::with_capacity(HEADER_LEN + raw.len() * 4);
    bytes.extend_from_slice(MAGIC);
    bytes.extend_from_slice(&FORMAT_VERSION.to_le_bytes());
    bytes.extend_from_slice(&dimension.to_le_bytes());
    bytes.extend_from_slice(&(index.len() as u64).to_le_bytes());
    for &value in raw {
        bytes.extend_from_slice(&value.to_le_bytes());
    }
    Ok(bytes)
}

fn decode_vectors(bytes: &[u8]) -> AppResult<FlatIndex> {
    if bytes.len() < HEADER_LEN || &bytes[0..4] != MAGIC {
        return Err(AppError::CorruptPersistedState(
            "Vector file has no valid header".to_string(),
        ));
    }

    let version = u32::from_le_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]);
    if version != FORMAT_VERSION {
        return Err(AppError::CorruptPersistedState(format!(
            "Unsupported vector file version {}",
            version
        )));
    }

    let dimension = u32::from_le_bytes([bytes[8], bytes[9], bytes[10], bytes[11]]) as usize;
    let mut count_bytes = [0u8; 8];
    count_bytes.copy_from_slice(&bytes[12..20]);
    let count = u64::from_le_bytes(count_bytes);

    let body = &bytes[HEADER_LEN..];
    let expected = usize::try_from(count)
        .ok()
        .and_then(|c| c.checked_mul(dimension))
        .and_then(|n| n.checked_mul(4));
    if dimension == 0 || expected != Some(body.len()) {
        return Err(AppError::CorruptPersistedState(format!(
            "Vector file header declares {} x {} but holds {} bytes",
            count,
            dimension,
            body.len()
        )));
    }

    let data: Vec<f32> = body
        .chunks_exact(4)
        .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
        .collect();

    FlatIndex::from_raw(dimension, data)
}

fn sha256_hex(bytes: &[u8]) -> String {
    format!("{:x}", Sha256::digest(bytes))
}

/// Write through a temporary sibling and rename into place.
fn write_atomic(path: &Path, bytes: &[u8]) -> AppResult<()> {
    let tmp = with_suffix(path, ".tmp");
    fs::write(&tmp, bytes)?;
    fs::rename(&tmp, path)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::corpus::Entry;
    use tempfile::TempDir;

    fn stamp() -> EmbeddingStamp {
        EmbeddingStamp::new("mock", "trigram-v1")
    }

    fn sample_corpus(vectors: &[[f32; 2]]) -> Corpus {
        let mut corpus = Corpus::new(2).unwrap();
        let entries = vectors
            .iter()
            .enumerate()
            .map(|(i, v)| Entry {
                chunk: Chunk {
                    text: format!("chunk {}", i),
                    source_document_id: "doc.txt".to_string(),
                    start_offset: i * 10,
                    ordinal: i as u32,
                },
                vector: v.to_vec(),
            })
            .collect();
        corpus
            .append_document(
                SourceRecord {
                    id: "doc.txt".to_string(),
                    content_type: "text".to_string(),
                    byte_count: 42,
                    chunk_count: vectors.len() as u32,
                    ingested_at: Utc::now(),
                },
                entries,
            )
            .unwrap();
        corpus
    }

    #[test]
    fn test_save_load_preserves_corpus() {
        let temp = TempDir::new().unwrap();
        let prefix = temp.path().join("kb").join("index");
        let corpus = sample_corpus(&[[1.0, 0.0], [0.6, 0.8], [0.0, 1.0]]);

        save(&corpus, &stamp(), &prefix).unwrap();
        assert!(vectors_path(&prefix).exists());
        assert!(chunks_path(&prefix).exists());

        let loaded = load_snapshot(&prefix).unwrap();
        assert_eq!(loaded.corpus, corpus);
        assert_eq!(loaded.embedding, stamp());
    }

    #[test]
    fn test_vector_file_layout() {
        let corpus = sample_corpus(&[[1.0, 0.0]]);
        let bytes = encode_vectors(corpus.index()).unwrap();

        assert_eq!(&bytes[0..4], b"RCLV");
        assert_eq!(bytes.len(), HEADER_LEN + 2 * 4);
        assert_eq!(u32::from_le_bytes([bytes[8], bytes[9], bytes[10], bytes[11]]), 2);
        assert_eq!(bytes[12], 1);
    }

    #[test]
    fn test_load_missing_snapshot_is_io_error() {
        let temp = TempDir::new().unwrap();
        let result = load(&temp.path().join("nothing"));
        assert!(matches!(result, Err(AppError::Io(_))));
    }

    #[test]
    fn test_load_half_snapshot_is_corrupt() {
        let temp = TempDir::new().unwrap();
        let prefix = temp.path().join("index");
        save(&sample_corpus(&[[1.0, 0.0]]), &stamp(), &prefix).unwrap();
        fs::remove_file(chunks_path(&prefix)).unwrap();

        assert!(matches!(
            load(&prefix),
            Err(AppError::CorruptPersistedState(_))
        ));
    }

    #[test]
    fn test_truncated_vector_file_is_corrupt() {
        let corpus = sample_corpus(&[[1.0, 0.0], [0.0, 1.0]]);
        let bytes = encode_vectors(corpus.index()).unwrap();
        let result = decode_vectors(&bytes[..bytes.len() - 4]);
        assert!(matches!(result, Err(AppError::CorruptPersistedState(_))));
    }

    #[test]
    fn test_tampered_vectors_fail_checksum() {
        let temp = TempDir::new().unwrap();
        let prefix = temp.path().join("index");
        save(&sample_corpus(&[[1.0, 0.0]]), &stamp(), &prefix).unwrap();

        let mut bytes = fs::read(vectors_path(&prefix)).unwrap();
        let last = bytes.len() - 1;
        bytes[last] ^= 0xFF;
        fs::write(vectors_path(&prefix), bytes).unwrap();

        assert!(matches!(
            load(&prefix),
            Err(AppError::CorruptPersistedState(_))
        ));
    }

    #[test]
    fn test_remove_deletes_pair() {
        let temp = TempDir::new().unwrap();
        let prefix = temp.path().join("index");
        save(&sample_corpus(&[[1.0, 0.0]]), &stamp(), &prefix).unwrap();
        assert!(snapshot_size(&prefix) > 0);

        remove(&prefix).unwrap();
        assert!(!exists(&prefix));
        remove(&prefix).unwrap();
    }
}
