//! Text chunking with configurable size and overlap.
//!
//! Sizes and offsets count Unicode scalar values, so a window never splits a
//! multi-byte character.

use crate::types::{Chunk, Document};
use recall_core::{AppError, AppResult};

/// Collapse every whitespace run to a single space and trim both ends.
pub fn clean_text(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Check chunk parameters and return the stride between window starts.
pub fn stride(chunk_size: usize, chunk_overlap: usize) -> AppResult<usize> {
    if chunk_size == 0 || chunk_overlap >= chunk_size {
        return Err(AppError::InvalidConfiguration(format!(
            "chunk_size ({}) must be greater than chunk_overlap ({})",
            chunk_size, chunk_overlap
        )));
    }
    Ok(chunk_size - chunk_overlap)
}

/// Split text into overlapping windows, returning `(start_offset, text)` pairs.
///
/// The text is cleaned first; offsets refer to the cleaned text. Windows are
/// not trimmed: leading and trailing spaces stay in the window, so each window
/// is exactly the cleaned chars from its offset on. Only windows made entirely
/// of whitespace are dropped.
pub fn split_with_offsets(
    text: &str,
    chunk_size: usize,
    chunk_overlap: usize,
) -> AppResult<Vec<(usize, String)>> {
    let step = stride(chunk_size, chunk_overlap)?;
    let cleaned = clean_text(text);

    // Byte position of every char start, plus the end of the string.
    let bounds: Vec<usize> = cleaned
        .char_indices()
        .map(|(i, _)| i)
        .chain(std::iter::once(cleaned.len()))
        .collect();
    let char_len = bounds.len() - 1;

    let mut windows = Vec::new();
    for offset in (0..char_len).step_by(step) {
        let end = (offset + chunk_size).min(char_len);
        let window = &cleaned[bounds[offset]..bounds[end]];
        if window.trim().is_empty() {
            continue;
        }
        windows.push((offset, window.to_string()));
    }

    tracing::trace!(
        "Split {} chars into {} windows (size: {}, overlap: {})",
        char_len,
        windows.len(),
        chunk_size,
        chunk_overlap
    );

    Ok(windows)
}

/// Split text into overlapping windows.
pub fn split_text(text: &str, chunk_size: usize, chunk_overlap: usize) -> AppResult<Vec<String>> {
    Ok(split_with_offsets(text, chunk_size, chunk_overlap)?
        .into_iter()
        .map(|(_, window)| window)
        .collect())
}

/// Chunk a document, attaching provenance to every window.
pub fn chunk_document(
    document: &Document,
    chunk_size: usize,
    chunk_overlap: usize,
) -> AppResult<Vec<Chunk>> {
    let chunks: Vec<Chunk> = split_with_offsets(&document.text, chunk_size, chunk_overlap)?
        .into_iter()
        .enumerate()
        .map(|(ordinal, (start_offset, text))| Chunk {
            text,
            source_document_id: document.id.clone(),
            start_offset,
            ordinal: ordinal as u32,
        })
        .collect();

    tracing::debug!(
        "Chunked '{}' into {} chunks (size: {}, overlap: {})",
        document.id,
        chunks.len(),
        chunk_size,
        chunk_overlap
    );

    Ok(chunks)
}
