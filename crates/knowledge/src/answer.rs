//! Extractive answers built from retrieved chunks.

use crate::types::ScoredChunk;
use serde::{Deserialize, Serialize};

/// Answer returned when retrieval finds nothing.
pub const NO_RESULTS_ANSWER: &str = "No relevant information found in the documents.";

/// Number of top-ranked chunks quoted in an answer.
const CONTEXT_CHUNKS: usize = 2;

/// Maximum characters quoted from each chunk.
const MAX_EXCERPT_CHARS: usize = 500;

/// An answer plus the chunks it was composed from.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Answer {
    pub question: String,
    pub answer: String,
    pub sources: Vec<ScoredChunk>,
}

/// Compose an answer quoting the top chunks.
///
/// `hits` must already be ordered best first.
pub fn compose_answer(question: &str, hits: &[ScoredChunk]) -> Answer {
    if hits.is_empty() {
        return Answer {
            question: question.to_string(),
            answer: NO_RESULTS_ANSWER.to_string(),
            sources: Vec::new(),
        };
    }

    let used = &hits[..hits.len().min(CONTEXT_CHUNKS)];
    let context = used
        .iter()
        .map(|hit| excerpt(&hit.chunk.text))
        .collect::<Vec<_>>()
        .join("\n");

    let answer = format!(
        "Based on the documents, here's what I found:\n\n{}\n\nThis information is extracted from your documents and may help answer your question: \"{}\"\n",
        context, question
    );

    Answer {
        question: question.to_string(),
        answer,
        sources: used.to_vec(),
    }
}

fn excerpt(text: &str) -> &str {
    match text.char_indices().nth(MAX_EXCERPT_CHARS) {
        Some((byte, _)) => &text[..byte],
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Chunk;

    fn hit(position: usize, text: &str) -> ScoredChunk {
        ScoredChunk {
            position,
            score: 1.0 - position as f32 * 0.1,
            chunk: Chunk {
                text: text.to_string(),
                source_document_id: "doc.txt".to_string(),
                start_offset: 0,
                ordinal: position as u32,
            },
        }
    }

    #[test]
    fn test_no_hits() {
        let answer = compose_answer("anything?", &[]);
        assert_eq!(answer.answer, NO_RESULTS_ANSWER);
        assert!(answer.sources.is_empty());
    }

    #[test]
    fn test_uses_top_two_chunks() {
        let hits = vec![hit(0, "alpha"), hit(1, "beta"), hit(2, "gamma")];
        let answer = compose_answer("what?", &hits);

        assert!(answer.answer.starts_with("Based on the documents, here's what I found:\n\nalpha\nbeta\n\n"));
        assert!(answer.answer.ends_with("answer your question: \"what?\"\n"));
        assert!(!answer.answer.contains("gamma"));
        assert_eq!(answer.sources.len(), 2);
    }

    #[test]
    fn test_excerpt_truncates_by_character() {
        let long = "é".repeat(600);
        assert_eq!(excerpt(&long).chars().count(), 500);
        assert_eq!(excerpt("short"), "short");
    }
}
