//! Deterministic offline embedding provider.

use crate::embeddings::provider::EmbeddingProvider;
use crate::vector_index::normalize;
use recall_core::AppResult;
use std::collections::BTreeMap;

const STOP_WORDS: &[&str] = &[
    "the", "is", "at", "which", "on", "a", "an", "as", "are", "was", "were", "for", "to", "of",
    "in", "and", "or", "but", "with", "by", "from", "this", "that", "be", "have", "has", "had",
    "it", "its", "their", "they", "them",
];

/// Hashed bag-of-words provider for tests and offline use.
///
/// Each word contributes to one bucket for the whole word and one bucket per
/// padded character trigram, with a sign taken from the hash so unrelated
/// words tend to cancel instead of pile up. Texts sharing vocabulary score
/// high against each other; the vectors carry no real semantics. Text with no
/// usable words maps to the zero vector.
#[derive(Debug)]
pub struct MockProvider {
    dimensions: usize,
}

impl MockProvider {
    /// Create a new mock provider with specified dimensions.
    pub fn new(dimensions: usize) -> Self {
        Self { dimensions }
    }

    fn embed_text(&self, text: &str) -> Vec<f32> {
        let mut embedding = vec![0.0f32; self.dimensions];

        let lower = text.to_lowercase();
        let mut frequencies: BTreeMap<&str, u32> = BTreeMap::new();
        for word in lower
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| w.chars().count() > 1 && !STOP_WORDS.contains(w))
        {
            *frequencies.entry(word).or_insert(0) += 1;
        }

        for (word, freq) in frequencies {
            let weight = (freq as f32).sqrt();
            self.accumulate(&mut embedding, word.as_bytes(), 2.0 * weight);

            let padded: Vec<char> = std::iter::once('^')
                .chain(word.chars())
                .chain(std::iter::once('$'))
                .collect();
            for trigram in padded.windows(3) {
                let key: String = trigram.iter().collect();
                self.accumulate(&mut embedding, key.as_bytes(), weight);
            }
        }

        normalize(&mut embedding);
        embedding
    }

    fn accumulate(&self, embedding: &mut [f32], key: &[u8], weight: f32) {
        let hash = fnv1a(key);
        let bucket = (hash % self.dimensions as u64) as usize;
        let sign = if hash >> 63 == 0 { 1.0 } else { -1.0 };
        embedding[bucket] += sign * weight;
    }
}

fn fnv1a(bytes: &[u8]) -> u64 {
    bytes.iter().fold(0xcbf2_9ce4_8422_2325u64, |acc, &b| {
        (acc ^ b as u64).wrapping_mul(0x0100_0000_01b3)
    })
}

#[async_trait::async_trait]
impl EmbeddingProvider for MockProvider {
    fn provider_name(&self) -> &str {
        "mock"
    }

    fn model_name(&self) -> &str {
        "trigram-v1"
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    async fn embed_batch(&self, texts: &[String]) -> AppResult<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|text| self.embed_text(text)).collect())
    }
}
