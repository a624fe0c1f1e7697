//! Hash-based deterministic embedding provider.
//!
//! Generates reproducible pseudo-embeddings from word and character-trigram
//! hashing, normalised to unit length. Similarity reflects lexical overlap,
//! not semantics; it keeps the engine fully functional without an external
//! provider and gives tests stable vectors.

use crate::embedding::EmbeddingProvider;
use crate::error::ProviderError;
use rayon::prelude::*;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

/// Deterministic hash-based provider.
///
/// # Examples
///
/// ```
/// use corpus_rs::embedding::{DEFAULT_DIMENSIONS, EmbeddingProvider, HashEmbeddingProvider};
///
/// let provider = HashEmbeddingProvider::new(DEFAULT_DIMENSIONS);
/// let a = provider.embed("hello world").unwrap();
/// let b = provider.embed("hello world").unwrap();
/// assert_eq!(a, b);
/// ```
pub struct HashEmbeddingProvider {
    dimensions: usize,
}

impl HashEmbeddingProvider {
    /// Creates a provider with the given dimensionality.
    #[must_use]
    pub const fn new(dimensions: usize) -> Self {
        Self { dimensions }
    }

    fn hash_string(s: &str) -> u64 {
        let mut hasher = DefaultHasher::new();
        s.hash(&mut hasher);
        hasher.finish()
    }

    #[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation)]
    fn generate(&self, text: &str) -> Vec<f32> {
        let mut embedding = vec![0.0f32; self.dimensions];

        // Stop words would dominate the overlap signal between unrelated
        // texts, so they are dropped before hashing.
        let normalized: String = text
            .chars()
            .map(|c| {
                if c.is_alphanumeric() || c.is_whitespace() {
                    c.to_ascii_lowercase()
                } else {
                    ' '
                }
            })
            .collect();
        let normalized: String = normalized
            .split_whitespace()
            .filter(|word| !crate::embedding::multiscale::STOP_WORDS.contains(word))
            .collect::<Vec<_>>()
            .join(" ");

        // Word-level hashing carries the primary signal.
        for word in normalized.split_whitespace() {
            let hash = Self::hash_string(word);
            let idx = (hash as usize) % self.dimensions;
            let sign = if (hash >> 32) & 1 == 0 { 1.0 } else { -1.0 };
            let magnitude = 1.0 + ((hash >> 16) & 0xFF) as f32 / 255.0;
            embedding[idx] += sign * magnitude;
        }

        // Character trigrams add fuzzy overlap between related word forms.
        let chars: Vec<char> = normalized.chars().collect();
        if chars.len() >= 3 {
            for window in chars.windows(3) {
                let trigram: String = window.iter().collect();
                let hash = Self::hash_string(&trigram);
                let idx = (hash as usize) % self.dimensions;
                let sign = if (hash >> 32) & 1 == 0 { 0.5 } else { -0.5 };
                embedding[idx] += sign;
            }
        }

        let magnitude: f32 = embedding.iter().map(|x| x * x).sum::<f32>().sqrt();
        if magnitude > 0.0 {
            for val in &mut embedding {
                *val /= magnitude;
            }
        }

        embedding
    }
}

impl EmbeddingProvider for HashEmbeddingProvider {
    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn embed_batch(&self, texts: &[&str]) -> std::result::Result<Vec<Vec<f32>>, ProviderError> {
        if texts.iter().any(|t| t.is_empty()) {
            return Err(ProviderError::InvalidInput { reason: "empty input text".to_string() });
        }
        Ok(texts.par_iter().map(|text| self.generate(text)).collect())
    }
}
