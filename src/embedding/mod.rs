//! Embedding generation: provider contract, multi-scale embedder, cache.
//!
//! The engine depends on a provider capability that turns batches of UTF-8
//! strings into fixed-dimension float vectors with a retry-friendly error
//! taxonomy. A deterministic hash-based provider ships in-tree for tests and
//! provider-less deployments; real providers plug in behind the same trait.

pub mod cache;
pub mod fallback;
pub mod limiter;
pub mod multiscale;

pub use cache::EmbeddingCache;
pub use fallback::HashEmbeddingProvider;
pub use limiter::TokenBucket;
pub use multiscale::{EmbedOutcome, MultiScaleEmbedder};

use crate::error::ProviderError;

/// Default embedding dimensions for the in-tree hash provider.
pub const DEFAULT_DIMENSIONS: usize = 384;

/// Capability contract for embedding providers.
///
/// Implementations must be thread-safe; batches are issued from parallel
/// pipeline workers. `dimensions` is advertised once at initialisation and
/// frozen for the store's lifetime.
pub trait EmbeddingProvider: Send + Sync {
    /// The fixed dimensionality `D` of every returned vector.
    fn dimensions(&self) -> usize;

    /// Embeds a batch of texts, one vector per input, in input order.
    ///
    /// # Errors
    ///
    /// Returns a [`ProviderError`] classified for retry policy.
    fn embed_batch(&self, texts: &[&str]) -> std::result::Result<Vec<Vec<f32>>, ProviderError>;

    /// Embeds a single text.
    ///
    /// # Errors
    ///
    /// Returns a [`ProviderError`] classified for retry policy.
    fn embed(&self, text: &str) -> std::result::Result<Vec<f32>, ProviderError> {
        let mut batch = self.embed_batch(&[text])?;
        batch.pop().ok_or_else(|| ProviderError::Fatal {
            reason: "provider returned empty batch".to_string(),
        })
    }
}

/// Computes cosine similarity between two embedding vectors.
///
/// Returns a value between -1.0 and 1.0; 0.0 for mismatched lengths or zero
/// magnitude.
#[must_use]
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }

    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let mag_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let mag_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if mag_a == 0.0 || mag_b == 0.0 {
        return 0.0;
    }

    dot / (mag_a * mag_b)
}

/// Validates and normalises a provider vector.
///
/// Checks length against `dimensions`, rejects non-finite components and
/// zero magnitude, and returns the unit-length vector.
///
/// # Errors
///
/// Returns `ProviderError::QualityCheck` naming the failed check.
pub fn normalise_checked(
    vector: Vec<f32>,
    dimensions: usize,
) -> std::result::Result<Vec<f32>, ProviderError> {
    if vector.len() != dimensions {
        return Err(ProviderError::QualityCheck {
            reason: format!("length {} != {dimensions}", vector.len()),
        });
    }
    if vector.iter().any(|v| !v.is_finite()) {
        return Err(ProviderError::QualityCheck { reason: "non-finite component".to_string() });
    }
    let magnitude: f32 = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
    if magnitude == 0.0 {
        return Err(ProviderError::QualityCheck { reason: "zero magnitude".to_string() });
    }
    let normalised: Vec<f32> = vector.iter().map(|v| v / magnitude).collect();
    let check: f32 = normalised.iter().map(|v| v * v).sum::<f32>().sqrt();
    if !(0.9..=1.1).contains(&check) {
        return Err(ProviderError::QualityCheck {
            reason: format!("post-normalisation magnitude {check}"),
        });
    }
    Ok(normalised)
}
