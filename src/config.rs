//! Engine configuration surface.
//!
//! The configuration is a closed record: every section uses
//! `deny_unknown_fields`, so unrecognised options are rejected when the
//! config is loaded rather than silently ignored. Defaults match the
//! documented engine behaviour; [`EngineConfig::validate`] enforces value
//! sanity at startup.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Top-level engine configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields, default)]
pub struct EngineConfig {
    /// Quality gates for chunks, embeddings and whole documents.
    pub quality: QualityConfig,
    /// Chunking bands and boundary refinement.
    pub chunking: ChunkingConfig,
    /// Embedding kinds, batching and caching.
    pub embedding: EmbeddingConfig,
    /// Retrieval weights, matrix overrides and diversity caps.
    pub retrieval: RetrievalConfig,
    /// Job parallelism, channel capacities and timeouts.
    pub concurrency: ConcurrencyConfig,
}

impl EngineConfig {
    /// Loads configuration from a JSON file, rejecting unknown keys.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the file cannot be read, contains
    /// unknown options, or fails validation.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let raw = std::fs::read_to_string(path.as_ref()).map_err(|e| {
            Error::config(format!(
                "cannot read config {}: {e}",
                path.as_ref().display()
            ))
        })?;
        let config: Self = serde_json::from_str(&raw)
            .map_err(|e| Error::config(format!("invalid config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Validates value ranges across all sections.
    ///
    /// # Errors
    ///
    /// Returns a configuration error naming the first offending option.
    pub fn validate(&self) -> Result<()> {
        self.quality.validate()?;
        self.chunking.validate()?;
        self.embedding.validate()?;
        self.retrieval.validate()?;
        self.concurrency.validate()
    }
}

/// Quality thresholds applied during ingestion.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields, default)]
pub struct QualityConfig {
    /// Chunks scoring below this are never persisted.
    pub min_chunk_quality: f64,
    /// Minimum acceptable per-vector quality (magnitude band check weight).
    pub min_embedding_quality: f64,
    /// Overall document score (0-100 scale, normalised) warning threshold.
    pub min_overall_quality: f64,
    /// Jaccard similarity at or above which chunks are flagged near-duplicates.
    pub max_duplicate_threshold: f64,
}

impl Default for QualityConfig {
    fn default() -> Self {
        Self {
            min_chunk_quality: 0.4,
            min_embedding_quality: 0.6,
            min_overall_quality: 0.5,
            max_duplicate_threshold: 0.9,
        }
    }
}

impl QualityConfig {
    fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("quality.min_chunk_quality", self.min_chunk_quality),
            ("quality.min_embedding_quality", self.min_embedding_quality),
            ("quality.min_overall_quality", self.min_overall_quality),
            ("quality.max_duplicate_threshold", self.max_duplicate_threshold),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(Error::config(format!("{name} must be in [0,1], got {value}")));
            }
        }
        Ok(())
    }
}

/// Target token band for one chunk scale.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct TokenBand {
    /// Target lower bound in tokens.
    pub min: usize,
    /// Target upper bound in tokens.
    pub max: usize,
}

impl TokenBand {
    /// Creates a band.
    #[must_use]
    pub const fn new(min: usize, max: usize) -> Self {
        Self { min, max }
    }

    /// Whether a token count falls inside the band.
    #[must_use]
    pub const fn contains(&self, tokens: usize) -> bool {
        tokens >= self.min && tokens <= self.max
    }
}

/// Chunking bands and refinement thresholds.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields, default)]
pub struct ChunkingConfig {
    /// Token band for document-scale chunks.
    pub document_band: TokenBand,
    /// Token band for section-scale chunks.
    pub section_band: TokenBand,
    /// Token band for paragraph-scale chunks.
    pub paragraph_band: TokenBand,
    /// Token band for sentence-scale chunks.
    pub sentence_band: TokenBand,
    /// Hard minimum tokens for any chunk.
    pub hard_min_tokens: usize,
    /// Hard maximum tokens for any chunk.
    pub hard_max_tokens: usize,
    /// Adjacent-boundary similarity above which paragraphs are merged.
    pub sentence_similarity_threshold: f64,
    /// Whether to run the semantic boundary refinement pass.
    pub semantic_refinement: bool,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            document_band: TokenBand::new(4_000, 8_000),
            section_band: TokenBand::new(500, 2_000),
            paragraph_band: TokenBand::new(100, 500),
            sentence_band: TokenBand::new(20, 150),
            hard_min_tokens: 20,
            hard_max_tokens: 10_000,
            sentence_similarity_threshold: 0.3,
            semantic_refinement: true,
        }
    }
}

impl ChunkingConfig {
    fn validate(&self) -> Result<()> {
        for (name, band) in [
            ("chunking.document_band", self.document_band),
            ("chunking.section_band", self.section_band),
            ("chunking.paragraph_band", self.paragraph_band),
            ("chunking.sentence_band", self.sentence_band),
        ] {
            if band.min == 0 || band.min > band.max {
                return Err(Error::config(format!(
                    "{name} must satisfy 0 < min <= max, got {}..{}",
                    band.min, band.max
                )));
            }
        }
        if self.hard_max_tokens < self.hard_min_tokens {
            return Err(Error::config(
                "chunking.hard_max_tokens must be >= hard_min_tokens",
            ));
        }
        if !(0.0..=1.0).contains(&self.sentence_similarity_threshold) {
            return Err(Error::config(
                "chunking.sentence_similarity_threshold must be in [0,1]",
            ));
        }
        Ok(())
    }
}

/// Embedding kinds, batch bounds, cache and rate limiting.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields, default)]
pub struct EmbeddingConfig {
    /// Whether content embeddings are computed. At least one kind must be on.
    pub content: bool,
    /// Whether contextual embeddings are computed.
    pub contextual: bool,
    /// Whether hierarchical embeddings are computed.
    pub hierarchical: bool,
    /// Whether semantic (keyword) embeddings are computed.
    pub semantic: bool,
    /// Maximum inputs per provider call.
    pub batch_size: usize,
    /// Maximum total input bytes per provider call.
    pub max_batch_bytes: usize,
    /// Maximum concurrent in-flight provider calls.
    pub concurrency: usize,
    /// Maximum retry attempts for transient/rate-limited failures.
    pub max_retries: u32,
    /// Maximum cache entries (LRU eviction).
    pub cache_entries: usize,
    /// Provider requests per second (shared token bucket).
    pub requests_per_second: u32,
    /// Domain lexicon used by the semantic kind (keyword supplementation).
    pub domain_terms: Vec<String>,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            content: true,
            contextual: true,
            hierarchical: true,
            semantic: true,
            batch_size: 16,
            max_batch_bytes: 64 * 1024,
            concurrency: 4,
            max_retries: 5,
            cache_entries: 10_000,
            requests_per_second: 60,
            domain_terms: Vec::new(),
        }
    }
}

impl EmbeddingConfig {
    fn validate(&self) -> Result<()> {
        if !(self.content || self.contextual || self.hierarchical || self.semantic) {
            return Err(Error::config("embedding: at least one kind must be enabled"));
        }
        if self.batch_size == 0 {
            return Err(Error::config("embedding.batch_size must be > 0"));
        }
        if self.concurrency == 0 {
            return Err(Error::config("embedding.concurrency must be > 0"));
        }
        if self.requests_per_second == 0 {
            return Err(Error::config("embedding.requests_per_second must be > 0"));
        }
        Ok(())
    }
}

/// Blended-score weights and diversity caps for retrieval.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields, default)]
pub struct RetrievalConfig {
    /// Weight of the vector-similarity component.
    pub vector_weight: f64,
    /// Weight of the content-type match component.
    pub content_type_weight: f64,
    /// Weight of the instructional-value component.
    pub instructional_weight: f64,
    /// Weight of the chunk-quality component.
    pub quality_weight: f64,
    /// Weight of the contextual-relevance component.
    pub contextual_weight: f64,
    /// Overrides for the content-type match matrix, keyed
    /// `"queryType:contentType"`.
    pub matrix_overrides: std::collections::BTreeMap<String, f64>,
    /// Maximum returned chunks per source.
    pub max_chunks_per_source: usize,
    /// Maximum returned chunks per page.
    pub max_chunks_per_page: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            vector_weight: 0.40,
            content_type_weight: 0.25,
            instructional_weight: 0.20,
            quality_weight: 0.10,
            contextual_weight: 0.05,
            matrix_overrides: std::collections::BTreeMap::new(),
            max_chunks_per_source: 3,
            max_chunks_per_page: 2,
        }
    }
}

impl RetrievalConfig {
    fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("retrieval.vector_weight", self.vector_weight),
            ("retrieval.content_type_weight", self.content_type_weight),
            ("retrieval.instructional_weight", self.instructional_weight),
            ("retrieval.quality_weight", self.quality_weight),
            ("retrieval.contextual_weight", self.contextual_weight),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(Error::config(format!("{name} must be in [0,1], got {value}")));
            }
        }
        if self.max_chunks_per_source == 0 || self.max_chunks_per_page == 0 {
            return Err(Error::config("retrieval diversity caps must be > 0"));
        }
        Ok(())
    }
}

/// Job parallelism, backpressure and soft timeouts.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields, default)]
pub struct ConcurrencyConfig {
    /// Maximum source jobs ingesting in parallel.
    pub max_concurrent_jobs: usize,
    /// Bounded channel capacity between pipeline stages.
    pub channel_capacity: usize,
    /// Soft timeout for a whole-document ingestion, in seconds.
    pub ingestion_timeout_secs: u64,
    /// Soft timeout for one embedding provider call, in seconds.
    pub embedding_timeout_secs: u64,
    /// Soft timeout for a retrieval request, in seconds.
    pub retrieval_timeout_secs: u64,
}

impl Default for ConcurrencyConfig {
    fn default() -> Self {
        Self {
            max_concurrent_jobs: 5,
            channel_capacity: 32,
            ingestion_timeout_secs: 120,
            embedding_timeout_secs: 30,
            retrieval_timeout_secs: 5,
        }
    }
}

impl ConcurrencyConfig {
    fn validate(&self) -> Result<()> {
        if self.max_concurrent_jobs == 0 {
            return Err(Error::config("concurrency.max_concurrent_jobs must be > 0"));
        }
        if self.channel_capacity == 0 {
            return Err(Error::config("concurrency.channel_capacity must be > 0"));
        }
        Ok(())
    }

    /// Whole-document ingestion deadline.
    #[must_use]
    pub const fn ingestion_timeout(&self) -> Duration {
        Duration::from_secs(self.ingestion_timeout_secs)
    }

    /// Per-provider-call deadline.
    #[must_use]
    pub const fn embedding_timeout(&self) -> Duration {
        Duration::from_secs(self.embedding_timeout_secs)
    }

    /// Retrieval request deadline.
    #[must_use]
    pub const fn retrieval_timeout(&self) -> Duration {
        Duration::from_secs(self.retrieval_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_documented_values() {
        let config = EngineConfig::default();
        assert!((config.quality.min_chunk_quality - 0.4).abs() < f64::EPSILON);
        assert!((config.quality.min_embedding_quality - 0.6).abs() < f64::EPSILON);
        assert_eq!(config.chunking.document_band, TokenBand::new(4_000, 8_000));
        assert_eq!(config.chunking.sentence_band, TokenBand::new(20, 150));
        assert_eq!(config.chunking.hard_max_tokens, 10_000);
        assert_eq!(config.embedding.batch_size, 16);
        assert_eq!(config.embedding.concurrency, 4);
        assert_eq!(config.embedding.requests_per_second, 60);
        assert!((config.retrieval.vector_weight - 0.40).abs() < f64::EPSILON);
        assert_eq!(config.retrieval.max_chunks_per_source, 3);
        assert_eq!(config.retrieval.max_chunks_per_page, 2);
        assert_eq!(config.concurrency.max_concurrent_jobs, 5);
        assert_eq!(config.concurrency.channel_capacity, 32);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_unknown_key_rejected() {
        let raw = r#"{"quality": {"min_chunk_quality": 0.5, "shiny_new_option": 1}}"#;
        let parsed: std::result::Result<EngineConfig, _> = serde_json::from_str(raw);
        assert!(parsed.is_err());
    }

    #[test]
    fn test_unknown_section_rejected() {
        let raw = r#"{"telemetry": {}}"#;
        let parsed: std::result::Result<EngineConfig, _> = serde_json::from_str(raw);
        assert!(parsed.is_err());
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let raw = r#"{"retrieval": {"max_chunks_per_source": 5}}"#;
        let config: EngineConfig = serde_json::from_str(raw).unwrap();
        assert_eq!(config.retrieval.max_chunks_per_source, 5);
        assert_eq!(config.retrieval.max_chunks_per_page, 2);
        assert_eq!(config.embedding.batch_size, 16);
    }

    #[test]
    fn test_validate_rejects_out_of_range_quality() {
        let mut config = EngineConfig::default();
        config.quality.min_chunk_quality = 1.5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_inverted_band() {
        let mut config = EngineConfig::default();
        config.chunking.paragraph_band = TokenBand::new(500, 100);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_all_kinds_disabled() {
        let mut config = EngineConfig::default();
        config.embedding.content = false;
        config.embedding.contextual = false;
        config.embedding.hierarchical = false;
        config.embedding.semantic = false;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_zero_caps() {
        let mut config = EngineConfig::default();
        config.retrieval.max_chunks_per_source = 0;
        assert!(config.validate().is_err());

        let mut config = EngineConfig::default();
        config.concurrency.max_concurrent_jobs = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_token_band_contains() {
        let band = TokenBand::new(100, 500);
        assert!(band.contains(100));
        assert!(band.contains(500));
        assert!(!band.contains(99));
        assert!(!band.contains(501));
    }

    #[test]
    fn test_timeouts() {
        let config = ConcurrencyConfig::default();
        assert_eq!(config.ingestion_timeout(), Duration::from_secs(120));
        assert_eq!(config.embedding_timeout(), Duration::from_secs(30));
        assert_eq!(config.retrieval_timeout(), Duration::from_secs(5));
    }

    #[test]
    fn test_config_round_trip() {
        let config = EngineConfig::default();
        let json = serde_json::to_string(&config).unwrap();
        let back: EngineConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back, config);
    }
}
