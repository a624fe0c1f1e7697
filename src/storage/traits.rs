//! Chunk store trait definition.
//!
//! The store is the single source of truth: it alone mutates persistent
//! state, serves vector, lexical and graph queries, and guarantees that
//! readers only ever observe committed ingestions.

use crate::core::{ChunkContentType, ChunkNode, EmbeddingKind, ProcessingStatus, Scale, Source,
                  SourceFormat};
use crate::error::Result;
use serde::{Deserialize, Serialize};

/// Filters applied to vector and lexical searches.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchFilters {
    /// Restrict to one source.
    pub source_id: Option<String>,
    /// Restrict to one scale.
    pub scale: Option<Scale>,
    /// Restrict to one content type.
    pub content_type: Option<ChunkContentType>,
}

impl SearchFilters {
    /// No filtering.
    #[must_use]
    pub fn none() -> Self {
        Self::default()
    }
}

/// Filter for source listings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceFilter {
    /// Restrict to one processing status.
    pub status: Option<ProcessingStatus>,
    /// Restrict to one format.
    pub format: Option<SourceFormat>,
}

/// One vector search hit.
#[derive(Debug, Clone, PartialEq)]
pub struct VectorHit {
    /// Matching chunk.
    pub chunk_id: String,
    /// Cosine similarity in [-1,1].
    pub similarity: f32,
}

/// One lexical search hit.
#[derive(Debug, Clone, PartialEq)]
pub struct TextHit {
    /// Matching chunk.
    pub chunk_id: String,
    /// Lexical score; monotone in query-term coverage, unnormalised.
    pub score: f64,
}

/// Outcome of an atomic chunk replacement.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplaceOutcome {
    /// Rows inserted.
    pub inserted: usize,
    /// Rows removed.
    pub removed: usize,
    /// Rows carried over unchanged (same chunk ID).
    pub unchanged: usize,
}

/// Store-wide statistics.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreStats {
    /// Number of sources.
    pub source_count: usize,
    /// Number of chunks.
    pub chunk_count: usize,
    /// Chunks per scale, in `Scale::ALL` order.
    pub chunks_per_scale: Vec<(String, usize)>,
    /// Number of stored embedding vectors.
    pub embedding_count: usize,
    /// Frozen dimensionality, when any embedding exists.
    pub dimensions: Option<usize>,
    /// Database file size in bytes, when on disk.
    pub db_size: Option<u64>,
}

/// Persistent store for sources, chunks, edges and embeddings.
pub trait ChunkStore: Send + Sync {
    /// Initialises the schema; idempotent.
    ///
    /// # Errors
    ///
    /// Returns an error if schema creation or migration fails.
    fn init(&self) -> Result<()>;

    /// Upserts a source record, including its status.
    ///
    /// # Errors
    ///
    /// Returns an error on persistence failure.
    fn put_source(&self, source: &Source) -> Result<()>;

    /// Looks up a source by ID.
    ///
    /// # Errors
    ///
    /// Returns an error on query failure.
    fn get_source(&self, source_id: &str) -> Result<Option<Source>>;

    /// Lists sources matching the filter.
    ///
    /// # Errors
    ///
    /// Returns an error on query failure.
    fn list_sources(&self, filter: &SourceFilter) -> Result<Vec<Source>>;

    /// Deletes a source, cascading to its chunks and embeddings.
    ///
    /// # Errors
    ///
    /// Returns an error on persistence failure.
    fn delete_source(&self, source_id: &str) -> Result<()>;

    /// Atomically replaces all chunks of a source with the new set.
    ///
    /// Old rows are removed in the same transaction that commits the new
    /// ones; rows whose chunk ID is unchanged are carried over, making an
    /// identical re-ingestion a row-level no-op.
    ///
    /// # Errors
    ///
    /// Returns a transaction error and leaves prior versions intact.
    fn replace_chunks(
        &self,
        source_id: &str,
        version: &str,
        chunks: &[ChunkNode],
    ) -> Result<ReplaceOutcome>;

    /// Looks up a chunk by ID.
    ///
    /// # Errors
    ///
    /// Returns an error on query failure.
    fn get_chunk(&self, chunk_id: &str) -> Result<Option<ChunkNode>>;

    /// All chunks of a source in reading order, embeddings included.
    ///
    /// # Errors
    ///
    /// Returns an error on query failure.
    fn get_source_chunks(&self, source_id: &str) -> Result<Vec<ChunkNode>>;

    /// Children of a chunk in reading order.
    ///
    /// # Errors
    ///
    /// Returns an error on query failure.
    fn get_children(&self, chunk_id: &str) -> Result<Vec<ChunkNode>>;

    /// Parent of a chunk, if any.
    ///
    /// # Errors
    ///
    /// Returns an error on query failure.
    fn get_parent(&self, chunk_id: &str) -> Result<Option<ChunkNode>>;

    /// Siblings of a chunk in reading order, excluding the chunk itself.
    ///
    /// # Errors
    ///
    /// Returns an error on query failure.
    fn get_siblings(&self, chunk_id: &str) -> Result<Vec<ChunkNode>>;

    /// Top-k chunks by cosine similarity for one embedding kind.
    ///
    /// # Errors
    ///
    /// Returns a dimension mismatch when the query vector length differs
    /// from the store's frozen `D`.
    fn search_by_vector(
        &self,
        kind: EmbeddingKind,
        query: &[f32],
        k: usize,
        filters: &SearchFilters,
    ) -> Result<Vec<VectorHit>>;

    /// Top-k chunks by full-text score over content and heading.
    ///
    /// # Errors
    ///
    /// Returns an error on query failure.
    fn search_by_text(&self, query: &str, k: usize, filters: &SearchFilters)
    -> Result<Vec<TextHit>>;

    /// Number of chunks belonging to a source.
    ///
    /// # Errors
    ///
    /// Returns an error on query failure.
    fn chunk_count(&self, source_id: &str) -> Result<usize>;

    /// Store-wide statistics.
    ///
    /// # Errors
    ///
    /// Returns an error on query failure.
    fn stats(&self) -> Result<StoreStats>;
}
