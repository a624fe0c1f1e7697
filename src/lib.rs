//! # corpus-rs
//!
//! Document ingestion and hybrid retrieval engine.
//!
//! corpus-rs turns heterogeneous source documents (PDF, DOCX, HTML,
//! Markdown, plain text) into a queryable knowledge base of hierarchical,
//! multi-scale chunks, then answers natural-language queries by blending
//! dense-vector similarity, lexical matching and content-type-aware
//! re-ranking.
//!
//! ## Subsystems
//!
//! - **Ingestion pipeline**: detection → structure analysis → hierarchical
//!   chunking → multi-scale embedding → quality validation → transactional
//!   persistence
//! - **Hybrid retriever**: parallel strategies, blended scoring, context
//!   expansion, lost-in-the-middle mitigation, diversity caps

#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![warn(missing_docs)]
// Note: unsafe is needed for memory-mapped I/O (memmap2)
#![warn(unsafe_code)]

pub mod analyze;
pub mod chunking;
pub mod cli;
pub mod config;
pub mod core;
pub mod detect;
pub mod embedding;
pub mod error;
pub mod io;
pub mod pipeline;
pub mod quality;
pub mod retrieval;
pub mod storage;

// Re-export commonly used types at crate root
pub use error::{Error, Result};

// Re-export core domain types
pub use core::{
    CancellationToken, ChunkContentType, ChunkGraph, ChunkNode, DocumentType, EmbeddingKind,
    ProcessingStatus, Scale, Source, SourceFormat,
};

// Re-export configuration
pub use config::EngineConfig;

// Re-export storage types
pub use storage::{ChunkStore, DEFAULT_DB_PATH, SearchFilters, SourceFilter, SqliteStore};

// Re-export pipeline types
pub use pipeline::{IngestRequest, IngestionPipeline, IngestionReport};

// Re-export embedding types
pub use embedding::{
    DEFAULT_DIMENSIONS, EmbeddingCache, EmbeddingProvider, HashEmbeddingProvider,
    MultiScaleEmbedder, TokenBucket, cosine_similarity,
};

// Re-export retrieval types
pub use retrieval::{
    Citation, HybridRetriever, QueryType, RetrievalOptions, RetrievalResponse, RetrievedChunk,
    Strategy, classify_query,
};

// Re-export CLI types
pub use cli::{Cli, Commands, OutputFormat};
