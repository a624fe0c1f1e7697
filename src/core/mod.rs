//! Core domain types: sources, chunks, the chunk graph, and cancellation.

pub mod cancel;
pub mod chunk;
pub mod source;

pub use cancel::CancellationToken;
pub use chunk::{
    ChunkContentType, ChunkGraph, ChunkNode, EmbeddingKind, Scale, chunk_id_for, estimate_tokens,
};
pub use source::{DocumentType, ProcessingStatus, Source, SourceFormat};
