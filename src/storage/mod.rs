//! Persistent chunk store: sources, chunks, edges, vectors, full text.

pub mod schema;
pub mod sqlite;
pub mod traits;

pub use sqlite::SqliteStore;
pub use traits::{
    ChunkStore, ReplaceOutcome, SearchFilters, SourceFilter, StoreStats, TextHit, VectorHit,
};

/// Default database filename.
pub const DEFAULT_DB_PATH: &str = "corpus.db";
