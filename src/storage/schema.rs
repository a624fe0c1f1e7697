//! Database schema definitions.
//!
//! SQL schema and migration logic for the `SQLite` chunk store.

/// Current schema version.
pub const CURRENT_SCHEMA_VERSION: u32 = 1;

/// SQL schema for initial database setup.
pub const SCHEMA_SQL: &str = r"
-- Schema version tracking
CREATE TABLE IF NOT EXISTS schema_info (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
);

-- Sources (one row per ingested document)
CREATE TABLE IF NOT EXISTS sources (
    source_id TEXT PRIMARY KEY,
    version TEXT NOT NULL,
    content_hash TEXT NOT NULL,
    size_bytes INTEGER NOT NULL,
    filename TEXT,
    format TEXT NOT NULL,
    doc_type TEXT NOT NULL,
    status TEXT NOT NULL,
    created_at INTEGER NOT NULL,
    updated_at INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_sources_status ON sources(status);
CREATE INDEX IF NOT EXISTS idx_sources_hash ON sources(content_hash);

-- Chunks (fragments with graph adjacency columns)
CREATE TABLE IF NOT EXISTS chunks (
    chunk_id TEXT PRIMARY KEY,
    source_id TEXT NOT NULL,
    version TEXT NOT NULL,
    scale TEXT NOT NULL,
    content TEXT NOT NULL,
    heading TEXT,
    section_path TEXT NOT NULL,   -- JSON array of heading strings
    page_number INTEGER,
    token_count INTEGER NOT NULL,
    word_count INTEGER NOT NULL,
    character_count INTEGER NOT NULL,
    content_type TEXT NOT NULL,
    content_type_confidence REAL NOT NULL,
    quality_score REAL NOT NULL,
    instructional_value REAL NOT NULL,
    language TEXT NOT NULL,
    parent_chunk_id TEXT,
    child_chunk_ids TEXT NOT NULL,   -- JSON array of chunk IDs
    sibling_chunk_ids TEXT NOT NULL, -- JSON array of chunk IDs
    hierarchy_path TEXT NOT NULL,    -- JSON array of ancestor chunk IDs
    created_at INTEGER NOT NULL,
    FOREIGN KEY (source_id) REFERENCES sources(source_id) ON DELETE CASCADE
);

CREATE INDEX IF NOT EXISTS idx_chunks_source ON chunks(source_id, version);
CREATE INDEX IF NOT EXISTS idx_chunks_parent ON chunks(parent_chunk_id);
CREATE INDEX IF NOT EXISTS idx_chunks_scale ON chunks(scale);
CREATE INDEX IF NOT EXISTS idx_chunks_content_type ON chunks(content_type);

-- Embedding vectors, one row per (chunk, kind)
CREATE TABLE IF NOT EXISTS chunk_embeddings (
    chunk_id TEXT NOT NULL,
    kind TEXT NOT NULL,
    embedding BLOB NOT NULL,   -- f32 array serialized little-endian
    dimensions INTEGER NOT NULL,
    created_at INTEGER NOT NULL,
    PRIMARY KEY (chunk_id, kind),
    FOREIGN KEY (chunk_id) REFERENCES chunks(chunk_id) ON DELETE CASCADE
);

CREATE INDEX IF NOT EXISTS idx_embeddings_kind ON chunk_embeddings(kind);

-- FTS5 virtual table for BM25 full-text search over content and heading
CREATE VIRTUAL TABLE IF NOT EXISTS chunks_fts USING fts5(
    content,
    heading,
    content='chunks',
    content_rowid='rowid',
    tokenize='porter unicode61'
);

-- Triggers to keep the FTS5 index in sync with the chunks table
CREATE TRIGGER IF NOT EXISTS chunks_ai AFTER INSERT ON chunks BEGIN
    INSERT INTO chunks_fts(rowid, content, heading)
    VALUES (new.rowid, new.content, new.heading);
END;

CREATE TRIGGER IF NOT EXISTS chunks_ad AFTER DELETE ON chunks BEGIN
    INSERT INTO chunks_fts(chunks_fts, rowid, content, heading)
    VALUES('delete', old.rowid, old.content, old.heading);
END;

CREATE TRIGGER IF NOT EXISTS chunks_au AFTER UPDATE ON chunks BEGIN
    INSERT INTO chunks_fts(chunks_fts, rowid, content, heading)
    VALUES('delete', old.rowid, old.content, old.heading);
    INSERT INTO chunks_fts(rowid, content, heading)
    VALUES (new.rowid, new.content, new.heading);
END;
";

/// SQL to check if the schema is initialized.
pub const CHECK_SCHEMA_SQL: &str = r"
SELECT COUNT(*) FROM sqlite_master
WHERE type='table' AND name='schema_info';
";

/// SQL to get the schema version.
pub const GET_VERSION_SQL: &str = r"
SELECT value FROM schema_info WHERE key = 'version';
";

/// SQL to set the schema version.
pub const SET_VERSION_SQL: &str = r"
INSERT OR REPLACE INTO schema_info (key, value) VALUES ('version', ?);
";

/// SQL to read the frozen embedding dimensionality.
pub const GET_DIMENSIONS_SQL: &str = r"
SELECT value FROM schema_info WHERE key = 'dimensions';
";

/// SQL to freeze the embedding dimensionality.
pub const SET_DIMENSIONS_SQL: &str = r"
INSERT OR REPLACE INTO schema_info (key, value) VALUES ('dimensions', ?);
";

/// Migrations from older schema versions.
pub struct Migration {
    /// Version this migration upgrades from.
    pub from_version: u32,
    /// Version this migration upgrades to.
    pub to_version: u32,
    /// SQL statements to execute.
    pub sql: &'static str,
}

/// Available migrations. Version 1 is the base schema.
pub const MIGRATIONS: &[Migration] = &[];

/// Gets migrations needed to upgrade from a version.
#[must_use]
pub fn get_migrations_from(current_version: u32) -> Vec<&'static Migration> {
    MIGRATIONS
        .iter()
        .filter(|m| m.from_version >= current_version && m.to_version <= CURRENT_SCHEMA_VERSION)
        .collect()
}
