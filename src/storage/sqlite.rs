//! `SQLite` chunk store implementation.
//!
//! Persists sources, chunks, graph edges and per-kind embedding vectors with
//! transactional replacement semantics: an ingestion's chunk set becomes
//! visible atomically, and prior rows survive any aborted transaction.

// SQLite stores all integers as i64. These casts are intentional and safe
// because we only store non-negative values that fit in usize.
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::cast_possible_wrap)]

use crate::core::{
    ChunkContentType, ChunkNode, EmbeddingKind, ProcessingStatus, Scale, Source, SourceFormat,
};
use crate::embedding::cosine_similarity;
use crate::error::{Result, StoreError};
use crate::storage::schema::{
    CHECK_SCHEMA_SQL, CURRENT_SCHEMA_VERSION, GET_DIMENSIONS_SQL, GET_VERSION_SQL, SCHEMA_SQL,
    SET_DIMENSIONS_SQL, SET_VERSION_SQL,
};
use crate::storage::traits::{
    ChunkStore, ReplaceOutcome, SearchFilters, SourceFilter, StoreStats, TextHit, VectorHit,
};
use rusqlite::{Connection, OptionalExtension, Row, Transaction, params};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

/// SQLite-backed [`ChunkStore`].
///
/// # Examples
///
/// ```no_run
/// use corpus_rs::storage::{ChunkStore, SqliteStore};
///
/// let store = SqliteStore::open("corpus.db").unwrap();
/// store.init().unwrap();
/// ```
pub struct SqliteStore {
    conn: Mutex<Connection>,
    path: Option<PathBuf>,
}

impl SqliteStore {
    /// Opens or creates a database at the given path.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or configured.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent() {
            if !parent.exists() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| StoreError::Database(e.to_string()))?;
            }
        }

        let conn = Connection::open(&path).map_err(StoreError::from)?;
        conn.execute("PRAGMA foreign_keys = ON;", []).map_err(StoreError::from)?;
        let _: String = conn
            .query_row("PRAGMA journal_mode = WAL;", [], |row| row.get(0))
            .map_err(StoreError::from)?;

        Ok(Self { conn: Mutex::new(conn), path: Some(path) })
    }

    /// Creates an in-memory database, useful for tests.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be created.
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(StoreError::from)?;
        conn.execute("PRAGMA foreign_keys = ON;", []).map_err(StoreError::from)?;
        Ok(Self { conn: Mutex::new(conn), path: None })
    }

    /// Returns the database path (`None` for in-memory).
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// The frozen embedding dimensionality, when any vector was stored.
    ///
    /// # Errors
    ///
    /// Returns an error on query failure.
    pub fn dimensions(&self) -> Result<Option<usize>> {
        let conn = self.lock()?;
        let value: Option<String> = conn
            .query_row(GET_DIMENSIONS_SQL, [], |row| row.get(0))
            .optional()
            .map_err(StoreError::from)?;
        Ok(value.and_then(|v| v.parse().ok()))
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| StoreError::Database("connection mutex poisoned".to_string()).into())
    }

    #[allow(clippy::unused_self)]
    fn now() -> i64 {
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_secs() as i64)
            .unwrap_or(0)
    }

    fn insert_chunk(tx: &Transaction<'_>, chunk: &ChunkNode, now: i64) -> Result<()> {
        tx.execute(
            r"
            INSERT INTO chunks (
                chunk_id, source_id, version, scale, content, heading,
                section_path, page_number, token_count, word_count,
                character_count, content_type, content_type_confidence,
                quality_score, instructional_value, language, parent_chunk_id,
                child_chunk_ids, sibling_chunk_ids, hierarchy_path, created_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ",
            params![
                chunk.chunk_id,
                chunk.source_id,
                chunk.version,
                chunk.scale.as_str(),
                chunk.content,
                chunk.heading,
                to_json(&chunk.section_path)?,
                chunk.page_number,
                chunk.token_count as i64,
                chunk.word_count as i64,
                chunk.character_count as i64,
                chunk.content_type.as_str(),
                chunk.content_type_confidence,
                chunk.quality_score,
                chunk.instructional_value,
                chunk.language,
                chunk.parent_chunk_id,
                to_json(&chunk.child_chunk_ids)?,
                to_json(&chunk.sibling_chunk_ids)?,
                to_json(&chunk.hierarchy_path)?,
                now,
            ],
        )
        .map_err(StoreError::from)?;
        Ok(())
    }

    fn insert_embeddings(
        tx: &Transaction<'_>,
        chunk: &ChunkNode,
        dimensions: usize,
        now: i64,
    ) -> Result<()> {
        for (kind, vector) in &chunk.embeddings {
            if vector.len() != dimensions {
                return Err(StoreError::DimensionMismatch {
                    expected: dimensions,
                    actual: vector.len(),
                }
                .into());
            }
            let bytes: Vec<u8> = vector.iter().flat_map(|f| f.to_le_bytes()).collect();
            tx.execute(
                r"
                INSERT OR REPLACE INTO chunk_embeddings
                    (chunk_id, kind, embedding, dimensions, created_at)
                VALUES (?, ?, ?, ?, ?)
                ",
                params![chunk.chunk_id, kind.as_str(), bytes, vector.len() as i64, now],
            )
            .map_err(StoreError::from)?;
        }
        Ok(())
    }

    fn fetch_chunk(conn: &Connection, chunk_id: &str) -> Result<Option<ChunkNode>> {
        let mut chunk = conn
            .query_row(
                &format!("{CHUNK_SELECT} WHERE chunk_id = ?"),
                params![chunk_id],
                row_to_chunk,
            )
            .optional()
            .map_err(StoreError::from)?;
        if let Some(chunk) = chunk.as_mut() {
            Self::load_embeddings(conn, chunk)?;
        }
        Ok(chunk)
    }

    fn load_embeddings(conn: &Connection, chunk: &mut ChunkNode) -> Result<()> {
        let mut stmt = conn
            .prepare("SELECT kind, embedding FROM chunk_embeddings WHERE chunk_id = ?")
            .map_err(StoreError::from)?;
        let rows = stmt
            .query_map(params![chunk.chunk_id], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, Vec<u8>>(1)?))
            })
            .map_err(StoreError::from)?
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(StoreError::from)?;
        for (kind_raw, bytes) in rows {
            if let Some(kind) = EmbeddingKind::parse(&kind_raw) {
                let vector: Vec<f32> = bytes
                    .chunks_exact(4)
                    .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
                    .collect();
                chunk.embeddings.insert(kind, vector);
            }
        }
        Ok(())
    }
}

const CHUNK_SELECT: &str = r"
SELECT chunk_id, source_id, version, scale, content, heading, section_path,
       page_number, token_count, word_count, character_count, content_type,
       content_type_confidence, quality_score, instructional_value, language,
       parent_chunk_id, child_chunk_ids, sibling_chunk_ids, hierarchy_path,
       created_at
FROM chunks
";

fn to_json<T: serde::Serialize>(value: &T) -> Result<String> {
    serde_json::to_string(value).map_err(|e| StoreError::Serialization(e.to_string()).into())
}

fn from_json<T: serde::de::DeserializeOwned>(raw: &str) -> rusqlite::Result<T> {
    serde_json::from_str(raw).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(e))
    })
}

fn row_to_chunk(row: &Row<'_>) -> rusqlite::Result<ChunkNode> {
    let scale_raw: String = row.get(3)?;
    let scale = Scale::parse(&scale_raw).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            3,
            rusqlite::types::Type::Text,
            format!("unknown scale: {scale_raw}").into(),
        )
    })?;
    let section_path: Vec<String> = from_json(&row.get::<_, String>(6)?)?;
    let child_chunk_ids: Vec<String> = from_json(&row.get::<_, String>(17)?)?;
    let sibling_chunk_ids: Vec<String> = from_json(&row.get::<_, String>(18)?)?;
    let hierarchy_path: Vec<String> = from_json(&row.get::<_, String>(19)?)?;
    let content_type: String = row.get(11)?;

    Ok(ChunkNode {
        chunk_id: row.get(0)?,
        source_id: row.get(1)?,
        version: row.get(2)?,
        scale,
        content: row.get(4)?,
        heading: row.get(5)?,
        section_path,
        page_number: row.get::<_, Option<i64>>(7)?.map(|p| p as u32),
        token_count: row.get::<_, i64>(8)? as usize,
        word_count: row.get::<_, i64>(9)? as usize,
        character_count: row.get::<_, i64>(10)? as usize,
        content_type: ChunkContentType::parse(&content_type),
        content_type_confidence: row.get(12)?,
        quality_score: row.get(13)?,
        instructional_value: row.get(14)?,
        language: row.get(15)?,
        parent_chunk_id: row.get(16)?,
        child_chunk_ids,
        sibling_chunk_ids,
        hierarchy_path,
        embeddings: std::collections::BTreeMap::new(),
        created_at: row.get(20)?,
    })
}

fn row_to_source(row: &Row<'_>) -> rusqlite::Result<Source> {
    let format_raw: String = row.get(5)?;
    let doc_type_raw: String = row.get(6)?;
    let status_raw: String = row.get(7)?;
    let status = ProcessingStatus::parse(&status_raw).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            7,
            rusqlite::types::Type::Text,
            format!("unknown status: {status_raw}").into(),
        )
    })?;

    Ok(Source {
        source_id: row.get(0)?,
        version: row.get(1)?,
        content_hash: row.get(2)?,
        size_bytes: row.get::<_, i64>(3)? as u64,
        filename: row.get(4)?,
        format: SourceFormat::parse(&format_raw),
        doc_type: crate::core::DocumentType::parse(&doc_type_raw),
        status,
        created_at: row.get(8)?,
        updated_at: row.get(9)?,
    })
}

const SOURCE_SELECT: &str = r"
SELECT source_id, version, content_hash, size_bytes, filename, format,
       doc_type, status, created_at, updated_at
FROM sources
";

/// Builds the filter clause and parameters shared by both search paths.
fn filter_clause(filters: &SearchFilters, clause: &mut String, params: &mut Vec<String>) {
    if let Some(source_id) = &filters.source_id {
        clause.push_str(" AND c.source_id = ?");
        params.push(source_id.clone());
    }
    if let Some(scale) = filters.scale {
        clause.push_str(" AND c.scale = ?");
        params.push(scale.as_str().to_string());
    }
    if let Some(content_type) = filters.content_type {
        clause.push_str(" AND c.content_type = ?");
        params.push(content_type.as_str().to_string());
    }
}

impl ChunkStore for SqliteStore {
    fn init(&self) -> Result<()> {
        let conn = self.lock()?;
        let is_init: i64 =
            conn.query_row(CHECK_SCHEMA_SQL, [], |row| row.get(0)).map_err(StoreError::from)?;

        if is_init == 0 {
            conn.execute_batch(SCHEMA_SQL).map_err(StoreError::from)?;
            conn.execute(SET_VERSION_SQL, params![CURRENT_SCHEMA_VERSION.to_string()])
                .map_err(StoreError::from)?;
        } else {
            let version: Option<String> = conn
                .query_row(GET_VERSION_SQL, [], |row| row.get(0))
                .optional()
                .map_err(StoreError::from)?;
            if let Some(current) = version.and_then(|v| v.parse::<u32>().ok()) {
                if current < CURRENT_SCHEMA_VERSION {
                    for migration in crate::storage::schema::get_migrations_from(current) {
                        conn.execute_batch(migration.sql)
                            .map_err(|e| StoreError::Migration(e.to_string()))?;
                    }
                    conn.execute(SET_VERSION_SQL, params![CURRENT_SCHEMA_VERSION.to_string()])
                        .map_err(StoreError::from)?;
                }
            }
        }
        Ok(())
    }

    fn put_source(&self, source: &Source) -> Result<()> {
        let conn = self.lock()?;
        conn.execute(
            r"
            INSERT INTO sources (
                source_id, version, content_hash, size_bytes, filename,
                format, doc_type, status, created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(source_id) DO UPDATE SET
                version = excluded.version,
                content_hash = excluded.content_hash,
                size_bytes = excluded.size_bytes,
                filename = excluded.filename,
                format = excluded.format,
                doc_type = excluded.doc_type,
                status = excluded.status,
                updated_at = excluded.updated_at
            ",
            params![
                source.source_id,
                source.version,
                source.content_hash,
                source.size_bytes as i64,
                source.filename,
                source.format.as_str(),
                source.doc_type.as_str(),
                source.status.as_str(),
                source.created_at,
                source.updated_at,
            ],
        )
        .map_err(StoreError::from)?;
        Ok(())
    }

    fn get_source(&self, source_id: &str) -> Result<Option<Source>> {
        let conn = self.lock()?;
        conn.query_row(
            &format!("{SOURCE_SELECT} WHERE source_id = ?"),
            params![source_id],
            row_to_source,
        )
        .optional()
        .map_err(StoreError::from)
        .map_err(Into::into)
    }

    fn list_sources(&self, filter: &SourceFilter) -> Result<Vec<Source>> {
        let conn = self.lock()?;
        let mut sql = format!("{SOURCE_SELECT} WHERE 1=1");
        let mut params_vec: Vec<String> = Vec::new();
        if let Some(status) = filter.status {
            sql.push_str(" AND status = ?");
            params_vec.push(status.as_str().to_string());
        }
        if let Some(format) = filter.format {
            sql.push_str(" AND format = ?");
            params_vec.push(format.as_str().to_string());
        }
        sql.push_str(" ORDER BY source_id");

        let mut stmt = conn.prepare(&sql).map_err(StoreError::from)?;
        let sources = stmt
            .query_map(rusqlite::params_from_iter(params_vec.iter()), row_to_source)
            .map_err(StoreError::from)?
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(StoreError::from)?;
        Ok(sources)
    }

    fn delete_source(&self, source_id: &str) -> Result<()> {
        let conn = self.lock()?;
        // Chunks and embeddings cascade.
        conn.execute("DELETE FROM sources WHERE source_id = ?", params![source_id])
            .map_err(StoreError::from)?;
        Ok(())
    }

    fn replace_chunks(
        &self,
        source_id: &str,
        version: &str,
        chunks: &[ChunkNode],
    ) -> Result<ReplaceOutcome> {
        let mut conn = self.lock()?;
        let tx = conn.transaction().map_err(|e| StoreError::Transaction(e.to_string()))?;
        let now = Self::now();

        // Freeze dimensionality on first vector; enforce it afterwards.
        let mut dimensions: Option<usize> = tx
            .query_row(GET_DIMENSIONS_SQL, [], |row| row.get::<_, String>(0))
            .optional()
            .map_err(StoreError::from)?
            .and_then(|v| v.parse().ok());
        if dimensions.is_none() {
            if let Some(first) = chunks.iter().flat_map(|c| c.embeddings.values()).next() {
                dimensions = Some(first.len());
                tx.execute(SET_DIMENSIONS_SQL, params![first.len().to_string()])
                    .map_err(StoreError::from)?;
            }
        }

        let existing: HashSet<String> = {
            let mut stmt = tx
                .prepare("SELECT chunk_id FROM chunks WHERE source_id = ?")
                .map_err(StoreError::from)?;
            let ids = stmt
                .query_map(params![source_id], |row| row.get::<_, String>(0))
                .map_err(StoreError::from)?
                .collect::<std::result::Result<HashSet<_>, _>>()
                .map_err(StoreError::from)?;
            ids
        };
        let incoming: HashSet<String> = chunks.iter().map(|c| c.chunk_id.clone()).collect();

        let mut outcome = ReplaceOutcome::default();

        for chunk in chunks {
            debug_assert_eq!(chunk.source_id, source_id);
            debug_assert_eq!(chunk.version, version);
            if existing.contains(&chunk.chunk_id) {
                outcome.unchanged += 1;
            } else {
                Self::insert_chunk(&tx, chunk, now)?;
                outcome.inserted += 1;
            }
            if let Some(dimensions) = dimensions {
                Self::insert_embeddings(&tx, chunk, dimensions, now)?;
            }
        }

        // Remove superseded rows only after the new set is in place, inside
        // the same transaction.
        {
            let mut stmt = tx
                .prepare("DELETE FROM chunks WHERE chunk_id = ?")
                .map_err(StoreError::from)?;
            for stale in existing.difference(&incoming) {
                stmt.execute(params![stale]).map_err(StoreError::from)?;
                outcome.removed += 1;
            }
        }

        tx.commit().map_err(|e| StoreError::Transaction(e.to_string()))?;

        tracing::debug!(
            source_id,
            version,
            inserted = outcome.inserted,
            removed = outcome.removed,
            unchanged = outcome.unchanged,
            "chunk replacement committed"
        );
        Ok(outcome)
    }

    fn get_chunk(&self, chunk_id: &str) -> Result<Option<ChunkNode>> {
        let conn = self.lock()?;
        Self::fetch_chunk(&conn, chunk_id)
    }

    fn get_source_chunks(&self, source_id: &str) -> Result<Vec<ChunkNode>> {
        let conn = self.lock()?;
        let mut stmt = conn
            .prepare(&format!("{CHUNK_SELECT} WHERE source_id = ? ORDER BY rowid"))
            .map_err(StoreError::from)?;
        let mut chunks = stmt
            .query_map(params![source_id], row_to_chunk)
            .map_err(StoreError::from)?
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(StoreError::from)?;
        for chunk in &mut chunks {
            Self::load_embeddings(&conn, chunk)?;
        }
        Ok(chunks)
    }

    fn get_children(&self, chunk_id: &str) -> Result<Vec<ChunkNode>> {
        let conn = self.lock()?;
        let Some(chunk) = Self::fetch_chunk(&conn, chunk_id)? else {
            return Err(StoreError::ChunkNotFound { chunk_id: chunk_id.to_string() }.into());
        };
        let mut children = Vec::with_capacity(chunk.child_chunk_ids.len());
        for child_id in &chunk.child_chunk_ids {
            if let Some(child) = Self::fetch_chunk(&conn, child_id)? {
                children.push(child);
            }
        }
        Ok(children)
    }

    fn get_parent(&self, chunk_id: &str) -> Result<Option<ChunkNode>> {
        let conn = self.lock()?;
        let Some(chunk) = Self::fetch_chunk(&conn, chunk_id)? else {
            return Err(StoreError::ChunkNotFound { chunk_id: chunk_id.to_string() }.into());
        };
        match chunk.parent_chunk_id {
            Some(parent_id) => Self::fetch_chunk(&conn, &parent_id),
            None => Ok(None),
        }
    }

    fn get_siblings(&self, chunk_id: &str) -> Result<Vec<ChunkNode>> {
        let conn = self.lock()?;
        let Some(chunk) = Self::fetch_chunk(&conn, chunk_id)? else {
            return Err(StoreError::ChunkNotFound { chunk_id: chunk_id.to_string() }.into());
        };
        let mut siblings = Vec::with_capacity(chunk.sibling_chunk_ids.len());
        for sibling_id in &chunk.sibling_chunk_ids {
            if let Some(sibling) = Self::fetch_chunk(&conn, sibling_id)? {
                siblings.push(sibling);
            }
        }
        Ok(siblings)
    }

    fn search_by_vector(
        &self,
        kind: EmbeddingKind,
        query: &[f32],
        k: usize,
        filters: &SearchFilters,
    ) -> Result<Vec<VectorHit>> {
        if let Some(dimensions) = self.dimensions()? {
            if query.len() != dimensions {
                return Err(StoreError::DimensionMismatch {
                    expected: dimensions,
                    actual: query.len(),
                }
                .into());
            }
        }

        let conn = self.lock()?;
        let mut sql = String::from(
            r"
            SELECT e.chunk_id, e.embedding
            FROM chunk_embeddings e
            JOIN chunks c ON c.chunk_id = e.chunk_id
            WHERE e.kind = ?
            ",
        );
        let mut string_params = vec![kind.as_str().to_string()];
        filter_clause(filters, &mut sql, &mut string_params);

        let mut stmt = conn.prepare(&sql).map_err(StoreError::from)?;
        let rows = stmt
            .query_map(rusqlite::params_from_iter(string_params.iter()), |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, Vec<u8>>(1)?))
            })
            .map_err(StoreError::from)?
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(StoreError::from)?;

        let mut hits: Vec<VectorHit> = rows
            .into_iter()
            .map(|(chunk_id, bytes)| {
                let embedding: Vec<f32> = bytes
                    .chunks_exact(4)
                    .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
                    .collect();
                VectorHit { chunk_id, similarity: cosine_similarity(query, &embedding) }
            })
            .collect();

        hits.sort_by(|a, b| {
            b.similarity
                .partial_cmp(&a.similarity)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.chunk_id.cmp(&b.chunk_id))
        });
        hits.truncate(k);
        Ok(hits)
    }

    fn search_by_text(
        &self,
        query: &str,
        k: usize,
        filters: &SearchFilters,
    ) -> Result<Vec<TextHit>> {
        let conn = self.lock()?;

        // Quote every term so FTS5 operators in user queries read as
        // literals; OR-join for forgiving coverage-monotone matching.
        let fts_query = query
            .split_whitespace()
            .map(|term| format!("\"{}\"", term.replace('"', "\"\"")))
            .collect::<Vec<_>>()
            .join(" OR ");
        if fts_query.is_empty() {
            return Ok(Vec::new());
        }

        let mut sql = String::from(
            r"
            SELECT c.chunk_id, -bm25(chunks_fts) AS score
            FROM chunks_fts
            JOIN chunks c ON c.rowid = chunks_fts.rowid
            WHERE chunks_fts MATCH ?
            ",
        );
        let mut string_params = vec![fts_query];
        filter_clause(filters, &mut sql, &mut string_params);
        sql.push_str(&format!(" ORDER BY score DESC, c.chunk_id LIMIT {}", k.max(1)));

        let mut stmt = conn.prepare(&sql).map_err(StoreError::from)?;
        let hits = stmt
            .query_map(rusqlite::params_from_iter(string_params.iter()), |row| {
                Ok(TextHit { chunk_id: row.get(0)?, score: row.get(1)? })
            })
            .map_err(StoreError::from)?
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(StoreError::from)?;
        Ok(hits)
    }

    fn chunk_count(&self, source_id: &str) -> Result<usize> {
        let conn = self.lock()?;
        let count: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM chunks WHERE source_id = ?",
                params![source_id],
                |row| row.get(0),
            )
            .map_err(StoreError::from)?;
        Ok(count as usize)
    }

    fn stats(&self) -> Result<StoreStats> {
        let conn = self.lock()?;
        let source_count: i64 = conn
            .query_row("SELECT COUNT(*) FROM sources", [], |row| row.get(0))
            .map_err(StoreError::from)?;
        let chunk_count: i64 = conn
            .query_row("SELECT COUNT(*) FROM chunks", [], |row| row.get(0))
            .map_err(StoreError::from)?;
        let embedding_count: i64 = conn
            .query_row("SELECT COUNT(*) FROM chunk_embeddings", [], |row| row.get(0))
            .map_err(StoreError::from)?;

        let mut chunks_per_scale = Vec::new();
        for scale in Scale::ALL {
            let count: i64 = conn
                .query_row(
                    "SELECT COUNT(*) FROM chunks WHERE scale = ?",
                    params![scale.as_str()],
                    |row| row.get(0),
                )
                .map_err(StoreError::from)?;
            chunks_per_scale.push((scale.as_str().to_string(), count as usize));
        }

        let dimensions: Option<String> = conn
            .query_row(GET_DIMENSIONS_SQL, [], |row| row.get(0))
            .optional()
            .map_err(StoreError::from)?;

        let db_size =
            self.path.as_ref().and_then(|p| std::fs::metadata(p).ok().map(|m| m.len()));

        Ok(StoreStats {
            source_count: source_count as usize,
            chunk_count: chunk_count as usize,
            chunks_per_scale,
            embedding_count: embedding_count as usize,
            dimensions: dimensions.and_then(|d| d.parse().ok()),
            db_size,
        })
    }
}
