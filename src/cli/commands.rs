//! CLI command execution.
//!
//! Wires the engine together (store, embedder, pipeline, retriever) and
//! dispatches parsed commands.

use crate::cli::output::{
    OutputFormat, format_ingestion, format_retrieval, format_sources, format_stats,
    format_validation,
};
use crate::cli::parser::{Cli, Commands};
use crate::config::EngineConfig;
use crate::core::{CancellationToken, ProcessingStatus};
use crate::embedding::{
    DEFAULT_DIMENSIONS, EmbeddingCache, HashEmbeddingProvider, MultiScaleEmbedder, TokenBucket,
};
use crate::error::{Error, Result};
use crate::io::ReaderRegistry;
use crate::pipeline::{IngestRequest, IngestionPipeline};
use crate::quality::validate_source;
use crate::retrieval::{HybridRetriever, RetrievalOptions};
use crate::storage::{ChunkStore, DEFAULT_DB_PATH, SearchFilters, SourceFilter, SqliteStore};
use std::path::PathBuf;
use std::sync::Arc;

/// Everything a command needs, built once per invocation.
struct Engine {
    config: EngineConfig,
    store: Arc<SqliteStore>,
    embedder: Arc<MultiScaleEmbedder>,
}

impl Engine {
    fn build(cli: &Cli) -> Result<Self> {
        let config = match &cli.config {
            Some(path) => EngineConfig::load(path)?,
            None => EngineConfig::default(),
        };

        let db_path =
            cli.db_path.clone().unwrap_or_else(|| PathBuf::from(DEFAULT_DB_PATH));
        let store = Arc::new(SqliteStore::open(db_path)?);
        store.init()?;

        let embedder = Arc::new(MultiScaleEmbedder::new(
            Arc::new(HashEmbeddingProvider::new(DEFAULT_DIMENSIONS)),
            config.embedding.clone(),
            config.concurrency.clone(),
            Arc::new(EmbeddingCache::new(config.embedding.cache_entries)),
            Arc::new(TokenBucket::new(config.embedding.requests_per_second)),
        ));

        Ok(Self { config, store, embedder })
    }

    fn pipeline(&self) -> IngestionPipeline {
        IngestionPipeline::new(
            self.config.clone(),
            ReaderRegistry::new(),
            self.embedder.clone(),
            self.store.clone() as Arc<dyn ChunkStore>,
        )
    }

    fn retriever(&self) -> HybridRetriever {
        HybridRetriever::new(
            self.store.clone() as Arc<dyn ChunkStore>,
            Some(self.embedder.clone()),
            self.config.retrieval.clone(),
        )
        .with_timeout(self.config.concurrency.retrieval_timeout())
    }
}

/// Executes a parsed CLI invocation and returns its rendered output.
///
/// # Errors
///
/// Returns an error for invalid arguments or engine failures.
pub fn execute(cli: &Cli) -> Result<String> {
    let format = OutputFormat::parse(&cli.format);
    let engine = Engine::build(cli)?;

    match &cli.command {
        Commands::Ingest { file, source_id, version, mime } => {
            let source_id = source_id.clone().unwrap_or_else(|| {
                file.file_stem()
                    .map_or_else(|| "document".to_string(), |s| s.to_string_lossy().to_string())
            });
            let request = IngestRequest {
                source_id,
                version: version.clone(),
                file_path: file.clone(),
                declared_mime: mime.clone(),
            };
            let report = engine.pipeline().ingest(&request, &CancellationToken::new())?;
            Ok(format_ingestion(&report, format))
        }

        Commands::Query { query, top_k, source, expand, no_reorder } => {
            let options = RetrievalOptions {
                k: *top_k,
                filters: SearchFilters { source_id: source.clone(), ..SearchFilters::none() },
                hierarchical_expansion: *expand,
                semantic_expansion: *expand,
                lost_in_middle_mitigation: !*no_reorder,
                ..RetrievalOptions::default()
            };
            let response = engine.retriever().retrieve(query, &options)?;
            Ok(format_retrieval(&response, format))
        }

        Commands::Sources { status } => {
            let status = match status.as_deref() {
                Some(raw) => Some(ProcessingStatus::parse(raw).ok_or_else(|| {
                    Error::validation(format!("unknown status filter: {raw}"))
                })?),
                None => None,
            };
            let sources =
                engine.store.list_sources(&SourceFilter { status, format: None })?;
            Ok(format_sources(&sources, format))
        }

        Commands::Validate { source_id } => {
            let source = engine
                .store
                .get_source(source_id)?
                .ok_or_else(|| Error::validation(format!("unknown source: {source_id}")))?;
            let chunks = engine.store.get_source_chunks(source_id)?;
            let report = validate_source(&chunks, source.doc_type, &engine.config.quality);
            Ok(format_validation(&report, format))
        }

        Commands::Delete { source_id, yes } => {
            if !yes {
                return Err(Error::validation(
                    "pass --yes to confirm deleting a source and all its chunks",
                ));
            }
            engine
                .store
                .get_source(source_id)?
                .ok_or_else(|| Error::validation(format!("unknown source: {source_id}")))?;
            engine.store.delete_source(source_id)?;
            Ok(format!("Deleted source {source_id}\n"))
        }

        Commands::Stats => {
            let stats = engine.store.stats()?;
            Ok(format_stats(&stats, format))
        }
    }
}
