//! Ingestion pipeline and job orchestration.
//!
//! One source ingests as a single logical job with strictly ordered stages:
//! detection → structure analysis → chunking → quality gating → embedding →
//! validation → transactional persistence. Multiple jobs run in parallel on
//! a bounded worker pool; every job carries a cancellation token and a soft
//! whole-document deadline, and failures never leave partial chunk sets
//! visible to queries.

use crate::analyze::StructureAnalyzer;
use crate::chunking::HierarchicalChunker;
use crate::config::EngineConfig;
use crate::core::{
    CancellationToken, ChunkGraph, ChunkNode, DocumentType, ProcessingStatus, Source,
};
use crate::detect::{Detection, DocumentDetector};
use crate::embedding::MultiScaleEmbedder;
use crate::error::{Error, Result};
use crate::io::ReaderRegistry;
use crate::quality::{ValidationReport, score_chunk, validate_source};
use crate::storage::{ChunkStore, ReplaceOutcome};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::mpsc;
use std::time::Instant;

/// Request to ingest one document.
#[derive(Debug, Clone)]
pub struct IngestRequest {
    /// Stable caller-chosen source ID.
    pub source_id: String,
    /// Logical version of this ingestion.
    pub version: String,
    /// Path to the document on disk.
    pub file_path: PathBuf,
    /// Declared MIME type, when the caller knows it.
    pub declared_mime: Option<String>,
}

impl IngestRequest {
    /// Creates a request with no declared MIME type.
    #[must_use]
    pub fn new(
        source_id: impl Into<String>,
        version: impl Into<String>,
        file_path: impl Into<PathBuf>,
    ) -> Self {
        Self {
            source_id: source_id.into(),
            version: version.into(),
            file_path: file_path.into(),
            declared_mime: None,
        }
    }
}

/// Chunk-level counts of one ingestion.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestionCounts {
    /// Chunks persisted in total.
    pub total: usize,
    /// Chunks newly inserted this run.
    pub new: usize,
    /// Chunks carried over unchanged.
    pub unchanged: usize,
    /// Stale chunks removed.
    pub removed: usize,
    /// Chunks rejected by quality or embedding gates.
    pub rejected: usize,
    /// Embedding vectors attached.
    pub vectors: usize,
}

/// Structured result of one ingestion job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestionReport {
    /// Source that was ingested.
    pub source_id: String,
    /// Version that was ingested.
    pub version: String,
    /// Terminal status of the job.
    pub status: ProcessingStatus,
    /// Chunk-level counts.
    pub counts: IngestionCounts,
    /// Errors that terminated or degraded the job.
    pub errors: Vec<String>,
    /// Non-fatal warnings.
    pub warnings: Vec<String>,
    /// Validation report, present for completed runs.
    pub validation: Option<ValidationReport>,
}

/// The hierarchical ingestion pipeline.
pub struct IngestionPipeline {
    config: EngineConfig,
    readers: ReaderRegistry,
    detector: DocumentDetector,
    embedder: Arc<MultiScaleEmbedder>,
    store: Arc<dyn ChunkStore>,
}

impl IngestionPipeline {
    /// Creates a pipeline over a store and an embedder.
    #[must_use]
    pub fn new(
        config: EngineConfig,
        readers: ReaderRegistry,
        embedder: Arc<MultiScaleEmbedder>,
        store: Arc<dyn ChunkStore>,
    ) -> Self {
        Self {
            config,
            readers,
            detector: DocumentDetector::default(),
            embedder,
            store,
        }
    }

    /// Ingests one document, returning the structured report.
    ///
    /// Stage errors are captured in the report (status `failed` or
    /// `cancelled`); the store never exposes a partial chunk set.
    ///
    /// # Errors
    ///
    /// Returns an error only when the source record itself cannot be
    /// written.
    pub fn ingest(
        &self,
        request: &IngestRequest,
        cancel: &CancellationToken,
    ) -> Result<IngestionReport> {
        let started = Instant::now();
        let deadline = started + self.config.concurrency.ingestion_timeout();

        let mut source = Source::new(&request.source_id, &request.version);
        source.filename = request
            .file_path
            .file_name()
            .map(|n| n.to_string_lossy().to_string());
        self.store.put_source(&source)?;
        source.transition(ProcessingStatus::Running);
        self.store.put_source(&source)?;

        match self.run_stages(request, &mut source, cancel, started, deadline) {
            Ok(report) => {
                source.transition(ProcessingStatus::Completed);
                self.store.put_source(&source)?;
                Ok(report)
            }
            Err(err) => {
                let status = if err.is_cancelled() {
                    ProcessingStatus::Cancelled
                } else {
                    ProcessingStatus::Failed
                };
                source.transition(status);
                self.store.put_source(&source)?;
                tracing::warn!(
                    source_id = %request.source_id,
                    status = status.as_str(),
                    %err,
                    "ingestion aborted"
                );
                Ok(IngestionReport {
                    source_id: request.source_id.clone(),
                    version: request.version.clone(),
                    status,
                    counts: IngestionCounts::default(),
                    errors: vec![err.to_string()],
                    warnings: Vec::new(),
                    validation: None,
                })
            }
        }
    }

    /// Ingests a batch of documents with bounded parallelism.
    ///
    /// Results come back in request order. Jobs already running when a
    /// request fails are unaffected; there is no cross-job ordering.
    #[must_use]
    pub fn ingest_batch(
        &self,
        requests: &[IngestRequest],
        cancel: &CancellationToken,
    ) -> Vec<Result<IngestionReport>> {
        let workers = self.config.concurrency.max_concurrent_jobs.min(requests.len().max(1));
        let (task_tx, task_rx) = mpsc::channel::<(usize, IngestRequest)>();
        let task_rx = std::sync::Mutex::new(task_rx);
        let (result_tx, result_rx) = mpsc::channel::<(usize, Result<IngestionReport>)>();

        for (index, request) in requests.iter().enumerate() {
            // Send into an unbounded queue drained by bounded workers.
            let _ = task_tx.send((index, request.clone()));
        }
        drop(task_tx);

        std::thread::scope(|scope| {
            for _ in 0..workers {
                let task_rx = &task_rx;
                let result_tx = result_tx.clone();
                scope.spawn(move || {
                    loop {
                        let task = {
                            let Ok(guard) = task_rx.lock() else { return };
                            guard.recv()
                        };
                        let Ok((index, request)) = task else { return };
                        let result = self.ingest(&request, cancel);
                        if result_tx.send((index, result)).is_err() {
                            return;
                        }
                    }
                });
            }
        });
        drop(result_tx);

        let mut results: Vec<Option<Result<IngestionReport>>> =
            (0..requests.len()).map(|_| None).collect();
        while let Ok((index, result)) = result_rx.recv() {
            results[index] = Some(result);
        }
        results
            .into_iter()
            .map(|r| r.unwrap_or_else(|| Err(Error::Cancelled)))
            .collect()
    }

    fn run_stages(
        &self,
        request: &IngestRequest,
        source: &mut Source,
        cancel: &CancellationToken,
        started: Instant,
        deadline: Instant,
    ) -> Result<IngestionReport> {
        let mut warnings = Vec::new();

        // Stage: detection and extraction.
        cancel.check()?;
        check_deadline(deadline)?;
        let detection = self.detector.detect(
            &request.file_path,
            request.declared_mime.as_deref(),
            &self.readers,
        )?;
        self.apply_detection(source, &detection, request)?;

        if detection.extracted.text.trim().is_empty() {
            warnings.push("document is empty".to_string());
        }

        // Stage: structure analysis.
        cancel.check()?;
        check_deadline(deadline)?;
        let analysis = StructureAnalyzer::analyze(
            &detection.extracted.text,
            Some(&detection.extracted.hints),
        );

        // Stage: hierarchical chunking.
        cancel.check()?;
        check_deadline(deadline)?;
        let chunker =
            HierarchicalChunker::new(self.config.chunking.clone(), detection.strategy_options);
        let mut graph = chunker.chunk(
            &request.source_id,
            &request.version,
            &detection.extracted.text,
            &analysis,
        )?;

        // Stage: quality gating; rejected chunks promote their children.
        cancel.check()?;
        let rejected_by_quality = self.gate_quality(&mut graph, detection.doc_type);
        if rejected_by_quality > 0 {
            warnings.push(format!("{rejected_by_quality} chunk(s) below quality floor"));
        }

        // Stage: multi-scale embedding (parallel batches inside).
        cancel.check()?;
        check_deadline(deadline)?;
        graph.rebuild_siblings();
        let outcome = self.embedder.embed_graph(&mut graph, cancel)?;
        warnings.extend(outcome.warnings.iter().cloned());
        let rejected_by_embedding = outcome.rejected_chunk_ids.len();
        for chunk_id in &outcome.rejected_chunk_ids {
            graph.remove_and_promote(chunk_id);
        }
        if rejected_by_embedding > 0 {
            warnings.push(format!("{rejected_by_embedding} chunk(s) lost every embedding kind"));
        }
        graph.rebuild_siblings();

        let violations = graph.check_invariants();
        if !violations.is_empty() {
            return Err(Error::validation(format!(
                "post-embedding graph invariants violated: {}",
                violations.join("; ")
            )));
        }

        // Stage: validation.
        cancel.check()?;
        let nodes: Vec<ChunkNode> = graph.into_nodes();
        let validation = validate_source(&nodes, detection.doc_type, &self.config.quality);
        warnings.extend(validation.warnings.iter().cloned());

        // Stage: transactional persistence.
        cancel.check()?;
        check_deadline(deadline)?;
        let replace: ReplaceOutcome =
            self.store.replace_chunks(&request.source_id, &request.version, &nodes)?;

        #[allow(clippy::cast_possible_truncation)]
        let elapsed_ms = started.elapsed().as_millis() as u64;
        tracing::info!(
            source_id = %request.source_id,
            version = %request.version,
            chunks = nodes.len(),
            new = replace.inserted,
            elapsed_ms,
            "ingestion completed"
        );

        Ok(IngestionReport {
            source_id: request.source_id.clone(),
            version: request.version.clone(),
            status: ProcessingStatus::Completed,
            counts: IngestionCounts {
                total: nodes.len(),
                new: replace.inserted,
                unchanged: replace.unchanged,
                removed: replace.removed,
                rejected: rejected_by_quality + rejected_by_embedding,
                vectors: outcome.vectors,
            },
            errors: Vec::new(),
            warnings,
            validation: Some(validation),
        })
    }

    /// Copies detection results into the source record and hashes the raw
    /// bytes for the determinism contract.
    fn apply_detection(
        &self,
        source: &mut Source,
        detection: &Detection,
        request: &IngestRequest,
    ) -> Result<()> {
        let bytes = crate::io::FileReader::open(&request.file_path)
            .and_then(|r| r.read_to_bytes())
            .unwrap_or_else(|_| detection.extracted.text.clone().into_bytes());
        let mut hasher = Sha256::new();
        hasher.update(&bytes);
        source.content_hash = format!("{:x}", hasher.finalize());
        source.size_bytes = bytes.len() as u64;
        source.format = detection.format;
        source.doc_type = detection.doc_type;
        self.store.put_source(source)?;
        Ok(())
    }

    /// Removes chunks scoring below the configured floor, promoting their
    /// children. Document roots survive so an empty document still yields
    /// its root chunk.
    fn gate_quality(&self, graph: &mut ChunkGraph, doc_type: DocumentType) -> usize {
        let mut scored: Vec<(String, f64)> = Vec::new();
        let ids: Vec<String> = graph.iter().map(|c| c.chunk_id.clone()).collect();
        for chunk_id in &ids {
            if let Some(chunk) = graph.get_mut(chunk_id) {
                let score = score_chunk(chunk, doc_type);
                chunk.quality_score = score;
                scored.push((chunk_id.clone(), score));
            }
        }

        let mut rejected = 0;
        for (chunk_id, score) in scored {
            if score < self.config.quality.min_chunk_quality {
                let is_root = graph.get(&chunk_id).is_some_and(ChunkNode::is_root);
                if !is_root && graph.remove_and_promote(&chunk_id).is_some() {
                    rejected += 1;
                }
            }
        }
        if rejected > 0 {
            graph.rebuild_siblings();
        }
        rejected
    }
}

fn check_deadline(deadline: Instant) -> Result<()> {
    if Instant::now() >= deadline {
        Err(Error::Cancelled)
    } else {
        Ok(())
    }
}
