//! Integration tests for corpus-rs.
//!
//! Drives the full pipeline end-to-end over a synthetic fund-management
//! user guide, then exercises the retrieval scenarios the engine is built
//! around: procedure and definition lookup, out-of-scope refusal,
//! hierarchical expansion, diversity caps and degraded lexical mode.

#![allow(clippy::expect_used)]

use corpus_rs::config::EngineConfig;
use corpus_rs::core::{CancellationToken, ChunkContentType, ProcessingStatus, Scale};
use corpus_rs::embedding::{
    DEFAULT_DIMENSIONS, EmbeddingCache, HashEmbeddingProvider, MultiScaleEmbedder, TokenBucket,
};
use corpus_rs::io::ReaderRegistry;
use corpus_rs::pipeline::{IngestRequest, IngestionPipeline};
use corpus_rs::retrieval::{HybridRetriever, RetrievalOptions};
use corpus_rs::storage::{ChunkStore, SearchFilters, SqliteStore};
use proptest::prelude::*;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use tempfile::TempDir;

/// Synthetic fund-management user guide with an instructions block, a
/// table-of-contents block and a glossary.
const FUND_GUIDE: &str = "\
# Fund Management User Guide

Welcome to the fund management user guide. This manual explains how to set up \
funds, manage portfolios and understand the key terminology.

## Table of Contents

Introduction....................3
Creating a Fund.................7
Fund Hierarchy Setup...........12
Managing Portfolios............18
Glossary.......................24

## Creating a Fund

To start the fund creation wizard, click the 'Create Fund' button. The wizard \
guides you through the required fields in order and validates each entry.

Step 1. Enter the fund name and select the base currency for the new fund.
Step 2. Choose the umbrella structure that will hold the fund in the hierarchy.
Step 3. Review the summary page and confirm to create the fund.

### Fund Hierarchy Setup

Funds nest under umbrella structures. To set up the fund hierarchy, open the \
hierarchy editor and drag each fund onto its umbrella. Sub-funds inherit \
reporting settings from their parent umbrella by default.

## Managing Portfolios

Portfolios group the instruments a fund holds. Rebalancing runs daily after \
market close and adjusts the holdings to the target weights configured on the \
portfolio. Managers review drift reports every morning.

## Glossary

NAV means Net Asset Value, the total value of a fund's assets minus its \
liabilities. NAV is calculated once per day after market close.

An umbrella fund refers to a structure holding several sub-funds that share \
administration and governance arrangements.
";

struct TestEngine {
    _temp: TempDir,
    store: Arc<SqliteStore>,
    embedder: Arc<MultiScaleEmbedder>,
    config: EngineConfig,
    guide_path: PathBuf,
}

impl TestEngine {
    fn new() -> Self {
        let temp = TempDir::new().expect("temp dir");
        let guide_path = temp.path().join("fund-management-user-guide.md");
        let mut file = std::fs::File::create(&guide_path).expect("create guide");
        file.write_all(FUND_GUIDE.as_bytes()).expect("write guide");

        let store = Arc::new(SqliteStore::open(temp.path().join("corpus.db")).expect("open store"));
        store.init().expect("init store");

        let config = EngineConfig::default();
        let embedder = Arc::new(MultiScaleEmbedder::new(
            Arc::new(HashEmbeddingProvider::new(DEFAULT_DIMENSIONS)),
            config.embedding.clone(),
            config.concurrency.clone(),
            Arc::new(EmbeddingCache::new(10_000)),
            Arc::new(TokenBucket::new(1_000)),
        ));

        Self { _temp: temp, store, embedder, config, guide_path }
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
    }

    fn lexical_only_retriever(&self) -> HybridRetriever {
        HybridRetriever::new(
            self.store.clone() as Arc<dyn ChunkStore>,
            None,
            self.config.retrieval.clone(),
        )
    }

    fn ingest_guide(&self) -> corpus_rs::pipeline::IngestionReport {
        let request = IngestRequest::new("fund-guide", "v1", &self.guide_path);
        self.pipeline()
            .ingest(&request, &CancellationToken::new())
            .expect("ingest guide")
    }
}

#[test]
fn test_ingest_fund_guide_end_to_end() {
    let engine = TestEngine::new();
    let report = engine.ingest_guide();

    assert_eq!(report.status, ProcessingStatus::Completed);
    assert!(report.counts.total > 4, "expected a real chunk forest");
    assert!(report.counts.vectors > 0);
    let validation = report.validation.expect("validation report");
    assert!(validation.overall_score > 0.0);

    let source = engine.store.get_source("fund-guide").expect("get").expect("source row");
    assert_eq!(source.status, ProcessingStatus::Completed);
    assert!(!source.content_hash.is_empty());

    // The persisted graph is a consistent forest of scales.
    let chunks = engine.store.get_source_chunks("fund-guide").expect("chunks");
    assert!(chunks.iter().any(|c| c.scale == Scale::Document));
    assert!(chunks.iter().any(|c| c.scale == Scale::Section));
    for chunk in &chunks {
        if let Some(parent_id) = &chunk.parent_chunk_id {
            let parent = engine
                .store
                .get_chunk(parent_id)
                .expect("parent query")
                .expect("parent exists");
            assert!(parent.child_chunk_ids.contains(&chunk.chunk_id));
            assert!(parent.scale.is_coarser_than(chunk.scale));
        }
        // Every persisted chunk clears the quality floor.
        assert!(chunk.quality_score >= engine.config.quality.min_chunk_quality);
        // All vectors share the provider dimensionality.
        for vector in chunk.embeddings.values() {
            assert_eq!(vector.len(), DEFAULT_DIMENSIONS);
            assert!(vector.iter().all(|v| v.is_finite()));
        }
    }
}

#[test]
fn test_reingest_is_row_level_noop() {
    let engine = TestEngine::new();
    let first = engine.ingest_guide();
    let second = engine.ingest_guide();

    assert_eq!(second.status, ProcessingStatus::Completed);
    assert_eq!(second.counts.new, 0);
    assert_eq!(second.counts.removed, 0);
    assert_eq!(second.counts.unchanged, first.counts.total);

    // Same chunk ID set both times.
    let ids: Vec<String> = engine
        .store
        .get_source_chunks("fund-guide")
        .expect("chunks")
        .into_iter()
        .map(|c| c.chunk_id)
        .collect();
    assert_eq!(ids.len(), first.counts.total);
}

#[test]
fn test_delete_then_reingest_equals_single_ingest() {
    let engine = TestEngine::new();
    let first = engine.ingest_guide();
    let ids_before: Vec<String> = engine
        .store
        .get_source_chunks("fund-guide")
        .expect("chunks")
        .into_iter()
        .map(|c| c.chunk_id)
        .collect();

    engine.store.delete_source("fund-guide").expect("delete");
    assert_eq!(engine.store.chunk_count("fund-guide").expect("count"), 0);

    let again = engine.ingest_guide();
    assert_eq!(again.counts.total, first.counts.total);
    let ids_after: Vec<String> = engine
        .store
        .get_source_chunks("fund-guide")
        .expect("chunks")
        .into_iter()
        .map(|c| c.chunk_id)
        .collect();
    let mut sorted_before = ids_before;
    let mut sorted_after = ids_after;
    sorted_before.sort();
    sorted_after.sort();
    assert_eq!(sorted_before, sorted_after);
}

#[test]
fn test_scenario_procedure_retrieval() {
    let engine = TestEngine::new();
    engine.ingest_guide();

    let response = engine
        .retriever()
        .retrieve("how to create a fund", &RetrievalOptions::default())
        .expect("retrieve");

    assert!(!response.items.is_empty());
    // Top-ranked item is the fund-creation procedure. Lost-in-middle
    // reordering keeps rank 1 at position 1.
    let top = &response.items[0];
    assert_eq!(top.citation.heading.as_deref(), Some("Creating a Fund"));
    assert!(
        top.chunk.content.contains("fund creation wizard")
            || top.chunk.content.contains("Create Fund")
    );

    // The table-of-contents block must stay out of the top three.
    for item in response.items.iter().take(3) {
        assert_ne!(
            item.chunk.content_type,
            ChunkContentType::TableOfContents,
            "ToC chunk leaked into the top results: {:?}",
            item.chunk.content
        );
    }
}

#[test]
fn test_scenario_definition_retrieval() {
    let engine = TestEngine::new();
    engine.ingest_guide();

    let response = engine
        .retriever()
        .retrieve("what is NAV", &RetrievalOptions::default())
        .expect("retrieve");

    assert!(!response.items.is_empty());
    let top = &response.items[0];
    assert_eq!(top.chunk.content_type, ChunkContentType::Definitions);
    assert!(top.chunk.content.contains("Net Asset Value"));
    assert!(top.score >= 0.5, "definition score too low: {}", top.score);
}

#[test]
fn test_scenario_out_of_scope_query() {
    let engine = TestEngine::new();
    engine.ingest_guide();

    let response = engine
        .retriever()
        .retrieve("what's the weather today", &RetrievalOptions::default())
        .expect("retrieve");

    // Either empty, or weak enough for the downstream generator to refuse.
    for item in &response.items {
        assert!(
            item.score < 0.5,
            "out-of-scope query matched strongly: {} -> {}",
            item.chunk.preview(60),
            item.score
        );
    }
}

#[test]
fn test_scenario_hierarchical_expansion() {
    let engine = TestEngine::new();
    engine.ingest_guide();

    let options = RetrievalOptions {
        k: 3,
        hierarchical_expansion: true,
        max_expansion_chunks: 2,
        lost_in_middle_mitigation: false,
        ..RetrievalOptions::default()
    };
    let response = engine
        .retriever()
        .retrieve("fund hierarchy setup", &options)
        .expect("retrieve");

    assert!(!response.items.is_empty());
    assert!(response.items.len() <= 3);

    // The matched chunk's parent is present alongside it.
    let ids: Vec<&str> = response.items.iter().map(|i| i.chunk.chunk_id.as_str()).collect();
    let anchored = response.items.iter().any(|item| {
        item.chunk
            .parent_chunk_id
            .as_deref()
            .is_some_and(|parent| ids.contains(&parent))
    });
    assert!(anchored, "expected a matched chunk and its parent in the result");
}

#[test]
fn test_scenario_diversity_cap() {
    let engine = TestEngine::new();
    engine.ingest_guide();

    let options = RetrievalOptions {
        k: 10,
        lost_in_middle_mitigation: false,
        ..RetrievalOptions::default()
    };
    let response = engine.retriever().retrieve("fund", &options).expect("retrieve");

    // Everything lives in one source; the per-source cap (3) binds.
    assert!(response.items.len() <= engine.config.retrieval.max_chunks_per_source);
    assert!(
        response
            .items
            .iter()
            .filter(|i| i.chunk.source_id == "fund-guide")
            .count()
            <= 3
    );
}

#[test]
fn test_scenario_degraded_lexical_mode() {
    let engine = TestEngine::new();
    engine.ingest_guide();

    let response = engine
        .lexical_only_retriever()
        .retrieve("create fund wizard", &RetrievalOptions::default())
        .expect("retrieve");

    assert!(response.degraded, "missing provider must flag degradation");
    assert!(!response.items.is_empty(), "lexical search should still answer");
}

#[test]
fn test_heading_text_query_hits_that_section_first() {
    let engine = TestEngine::new();
    engine.ingest_guide();

    let options = RetrievalOptions { lost_in_middle_mitigation: false, ..RetrievalOptions::default() };
    let response = engine
        .retriever()
        .retrieve("Managing Portfolios", &options)
        .expect("retrieve");

    assert!(!response.items.is_empty());
    assert_eq!(
        response.items[0].citation.heading.as_deref(),
        Some("Managing Portfolios")
    );
}

#[test]
fn test_retrieval_respects_k_and_filters() {
    let engine = TestEngine::new();
    engine.ingest_guide();

    let options = RetrievalOptions {
        k: 2,
        filters: SearchFilters {
            source_id: Some("fund-guide".to_string()),
            ..SearchFilters::none()
        },
        ..RetrievalOptions::default()
    };
    let response = engine.retriever().retrieve("fund", &options).expect("retrieve");
    assert!(response.items.len() <= 2);
    for item in &response.items {
        assert_eq!(item.chunk.source_id, "fund-guide");
    }
}

#[test]
fn test_cancelled_ingestion_leaves_no_chunks() {
    let engine = TestEngine::new();
    let cancel = CancellationToken::new();
    cancel.cancel();

    let request = IngestRequest::new("fund-guide", "v1", &engine.guide_path);
    let report = engine.pipeline().ingest(&request, &cancel).expect("ingest");

    assert_eq!(report.status, ProcessingStatus::Cancelled);
    assert_eq!(engine.store.chunk_count("fund-guide").expect("count"), 0);

    // Queries over the cancelled source see nothing.
    let response = engine
        .retriever()
        .retrieve("create fund", &RetrievalOptions::default())
        .expect("retrieve");
    assert!(response.items.is_empty());
}

// ---------------------------------------------------------------------------
// Property-based invariants
// ---------------------------------------------------------------------------

proptest! {
    #[test]
    fn prop_reorder_preserves_multiset(items in proptest::collection::vec(0u32..1000, 0..40)) {
        let reordered = corpus_rs::retrieval::reorder_lost_in_middle(items.clone());
        let mut a = items;
        let mut b = reordered;
        a.sort_unstable();
        b.sort_unstable();
        prop_assert_eq!(a, b);
    }

    #[test]
    fn prop_reorder_noop_for_two_or_fewer(items in proptest::collection::vec(0u32..1000, 0..=2)) {
        let reordered = corpus_rs::retrieval::reorder_lost_in_middle(items.clone());
        prop_assert_eq!(reordered, items);
    }

    #[test]
    fn prop_blended_score_in_unit_interval(
        vector in 0.0f64..=1.0,
        matrix in 0.0f64..=1.5,
        instructional in 0.0f64..=1.0,
        quality in 0.0f64..=1.0,
        contextual in 0.0f64..=1.0,
    ) {
        let config = corpus_rs::config::RetrievalConfig::default();
        let components = corpus_rs::retrieval::ScoreComponents {
            vector_similarity: vector,
            content_type_match: matrix,
            instructional_value: instructional,
            quality_score: quality,
            contextual_relevance: contextual,
        };
        let score = corpus_rs::retrieval::blended_score(&config, &components);
        prop_assert!((0.0..=1.0).contains(&score));
    }

    #[test]
    fn prop_blended_score_monotone_in_vector_component(
        low in 0.0f64..=0.5,
        delta in 0.0f64..=0.5,
        matrix in 0.0f64..=1.5,
        quality in 0.0f64..=1.0,
    ) {
        let config = corpus_rs::config::RetrievalConfig::default();
        let base = corpus_rs::retrieval::ScoreComponents {
            vector_similarity: low,
            content_type_match: matrix,
            instructional_value: 0.5,
            quality_score: quality,
            contextual_relevance: 0.3,
        };
        let bumped = corpus_rs::retrieval::ScoreComponents {
            vector_similarity: low + delta,
            ..base
        };
        prop_assert!(
            corpus_rs::retrieval::blended_score(&config, &bumped)
                >= corpus_rs::retrieval::blended_score(&config, &base)
        );
    }

    #[test]
    fn prop_chunk_ids_deterministic(
        content in "[a-zA-Z0-9 .]{1,200}",
        index in 0usize..64,
    ) {
        let a = corpus_rs::core::chunk_id_for(
            "src", "v1", Scale::Paragraph, &[], index, &content,
        );
        let b = corpus_rs::core::chunk_id_for(
            "src", "v1", Scale::Paragraph, &[], index, &content,
        );
        prop_assert_eq!(&a, &b);
        prop_assert!(a.starts_with("ck_"));
    }

    #[test]
    fn prop_sentence_split_ranges_valid(text in "[a-zA-Z0-9 .!?']{0,400}") {
        let ranges = corpus_rs::chunking::split_sentences(&text);
        for range in ranges {
            prop_assert!(range.start < range.end);
            prop_assert!(range.end <= text.len());
            prop_assert!(text.is_char_boundary(range.start));
            prop_assert!(text.is_char_boundary(range.end));
        }
    }
}
