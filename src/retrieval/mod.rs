//! Hybrid contextual retrieval.
//!
//! Fans out over vector, lexical, multi-scale and filtered-contextual
//! strategies, merges candidates under the blended scoring formula with the
//! content-type match matrix, expands hierarchical and semantic context,
//! mitigates lost-in-the-middle ordering, and enforces diversity caps.
//! Strategy failures degrade the response instead of failing it.

pub mod classify;
pub mod expand;
pub mod rerank;

pub use classify::{ClassifiedQuery, QueryType, classify_query, extract_keywords};
pub use expand::{ExpansionOptions, expand_context};
pub use rerank::{
    ScoreComponents, apply_diversity_caps, blended_score, contextual_relevance,
    matrix_multiplier, matrix_with_overrides, reorder_lost_in_middle,
};

use crate::config::RetrievalConfig;
use crate::core::{ChunkContentType, ChunkNode, EmbeddingKind};
use crate::embedding::MultiScaleEmbedder;
use crate::error::{QueryError, Result};
use crate::storage::{ChunkStore, SearchFilters};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;

/// Cosine similarity below which vector hits are discarded as noise.
const MIN_VECTOR_SIMILARITY: f32 = 0.25;

/// Upper bound on requested result counts.
const MAX_RESULTS: usize = 100;

/// Score discount applied to expansion chunks relative to their anchor.
const EXPANSION_DISCOUNT: f64 = 0.02;

/// Retrieval strategy identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Strategy {
    /// Dense similarity over the content embedding kind.
    VectorOnly,
    /// Full-text BM25 over content and heading.
    Lexical,
    /// Dense similarity over contextual/hierarchical/semantic kinds.
    MultiScale,
    /// Vector search restricted by filters derived from the query type.
    Contextual,
}

impl Strategy {
    /// All strategies in attribution priority order.
    pub const ALL: [Self; 4] = [Self::VectorOnly, Self::Lexical, Self::MultiScale, Self::Contextual];

    /// Canonical camel-case name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::VectorOnly => "vectorOnly",
            Self::Lexical => "lexical",
            Self::MultiScale => "multiScale",
            Self::Contextual => "contextual",
        }
    }
}

/// Options for one retrieval call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetrievalOptions {
    /// Maximum items returned.
    pub k: usize,
    /// Strategies to run; empty means all.
    pub strategies: Vec<Strategy>,
    /// Store-level filters.
    pub filters: SearchFilters,
    /// Include each match's parent and first children.
    pub hierarchical_expansion: bool,
    /// Include each match's nearest siblings by contextual similarity.
    pub semantic_expansion: bool,
    /// Expansion chunks allowed per anchor.
    pub max_expansion_chunks: usize,
    /// Reorder the final list so top items sit at the edges.
    pub lost_in_middle_mitigation: bool,
    /// Override for the per-source diversity cap.
    pub max_chunks_per_source: Option<usize>,
    /// Override for the per-page diversity cap.
    pub max_chunks_per_page: Option<usize>,
}

impl Default for RetrievalOptions {
    fn default() -> Self {
        Self {
            k: 10,
            strategies: Vec::new(),
            filters: SearchFilters::none(),
            hierarchical_expansion: false,
            semantic_expansion: false,
            max_expansion_chunks: 2,
            lost_in_middle_mitigation: true,
            max_chunks_per_source: None,
            max_chunks_per_page: None,
        }
    }
}

/// Citation attached to every returned item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Citation {
    /// Owning source.
    pub source_id: String,
    /// Source version.
    pub version: String,
    /// Section heading, if any.
    pub heading: Option<String>,
    /// Root-first section path.
    pub section_path: Vec<String>,
    /// 1-based page number, if known.
    pub page_number: Option<u32>,
}

impl Citation {
    /// Builds the citation for a chunk.
    #[must_use]
    pub fn for_chunk(chunk: &ChunkNode) -> Self {
        Self {
            source_id: chunk.source_id.clone(),
            version: chunk.version.clone(),
            heading: chunk.heading.clone(),
            section_path: chunk.section_path.clone(),
            page_number: chunk.page_number,
        }
    }
}

/// One ranked retrieval item.
#[derive(Debug, Clone)]
pub struct RetrievedChunk {
    /// The chunk record, embeddings included.
    pub chunk: ChunkNode,
    /// Blended score in [0,1].
    pub score: f64,
    /// Strategy that contributed the largest component.
    pub strategy: Strategy,
    /// Citation record.
    pub citation: Citation,
}

/// Response of one retrieval call.
#[derive(Debug, Clone, Default)]
pub struct RetrievalResponse {
    /// Ranked items, at most `k`.
    pub items: Vec<RetrievedChunk>,
    /// Candidate counts per strategy, before merging.
    pub strategy_stats: BTreeMap<String, usize>,
    /// True when an enabled strategy was silently dropped.
    pub degraded: bool,
}

/// Hybrid retriever over a chunk store and an optional embedder.
///
/// Without an embedder the retriever runs lexical-only and flags responses
/// as degraded.
pub struct HybridRetriever {
    store: Arc<dyn ChunkStore>,
    embedder: Option<Arc<MultiScaleEmbedder>>,
    config: RetrievalConfig,
    timeout: std::time::Duration,
}

impl HybridRetriever {
    /// Creates a retriever with the default 5 second soft timeout.
    #[must_use]
    pub fn new(
        store: Arc<dyn ChunkStore>,
        embedder: Option<Arc<MultiScaleEmbedder>>,
        config: RetrievalConfig,
    ) -> Self {
        Self { store, embedder, config, timeout: std::time::Duration::from_secs(5) }
    }

    /// Overrides the per-request soft timeout.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: std::time::Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Retrieves up to `options.k` chunks for a query.
    ///
    /// # Errors
    ///
    /// Returns a query error for empty queries or out-of-range `k`;
    /// strategy-level failures degrade the response instead.
    pub fn retrieve(&self, query: &str, options: &RetrievalOptions) -> Result<RetrievalResponse> {
        if query.trim().is_empty() {
            return Err(QueryError::EmptyQuery.into());
        }
        if options.k == 0 || options.k > MAX_RESULTS {
            return Err(QueryError::InvalidK { k: options.k, max: MAX_RESULTS }.into());
        }

        let started = std::time::Instant::now();
        let classified = classify_query(query);
        let strategies: Vec<Strategy> = if options.strategies.is_empty() {
            Strategy::ALL.to_vec()
        } else {
            options.strategies.clone()
        };
        let fetch_k = options.k * 2;

        // Fan out over strategies; failures surface as degradation.
        let runs: Vec<(Strategy, Result<Vec<(String, f64)>>)> = strategies
            .par_iter()
            .map(|&strategy| {
                (strategy, self.run_strategy(strategy, query, &classified, fetch_k, &options.filters))
            })
            .collect();

        let mut degraded = false;
        let mut strategy_stats = BTreeMap::new();
        let mut per_chunk: HashMap<String, HashMap<Strategy, f64>> = HashMap::new();
        for (strategy, result) in runs {
            match result {
                Ok(hits) => {
                    strategy_stats.insert(strategy.as_str().to_string(), hits.len());
                    for (chunk_id, score) in hits {
                        per_chunk.entry(chunk_id).or_default().insert(strategy, score);
                    }
                }
                Err(err) => {
                    tracing::warn!(strategy = strategy.as_str(), %err, "retrieval strategy dropped");
                    strategy_stats.insert(strategy.as_str().to_string(), 0);
                    degraded = true;
                }
            }
        }

        let mut ranked = self.rank_candidates(&classified, &per_chunk)?;

        // Fallback: a plain content-vector pass when the blend came up
        // empty, degrading to lexical when the provider itself is out.
        if ranked.is_empty() && per_chunk.is_empty() {
            let fallback_hits = match (
                strategies.contains(&Strategy::VectorOnly),
                strategies.contains(&Strategy::Lexical),
            ) {
                (true, true) => Vec::new(),
                (false, _) => self
                    .vector_candidates(EmbeddingKind::Content, query, fetch_k, &options.filters)
                    .unwrap_or_else(|_| {
                        degraded = true;
                        self.lexical_candidates(query, fetch_k, &options.filters)
                            .unwrap_or_default()
                    }),
                (true, false) => {
                    degraded = true;
                    self.lexical_candidates(query, fetch_k, &options.filters)
                        .unwrap_or_default()
                }
            };
            if !fallback_hits.is_empty() {
                let mut fallback: HashMap<String, HashMap<Strategy, f64>> = HashMap::new();
                for (chunk_id, score) in fallback_hits {
                    fallback.entry(chunk_id).or_default().insert(Strategy::Lexical, score);
                }
                ranked = self.rank_candidates(&classified, &fallback)?;
            }
        }

        ranked.truncate(options.k);

        // Soft deadline: past it, expansion is skipped and what we have so
        // far goes out flagged as degraded.
        let timed_out = started.elapsed() >= self.timeout;
        if timed_out {
            degraded = true;
            tracing::warn!(elapsed = ?started.elapsed(), "retrieval soft timeout hit; skipping expansion");
        }

        // Context expansion around the surviving anchors.
        if !timed_out && (options.hierarchical_expansion || options.semantic_expansion) {
            let expansion = ExpansionOptions {
                hierarchical: options.hierarchical_expansion,
                semantic: options.semantic_expansion,
                max_expansion_chunks: options.max_expansion_chunks,
            };
            let mut seen: HashSet<String> =
                ranked.iter().map(|item| item.chunk.chunk_id.clone()).collect();
            let anchors: Vec<RetrievedChunk> = ranked.clone();
            for anchor in &anchors {
                let extra = expand_context(self.store.as_ref(), &anchor.chunk, &expansion, &|id| {
                    seen.contains(id)
                })?;
                for chunk in extra {
                    seen.insert(chunk.chunk_id.clone());
                    ranked.push(RetrievedChunk {
                        citation: Citation::for_chunk(&chunk),
                        score: (anchor.score - EXPANSION_DISCOUNT).max(0.0),
                        strategy: anchor.strategy,
                        chunk,
                    });
                }
            }
            ranked.sort_by(|a, b| {
                b.score
                    .partial_cmp(&a.score)
                    .unwrap_or(std::cmp::Ordering::Equal)
                    .then_with(|| a.chunk.chunk_id.cmp(&b.chunk.chunk_id))
            });
        }

        // Diversity caps, dropping lowest-scored violators.
        let max_per_source =
            options.max_chunks_per_source.unwrap_or(self.config.max_chunks_per_source);
        let max_per_page = options.max_chunks_per_page.unwrap_or(self.config.max_chunks_per_page);
        let mut final_items = apply_diversity_caps(ranked, max_per_source, max_per_page, |item| {
            (item.chunk.source_id.clone(), item.chunk.page_number)
        });

        final_items.truncate(options.k);
        if options.lost_in_middle_mitigation {
            final_items = reorder_lost_in_middle(final_items);
        }

        tracing::debug!(
            query_type = classified.query_type.as_str(),
            items = final_items.len(),
            degraded,
            "retrieval complete"
        );

        Ok(RetrievalResponse { items: final_items, strategy_stats, degraded })
    }

    fn run_strategy(
        &self,
        strategy: Strategy,
        query: &str,
        classified: &ClassifiedQuery,
        fetch_k: usize,
        filters: &SearchFilters,
    ) -> Result<Vec<(String, f64)>> {
        match strategy {
            Strategy::VectorOnly => {
                self.vector_candidates(EmbeddingKind::Content, query, fetch_k, filters)
            }
            Strategy::Lexical => self.lexical_candidates(query, fetch_k, filters),
            Strategy::MultiScale => {
                let mut merged: HashMap<String, f64> = HashMap::new();
                let embedder = self.require_embedder()?;
                for kind in embedder.enabled_kinds() {
                    if kind == EmbeddingKind::Content {
                        continue;
                    }
                    let query_text = match kind {
                        EmbeddingKind::Semantic => classified.keywords.join(" "),
                        _ => query.to_string(),
                    };
                    if query_text.trim().is_empty() {
                        continue;
                    }
                    for (chunk_id, score) in
                        self.vector_candidates(kind, &query_text, fetch_k, filters)?
                    {
                        let entry = merged.entry(chunk_id).or_insert(0.0);
                        if score > *entry {
                            *entry = score;
                        }
                    }
                }
                Ok(merged.into_iter().collect())
            }
            Strategy::Contextual => {
                let content_type = match classified.query_type {
                    QueryType::Procedure | QueryType::List | QueryType::Troubleshoot => {
                        Some(ChunkContentType::Instructions)
                    }
                    QueryType::Definition => Some(ChunkContentType::Definitions),
                    QueryType::General => None,
                };
                let Some(content_type) = content_type else {
                    return Ok(Vec::new());
                };
                let filters = SearchFilters {
                    content_type: Some(content_type),
                    ..filters.clone()
                };
                self.vector_candidates(EmbeddingKind::Content, query, fetch_k, &filters)
            }
        }
    }

    fn vector_candidates(
        &self,
        kind: EmbeddingKind,
        query_text: &str,
        fetch_k: usize,
        filters: &SearchFilters,
    ) -> Result<Vec<(String, f64)>> {
        let embedder = self.require_embedder()?;
        let vector = embedder.embed_query(kind, query_text)?;
        let hits = self.store.search_by_vector(kind, &vector, fetch_k, filters)?;
        Ok(hits
            .into_iter()
            .filter(|hit| hit.similarity >= MIN_VECTOR_SIMILARITY)
            .map(|hit| (hit.chunk_id, f64::from(hit.similarity).clamp(0.0, 1.0)))
            .collect())
    }

    fn lexical_candidates(
        &self,
        query: &str,
        fetch_k: usize,
        filters: &SearchFilters,
    ) -> Result<Vec<(String, f64)>> {
        // Stop words carry no signal in tiny corpora and let unrelated
        // queries match everything; strip them before the FTS pass.
        let terms: Vec<&str> = query
            .split_whitespace()
            .filter(|term| {
                let normalized: String = term
                    .chars()
                    .filter(|c| c.is_alphanumeric())
                    .collect::<String>()
                    .to_lowercase();
                !normalized.is_empty()
                    && !crate::embedding::multiscale::STOP_WORDS.contains(&normalized.as_str())
            })
            .collect();
        if terms.is_empty() {
            return Ok(Vec::new());
        }

        let hits = self.store.search_by_text(&terms.join(" "), fetch_k, filters)?;
        // Saturating transform keeps the score monotone in term coverage
        // without letting the best weak match look like a perfect one.
        Ok(hits
            .into_iter()
            .map(|h| {
                let score = h.score.max(0.0);
                (h.chunk_id, (score / (score + 1.0)).clamp(0.0, 1.0))
            })
            .collect())
    }

    fn require_embedder(&self) -> Result<&Arc<MultiScaleEmbedder>> {
        self.embedder.as_ref().ok_or_else(|| {
            crate::error::ProviderError::Fatal {
                reason: "no embedding provider configured".to_string(),
            }
            .into()
        })
    }

    /// Fetches candidate chunks and blends their scores.
    fn rank_candidates(
        &self,
        classified: &ClassifiedQuery,
        per_chunk: &HashMap<String, HashMap<Strategy, f64>>,
    ) -> Result<Vec<RetrievedChunk>> {
        let mut ranked = Vec::with_capacity(per_chunk.len());

        for (chunk_id, strategy_scores) in per_chunk {
            let Some(chunk) = self.store.get_chunk(chunk_id)? else {
                continue;
            };

            let similarity = strategy_scores.values().fold(0.0_f64, |a, &b| a.max(b));
            let components = ScoreComponents {
                vector_similarity: similarity,
                content_type_match: matrix_with_overrides(
                    &self.config,
                    classified.query_type,
                    chunk.content_type,
                ),
                instructional_value: chunk.instructional_value,
                quality_score: chunk.quality_score,
                contextual_relevance: contextual_relevance(&classified.keywords, &chunk),
            };
            let score = blended_score(&self.config, &components);

            // Attribute the strategy with the highest raw score; ties break
            // in declaration order.
            let strategy = Strategy::ALL
                .iter()
                .copied()
                .filter_map(|s| strategy_scores.get(&s).map(|score| (s, *score)))
                .max_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal))
                .map_or(Strategy::VectorOnly, |(s, _)| s);

            ranked.push(RetrievedChunk {
                citation: Citation::for_chunk(&chunk),
                score,
                strategy,
                chunk,
            });
        }

        ranked.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.chunk.chunk_id.cmp(&b.chunk.chunk_id))
        });
        Ok(ranked)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ConcurrencyConfig, EmbeddingConfig};
    use crate::core::{Scale, Source};
    use crate::embedding::{
        DEFAULT_DIMENSIONS, EmbeddingCache, HashEmbeddingProvider, TokenBucket,
    };
    use crate::storage::SqliteStore;

    fn embedder() -> Arc<MultiScaleEmbedder> {
        Arc::new(MultiScaleEmbedder::new(
            Arc::new(HashEmbeddingProvider::new(DEFAULT_DIMENSIONS)),
            EmbeddingConfig::default(),
            ConcurrencyConfig::default(),
            Arc::new(EmbeddingCache::new(1000)),
            Arc::new(TokenBucket::new(1000)),
        ))
    }

    fn seed_chunk(
        embedder: &MultiScaleEmbedder,
        content: &str,
        heading: &str,
        content_type: ChunkContentType,
        instructional: f64,
        index: usize,
    ) -> ChunkNode {
        let mut chunk = ChunkNode::new(
            "guide",
            "v1",
            Scale::Paragraph,
            content.to_string(),
            vec!["Fund Management User Guide".to_string(), heading.to_string()],
            index,
        );
        chunk.heading = Some(heading.to_string());
        chunk.content_type = content_type;
        chunk.instructional_value = instructional;
        chunk.quality_score = 0.7;
        let vector = embedder.embed_query(EmbeddingKind::Content, content).unwrap();
        chunk.embeddings.insert(EmbeddingKind::Content, vector);
        chunk
    }

    fn setup() -> (Arc<SqliteStore>, Arc<MultiScaleEmbedder>, Vec<ChunkNode>) {
        let store = Arc::new(SqliteStore::in_memory().unwrap());
        store.init().unwrap();
        store.put_source(&Source::new("guide", "v1")).unwrap();
        let embedder = embedder();

        let chunks = vec![
            seed_chunk(
                &embedder,
                "To start the fund creation wizard, click the 'Create Fund' button and follow the steps to create a fund.",
                "Creating a Fund",
                ChunkContentType::Instructions,
                0.95,
                0,
            ),
            seed_chunk(
                &embedder,
                "Creating a Fund 7",
                "Table of Contents",
                ChunkContentType::TableOfContents,
                0.1,
                1,
            ),
            seed_chunk(
                &embedder,
                "NAV means Net Asset Value, the total assets minus liabilities of a fund.",
                "Glossary",
                ChunkContentType::Definitions,
                0.55,
                2,
            ),
            seed_chunk(
                &embedder,
                "Portfolios group the instruments a fund holds and rebalance to target weights daily.",
                "Managing Portfolios",
                ChunkContentType::Text,
                0.4,
                3,
            ),
        ];
        store.replace_chunks("guide", "v1", &chunks).unwrap();
        (store, embedder, chunks)
    }

    fn retriever(
        store: &Arc<SqliteStore>,
        embedder: Option<Arc<MultiScaleEmbedder>>,
    ) -> HybridRetriever {
        HybridRetriever::new(store.clone(), embedder, RetrievalConfig::default())
    }

    #[test]
    fn test_empty_query_rejected() {
        let (store, embedder, _) = setup();
        let retriever = retriever(&store, Some(embedder));
        let result = retriever.retrieve("   ", &RetrievalOptions::default());
        assert!(matches!(
            result,
            Err(crate::error::Error::Query(QueryError::EmptyQuery))
        ));
    }

    #[test]
    fn test_invalid_k_rejected() {
        let (store, embedder, _) = setup();
        let retriever = retriever(&store, Some(embedder));
        let options = RetrievalOptions { k: 0, ..RetrievalOptions::default() };
        assert!(retriever.retrieve("query", &options).is_err());
        let options = RetrievalOptions { k: 1000, ..RetrievalOptions::default() };
        assert!(retriever.retrieve("query", &options).is_err());
    }

    #[test]
    fn test_procedure_query_ranks_instructions_first() {
        let (store, embedder, chunks) = setup();
        let retriever = retriever(&store, Some(embedder));
        let response =
            retriever.retrieve("how to create a fund", &RetrievalOptions::default()).unwrap();

        assert!(!response.items.is_empty());
        assert_eq!(response.items[0].chunk.chunk_id, chunks[0].chunk_id);
        assert!(!response.degraded);
        // The table-of-contents line stays out of the top three.
        for item in response.items.iter().take(3) {
            assert_ne!(item.chunk.content_type, ChunkContentType::TableOfContents);
        }
    }

    #[test]
    fn test_definition_query_ranks_definition_first() {
        let (store, embedder, chunks) = setup();
        let retriever = retriever(&store, Some(embedder));
        let response = retriever.retrieve("what is NAV", &RetrievalOptions::default()).unwrap();

        assert!(!response.items.is_empty());
        assert_eq!(response.items[0].chunk.chunk_id, chunks[2].chunk_id);
        assert!(response.items[0].score >= 0.5);
    }

    #[test]
    fn test_out_of_scope_query_low_or_empty() {
        let (store, embedder, _) = setup();
        let retriever = retriever(&store, Some(embedder));
        let response = retriever
            .retrieve("what's the weather today", &RetrievalOptions::default())
            .unwrap();
        // Either nothing surfaces or every score is too low to answer from.
        for item in &response.items {
            assert!(item.score < 0.5, "unexpectedly strong match: {}", item.score);
        }
    }

    #[test]
    fn test_k_respected() {
        let (store, embedder, _) = setup();
        let retriever = retriever(&store, Some(embedder));
        let options = RetrievalOptions { k: 1, ..RetrievalOptions::default() };
        let response = retriever.retrieve("fund", &options).unwrap();
        assert!(response.items.len() <= 1);
    }

    #[test]
    fn test_citations_populated() {
        let (store, embedder, _) = setup();
        let retriever = retriever(&store, Some(embedder));
        let response =
            retriever.retrieve("how to create a fund", &RetrievalOptions::default()).unwrap();
        let citation = &response.items[0].citation;
        assert_eq!(citation.source_id, "guide");
        assert_eq!(citation.version, "v1");
        assert_eq!(citation.heading.as_deref(), Some("Creating a Fund"));
        assert!(!citation.section_path.is_empty());
    }

    #[test]
    fn test_degraded_lexical_only_without_embedder() {
        let (store, _, _) = setup();
        let retriever = retriever(&store, None);
        let response =
            retriever.retrieve("create fund wizard", &RetrievalOptions::default()).unwrap();

        assert!(response.degraded);
        assert!(!response.items.is_empty());
        assert_eq!(response.items[0].strategy, Strategy::Lexical);
    }

    #[test]
    fn test_diversity_cap_per_source() {
        let store = Arc::new(SqliteStore::in_memory().unwrap());
        store.init().unwrap();
        store.put_source(&Source::new("guide", "v1")).unwrap();
        let embedder = embedder();

        let chunks: Vec<ChunkNode> = (0..6)
            .map(|i| {
                seed_chunk(
                    &embedder,
                    &format!("Fund management fees accrue daily on class {i} shares."),
                    "Fees",
                    ChunkContentType::Text,
                    0.4,
                    i,
                )
            })
            .collect();
        store.replace_chunks("guide", "v1", &chunks).unwrap();

        let retriever = HybridRetriever::new(
            store.clone(),
            Some(embedder),
            RetrievalConfig::default(),
        );
        let options = RetrievalOptions { k: 10, ..RetrievalOptions::default() };
        let response = retriever.retrieve("fund management fees", &options).unwrap();

        // max_chunks_per_source defaults to 3.
        assert_eq!(response.items.len(), 3);
    }

    #[test]
    fn test_lost_in_middle_disabled_keeps_order() {
        let (store, embedder, _) = setup();
        let retriever = retriever(&store, Some(embedder));
        let options =
            RetrievalOptions { lost_in_middle_mitigation: false, ..RetrievalOptions::default() };
        let response = retriever.retrieve("fund", &options).unwrap();
        for pair in response.items.windows(2) {
            assert!(pair[0].score >= pair[1].score);
        }
    }

    #[test]
    fn test_strategy_stats_reported() {
        let (store, embedder, _) = setup();
        let retriever = retriever(&store, Some(embedder));
        let response =
            retriever.retrieve("how to create a fund", &RetrievalOptions::default()).unwrap();
        assert!(response.strategy_stats.contains_key("vectorOnly"));
        assert!(response.strategy_stats.contains_key("lexical"));
    }

    #[test]
    fn test_explicit_strategy_subset() {
        let (store, embedder, _) = setup();
        let retriever = retriever(&store, Some(embedder));
        let options = RetrievalOptions {
            strategies: vec![Strategy::Lexical],
            ..RetrievalOptions::default()
        };
        let response = retriever.retrieve("create fund", &options).unwrap();
        assert_eq!(response.strategy_stats.len(), 1);
        assert!(response.strategy_stats.contains_key("lexical"));
    }
}
