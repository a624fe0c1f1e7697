//! Multi-scale embedder.
//!
//! Attaches up to four vectors per chunk (content, contextual, hierarchical,
//! semantic), each computed from a kind-specific text. Provider calls are
//! batched under count and byte clamps, rate-limited through the shared
//! token bucket, retried with exponential backoff and jitter, and checked
//! for vector quality. A chunk is rejected only when every enabled kind
//! fails for it.

use crate::chunking::split_sentences;
use crate::config::{ConcurrencyConfig, EmbeddingConfig};
use crate::core::{CancellationToken, ChunkGraph, ChunkNode, EmbeddingKind};
use crate::embedding::{EmbeddingCache, EmbeddingProvider, TokenBucket, normalise_checked};
use crate::error::{ProviderError, Result};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Number of keywords feeding the semantic kind.
const SEMANTIC_KEYWORD_COUNT: usize = 10;

/// Base backoff delay in milliseconds.
const BACKOFF_BASE_MS: u64 = 100;

/// Common stop words excluded from keyword extraction.
pub(crate) const STOP_WORDS: [&str; 44] = [
    "a", "an", "and", "are", "as", "at", "be", "but", "by", "for", "from", "has", "have", "in",
    "is", "it", "its", "of", "on", "or", "that", "the", "their", "then", "there", "these", "they",
    "this", "to", "was", "were", "which", "will", "with", "you", "your", "can", "do", "does",
    "how", "what", "when", "where", "why",
];

/// Summary of one embedding pass.
#[derive(Debug, Clone, Default)]
pub struct EmbedOutcome {
    /// Chunks that received at least one vector.
    pub embedded_chunks: usize,
    /// Total vectors attached.
    pub vectors: usize,
    /// Chunk IDs rejected because every enabled kind failed.
    pub rejected_chunk_ids: Vec<String>,
    /// Human-readable warnings for kinds that failed on individual chunks.
    pub warnings: Vec<String>,
}

/// Computes and attaches multi-scale embeddings.
pub struct MultiScaleEmbedder {
    provider: Arc<dyn EmbeddingProvider>,
    config: EmbeddingConfig,
    concurrency: ConcurrencyConfig,
    cache: Arc<EmbeddingCache>,
    limiter: Arc<TokenBucket>,
}

impl MultiScaleEmbedder {
    /// Creates an embedder around a provider, sharing the process-wide cache
    /// and rate limiter.
    #[must_use]
    pub fn new(
        provider: Arc<dyn EmbeddingProvider>,
        config: EmbeddingConfig,
        concurrency: ConcurrencyConfig,
        cache: Arc<EmbeddingCache>,
        limiter: Arc<TokenBucket>,
    ) -> Self {
        Self { provider, config, concurrency, cache, limiter }
    }

    /// The provider's frozen dimensionality.
    #[must_use]
    pub fn dimensions(&self) -> usize {
        self.provider.dimensions()
    }

    /// Kinds enabled by configuration.
    #[must_use]
    pub fn enabled_kinds(&self) -> Vec<EmbeddingKind> {
        let mut kinds = Vec::new();
        if self.config.content {
            kinds.push(EmbeddingKind::Content);
        }
        if self.config.contextual {
            kinds.push(EmbeddingKind::Contextual);
        }
        if self.config.hierarchical {
            kinds.push(EmbeddingKind::Hierarchical);
        }
        if self.config.semantic {
            kinds.push(EmbeddingKind::Semantic);
        }
        kinds
    }

    /// Embeds a query string with the given kind's text shaping.
    ///
    /// # Errors
    ///
    /// Returns a provider error when the provider fails after retries.
    pub fn embed_query(&self, kind: EmbeddingKind, query: &str) -> Result<Vec<f32>> {
        if let Some(vector) = self.cache.get(kind, query) {
            return Ok(vector);
        }
        let mut vectors = self.call_provider(&[query.to_string()], None)?;
        let vector = normalise_checked(
            vectors.pop().ok_or_else(|| ProviderError::Fatal {
                reason: "provider returned empty batch".to_string(),
            })?,
            self.provider.dimensions(),
        )?;
        self.cache.put(kind, query, vector.clone());
        Ok(vector)
    }

    /// Attaches embeddings to every chunk in the graph.
    ///
    /// Cancellation between batches is honoured; the in-flight batch always
    /// completes. Rejected chunk IDs are reported, not removed; the caller
    /// owns graph surgery.
    ///
    /// # Errors
    ///
    /// Returns `Error::Cancelled` when the token fires between batches.
    pub fn embed_graph(
        &self,
        graph: &mut ChunkGraph,
        cancel: &CancellationToken,
    ) -> Result<EmbedOutcome> {
        let mut outcome = EmbedOutcome::default();
        let chunk_ids: Vec<String> = graph.iter().map(|c| c.chunk_id.clone()).collect();
        let kinds = self.enabled_kinds();

        // Per-kind text preparation up front; provider calls follow in
        // clamped batches. Chunks with no embeddable text (an empty
        // document root, say) are never attempted and never rejected.
        let mut pending: HashMap<EmbeddingKind, Vec<(String, String)>> = HashMap::new();
        let mut attempted: std::collections::HashSet<String> = std::collections::HashSet::new();
        for chunk_id in &chunk_ids {
            let Some(chunk) = graph.get(chunk_id).cloned() else { continue };
            let previous_tail = previous_sibling_tail(graph, &chunk);
            for &kind in &kinds {
                let text =
                    kind_text(&chunk, kind, previous_tail.as_deref(), &self.config.domain_terms);
                if text.trim().is_empty() {
                    continue;
                }
                attempted.insert(chunk_id.clone());
                if let Some(vector) = self.cache.get(kind, &text) {
                    attach(graph, chunk_id, kind, vector);
                    outcome.vectors += 1;
                } else {
                    pending.entry(kind).or_default().push((chunk_id.clone(), text));
                }
            }
        }

        for (kind, entries) in pending {
            for batch in clamp_batches(&entries, self.config.batch_size, self.config.max_batch_bytes)
            {
                cancel.check()?;
                let texts: Vec<String> =
                    batch.iter().map(|(_, text)| text.clone()).collect();
                match self.call_provider(&texts, Some(cancel)) {
                    Ok(vectors) => {
                        for ((chunk_id, text), vector) in batch.iter().zip(vectors) {
                            match normalise_checked(vector, self.provider.dimensions()) {
                                Ok(vector) => {
                                    self.cache.put(kind, text, vector.clone());
                                    attach(graph, chunk_id, kind, vector);
                                    outcome.vectors += 1;
                                }
                                Err(err) => {
                                    outcome.warnings.push(format!(
                                        "{chunk_id}: {} vector discarded: {err}",
                                        kind.as_str()
                                    ));
                                }
                            }
                        }
                    }
                    Err(err) => {
                        if err.is_cancelled() {
                            return Err(err);
                        }
                        tracing::warn!(kind = kind.as_str(), %err, "embedding batch failed");
                        for (chunk_id, _) in batch {
                            outcome.warnings.push(format!(
                                "{chunk_id}: {} embedding failed: {err}",
                                kind.as_str()
                            ));
                        }
                    }
                }
            }
        }

        for chunk_id in &chunk_ids {
            if let Some(chunk) = graph.get(chunk_id) {
                if chunk.embeddings.is_empty() {
                    if attempted.contains(chunk_id) {
                        outcome.rejected_chunk_ids.push(chunk_id.clone());
                    }
                } else {
                    outcome.embedded_chunks += 1;
                }
            }
        }

        Ok(outcome)
    }

    /// One provider call with rate limiting, retry with backoff and jitter,
    /// and a soft deadline.
    fn call_provider(
        &self,
        texts: &[String],
        cancel: Option<&CancellationToken>,
    ) -> Result<Vec<Vec<f32>>> {
        let refs: Vec<&str> = texts.iter().map(String::as_str).collect();
        let deadline = Instant::now() + self.concurrency.embedding_timeout();
        let mut last_reason = String::new();

        for attempt in 0..=self.config.max_retries {
            if let Some(cancel) = cancel {
                cancel.check()?;
            }
            self.limiter.acquire();
            match self.provider.embed_batch(&refs) {
                Ok(vectors) => return Ok(vectors),
                Err(err) if err.is_retryable() && attempt < self.config.max_retries => {
                    last_reason = err.to_string();
                    let delay = match &err {
                        ProviderError::RateLimited { retry_after_ms } => Duration::from_millis(
                            (*retry_after_ms).max(backoff_ms(attempt, &refs)),
                        ),
                        _ => Duration::from_millis(backoff_ms(attempt, &refs)),
                    };
                    if Instant::now() + delay >= deadline {
                        break;
                    }
                    tracing::debug!(attempt, ?delay, reason = %last_reason, "retrying provider call");
                    std::thread::sleep(delay);
                }
                Err(err) => return Err(err.into()),
            }
        }

        Err(ProviderError::Exhausted {
            attempts: self.config.max_retries + 1,
            reason: if last_reason.is_empty() { "deadline exceeded".to_string() } else { last_reason },
        }
        .into())
    }
}

fn attach(graph: &mut ChunkGraph, chunk_id: &str, kind: EmbeddingKind, vector: Vec<f32>) {
    if let Some(node) = graph.get_mut(chunk_id) {
        node.embeddings.insert(kind, vector);
    }
}

/// Exponential backoff with deterministic jitter derived from the batch.
fn backoff_ms(attempt: u32, texts: &[&str]) -> u64 {
    let base = BACKOFF_BASE_MS * 2u64.pow(attempt.min(6));
    let seed = texts.first().map_or(0, |t| t.len() as u64);
    base + (seed.wrapping_mul(31).wrapping_add(u64::from(attempt))) % (base / 2 + 1)
}

/// Builds the kind-specific text for a chunk.
#[must_use]
pub fn kind_text(
    chunk: &ChunkNode,
    kind: EmbeddingKind,
    previous_sibling_tail: Option<&str>,
    domain_terms: &[String],
) -> String {
    match kind {
        EmbeddingKind::Content => chunk.content.clone(),
        EmbeddingKind::Contextual => {
            let mut text = String::new();
            if let Some(heading) = &chunk.heading {
                text.push_str(heading);
                text.push_str(". ");
            }
            if let Some(tail) = previous_sibling_tail {
                text.push_str(tail);
                text.push(' ');
            }
            text.push_str(&chunk.content);
            text
        }
        EmbeddingKind::Hierarchical => {
            let mut text = chunk.breadcrumb();
            if let Some(heading) = &chunk.heading {
                if !text.ends_with(heading.as_str()) {
                    if !text.is_empty() {
                        text.push_str(" > ");
                    }
                    text.push_str(heading);
                }
            }
            if text.is_empty() {
                chunk.content.chars().take(200).collect()
            } else {
                text
            }
        }
        EmbeddingKind::Semantic => {
            let mut terms = top_keywords(&chunk.content, SEMANTIC_KEYWORD_COUNT);
            let lower = chunk.content.to_lowercase();
            for term in domain_terms {
                if lower.contains(&term.to_lowercase()) && !terms.contains(term) {
                    terms.push(term.clone());
                }
            }
            terms.join(" ")
        }
    }
}

/// Last sentence of the previous sibling in reading order.
fn previous_sibling_tail(graph: &ChunkGraph, chunk: &ChunkNode) -> Option<String> {
    let parent_id = chunk.parent_chunk_id.as_deref()?;
    let parent = graph.get(parent_id)?;
    let position = parent.child_chunk_ids.iter().position(|c| c == &chunk.chunk_id)?;
    if position == 0 {
        return None;
    }
    let previous = graph.get(&parent.child_chunk_ids[position - 1])?;
    let ranges = split_sentences(&previous.content);
    ranges.last().map(|r| previous.content[r.clone()].to_string())
}

/// Top keywords by frequency, stop-word filtered, ties alphabetical.
#[must_use]
pub fn top_keywords(text: &str, count: usize) -> Vec<String> {
    let mut frequencies: HashMap<String, usize> = HashMap::new();
    for word in text.split(|c: char| !c.is_alphanumeric()) {
        if word.len() < 3 {
            continue;
        }
        let term = word.to_lowercase();
        if STOP_WORDS.contains(&term.as_str()) {
            continue;
        }
        *frequencies.entry(term).or_insert(0) += 1;
    }
    let mut terms: Vec<(String, usize)> = frequencies.into_iter().collect();
    terms.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    terms.into_iter().take(count).map(|(term, _)| term).collect()
}


/// Splits pending entries into batches clamped by count and total bytes.
fn clamp_batches(
    entries: &[(String, String)],
    max_count: usize,
    max_bytes: usize,
) -> Vec<Vec<(String, String)>> {
    let mut batches = Vec::new();
    let mut current: Vec<(String, String)> = Vec::new();
    let mut current_bytes = 0usize;

    for (chunk_id, text) in entries {
        let exceeds = !current.is_empty()
            && (current.len() >= max_count || current_bytes + text.len() > max_bytes);
        if exceeds {
            batches.push(std::mem::take(&mut current));
            current_bytes = 0;
        }
        current_bytes += text.len();
        current.push((chunk_id.clone(), text.clone()));
    }
    if !current.is_empty() {
        batches.push(current);
    }
    batches
}
