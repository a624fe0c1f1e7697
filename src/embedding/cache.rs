//! Content-addressed embedding cache.
//!
//! Keys are `(kind, SHA-256(canonicalised text))`; hits bypass the provider
//! entirely. Eviction is LRU with a configured entry bound; the cache is
//! process-wide and thread-safe.

use crate::core::EmbeddingKind;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::sync::Mutex;

/// Cache key: embedding kind plus content digest.
type CacheKey = (EmbeddingKind, [u8; 32]);

struct CacheInner {
    entries: HashMap<CacheKey, Vec<f32>>,
    /// Keys in recency order, least recent first.
    recency: Vec<CacheKey>,
    max_entries: usize,
    hits: u64,
    misses: u64,
}

/// Thread-safe LRU cache of embedding vectors.
pub struct EmbeddingCache {
    inner: Mutex<CacheInner>,
}

impl EmbeddingCache {
    /// Creates a cache bounded to `max_entries`.
    #[must_use]
    pub fn new(max_entries: usize) -> Self {
        Self {
            inner: Mutex::new(CacheInner {
                entries: HashMap::new(),
                recency: Vec::new(),
                max_entries: max_entries.max(1),
                hits: 0,
                misses: 0,
            }),
        }
    }

    /// Content digest of the canonicalised text.
    #[must_use]
    pub fn digest(text: &str) -> [u8; 32] {
        let canonical = canonicalise(text);
        let mut hasher = Sha256::new();
        hasher.update(canonical.as_bytes());
        hasher.finalize().into()
    }

    /// Looks up a vector, refreshing its recency on hit.
    #[must_use]
    pub fn get(&self, kind: EmbeddingKind, text: &str) -> Option<Vec<f32>> {
        let key = (kind, Self::digest(text));
        let Ok(mut inner) = self.inner.lock() else {
            return None;
        };
        if let Some(vector) = inner.entries.get(&key).cloned() {
            inner.recency.retain(|k| k != &key);
            inner.recency.push(key);
            inner.hits += 1;
            Some(vector)
        } else {
            inner.misses += 1;
            None
        }
    }

    /// Inserts a vector, evicting the least-recently-used entry when full.
    pub fn put(&self, kind: EmbeddingKind, text: &str, vector: Vec<f32>) {
        let key = (kind, Self::digest(text));
        let Ok(mut inner) = self.inner.lock() else {
            return;
        };
        if inner.entries.contains_key(&key) {
            inner.entries.insert(key, vector);
            inner.recency.retain(|k| k != &key);
            inner.recency.push(key);
            return;
        }
        while inner.entries.len() >= inner.max_entries {
            if inner.recency.is_empty() {
                break;
            }
            let evicted = inner.recency.remove(0);
            inner.entries.remove(&evicted);
        }
        inner.entries.insert(key, vector);
        inner.recency.push(key);
    }

    /// Number of cached entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.lock().map(|inner| inner.entries.len()).unwrap_or(0)
    }

    /// Whether the cache is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// `(hits, misses)` counters.
    #[must_use]
    pub fn stats(&self) -> (u64, u64) {
        self.inner.lock().map(|inner| (inner.hits, inner.misses)).unwrap_or((0, 0))
    }
}

/// Collapses whitespace runs and trims, so incidental formatting does not
/// fragment the cache.
fn canonicalise(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_miss_then_hit() {
        let cache = EmbeddingCache::new(10);
        assert!(cache.get(EmbeddingKind::Content, "hello").is_none());
        cache.put(EmbeddingKind::Content, "hello", vec![1.0, 2.0]);
        assert_eq!(cache.get(EmbeddingKind::Content, "hello"), Some(vec![1.0, 2.0]));
        assert_eq!(cache.stats(), (1, 1));
    }

    #[test]
    fn test_kind_isolation() {
        let cache = EmbeddingCache::new(10);
        cache.put(EmbeddingKind::Content, "hello", vec![1.0]);
        assert!(cache.get(EmbeddingKind::Semantic, "hello").is_none());
    }

    #[test]
    fn test_canonicalisation_collapses_whitespace() {
        let cache = EmbeddingCache::new(10);
        cache.put(EmbeddingKind::Content, "hello   world", vec![1.0]);
        assert!(cache.get(EmbeddingKind::Content, "hello world").is_some());
        assert!(cache.get(EmbeddingKind::Content, "  hello\nworld  ").is_some());
    }

    #[test]
    fn test_lru_eviction() {
        let cache = EmbeddingCache::new(2);
        cache.put(EmbeddingKind::Content, "a", vec![1.0]);
        cache.put(EmbeddingKind::Content, "b", vec![2.0]);
        // Touch "a" so "b" becomes least recent.
        let _ = cache.get(EmbeddingKind::Content, "a");
        cache.put(EmbeddingKind::Content, "c", vec![3.0]);

        assert!(cache.get(EmbeddingKind::Content, "a").is_some());
        assert!(cache.get(EmbeddingKind::Content, "b").is_none());
        assert!(cache.get(EmbeddingKind::Content, "c").is_some());
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn test_update_existing_key() {
        let cache = EmbeddingCache::new(2);
        cache.put(EmbeddingKind::Content, "a", vec![1.0]);
        cache.put(EmbeddingKind::Content, "a", vec![9.0]);
        assert_eq!(cache.get(EmbeddingKind::Content, "a"), Some(vec![9.0]));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_zero_capacity_clamped() {
        let cache = EmbeddingCache::new(0);
        cache.put(EmbeddingKind::Content, "a", vec![1.0]);
        assert_eq!(cache.len(), 1);
    }
}
