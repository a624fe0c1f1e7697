//! Re-ranking: blended scoring, content-type matrix, lost-in-middle
//! reordering, and diversity caps.

use crate::config::RetrievalConfig;
use crate::core::{ChunkContentType, ChunkNode};
use crate::retrieval::classify::QueryType;
use std::collections::HashMap;

/// Fixed content-type match matrix; rows are query types, columns content
/// types. Values are multipliers applied to the content-type contribution.
#[must_use]
pub fn matrix_multiplier(query_type: QueryType, content_type: ChunkContentType) -> f64 {
    use ChunkContentType::{Definitions, Examples, Faq, Instructions, TableOfContents, Text};
    match (query_type, content_type) {
        (QueryType::Procedure, Instructions) => 1.50,
        (QueryType::Procedure, Examples) => 1.20,
        (QueryType::Procedure, Definitions) => 0.80,
        (QueryType::Procedure, TableOfContents) => 0.20,
        (QueryType::Procedure, Faq) => 0.70,
        (QueryType::Procedure, Text) => 0.90,

        (QueryType::Definition, Instructions) => 0.40,
        (QueryType::Definition, Examples) => 0.30,
        (QueryType::Definition, Definitions) => 1.50,
        (QueryType::Definition, TableOfContents) => 0.10,
        (QueryType::Definition, Faq) => 0.60,
        (QueryType::Definition, Text) => 0.70,

        (QueryType::List, Instructions) => 1.10,
        (QueryType::List, Examples) => 0.90,
        (QueryType::List, Definitions) => 0.60,
        (QueryType::List, TableOfContents) => 0.30,
        (QueryType::List, Faq) => 0.70,
        (QueryType::List, Text) => 0.80,

        (QueryType::Troubleshoot, Instructions) => 1.20,
        (QueryType::Troubleshoot, Examples) => 0.80,
        (QueryType::Troubleshoot, Definitions) => 0.50,
        (QueryType::Troubleshoot, TableOfContents) => 0.20,
        (QueryType::Troubleshoot, Faq) => 1.10,
        (QueryType::Troubleshoot, Text) => 0.90,

        (QueryType::General, Instructions) => 0.90,
        (QueryType::General, Examples) => 0.80,
        (QueryType::General, Definitions) => 0.80,
        (QueryType::General, TableOfContents) => 0.40,
        (QueryType::General, Faq) => 0.90,
        (QueryType::General, Text) => 1.00,
    }
}

/// Matrix lookup with configured overrides applied.
#[must_use]
pub fn matrix_with_overrides(
    config: &RetrievalConfig,
    query_type: QueryType,
    content_type: ChunkContentType,
) -> f64 {
    let key = format!("{}:{}", query_type.as_str(), content_type.as_str());
    config
        .matrix_overrides
        .get(&key)
        .copied()
        .unwrap_or_else(|| matrix_multiplier(query_type, content_type))
}

/// Score components of one candidate before blending.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ScoreComponents {
    /// Best vector similarity across strategies, in [0,1].
    pub vector_similarity: f64,
    /// Content-type multiplier from the matrix.
    pub content_type_match: f64,
    /// Chunk instructional value, in [0,1].
    pub instructional_value: f64,
    /// Chunk quality score, in [0,1].
    pub quality_score: f64,
    /// Keyword/heading contextual relevance, in [0,1].
    pub contextual_relevance: f64,
}

/// Blends score components with the configured weights; clamped to [0,1].
///
/// The blend is monotone non-decreasing in every component.
#[must_use]
pub fn blended_score(config: &RetrievalConfig, components: &ScoreComponents) -> f64 {
    let score = config.vector_weight * components.vector_similarity
        + config.content_type_weight * components.content_type_match
        + config.instructional_weight * components.instructional_value
        + config.quality_weight * components.quality_score
        + config.contextual_weight * components.contextual_relevance;
    score.clamp(0.0, 1.0)
}

/// Overlap between query keywords and a chunk's heading plus section path,
/// in [0,1].
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn contextual_relevance(keywords: &[String], chunk: &ChunkNode) -> f64 {
    if keywords.is_empty() {
        return 0.0;
    }
    let haystack = format!(
        "{} {}",
        chunk.heading.as_deref().unwrap_or(""),
        chunk.section_path.join(" ")
    )
    .to_lowercase();

    let matched = keywords.iter().filter(|kw| haystack.contains(kw.as_str())).count();
    matched as f64 / keywords.len() as f64
}

/// Lost-in-the-middle mitigation.
///
/// Rank 1 stays first and rank 2 moves last; the remainder interleaves from
/// the outside in, so high scores sit at the edges of the context window.
/// A no-op for two or fewer items; the multiset of items is preserved.
#[must_use]
pub fn reorder_lost_in_middle<T>(ranked: Vec<T>) -> Vec<T> {
    if ranked.len() <= 2 {
        return ranked;
    }
    let mut front = Vec::with_capacity(ranked.len().div_ceil(2));
    let mut back = Vec::with_capacity(ranked.len() / 2);
    for (i, item) in ranked.into_iter().enumerate() {
        if i % 2 == 0 {
            front.push(item);
        } else {
            back.push(item);
        }
    }
    back.reverse();
    front.extend(back);
    front
}

/// Diversity caps: at most `max_per_source` items per source and
/// `max_per_page` per `(source, page)` pair.
///
/// Items are dropped lowest-score-first; the input must already be sorted
/// best-first.
#[must_use]
pub fn apply_diversity_caps<T, F>(
    ranked: Vec<T>,
    max_per_source: usize,
    max_per_page: usize,
    key: F,
) -> Vec<T>
where
    F: Fn(&T) -> (String, Option<u32>),
{
    let mut per_source: HashMap<String, usize> = HashMap::new();
    let mut per_page: HashMap<(String, u32), usize> = HashMap::new();
    let mut kept = Vec::with_capacity(ranked.len());

    for item in ranked {
        let (source_id, page) = key(&item);
        let source_seen = per_source.entry(source_id.clone()).or_insert(0);
        if *source_seen >= max_per_source {
            continue;
        }
        if let Some(page) = page {
            let page_seen = per_page.entry((source_id.clone(), page)).or_insert(0);
            if *page_seen >= max_per_page {
                continue;
            }
            *page_seen += 1;
        }
        *source_seen += 1;
        kept.push(item);
    }
    kept
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Scale;

    #[test]
    fn test_matrix_spot_values() {
        assert!((matrix_multiplier(QueryType::Procedure, ChunkContentType::Instructions) - 1.5).abs() < f64::EPSILON);
        assert!((matrix_multiplier(QueryType::Procedure, ChunkContentType::TableOfContents) - 0.2).abs() < f64::EPSILON);
        assert!((matrix_multiplier(QueryType::Definition, ChunkContentType::Definitions) - 1.5).abs() < f64::EPSILON);
        assert!((matrix_multiplier(QueryType::General, ChunkContentType::Text) - 1.0).abs() < f64::EPSILON);
        assert!((matrix_multiplier(QueryType::Troubleshoot, ChunkContentType::Faq) - 1.1).abs() < f64::EPSILON);
    }

    #[test]
    fn test_matrix_override() {
        let mut config = RetrievalConfig::default();
        config
            .matrix_overrides
            .insert("procedure:instructions".to_string(), 2.0);
        assert!(
            (matrix_with_overrides(&config, QueryType::Procedure, ChunkContentType::Instructions)
                - 2.0)
                .abs()
                < f64::EPSILON
        );
        // Untouched cells fall back to the fixed matrix.
        assert!(
            (matrix_with_overrides(&config, QueryType::Procedure, ChunkContentType::Faq) - 0.7)
                .abs()
                < f64::EPSILON
        );
    }

    #[test]
    fn test_blended_score_weights() {
        let config = RetrievalConfig::default();
        let components = ScoreComponents {
            vector_similarity: 1.0,
            content_type_match: 0.0,
            instructional_value: 0.0,
            quality_score: 0.0,
            contextual_relevance: 0.0,
        };
        assert!((blended_score(&config, &components) - 0.40).abs() < 1e-9);
    }

    #[test]
    fn test_blended_score_clamped() {
        let config = RetrievalConfig::default();
        let components = ScoreComponents {
            vector_similarity: 1.0,
            content_type_match: 1.5,
            instructional_value: 1.0,
            quality_score: 1.0,
            contextual_relevance: 1.0,
        };
        let score = blended_score(&config, &components);
        assert!((score - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_blended_score_monotone() {
        let config = RetrievalConfig::default();
        let base = ScoreComponents {
            vector_similarity: 0.3,
            content_type_match: 0.5,
            instructional_value: 0.4,
            quality_score: 0.5,
            contextual_relevance: 0.2,
        };
        let base_score = blended_score(&config, &base);
        for bump in [
            ScoreComponents { vector_similarity: 0.5, ..base },
            ScoreComponents { content_type_match: 0.9, ..base },
            ScoreComponents { instructional_value: 0.9, ..base },
            ScoreComponents { quality_score: 0.9, ..base },
            ScoreComponents { contextual_relevance: 0.9, ..base },
        ] {
            assert!(blended_score(&config, &bump) >= base_score);
        }
    }

    #[test]
    fn test_contextual_relevance() {
        let mut chunk =
            ChunkNode::new("s", "v1", Scale::Paragraph, "body".into(), vec!["Fund Guide".into()], 0);
        chunk.heading = Some("Creating a Fund".into());
        let keywords = vec!["creat".to_string(), "fund".to_string()];
        assert!((contextual_relevance(&keywords, &chunk) - 1.0).abs() < f64::EPSILON);

        let keywords = vec!["weather".to_string(), "fund".to_string()];
        assert!((contextual_relevance(&keywords, &chunk) - 0.5).abs() < f64::EPSILON);

        assert!(contextual_relevance(&[], &chunk).abs() < f64::EPSILON);
    }

    #[test]
    fn test_reorder_noop_small() {
        assert_eq!(reorder_lost_in_middle(vec![1]), vec![1]);
        assert_eq!(reorder_lost_in_middle(vec![1, 2]), vec![1, 2]);
        assert_eq!(reorder_lost_in_middle(Vec::<i32>::new()), Vec::<i32>::new());
    }

    #[test]
    fn test_reorder_best_first_second_last() {
        let reordered = reorder_lost_in_middle(vec![1, 2, 3, 4, 5]);
        assert_eq!(reordered.first(), Some(&1));
        assert_eq!(reordered.last(), Some(&2));
        assert_eq!(reordered, vec![1, 3, 5, 4, 2]);
    }

    #[test]
    fn test_reorder_preserves_multiset() {
        let original = vec![10, 20, 30, 40, 50, 60, 70];
        let mut reordered = reorder_lost_in_middle(original.clone());
        reordered.sort_unstable();
        let mut sorted = original;
        sorted.sort_unstable();
        assert_eq!(reordered, sorted);
    }

    #[test]
    fn test_diversity_caps_per_source() {
        let items: Vec<(String, Option<u32>, u32)> = (0..6)
            .map(|i| ("guide".to_string(), None, i))
            .collect();
        let kept = apply_diversity_caps(items, 3, 2, |item| (item.0.clone(), item.1));
        assert_eq!(kept.len(), 3);
        // Highest-ranked survive.
        assert_eq!(kept[0].2, 0);
        assert_eq!(kept[2].2, 2);
    }

    #[test]
    fn test_diversity_caps_per_page() {
        let items = vec![
            ("guide".to_string(), Some(1), 0),
            ("guide".to_string(), Some(1), 1),
            ("guide".to_string(), Some(1), 2),
            ("guide".to_string(), Some(2), 3),
        ];
        let kept = apply_diversity_caps(items, 10, 2, |item| (item.0.clone(), item.1));
        assert_eq!(kept.len(), 3);
        assert!(kept.iter().filter(|i| i.1 == Some(1)).count() <= 2);
    }

    #[test]
    fn test_diversity_multiple_sources_untouched() {
        let items = vec![
            ("a".to_string(), None, 0),
            ("b".to_string(), None, 1),
            ("c".to_string(), None, 2),
        ];
        let kept = apply_diversity_caps(items, 1, 1, |item| (item.0.clone(), item.1));
        assert_eq!(kept.len(), 3);
    }
}
