//! Semantic boundary refinement.
//!
//! Computes a lexical cosine similarity between adjacent blocks (TF-IDF over
//! lowercased word stems) and merges neighbours whose boundary similarity
//! exceeds the configured threshold while the merged size stays in band.

use std::collections::HashMap;
use unicode_segmentation::UnicodeSegmentation;

/// Term frequency vector of one block.
#[derive(Debug, Clone, Default)]
pub struct TermVector {
    counts: HashMap<String, f64>,
}

impl TermVector {
    /// Builds a term vector from text, lowercasing and stripping possessives.
    #[must_use]
    pub fn from_text(text: &str) -> Self {
        let mut counts: HashMap<String, f64> = HashMap::new();
        for word in text.unicode_words() {
            let term = word.to_lowercase();
            let term = term.strip_suffix("'s").map_or(term.clone(), ToString::to_string);
            *counts.entry(term).or_insert(0.0) += 1.0;
        }
        Self { counts }
    }

    /// Number of distinct terms.
    #[must_use]
    pub fn term_count(&self) -> usize {
        self.counts.len()
    }
}

/// Cosine similarity between two adjacent blocks with inverse-document
/// weighting across the pair.
///
/// Returns 0 when either block has no terms.
#[must_use]
pub fn boundary_similarity(a: &TermVector, b: &TermVector) -> f64 {
    if a.counts.is_empty() || b.counts.is_empty() {
        return 0.0;
    }

    // Document frequency over the two-block corpus: shared terms get lower
    // weight than a plain cosine would give them, keeping function words
    // from dominating.
    let idf = |term: &str| {
        let df = usize::from(a.counts.contains_key(term)) + usize::from(b.counts.contains_key(term));
        #[allow(clippy::cast_precision_loss)]
        let df = df as f64;
        (1.0 + 2.0 / df).ln()
    };

    let weight = |vec: &TermVector, term: &str| vec.counts.get(term).copied().unwrap_or(0.0) * idf(term);

    let mut dot = 0.0;
    for term in a.counts.keys() {
        dot += weight(a, term) * weight(b, term);
    }

    let norm = |vec: &TermVector| {
        vec.counts
            .keys()
            .map(|t| weight(vec, t).powi(2))
            .sum::<f64>()
            .sqrt()
    };
    let (norm_a, norm_b) = (norm(a), norm(b));
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

/// Merge plan for a run of adjacent blocks.
///
/// Given block texts and a merge predicate (size guard), returns groups of
/// adjacent block indices to merge; every index appears exactly once, in
/// order.
pub fn plan_merges<F>(blocks: &[&str], threshold: f64, can_merge: F) -> Vec<Vec<usize>>
where
    F: Fn(&[usize]) -> bool,
{
    let vectors: Vec<TermVector> = blocks.iter().map(|b| TermVector::from_text(b)).collect();

    let mut groups: Vec<Vec<usize>> = Vec::new();
    let mut current = vec![0];

    for i in 1..blocks.len() {
        let similarity = boundary_similarity(&vectors[i - 1], &vectors[i]);
        let mut candidate = current.clone();
        candidate.push(i);
        if similarity > threshold && can_merge(&candidate) {
            current = candidate;
        } else {
            groups.push(std::mem::replace(&mut current, vec![i]));
        }
    }
    if blocks.is_empty() {
        return groups;
    }
    groups.push(current);
    groups
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identical_blocks_high_similarity() {
        let a = TermVector::from_text("fund management fees accrue daily");
        let b = TermVector::from_text("fund management fees accrue daily");
        assert!(boundary_similarity(&a, &b) > 0.99);
    }

    #[test]
    fn test_disjoint_blocks_zero_similarity() {
        let a = TermVector::from_text("alpha beta gamma");
        let b = TermVector::from_text("delta epsilon zeta");
        assert!(boundary_similarity(&a, &b).abs() < 1e-9);
    }

    #[test]
    fn test_related_blocks_moderate_similarity() {
        let a = TermVector::from_text("the fund invests in equities and bonds");
        let b = TermVector::from_text("the fund allocates between bonds and cash");
        let sim = boundary_similarity(&a, &b);
        assert!(sim > 0.1 && sim < 0.99, "similarity was {sim}");
    }

    #[test]
    fn test_empty_block_zero() {
        let a = TermVector::from_text("");
        let b = TermVector::from_text("anything");
        assert!(boundary_similarity(&a, &b).abs() < f64::EPSILON);
    }

    #[test]
    fn test_plan_merges_similar_neighbours() {
        let blocks = vec![
            "fund fees accrue daily on fund assets",
            "fund fees are charged to fund assets monthly",
            "the weather in spring is mild and wet",
        ];
        let refs: Vec<&str> = blocks.clone();
        let groups = plan_merges(&refs, 0.3, |_| true);
        assert_eq!(groups, vec![vec![0, 1], vec![2]]);
    }

    #[test]
    fn test_plan_merges_size_guard() {
        let blocks = vec!["same words here", "same words here", "same words here"];
        // Size guard forbids groups larger than one block.
        let groups = plan_merges(&blocks, 0.3, |group| group.len() <= 1);
        assert_eq!(groups, vec![vec![0], vec![1], vec![2]]);
    }

    #[test]
    fn test_plan_merges_empty() {
        let blocks: Vec<&str> = Vec::new();
        assert!(plan_merges(&blocks, 0.3, |_| true).is_empty());
    }

    #[test]
    fn test_plan_merges_single() {
        let groups = plan_merges(&["only block"], 0.3, |_| true);
        assert_eq!(groups, vec![vec![0]]);
    }

    #[test]
    fn test_term_vector_possessive() {
        let vec = TermVector::from_text("fund's assets");
        assert!(vec.counts.contains_key("fund"));
    }
}
