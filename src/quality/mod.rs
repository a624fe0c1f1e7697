//! Chunk and document quality validation.
//!
//! Scores individual chunks with the additive rules the chunker relies on to
//! gate persistence, detects exact and near duplicates, computes readability
//! and lexical diversity, and rolls everything into a per-source validation
//! report with a letter grade and actionable recommendations.

use crate::analyze::has_step_markers;
use crate::config::QualityConfig;
use crate::core::{ChunkContentType, ChunkNode, DocumentType};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};

/// Axis weights for the overall document score (out of 100).
const BASIC_WEIGHT: f64 = 0.30;
const CONTENT_WEIGHT: f64 = 0.25;
const STRUCTURAL_WEIGHT: f64 = 0.20;
const DUPLICATE_WEIGHT: f64 = 0.15;
const EMBEDDING_WEIGHT: f64 = 0.10;

/// Shingle size for near-duplicate detection.
const SHINGLE_SIZE: usize = 3;

/// Flesch score below which a readability warning is raised.
const READABILITY_WARNING_FLOOR: f64 = 30.0;

/// Diversity ratio below which a repetition warning is raised.
const DIVERSITY_WARNING_FLOOR: f64 = 0.3;

/// Letter grade over the overall score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Grade {
    /// 90 and above.
    Excellent,
    /// 80 to 89.
    Good,
    /// 70 to 79.
    Fair,
    /// 60 to 69.
    Poor,
    /// Below 60.
    VeryPoor,
}

impl Grade {
    /// Maps an overall score to its grade band.
    #[must_use]
    pub fn from_score(score: f64) -> Self {
        if score >= 90.0 {
            Self::Excellent
        } else if score >= 80.0 {
            Self::Good
        } else if score >= 70.0 {
            Self::Fair
        } else if score >= 60.0 {
            Self::Poor
        } else {
            Self::VeryPoor
        }
    }
}

/// Duplicate findings across one source's chunks.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DuplicateReport {
    /// Pairs of chunk IDs with identical canonicalised content.
    pub exact: Vec<(String, String)>,
    /// Pairs of chunk IDs whose shingle Jaccard meets the threshold.
    pub near: Vec<(String, String, f64)>,
}

impl DuplicateReport {
    /// Chunk IDs involved in any duplicate pair.
    #[must_use]
    pub fn flagged_ids(&self) -> HashSet<String> {
        let mut ids = HashSet::new();
        for (a, b) in &self.exact {
            ids.insert(a.clone());
            ids.insert(b.clone());
        }
        for (a, b, _) in &self.near {
            ids.insert(a.clone());
            ids.insert(b.clone());
        }
        ids
    }
}

/// Per-axis scores, each already weighted into its share of 100.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct AxisScores {
    /// Basic metrics share (max 30).
    pub basic: f64,
    /// Content quality share (max 25).
    pub content: f64,
    /// Structural fit share (max 20).
    pub structural: f64,
    /// Duplicate analysis share (max 15).
    pub duplicates: f64,
    /// Embedding quality share (max 10).
    pub embedding: f64,
}

/// Per-source validation report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationReport {
    /// Overall score out of 100.
    pub overall_score: f64,
    /// Letter grade.
    pub grade: Grade,
    /// Weighted axis breakdown.
    pub axes: AxisScores,
    /// Number of chunks evaluated.
    pub chunk_count: usize,
    /// Blocking issues found.
    pub issues: Vec<String>,
    /// Non-blocking warnings.
    pub warnings: Vec<String>,
    /// Recommendations keyed by category.
    pub recommendations: BTreeMap<String, Vec<String>>,
    /// Duplicate findings.
    pub duplicates: DuplicateReport,
}

/// Scores a single chunk in [0,1].
///
/// Base 0.5, adjusted for length, procedural and definitional value, and
/// penalised for table-of-contents content inside instructional documents.
#[must_use]
pub fn score_chunk(chunk: &ChunkNode, doc_type: DocumentType) -> f64 {
    let mut score: f64 = 0.5;

    if chunk.word_count >= 100 {
        score += 0.1;
    }
    if chunk.word_count >= 500 {
        score += 0.1;
    }
    if chunk.content_type == ChunkContentType::Instructions && has_step_markers(&chunk.content) {
        score += 0.1;
    }
    if matches!(chunk.content_type, ChunkContentType::Definitions | ChunkContentType::Examples) {
        score += 0.1;
    }
    if chunk.content_type == ChunkContentType::TableOfContents && doc_type.is_instructional() {
        score -= 0.3;
    }

    score.clamp(0.0, 1.0)
}

/// Flesch Reading Ease of a text; higher is easier.
#[must_use]
pub fn flesch_reading_ease(text: &str) -> f64 {
    let words: Vec<&str> = text.split_whitespace().collect();
    if words.is_empty() {
        return 0.0;
    }
    let sentence_count = crate::chunking::split_sentences(text).len().max(1);
    let syllable_count: usize = words.iter().map(|w| syllables(w)).sum();

    #[allow(clippy::cast_precision_loss)]
    let (words_f, sentences_f, syllables_f) =
        (words.len() as f64, sentence_count as f64, syllable_count as f64);

    84.6f64.mul_add(
        -(syllables_f / words_f),
        1.015f64.mul_add(-(words_f / sentences_f), 206.835),
    )
}

/// Ratio of unique words to total words.
#[must_use]
pub fn content_diversity(text: &str) -> f64 {
    let words: Vec<String> = text.split_whitespace().map(str::to_lowercase).collect();
    if words.is_empty() {
        return 0.0;
    }
    let unique: HashSet<&String> = words.iter().collect();
    #[allow(clippy::cast_precision_loss)]
    let ratio = unique.len() as f64 / words.len() as f64;
    ratio
}

/// Vowel-group syllable estimate with a silent-e adjustment.
fn syllables(word: &str) -> usize {
    let lower = word.to_lowercase();
    let mut count = 0;
    let mut previous_vowel = false;
    for ch in lower.chars() {
        let vowel = matches!(ch, 'a' | 'e' | 'i' | 'o' | 'u' | 'y');
        if vowel && !previous_vowel {
            count += 1;
        }
        previous_vowel = vowel;
    }
    if lower.ends_with('e') && count > 1 {
        count -= 1;
    }
    count.max(1)
}

/// Detects exact (MD5) and near (shingle Jaccard) duplicates.
#[must_use]
pub fn detect_duplicates(chunks: &[ChunkNode], near_threshold: f64) -> DuplicateReport {
    let mut report = DuplicateReport::default();

    // Exact duplicates by digest of canonicalised content.
    let mut by_digest: HashMap<String, Vec<&ChunkNode>> = HashMap::new();
    for chunk in chunks {
        let canonical = canonicalise(&chunk.content);
        let digest = format!("{:x}", md5::compute(canonical.as_bytes()));
        by_digest.entry(digest).or_default().push(chunk);
    }
    for group in by_digest.values() {
        for pair in group.windows(2) {
            report.exact.push((pair[0].chunk_id.clone(), pair[1].chunk_id.clone()));
        }
    }

    // Near duplicates by Jaccard over word shingles, same-scale pairs only.
    let shingle_sets: Vec<(usize, HashSet<u64>)> = chunks
        .iter()
        .enumerate()
        .map(|(i, c)| (i, shingles(&c.content)))
        .collect();
    let exact_ids: HashSet<(String, String)> = report.exact.iter().cloned().collect();

    for i in 0..shingle_sets.len() {
        for j in (i + 1)..shingle_sets.len() {
            let (a_idx, ref a_set) = shingle_sets[i];
            let (b_idx, ref b_set) = shingle_sets[j];
            if chunks[a_idx].scale != chunks[b_idx].scale {
                continue;
            }
            let pair = (chunks[a_idx].chunk_id.clone(), chunks[b_idx].chunk_id.clone());
            if exact_ids.contains(&pair) {
                continue;
            }
            let similarity = jaccard(a_set, b_set);
            if similarity >= near_threshold {
                report.near.push((pair.0, pair.1, similarity));
            }
        }
    }

    report
}

fn canonicalise(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ").to_lowercase()
}

fn shingles(text: &str) -> HashSet<u64> {
    use std::collections::hash_map::DefaultHasher;
    use std::hash::{Hash, Hasher};

    let words: Vec<String> = canonicalise(text).split(' ').map(ToString::to_string).collect();
    let mut set = HashSet::new();
    if words.len() < SHINGLE_SIZE {
        let mut hasher = DefaultHasher::new();
        words.join(" ").hash(&mut hasher);
        set.insert(hasher.finish());
        return set;
    }
    for window in words.windows(SHINGLE_SIZE) {
        let mut hasher = DefaultHasher::new();
        window.join(" ").hash(&mut hasher);
        set.insert(hasher.finish());
    }
    set
}

#[allow(clippy::cast_precision_loss)]
fn jaccard(a: &HashSet<u64>, b: &HashSet<u64>) -> f64 {
    if a.is_empty() && b.is_empty() {
        return 1.0;
    }
    let intersection = a.intersection(b).count();
    let union = a.len() + b.len() - intersection;
    if union == 0 { 0.0 } else { intersection as f64 / union as f64 }
}

/// Validates one source's chunk set and produces the full report.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn validate_source(
    chunks: &[ChunkNode],
    doc_type: DocumentType,
    config: &QualityConfig,
) -> ValidationReport {
    let mut issues = Vec::new();
    let mut warnings = Vec::new();
    let mut recommendations: BTreeMap<String, Vec<String>> = BTreeMap::new();

    if chunks.is_empty() {
        issues.push("no chunks were produced".to_string());
        return ValidationReport {
            overall_score: 0.0,
            grade: Grade::VeryPoor,
            axes: AxisScores::default(),
            chunk_count: 0,
            issues,
            warnings,
            recommendations,
            duplicates: DuplicateReport::default(),
        };
    }

    let total = chunks.len() as f64;

    // Basic metrics: token counts inside the hard bounds, non-empty words.
    let in_bounds = chunks
        .iter()
        .filter(|c| c.token_count <= 10_000 && c.word_count > 0)
        .count() as f64;
    let basic = in_bounds / total * 100.0 * BASIC_WEIGHT;

    // Content quality: mean per-chunk quality score.
    let mean_quality = chunks.iter().map(|c| c.quality_score).sum::<f64>() / total;
    let content = mean_quality * 100.0 * CONTENT_WEIGHT;

    // Structural fit: non-root chunks must carry parents and section paths.
    let structural_ok = chunks
        .iter()
        .filter(|c| c.is_root() || (c.parent_chunk_id.is_some() && !c.section_path.is_empty()))
        .count() as f64;
    let structural = structural_ok / total * 100.0 * STRUCTURAL_WEIGHT;

    // Duplicates: flagged, never auto-removed.
    let duplicates = detect_duplicates(chunks, config.max_duplicate_threshold);
    let flagged = duplicates.flagged_ids().len() as f64;
    let duplicate_axis = (1.0 - flagged / total).max(0.0) * 100.0 * DUPLICATE_WEIGHT;

    // Embedding quality: share of chunks carrying at least one vector.
    let embedded = chunks.iter().filter(|c| !c.embeddings.is_empty()).count() as f64;
    let embedding = embedded / total * 100.0 * EMBEDDING_WEIGHT;

    let overall_score = basic + content + structural + duplicate_axis + embedding;
    let grade = Grade::from_score(overall_score);

    if !duplicates.exact.is_empty() || !duplicates.near.is_empty() {
        warnings.push(format!(
            "{} duplicate chunk pair(s) flagged",
            duplicates.exact.len() + duplicates.near.len()
        ));
        recommendations
            .entry("duplicates".to_string())
            .or_default()
            .push("review flagged chunks; consider deduplicating the source".to_string());
    }

    for chunk in chunks {
        if chunk.scale == crate::core::Scale::Paragraph {
            let readability = flesch_reading_ease(&chunk.content);
            if readability < READABILITY_WARNING_FLOOR && chunk.word_count >= 30 {
                warnings.push(format!(
                    "{}: low readability ({readability:.0})",
                    chunk.chunk_id
                ));
            }
            let diversity = content_diversity(&chunk.content);
            if diversity < DIVERSITY_WARNING_FLOOR && chunk.word_count >= 30 {
                warnings.push(format!("{}: repetitive content", chunk.chunk_id));
            }
        }
    }

    if mean_quality < config.min_overall_quality {
        recommendations
            .entry("content".to_string())
            .or_default()
            .push("average chunk quality is low; check source structure and headings".to_string());
    }
    if embedded < total {
        recommendations
            .entry("embedding".to_string())
            .or_default()
            .push("some chunks lack embeddings; verify the provider configuration".to_string());
    }
    if doc_type == DocumentType::Unknown {
        recommendations
            .entry("detection".to_string())
            .or_default()
            .push("document type was not classified; retrieval weighting is generic".to_string());
    }

    ValidationReport {
        overall_score,
        grade,
        axes: AxisScores {
            basic,
            content,
            structural,
            duplicates: duplicate_axis,
            embedding,
        },
        chunk_count: chunks.len(),
        issues,
        warnings,
        recommendations,
        duplicates,
    }
}
