//! Content-type classification for text blocks.
//!
//! Scores each block against per-type pattern and keyword families, applies
//! per-type acceptance thresholds, and breaks ties with a fixed priority
//! order. Blocks containing numbered procedure steps are never labelled
//! table-of-contents on the strength of line-ending digits alone.

use crate::core::ChunkContentType;
use regex::Regex;
use std::sync::OnceLock;

/// Weight of one pattern hit.
const PATTERN_HIT_WEIGHT: f64 = 0.1;

/// Weight of one keyword hit.
const KEYWORD_HIT_WEIGHT: f64 = 0.05;

/// Floor for the length normaliser, so one-line blocks cannot explode.
const MIN_LENGTH_NORM: f64 = 0.25;

macro_rules! block_regex {
    ($name:ident, $pattern:expr) => {{
        static $name: OnceLock<Regex> = OnceLock::new();
        $name.get_or_init(|| Regex::new($pattern).expect("valid regex"))
    }};
}

/// Classification outcome for one block.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BlockClassification {
    /// Winning content type.
    pub content_type: ChunkContentType,
    /// Confidence in [0,1].
    pub confidence: f64,
}

/// Per-type scoring profile.
struct TypeProfile {
    content_type: ChunkContentType,
    patterns: &'static Regex,
    keywords: &'static [&'static str],
    /// Multiplier applied after normalisation.
    weight: f64,
    /// Score below which this type is rejected.
    threshold: f64,
}

fn profiles() -> [TypeProfile; 5] {
    [
        TypeProfile {
            content_type: ChunkContentType::Instructions,
            patterns: block_regex!(
                INSTR_PAT,
                r"(?im)^\s*(step\s+)?\d+[.)]\s+\S|^\s*step\s+\d+|\b(click|select|choose|enter|press|navigate)\b|\bhow\s+to\b"
            ),
            keywords: &["procedure", "instructions", "wizard", "button", "configure", "create"],
            weight: 1.0,
            threshold: 0.6,
        },
        TypeProfile {
            content_type: ChunkContentType::Definitions,
            patterns: block_regex!(
                DEF_PAT,
                r"(?im)\b(means|is\s+defined\s+as|refers\s+to|stands\s+for)\b|^\s*[A-Z][A-Za-z ()]{1,40}:\s+\S"
            ),
            keywords: &["definition", "glossary", "term", "terminology", "abbreviation"],
            weight: 0.9,
            threshold: 0.5,
        },
        TypeProfile {
            content_type: ChunkContentType::Faq,
            patterns: block_regex!(FAQ_PAT, r"(?im)^\s*q\d*[:.]|^\s*a\d*[:.]|\?\s*$"),
            keywords: &["question", "answer", "faq", "asked"],
            weight: 0.9,
            threshold: 0.5,
        },
        TypeProfile {
            content_type: ChunkContentType::Examples,
            patterns: block_regex!(
                EX_PAT,
                r"(?im)\bfor\s+example\b|\be\.g\.|^\s*example\s*\d*[:.]|```"
            ),
            keywords: &["example", "sample", "illustration", "scenario"],
            weight: 0.8,
            threshold: 0.4,
        },
        TypeProfile {
            content_type: ChunkContentType::TableOfContents,
            patterns: block_regex!(
                TOC_PAT,
                r"(?im)^\s*.{2,80}\.{3,}\s*\d+\s*$|^\s*.{2,60}\s+\d{1,3}\s*$|table\s+of\s+contents"
            ),
            keywords: &["contents", "chapter", "section", "page", "appendix"],
            weight: 0.7,
            threshold: 0.5,
        },
    ]
}

/// Classifies a text block.
///
/// Returns `Text` at zero confidence when no type clears its threshold.
#[must_use]
pub fn classify_block(content: &str) -> BlockClassification {
    if content.trim().is_empty() {
        return BlockClassification { content_type: ChunkContentType::Text, confidence: 0.0 };
    }

    #[allow(clippy::cast_precision_loss)]
    let length_norm = (content.len() as f64 / 1000.0).max(MIN_LENGTH_NORM);
    let procedural = has_step_markers(content);
    let dot_leaders = has_dot_leaders(content);

    let mut accepted: Vec<(ChunkContentType, f64)> = Vec::new();
    for profile in profiles() {
        // Numbered procedure steps never read as a table of contents unless
        // the block carries real leader lines.
        if profile.content_type == ChunkContentType::TableOfContents && procedural && !dot_leaders {
            continue;
        }

        let pattern_hits = profile.patterns.find_iter(content).count();
        let keyword_hits = count_keyword_hits(content, profile.keywords);
        #[allow(clippy::cast_precision_loss)]
        let raw = (pattern_hits as f64).mul_add(
            PATTERN_HIT_WEIGHT,
            keyword_hits as f64 * KEYWORD_HIT_WEIGHT,
        );
        let score = raw / length_norm * profile.weight;

        if score >= profile.threshold {
            accepted.push((profile.content_type, score));
        }
    }

    if accepted.is_empty() {
        return BlockClassification { content_type: ChunkContentType::Text, confidence: 0.0 };
    }

    // Highest score wins; ties fall back to the fixed priority order.
    accepted.sort_by(|a, b| {
        b.1.partial_cmp(&a.1)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| priority_rank(a.0).cmp(&priority_rank(b.0)))
    });
    let (content_type, score) = accepted[0];
    BlockClassification { content_type, confidence: score.clamp(0.0, 1.0) }
}

/// Position in the tie-break order; lower ranks win.
fn priority_rank(content_type: ChunkContentType) -> usize {
    ChunkContentType::PRIORITY
        .iter()
        .position(|t| *t == content_type)
        .unwrap_or(ChunkContentType::PRIORITY.len())
}

/// Whether the block contains numbered procedure steps.
#[must_use]
pub fn has_step_markers(content: &str) -> bool {
    block_regex!(
        STEP_MARKERS,
        r"(?im)^\s*(step\s+)?\d+[.)]\s+\S|^\s*step\s+\d+"
    )
    .is_match(content)
}

fn has_dot_leaders(content: &str) -> bool {
    block_regex!(DOT_LEADERS, r"(?m)\.{3,}\s*\d+\s*$").is_match(content)
}

fn count_keyword_hits(content: &str, keywords: &[&str]) -> usize {
    let lower = content.to_lowercase();
    keywords
        .iter()
        .map(|kw| lower.matches(kw).count())
        .sum()
}
