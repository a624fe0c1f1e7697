//! Structure analysis: headings, sections, and per-block content typing.
//!
//! Produces a structural outline from extracted text: heading-delimited
//! sections with levels and root-first section paths, plus a classified
//! content type and chunking characteristics per section.

pub mod content_type;

pub use content_type::{BlockClassification, classify_block, has_step_markers};

use crate::core::ChunkContentType;
use crate::detect::ChunkingProfile;
use crate::io::ReaderHints;
use regex::Regex;
use std::ops::Range;
use std::sync::OnceLock;

/// Maximum length of a plain-text heading line.
const MAX_HEADING_CHARS: usize = 100;

macro_rules! outline_regex {
    ($name:ident, $pattern:expr) => {{
        static $name: OnceLock<Regex> = OnceLock::new();
        $name.get_or_init(|| Regex::new($pattern).expect("valid regex"))
    }};
}

/// Booleans the chunker consults when segmenting a section.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SectionCharacteristics {
    /// The section reads as procedural content.
    pub is_procedural: bool,
    /// Numbered step sequences are present.
    pub has_step_by_step: bool,
    /// Definition phrasing is present.
    pub has_definitions: bool,
    /// Worked examples are present.
    pub has_examples: bool,
    /// Warning or caution callouts are present.
    pub has_warnings: bool,
    /// Step order must survive chunk boundaries.
    pub preserve_sequence: bool,
    /// Chunking profile recommended for this section.
    pub recommended_strategy: ChunkingProfile,
}

impl SectionCharacteristics {
    fn from_body(body: &str, classification: BlockClassification) -> Self {
        let has_step_by_step = has_step_markers(body);
        let is_procedural =
            classification.content_type == ChunkContentType::Instructions || has_step_by_step;
        let has_definitions = classification.content_type == ChunkContentType::Definitions
            || outline_regex!(DEF_HINT, r"(?i)\b(means|is defined as|refers to)\b").is_match(body);
        let has_examples = classification.content_type == ChunkContentType::Examples
            || outline_regex!(EX_HINT, r"(?i)\bfor example\b|\be\.g\.").is_match(body);
        let has_warnings =
            outline_regex!(WARN_HINT, r"(?i)\b(warning|caution|important|note)[:!]").is_match(body);

        let recommended_strategy = if is_procedural && has_step_by_step {
            ChunkingProfile::SequentialWithContext
        } else if classification.content_type == ChunkContentType::Faq {
            ChunkingProfile::QaPairPreservation
        } else {
            ChunkingProfile::AdaptiveSemantic
        };

        Self {
            is_procedural,
            has_step_by_step,
            has_definitions,
            has_examples,
            has_warnings,
            preserve_sequence: has_step_by_step,
            recommended_strategy,
        }
    }
}

/// One heading-delimited section of the document.
#[derive(Debug, Clone, PartialEq)]
pub struct Section {
    /// Heading text, `None` for preamble or heading-less documents.
    pub heading: Option<String>,
    /// Heading level; 0 for heading-less sections.
    pub level: usize,
    /// Root-first heading strings down to and including this section.
    pub section_path: Vec<String>,
    /// Section body text (heading line excluded).
    pub body: String,
    /// Byte range of the body within the analyzed text.
    pub byte_range: Range<usize>,
    /// 1-based page number of the section start, when hints carry pages.
    pub page_number: Option<u32>,
    /// Classified content type of the body.
    pub content_type: ChunkContentType,
    /// Classification confidence in [0,1].
    pub confidence: f64,
    /// Chunking characteristics.
    pub characteristics: SectionCharacteristics,
}

/// Outline statistics over the whole document.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OutlineStats {
    /// Number of headings detected.
    pub heading_count: usize,
    /// Number of bullet/numbered list blocks.
    pub list_count: usize,
    /// Number of fenced code blocks.
    pub code_block_count: usize,
    /// Number of pipe-table rows.
    pub table_row_count: usize,
}

/// Full structural analysis of one document.
#[derive(Debug, Clone, PartialEq)]
pub struct StructureAnalysis {
    /// Sections in reading order.
    pub sections: Vec<Section>,
    /// Outline statistics.
    pub stats: OutlineStats,
}

impl StructureAnalysis {
    /// Whether any section carries a real heading.
    #[must_use]
    pub fn has_headings(&self) -> bool {
        self.sections.iter().any(|s| s.heading.is_some())
    }
}

/// Splits text into sections and classifies each.
pub struct StructureAnalyzer;

impl StructureAnalyzer {
    /// Analyzes extracted text, using reader hints for page attribution when
    /// available. A document without headings yields exactly one
    /// heading-less section spanning the whole text.
    #[must_use]
    pub fn analyze(text: &str, hints: Option<&ReaderHints>) -> StructureAnalysis {
        let headings = detect_headings(text);
        let stats = outline_stats(text, headings.len());

        let mut sections = Vec::new();
        let mut path_stack: Vec<(usize, String)> = Vec::new();

        if headings.is_empty() {
            sections.push(build_section(text, None, 0, &[], 0..text.len(), hints));
            return StructureAnalysis { sections, stats };
        }

        // Preamble before the first heading.
        let first_start = headings[0].line_range.start;
        if !text[..first_start].trim().is_empty() {
            sections.push(build_section(text, None, 0, &[], 0..first_start, hints));
        }

        for (i, heading) in headings.iter().enumerate() {
            while path_stack.last().is_some_and(|(level, _)| *level >= heading.level) {
                path_stack.pop();
            }
            path_stack.push((heading.level, heading.text.clone()));
            let path: Vec<String> = path_stack.iter().map(|(_, h)| h.clone()).collect();

            let body_start = heading.line_range.end;
            let body_end = headings
                .get(i + 1)
                .map_or(text.len(), |next| next.line_range.start);

            sections.push(build_section(
                text,
                Some(heading.text.clone()),
                heading.level,
                &path,
                body_start..body_end,
                hints,
            ));
        }

        StructureAnalysis { sections, stats }
    }
}

fn build_section(
    text: &str,
    heading: Option<String>,
    level: usize,
    path: &[String],
    byte_range: Range<usize>,
    hints: Option<&ReaderHints>,
) -> Section {
    let body = text[byte_range.clone()].trim_matches('\n').to_string();
    let classification = classify_block(&body);
    let characteristics = SectionCharacteristics::from_body(&body, classification);
    let page_number = hints.and_then(|h| h.page_at(byte_range.start));

    Section {
        heading,
        level,
        section_path: path.to_vec(),
        body,
        byte_range,
        page_number,
        content_type: classification.content_type,
        confidence: classification.confidence,
        characteristics,
    }
}

/// A detected heading line.
#[derive(Debug, Clone, PartialEq, Eq)]
struct HeadingLine {
    text: String,
    level: usize,
    /// Byte range of the heading line including its newline.
    line_range: Range<usize>,
}

/// Detects ATX and plain-text headings.
///
/// A plain-text line is a heading when it is short, carries no sentence-final
/// punctuation, is written in title case, and sits between blank lines.
fn detect_headings(text: &str) -> Vec<HeadingLine> {
    let mut headings = Vec::new();
    let mut offset = 0;
    let lines: Vec<&str> = text.split_inclusive('\n').collect();

    for (i, raw_line) in lines.iter().enumerate() {
        let line = raw_line.trim_end_matches('\n').trim_end_matches('\r');
        let line_range = offset..offset + raw_line.len();
        offset += raw_line.len();

        let trimmed = line.trim_start();
        if let Some(heading) = parse_atx_heading(trimmed) {
            headings.push(HeadingLine {
                text: heading.0,
                level: heading.1,
                line_range,
            });
            continue;
        }

        let prev_blank = i == 0 || lines[i - 1].trim().is_empty();
        let next_blank = i + 1 >= lines.len() || lines[i + 1].trim().is_empty();
        if prev_blank && next_blank && is_title_case_heading(line) {
            let level = if line.chars().all(|c| !c.is_lowercase()) { 1 } else { 2 };
            headings.push(HeadingLine {
                text: line.trim().to_string(),
                level,
                line_range,
            });
        }
    }

    headings
}

fn parse_atx_heading(line: &str) -> Option<(String, usize)> {
    let hashes = line.chars().take_while(|c| *c == '#').count();
    if (1..=6).contains(&hashes) {
        let rest = &line[hashes..];
        if rest.starts_with(' ') || rest.starts_with('\t') {
            return Some((rest.trim().to_string(), hashes));
        }
    }
    None
}

fn is_title_case_heading(line: &str) -> bool {
    let line = line.trim();
    if line.is_empty() || line.chars().count() >= MAX_HEADING_CHARS {
        return false;
    }
    if line.ends_with(['.', '!', '?', ':', ';', ',']) {
        return false;
    }
    let words: Vec<&str> = line.split_whitespace().collect();
    if words.is_empty() || words.len() > 12 {
        return false;
    }
    // Connectives may stay lowercase inside the title.
    const CONNECTIVES: [&str; 10] =
        ["a", "an", "the", "of", "and", "or", "in", "for", "to", "with"];
    words.iter().enumerate().all(|(i, word)| {
        let Some(first) = word.chars().next() else {
            return false;
        };
        if first.is_uppercase() || first.is_numeric() {
            true
        } else {
            i > 0 && CONNECTIVES.contains(&word.to_lowercase().as_str())
        }
    })
}

fn outline_stats(text: &str, heading_count: usize) -> OutlineStats {
    let list_count = outline_regex!(LIST_BLOCK, r"(?m)^\s*([-*+]|\d+[.)])\s+\S")
        .find_iter(text)
        .count();
    let code_block_count = text.matches("```").count() / 2;
    let table_row_count = outline_regex!(TABLE_ROW, r"(?m)^\s*\|.*\|\s*$").find_iter(text).count();

    OutlineStats {
        heading_count,
        list_count,
        code_block_count,
        table_row_count,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const GUIDE: &str = "# Fund Management User Guide\n\nWelcome to the guide.\n\n## Creating a Fund\n\nTo start the fund creation wizard, click the 'Create Fund' button.\nStep 1. Enter the fund name.\nStep 2. Select the base currency.\n\n### Fund Hierarchy\n\nFunds nest under umbrella structures.\n\n## Glossary\n\nNAV means Net Asset Value.\n";

    #[test]
    fn test_atx_headings_detected() {
        let analysis = StructureAnalyzer::analyze(GUIDE, None);
        assert!(analysis.has_headings());
        let headings: Vec<_> =
            analysis.sections.iter().filter_map(|s| s.heading.as_deref()).collect();
        assert_eq!(
            headings,
            vec!["Fund Management User Guide", "Creating a Fund", "Fund Hierarchy", "Glossary"]
        );
    }

    #[test]
    fn test_section_levels_and_paths() {
        let analysis = StructureAnalyzer::analyze(GUIDE, None);
        let hierarchy = analysis
            .sections
            .iter()
            .find(|s| s.heading.as_deref() == Some("Fund Hierarchy"))
            .unwrap();
        assert_eq!(hierarchy.level, 3);
        assert_eq!(
            hierarchy.section_path,
            vec!["Fund Management User Guide", "Creating a Fund", "Fund Hierarchy"]
        );

        let glossary = analysis
            .sections
            .iter()
            .find(|s| s.heading.as_deref() == Some("Glossary"))
            .unwrap();
        assert_eq!(glossary.section_path, vec!["Fund Management User Guide", "Glossary"]);
    }

    #[test]
    fn test_procedural_section_characteristics() {
        let analysis = StructureAnalyzer::analyze(GUIDE, None);
        let creating = analysis
            .sections
            .iter()
            .find(|s| s.heading.as_deref() == Some("Creating a Fund"))
            .unwrap();
        assert!(creating.characteristics.is_procedural);
        assert!(creating.characteristics.has_step_by_step);
        assert!(creating.characteristics.preserve_sequence);
        assert_eq!(
            creating.characteristics.recommended_strategy,
            ChunkingProfile::SequentialWithContext
        );
    }

    #[test]
    fn test_no_headings_yields_single_section() {
        let text = "Just a paragraph.\n\nAnd another paragraph without any headings.";
        let analysis = StructureAnalyzer::analyze(text, None);
        assert_eq!(analysis.sections.len(), 1);
        assert!(analysis.sections[0].heading.is_none());
        assert_eq!(analysis.sections[0].level, 0);
        assert!(!analysis.has_headings());
    }

    #[test]
    fn test_title_case_heading_detected() {
        let text = "Intro prose here.\n\nCreating a Fund\n\nClick the wizard to begin.";
        let analysis = StructureAnalyzer::analyze(text, None);
        let headings: Vec<_> =
            analysis.sections.iter().filter_map(|s| s.heading.as_deref()).collect();
        assert_eq!(headings, vec!["Creating a Fund"]);
    }

    #[test]
    fn test_title_case_rejects_sentences() {
        assert!(!is_title_case_heading("This is a sentence."));
        assert!(!is_title_case_heading("lowercase start line"));
        assert!(is_title_case_heading("Creating a Fund"));
        assert!(is_title_case_heading("FUND OVERVIEW"));
        let long = "Word ".repeat(30);
        assert!(!is_title_case_heading(&long));
    }

    #[test]
    fn test_all_caps_heading_level() {
        let text = "Body.\n\nFUND OVERVIEW\n\nText.\n\nFund Details\n\nMore text.";
        let analysis = StructureAnalyzer::analyze(text, None);
        let overview = analysis
            .sections
            .iter()
            .find(|s| s.heading.as_deref() == Some("FUND OVERVIEW"))
            .unwrap();
        assert_eq!(overview.level, 1);
        let details = analysis
            .sections
            .iter()
            .find(|s| s.heading.as_deref() == Some("Fund Details"))
            .unwrap();
        assert_eq!(details.level, 2);
    }

    #[test]
    fn test_preamble_section() {
        let text = "Preamble prose before headings.\n\n# Title\n\nBody.";
        let analysis = StructureAnalyzer::analyze(text, None);
        assert!(analysis.sections[0].heading.is_none());
        assert!(analysis.sections[0].body.contains("Preamble"));
    }

    #[test]
    fn test_page_attribution_from_hints() {
        let hints = ReaderHints {
            page_breaks: vec![(0, 1), (40, 2)],
            ..ReaderHints::default()
        };
        let text = "# One\n\nFirst page body text here.\n\n# Two\n\nSecond page body.";
        let analysis = StructureAnalyzer::analyze(text, Some(&hints));
        let two = analysis
            .sections
            .iter()
            .find(|s| s.heading.as_deref() == Some("Two"))
            .unwrap();
        assert_eq!(two.page_number, Some(2));
    }

    #[test]
    fn test_outline_stats() {
        let text = "# H\n\n- item one\n- item two\n\n```\ncode\n```\n\n| a | b |\n| c | d |\n";
        let analysis = StructureAnalyzer::analyze(text, None);
        assert_eq!(analysis.stats.heading_count, 1);
        assert_eq!(analysis.stats.list_count, 2);
        assert_eq!(analysis.stats.code_block_count, 1);
        assert_eq!(analysis.stats.table_row_count, 2);
    }

    #[test]
    fn test_empty_text() {
        let analysis = StructureAnalyzer::analyze("", None);
        assert_eq!(analysis.sections.len(), 1);
        assert!(analysis.sections[0].body.is_empty());
    }
}
