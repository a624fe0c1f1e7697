//! Document format and type detection.
//!
//! Combines file extension, magic-byte signature and an optional declared
//! MIME type to pick a format, then scores the extracted text against
//! per-type pattern families to classify the document and select a
//! processing strategy for the chunker.

use crate::core::{DocumentType, SourceFormat};
use crate::error::{DetectionError, Result};
use crate::io::{Extracted, FileReader, ReaderRegistry};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::OnceLock;

/// Bytes sampled from the extracted text for type classification.
pub const DEFAULT_SAMPLE_SIZE: usize = 5_000;

/// Typed confidence below which the document type falls back to `Unknown`.
pub const MIN_CLASSIFICATION_CONFIDENCE: f64 = 0.4;

/// Score contributed by an extension match.
const EXTENSION_SCORE: f64 = 0.6;

/// Score contributed by a magic-byte signature match.
const SIGNATURE_SCORE: f64 = 0.4;

/// Score contributed by a declared MIME type match.
const MIME_SCORE: f64 = 0.4;

/// Pattern family weights: title, content, structure.
const TITLE_WEIGHT: f64 = 0.3;
const CONTENT_WEIGHT: f64 = 0.4;
const STRUCTURE_WEIGHT: f64 = 0.3;

/// Chunking strategy selected from the detected document type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessingStrategy {
    /// Procedure-preserving chunking for user guides.
    ProcedureOptimized,
    /// Early-content-prioritising chunking for quick starts.
    StepByStepOptimized,
    /// Structure-preserving chunking for technical references.
    ReferenceOptimized,
    /// Q/A-pair-preserving chunking for FAQs.
    QaOptimized,
    /// Problem/solution grouping for troubleshooting guides.
    ProblemSolutionOptimized,
    /// Conservative adaptive chunking for unknown material.
    GeneralPurpose,
}

impl ProcessingStrategy {
    /// Canonical snake-case name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ProcedureOptimized => "procedure_optimized",
            Self::StepByStepOptimized => "step_by_step_optimized",
            Self::ReferenceOptimized => "reference_optimized",
            Self::QaOptimized => "qa_optimized",
            Self::ProblemSolutionOptimized => "problem_solution_optimized",
            Self::GeneralPurpose => "general_purpose",
        }
    }
}

/// Named chunking profile passed down to the hierarchical chunker.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChunkingProfile {
    /// Semantic boundaries, never splitting inside a procedure.
    SemanticWithProcedures,
    /// Sequential chunks carrying forward context.
    SequentialWithContext,
    /// Hierarchy-first with reference preservation.
    HierarchicalWithReferences,
    /// Q/A pairs kept whole.
    QaPairPreservation,
    /// Problem/solution blocks grouped.
    ProblemSolutionGrouping,
    /// Adaptive semantic default.
    #[default]
    AdaptiveSemantic,
}

/// Options attached to the selected strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StrategyOptions {
    /// Never split between the steps of one procedure.
    pub preserve_step_sequences: bool,
    /// Extract procedures as first-class blocks.
    pub extract_procedures: bool,
    /// Weight early content higher during chunk sizing.
    pub prioritize_early_content: bool,
    /// Preserve the heading structure exactly.
    pub preserve_structure: bool,
    /// Keep question/answer pairs in one chunk.
    pub preserve_qa_pairs: bool,
    /// Use conservative bands for unknown content.
    pub conservative_chunking: bool,
    /// Chunking profile for the hierarchical chunker.
    pub chunking: ChunkingProfile,
}

impl StrategyOptions {
    /// The fixed strategy table keyed by document type.
    #[must_use]
    pub const fn for_type(doc_type: DocumentType) -> (ProcessingStrategy, Self) {
        match doc_type {
            DocumentType::UserGuide => (
                ProcessingStrategy::ProcedureOptimized,
                Self {
                    preserve_step_sequences: true,
                    extract_procedures: true,
                    prioritize_early_content: false,
                    preserve_structure: false,
                    preserve_qa_pairs: false,
                    conservative_chunking: false,
                    chunking: ChunkingProfile::SemanticWithProcedures,
                },
            ),
            DocumentType::QuickStart => (
                ProcessingStrategy::StepByStepOptimized,
                Self {
                    preserve_step_sequences: true,
                    extract_procedures: false,
                    prioritize_early_content: true,
                    preserve_structure: false,
                    preserve_qa_pairs: false,
                    conservative_chunking: false,
                    chunking: ChunkingProfile::SequentialWithContext,
                },
            ),
            DocumentType::TechnicalSpec => (
                ProcessingStrategy::ReferenceOptimized,
                Self {
                    preserve_step_sequences: false,
                    extract_procedures: false,
                    prioritize_early_content: false,
                    preserve_structure: true,
                    preserve_qa_pairs: false,
                    conservative_chunking: false,
                    chunking: ChunkingProfile::HierarchicalWithReferences,
                },
            ),
            DocumentType::Faq => (
                ProcessingStrategy::QaOptimized,
                Self {
                    preserve_step_sequences: false,
                    extract_procedures: false,
                    prioritize_early_content: false,
                    preserve_structure: false,
                    preserve_qa_pairs: true,
                    conservative_chunking: false,
                    chunking: ChunkingProfile::QaPairPreservation,
                },
            ),
            DocumentType::Troubleshooting => (
                ProcessingStrategy::ProblemSolutionOptimized,
                Self {
                    preserve_step_sequences: false,
                    extract_procedures: false,
                    prioritize_early_content: false,
                    preserve_structure: false,
                    preserve_qa_pairs: false,
                    conservative_chunking: false,
                    chunking: ChunkingProfile::ProblemSolutionGrouping,
                },
            ),
            DocumentType::Unknown => (
                ProcessingStrategy::GeneralPurpose,
                Self {
                    preserve_step_sequences: false,
                    extract_procedures: false,
                    prioritize_early_content: false,
                    preserve_structure: false,
                    preserve_qa_pairs: false,
                    conservative_chunking: true,
                    chunking: ChunkingProfile::AdaptiveSemantic,
                },
            ),
        }
    }
}

/// Coarse quality signals sampled during detection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct QualityIndicators {
    /// Extracted text length in bytes.
    pub text_length: usize,
    /// Whether heading-like lines were found in the sample.
    pub has_headings: bool,
    /// Whether numbered step markers were found in the sample.
    pub has_steps: bool,
    /// Fraction of alphanumeric characters in the sample.
    pub alphanumeric_ratio: f64,
}

/// Result of detecting one document.
#[derive(Debug, Clone)]
pub struct Detection {
    /// Detected on-disk format.
    pub format: SourceFormat,
    /// Confidence of the format decision, in [0,1].
    pub format_confidence: f64,
    /// Classified document type.
    pub doc_type: DocumentType,
    /// Confidence of the type decision, in [0,1].
    pub type_confidence: f64,
    /// Optional finer-grained subtype label.
    pub subtype: Option<String>,
    /// Strategy selected from the type.
    pub strategy: ProcessingStrategy,
    /// Options attached to the strategy.
    pub strategy_options: StrategyOptions,
    /// Coarse quality signals.
    pub quality_indicators: QualityIndicators,
    /// Extracted text and hints, reused by the downstream pipeline.
    pub extracted: Extracted,
}

/// Configuration for the detector.
#[derive(Debug, Clone, Copy)]
pub struct DetectorConfig {
    /// Bytes of extracted text sampled for classification.
    pub sample_size: usize,
    /// Confidence floor below which the type becomes `Unknown`.
    pub min_confidence: f64,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            sample_size: DEFAULT_SAMPLE_SIZE,
            min_confidence: MIN_CLASSIFICATION_CONFIDENCE,
        }
    }
}

/// Detects format and document type for source files.
pub struct DocumentDetector {
    config: DetectorConfig,
}

impl Default for DocumentDetector {
    fn default() -> Self {
        Self::new(DetectorConfig::default())
    }
}

impl DocumentDetector {
    /// Creates a detector with the given configuration.
    #[must_use]
    pub const fn new(config: DetectorConfig) -> Self {
        Self { config }
    }

    /// Detects format and type of the file at `path`.
    ///
    /// Never fails on unrecognised content: an unknown extension with no
    /// signature still yields `format = Unknown` at confidence 0.1. Only an
    /// unreadable file is an error.
    ///
    /// # Errors
    ///
    /// Returns `DetectionError::Unreadable` if the file cannot be opened.
    pub fn detect(
        &self,
        path: &Path,
        declared_mime: Option<&str>,
        readers: &ReaderRegistry,
    ) -> Result<Detection> {
        let reader = FileReader::open(path).map_err(|e| DetectionError::Unreadable {
            path: path.to_string_lossy().to_string(),
            reason: e.to_string(),
        })?;
        let magic = reader.read_prefix(10).map_err(|e| DetectionError::Unreadable {
            path: path.to_string_lossy().to_string(),
            reason: e.to_string(),
        })?;

        let (format, mut format_confidence) = detect_format(path, &magic, declared_mime);

        // Extract text through the registered reader; on failure fall back
        // to synthetic metadata text at degraded confidence.
        let extracted = match readers.reader_for(format).and_then(|r| r.read(path)) {
            Ok(extracted) => extracted,
            Err(err) => {
                tracing::warn!(path = %path.display(), %err, "text extraction failed, using synthetic fallback");
                format_confidence = format_confidence.min(0.3);
                Extracted {
                    text: synthetic_fallback_text(path, format, reader.size()),
                    hints: crate::io::ReaderHints::default(),
                }
            }
        };

        let sample = sample_text(&extracted.text, self.config.sample_size);
        let filename = path.file_name().map(|n| n.to_string_lossy().to_string());

        let (doc_type, type_confidence, subtype) =
            classify_type(sample, filename.as_deref(), self.config.min_confidence);

        let (strategy, strategy_options) = StrategyOptions::for_type(doc_type);
        let quality_indicators = quality_indicators(&extracted.text, sample);

        tracing::debug!(
            path = %path.display(),
            format = format.as_str(),
            doc_type = doc_type.as_str(),
            format_confidence,
            type_confidence,
            "document detected"
        );

        Ok(Detection {
            format,
            format_confidence,
            doc_type,
            type_confidence,
            subtype,
            strategy,
            strategy_options,
            quality_indicators,
            extracted,
        })
    }
}

/// Scores extension, signature and declared MIME; the first format clearing
/// the extension score wins, otherwise the extension alone decides, otherwise
/// the format is unknown at confidence 0.1.
fn detect_format(path: &Path, magic: &[u8], declared_mime: Option<&str>) -> (SourceFormat, f64) {
    let by_extension = path
        .extension()
        .and_then(|e| e.to_str())
        .and_then(format_from_extension);
    let by_signature = format_from_signature(magic);
    let by_mime = declared_mime.and_then(format_from_mime);

    let candidates = [
        SourceFormat::Pdf,
        SourceFormat::Docx,
        SourceFormat::Html,
        SourceFormat::Markdown,
        SourceFormat::Text,
    ];

    let mut best: Option<(SourceFormat, f64)> = None;
    for format in candidates {
        let mut score = 0.0;
        if by_extension == Some(format) {
            score += EXTENSION_SCORE;
        }
        if by_signature == Some(format) {
            score += SIGNATURE_SCORE;
        }
        if by_mime == Some(format) {
            score += MIME_SCORE;
        }
        if score > 0.0 && best.is_none_or(|(_, s)| score > s) {
            best = Some((format, score));
        }
    }

    match best {
        Some((format, score)) if score >= EXTENSION_SCORE => (format, score.min(1.0)),
        _ => match by_extension {
            Some(format) => (format, EXTENSION_SCORE),
            None => (SourceFormat::Unknown, 0.1),
        },
    }
}

fn format_from_extension(ext: &str) -> Option<SourceFormat> {
    match ext.to_lowercase().as_str() {
        "pdf" => Some(SourceFormat::Pdf),
        "docx" => Some(SourceFormat::Docx),
        "html" | "htm" => Some(SourceFormat::Html),
        "md" | "markdown" => Some(SourceFormat::Markdown),
        "txt" | "text" => Some(SourceFormat::Text),
        _ => None,
    }
}

fn format_from_signature(magic: &[u8]) -> Option<SourceFormat> {
    if magic.starts_with(b"%PDF") {
        Some(SourceFormat::Pdf)
    } else if magic.starts_with(b"PK\x03\x04") {
        // OOXML container; finer sniffing needs the zip directory
        Some(SourceFormat::Docx)
    } else if starts_with_ignore_case(magic, b"<!DOCTYPE") || starts_with_ignore_case(magic, b"<html")
    {
        Some(SourceFormat::Html)
    } else {
        None
    }
}

fn starts_with_ignore_case(bytes: &[u8], prefix: &[u8]) -> bool {
    bytes.len() >= prefix.len()
        && bytes
            .iter()
            .zip(prefix.iter())
            .all(|(a, b)| a.eq_ignore_ascii_case(b))
}

fn format_from_mime(mime: &str) -> Option<SourceFormat> {
    match mime {
        "application/pdf" => Some(SourceFormat::Pdf),
        "application/vnd.openxmlformats-officedocument.wordprocessingml.document" => {
            Some(SourceFormat::Docx)
        }
        "text/html" => Some(SourceFormat::Html),
        "text/markdown" => Some(SourceFormat::Markdown),
        "text/plain" => Some(SourceFormat::Text),
        _ => None,
    }
}

fn synthetic_fallback_text(path: &Path, format: SourceFormat, size: u64) -> String {
    format!(
        "Document {} of format {} ({size} bytes). Text extraction was not available.",
        path.file_name().map_or_else(
            || path.to_string_lossy().to_string(),
            |n| n.to_string_lossy().to_string()
        ),
        format.as_str(),
    )
}

fn sample_text(text: &str, sample_size: usize) -> &str {
    let end = crate::io::find_char_boundary(text, sample_size.min(text.len()));
    &text[..end]
}

/// One document type's three pattern families.
struct TypePatterns {
    doc_type: DocumentType,
    title: &'static Regex,
    content: &'static Regex,
    structure: &'static Regex,
}

macro_rules! family_regex {
    ($name:ident, $pattern:expr) => {{
        static $name: OnceLock<Regex> = OnceLock::new();
        $name.get_or_init(|| Regex::new($pattern).expect("valid regex"))
    }};
}

fn type_patterns() -> [TypePatterns; 5] {
    [
        TypePatterns {
            doc_type: DocumentType::UserGuide,
            title: family_regex!(UG_TITLE, r"(?i)user\s+guide|manual|handbook"),
            content: family_regex!(
                UG_CONTENT,
                r"(?im)step\s+\d+|^\s*\d+[.)]\s+|how\s+to|instructions"
            ),
            structure: family_regex!(
                UG_STRUCTURE,
                r"(?i)table\s+of\s+contents|introduction|getting\s+started"
            ),
        },
        TypePatterns {
            doc_type: DocumentType::QuickStart,
            title: family_regex!(QS_TITLE, r"(?i)quick\s*start|getting\s+started|setup"),
            content: family_regex!(QS_CONTENT, r"(?i)step\s+\d+|\b(first|next|then|finally)\b"),
            structure: family_regex!(QS_STRUCTURE, r"(?i)prerequisites"),
        },
        TypePatterns {
            doc_type: DocumentType::TechnicalSpec,
            title: family_regex!(TS_TITLE, r"(?i)specification|\bapi\b|reference"),
            content: family_regex!(TS_CONTENT, r"(?i)\b(parameter|function|method|class)\b"),
            structure: family_regex!(TS_STRUCTURE, r"(?i)syntax|examples|parameters"),
        },
        TypePatterns {
            doc_type: DocumentType::Faq,
            title: family_regex!(FAQ_TITLE, r"(?i)\bfaq\b|frequently\s+asked"),
            content: family_regex!(FAQ_CONTENT, r"(?im)\?|^\s*[qa]:"),
            structure: family_regex!(FAQ_STRUCTURE, r"(?i)q\d+|question\s+\d+"),
        },
        TypePatterns {
            doc_type: DocumentType::Troubleshooting,
            title: family_regex!(TR_TITLE, r"(?i)troubleshoot|error|issue"),
            content: family_regex!(TR_CONTENT, r"(?i)\b(solution|fix|resolve)\b"),
            structure: family_regex!(TR_STRUCTURE, r"(?i)\b(symptom|cause|resolution)\b"),
        },
    ]
}

/// Classifies the document type from a text sample and optional filename.
///
/// Title patterns are checked against the filename and the first lines;
/// content and structure patterns against the sample. A type's confidence is
/// the sum of matched family weights, clamped to [0,1].
fn classify_type(
    sample: &str,
    filename: Option<&str>,
    min_confidence: f64,
) -> (DocumentType, f64, Option<String>) {
    let first_lines: String = sample.lines().take(5).collect::<Vec<_>>().join("\n");

    let mut best = (DocumentType::Unknown, 0.0_f64);
    for patterns in type_patterns() {
        let mut score = 0.0;
        let title_haystack = filename.map_or_else(|| first_lines.clone(), |f| {
            format!("{f}\n{first_lines}")
        });
        if patterns.title.is_match(&title_haystack) {
            score += TITLE_WEIGHT;
        }
        if patterns.content.is_match(sample) {
            score += CONTENT_WEIGHT;
        }
        if patterns.structure.is_match(sample) {
            score += STRUCTURE_WEIGHT;
        }
        let score = score.clamp(0.0, 1.0);
        if score > best.1 {
            best = (patterns.doc_type, score);
        }
    }

    if best.1 < min_confidence {
        (DocumentType::Unknown, best.1, None)
    } else {
        let subtype = (best.0 == DocumentType::UserGuide
            && family_regex!(SUBTYPE_ADMIN, r"(?i)administrator|admin\s+guide").is_match(sample))
        .then(|| "administratorGuide".to_string());
        (best.0, best.1, subtype)
    }
}

fn quality_indicators(text: &str, sample: &str) -> QualityIndicators {
    let has_headings = family_regex!(QI_HEADING, r"(?m)^\s*#{1,6}\s+\S|^[A-Z][A-Za-z ]{2,60}$")
        .is_match(sample);
    let has_steps = family_regex!(QI_STEPS, r"(?mi)^\s*(step\s+)?\d+[.)]\s+\S").is_match(sample);
    let alnum = sample.chars().filter(|c| c.is_alphanumeric()).count();
    let total = sample.chars().count().max(1);
    #[allow(clippy::cast_precision_loss)]
    let alphanumeric_ratio = alnum as f64 / total as f64;
    QualityIndicators {
        text_length: text.len(),
        has_headings,
        has_steps,
        alphanumeric_ratio,
    }
}
