//! Hierarchical chunker.
//!
//! Emits a forest of chunks at document, section, paragraph and sentence
//! scales with parent/child/sibling edges populated. Paragraphs split on
//! blank lines, merge when undersized, and split at sentence boundaries when
//! oversized; step sequences are never split inside a numbered item.

use crate::analyze::{Section, StructureAnalysis, classify_block, has_step_markers};
use crate::chunking::refine::plan_merges;
use crate::chunking::sentence::split_sentences;
use crate::config::ChunkingConfig;
use crate::core::{ChunkContentType, ChunkGraph, ChunkNode, Scale, estimate_tokens};
use crate::detect::StrategyOptions;
use crate::error::{Error, Result};
use crate::io::find_char_boundary;
use regex::Regex;
use std::sync::OnceLock;

/// Hierarchical chunker parameterised by bands and a strategy profile.
#[derive(Debug, Clone)]
pub struct HierarchicalChunker {
    config: ChunkingConfig,
    options: StrategyOptions,
}

impl HierarchicalChunker {
    /// Creates a chunker for one document's strategy.
    #[must_use]
    pub const fn new(config: ChunkingConfig, options: StrategyOptions) -> Self {
        Self { config, options }
    }

    /// Builds the chunk graph for one document.
    ///
    /// # Errors
    ///
    /// Returns a validation error if the produced graph violates structural
    /// invariants, which indicates a chunker bug rather than bad input.
    pub fn chunk(
        &self,
        source_id: &str,
        version: &str,
        text: &str,
        analysis: &StructureAnalysis,
    ) -> Result<ChunkGraph> {
        let mut graph = ChunkGraph::new();

        // Document-scale root, truncated to the band ceiling if needed.
        let doc_content = truncate_to_tokens(text, self.config.document_band.max);
        let mut doc = ChunkNode::new(
            source_id,
            version,
            Scale::Document,
            doc_content.to_string(),
            Vec::new(),
            0,
        );
        doc.heading = analysis
            .sections
            .iter()
            .find_map(|s| (s.level <= 1).then(|| s.heading.clone()).flatten());
        let doc_id = doc.chunk_id.clone();
        graph.insert(doc);

        // Section scale: nearest shallower section is the parent.
        let mut section_stack: Vec<(usize, String)> = Vec::new();
        let mut sibling_counter = 0usize;

        for section in &analysis.sections {
            if section.body.trim().is_empty() {
                while section_stack.last().is_some_and(|(lvl, _)| *lvl >= section.level.max(1)) {
                    section_stack.pop();
                }
                continue;
            }

            // Section content is capped at the hard ceiling; the paragraph
            // children still cover the full body.
            let section_content =
                truncate_to_tokens(&section.body, self.config.hard_max_tokens).to_string();
            let mut node = ChunkNode::new(
                source_id,
                version,
                Scale::Section,
                section_content,
                section.section_path.clone(),
                sibling_counter,
            );
            sibling_counter += 1;
            node.heading = section.heading.clone();
            node.page_number = section.page_number;
            node.content_type = section.content_type;
            node.content_type_confidence = section.confidence;
            node.instructional_value =
                instructional_value(section.content_type, section.characteristics.has_step_by_step);

            let level = section.level.max(1);
            while section_stack.last().is_some_and(|(lvl, _)| *lvl >= level) {
                section_stack.pop();
            }
            let parent_id = section_stack
                .last()
                .map_or(doc_id.clone(), |(_, id)| id.clone());

            let section_id = node.chunk_id.clone();
            graph.insert(node);
            graph.link(&parent_id, &section_id);
            section_stack.push((level, section_id.clone()));

            self.chunk_section_body(source_id, version, section, &section_id, &mut graph)?;
        }

        graph.rebuild_siblings();

        let violations = graph.check_invariants();
        if violations.is_empty() {
            Ok(graph)
        } else {
            Err(Error::validation(format!(
                "chunk graph invariant violations: {}",
                violations.join("; ")
            )))
        }
    }

    /// Splits a section body into paragraph and sentence chunks under
    /// `section_id`.
    fn chunk_section_body(
        &self,
        source_id: &str,
        version: &str,
        section: &Section,
        section_id: &str,
        graph: &mut ChunkGraph,
    ) -> Result<()> {
        let preserve_sequence = (section.characteristics.preserve_sequence
            || self.options.preserve_step_sequences)
            && has_step_markers(&section.body);
        let paragraphs = if preserve_sequence {
            split_step_sequence(&section.body)
        } else {
            self.split_paragraphs(&section.body)
        };

        // Optional semantic refinement: merge adjacent paragraphs whose
        // boundary similarity clears the threshold while staying in band.
        // Step sequences keep their item boundaries untouched.
        let paragraphs = if self.config.semantic_refinement
            && !preserve_sequence
            && paragraphs.len() > 1
        {
            let refs: Vec<&str> = paragraphs.iter().map(String::as_str).collect();
            let max_tokens = self.config.paragraph_band.max;
            let groups = plan_merges(
                &refs,
                self.config.sentence_similarity_threshold,
                |group| {
                    let total: usize = group.iter().map(|&i| estimate_tokens(refs[i])).sum();
                    total <= max_tokens
                },
            );
            groups
                .into_iter()
                .map(|group| {
                    group
                        .into_iter()
                        .map(|i| paragraphs[i].as_str())
                        .collect::<Vec<_>>()
                        .join("\n\n")
                })
                .collect()
        } else {
            paragraphs
        };

        for (index, paragraph) in paragraphs.iter().enumerate() {
            if paragraph.trim().is_empty() {
                continue;
            }
            let mut node = ChunkNode::new(
                source_id,
                version,
                Scale::Paragraph,
                paragraph.clone(),
                section.section_path.clone(),
                index,
            );
            node.heading = section.heading.clone();
            node.page_number = section.page_number;

            let classification = classify_block(paragraph);
            if classification.confidence > 0.0 {
                node.content_type = classification.content_type;
                node.content_type_confidence = classification.confidence;
            } else {
                node.content_type = section.content_type;
                node.content_type_confidence = section.confidence;
            }
            node.instructional_value =
                instructional_value(node.content_type, has_step_markers(paragraph));

            let paragraph_id = node.chunk_id.clone();
            let content_type = node.content_type;
            let confidence = node.content_type_confidence;
            let value = node.instructional_value;
            graph.insert(node);
            graph.link(section_id, &paragraph_id);

            // Sentence scale: group sentences up to the band floor so tiny
            // fragments don't become chunks of their own.
            for (s_index, sentence_group) in self
                .sentence_groups(paragraph)
                .into_iter()
                .enumerate()
            {
                if sentence_group.trim().is_empty() || sentence_group.trim() == paragraph.trim() {
                    continue;
                }
                let mut sentence_node = ChunkNode::new(
                    source_id,
                    version,
                    Scale::Sentence,
                    sentence_group,
                    section.section_path.clone(),
                    s_index,
                );
                sentence_node.heading = section.heading.clone();
                sentence_node.page_number = section.page_number;
                sentence_node.content_type = content_type;
                sentence_node.content_type_confidence = confidence;
                sentence_node.instructional_value = value;
                let sentence_id = sentence_node.chunk_id.clone();
                graph.insert(sentence_node);
                graph.link(&paragraph_id, &sentence_id);
            }
        }

        Ok(())
    }

    /// Splits a body into paragraphs on blank lines, merging short
    /// paragraphs into their predecessor and splitting oversized ones at
    /// sentence boundaries.
    fn split_paragraphs(&self, body: &str) -> Vec<String> {
        let band = self.config.paragraph_band;
        let raw: Vec<&str> = body
            .split("\n\n")
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .collect();

        let mut merged: Vec<String> = Vec::new();
        for paragraph in raw {
            let tokens = estimate_tokens(paragraph);
            match merged.last_mut() {
                Some(last) if tokens < band.min && estimate_tokens(last) + tokens <= band.max => {
                    last.push_str("\n\n");
                    last.push_str(paragraph);
                }
                _ => merged.push(paragraph.to_string()),
            }
        }

        let mut result = Vec::new();
        for paragraph in merged {
            if estimate_tokens(&paragraph) > band.max {
                result.extend(split_oversized(&paragraph, band.max));
            } else {
                result.push(paragraph);
            }
        }
        result
    }

    /// Groups a paragraph's sentences into sentence-scale chunks that clear
    /// the band floor without exceeding its ceiling.
    fn sentence_groups(&self, paragraph: &str) -> Vec<String> {
        let band = self.config.sentence_band;
        let ranges = split_sentences(paragraph);
        if ranges.len() <= 1 {
            return ranges
                .into_iter()
                .map(|r| paragraph[r].to_string())
                .collect();
        }

        let mut groups: Vec<String> = Vec::new();
        let mut current = String::new();
        for range in ranges {
            let sentence = &paragraph[range];
            if !current.is_empty()
                && estimate_tokens(&current) + estimate_tokens(sentence) > band.max
            {
                groups.push(std::mem::take(&mut current));
            }
            if !current.is_empty() {
                current.push(' ');
            }
            current.push_str(sentence);
            if estimate_tokens(&current) >= band.min {
                groups.push(std::mem::take(&mut current));
            }
        }
        if !current.is_empty() {
            // Fold a trailing fragment into the previous group.
            match groups.last_mut() {
                Some(last) if estimate_tokens(last) + estimate_tokens(&current) <= band.max => {
                    last.push(' ');
                    last.push_str(&current);
                }
                _ => groups.push(current),
            }
        }
        groups
    }
}

/// Instructional value by content type, nudged up for explicit steps.
#[must_use]
pub fn instructional_value(content_type: ChunkContentType, has_steps: bool) -> f64 {
    let base: f64 = match content_type {
        ChunkContentType::Instructions => 0.9,
        ChunkContentType::Examples => 0.7,
        ChunkContentType::Faq => 0.65,
        ChunkContentType::Definitions => 0.55,
        ChunkContentType::Text => 0.4,
        ChunkContentType::TableOfContents => 0.1,
    };
    if has_steps { (base + 0.05).min(1.0) } else { base }
}

/// Splits a step sequence only between fully-formed steps.
fn split_step_sequence(body: &str) -> Vec<String> {
    static STEP_START: OnceLock<Regex> = OnceLock::new();
    let step_start = STEP_START
        .get_or_init(|| Regex::new(r"(?im)^\s*(step\s+)?\d+[.)]\s+").expect("valid regex"));

    let starts: Vec<usize> = step_start.find_iter(body).map(|m| m.start()).collect();
    if starts.is_empty() {
        return vec![body.trim().to_string()];
    }

    let mut pieces = Vec::new();
    if starts[0] > 0 && !body[..starts[0]].trim().is_empty() {
        pieces.push(body[..starts[0]].trim().to_string());
    }
    for (i, &start) in starts.iter().enumerate() {
        let end = starts.get(i + 1).copied().unwrap_or(body.len());
        let piece = body[start..end].trim();
        if !piece.is_empty() {
            pieces.push(piece.to_string());
        }
    }
    pieces
}

/// Truncates text to roughly `max_tokens` at a whitespace boundary.
fn truncate_to_tokens(text: &str, max_tokens: usize) -> &str {
    let max_bytes = max_tokens.saturating_mul(4);
    if text.len() <= max_bytes {
        return text;
    }
    let cut = find_char_boundary(text, max_bytes);
    match text[..cut].rfind(char::is_whitespace) {
        Some(ws) if ws > 0 => &text[..ws],
        _ => &text[..cut],
    }
}

/// Splits an oversized paragraph at sentence boundaries; paragraphs without
/// sentence boundaries split at the whitespace nearest the band midpoint.
fn split_oversized(paragraph: &str, max_tokens: usize) -> Vec<String> {
    let ranges = split_sentences(paragraph);
    if ranges.len() > 1 {
        let mut pieces = Vec::new();
        let mut current = String::new();
        for range in ranges {
            let sentence = &paragraph[range];
            if !current.is_empty()
                && estimate_tokens(&current) + estimate_tokens(sentence) > max_tokens
            {
                pieces.push(std::mem::take(&mut current));
            }
            if !current.is_empty() {
                current.push(' ');
            }
            current.push_str(sentence);
        }
        if !current.is_empty() {
            pieces.push(current);
        }
        return pieces;
    }

    // No sentence boundaries: cut at the whitespace nearest the midpoint of
    // the allowed size, repeatedly.
    let mut pieces = Vec::new();
    let mut rest = paragraph;
    let max_bytes = max_tokens.saturating_mul(4);
    while estimate_tokens(rest) > max_tokens {
        let midpoint = find_char_boundary(rest, max_bytes / 2);
        let cut = nearest_whitespace(rest, midpoint).unwrap_or(midpoint.max(1));
        let (head, tail) = rest.split_at(cut);
        pieces.push(head.trim().to_string());
        rest = tail.trim_start();
        if head.trim().is_empty() {
            break;
        }
    }
    if !rest.trim().is_empty() {
        pieces.push(rest.trim().to_string());
    }
    pieces
}

/// Whitespace byte offset nearest to `target`.
fn nearest_whitespace(text: &str, target: usize) -> Option<usize> {
    let before = text[..target.min(text.len())].rfind(char::is_whitespace);
    let after = text[target.min(text.len())..]
        .find(char::is_whitespace)
        .map(|p| target + p);
    match (before, after) {
        (Some(b), Some(a)) => Some(if target - b <= a - target { b } else { a }),
        (Some(b), None) => Some(b),
        (None, Some(a)) => Some(a),
        (None, None) => None,
    }
    .filter(|&p| p > 0)
}
