//! Chunk representation and the chunk graph.
//!
//! Chunks are fragments of a source at one of four scales, linked by
//! parent/child/sibling edges. Edges are ID references, never pointers; the
//! full set of chunks for a source forms an arena-backed forest
//! ([`ChunkGraph`]) whose invariants are checked after chunking.

use crate::core::source::current_timestamp;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, HashMap, HashSet};

/// Granularity of a chunk, ordered from coarsest to finest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scale {
    /// Whole-document summary scale.
    Document,
    /// Heading-delimited section scale.
    Section,
    /// Blank-line-delimited paragraph scale.
    Paragraph,
    /// Single-sentence scale.
    Sentence,
}

impl Scale {
    /// All scales, coarsest first.
    pub const ALL: [Self; 4] = [Self::Document, Self::Section, Self::Paragraph, Self::Sentence];

    /// Canonical lowercase name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Document => "document",
            Self::Section => "section",
            Self::Paragraph => "paragraph",
            Self::Sentence => "sentence",
        }
    }

    /// Parses a canonical name.
    #[must_use]
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "document" => Some(Self::Document),
            "section" => Some(Self::Section),
            "paragraph" => Some(Self::Paragraph),
            "sentence" => Some(Self::Sentence),
            _ => None,
        }
    }

    /// Whether `self` is strictly coarser than `other`.
    #[must_use]
    pub fn is_coarser_than(self, other: Self) -> bool {
        self < other
    }
}

/// Classified content type of a chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ChunkContentType {
    /// Procedural, step-by-step content.
    Instructions,
    /// Navigation listings with page references.
    TableOfContents,
    /// Term definitions and glossaries.
    Definitions,
    /// Worked examples and samples.
    Examples,
    /// Question/answer pairs.
    Faq,
    /// Unclassified prose.
    Text,
}

impl ChunkContentType {
    /// All content types in classification priority order: ties are broken
    /// toward the earlier entry.
    pub const PRIORITY: [Self; 6] = [
        Self::Instructions,
        Self::Definitions,
        Self::Faq,
        Self::Examples,
        Self::TableOfContents,
        Self::Text,
    ];

    /// Canonical camel-case name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Instructions => "instructions",
            Self::TableOfContents => "tableOfContents",
            Self::Definitions => "definitions",
            Self::Examples => "examples",
            Self::Faq => "faq",
            Self::Text => "text",
        }
    }

    /// Parses a canonical name; unknown names map to `Text`.
    #[must_use]
    pub fn parse(name: &str) -> Self {
        match name {
            "instructions" => Self::Instructions,
            "tableOfContents" => Self::TableOfContents,
            "definitions" => Self::Definitions,
            "examples" => Self::Examples,
            "faq" => Self::Faq,
            _ => Self::Text,
        }
    }
}

/// Kind of embedding attached to a chunk. All kinds on one chunk share the
/// provider's dimensionality `D`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingKind {
    /// Vector of the raw chunk content.
    Content,
    /// Vector of content prefixed with heading and previous-sibling tail.
    Contextual,
    /// Vector of the section path joined with the heading.
    Hierarchical,
    /// Vector of top keywords plus domain terms.
    Semantic,
}

impl EmbeddingKind {
    /// All kinds, in storage order.
    pub const ALL: [Self; 4] =
        [Self::Content, Self::Contextual, Self::Hierarchical, Self::Semantic];

    /// Canonical lowercase name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Content => "content",
            Self::Contextual => "contextual",
            Self::Hierarchical => "hierarchical",
            Self::Semantic => "semantic",
        }
    }

    /// Parses a canonical name.
    #[must_use]
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "content" => Some(Self::Content),
            "contextual" => Some(Self::Contextual),
            "hierarchical" => Some(Self::Hierarchical),
            "semantic" => Some(Self::Semantic),
            _ => None,
        }
    }
}

/// A fragment of a source at a given scale, with graph edges and metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChunkNode {
    /// Unique, content-addressed identifier.
    pub chunk_id: String,
    /// Owning source.
    pub source_id: String,
    /// Source version this chunk belongs to.
    pub version: String,
    /// Granularity.
    pub scale: Scale,
    /// UTF-8 content.
    pub content: String,
    /// Heading of the owning section, if any.
    pub heading: Option<String>,
    /// Ordered heading strings from the root down to this chunk's section.
    pub section_path: Vec<String>,
    /// 1-based page number, if the reader supplied page hints.
    pub page_number: Option<u32>,
    /// Estimated token count.
    pub token_count: usize,
    /// Word count.
    pub word_count: usize,
    /// Character count.
    pub character_count: usize,
    /// Classified content type.
    pub content_type: ChunkContentType,
    /// Confidence of the content-type classification, in [0,1].
    pub content_type_confidence: f64,
    /// Quality score in [0,1]; chunks below the configured floor are dropped.
    pub quality_score: f64,
    /// Instructional value in [0,1].
    pub instructional_value: f64,
    /// ISO language code.
    pub language: String,
    /// Parent chunk ID; `None` only for document-scale roots.
    pub parent_chunk_id: Option<String>,
    /// Child chunk IDs in reading order.
    pub child_chunk_ids: Vec<String>,
    /// Sibling chunk IDs in reading order (same parent, excluding self).
    pub sibling_chunk_ids: Vec<String>,
    /// Ancestor chunk IDs, root first.
    pub hierarchy_path: Vec<String>,
    /// Embedding vectors by kind; every vector has the store's length `D`.
    pub embeddings: BTreeMap<EmbeddingKind, Vec<f32>>,
    /// Unix timestamp when the chunk was created.
    pub created_at: i64,
}

impl ChunkNode {
    /// Creates a chunk with counts computed from the content and a
    /// content-addressed chunk ID.
    #[must_use]
    pub fn new(
        source_id: &str,
        version: &str,
        scale: Scale,
        content: String,
        section_path: Vec<String>,
        sibling_index: usize,
    ) -> Self {
        let chunk_id =
            chunk_id_for(source_id, version, scale, &section_path, sibling_index, &content);
        let token_count = estimate_tokens(&content);
        let word_count = content.split_whitespace().count();
        let character_count = content.chars().count();

        Self {
            chunk_id,
            source_id: source_id.to_string(),
            version: version.to_string(),
            scale,
            content,
            heading: None,
            section_path,
            page_number: None,
            token_count,
            word_count,
            character_count,
            content_type: ChunkContentType::Text,
            content_type_confidence: 0.0,
            quality_score: 0.0,
            instructional_value: 0.0,
            language: "en".to_string(),
            parent_chunk_id: None,
            child_chunk_ids: Vec::new(),
            sibling_chunk_ids: Vec::new(),
            hierarchy_path: Vec::new(),
            embeddings: BTreeMap::new(),
            created_at: current_timestamp(),
        }
    }

    /// Whether the chunk has no parent.
    #[must_use]
    pub const fn is_root(&self) -> bool {
        self.parent_chunk_id.is_none()
    }

    /// The section path rendered as a breadcrumb string.
    #[must_use]
    pub fn breadcrumb(&self) -> String {
        self.section_path.join(" > ")
    }

    /// Returns a preview of the chunk content (first `max_len` characters).
    #[must_use]
    pub fn preview(&self, max_len: usize) -> &str {
        match self.content.char_indices().nth(max_len) {
            Some((idx, _)) => &self.content[..idx],
            None => &self.content,
        }
    }
}

/// Estimates token count using the ~4 characters per token approximation.
#[must_use]
pub fn estimate_tokens(text: &str) -> usize {
    text.len().div_ceil(4)
}

/// Derives the content-addressed chunk ID.
///
/// Identical `(source, version, scale, section path, index, content)` inputs
/// always produce the same ID, which gives re-ingestion determinism and a
/// stable sibling tie-break.
#[must_use]
pub fn chunk_id_for(
    source_id: &str,
    version: &str,
    scale: Scale,
    section_path: &[String],
    sibling_index: usize,
    content: &str,
) -> String {
    let mut hasher = Sha256::new();
    hasher.update(source_id.as_bytes());
    hasher.update([0]);
    hasher.update(version.as_bytes());
    hasher.update([0]);
    hasher.update(scale.as_str().as_bytes());
    hasher.update([0]);
    for part in section_path {
        hasher.update(part.as_bytes());
        hasher.update([0x1f]);
    }
    hasher.update([0]);
    hasher.update(sibling_index.to_le_bytes());
    hasher.update([0]);
    hasher.update(content.as_bytes());
    let digest = hasher.finalize();
    let mut id = String::with_capacity(19);
    id.push_str("ck_");
    for byte in &digest[..8] {
        use std::fmt::Write;
        let _ = write!(id, "{byte:02x}");
    }
    id
}

/// Arena of chunks for one `(source, version)` pair, keyed by chunk ID.
///
/// Maintains edge consistency as nodes are linked and exposes the invariant
/// check run after chunking.
#[derive(Debug, Clone, Default)]
pub struct ChunkGraph {
    nodes: HashMap<String, ChunkNode>,
    /// Insertion order, which is reading order within each scale.
    order: Vec<String>,
}

impl ChunkGraph {
    /// Creates an empty graph.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of chunks in the graph.
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the graph contains no chunks.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Inserts a node. Returns `false` if the ID is already present.
    pub fn insert(&mut self, node: ChunkNode) -> bool {
        if self.nodes.contains_key(&node.chunk_id) {
            return false;
        }
        self.order.push(node.chunk_id.clone());
        self.nodes.insert(node.chunk_id.clone(), node);
        true
    }

    /// Looks up a node by ID.
    #[must_use]
    pub fn get(&self, chunk_id: &str) -> Option<&ChunkNode> {
        self.nodes.get(chunk_id)
    }

    /// Mutable lookup by ID.
    pub fn get_mut(&mut self, chunk_id: &str) -> Option<&mut ChunkNode> {
        self.nodes.get_mut(chunk_id)
    }

    /// Iterates nodes in insertion (reading) order.
    pub fn iter(&self) -> impl Iterator<Item = &ChunkNode> {
        self.order.iter().filter_map(|id| self.nodes.get(id))
    }

    /// Drains the graph into a vector in reading order.
    #[must_use]
    pub fn into_nodes(mut self) -> Vec<ChunkNode> {
        let mut nodes = Vec::with_capacity(self.order.len());
        for id in &self.order {
            if let Some(node) = self.nodes.remove(id) {
                nodes.push(node);
            }
        }
        nodes
    }

    /// Links `child_id` under `parent_id`, appending to the parent's child
    /// list and setting the child's parent pointer and hierarchy path.
    ///
    /// Returns `false` if either node is missing.
    pub fn link(&mut self, parent_id: &str, child_id: &str) -> bool {
        let Some(parent) = self.nodes.get(parent_id) else {
            return false;
        };
        let mut path = parent.hierarchy_path.clone();
        path.push(parent_id.to_string());

        if !self.nodes.contains_key(child_id) {
            return false;
        }
        if let Some(parent) = self.nodes.get_mut(parent_id) {
            parent.child_chunk_ids.push(child_id.to_string());
        }
        if let Some(child) = self.nodes.get_mut(child_id) {
            child.parent_chunk_id = Some(parent_id.to_string());
            child.hierarchy_path = path;
        }
        true
    }

    /// Removes a node and promotes its children to its parent, keeping the
    /// hierarchy consistent. Used when the validator rejects a chunk.
    pub fn remove_and_promote(&mut self, chunk_id: &str) -> Option<ChunkNode> {
        let node = self.nodes.remove(chunk_id)?;
        self.order.retain(|id| id != chunk_id);

        let parent_id = node.parent_chunk_id.clone();
        let child_ids = node.child_chunk_ids.clone();

        if let Some(ref pid) = parent_id {
            // Replace the removed child with its children, preserving order.
            if let Some(parent) = self.nodes.get_mut(pid) {
                let pos = parent.child_chunk_ids.iter().position(|c| c == chunk_id);
                if let Some(pos) = pos {
                    parent.child_chunk_ids.remove(pos);
                    for (offset, child_id) in child_ids.iter().enumerate() {
                        parent.child_chunk_ids.insert(pos + offset, child_id.clone());
                    }
                }
            }
        }

        // Re-root the orphaned children and fix their subtree paths.
        for child_id in &child_ids {
            if let Some(child) = self.nodes.get_mut(child_id) {
                child.parent_chunk_id = parent_id.clone();
            }
            self.rebuild_paths_from(child_id);
        }

        Some(node)
    }

    /// Recomputes sibling lists for every node from the parents' child lists.
    pub fn rebuild_siblings(&mut self) {
        let parent_children: Vec<(String, Vec<String>)> = self
            .nodes
            .values()
            .map(|n| (n.chunk_id.clone(), n.child_chunk_ids.clone()))
            .collect();

        for (_, children) in &parent_children {
            for child_id in children {
                let siblings: Vec<String> =
                    children.iter().filter(|c| *c != child_id).cloned().collect();
                if let Some(child) = self.nodes.get_mut(child_id) {
                    child.sibling_chunk_ids = siblings;
                }
            }
        }
        // Roots have no siblings.
        let roots: Vec<String> = self
            .nodes
            .values()
            .filter(|n| n.parent_chunk_id.is_none())
            .map(|n| n.chunk_id.clone())
            .collect();
        for root_id in roots {
            if let Some(root) = self.nodes.get_mut(&root_id) {
                root.sibling_chunk_ids.clear();
            }
        }
    }

    fn rebuild_paths_from(&mut self, start_id: &str) {
        let mut stack = vec![start_id.to_string()];
        while let Some(id) = stack.pop() {
            let path = match self.nodes.get(&id).and_then(|n| n.parent_chunk_id.clone()) {
                Some(pid) => {
                    let mut path = self
                        .nodes
                        .get(&pid)
                        .map(|p| p.hierarchy_path.clone())
                        .unwrap_or_default();
                    path.push(pid);
                    path
                }
                None => Vec::new(),
            };
            if let Some(node) = self.nodes.get_mut(&id) {
                node.hierarchy_path = path;
                stack.extend(node.child_chunk_ids.iter().cloned());
            }
        }
    }

    /// Checks structural invariants: acyclicity, parent/child mutual
    /// consistency, scale ordering, and hierarchy-path correctness.
    ///
    /// Returns the list of violations; empty means the graph is valid.
    #[must_use]
    pub fn check_invariants(&self) -> Vec<String> {
        let mut violations = Vec::new();

        for node in self.nodes.values() {
            if let Some(ref pid) = node.parent_chunk_id {
                match self.nodes.get(pid) {
                    None => violations.push(format!("{}: dangling parent {pid}", node.chunk_id)),
                    Some(parent) => {
                        if !parent.scale.is_coarser_than(node.scale) {
                            violations.push(format!(
                                "{}: parent scale {} not coarser than {}",
                                node.chunk_id,
                                parent.scale.as_str(),
                                node.scale.as_str()
                            ));
                        }
                        if !parent.child_chunk_ids.contains(&node.chunk_id) {
                            violations.push(format!(
                                "{}: missing from parent {pid} child list",
                                node.chunk_id
                            ));
                        }
                        let mut expected = parent.hierarchy_path.clone();
                        expected.push(pid.clone());
                        if node.hierarchy_path != expected {
                            violations.push(format!("{}: hierarchy path mismatch", node.chunk_id));
                        }
                        if parent.source_id != node.source_id || parent.version != node.version {
                            violations.push(format!(
                                "{}: parent belongs to a different source/version",
                                node.chunk_id
                            ));
                        }
                    }
                }
            } else if !node.hierarchy_path.is_empty() {
                violations.push(format!("{}: root with non-empty path", node.chunk_id));
            }

            for child_id in &node.child_chunk_ids {
                match self.nodes.get(child_id) {
                    None => {
                        violations.push(format!("{}: dangling child {child_id}", node.chunk_id));
                    }
                    Some(child) => {
                        if child.parent_chunk_id.as_deref() != Some(node.chunk_id.as_str()) {
                            violations.push(format!(
                                "{child_id}: parent pointer does not match {}",
                                node.chunk_id
                            ));
                        }
                    }
                }
            }
        }

        // Cycle check: walk parent chains, which must terminate.
        for node in self.nodes.values() {
            let mut seen = HashSet::new();
            let mut cursor = node.parent_chunk_id.as_deref();
            while let Some(id) = cursor {
                if !seen.insert(id.to_string()) {
                    violations.push(format!("{}: cycle through {id}", node.chunk_id));
                    break;
                }
                cursor = self.nodes.get(id).and_then(|n| n.parent_chunk_id.as_deref());
            }
        }

        violations
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(scale: Scale, content: &str, index: usize) -> ChunkNode {
        ChunkNode::new("src", "v1", scale, content.to_string(), vec![], index)
    }

    #[test]
    fn test_scale_ordering() {
        assert!(Scale::Document.is_coarser_than(Scale::Section));
        assert!(Scale::Section.is_coarser_than(Scale::Paragraph));
        assert!(Scale::Paragraph.is_coarser_than(Scale::Sentence));
        assert!(!Scale::Sentence.is_coarser_than(Scale::Paragraph));
        assert!(!Scale::Section.is_coarser_than(Scale::Section));
    }

    #[test]
    fn test_scale_round_trip() {
        for scale in Scale::ALL {
            assert_eq!(Scale::parse(scale.as_str()), Some(scale));
        }
        assert_eq!(Scale::parse("chapter"), None);
    }

    #[test]
    fn test_content_type_priority_order() {
        let priority = ChunkContentType::PRIORITY;
        assert_eq!(priority[0], ChunkContentType::Instructions);
        assert_eq!(priority[1], ChunkContentType::Definitions);
        assert_eq!(priority[4], ChunkContentType::TableOfContents);
        assert_eq!(priority[5], ChunkContentType::Text);
    }

    #[test]
    fn test_chunk_id_deterministic() {
        let a = chunk_id_for("src", "v1", Scale::Paragraph, &["Intro".to_string()], 0, "body");
        let b = chunk_id_for("src", "v1", Scale::Paragraph, &["Intro".to_string()], 0, "body");
        assert_eq!(a, b);
        assert!(a.starts_with("ck_"));
        assert_eq!(a.len(), 19);
    }

    #[test]
    fn test_chunk_id_varies_with_inputs() {
        let base = chunk_id_for("src", "v1", Scale::Paragraph, &[], 0, "body");
        assert_ne!(base, chunk_id_for("src", "v2", Scale::Paragraph, &[], 0, "body"));
        assert_ne!(base, chunk_id_for("src", "v1", Scale::Sentence, &[], 0, "body"));
        assert_ne!(base, chunk_id_for("src", "v1", Scale::Paragraph, &[], 1, "body"));
        assert_ne!(base, chunk_id_for("src", "v1", Scale::Paragraph, &[], 0, "other"));
    }

    #[test]
    fn test_chunk_counts() {
        let chunk = node(Scale::Paragraph, "Hello fund management world", 0);
        assert_eq!(chunk.word_count, 4);
        assert_eq!(chunk.character_count, 27);
        assert_eq!(chunk.token_count, estimate_tokens("Hello fund management world"));
    }

    #[test]
    fn test_chunk_preview() {
        let chunk = node(Scale::Sentence, "Hello, world!", 0);
        assert_eq!(chunk.preview(5), "Hello");
        assert_eq!(chunk.preview(100), "Hello, world!");
    }

    #[test]
    fn test_graph_link_and_paths() {
        let mut graph = ChunkGraph::new();
        let doc = node(Scale::Document, "whole document", 0);
        let sec = node(Scale::Section, "section body", 0);
        let para = node(Scale::Paragraph, "paragraph body", 0);
        let (doc_id, sec_id, para_id) =
            (doc.chunk_id.clone(), sec.chunk_id.clone(), para.chunk_id.clone());

        graph.insert(doc);
        graph.insert(sec);
        graph.insert(para);
        assert!(graph.link(&doc_id, &sec_id));
        assert!(graph.link(&sec_id, &para_id));

        let para = graph.get(&para_id).unwrap();
        assert_eq!(para.hierarchy_path, vec![doc_id.clone(), sec_id.clone()]);
        assert_eq!(para.parent_chunk_id.as_deref(), Some(sec_id.as_str()));

        assert!(graph.check_invariants().is_empty());
    }

    #[test]
    fn test_graph_duplicate_insert_rejected() {
        let mut graph = ChunkGraph::new();
        let chunk = node(Scale::Paragraph, "body", 0);
        assert!(graph.insert(chunk.clone()));
        assert!(!graph.insert(chunk));
        assert_eq!(graph.len(), 1);
    }

    #[test]
    fn test_graph_invariant_detects_scale_violation() {
        let mut graph = ChunkGraph::new();
        let sec = node(Scale::Section, "section", 0);
        let doc = node(Scale::Document, "document", 0);
        let (sec_id, doc_id) = (sec.chunk_id.clone(), doc.chunk_id.clone());
        graph.insert(sec);
        graph.insert(doc);
        // Linking a document under a section inverts the scale order.
        graph.link(&sec_id, &doc_id);
        let violations = graph.check_invariants();
        assert!(violations.iter().any(|v| v.contains("not coarser")));
    }

    #[test]
    fn test_remove_and_promote() {
        let mut graph = ChunkGraph::new();
        let doc = node(Scale::Document, "doc", 0);
        let sec = node(Scale::Section, "sec", 0);
        let p1 = node(Scale::Paragraph, "first", 0);
        let p2 = node(Scale::Paragraph, "second", 1);
        let (doc_id, sec_id) = (doc.chunk_id.clone(), sec.chunk_id.clone());
        let (p1_id, p2_id) = (p1.chunk_id.clone(), p2.chunk_id.clone());

        graph.insert(doc);
        graph.insert(sec);
        graph.insert(p1);
        graph.insert(p2);
        graph.link(&doc_id, &sec_id);
        graph.link(&sec_id, &p1_id);
        graph.link(&sec_id, &p2_id);

        // Rejecting the section promotes its paragraphs to the document.
        let removed = graph.remove_and_promote(&sec_id);
        assert!(removed.is_some());
        let doc = graph.get(&doc_id).unwrap();
        assert_eq!(doc.child_chunk_ids, vec![p1_id.clone(), p2_id.clone()]);
        let p1 = graph.get(&p1_id).unwrap();
        assert_eq!(p1.parent_chunk_id.as_deref(), Some(doc_id.as_str()));
        assert_eq!(p1.hierarchy_path, vec![doc_id.clone()]);
        assert!(graph.check_invariants().is_empty());
    }

    #[test]
    fn test_rebuild_siblings() {
        let mut graph = ChunkGraph::new();
        let doc = node(Scale::Document, "doc", 0);
        let s1 = node(Scale::Section, "one", 0);
        let s2 = node(Scale::Section, "two", 1);
        let (doc_id, s1_id, s2_id) =
            (doc.chunk_id.clone(), s1.chunk_id.clone(), s2.chunk_id.clone());
        graph.insert(doc);
        graph.insert(s1);
        graph.insert(s2);
        graph.link(&doc_id, &s1_id);
        graph.link(&doc_id, &s2_id);
        graph.rebuild_siblings();

        assert_eq!(graph.get(&s1_id).unwrap().sibling_chunk_ids, vec![s2_id.clone()]);
        assert_eq!(graph.get(&s2_id).unwrap().sibling_chunk_ids, vec![s1_id]);
        assert!(graph.get(&doc_id).unwrap().sibling_chunk_ids.is_empty());
    }

    #[test]
    fn test_chunk_serialization() {
        let mut chunk = node(Scale::Sentence, "NAV means Net Asset Value.", 0);
        chunk.embeddings.insert(EmbeddingKind::Content, vec![0.5, 0.5]);
        let json = serde_json::to_string(&chunk).unwrap();
        let back: ChunkNode = serde_json::from_str(&json).unwrap();
        assert_eq!(back, chunk);
    }
}
