//! Context expansion around retrieval candidates.
//!
//! Hierarchical expansion pulls in the parent and the first children of a
//! match; semantic expansion pulls in the siblings nearest by contextual
//! vector similarity, capped by the configured expansion budget.

use crate::core::{ChunkNode, EmbeddingKind};
use crate::embedding::cosine_similarity;
use crate::error::Result;
use crate::storage::ChunkStore;

/// Maximum children added per anchor during hierarchical expansion.
const MAX_CHILDREN: usize = 2;

/// Expansion settings, mirrored from retrieval options.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExpansionOptions {
    /// Include the anchor's parent and up to two children.
    pub hierarchical: bool,
    /// Include nearest siblings by contextual similarity.
    pub semantic: bool,
    /// Total expansion chunks allowed per anchor.
    pub max_expansion_chunks: usize,
}

impl Default for ExpansionOptions {
    fn default() -> Self {
        Self { hierarchical: false, semantic: false, max_expansion_chunks: 2 }
    }
}

/// Collects expansion chunks for one anchor.
///
/// Already-seen chunk IDs are skipped so expansion never duplicates ranked
/// candidates.
///
/// # Errors
///
/// Returns an error when graph lookups fail.
pub fn expand_context(
    store: &dyn ChunkStore,
    anchor: &ChunkNode,
    options: &ExpansionOptions,
    seen: &dyn Fn(&str) -> bool,
) -> Result<Vec<ChunkNode>> {
    let mut expansions: Vec<ChunkNode> = Vec::new();
    let budget = options.max_expansion_chunks;

    if options.hierarchical && expansions.len() < budget {
        if let Some(parent) = store.get_parent(&anchor.chunk_id)? {
            if !seen(&parent.chunk_id) {
                expansions.push(parent);
            }
        }
        for child in store.get_children(&anchor.chunk_id)?.into_iter().take(MAX_CHILDREN) {
            if expansions.len() >= budget {
                break;
            }
            if !seen(&child.chunk_id)
                && !expansions.iter().any(|e| e.chunk_id == child.chunk_id)
            {
                expansions.push(child);
            }
        }
    }

    if options.semantic && expansions.len() < budget {
        let anchor_vector = anchor.embeddings.get(&EmbeddingKind::Contextual);
        let mut siblings = store.get_siblings(&anchor.chunk_id)?;

        if let Some(anchor_vector) = anchor_vector {
            let mut scored: Vec<(f32, ChunkNode)> = siblings
                .drain(..)
                .filter_map(|sibling| {
                    let vector = sibling.embeddings.get(&EmbeddingKind::Contextual)?;
                    let similarity = cosine_similarity(anchor_vector, vector);
                    Some((similarity, sibling))
                })
                .collect();
            scored.sort_by(|a, b| {
                b.0.partial_cmp(&a.0)
                    .unwrap_or(std::cmp::Ordering::Equal)
                    .then_with(|| a.1.chunk_id.cmp(&b.1.chunk_id))
            });
            siblings = scored.into_iter().map(|(_, sibling)| sibling).collect();
        }

        for sibling in siblings {
            if expansions.len() >= budget {
                break;
            }
            if !seen(&sibling.chunk_id)
                && !expansions.iter().any(|e| e.chunk_id == sibling.chunk_id)
            {
                expansions.push(sibling);
            }
        }
    }

    expansions.truncate(budget);
    Ok(expansions)
}
