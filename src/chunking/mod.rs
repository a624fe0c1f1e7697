//! Hierarchical chunking: document → section → paragraph → sentence.
//!
//! The chunker consumes the structure analysis and emits a [`ChunkGraph`]
//! with edges populated and token bands respected. Sentence splitting is a
//! finite-state pass with abbreviation suppression; an optional refinement
//! pass merges adjacent paragraphs by lexical similarity.
//!
//! [`ChunkGraph`]: crate::core::ChunkGraph

pub mod hierarchical;
pub mod refine;
pub mod sentence;

pub use hierarchical::{HierarchicalChunker, instructional_value};
pub use refine::{TermVector, boundary_similarity, plan_merges};
pub use sentence::split_sentences;
