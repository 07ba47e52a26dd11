//! Concept graph core: data model, chunking, merging and view filtering.

mod chunker;
mod filter;
mod merge;
mod model;

pub use chunker::{Chunks, DEFAULT_OVERLAP, DEFAULT_WINDOW, chunks};
pub use filter::matches_query;
pub use merge::{MergeOutcome, RawExtraction};
pub use model::{ConceptGraph, ConceptLink, ConceptNode, GraphError, LinkRef};
