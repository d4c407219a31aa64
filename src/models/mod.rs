//! Core data models for documentation queries and retrieval results.

mod query;
mod result;

pub use query::{ChunkParams, SearchParams, DEFAULT_K, MAX_K, MIN_K};
pub use result::{ChunkResult, DocsAnswer, Metadata, SearchResult};
