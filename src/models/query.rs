//! Query parameters accepted by the documentation tools.

use serde::{Deserialize, Serialize};

/// Number of chunks returned when the caller does not ask for a specific amount
pub const DEFAULT_K: u32 = 8;

/// Smallest accepted `k`
pub const MIN_K: u32 = 1;

/// Largest accepted `k`
pub const MAX_K: u32 = 50;

/// Parameters for `search_docs` and `answer_with_docs`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchParams {
    /// Free-text search query
    pub query: String,

    /// Library name to filter by
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub library: Option<String>,

    /// Library version to filter by
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,

    /// Number of results to retrieve
    #[serde(default = "default_k")]
    pub k: u32,
}

fn default_k() -> u32 {
    DEFAULT_K
}

impl Default for SearchParams {
    fn default() -> Self {
        Self {
            query: String::new(),
            library: None,
            version: None,
            k: DEFAULT_K,
        }
    }
}

impl SearchParams {
    /// Create search parameters for a query with default filters
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            ..Default::default()
        }
    }

    /// Set the library filter
    pub fn library(mut self, library: impl Into<String>) -> Self {
        self.library = Some(library.into());
        self
    }

    /// Set the version filter
    pub fn version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    /// Set the number of results
    pub fn k(mut self, k: u32) -> Self {
        self.k = k;
        self
    }
}

/// Parameters for `get_chunk`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkParams {
    /// Identifier of the chunk in the backing knowledge base
    #[serde(rename = "chunkId")]
    pub chunk_id: String,
}

impl ChunkParams {
    /// Create chunk parameters
    pub fn new(chunk_id: impl Into<String>) -> Self {
        Self {
            chunk_id: chunk_id.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_search_params_defaults() {
        let params: SearchParams = serde_json::from_str(r#"{"query":"hooks"}"#).unwrap();
        assert_eq!(params.query, "hooks");
        assert_eq!(params.k, DEFAULT_K);
        assert!(params.library.is_none());
        assert!(params.version.is_none());
    }

    #[test]
    fn test_search_params_builder() {
        let params = SearchParams::new("routing").library("axum").version("0.7").k(3);
        assert_eq!(params.library.as_deref(), Some("axum"));
        assert_eq!(params.version.as_deref(), Some("0.7"));
        assert_eq!(params.k, 3);
    }

    #[test]
    fn test_chunk_params_wire_name() {
        let params: ChunkParams = serde_json::from_str(r#"{"chunkId":"abc"}"#).unwrap();
        assert_eq!(params.chunk_id, "abc");
        assert_eq!(
            serde_json::to_value(&params).unwrap(),
            serde_json::json!({"chunkId": "abc"})
        );
    }
}
