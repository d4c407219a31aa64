//! Retrieval results returned by documentation providers.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Free-form metadata attached to a chunk (source file, library, version, ...)
pub type Metadata = Map<String, Value>;

/// A chunk returned by a search, with its relevance score
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    /// Chunk identifier, usable with `get_chunk`
    pub id: String,

    /// Chunk text
    pub content: String,

    /// Provider metadata
    #[serde(default)]
    pub metadata: Metadata,

    /// Similarity score reported by the provider
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
}

impl SearchResult {
    /// Look up a string metadata field
    pub fn meta_str(&self, key: &str) -> Option<&str> {
        self.metadata.get(key).and_then(Value::as_str)
    }

    /// Library the chunk belongs to, if the provider reported one
    pub fn library(&self) -> Option<&str> {
        self.meta_str("library").filter(|s| !s.is_empty())
    }

    /// Source document of the chunk, if the provider reported one
    pub fn source(&self) -> Option<&str> {
        self.meta_str("source").filter(|s| !s.is_empty())
    }
}

/// A single chunk fetched by identifier
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChunkResult {
    pub id: String,
    pub content: String,
    #[serde(default)]
    pub metadata: Metadata,
}

/// A generated answer together with the chunks it was built from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocsAnswer {
    pub answer: String,
    pub sources: Vec<SearchResult>,
}

impl DocsAnswer {
    /// Whether any documentation backed this answer
    pub fn has_sources(&self) -> bool {
        !self.sources.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_search_result_metadata_accessors() {
        let result: SearchResult = serde_json::from_value(json!({
            "id": "c1",
            "content": "text",
            "metadata": {"library": "react", "source": "", "page": 3},
            "score": 0.5
        }))
        .unwrap();

        assert_eq!(result.library(), Some("react"));
        assert_eq!(result.source(), None);
        assert_eq!(result.meta_str("page"), None);
        assert_eq!(result.score, Some(0.5));
    }

    #[test]
    fn test_chunk_result_without_metadata() {
        let chunk: ChunkResult =
            serde_json::from_value(json!({"id": "c1", "content": "body"})).unwrap();
        assert!(chunk.metadata.is_empty());
    }

    #[test]
    fn test_score_omitted_when_absent() {
        let result = SearchResult {
            id: "c1".into(),
            content: "text".into(),
            metadata: Metadata::new(),
            score: None,
        };
        let value = serde_json::to_value(&result).unwrap();
        assert!(value.get("score").is_none());
    }
}
