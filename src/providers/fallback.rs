//! Deterministic placeholder content used when a provider is unavailable.

use serde_json::Value;

use crate::models::{ChunkResult, Metadata, SearchResult};

/// Upper bound on the number of placeholder search results
pub const MAX_FALLBACK_RESULTS: u32 = 3;

fn fallback_metadata() -> Metadata {
    let mut metadata = Metadata::new();
    metadata.insert("source".into(), Value::from("fallback-docs"));
    metadata.insert("library".into(), Value::from("example-lib"));
    metadata.insert("version".into(), Value::from("1.0.0"));
    metadata.insert("type".into(), Value::from("documentation"));
    metadata
}

/// `min(k, 3)` placeholder results for `query`
pub fn search_results(provider: &str, query: &str, k: u32) -> Vec<SearchResult> {
    (0..k.min(MAX_FALLBACK_RESULTS))
        .map(|i| {
            let n = i + 1;
            SearchResult {
                id: format!("fallback-{}", n),
                content: format!(
                    "This is a fallback search result {} for query: \"{}\". This would normally come from {}'s vector search.",
                    n, query, provider
                ),
                metadata: fallback_metadata(),
                // 0.8, 0.7, 0.6 with no float drift
                score: Some(((8 - i) as f64) / 10.0),
            }
        })
        .collect()
}

/// Placeholder chunk echoing the requested identifier
pub fn chunk(provider: &str, chunk_id: &str) -> ChunkResult {
    ChunkResult {
        id: chunk_id.to_string(),
        content: format!(
            "This is a fallback chunk with ID: {}. This would normally be retrieved from {}'s knowledge base.",
            chunk_id, provider
        ),
        metadata: fallback_metadata(),
    }
}

/// Placeholder answer summarising which sources were found
pub fn answer(provider: &str, query: &str, sources: &[SearchResult]) -> String {
    let count = sources.len();
    let mut libraries: Vec<&str> = Vec::new();
    for library in sources.iter().filter_map(SearchResult::library) {
        if !libraries.contains(&library) {
            libraries.push(library);
        }
    }

    format!(
        "Based on {} documentation source{} from {}, here's what I found regarding \"{}\":\n\n\
         This is a fallback answer generated when {} is not available. The actual implementation would use {}'s LLM to generate a comprehensive answer based on the retrieved documentation chunks.\n\n\
         The search found relevant information that would normally be synthesized into a proper answer with citations.",
        count,
        if count == 1 { "" } else { "s" },
        libraries.join(", "),
        query,
        provider,
        provider
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_search_results_capped_at_three() {
        assert_eq!(search_results("RAGFlow", "q", 8).len(), 3);
        assert_eq!(search_results("RAGFlow", "q", 2).len(), 2);
        assert_eq!(search_results("RAGFlow", "q", 1).len(), 1);
    }

    #[test]
    fn test_search_results_are_deterministic() {
        let results = search_results("RAGFlow", "hooks", 3);
        assert_eq!(results[0].id, "fallback-1");
        assert_eq!(results[2].id, "fallback-3");
        assert_eq!(results[0].score, Some(0.8));
        assert_eq!(results[1].score, Some(0.7));
        assert_eq!(results[2].score, Some(0.6));
        assert_eq!(
            results[0].content,
            "This is a fallback search result 1 for query: \"hooks\". This would normally come from RAGFlow's vector search."
        );
        assert_eq!(results[0].library(), Some("example-lib"));
        assert_eq!(results, search_results("RAGFlow", "hooks", 3));
    }

    #[test]
    fn test_chunk_echoes_id() {
        let chunk = chunk("RAGFlow", "abc-123");
        assert_eq!(chunk.id, "abc-123");
        assert!(chunk.content.contains("ID: abc-123"));
        assert_eq!(chunk.metadata["source"], "fallback-docs");
    }

    #[test]
    fn test_answer_lists_distinct_libraries() {
        let sources = search_results("RAGFlow", "q", 3);
        let text = answer("RAGFlow", "q", &sources);
        assert!(text.starts_with(
            "Based on 3 documentation sources from example-lib, here's what I found regarding \"q\":"
        ));

        let text = answer("RAGFlow", "q", &sources[..1]);
        assert!(text.starts_with("Based on 1 documentation source from example-lib,"));
    }
}
