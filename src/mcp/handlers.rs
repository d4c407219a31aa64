//! Tool handlers rendering provider results as MCP text.

use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;

use super::tools::ToolHandler;
use crate::models::{ChunkParams, DocsAnswer, SearchParams, SearchResult, DEFAULT_K, MAX_K, MIN_K};
use crate::providers::{DocsProvider, ProviderError};
use crate::utils::preview;

/// Characters of each source shown under an answer
const SOURCE_PREVIEW_CHARS: usize = 150;

fn str_arg(args: &Value, key: &str) -> Option<String> {
    args.get(key)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn k_arg(args: &Value) -> Result<u32, ProviderError> {
    let k = match args.get("k") {
        None | Some(Value::Null) => return Ok(DEFAULT_K),
        Some(Value::Number(k)) => k,
        Some(_) => return Err(ProviderError::Validation("k must be a number".to_string())),
    };

    let Some(k) = k.as_f64().filter(|k| k.fract() == 0.0) else {
        return Err(ProviderError::Validation("k must be an integer".to_string()));
    };
    if k == 0.0 {
        return Ok(DEFAULT_K);
    }
    if !(f64::from(MIN_K)..=f64::from(MAX_K)).contains(&k) {
        return Err(ProviderError::Validation(format!(
            "k must be between {} and {}",
            MIN_K, MAX_K
        )));
    }
    Ok(k as u32)
}

/// Read search arguments; an absent or zero `k` means the default
pub fn search_params(args: &Value) -> Result<SearchParams, ProviderError> {
    Ok(SearchParams {
        query: args
            .get("query")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string(),
        library: str_arg(args, "library"),
        version: str_arg(args, "version"),
        k: k_arg(args)?,
    })
}

fn filter_suffix(params: &SearchParams, with_version: bool) -> String {
    let mut suffix = String::new();
    if let Some(library) = &params.library {
        suffix.push_str(&format!(" in {}", library));
    }
    if with_version {
        if let Some(version) = &params.version {
            suffix.push_str(&format!(" version {}", version));
        }
    }
    suffix
}

#[derive(Debug, Serialize)]
struct RankedResult<'a> {
    rank: usize,
    content: &'a str,
    library: &'a str,
    source: &'a str,
    similarity: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    document_id: Option<&'a str>,
    chunk_id: &'a str,
}

/// Render search results for display
pub fn render_search(params: &SearchParams, results: &[SearchResult]) -> Result<String, String> {
    if results.is_empty() {
        return Ok(format!(
            "No documentation found for query: \"{}\"{}",
            params.query,
            filter_suffix(params, true)
        ));
    }

    let ranked: Vec<RankedResult<'_>> = results
        .iter()
        .enumerate()
        .map(|(i, result)| RankedResult {
            rank: i + 1,
            content: &result.content,
            library: result.library().unwrap_or("unknown"),
            source: result.source().unwrap_or("unknown"),
            similarity: result.score.unwrap_or(0.0),
            document_id: result.meta_str("document_id"),
            chunk_id: &result.id,
        })
        .collect();

    serde_json::to_string_pretty(&ranked).map_err(|e| e.to_string())
}

/// Render an answer with numbered source previews
pub fn render_answer(params: &SearchParams, answer: &DocsAnswer) -> String {
    if !answer.has_sources() {
        return format!(
            "**Answer:** I couldn't find specific documentation to answer your question about: \"{}\"{}\n\n\
             **Suggestion:** Try rephrasing your question or check if the library name is correct.",
            params.query,
            filter_suffix(params, false)
        );
    }

    let sources = answer
        .sources
        .iter()
        .enumerate()
        .map(|(i, source)| {
            format!(
                "**[{}]** {} - {}\n{}",
                i + 1,
                source.library().unwrap_or("unknown"),
                source.source().unwrap_or("documentation"),
                preview(&source.content, SOURCE_PREVIEW_CHARS)
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n");

    format!(
        "**Answer:**\n{}\n\n**Sources:**\n{}\n\n---\n*Powered by Docsyte - Comprehensive documentation search with {} sources*",
        answer.answer,
        sources,
        answer.sources.len()
    )
}

/// Handler for `search_docs`
#[derive(Debug)]
pub struct SearchDocsHandler {
    pub provider: Arc<dyn DocsProvider>,
}

#[async_trait::async_trait]
impl ToolHandler for SearchDocsHandler {
    async fn execute(&self, args: Value) -> Result<String, String> {
        let params = search_params(&args).map_err(|e| e.to_string())?;
        let results = self
            .provider
            .search_docs(&params)
            .await
            .map_err(|e| e.to_string())?;
        render_search(&params, &results)
    }
}

/// Handler for `get_chunk`
#[derive(Debug)]
pub struct GetChunkHandler {
    pub provider: Arc<dyn DocsProvider>,
}

#[async_trait::async_trait]
impl ToolHandler for GetChunkHandler {
    async fn execute(&self, args: Value) -> Result<String, String> {
        let params = ChunkParams::new(
            args.get("chunkId")
                .and_then(Value::as_str)
                .unwrap_or_default(),
        );
        let chunk = self
            .provider
            .get_chunk(&params)
            .await
            .map_err(|e| e.to_string())?;
        serde_json::to_string_pretty(&chunk).map_err(|e| e.to_string())
    }
}

/// Handler for `answer_with_docs`
#[derive(Debug)]
pub struct AnswerWithDocsHandler {
    pub provider: Arc<dyn DocsProvider>,
}

#[async_trait::async_trait]
impl ToolHandler for AnswerWithDocsHandler {
    async fn execute(&self, args: Value) -> Result<String, String> {
        let params = search_params(&args).map_err(|e| e.to_string())?;
        let answer = self
            .provider
            .answer_with_docs(&params)
            .await
            .map_err(|e| e.to_string())?;
        Ok(render_answer(&params, &answer))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ChunkResult;
    use crate::providers::mock::make_result;
    use crate::providers::{MockProvider, ProviderError};
    use serde_json::json;

    fn mock_with_results() -> Arc<MockProvider> {
        let mock = Arc::new(MockProvider::new());
        let mut first = make_result("c1", "useState returns a stateful value", "react", "hooks.md");
        first
            .metadata
            .insert("document_id".into(), json!("doc-7"));
        mock.set_search_results(vec![
            first,
            make_result("c2", &"x".repeat(200), "react", ""),
        ]);
        mock
    }

    #[test]
    fn test_search_params_defaults() {
        let params = search_params(&json!({"query": "hooks"})).unwrap();
        assert_eq!(params.k, 8);
        assert_eq!(params.library, None);

        let params = search_params(&json!({"query": "hooks", "k": 0, "library": "react"})).unwrap();
        assert_eq!(params.k, 8);
        assert_eq!(params.library.as_deref(), Some("react"));

        assert_eq!(search_params(&json!({"query": "q", "k": 3})).unwrap().k, 3);
        assert_eq!(search_params(&json!({"query": "q", "k": 3.0})).unwrap().k, 3);
        assert_eq!(search_params(&json!({"query": "q", "k": null})).unwrap().k, 8);
    }

    #[test]
    fn test_search_params_rejects_bad_k() {
        let err = search_params(&json!({"query": "q", "k": 3.7})).unwrap_err();
        assert_eq!(err, ProviderError::Validation("k must be an integer".into()));

        let err = search_params(&json!({"query": "q", "k": "5"})).unwrap_err();
        assert_eq!(err, ProviderError::Validation("k must be a number".into()));

        for k in [json!(-2), json!(51), json!(u64::MAX)] {
            let err = search_params(&json!({"query": "q", "k": k})).unwrap_err();
            assert_eq!(err.to_string(), "k must be between 1 and 50");
        }
    }

    #[tokio::test]
    async fn test_fractional_k_never_reaches_provider() {
        let mock = Arc::new(MockProvider::new());
        let handler = SearchDocsHandler {
            provider: mock.clone(),
        };
        let err = handler
            .execute(json!({"query": "q", "k": 3.7}))
            .await
            .unwrap_err();
        assert_eq!(err, "k must be an integer");
        assert_eq!(mock.search_calls(), 0);
    }

    #[tokio::test]
    async fn test_search_renders_ranked_json() {
        let handler = SearchDocsHandler {
            provider: mock_with_results(),
        };
        let text = handler.execute(json!({"query": "state"})).await.unwrap();
        let rendered: Value = serde_json::from_str(&text).unwrap();

        assert_eq!(rendered[0]["rank"], 1);
        assert_eq!(rendered[0]["library"], "react");
        assert_eq!(rendered[0]["source"], "hooks.md");
        assert_eq!(rendered[0]["similarity"], 0.9);
        assert_eq!(rendered[0]["document_id"], "doc-7");
        assert_eq!(rendered[0]["chunk_id"], "c1");
        assert_eq!(rendered[1]["source"], "unknown");
        assert!(rendered[1].get("document_id").is_none());
        // two-space indentation
        assert!(text.starts_with("[\n  {\n    \"rank\": 1"));
    }

    #[tokio::test]
    async fn test_search_empty_mentions_filters() {
        let handler = SearchDocsHandler {
            provider: Arc::new(MockProvider::new()),
        };
        let text = handler
            .execute(json!({"query": "routing", "library": "axum", "version": "0.7"}))
            .await
            .unwrap();
        assert_eq!(
            text,
            "No documentation found for query: \"routing\" in axum version 0.7"
        );
    }

    #[tokio::test]
    async fn test_search_validation_error_passes_through() {
        let handler = SearchDocsHandler {
            provider: Arc::new(MockProvider::new()),
        };
        let err = handler.execute(json!({"query": ""})).await.unwrap_err();
        assert_eq!(err, "Query cannot be empty");
    }

    #[tokio::test]
    async fn test_get_chunk_renders_pretty_json() {
        let mock = Arc::new(MockProvider::new());
        mock.set_chunk(ChunkResult {
            id: "c9".into(),
            content: "body".into(),
            metadata: Default::default(),
        });
        let handler = GetChunkHandler { provider: mock };

        let text = handler.execute(json!({"chunkId": "c9"})).await.unwrap();
        let value: Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value["content"], "body");

        let err = handler.execute(json!({})).await.unwrap_err();
        assert_eq!(err, "Chunk ID cannot be empty");
    }

    #[tokio::test]
    async fn test_answer_renders_sources() {
        let mock = mock_with_results();
        mock.set_answer("Call useState inside the component.");
        let handler = AnswerWithDocsHandler { provider: mock };

        let text = handler.execute(json!({"query": "state"})).await.unwrap();
        assert!(text.starts_with("**Answer:**\nCall useState inside the component.\n\n**Sources:**\n"));
        assert!(text.contains("**[1]** react - hooks.md\nuseState returns a stateful value"));
        assert!(text.contains(&format!("**[2]** react - documentation\n{}...", "x".repeat(150))));
        assert!(text.ends_with("*Powered by Docsyte - Comprehensive documentation search with 2 sources*"));
    }

    #[tokio::test]
    async fn test_answer_without_sources_suggests_rephrasing() {
        let handler = AnswerWithDocsHandler {
            provider: Arc::new(MockProvider::new()),
        };
        let text = handler
            .execute(json!({"query": "lifetimes", "library": "rust"}))
            .await
            .unwrap();
        assert!(text.starts_with(
            "**Answer:** I couldn't find specific documentation to answer your question about: \"lifetimes\" in rust"
        ));
        assert!(text.contains("**Suggestion:**"));
    }

    #[tokio::test]
    async fn test_timeout_message_is_surfaced() {
        let mock = Arc::new(MockProvider::new());
        mock.set_error(ProviderError::Timeout("Search request timed out".into()));
        let handler = SearchDocsHandler { provider: mock };
        let err = handler.execute(json!({"query": "q"})).await.unwrap_err();
        assert_eq!(err, "Search request timed out");
    }
}
