//! Mock provider for testing purposes.

use async_trait::async_trait;
use serde_json::Value;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};

use super::{validate_chunk, validate_search, DocsProvider, ProviderError, NO_DOCS_ANSWER};
use crate::models::{ChunkParams, ChunkResult, DocsAnswer, Metadata, SearchParams, SearchResult};

#[derive(Debug, Default)]
struct MockState {
    search_results: Vec<SearchResult>,
    chunk: Option<ChunkResult>,
    answer: Option<String>,
    error: Option<ProviderError>,
}

/// A mock provider that returns predefined responses.
#[derive(Debug, Default)]
pub struct MockProvider {
    state: Mutex<MockState>,
    search_calls: AtomicUsize,
    chunk_calls: AtomicUsize,
    answer_calls: AtomicUsize,
}

impl MockProvider {
    /// Create a new mock provider with no canned data.
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Set the results returned by `search_docs` (and used as answer sources).
    pub fn set_search_results(&self, results: Vec<SearchResult>) {
        self.state().search_results = results;
    }

    /// Set the chunk returned by `get_chunk`.
    pub fn set_chunk(&self, chunk: ChunkResult) {
        self.state().chunk = Some(chunk);
    }

    /// Set the generated answer text.
    pub fn set_answer(&self, answer: impl Into<String>) {
        self.state().answer = Some(answer.into());
    }

    /// Make every subsequent call fail with `error`.
    pub fn set_error(&self, error: ProviderError) {
        self.state().error = Some(error);
    }

    /// Forget all canned data.
    pub fn reset(&self) {
        *self.state() = MockState::default();
    }

    pub fn search_calls(&self) -> usize {
        self.search_calls.load(Ordering::SeqCst)
    }

    pub fn chunk_calls(&self) -> usize {
        self.chunk_calls.load(Ordering::SeqCst)
    }

    pub fn answer_calls(&self) -> usize {
        self.answer_calls.load(Ordering::SeqCst)
    }

    fn check_error(&self) -> Result<(), ProviderError> {
        match &self.state().error {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }

    fn results_for(&self, params: &SearchParams) -> Vec<SearchResult> {
        self.state()
            .search_results
            .iter()
            .take(params.k as usize)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl DocsProvider for MockProvider {
    fn id(&self) -> &str {
        "mock"
    }

    fn name(&self) -> &str {
        "Mock Provider"
    }

    fn base_url(&self) -> &str {
        "mock://"
    }

    async fn search_docs(&self, params: &SearchParams) -> Result<Vec<SearchResult>, ProviderError> {
        self.search_calls.fetch_add(1, Ordering::SeqCst);
        validate_search(params)?;
        self.check_error()?;
        Ok(self.results_for(params))
    }

    async fn get_chunk(&self, params: &ChunkParams) -> Result<ChunkResult, ProviderError> {
        self.chunk_calls.fetch_add(1, Ordering::SeqCst);
        validate_chunk(params)?;
        self.check_error()?;
        match &self.state().chunk {
            Some(chunk) => Ok(chunk.clone()),
            None => Ok(ChunkResult {
                id: params.chunk_id.clone(),
                content: String::new(),
                metadata: Metadata::new(),
            }),
        }
    }

    async fn answer_with_docs(&self, params: &SearchParams) -> Result<DocsAnswer, ProviderError> {
        self.answer_calls.fetch_add(1, Ordering::SeqCst);
        validate_search(params)?;
        self.check_error()?;

        let sources = self.results_for(params);
        if sources.is_empty() {
            return Ok(DocsAnswer {
                answer: NO_DOCS_ANSWER.to_string(),
                sources,
            });
        }

        let answer = self
            .state()
            .answer
            .clone()
            .unwrap_or_else(|| "Mock answer".to_string());
        Ok(DocsAnswer { answer, sources })
    }
}

/// Helper function to create a search result for testing.
pub fn make_result(id: &str, content: &str, library: &str, source: &str) -> SearchResult {
    let mut metadata = Metadata::new();
    metadata.insert("library".into(), Value::from(library));
    metadata.insert("source".into(), Value::from(source));
    SearchResult {
        id: id.to_string(),
        content: content.to_string(),
        metadata,
        score: Some(0.9),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_returns_canned_results() {
        let mock = MockProvider::new();
        mock.set_search_results(vec![
            make_result("a", "first", "react", "hooks.md"),
            make_result("b", "second", "react", "state.md"),
        ]);

        let results = mock.search_docs(&SearchParams::new("q").k(1)).await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].id, "a");
        assert_eq!(mock.search_calls(), 1);
    }

    #[tokio::test]
    async fn test_mock_validates_input() {
        let mock = MockProvider::new();
        let err = mock.search_docs(&SearchParams::new("")).await.unwrap_err();
        assert_eq!(err.to_string(), "Query cannot be empty");
    }

    #[tokio::test]
    async fn test_mock_answer_without_sources() {
        let mock = MockProvider::new();
        mock.set_answer("ignored");
        let answer = mock.answer_with_docs(&SearchParams::new("q")).await.unwrap();
        assert_eq!(answer.answer, NO_DOCS_ANSWER);
        assert!(!answer.has_sources());
    }

    #[tokio::test]
    async fn test_mock_error_and_reset() {
        let mock = MockProvider::new();
        mock.set_error(ProviderError::Timeout("Search request timed out".into()));
        assert!(mock.search_docs(&SearchParams::new("q")).await.is_err());

        mock.reset();
        assert!(mock.search_docs(&SearchParams::new("q")).await.is_ok());
    }
}
