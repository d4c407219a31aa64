//! LlamaCloud managed RAG provider.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{
    degrade, fallback, validate_chunk, validate_search, DocsProvider, ProviderError, NO_DOCS_ANSWER,
};
use crate::config::LlamaCloudConfig;
use crate::models::{ChunkParams, ChunkResult, DocsAnswer, SearchParams, SearchResult};
use crate::utils::{endpoint, with_bearer, HttpClient};

/// LlamaCloud provider
#[derive(Debug, Clone)]
pub struct LlamaCloudProvider {
    http: HttpClient,
    base_url: String,
    api_key: String,
}

#[derive(Debug, Default, Serialize)]
struct Filters<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    library: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    version: Option<&'a str>,
}

#[derive(Debug, Serialize)]
struct PipelineRequest<'a> {
    query: &'a str,
    top_k: u32,
    filters: Filters<'a>,
}

impl<'a> PipelineRequest<'a> {
    fn from_params(params: &'a SearchParams) -> Self {
        Self {
            query: &params.query,
            top_k: params.k,
            filters: Filters {
                library: params.library.as_deref().filter(|s| !s.is_empty()),
                version: params.version.as_deref().filter(|s| !s.is_empty()),
            },
        }
    }
}

#[derive(Debug, Deserialize)]
struct RetrievalResponse {
    #[serde(default)]
    results: Vec<SearchResult>,
}

#[derive(Debug, Deserialize)]
struct RagResponse {
    #[serde(default)]
    answer: Option<String>,
}

impl LlamaCloudProvider {
    /// Create a provider; an API key is mandatory
    pub fn new(config: &LlamaCloudConfig, timeout: Duration) -> Result<Self, ProviderError> {
        let api_key = config
            .api_key
            .clone()
            .filter(|k| !k.is_empty())
            .ok_or_else(|| ProviderError::Config("LlamaCloud API key is required".to_string()))?;

        url::Url::parse(&config.base_url).map_err(|e| {
            ProviderError::Config(format!(
                "invalid LlamaCloud URL '{}': {}",
                config.base_url, e
            ))
        })?;

        let http = HttpClient::new(timeout)
            .map_err(|e| ProviderError::Config(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key,
        })
    }

    async fn send(
        &self,
        builder: reqwest::RequestBuilder,
        action: &str,
        timeout_message: &str,
    ) -> Result<reqwest::Response, ProviderError> {
        let response = with_bearer(builder.timeout(self.http.timeout()), Some(&self.api_key))
            .send()
            .await
            .map_err(|e| ProviderError::from_request(e, timeout_message))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ProviderError::Upstream(format!(
                "LlamaCloud {} failed: {}",
                action,
                status.canonical_reason().unwrap_or(status.as_str())
            )));
        }
        Ok(response)
    }

    async fn try_search(&self, params: &SearchParams) -> Result<Vec<SearchResult>, ProviderError> {
        let builder = self
            .http
            .client()
            .post(endpoint(&self.base_url, "/api/v1/pipelines/retrieval"))
            .json(&PipelineRequest::from_params(params));
        let response = self
            .send(builder, "search", "Search request timed out")
            .await?;

        let data: RetrievalResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::from_request(e, "Search request timed out"))?;
        Ok(data.results)
    }

    async fn try_get_chunk(&self, params: &ChunkParams) -> Result<ChunkResult, ProviderError> {
        let path = format!("/api/v1/chunks/{}", urlencoding::encode(&params.chunk_id));
        let builder = self.http.client().get(endpoint(&self.base_url, &path));
        let response = self
            .send(builder, "chunk retrieval", "Chunk retrieval request timed out")
            .await?;

        let body: Value = response
            .json()
            .await
            .map_err(|e| ProviderError::from_request(e, "Chunk retrieval request timed out"))?;
        Ok(serde_json::from_value(body)?)
    }

    async fn try_rag(&self, params: &SearchParams) -> Result<String, ProviderError> {
        let builder = self
            .http
            .client()
            .post(endpoint(&self.base_url, "/api/v1/pipelines/rag"))
            .json(&PipelineRequest::from_params(params));
        let response = self
            .send(builder, "RAG", "Answer generation request timed out")
            .await?;

        let data: RagResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::from_request(e, "Answer generation request timed out"))?;
        Ok(data
            .answer
            .filter(|a| !a.is_empty())
            .unwrap_or_else(|| "No answer generated".to_string()))
    }
}

#[async_trait]
impl DocsProvider for LlamaCloudProvider {
    fn id(&self) -> &str {
        "llamacloud"
    }

    fn name(&self) -> &str {
        "LlamaCloud"
    }

    fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn search_docs(&self, params: &SearchParams) -> Result<Vec<SearchResult>, ProviderError> {
        validate_search(params)?;
        let mut results = degrade(self.try_search(params).await, self.name(), "search", || {
            fallback::search_results(self.name(), &params.query, params.k)
        })?;
        results.truncate(params.k as usize);
        Ok(results)
    }

    async fn get_chunk(&self, params: &ChunkParams) -> Result<ChunkResult, ProviderError> {
        validate_chunk(params)?;
        degrade(
            self.try_get_chunk(params).await,
            self.name(),
            "chunk retrieval",
            || fallback::chunk(self.name(), &params.chunk_id),
        )
    }

    async fn answer_with_docs(&self, params: &SearchParams) -> Result<DocsAnswer, ProviderError> {
        validate_search(params)?;

        let sources = self.search_docs(params).await?;
        if sources.is_empty() {
            return Ok(DocsAnswer {
                answer: NO_DOCS_ANSWER.to_string(),
                sources,
            });
        }

        let answer = degrade(self.try_rag(params).await, self.name(), "RAG", || {
            fallback::answer(self.name(), &params.query, &sources)
        })?;

        Ok(DocsAnswer { answer, sources })
    }
}
