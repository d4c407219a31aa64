//! RAGFlow documentation provider.
//!
//! Uses the RAGFlow HTTP API: `/api/v1/retrieval` for search,
//! `/api/v1/chunks/{id}` for chunk lookup and `/api/v1/generate` for answers.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{
    degrade, fallback, validate_chunk, validate_search, DocsProvider, ProviderError, NO_DOCS_ANSWER,
};
use crate::config::RagflowConfig;
use crate::models::{ChunkParams, ChunkResult, DocsAnswer, Metadata, SearchParams, SearchResult};
use crate::utils::{endpoint, with_bearer, HttpClient};

const SEARCH_TIMEOUT: &str = "Search request timed out";
const CHUNK_TIMEOUT: &str = "Chunk retrieval request timed out";
const ANSWER_TIMEOUT: &str = "Answer generation request timed out";

/// RAGFlow provider
#[derive(Debug, Clone)]
pub struct RagflowProvider {
    http: HttpClient,
    base_url: String,
    api_key: Option<String>,
    dataset_ids: Vec<String>,
    similarity_threshold: f64,
    vector_similarity_weight: f64,
}

#[derive(Debug, Serialize)]
struct RetrievalRequest<'a> {
    question: &'a str,
    dataset_ids: &'a [String],
    top_k: u32,
    page_size: u32,
    similarity_threshold: f64,
    vector_similarity_weight: f64,
}

#[derive(Debug, Deserialize)]
struct RetrievalResponse {
    #[serde(default)]
    code: Option<i64>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    data: Option<RetrievalData>,
}

#[derive(Debug, Deserialize)]
struct RetrievalData {
    #[serde(default)]
    chunks: Option<Vec<RagflowChunk>>,
}

#[derive(Debug, Deserialize)]
struct RagflowChunk {
    #[serde(default)]
    id: String,
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    content_with_weight: Option<String>,
    #[serde(default)]
    document_keyword: Option<String>,
    #[serde(default)]
    document_id: Option<String>,
    #[serde(default)]
    dataset_id: Option<String>,
    #[serde(default)]
    similarity: Option<f64>,
    #[serde(default)]
    vector_similarity: Option<f64>,
}

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    query: &'a str,
    context: String,
    top_k: u32,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    answer: Option<String>,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.is_empty())
}

fn non_zero(value: Option<f64>) -> Option<f64> {
    value.filter(|v| *v != 0.0)
}

impl RagflowChunk {
    fn into_result(self) -> SearchResult {
        let similarity = non_zero(self.similarity).or(non_zero(self.vector_similarity));

        let mut metadata = Metadata::new();
        metadata.insert(
            "source".into(),
            Value::from(non_empty(self.document_keyword).unwrap_or_else(|| "unknown".into())),
        );
        if let Some(document_id) = self.document_id {
            metadata.insert("document_id".into(), Value::from(document_id));
        }
        if let Some(dataset_id) = self.dataset_id {
            metadata.insert("dataset_id".into(), Value::from(dataset_id));
        }
        if let Some(similarity) = similarity {
            metadata.insert("similarity".into(), Value::from(similarity));
        }
        metadata.insert("type".into(), Value::from("documentation"));

        SearchResult {
            id: self.id,
            content: non_empty(self.content)
                .or(non_empty(self.content_with_weight))
                .unwrap_or_default(),
            metadata,
            score: Some(similarity.unwrap_or(0.0)),
        }
    }
}

/// Accept either a bare chunk or a `{code, data: chunk}` envelope
fn parse_chunk(body: Value) -> Result<ChunkResult, ProviderError> {
    let candidate = match body.get("data") {
        Some(data) if data.is_object() => data.clone(),
        _ => body,
    };
    Ok(serde_json::from_value(candidate)?)
}

async fn error_text(response: reqwest::Response) -> String {
    response
        .text()
        .await
        .unwrap_or_else(|_| "Unknown error".to_string())
}

impl RagflowProvider {
    /// Create a provider from its configuration section
    pub fn new(config: &RagflowConfig, timeout: Duration) -> Result<Self, ProviderError> {
        url::Url::parse(&config.url)
            .map_err(|e| ProviderError::Config(format!("invalid RAGFlow URL '{}': {}", config.url, e)))?;

        let http = HttpClient::new(timeout)
            .map_err(|e| ProviderError::Config(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self {
            http,
            base_url: config.url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone().filter(|k| !k.is_empty()),
            dataset_ids: config.dataset_ids.clone(),
            similarity_threshold: config.similarity_threshold,
            vector_similarity_weight: config.vector_similarity_weight,
        })
    }

    fn request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        let builder = self
            .http
            .client()
            .request(method, endpoint(&self.base_url, path))
            .timeout(self.http.timeout());
        with_bearer(builder, self.api_key.as_deref())
    }

    async fn try_search(&self, params: &SearchParams) -> Result<Vec<SearchResult>, ProviderError> {
        let body = RetrievalRequest {
            question: &params.query,
            dataset_ids: &self.dataset_ids,
            top_k: params.k,
            page_size: params.k,
            similarity_threshold: self.similarity_threshold,
            vector_similarity_weight: self.vector_similarity_weight,
        };

        let response = self
            .request(reqwest::Method::POST, "/api/v1/retrieval")
            .json(&body)
            .send()
            .await
            .map_err(|e| ProviderError::from_request(e, SEARCH_TIMEOUT))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ProviderError::Upstream(format!(
                "RAGFlow search failed ({}): {}",
                status.as_u16(),
                error_text(response).await
            )));
        }

        let data: RetrievalResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::from_request(e, SEARCH_TIMEOUT))?;

        match (data.code, data.data.and_then(|d| d.chunks)) {
            (Some(0), Some(chunks)) => Ok(chunks
                .into_iter()
                .take(params.k as usize)
                .map(RagflowChunk::into_result)
                .collect()),
            (code, _) => Err(ProviderError::Parse(format!(
                "unexpected retrieval response (code {:?}): {}",
                code,
                data.message.unwrap_or_default()
            ))),
        }
    }

    async fn try_get_chunk(&self, params: &ChunkParams) -> Result<ChunkResult, ProviderError> {
        let path = format!("/api/v1/chunks/{}", urlencoding::encode(&params.chunk_id));
        let response = self
            .request(reqwest::Method::GET, &path)
            .send()
            .await
            .map_err(|e| ProviderError::from_request(e, CHUNK_TIMEOUT))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ProviderError::Upstream(format!(
                "RAGFlow chunk retrieval failed ({}): {}",
                status.as_u16(),
                error_text(response).await
            )));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| ProviderError::from_request(e, CHUNK_TIMEOUT))?;
        parse_chunk(body)
    }

    async fn try_generate(
        &self,
        params: &SearchParams,
        sources: &[SearchResult],
    ) -> Result<String, ProviderError> {
        let body = GenerateRequest {
            query: &params.query,
            context: sources
                .iter()
                .map(|s| s.content.as_str())
                .collect::<Vec<_>>()
                .join("\n\n"),
            top_k: params.k,
        };

        let response = self
            .request(reqwest::Method::POST, "/api/v1/generate")
            .json(&body)
            .send()
            .await
            .map_err(|e| ProviderError::from_request(e, ANSWER_TIMEOUT))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ProviderError::Upstream(format!(
                "RAGFlow answer generation failed ({}): {}",
                status.as_u16(),
                error_text(response).await
            )));
        }

        let data: GenerateResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::from_request(e, ANSWER_TIMEOUT))?;

        Ok(non_empty(data.answer)
            .unwrap_or_else(|| fallback::answer(self.name(), &params.query, sources)))
    }
}

#[async_trait]
impl DocsProvider for RagflowProvider {
    fn id(&self) -> &str {
        "ragflow"
    }

    fn name(&self) -> &str {
        "RAGFlow"
    }

    fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn search_docs(&self, params: &SearchParams) -> Result<Vec<SearchResult>, ProviderError> {
        validate_search(params)?;
        degrade(self.try_search(params).await, self.name(), "search", || {
            fallback::search_results(self.name(), &params.query, params.k)
        })
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

        let answer = degrade(
            self.try_generate(params, &sources).await,
            self.name(),
            "answer generation",
            || fallback::answer(self.name(), &params.query, &sources),
        )?;

        Ok(DocsAnswer { answer, sources })
    }
}
