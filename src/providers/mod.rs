//! Documentation providers backed by remote RAG services.
//!
//! This module defines the [`DocsProvider`] trait that every backend implements.
//! Two real backends exist: [`RagflowProvider`] (the default) and
//! [`LlamaCloudProvider`]. [`MockProvider`] serves canned data for tests.
//!
//! # Degradation contract
//!
//! Providers never surface transport failures or malformed upstream payloads
//! to their callers. Those are logged and replaced with deterministic
//! placeholder content (see [`fallback`]). Only two kinds of errors propagate:
//!
//! - [`ProviderError::Validation`]: rejected before any network call
//! - [`ProviderError::Timeout`]: the upstream did not answer in time

pub mod fallback;
mod llamacloud;
pub mod mock;
mod ragflow;
mod validate;

pub use llamacloud::LlamaCloudProvider;
pub use mock::MockProvider;
pub use ragflow::RagflowProvider;
pub use validate::{validate_chunk, validate_search};

use std::sync::Arc;

use async_trait::async_trait;

use crate::config::{Config, ProviderKind};
use crate::models::{ChunkParams, ChunkResult, DocsAnswer, SearchParams, SearchResult};

/// Answer returned when a search finds nothing to answer from
pub const NO_DOCS_ANSWER: &str = "No relevant documentation found for your query.";

/// The DocsProvider trait defines the interface for all RAG backends.
#[async_trait]
pub trait DocsProvider: Send + Sync + std::fmt::Debug {
    /// Short identifier (e.g., "ragflow")
    fn id(&self) -> &str;

    /// Human-readable name, also used in placeholder content
    fn name(&self) -> &str;

    /// Base URL of the remote service
    fn base_url(&self) -> &str;

    /// Search for documentation chunks relevant to a query
    async fn search_docs(&self, params: &SearchParams) -> Result<Vec<SearchResult>, ProviderError>;

    /// Fetch a single chunk by identifier
    async fn get_chunk(&self, params: &ChunkParams) -> Result<ChunkResult, ProviderError>;

    /// Search, then generate an answer from the retrieved chunks
    async fn answer_with_docs(&self, params: &SearchParams) -> Result<DocsAnswer, ProviderError>;
}

/// Errors that can occur when talking to a provider
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ProviderError {
    /// Invalid tool arguments, detected before any network call
    #[error("{0}")]
    Validation(String),

    /// The upstream did not answer within the configured window
    #[error("{0}")]
    Timeout(String),

    /// Non-2xx answer from the upstream
    #[error("Upstream error: {0}")]
    Upstream(String),

    /// Connection-level failure
    #[error("Network error: {0}")]
    Network(String),

    /// Upstream body did not have the expected shape
    #[error("Parse error: {0}")]
    Parse(String),

    /// The provider could not be constructed
    #[error("Configuration error: {0}")]
    Config(String),
}

impl ProviderError {
    /// Whether the error is swallowed and replaced with placeholder content
    pub fn is_degradable(&self) -> bool {
        matches!(
            self,
            ProviderError::Upstream(_) | ProviderError::Network(_) | ProviderError::Parse(_)
        )
    }

    /// Classify a reqwest failure, naming the operation in the timeout message
    pub(crate) fn from_request(err: reqwest::Error, timeout_message: &str) -> Self {
        if err.is_timeout() {
            ProviderError::Timeout(timeout_message.to_string())
        } else if err.is_decode() {
            ProviderError::Parse(err.to_string())
        } else {
            ProviderError::Network(err.to_string())
        }
    }
}

impl From<serde_json::Error> for ProviderError {
    fn from(err: serde_json::Error) -> Self {
        ProviderError::Parse(format!("JSON: {}", err))
    }
}

/// Replace degradable failures with `fallback()`, logging the cause
pub(crate) fn degrade<T>(
    result: Result<T, ProviderError>,
    provider: &str,
    operation: &str,
    fallback: impl FnOnce() -> T,
) -> Result<T, ProviderError> {
    match result {
        Err(err) if err.is_degradable() => {
            tracing::warn!("{} {} failed: {}, using fallback", provider, operation, err);
            Ok(fallback())
        }
        other => other,
    }
}

/// Build the provider selected by the configuration
pub fn create_provider(config: &Config) -> Result<Arc<dyn DocsProvider>, ProviderError> {
    let timeout = config.provider.timeout();
    let provider: Arc<dyn DocsProvider> = match config.provider.kind {
        ProviderKind::Ragflow => Arc::new(RagflowProvider::new(&config.ragflow, timeout)?),
        ProviderKind::LlamaCloud => {
            Arc::new(LlamaCloudProvider::new(&config.llamacloud, timeout)?)
        }
    };

    tracing::info!(
        "Initialized {} provider with URL: {}",
        provider.name(),
        provider.base_url()
    );
    Ok(provider)
}
