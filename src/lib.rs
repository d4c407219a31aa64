//! # Docsyte MCP
//!
//! A Model Context Protocol (MCP) server exposing documentation search,
//! chunk lookup and question answering backed by a remote RAG service.
//!
//! ## Architecture
//!
//! - [`models`]: Tool parameters and retrieval results
//! - [`providers`]: RAG backends (RAGFlow, LlamaCloud) with fallback content
//! - [`mcp`]: JSON-RPC envelopes, request correlator, pmcp server and transports
//! - [`utils`]: HTTP client and text helpers
//! - [`config`]: Configuration management

pub mod config;
pub mod mcp;
pub mod models;
pub mod providers;
pub mod utils;

// Re-export commonly used types
pub use mcp::McpServer;
pub use models::{ChunkParams, SearchParams, SearchResult};
pub use providers::{create_provider, DocsProvider, ProviderError};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
