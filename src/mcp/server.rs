//! MCP server implementation using pmcp.
//!
//! The documentation tools are registered on a pmcp [`Server`], which runs on
//! the stdio line transport or behind the hosted router's correlator.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use pmcp::{Error, RequestHandlerExtra, Server, ServerCapabilities, ToolHandler, ToolInfo};
use serde_json::Value;

use super::http::{router, AppState};
use super::stdio;
use super::tools::{Tool, ToolRegistry};
use super::transport::CorrelatedTransport;
use crate::config::{Config, Environment};
use crate::providers::DocsProvider;

/// Server name reported over stdio
pub const SERVER_NAME: &str = "docsyte";

/// Server name reported by the hosted endpoint
pub const HOSTED_SERVER_NAME: &str = "docsyte-hosted";

/// Errors raised while starting or running a transport
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("MCP error: {0}")]
    Mcp(#[from] pmcp::Error),
}

/// The Docsyte MCP server
///
/// Serves the documentation tools of one provider over stdio or HTTP.
#[derive(Debug, Clone)]
pub struct McpServer {
    provider: Arc<dyn DocsProvider>,
    tools: ToolRegistry,
    environment: Environment,
    request_timeout: Duration,
}

impl McpServer {
    /// Create a new MCP server for `provider`
    pub fn new(provider: Arc<dyn DocsProvider>, config: &Config) -> Self {
        Self {
            tools: ToolRegistry::new(provider.clone()),
            provider,
            environment: config.server.environment,
            request_timeout: config.server.request_timeout(),
        }
    }

    pub fn tools(&self) -> &ToolRegistry {
        &self.tools
    }

    fn build_server(&self, name: &str) -> Result<Server, Error> {
        let mut builder = Server::builder()
            .name(name)
            .version(env!("CARGO_PKG_VERSION"))
            .capabilities(ServerCapabilities::tools_only());

        for tool in self.tools.all() {
            builder = builder.tool(tool.name.clone(), ToolWrapper { tool: tool.clone() });
        }

        builder.build()
    }

    /// The pmcp server as announced over stdio
    pub fn stdio_server(&self) -> Result<Server, Error> {
        self.build_server(SERVER_NAME)
    }

    /// Run the server in stdio mode (for Claude Desktop and other MCP clients)
    pub async fn run(&self) -> Result<(), ServerError> {
        tracing::info!(
            "Starting MCP server in stdio mode with {} provider",
            self.provider.name()
        );
        let server = self.stdio_server()?;
        stdio::serve(server, tokio::io::stdin(), tokio::io::stdout()).await?;
        tracing::info!("MCP server stopped");
        Ok(())
    }

    /// Build the hosted router state with a fresh correlator.
    ///
    /// A pmcp server is spawned to answer whatever the correlator forwards.
    pub fn http_state(&self) -> Result<AppState, ServerError> {
        let (correlator, transport) =
            CorrelatedTransport::pair(self.request_timeout, HOSTED_SERVER_NAME);
        let server = self.build_server(HOSTED_SERVER_NAME)?;
        tokio::spawn(async move {
            if let Err(e) = server.run(transport).await {
                tracing::debug!("Hosted MCP server stopped: {}", e);
            }
        });

        Ok(AppState {
            correlator,
            provider: self.provider.clone(),
            environment: self.environment,
            tools_available: self.tools.len(),
            started_at: Instant::now(),
        })
    }

    /// Run the server in HTTP mode until Ctrl-C or SIGTERM
    pub async fn run_http(&self, addr: &str) -> Result<(), ServerError> {
        let socket_addr: SocketAddr = addr
            .parse()
            .map_err(|e| ServerError::InvalidAddress(format!("{}: {}", addr, e)))?;

        let state = self.http_state()?;
        let correlator = state.correlator.clone();
        let app = router(state);

        let listener = tokio::net::TcpListener::bind(socket_addr).await?;
        let local = listener.local_addr()?;
        tracing::info!("Docsyte MCP Server running on http://{}", local);
        tracing::info!("Health check: http://{}/health", local);
        tracing::info!("MCP endpoint: http://{}/mcp", local);
        tracing::info!("Environment: {}", self.environment);

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        correlator.close();
        tracing::info!("MCP server stopped");
        Ok(())
    }
}

/// Adapts a [`Tool`] to pmcp's [`ToolHandler`]
#[derive(Debug, Clone)]
struct ToolWrapper {
    tool: Tool,
}

#[async_trait]
impl ToolHandler for ToolWrapper {
    async fn handle(&self, args: Value, _extra: RequestHandlerExtra) -> Result<Value, Error> {
        let result = self.tool.run(args).await;
        serde_json::to_value(result).map_err(|e| Error::internal(&e.to_string()))
    }

    fn metadata(&self) -> Option<ToolInfo> {
        Some(ToolInfo::new(
            self.tool.name.clone(),
            Some(self.tool.description.clone()),
            self.tool.input_schema.clone(),
        ))
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::warn!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    tracing::info!("Shutdown signal received, shutting down gracefully");
}
