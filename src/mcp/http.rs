//! Hosted HTTP transport.
//!
//! `POST /mcp` accepts one JSON-RPC 2.0 object per request. `initialize` is
//! answered directly; every other request goes through the
//! [`RequestCorrelator`] to the pmcp server and the matching response is
//! returned as the HTTP body.

use std::sync::Arc;
use std::time::Instant;

use axum::{
    body::Bytes,
    extract::{DefaultBodyLimit, State},
    http::{header, HeaderValue, Method, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use serde_json::{json, Value};
use tower_http::{cors::CorsLayer, limit::RequestBodyLimitLayer, trace::TraceLayer};

use super::correlator::{CorrelatorError, RequestCorrelator};
use super::protocol::{
    JsonRpcError, JsonRpcRequest, JsonRpcResponse, RequestId, JSONRPC_VERSION, PROTOCOL_VERSION,
};
use super::server::HOSTED_SERVER_NAME;
use crate::config::Environment;
use crate::providers::DocsProvider;

/// Largest accepted request body
pub const MAX_BODY_BYTES: usize = 10 * 1024 * 1024;

/// Origins allowed to call the server in production
pub const ALLOWED_ORIGINS: [&str; 4] = [
    "https://claude.ai",
    "https://cursor.sh",
    "https://codeium.com",
    "https://windsurf.greptile.com",
];

/// Shared state of the HTTP handlers
#[derive(Debug, Clone)]
pub struct AppState {
    pub correlator: Arc<RequestCorrelator>,
    pub provider: Arc<dyn DocsProvider>,
    pub environment: Environment,
    pub tools_available: usize,
    pub started_at: Instant,
}

/// Build the hosted router
pub fn router(state: AppState) -> Router {
    let cors = cors_layer(state.environment);

    Router::new()
        .route("/mcp", post(mcp_handler))
        .route("/health", get(health_handler))
        .route("/stats", get(stats_handler))
        .route("/test", get(test_handler))
        .with_state(state)
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

fn cors_layer(environment: Environment) -> CorsLayer {
    if !environment.is_production() {
        return CorsLayer::permissive();
    }

    let origins: Vec<HeaderValue> = ALLOWED_ORIGINS
        .iter()
        .map(|origin| HeaderValue::from_static(*origin))
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
        .allow_credentials(true)
}

fn rpc_error(status: StatusCode, id: Option<RequestId>, error: JsonRpcError) -> Response {
    (status, Json(JsonRpcResponse::error(id, error))).into_response()
}

/// Echo the caller's id when it is a valid identifier
fn echoed_id(body: &Value) -> Option<RequestId> {
    body.get("id")
        .and_then(|id| serde_json::from_value(id.clone()).ok())
}

async fn mcp_handler(State(state): State<AppState>, body: Bytes) -> Response {
    let body: Value = match serde_json::from_slice(&body) {
        Ok(body) => body,
        Err(e) => {
            tracing::debug!("Unparseable MCP body: {}", e);
            return rpc_error(StatusCode::BAD_REQUEST, None, JsonRpcError::parse_error());
        }
    };

    let id = echoed_id(&body);
    if body.get("jsonrpc").and_then(Value::as_str) != Some(JSONRPC_VERSION) {
        return rpc_error(
            StatusCode::BAD_REQUEST,
            id,
            JsonRpcError::invalid_request("Invalid Request: JSON-RPC version must be 2.0"),
        );
    }

    let request: JsonRpcRequest = match serde_json::from_value(body) {
        Ok(request) => request,
        Err(e) => {
            return rpc_error(
                StatusCode::BAD_REQUEST,
                id,
                JsonRpcError::invalid_request(format!("Invalid Request: {}", e)),
            );
        }
    };

    if request.method == "initialize" {
        let result = json!({
            "protocolVersion": PROTOCOL_VERSION,
            "capabilities": {},
            "serverInfo": {
                "name": HOSTED_SERVER_NAME,
                "version": crate::VERSION,
            }
        });
        return Json(JsonRpcResponse::success(request.id, result)).into_response();
    }

    if request.is_notification() {
        return match state.correlator.notify(request).await {
            Ok(()) => StatusCode::ACCEPTED.into_response(),
            Err(err) => internal_error(&state, None, &err),
        };
    }

    match state.correlator.submit(request).await {
        Ok(response) => Json(response).into_response(),
        Err(err @ CorrelatorError::DuplicateIdentifier(_)) => rpc_error(
            StatusCode::BAD_REQUEST,
            id,
            JsonRpcError::invalid_request(format!("Invalid Request: {}", err)),
        ),
        Err(err) => internal_error(&state, id, &err),
    }
}

fn internal_error(state: &AppState, id: Option<RequestId>, err: &CorrelatorError) -> Response {
    tracing::error!("Error handling MCP request: {}", err);
    let mut error = JsonRpcError::internal_error();
    if !state.environment.is_production() {
        error = error.with_data(Value::from(err.to_string()));
    }
    rpc_error(StatusCode::INTERNAL_SERVER_ERROR, id, error)
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    timestamp: String,
    service: &'static str,
    version: &'static str,
}

async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        timestamp: chrono::Utc::now().to_rfc3339(),
        service: "docsyte-mcp-server",
        version: crate::VERSION,
    })
}

#[derive(Debug, Serialize)]
struct StatsResponse {
    uptime_seconds: f64,
    pending_requests: usize,
    provider: String,
    provider_url: String,
    environment: String,
    tools_available: usize,
}

async fn stats_handler(State(state): State<AppState>) -> Json<StatsResponse> {
    Json(StatsResponse {
        uptime_seconds: state.started_at.elapsed().as_secs_f64(),
        pending_requests: state.correlator.pending_count(),
        provider: state.provider.id().to_string(),
        provider_url: state.provider.base_url().to_string(),
        environment: state.environment.to_string(),
        tools_available: state.tools_available,
    })
}

async fn test_handler() -> Json<Value> {
    Json(json!({
        "message": "Docsyte MCP Server is running",
        "endpoints": {
            "health": "/health",
            "stats": "/stats",
            "mcp": "/mcp (POST)",
            "test": "/test"
        },
        "usage": {
            "mcp_endpoint": "POST /mcp with JSON-RPC 2.0 format",
            "example_requests": [
                {
                    "description": "Initialize connection",
                    "request": {
                        "jsonrpc": "2.0",
                        "id": 1,
                        "method": "initialize",
                        "params": {
                            "protocolVersion": PROTOCOL_VERSION,
                            "capabilities": {},
                            "clientInfo": { "name": "test-client", "version": "1.0.0" }
                        }
                    }
                },
                {
                    "description": "List available tools",
                    "request": { "jsonrpc": "2.0", "id": 2, "method": "tools/list" }
                },
                {
                    "description": "Search documentation",
                    "request": {
                        "jsonrpc": "2.0",
                        "id": 3,
                        "method": "tools/call",
                        "params": {
                            "name": "search_docs",
                            "arguments": { "query": "how to use React hooks", "k": 5 }
                        }
                    }
                }
            ]
        }
    }))
}
