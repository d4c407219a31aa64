//! Integration tests for Docsyte MCP
//!
//! These tests drive the hosted router end to end through the correlator and
//! the pmcp server, and check provider fallback behaviour against unreachable
//! hosts.

use axum::body::Body;
use axum::http::{Request, StatusCode};
use docsyte_mcp::config::Config;
use docsyte_mcp::mcp::http::router;
use docsyte_mcp::mcp::McpServer;
use docsyte_mcp::providers::mock::make_result;
use docsyte_mcp::providers::MockProvider;
use docsyte_mcp::{create_provider, ChunkParams, SearchParams};
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

fn app(provider: Arc<MockProvider>) -> axum::Router {
    let server = McpServer::new(provider, &Config::default());
    router(server.http_state().unwrap())
}

async fn post_mcp(app: axum::Router, body: Value) -> (StatusCode, Value) {
    let request = Request::builder()
        .method("POST")
        .uri("/mcp")
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

#[tokio::test]
async fn test_hosted_initialize() {
    let (status, body) = post_mcp(
        app(Arc::new(MockProvider::new())),
        json!({"jsonrpc": "2.0", "id": 1, "method": "initialize", "params": {}}),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["id"], 1);
    assert_eq!(body["result"]["protocolVersion"], "2024-11-05");
    assert_eq!(body["result"]["serverInfo"]["name"], "docsyte-hosted");
}

#[tokio::test]
async fn test_wrong_jsonrpc_version_is_rejected() {
    let (status, body) = post_mcp(
        app(Arc::new(MockProvider::new())),
        json!({"jsonrpc": "1.0", "id": "a", "method": "tools/list"}),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["id"], "a");
    assert_eq!(body["error"]["code"], -32600);
}

#[tokio::test]
async fn test_tools_list_through_correlator() {
    let (status, body) = post_mcp(
        app(Arc::new(MockProvider::new())),
        json!({"jsonrpc": "2.0", "id": 2, "method": "tools/list"}),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    let names: Vec<&str> = body["result"]["tools"]
        .as_array()
        .unwrap()
        .iter()
        .map(|t| t["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["search_docs", "get_chunk", "answer_with_docs"]);
}

#[tokio::test]
async fn test_search_docs_call_renders_results() {
    let provider = Arc::new(MockProvider::new());
    provider.set_search_results(vec![
        make_result("c1", "useState returns a stateful value", "react", "hooks.md"),
        make_result("c2", "useEffect runs after render", "react", "effects.md"),
    ]);

    let (status, body) = post_mcp(
        app(provider.clone()),
        json!({
            "jsonrpc": "2.0",
            "id": 3,
            "method": "tools/call",
            "params": {
                "name": "search_docs",
                "arguments": {"query": "react hooks", "library": "react", "k": 2}
            }
        }),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    let result = body["result"].to_string();
    assert!(result.contains("c1"));
    assert!(result.contains("hooks.md"));
    assert!(!result.contains("Error:"));
    assert_eq!(provider.search_calls(), 1);
}

#[tokio::test]
async fn test_tool_error_is_reported_in_result() {
    let provider = Arc::new(MockProvider::new());
    let (status, body) = post_mcp(
        app(provider.clone()),
        json!({
            "jsonrpc": "2.0",
            "id": 4,
            "method": "tools/call",
            "params": {"name": "search_docs", "arguments": {"query": "   "}}
        }),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert!(body["result"]
        .to_string()
        .contains("Error: Query cannot be empty"));
    assert_eq!(provider.search_calls(), 1);
}

#[tokio::test]
async fn test_unknown_method_surfaces_as_internal_error() {
    let (status, body) = post_mcp(
        app(Arc::new(MockProvider::new())),
        json!({"jsonrpc": "2.0", "id": 5, "method": "docs/reindex"}),
    )
    .await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["id"], 5);
    assert_eq!(body["error"]["code"], -32603);
}

#[tokio::test]
async fn test_fractional_id_is_echoed() {
    let (status, body) = post_mcp(
        app(Arc::new(MockProvider::new())),
        json!({"jsonrpc": "2.0", "id": 2.5, "method": "ping"}),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["id"], 2.5);
    assert!(body.get("result").is_some());
}

#[tokio::test]
async fn test_notification_is_accepted() {
    let (status, body) = post_mcp(
        app(Arc::new(MockProvider::new())),
        json!({"jsonrpc": "2.0", "method": "notifications/initialized"}),
    )
    .await;

    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(body, Value::Null);
}

#[tokio::test]
async fn test_health_endpoint() {
    let app = app(Arc::new(MockProvider::new()));
    let response = app
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["service"], "docsyte-mcp-server");
}

#[tokio::test]
async fn test_concurrent_calls_are_correlated() {
    let provider = Arc::new(MockProvider::new());
    let app = app(provider.clone());

    let calls = (0..10).map(|i| {
        let app = app.clone();
        async move {
            let (status, body) = post_mcp(
                app,
                json!({"jsonrpc": "2.0", "id": format!("req-{}", i), "method": "tools/list"}),
            )
            .await;
            (i, status, body)
        }
    });

    for (i, status, body) in futures_util::future::join_all(calls).await {
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["id"], format!("req-{}", i));
        assert_eq!(body["result"]["tools"].as_array().unwrap().len(), 3);
    }
}

fn unreachable_ragflow() -> Config {
    let mut config = Config::default();
    config.ragflow.url = "http://127.0.0.1:1".to_string();
    config.provider.timeout_ms = 2_000;
    config
}

#[tokio::test]
async fn test_unreachable_ragflow_degrades_search() {
    let provider = create_provider(&unreachable_ragflow()).unwrap();

    for k in [1, 2, 3, 8] {
        let params = SearchParams::new("tokio runtime").k(k);
        let results = provider.search_docs(&params).await.unwrap();
        assert_eq!(results.len(), k.min(3) as usize);
        assert!(results.iter().all(|r| r.content.contains("tokio runtime")));
    }
}

#[tokio::test]
async fn test_unreachable_ragflow_degrades_chunk_and_answer() {
    let provider = create_provider(&unreachable_ragflow()).unwrap();

    let chunk = provider
        .get_chunk(&ChunkParams::new("chunk-42"))
        .await
        .unwrap();
    assert_eq!(chunk.id, "chunk-42");

    let answer = provider
        .answer_with_docs(&SearchParams::new("what is a runtime"))
        .await
        .unwrap();
    assert!(!answer.answer.is_empty());
}

#[tokio::test]
async fn test_invalid_input_is_not_degraded() {
    let provider = create_provider(&unreachable_ragflow()).unwrap();
    let err = provider
        .search_docs(&SearchParams::new("q").k(51))
        .await
        .unwrap_err();
    assert!(!err.is_degradable());
}
