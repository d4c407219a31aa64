//! Tool registry for MCP tools.

use std::sync::Arc;

use serde::Serialize;
use serde_json::{json, Value};

use super::handlers::{AnswerWithDocsHandler, GetChunkHandler, SearchDocsHandler};
use crate::models::{DEFAULT_K, MAX_K, MIN_K};
use crate::providers::DocsProvider;

/// An MCP tool that can be called by the client
#[derive(Clone)]
pub struct Tool {
    /// Tool name (e.g., "search_docs")
    pub name: String,

    /// Human-readable description
    pub description: String,

    /// JSON Schema for input parameters
    pub input_schema: Value,

    /// Handler function to execute the tool
    pub handler: Arc<dyn ToolHandler>,
}

impl std::fmt::Debug for Tool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Tool")
            .field("name", &self.name)
            .field("description", &self.description)
            .field("input_schema", &self.input_schema)
            .finish()
    }
}

impl Tool {
    /// Tool description as listed by `tools/list`
    pub fn info(&self) -> Value {
        json!({
            "name": self.name,
            "description": self.description,
            "inputSchema": self.input_schema,
        })
    }

    /// Run the tool; failures are reported as error content, never as JSON-RPC errors
    pub async fn run(&self, args: Value) -> CallToolResult {
        if args.is_null() {
            return CallToolResult::error(format!("Missing arguments for {}", self.name));
        }

        tracing::debug!("Calling tool {}", self.name);
        match self.handler.execute(args).await {
            Ok(text) => CallToolResult::text(text),
            Err(message) => {
                tracing::debug!("Tool {} failed: {}", self.name, message);
                CallToolResult::error(message)
            }
        }
    }
}

/// Handler for executing a tool
#[async_trait::async_trait]
pub trait ToolHandler: Send + Sync + std::fmt::Debug {
    /// Execute the tool with the given arguments, producing display text
    async fn execute(&self, args: Value) -> Result<String, String>;
}

/// One block of tool output
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToolContent {
    #[serde(rename = "type")]
    pub kind: String,
    pub text: String,
}

/// Result of `tools/call`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CallToolResult {
    pub content: Vec<ToolContent>,

    #[serde(rename = "isError", skip_serializing_if = "Option::is_none")]
    pub is_error: Option<bool>,
}

impl CallToolResult {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            content: vec![ToolContent {
                kind: "text".to_string(),
                text: text.into(),
            }],
            is_error: None,
        }
    }

    /// Error content, rendered as `Error: <message>`
    pub fn error(message: impl std::fmt::Display) -> Self {
        Self {
            is_error: Some(true),
            ..Self::text(format!("Error: {}", message))
        }
    }

    pub fn is_error(&self) -> bool {
        self.is_error.unwrap_or(false)
    }

    /// Text of the first content block
    pub fn first_text(&self) -> &str {
        self.content.first().map(|c| c.text.as_str()).unwrap_or("")
    }
}

fn k_schema(description: &str) -> Value {
    json!({
        "type": "number",
        "description": description,
        "minimum": MIN_K,
        "maximum": MAX_K,
        "default": DEFAULT_K
    })
}

/// Registry for all MCP tools, in listing order
#[derive(Debug, Clone)]
pub struct ToolRegistry {
    tools: Vec<Tool>,
}

impl ToolRegistry {
    /// Create an empty registry
    pub fn empty() -> Self {
        Self { tools: Vec::new() }
    }

    /// Create a registry with the documentation tools backed by `provider`
    pub fn new(provider: Arc<dyn DocsProvider>) -> Self {
        let mut registry = Self::empty();

        registry.register(Tool {
            name: "search_docs".to_string(),
            description: "Search through comprehensive documentation database with semantic search and return relevant chunks with citations".to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "query": {
                        "type": "string",
                        "description": "Search query for documentation - be specific about what you're looking for"
                    },
                    "library": {
                        "type": "string",
                        "description": "Filter by specific library/framework name (e.g. \"react\", \"typescript\", \"express\")"
                    },
                    "version": {
                        "type": "string",
                        "description": "Filter by specific version (e.g. \"18.0.0\", \"latest\")"
                    },
                    "k": k_schema("Number of results to return")
                },
                "required": ["query"]
            }),
            handler: Arc::new(SearchDocsHandler {
                provider: provider.clone(),
            }),
        });

        registry.register(Tool {
            name: "get_chunk".to_string(),
            description: "Retrieve a specific documentation chunk by its unique ID for detailed content".to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "chunkId": {
                        "type": "string",
                        "description": "Unique ID of the documentation chunk to retrieve"
                    }
                },
                "required": ["chunkId"]
            }),
            handler: Arc::new(GetChunkHandler {
                provider: provider.clone(),
            }),
        });

        registry.register(Tool {
            name: "answer_with_docs".to_string(),
            description: "Get comprehensive answers to programming questions using the documentation database with source citations".to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "query": {
                        "type": "string",
                        "description": "Your programming question or topic you need help with"
                    },
                    "library": {
                        "type": "string",
                        "description": "Focus on specific library/framework (e.g. \"react\", \"node\", \"python\")"
                    },
                    "version": {
                        "type": "string",
                        "description": "Target specific version if important"
                    },
                    "k": k_schema("Number of documentation sources to use")
                },
                "required": ["query"]
            }),
            handler: Arc::new(AnswerWithDocsHandler { provider }),
        });

        registry
    }

    /// Register a tool, replacing any tool with the same name
    pub fn register(&mut self, tool: Tool) {
        self.tools.retain(|t| t.name != tool.name);
        self.tools.push(tool);
    }

    /// Get a tool by name
    pub fn get(&self, name: &str) -> Option<&Tool> {
        self.tools.iter().find(|t| t.name == name)
    }

    /// Get all tools
    pub fn all(&self) -> &[Tool] {
        &self.tools
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// `tools/list` payload
    pub fn list(&self) -> Value {
        json!({ "tools": self.tools.iter().map(Tool::info).collect::<Vec<_>>() })
    }
}
