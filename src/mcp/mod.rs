//! MCP (Model Context Protocol) implementation.

pub mod correlator;
mod handlers;
pub mod http;
pub mod protocol;
pub mod server;
pub mod stdio;
mod tools;
pub mod transport;

pub use correlator::{CorrelatorError, RequestCorrelator};
pub use handlers::{render_answer, render_search, search_params};
pub use protocol::{JsonRpcError, JsonRpcMessage, JsonRpcRequest, JsonRpcResponse, RequestId};
pub use server::{McpServer, ServerError};
pub use tools::{CallToolResult, Tool, ToolHandler, ToolRegistry};
pub use transport::CorrelatedTransport;
