//! pmcp transports built on the JSON-RPC envelope types.
//!
//! The MCP server only sees integer request ids. Callers may use any JSON-RPC
//! id, so each request is renumbered on the way in and restored on the way
//! out.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Weak};
use std::time::Duration;

use async_trait::async_trait;
use pmcp::shared::{StdioTransport, Transport, TransportMessage};
use serde_json::{json, Value};
use tokio::sync::mpsc;

use super::correlator::RequestCorrelator;
use super::protocol::{
    JsonRpcError, JsonRpcRequest, JsonRpcResponse, RequestId, JSONRPC_VERSION, PROTOCOL_VERSION,
};

const CHANNEL_CAPACITY: usize = 64;

/// Methods the server answers; anything else is reported as not found
const SERVED_METHODS: [&str; 4] = ["initialize", "ping", "tools/list", "tools/call"];

/// Caller ids keyed by the integer id the MCP server saw
#[derive(Debug, Default)]
pub(crate) struct IdMap {
    last: i64,
    entries: HashMap<i64, RequestId>,
}

impl IdMap {
    fn assign(&mut self, id: RequestId) -> i64 {
        self.last += 1;
        self.entries.insert(self.last, id);
        self.last
    }

    /// The caller's id for a server-side id, forgetting the mapping
    fn restore(&mut self, id: &RequestId) -> Option<RequestId> {
        match id {
            RequestId::Number(n) => n.as_i64().and_then(|n| self.entries.remove(&n)),
            RequestId::String(_) => None,
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Hand a caller's request to the MCP server under a fresh id.
///
/// Requests the server cannot decode are answered here instead. The `Err`
/// side carries that answer, or `None` for a notification.
pub(crate) fn forward(
    ids: &mut IdMap,
    request: JsonRpcRequest,
) -> Result<TransportMessage, Option<JsonRpcResponse>> {
    let JsonRpcRequest {
        id, method, params, ..
    } = request;

    let mut message = json!({ "jsonrpc": JSONRPC_VERSION, "method": method.as_str() });
    if let Some(params) = params {
        message["params"] = params;
    }
    let internal = id.clone().map(|id| ids.assign(id));
    if let Some(internal) = internal {
        message["id"] = Value::from(internal);
    }

    match StdioTransport::parse_message(message.to_string().as_bytes()) {
        Ok(message) => Ok(message),
        Err(e) => {
            if let Some(internal) = internal {
                ids.entries.remove(&internal);
            }
            let Some(id) = id else {
                tracing::debug!("Dropping notification {}: {}", method, e);
                return Err(None);
            };
            let error = if SERVED_METHODS.contains(&method.as_str()) {
                JsonRpcError::invalid_params(format!("Invalid params for {}: {}", method, e))
            } else {
                JsonRpcError::method_not_found(&method)
            };
            Err(Some(JsonRpcResponse::error(Some(id), error)))
        }
    }
}

/// The server's answer under the caller's id, or `None` when nobody asked for it
pub(crate) fn restore(ids: &mut IdMap, message: TransportMessage) -> Option<JsonRpcResponse> {
    let TransportMessage::Response(response) = message else {
        tracing::debug!("Dropping server-initiated message");
        return None;
    };

    let mut response: JsonRpcResponse = match serde_json::to_value(&response)
        .and_then(serde_json::from_value)
    {
        Ok(response) => response,
        Err(e) => {
            tracing::warn!("Unreadable response from MCP server: {}", e);
            return None;
        }
    };

    response.id = response.id.as_ref().and_then(|id| ids.restore(id));
    if response.id.is_none() {
        tracing::debug!("Dropping response nobody is waiting for");
        return None;
    }
    Some(response)
}

/// Transport that serves the requests a [`RequestCorrelator`] forwards
///
/// Responses go back through [`RequestCorrelator::deliver`]. The session is
/// initialized internally, since hosted callers are stateless.
#[derive(Debug)]
pub struct CorrelatedTransport {
    requests: mpsc::Receiver<JsonRpcRequest>,
    correlator: Weak<RequestCorrelator>,
    ids: IdMap,
    handshake: VecDeque<Value>,
    disconnected: bool,
}

impl CorrelatedTransport {
    /// A correlator and the transport serving it, initialized as `client_name`
    pub fn pair(timeout: Duration, client_name: &str) -> (Arc<RequestCorrelator>, Self) {
        let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);
        let correlator = Arc::new(RequestCorrelator::new(tx, timeout));

        // id 0 is never assigned to a caller, so its response is dropped
        let handshake = VecDeque::from([
            json!({
                "jsonrpc": JSONRPC_VERSION,
                "id": 0,
                "method": "initialize",
                "params": {
                    "protocolVersion": PROTOCOL_VERSION,
                    "capabilities": {},
                    "clientInfo": { "name": client_name, "version": crate::VERSION }
                }
            }),
            json!({ "jsonrpc": JSONRPC_VERSION, "method": "notifications/initialized" }),
        ]);

        let transport = Self {
            requests: rx,
            correlator: Arc::downgrade(&correlator),
            ids: IdMap::default(),
            handshake,
            disconnected: false,
        };
        (correlator, transport)
    }

    fn deliver(&self, response: JsonRpcResponse) {
        if let Some(correlator) = self.correlator.upgrade() {
            correlator.deliver(response);
        }
    }
}

#[async_trait]
impl Transport for CorrelatedTransport {
    async fn send(&mut self, message: TransportMessage) -> pmcp::Result<()> {
        if let Some(response) = restore(&mut self.ids, message) {
            self.deliver(response);
        }
        Ok(())
    }

    async fn receive(&mut self) -> pmcp::Result<TransportMessage> {
        while let Some(raw) = self.handshake.pop_front() {
            match StdioTransport::parse_message(raw.to_string().as_bytes()) {
                Ok(message) => return Ok(message),
                Err(e) => tracing::warn!("Skipping handshake message: {}", e),
            }
        }

        loop {
            let Some(request) = self.requests.recv().await else {
                if std::mem::replace(&mut self.disconnected, true) {
                    return std::future::pending().await;
                }
                return Err(pmcp::Error::internal("Request correlator dropped"));
            };

            match forward(&mut self.ids, request) {
                Ok(message) => return Ok(message),
                Err(Some(response)) => self.deliver(response),
                Err(None) => {}
            }
        }
    }

    async fn close(&mut self) -> pmcp::Result<()> {
        self.requests.close();
        Ok(())
    }
}
