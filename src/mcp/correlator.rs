//! Request correlator.
//!
//! Matches responses coming back from the MCP server to the request that
//! caused them. Each in-flight request owns one entry in the pending table,
//! keyed by its JSON-RPC id. The entry is registered before the request is
//! forwarded, so a response can never overtake its own registration.
//!
//! Every submission also gets a unique token. A timeout, or a caller that stops
//! waiting, only removes the entry carrying its own token, so a late cleanup
//! never evicts a newer request that reuses the same id.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};

use tokio::sync::{mpsc, oneshot};

use super::protocol::{JsonRpcRequest, JsonRpcResponse, RequestId, ResponsePayload};

/// Errors returned to a waiting submitter
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CorrelatorError {
    #[error("Request has no identifier")]
    MissingIdentifier,

    #[error("Request {0} is already pending")]
    DuplicateIdentifier(RequestId),

    #[error("Request timeout")]
    Timeout,

    /// The MCP server answered with a JSON-RPC error
    #[error("{0}")]
    Remote(String),

    #[error("Correlator closed")]
    Closed,
}

type Outcome = Result<JsonRpcResponse, CorrelatorError>;

struct PendingRequest {
    token: u64,
    sender: oneshot::Sender<Outcome>,
    created_at: Instant,
}

#[derive(Default)]
struct PendingTable {
    entries: HashMap<RequestId, PendingRequest>,
    closed: bool,
}

/// Removes a submission's entry when `submit` returns or is dropped mid-wait
struct PendingGuard<'a> {
    correlator: &'a RequestCorrelator,
    id: RequestId,
    token: u64,
}

impl Drop for PendingGuard<'_> {
    fn drop(&mut self) {
        let mut pending = self.correlator.table();
        if pending
            .entries
            .get(&self.id)
            .is_some_and(|entry| entry.token == self.token)
        {
            pending.entries.remove(&self.id);
            tracing::debug!("Request {} abandoned before its response", self.id);
        }
    }
}

/// Correlates requests forwarded to the MCP server with their responses
pub struct RequestCorrelator {
    pending: Mutex<PendingTable>,
    outbound: mpsc::Sender<JsonRpcRequest>,
    timeout: Duration,
    next_token: AtomicU64,
}

impl std::fmt::Debug for RequestCorrelator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestCorrelator")
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl RequestCorrelator {
    /// Create a correlator forwarding requests on `outbound`
    pub fn new(outbound: mpsc::Sender<JsonRpcRequest>, timeout: Duration) -> Self {
        Self {
            pending: Mutex::new(PendingTable::default()),
            outbound,
            timeout,
            next_token: AtomicU64::new(1),
        }
    }

    fn table(&self) -> MutexGuard<'_, PendingTable> {
        self.pending.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Forward `request` and wait for the response carrying the same id
    pub async fn submit(&self, request: JsonRpcRequest) -> Result<JsonRpcResponse, CorrelatorError> {
        let id = request.id.clone().ok_or(CorrelatorError::MissingIdentifier)?;
        let token = self.next_token.fetch_add(1, Ordering::Relaxed);
        let (sender, receiver) = oneshot::channel();

        {
            let mut pending = self.table();
            if pending.closed {
                return Err(CorrelatorError::Closed);
            }
            if pending.entries.contains_key(&id) {
                return Err(CorrelatorError::DuplicateIdentifier(id));
            }
            pending.entries.insert(
                id.clone(),
                PendingRequest {
                    token,
                    sender,
                    created_at: Instant::now(),
                },
            );
        }
        let _guard = PendingGuard {
            correlator: self,
            id: id.clone(),
            token,
        };

        tracing::debug!("Forwarding request {} ({})", id, request.method);
        if self.outbound.send(request).await.is_err() {
            return Err(CorrelatorError::Closed);
        }

        match tokio::time::timeout(self.timeout, receiver).await {
            Ok(Ok(outcome)) => outcome,
            Ok(Err(_)) => Err(CorrelatorError::Closed),
            Err(_) => {
                tracing::warn!("Request {} timed out after {:?}", id, self.timeout);
                Err(CorrelatorError::Timeout)
            }
        }
    }

    /// Forward a notification; nothing is registered and nothing is awaited
    pub async fn notify(&self, request: JsonRpcRequest) -> Result<(), CorrelatorError> {
        let closed = self.table().closed;
        if closed {
            return Err(CorrelatorError::Closed);
        }
        self.outbound
            .send(request)
            .await
            .map_err(|_| CorrelatorError::Closed)
    }

    /// Resolve the waiter registered under the response's id.
    ///
    /// Returns `false` when nothing was waiting; the response is dropped.
    pub fn deliver(&self, response: JsonRpcResponse) -> bool {
        let Some(id) = response.id.clone() else {
            tracing::debug!("Dropping response without id");
            return false;
        };

        let entry = self.table().entries.remove(&id);
        let Some(entry) = entry else {
            tracing::debug!("Dropping response for unknown request {}", id);
            return false;
        };

        tracing::debug!(
            "Request {} answered in {:?}",
            id,
            entry.created_at.elapsed()
        );

        let remote_error = match &response.payload {
            ResponsePayload::Error(err) if err.message.is_empty() => Some("Unknown error".to_string()),
            ResponsePayload::Error(err) => Some(err.message.clone()),
            ResponsePayload::Result(_) => None,
        };
        let outcome = match remote_error {
            Some(message) => Err(CorrelatorError::Remote(message)),
            None => Ok(response),
        };

        // The waiter may already have given up
        let _ = entry.sender.send(outcome);
        true
    }

    /// Number of requests still waiting for a response
    pub fn pending_count(&self) -> usize {
        self.table().entries.len()
    }

    pub fn is_closed(&self) -> bool {
        self.table().closed
    }

    /// Fail every pending request with `Closed` and refuse new ones
    pub fn close(&self) {
        let drained: Vec<PendingRequest> = {
            let mut pending = self.table();
            pending.closed = true;
            pending.entries.drain().map(|(_, entry)| entry).collect()
        };

        if !drained.is_empty() {
            tracing::info!("Closing correlator with {} pending requests", drained.len());
        }
        for entry in drained {
            let _ = entry.sender.send(Err(CorrelatorError::Closed));
        }
    }
}
