//! stdio transport: newline-delimited JSON-RPC on stdin/stdout.
//!
//! stdout carries only JSON-RPC messages, one per line. Lines that do not
//! decode, including invalid UTF-8, get a parse error and the session goes on.
//! EOF on stdin ends the server once every in-flight request has been answered.

use async_trait::async_trait;
use pmcp::shared::{Transport, TransportMessage};
use pmcp::Server;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::sync::watch;

use super::protocol::{JsonRpcError, JsonRpcMessage, JsonRpcResponse};
use super::transport::{forward, restore, IdMap};

fn io_error(e: std::io::Error) -> pmcp::Error {
    pmcp::Error::internal(&format!("stdio: {}", e))
}

/// Line-framed transport over any reader/writer pair
pub struct LineTransport<R, W> {
    reader: BufReader<R>,
    writer: W,
    ids: IdMap,
    eof: bool,
    drained: watch::Sender<bool>,
}

impl<R, W> std::fmt::Debug for LineTransport<R, W> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LineTransport")
            .field("in_flight", &self.ids.len())
            .field("eof", &self.eof)
            .finish()
    }
}

impl<R, W> LineTransport<R, W>
where
    R: AsyncRead + Unpin + Send + Sync,
    W: AsyncWrite + Unpin + Send + Sync,
{
    /// The transport, plus a flag that turns true once input has ended and
    /// every request read has been answered
    pub fn new(reader: R, writer: W) -> (Self, watch::Receiver<bool>) {
        let (drained, drained_rx) = watch::channel(false);
        let transport = Self {
            reader: BufReader::new(reader),
            writer,
            ids: IdMap::default(),
            eof: false,
            drained,
        };
        (transport, drained_rx)
    }

    async fn write(&mut self, response: &JsonRpcResponse) -> pmcp::Result<()> {
        let mut line =
            serde_json::to_vec(response).map_err(|e| pmcp::Error::internal(&e.to_string()))?;
        line.push(b'\n');
        self.writer.write_all(&line).await.map_err(io_error)?;
        self.writer.flush().await.map_err(io_error)
    }

    fn check_drained(&self) {
        if self.eof && self.ids.is_empty() {
            self.drained.send_replace(true);
        }
    }
}

#[async_trait]
impl<R, W> Transport for LineTransport<R, W>
where
    R: AsyncRead + Unpin + Send + Sync,
    W: AsyncWrite + Unpin + Send + Sync,
{
    async fn send(&mut self, message: TransportMessage) -> pmcp::Result<()> {
        if let Some(response) = restore(&mut self.ids, message) {
            self.write(&response).await?;
        }
        self.check_drained();
        Ok(())
    }

    async fn receive(&mut self) -> pmcp::Result<TransportMessage> {
        let mut line = Vec::new();
        loop {
            line.clear();
            if self.eof {
                return std::future::pending().await;
            }

            let read = self
                .reader
                .read_until(b'\n', &mut line)
                .await
                .map_err(io_error)?;
            if read == 0 {
                tracing::info!("stdin closed, draining in-flight requests");
                self.eof = true;
                self.check_drained();
                continue;
            }
            if line.iter().all(u8::is_ascii_whitespace) {
                continue;
            }

            match JsonRpcMessage::parse(&line) {
                Ok(JsonRpcMessage::Request(request)) => match forward(&mut self.ids, request) {
                    Ok(message) => return Ok(message),
                    Err(Some(response)) => self.write(&response).await?,
                    Err(None) => {}
                },
                Ok(JsonRpcMessage::Response(response)) => {
                    tracing::debug!("Ignoring response on stdin (id {:?})", response.id);
                }
                Err(e) => {
                    tracing::debug!("Unparseable line on stdin: {}", e);
                    let error = JsonRpcResponse::error(None, JsonRpcError::parse_error());
                    self.write(&error).await?;
                }
            }
        }
    }

    async fn close(&mut self) -> pmcp::Result<()> {
        self.writer.shutdown().await.map_err(io_error)
    }
}

/// Serve `server` on `reader`/`writer` until input ends and is fully answered
pub async fn serve<R, W>(server: Server, reader: R, writer: W) -> pmcp::Result<()>
where
    R: AsyncRead + Unpin + Send + Sync + 'static,
    W: AsyncWrite + Unpin + Send + Sync + 'static,
{
    let (transport, mut drained) = LineTransport::new(reader, writer);
    tokio::select! {
        result = server.run(transport) => result,
        _ = drained.wait_for(|drained| *drained) => Ok(()),
    }
}
