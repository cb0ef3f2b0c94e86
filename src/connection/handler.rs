//! Connection Handler
//!
//! Each client gets its own handler task that runs in a loop, reading
//! requests and sending replies.
//!
//! ## Connection Lifecycle
//!
//! ```text
//! 1. Client connects (TCP handshake)
//!        │
//!        ▼
//! 2. ConnectionHandler spawned
//!        │
//!        ▼
//! 3. ┌──────────────────────────────┐
//!    │      Main Loop               │
//!    │                              │
//!    │  ┌─────────────────────────┐ │
//!    │  │ Decode buffered request │◄┼──┐
//!    │  └───────────┬─────────────┘ │  │
//!    │              │ none left     │  │
//!    │              ▼               │  │
//!    │  ┌─────────────────────────┐ │  │
//!    │  │ Read bytes from socket  │─┼──┘
//!    │  └─────────────────────────┘ │
//!    └──────────────────────────────┘
//!        │
//!        ▼
//! 4. Clean EOF → Ok(())
//!    Framing error → one "-ERR Protocol error: ..." reply, then close
//! ```
//!
//! ## Buffer Management
//!
//! A BytesMut buffer accumulates incoming data. TCP is a stream protocol,
//! so a read may carry part of a request or several requests; buffered
//! requests are answered one at a time in arrival order.

use crate::commands::CommandHandler;
use crate::protocol::{ProtocolError, RespParser, RespValue};
use bytes::{Bytes, BytesMut};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufWriter};
use tracing::{debug, info, trace, warn};

/// Largest amount of unparsed data kept for one connection (1 GiB)
const MAX_BUFFER_SIZE: usize = 1024 * 1024 * 1024;

/// Initial buffer capacity
const INITIAL_BUFFER_SIZE: usize = 4096;

/// Statistics for connection handling
#[derive(Debug, Default)]
pub struct ConnectionStats {
    /// Total number of connections accepted
    pub connections_accepted: AtomicU64,
    /// Currently active connections
    pub active_connections: AtomicU64,
    /// Total commands processed
    pub commands_processed: AtomicU64,
    /// Total bytes read
    pub bytes_read: AtomicU64,
    /// Total bytes written
    pub bytes_written: AtomicU64,
}

impl ConnectionStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn connection_opened(&self) {
        self.connections_accepted.fetch_add(1, Ordering::Relaxed);
        self.active_connections.fetch_add(1, Ordering::Relaxed);
    }

    pub fn connection_closed(&self) {
        self.active_connections.fetch_sub(1, Ordering::Relaxed);
    }

    pub fn command_processed(&self) {
        self.commands_processed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn bytes_read(&self, count: usize) {
        self.bytes_read.fetch_add(count as u64, Ordering::Relaxed);
    }

    pub fn bytes_written(&self, count: usize) {
        self.bytes_written
            .fetch_add(count as u64, Ordering::Relaxed);
    }
}

/// Handles a single client connection.
///
/// Generic over the stream so that tests can drive it with an in-memory
/// mock instead of a socket.
pub struct ConnectionHandler<S> {
    stream: BufWriter<S>,

    /// Client's address (for logging)
    addr: SocketAddr,

    /// Buffer for incoming data
    buffer: BytesMut,

    command_handler: CommandHandler,

    parser: RespParser,

    /// Connection statistics (shared)
    stats: Arc<ConnectionStats>,
}

impl<S> ConnectionHandler<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    pub fn new(
        stream: S,
        addr: SocketAddr,
        command_handler: CommandHandler,
        stats: Arc<ConnectionStats>,
    ) -> Self {
        stats.connection_opened();

        Self {
            stream: BufWriter::new(stream),
            addr,
            buffer: BytesMut::with_capacity(INITIAL_BUFFER_SIZE),
            command_handler,
            parser: RespParser::new(),
            stats,
        }
    }

    /// Runs the connection until the client disconnects or an error occurs.
    ///
    /// A framing error is answered with a single protocol error reply before
    /// the connection is closed.
    pub async fn run(mut self) -> Result<(), ConnectionError> {
        info!(client = %self.addr, "Client connected");

        let result = self.main_loop().await;

        match &result {
            Ok(()) => info!(client = %self.addr, "Client disconnected"),
            Err(e) => {
                if let Some(reply) = e.protocol_reply() {
                    warn!(client = %self.addr, error = %e, "Protocol error, closing connection");
                    if let Err(write_err) = self.send_response(&reply).await {
                        debug!(client = %self.addr, error = %write_err, "Could not send protocol error");
                    }
                } else if e.is_reset() {
                    debug!(client = %self.addr, "Connection reset by client");
                } else {
                    warn!(client = %self.addr, error = %e, "Connection error");
                }
            }
        }

        self.stats.connection_closed();
        result
    }

    /// The main read-execute-respond loop.
    async fn main_loop(&mut self) -> Result<(), ConnectionError> {
        loop {
            while let Some(request) = self.try_parse_request()? {
                info!(
                    client = %self.addr,
                    command = %command_name(&request),
                    argc = request.len().saturating_sub(1),
                    "Received command"
                );

                let response = self.command_handler.execute(request);
                self.stats.command_processed();
                self.send_response(&response).await?;
            }

            if !self.read_more_data().await? {
                return Ok(());
            }
        }
    }

    /// Attempts to decode one request from the buffer.
    fn try_parse_request(&mut self) -> Result<Option<Vec<Bytes>>, ConnectionError> {
        if self.buffer.is_empty() {
            return Ok(None);
        }

        match self.parser.parse_request(&self.buffer)? {
            Some((request, consumed)) => {
                let _ = self.buffer.split_to(consumed);
                trace!(
                    client = %self.addr,
                    consumed = consumed,
                    remaining = self.buffer.len(),
                    "Parsed request"
                );
                Ok(Some(request))
            }
            None => {
                trace!(
                    client = %self.addr,
                    buffered = self.buffer.len(),
                    "Incomplete request, need more data"
                );
                Ok(None)
            }
        }
    }

    /// Reads more data into the buffer.
    ///
    /// Returns `false` when the client closed the connection between
    /// requests.
    async fn read_more_data(&mut self) -> Result<bool, ConnectionError> {
        if self.buffer.len() >= MAX_BUFFER_SIZE {
            return Err(ConnectionError::RequestTooLarge {
                max: MAX_BUFFER_SIZE,
            });
        }

        if self.buffer.capacity() - self.buffer.len() < 1024 {
            self.buffer.reserve(4096);
        }

        let n = self.stream.get_mut().read_buf(&mut self.buffer).await?;

        if n == 0 {
            if self.buffer.is_empty() {
                return Ok(false);
            }
            return Err(ConnectionError::UnexpectedEof);
        }

        self.stats.bytes_read(n);
        trace!(client = %self.addr, bytes = n, "Read data");

        Ok(true)
    }

    async fn send_response(&mut self, response: &RespValue) -> Result<(), ConnectionError> {
        let bytes = response.serialize();
        self.stream.write_all(&bytes).await?;
        self.stream.flush().await?;
        self.stats.bytes_written(bytes.len());
        trace!(
            client = %self.addr,
            bytes = bytes.len(),
            "Sent response"
        );
        Ok(())
    }
}

fn command_name(request: &[Bytes]) -> String {
    request
        .first()
        .map(|name| String::from_utf8_lossy(name).into_owned())
        .unwrap_or_default()
}

/// Errors that end a connection.
#[derive(Debug, thiserror::Error)]
pub enum ConnectionError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// The peer closed the connection in the middle of a request
    #[error("unexpected end of stream")]
    UnexpectedEof,

    #[error("request exceeds {max} bytes")]
    RequestTooLarge { max: usize },
}

impl ConnectionError {
    /// The error reply owed to the client, for errors caused by what the
    /// client sent.
    pub fn protocol_reply(&self) -> Option<RespValue> {
        match self {
            ConnectionError::Io(_) => None,
            other => Some(RespValue::error(format!("ERR Protocol error: {}", other))),
        }
    }

    fn is_reset(&self) -> bool {
        matches!(self, ConnectionError::Io(e) if e.kind() == std::io::ErrorKind::ConnectionReset)
    }
}

/// Runs a [`ConnectionHandler`] to completion.
///
/// Errors have already been logged by the handler and are dropped here.
pub async fn handle_connection<S>(
    stream: S,
    addr: SocketAddr,
    command_handler: CommandHandler,
    stats: Arc<ConnectionStats>,
) where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let handler = ConnectionHandler::new(stream, addr, command_handler, stats);
    let _ = handler.run().await;
}
