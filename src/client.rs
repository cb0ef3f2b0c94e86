//! Async TCP client.
//!
//! Sends a request as an array of bulk strings and reads back exactly one
//! reply value. Used by `respkv-cli` and by the loopback tests.

use crate::protocol::{ProtocolError, RespParser, RespValue};
use bytes::BytesMut;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

/// Errors that can occur while talking to a server.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("connection failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    #[error("server disconnected")]
    Disconnected,
}

/// A connection to a server.
#[derive(Debug)]
pub struct Client {
    stream: TcpStream,
    parser: RespParser,
    read_buf: BytesMut,
}

impl Client {
    pub async fn connect(host: &str, port: u16) -> Result<Self, ClientError> {
        let stream = TcpStream::connect((host, port)).await?;
        stream.set_nodelay(true)?;
        Ok(Self {
            stream,
            parser: RespParser::new(),
            read_buf: BytesMut::with_capacity(4096),
        })
    }

    /// Sends one command and waits for its reply.
    ///
    /// An error reply from the server is returned as `Ok(RespValue::Error)`.
    pub async fn send<A: AsRef<[u8]>>(&mut self, args: &[A]) -> Result<RespValue, ClientError> {
        let frame = RespValue::request(args).serialize();
        self.stream.write_all(&frame).await?;
        self.stream.flush().await?;

        self.read_reply().await
    }

    async fn read_reply(&mut self) -> Result<RespValue, ClientError> {
        loop {
            if let Some((value, consumed)) = self.parser.parse(&self.read_buf)? {
                let _ = self.read_buf.split_to(consumed);
                return Ok(value);
            }

            let n = self.stream.read_buf(&mut self.read_buf).await?;
            if n == 0 {
                return Err(ClientError::Disconnected);
            }
        }
    }
}
