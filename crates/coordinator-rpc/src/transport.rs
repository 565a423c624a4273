//! Newline-delimited JSON framing over TCP for the coordinator's RPC surface.
//!
//! Framing technique (one JSON value per line, flushed after each write) is
//! the same one the teacher's `StdioTransport` uses over a child process's
//! stdin/stdout; here it runs over a `TcpStream` instead, since the RPC
//! listener is a second independently-bound network service, not a spawned
//! subprocess.

use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};

use crate::protocol::{RpcRequest, RpcResponse};

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("connection error: {0}")]
    Connection(String),
    #[error("request timed out after {0:?}")]
    Timeout(Duration),
}

impl From<TransportError> for coordinator_core::CoordinatorError {
    fn from(err: TransportError) -> Self {
        match err {
            TransportError::Timeout(d) => coordinator_core::CoordinatorError::BackendTimeout {
                elapsed_ms: d.as_millis() as u64,
            },
            other => coordinator_core::CoordinatorError::TransportError {
                message: other.to_string(),
            },
        }
    }
}

/// One frame-oriented connection to a backend's RPC listener.
pub struct FramedConnection {
    reader: BufReader<OwnedReadHalf>,
    writer: OwnedWriteHalf,
}

impl FramedConnection {
    pub async fn connect(addr: &str) -> Result<Self, TransportError> {
        let stream = TcpStream::connect(addr)
            .await
            .map_err(|e| TransportError::Connection(format!("{addr}: {e}")))?;
        let (read_half, write_half) = stream.into_split();
        Ok(Self {
            reader: BufReader::new(read_half),
            writer: write_half,
        })
    }

    pub async fn send(&mut self, request: &RpcRequest) -> Result<(), TransportError> {
        let mut line = serde_json::to_string(request)?;
        line.push('\n');
        self.writer.write_all(line.as_bytes()).await?;
        self.writer.flush().await?;
        Ok(())
    }

    pub async fn recv(&mut self) -> Result<RpcResponse, TransportError> {
        let mut line = String::new();
        let n = self.reader.read_line(&mut line).await?;
        if n == 0 {
            return Err(TransportError::Connection("connection closed".to_string()));
        }
        Ok(serde_json::from_str(&line)?)
    }

    pub async fn call(&mut self, request: &RpcRequest, timeout: Duration) -> Result<RpcResponse, TransportError> {
        tokio::time::timeout(timeout, async {
            self.send(request).await?;
            self.recv().await
        })
        .await
        .map_err(|_| TransportError::Timeout(timeout))?
    }
}
