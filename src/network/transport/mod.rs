//! Transport drivers.
//!
//! Each driver owns one accepted stream for its whole life:
//!
//! 1. `on_connected` upcall, writer task spawned
//! 2. read loop: bytes land in a pooled [`RecvBuffer`], the framer hands each
//!    line to `on_line`, consumed bytes are compacted away
//! 3. teardown: the receive buffer goes back to the pool, the writer flushes
//!    whatever was already queued and shuts the stream down, then
//!    `on_disconnected` runs exactly once
//!
//! Only the plaintext driver has a synchronous `try_read` fast path.

pub mod plain;
pub mod tls;
pub mod websocket;

use super::buffer::{BufferPool, Overflow, RecvBuffer};
use super::connection::{Connection, ConnectionEvents};
use async_trait::async_trait;
use std::io;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::io::{AsyncWrite, AsyncWriteExt, BufWriter};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::debug;

/// How long one outbound line may take to reach the kernel before the
/// peer is treated as a slow consumer.
const WRITE_TIMEOUT: Duration = Duration::from_secs(5);

/// Why a connection's read side stopped.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("i/o error: {0}")]
    Io(#[from] io::Error),

    #[error("line exceeds receive buffer")]
    Overflow,

    #[error("handshake timed out")]
    HandshakeTimeout,

    #[error("websocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),
}

impl From<Overflow> for TransportError {
    fn from(_: Overflow) -> Self {
        TransportError::Overflow
    }
}

impl TransportError {
    /// Static label for logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Io(_) => "io",
            Self::Overflow => "overflow",
            Self::HandshakeTimeout => "handshake_timeout",
            Self::WebSocket(_) => "websocket",
        }
    }
}

/// Outbound half of a transport as seen by the writer task.
#[async_trait]
pub(crate) trait LineSink: Send {
    /// Write one CRLF-terminated line.
    async fn write_line(&mut self, line: &[u8]) -> Result<(), TransportError>;

    async fn flush(&mut self) -> Result<(), TransportError>;

    async fn shutdown(&mut self);
}

/// Sink for byte streams (plain TCP and TLS).
pub(crate) struct StreamSink<W> {
    inner: BufWriter<W>,
}

impl<W: AsyncWrite + Unpin + Send> StreamSink<W> {
    pub(crate) fn new(writer: W) -> Self {
        Self {
            inner: BufWriter::new(writer),
        }
    }
}

#[async_trait]
impl<W: AsyncWrite + Unpin + Send> LineSink for StreamSink<W> {
    async fn write_line(&mut self, line: &[u8]) -> Result<(), TransportError> {
        self.inner.write_all(line).await?;
        Ok(())
    }

    async fn flush(&mut self) -> Result<(), TransportError> {
        self.inner.flush().await?;
        Ok(())
    }

    async fn shutdown(&mut self) {
        let _ = self.inner.shutdown().await;
    }
}

/// Drain the connection's send queue into `sink`.
///
/// Runs until the connection is closed. Lines that were queued before the
/// close are still written, then the sink is shut down.
pub(crate) async fn write_loop<S: LineSink>(
    mut sink: S,
    mut rx: mpsc::Receiver<Vec<u8>>,
    conn: Arc<Connection>,
    pool: Arc<BufferPool>,
) {
    let mut healthy = true;
    loop {
        let next = tokio::select! {
            biased;
            buf = rx.recv() => buf,
            _ = conn.closed().cancelled() => None,
        };
        let Some(buf) = next else { break };

        let written = tokio::time::timeout(WRITE_TIMEOUT, sink.write_line(&buf)).await;
        pool.give(buf);
        match written {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                debug!(conn = %conn.id(), error = %e, "write failed");
                healthy = false;
                break;
            }
            Err(_) => {
                debug!(conn = %conn.id(), "write timed out");
                healthy = false;
                break;
            }
        }
        if rx.is_empty() && sink.flush().await.is_err() {
            healthy = false;
            break;
        }
    }
    conn.disconnect();

    if healthy {
        let drained = tokio::time::timeout(WRITE_TIMEOUT, async {
            while let Ok(buf) = rx.try_recv() {
                let result = sink.write_line(&buf).await;
                pool.give(buf);
                if result.is_err() {
                    return;
                }
            }
            let _ = sink.flush().await;
        })
        .await;
        if drained.is_err() {
            debug!(conn = %conn.id(), "gave up flushing queued lines");
        }
    }
    rx.close();
    sink.shutdown().await;
}

/// Common teardown once a read loop has returned.
pub(crate) async fn finish<E: ConnectionEvents>(
    events: &E,
    peer: E::Peer,
    conn: &Connection,
    recv: RecvBuffer,
    writer: JoinHandle<()>,
    result: Result<(), TransportError>,
) {
    match &result {
        Ok(()) => debug!(conn = %conn.id(), "connection closed"),
        Err(TransportError::Overflow) => {
            debug!(conn = %conn.id(), addr = %conn.peer_addr(), "receive buffer overflow");
            crate::metrics::record_transport_error(TransportError::Overflow.kind());
        }
        Err(e) => {
            debug!(conn = %conn.id(), error = %e, "connection error");
            crate::metrics::record_transport_error(e.kind());
        }
    }
    conn.disconnect();
    drop(recv);
    let _ = writer.await;
    events.on_disconnected(peer);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::connection::{ConnectionId, TransportKind};
    use tokio::io::AsyncReadExt;

    #[tokio::test]
    async fn test_writer_flushes_queued_lines_after_disconnect() {
        let pool = BufferPool::new(64, 8);
        let (conn, rx) = Connection::new(
            ConnectionId(1),
            "127.0.0.1:1".parse().unwrap(),
            TransportKind::Plain,
            16,
            Arc::clone(&pool),
        );
        let (client, server) = tokio::io::duplex(4096);

        conn.send(b"ERROR :bye\r\n");
        conn.disconnect();
        write_loop(StreamSink::new(server), rx, Arc::clone(&conn), pool).await;

        let mut received = Vec::new();
        let mut client = client;
        client.read_to_end(&mut received).await.unwrap();
        assert_eq!(received, b"ERROR :bye\r\n");
    }

    #[tokio::test]
    async fn test_writer_preserves_order() {
        let pool = BufferPool::new(64, 8);
        let (conn, rx) = Connection::new(
            ConnectionId(2),
            "127.0.0.1:1".parse().unwrap(),
            TransportKind::Plain,
            16,
            Arc::clone(&pool),
        );
        let (mut client, server) = tokio::io::duplex(4096);
        let writer = tokio::spawn(write_loop(StreamSink::new(server), rx, Arc::clone(&conn), pool));

        for i in 0..5 {
            conn.send(format!("PING :{i}\r\n").as_bytes());
        }
        let mut buf = vec![0u8; 5 * 9];
        client.read_exact(&mut buf).await.unwrap();
        assert_eq!(buf, b"PING :0\r\nPING :1\r\nPING :2\r\nPING :3\r\nPING :4\r\n");

        conn.disconnect();
        writer.await.unwrap();
    }
}
