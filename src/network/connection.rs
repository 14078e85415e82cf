//! Transport-independent connection handle.
//!
//! A [`Connection`] is what the session layer sees of a socket: an identity,
//! a peer address, a liveness flag, a non-blocking `send` and an idempotent
//! `disconnect`. The transport driver that owns the actual stream lives in
//! [`super::transport`] and talks back through [`ConnectionEvents`].

use super::buffer::BufferPool;
use std::fmt;
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Server-unique connection number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(pub u64);

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Which listener a connection arrived on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransportKind {
    Plain,
    Tls,
    WebSocket,
}

impl TransportKind {
    pub fn as_str(self) -> &'static str {
        match self {
            TransportKind::Plain => "plain",
            TransportKind::Tls => "tls",
            TransportKind::WebSocket => "websocket",
        }
    }
}

/// Upcalls from a transport driver to the layer above it.
///
/// For every accepted connection the driver calls `on_connected` once,
/// `on_line` for each framed line, and `on_disconnected` exactly once when
/// the connection is gone. The peer value returned by `on_connected` is
/// moved into `on_disconnected`, so it cannot be reported twice.
pub trait ConnectionEvents: Send + Sync + 'static {
    type Peer: Send + Sync + 'static;

    fn on_connected(&self, conn: &Arc<Connection>) -> Self::Peer;

    /// One line with its terminator removed. The slice borrows the receive
    /// buffer and is only valid for the duration of the call.
    fn on_line(&self, peer: &Self::Peer, line: &[u8]);

    fn on_disconnected(&self, peer: Self::Peer);
}

/// Shared handle to a live (or recently closed) transport connection.
#[derive(Debug)]
pub struct Connection {
    id: ConnectionId,
    peer: SocketAddr,
    kind: TransportKind,
    alive: AtomicBool,
    outbound: mpsc::Sender<Vec<u8>>,
    closed: CancellationToken,
    send_pool: Arc<BufferPool>,
}

impl Connection {
    /// Create a connection handle and the receiving end of its send queue.
    ///
    /// `sendq` is the number of outbound lines that may be waiting for the
    /// socket before the connection is considered stuck.
    pub fn new(
        id: ConnectionId,
        peer: SocketAddr,
        kind: TransportKind,
        sendq: usize,
        send_pool: Arc<BufferPool>,
    ) -> (Arc<Self>, mpsc::Receiver<Vec<u8>>) {
        let (outbound, rx) = mpsc::channel(sendq.max(1));
        let conn = Arc::new(Self {
            id,
            peer,
            kind,
            alive: AtomicBool::new(true),
            outbound,
            closed: CancellationToken::new(),
            send_pool,
        });
        (conn, rx)
    }

    pub fn id(&self) -> ConnectionId {
        self.id
    }

    pub fn peer_addr(&self) -> SocketAddr {
        self.peer
    }

    pub fn kind(&self) -> TransportKind {
        self.kind
    }

    #[inline]
    pub fn is_alive(&self) -> bool {
        self.alive.load(Ordering::Acquire)
    }

    /// Fires once the connection has been asked to close.
    pub fn closed(&self) -> &CancellationToken {
        &self.closed
    }

    /// Queue bytes for the socket without waiting.
    ///
    /// The bytes are copied, so the caller's buffer can be reused at once.
    /// A full send queue or a finished writer tears the connection down.
    /// Returns whether the bytes were queued.
    pub fn send(&self, bytes: &[u8]) -> bool {
        if !self.is_alive() {
            return false;
        }
        let mut buf = self.send_pool.take();
        buf.extend_from_slice(bytes);

        match self.outbound.try_send(buf) {
            Ok(()) => true,
            Err(TrySendError::Full(buf)) => {
                warn!(conn = %self.id, addr = %self.peer, "send queue full, dropping connection");
                crate::metrics::record_sendq_exceeded();
                self.send_pool.give(buf);
                self.disconnect();
                false
            }
            Err(TrySendError::Closed(buf)) => {
                self.send_pool.give(buf);
                self.disconnect();
                false
            }
        }
    }

    /// Ask the driver to close the connection. Safe to call repeatedly.
    pub fn disconnect(&self) {
        if self.alive.swap(false, Ordering::AcqRel) {
            debug!(conn = %self.id, addr = %self.peer, "disconnect requested");
            self.closed.cancel();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn conn(sendq: usize) -> (Arc<Connection>, mpsc::Receiver<Vec<u8>>) {
        Connection::new(
            ConnectionId(7),
            "127.0.0.1:4000".parse().unwrap(),
            TransportKind::Plain,
            sendq,
            BufferPool::new(64, 8),
        )
    }

    #[test]
    fn test_send_copies_bytes() {
        let (conn, mut rx) = conn(4);
        let mut line = b"PING :a\r\n".to_vec();
        assert!(conn.send(&line));
        line.clear();
        assert_eq!(rx.try_recv().unwrap(), b"PING :a\r\n");
    }

    #[test]
    fn test_disconnect_is_idempotent() {
        let (conn, _rx) = conn(4);
        conn.disconnect();
        conn.disconnect();
        assert!(!conn.is_alive());
        assert!(conn.closed().is_cancelled());
        assert!(!conn.send(b"X\r\n"));
    }

    #[test]
    fn test_full_send_queue_disconnects() {
        let (conn, _rx) = conn(1);
        assert!(conn.send(b"A\r\n"));
        assert!(!conn.send(b"B\r\n"));
        assert!(!conn.is_alive());
    }

    #[test]
    fn test_closed_writer_disconnects() {
        let (conn, rx) = conn(4);
        drop(rx);
        assert!(!conn.send(b"A\r\n"));
        assert!(!conn.is_alive());
    }

    #[test]
    fn test_id_display() {
        assert_eq!(ConnectionId(42).to_string(), "#42");
    }
}
