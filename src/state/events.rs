//! Session lifecycle notifications for collaborators outside the core.

use super::uid::Uid;
use std::net::SocketAddr;
use tokio::sync::broadcast;

/// Something that happened to a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    Connected {
        uid: Uid,
        addr: SocketAddr,
    },
    /// Emitted once the session's queue has drained and it left the tables.
    Disconnected {
        uid: Uid,
        nick: Option<String>,
    },
    NickChanged {
        uid: Uid,
        old: Option<String>,
        new: String,
    },
}

/// Fan-out point for [`SessionEvent`]s.
///
/// Publishing never blocks; slow subscribers miss events and see
/// `RecvError::Lagged`.
#[derive(Debug)]
pub struct EventSink {
    tx: broadcast::Sender<SessionEvent>,
}

impl EventSink {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.tx.subscribe()
    }

    pub fn publish(&self, event: SessionEvent) {
        // No subscribers is fine.
        let _ = self.tx.send(event);
    }
}
