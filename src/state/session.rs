//! Per-client session.
//!
//! A session binds one [`Connection`] to protocol state: registration stage,
//! identity, negotiated capabilities, the optional flood limiter, the cached
//! permission bitmask and the serialized command queue. Handlers only ever
//! run on the session's queue, so the mutex around [`SessionState`] is never
//! contended by two handlers at once.

use super::machine::{Stage, StageCell};
use super::queue::CommandQueue;
use super::uid::Uid;
use crate::network::Connection;
use crate::security::{FloodLimiter, FloodVerdict, Permissions};
use chrono::{DateTime, TimeZone, Utc};
use parking_lot::{Mutex, MutexGuard};
use slirc_wire::{LineBuilder, Message, Numeric, Tag};
use std::cell::RefCell;
use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicI64, AtomicU32, Ordering};
use tracing::debug;

thread_local! {
    static BUILDER: RefCell<LineBuilder> = RefCell::new(LineBuilder::new());
}

/// Encode with this thread's scratch builder.
fn with_builder<R>(f: impl FnOnce(&mut LineBuilder) -> R) -> R {
    BUILDER.with(|b| f(&mut b.borrow_mut()))
}

/// Mutable protocol state guarded by the session mutex.
#[derive(Debug, Default)]
pub struct SessionState {
    pub nick: Option<String>,
    pub user: Option<String>,
    pub realname: Option<String>,
    /// Capabilities acknowledged with `CAP REQ`.
    pub caps: HashSet<String>,
    /// `CAP LS` or `CAP REQ` seen and `CAP END` not yet.
    pub cap_negotiating: bool,
    pub cap_version: u32,
    /// Password from PASS, checked when registration completes.
    pub password: Option<String>,
    /// Name of the `[[oper]]` block used, once opered.
    pub oper_name: Option<String>,
}

/// One connected client.
#[derive(Debug)]
pub struct Session {
    uid: Uid,
    conn: Arc<Connection>,
    host: String,
    server_name: Arc<str>,
    stage: StageCell,
    state: Mutex<SessionState>,
    permissions: AtomicU32,
    flood: Option<Mutex<FloodLimiter>>,
    queue: CommandQueue,
    last_activity: AtomicI64,
    connected_at: DateTime<Utc>,
}

impl Session {
    /// Create a session in the Connecting stage.
    ///
    /// `flood` is `None` for peers that are exempt from flood control.
    pub fn new(
        uid: Uid,
        conn: Arc<Connection>,
        server_name: Arc<str>,
        flood: Option<FloodLimiter>,
        queue_capacity: usize,
    ) -> Self {
        let now = Utc::now();
        Self {
            uid,
            host: conn.peer_addr().ip().to_string(),
            conn,
            server_name,
            stage: StageCell::default(),
            state: Mutex::new(SessionState::default()),
            permissions: AtomicU32::new(Permissions::empty().bits()),
            flood: flood.map(Mutex::new),
            queue: CommandQueue::new(queue_capacity),
            last_activity: AtomicI64::new(now.timestamp_millis()),
            connected_at: now,
        }
    }

    pub fn uid(&self) -> &Uid {
        &self.uid
    }

    pub fn connection(&self) -> &Arc<Connection> {
        &self.conn
    }

    /// Hostname shown to other users (the peer IP).
    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn server_name(&self) -> &str {
        &self.server_name
    }

    #[inline]
    pub fn stage(&self) -> Stage {
        self.stage.get()
    }

    pub fn stage_cell(&self) -> &StageCell {
        &self.stage
    }

    pub fn is_closing(&self) -> bool {
        self.stage() == Stage::Disconnecting || !self.conn.is_alive()
    }

    pub fn queue(&self) -> &CommandQueue {
        &self.queue
    }

    /// Lock the protocol state. Never hold the guard across an await.
    pub fn state(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock()
    }

    pub fn nick(&self) -> Option<String> {
        self.state.lock().nick.clone()
    }

    /// Nickname, or `*` before one is set; the target of numeric replies.
    pub fn nick_or_star(&self) -> String {
        self.nick().unwrap_or_else(|| "*".to_owned())
    }

    /// `nick!user@host` for messages this session originates.
    pub fn prefix(&self) -> String {
        let state = self.state.lock();
        format!(
            "{}!{}@{}",
            state.nick.as_deref().unwrap_or("*"),
            state.user.as_deref().unwrap_or("*"),
            self.host
        )
    }

    pub fn has_cap(&self, cap: &str) -> bool {
        self.state.lock().caps.contains(cap)
    }

    pub fn permissions(&self) -> Permissions {
        Permissions::from_bits_truncate(self.permissions.load(Ordering::Acquire))
    }

    pub fn set_permissions(&self, perms: Permissions) {
        self.permissions.store(perms.bits(), Ordering::Release);
    }

    pub fn grant(&self, perms: Permissions) {
        self.permissions.fetch_or(perms.bits(), Ordering::AcqRel);
    }

    /// Whether any flood limiting applies to this session right now.
    pub fn is_flood_exempt(&self) -> bool {
        self.flood.is_none() || self.permissions().contains(Permissions::FLOOD_EXEMPT)
    }

    /// Charge `cost` tokens against the flood limiter.
    pub fn check_flood(&self, cost: u32) -> FloodVerdict {
        if cost == 0 || self.permissions().contains(Permissions::FLOOD_EXEMPT) {
            return FloodVerdict::Allowed;
        }
        match &self.flood {
            Some(limiter) => limiter.lock().try_consume(cost),
            None => FloodVerdict::Allowed,
        }
    }

    /// Record that a command was accepted.
    pub fn touch(&self) {
        self.last_activity
            .store(Utc::now().timestamp_millis(), Ordering::Relaxed);
    }

    pub fn last_activity(&self) -> DateTime<Utc> {
        let millis = self.last_activity.load(Ordering::Relaxed);
        Utc.timestamp_millis_opt(millis)
            .single()
            .unwrap_or(self.connected_at)
    }

    pub fn connected_at(&self) -> DateTime<Utc> {
        self.connected_at
    }

    /// Send a message as-is.
    pub fn send_line(&self, msg: &Message) -> bool {
        with_builder(|b| self.conn.send(msg.encode(b)))
    }

    /// Send a message with extra tags appended to its own.
    pub fn send_with_tags(&self, msg: &Message, tags: &[Tag]) -> bool {
        if tags.is_empty() {
            return self.send_line(msg);
        }
        let mut all = msg.tags.clone().unwrap_or_default();
        all.extend_from_slice(tags);
        with_builder(|b| {
            let line = b.line(&all, msg.prefix.as_deref(), &msg.command, msg.params.as_slice());
            self.conn.send(line)
        })
    }

    /// `:server NNN <nick|*> params...`
    pub fn send_numeric(&self, numeric: Numeric, params: &[&str]) -> bool {
        let target = self.nick_or_star();
        with_builder(|b| {
            let line = b.numeric(&self.server_name, numeric.code(), &target, params);
            self.conn.send(line)
        })
    }

    /// `ERROR :<reason>`
    pub fn send_error(&self, reason: &str) -> bool {
        self.send_line(&Message::error(reason))
    }

    /// Send `ERROR :Closing Link: <host> (<reason>)` and disconnect.
    pub fn close(&self, reason: &str) {
        let prev = self.stage.advance(Stage::Disconnecting);
        if prev == Stage::Disconnecting {
            return;
        }
        debug!(uid = %self.uid, %reason, "closing session");
        self.send_error(&format!("Closing Link: {} ({})", self.host, reason));
        self.conn.disconnect();
    }

    /// Mark the session gone after the transport closed underneath it.
    pub fn mark_disconnected(&self) {
        self.stage.advance(Stage::Disconnecting);
        self.queue.close();
    }
}
