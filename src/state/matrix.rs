//! The Matrix - shared server state.
//!
//! Holds everything sessions see of each other: the session table, the
//! nickname index, advertised capabilities, the permission resolver and the
//! event sink. Both tables are `DashMap`s; handlers never lock them across
//! an await.

use super::caps::CapabilityRegistry;
use super::events::{EventSink, SessionEvent};
use super::session::Session;
use super::uid::{Uid, UidGenerator};
use crate::config::Config;
use crate::network::Connection;
use crate::security::{FloodLimiter, PermissionResolver};
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use slirc_wire::irc_to_lower;
use std::sync::Arc;
use tracing::{debug, info};

/// Capacity of the session event channel.
const EVENT_CAPACITY: usize = 1024;

/// Static facts about this server.
#[derive(Debug, Clone)]
pub struct ServerInfo {
    pub name: Arc<str>,
    pub network: String,
    pub sid: String,
    pub description: String,
    pub version: &'static str,
    pub created: DateTime<Utc>,
}

/// The nickname is held by another session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NickInUse;

/// Shared server state.
pub struct Matrix {
    pub config: Config,
    pub server: ServerInfo,
    pub caps: CapabilityRegistry,
    pub events: EventSink,
    pub permissions: Arc<dyn PermissionResolver>,
    sessions: DashMap<Uid, Arc<Session>>,
    /// Casefolded nickname → owner.
    nicks: DashMap<String, Uid>,
    uid_gen: UidGenerator,
}

impl std::fmt::Debug for Matrix {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Matrix")
            .field("server", &self.server.name)
            .field("sessions", &self.sessions.len())
            .finish()
    }
}

impl Matrix {
    pub fn new(config: Config, permissions: Arc<dyn PermissionResolver>) -> Self {
        let server = ServerInfo {
            name: Arc::from(config.server.name.as_str()),
            network: config.server.network.clone(),
            sid: config.server.sid.clone(),
            description: config.server.description.clone(),
            version: concat!("slircd-", env!("CARGO_PKG_VERSION")),
            created: Utc::now(),
        };
        Self {
            uid_gen: UidGenerator::new(config.server.sid.clone()),
            config,
            server,
            caps: CapabilityRegistry::default(),
            events: EventSink::new(EVENT_CAPACITY),
            permissions,
            sessions: DashMap::new(),
            nicks: DashMap::new(),
        }
    }

    /// Create and index a session for a freshly accepted connection.
    pub fn create_session(&self, conn: Arc<Connection>) -> Arc<Session> {
        let addr = conn.peer_addr();
        let limits = &self.config.limits;
        let flood = (!self.config.security.is_flood_exempt(addr.ip())).then(|| {
            FloodLimiter::new(
                limits.flood_burst,
                limits.flood_interval_secs,
                limits.flood_excess_threshold,
            )
        });
        let uid = self.uid_gen.next();
        let session = Arc::new(Session::new(
            uid.clone(),
            conn,
            Arc::clone(&self.server.name),
            flood,
            limits.queue_capacity,
        ));

        self.sessions.insert(uid.clone(), Arc::clone(&session));
        crate::metrics::set_connected_sessions(self.sessions.len());
        info!(%uid, %addr, transport = session.connection().kind().as_str(), "Client connected");
        self.events.publish(SessionEvent::Connected { uid, addr });
        session
    }

    /// Drop a session from every table. Idempotent.
    pub fn remove_session(&self, session: &Session) {
        let uid = session.uid();
        if self.sessions.remove(uid.as_str()).is_none() {
            return;
        }
        let nick = session.nick();
        if let Some(nick) = &nick {
            self.nicks
                .remove_if(&irc_to_lower(nick), |_, owner| owner == uid);
        }
        crate::metrics::set_connected_sessions(self.sessions.len());
        info!(%uid, nick = nick.as_deref().unwrap_or("*"), "Client disconnected");
        self.events.publish(SessionEvent::Disconnected {
            uid: uid.clone(),
            nick,
        });
    }

    pub fn session(&self, uid: &str) -> Option<Arc<Session>> {
        self.sessions.get(uid).map(|s| Arc::clone(s.value()))
    }

    /// Look a session up by nickname (RFC 1459 casemapping).
    pub fn find_nick(&self, nick: &str) -> Option<Arc<Session>> {
        let uid = self.nicks.get(&irc_to_lower(nick))?.value().clone();
        self.session(&uid)
    }

    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }

    /// Give `nick` to `session`, releasing its previous nickname.
    ///
    /// Returns the previous nickname. Changing only the case of one's own
    /// nickname is allowed.
    pub fn claim_nick(&self, session: &Session, nick: &str) -> Result<Option<String>, NickInUse> {
        let uid = session.uid();
        let key = irc_to_lower(nick);
        match self.nicks.entry(key.clone()) {
            Entry::Occupied(entry) if entry.get() != uid => return Err(NickInUse),
            Entry::Occupied(_) => {}
            Entry::Vacant(entry) => {
                entry.insert(uid.clone());
            }
        }

        let old = session.state().nick.replace(nick.to_owned());
        if let Some(old_nick) = &old {
            let old_key = irc_to_lower(old_nick);
            if old_key != key {
                self.nicks.remove_if(&old_key, |_, owner| owner == uid);
            }
        }
        debug!(%uid, old = old.as_deref().unwrap_or("*"), new = %nick, "nick claimed");
        self.events.publish(SessionEvent::NickChanged {
            uid: uid.clone(),
            old: old.clone(),
            new: nick.to_owned(),
        });
        Ok(old)
    }

    /// Snapshot of every live session.
    pub fn all_sessions(&self) -> Vec<Arc<Session>> {
        self.sessions.iter().map(|s| Arc::clone(s.value())).collect()
    }

    /// Close every session with the same reason.
    pub fn close_all(&self, reason: &str) {
        for session in self.all_sessions() {
            session.close(reason);
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::network::{BufferPool, ConnectionId, TransportKind};
    use crate::security::OperPermissions;
    use tokio::sync::mpsc;

    pub(crate) fn test_config() -> Config {
        toml::from_str(
            r#"
[server]
name = "irc.test"
network = "TestNet"
sid = "001"

[listen]
address = "127.0.0.1:0"
"#,
        )
        .unwrap()
    }

    pub(crate) fn test_matrix(config: Config) -> Arc<Matrix> {
        let resolver = Arc::new(OperPermissions::new(&config.oper));
        Arc::new(Matrix::new(config, resolver))
    }

    pub(crate) fn connect(matrix: &Matrix, id: u64) -> (Arc<Session>, mpsc::Receiver<Vec<u8>>) {
        let (conn, rx) = Connection::new(
            ConnectionId(id),
            format!("198.51.100.{id}:40000").parse().unwrap(),
            TransportKind::Plain,
            64,
            BufferPool::new(64, 8),
        );
        (matrix.create_session(conn), rx)
    }

    #[test]
    fn test_nick_claim_and_collision() {
        let matrix = test_matrix(test_config());
        let (a, _ra) = connect(&matrix, 1);
        let (b, _rb) = connect(&matrix, 2);
        assert_eq!(matrix.claim_nick(&a, "Alice"), Ok(None));
        assert_eq!(matrix.claim_nick(&b, "alice"), Err(NickInUse));
        assert_eq!(matrix.claim_nick(&b, "ALICE[]"), Ok(None));
        assert_eq!(matrix.claim_nick(&a, "alice{}"), Err(NickInUse));
        assert_eq!(matrix.find_nick("aLiCe").unwrap().uid(), a.uid());
    }

    #[test]
    fn test_nick_change_releases_old() {
        let matrix = test_matrix(test_config());
        let (a, _ra) = connect(&matrix, 1);
        matrix.claim_nick(&a, "one").unwrap();
        assert_eq!(matrix.claim_nick(&a, "two"), Ok(Some("one".into())));
        assert!(matrix.find_nick("one").is_none());
        assert_eq!(matrix.claim_nick(&a, "TWO"), Ok(Some("two".into())));
        assert!(matrix.find_nick("two").is_some());
    }

    #[test]
    fn test_remove_session_frees_nick() {
        let matrix = test_matrix(test_config());
        let (a, _ra) = connect(&matrix, 1);
        matrix.claim_nick(&a, "gone").unwrap();
        assert_eq!(matrix.session_count(), 1);
        matrix.remove_session(&a);
        matrix.remove_session(&a);
        assert_eq!(matrix.session_count(), 0);
        assert!(matrix.find_nick("gone").is_none());
    }

    #[test]
    fn test_flood_exempt_cidr_gets_no_limiter() {
        let mut config = test_config();
        config.security.flood_exempt = vec!["198.51.100.0/24".parse().unwrap()];
        let matrix = test_matrix(config);
        let (a, _ra) = connect(&matrix, 1);
        assert!(a.is_flood_exempt());
    }

    #[tokio::test]
    async fn test_lifecycle_events() {
        let matrix = test_matrix(test_config());
        let mut rx = matrix.events.subscribe();
        let (a, _ra) = connect(&matrix, 3);
        matrix.claim_nick(&a, "ev").unwrap();
        matrix.remove_session(&a);
        assert!(matches!(rx.recv().await.unwrap(), SessionEvent::Connected { .. }));
        assert!(matches!(rx.recv().await.unwrap(), SessionEvent::NickChanged { .. }));
        assert!(matches!(
            rx.recv().await.unwrap(),
            SessionEvent::Disconnected { nick: Some(n), .. } if n == "ev"
        ));
    }
}
