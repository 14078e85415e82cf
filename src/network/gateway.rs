//! Gateway - listeners that accept incoming connections.
//!
//! The Gateway binds the plaintext listener and, when configured, the TLS
//! and WebSocket listeners. Every accepted socket passes the server-wide
//! connection caps before it gets a [`ConnectionId`] and its own task.

use super::buffer::BufferPool;
use super::connection::{Connection, ConnectionEvents, ConnectionId, TransportKind};
use super::transport::tls::CertificateProvider;
use super::transport::{plain, tls, websocket};
use crate::config::Config;
use crate::security::{ConnectionLimiter, ConnectionPermit};
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

/// Idle buffers kept per pool.
const POOLED_BUFFERS: usize = 1024;
/// Capacity of pooled send buffers; most lines fit without reallocating.
const SEND_BUFFER_HINT: usize = 512;

struct TlsListener {
    listener: TcpListener,
    certs: Arc<dyn CertificateProvider>,
    handshake_timeout: Duration,
}

struct WebSocketListener {
    listener: TcpListener,
    allow_origins: Arc<[String]>,
}

/// State shared by all accept loops.
struct Shared<E> {
    events: Arc<E>,
    limiter: Arc<ConnectionLimiter>,
    recv_pool: Arc<BufferPool>,
    send_pool: Arc<BufferPool>,
    sendq: usize,
    next_id: AtomicU64,
}

impl<E: ConnectionEvents> Shared<E> {
    /// Apply connection caps and create the connection handle.
    fn open(
        &self,
        stream: &TcpStream,
        addr: SocketAddr,
        kind: TransportKind,
    ) -> Option<(ConnectionPermit, Arc<Connection>, tokio::sync::mpsc::Receiver<Vec<u8>>)> {
        let permit = match self.limiter.admit(addr.ip()) {
            Ok(permit) => permit,
            Err(reason) => {
                info!(%addr, transport = kind.as_str(), %reason, "connection rejected");
                crate::metrics::record_connection_rejected(reason.as_str());
                return None;
            }
        };
        if let Err(e) = stream.set_nodelay(true) {
            debug!(%addr, error = %e, "failed to set TCP_NODELAY");
        }
        let id = ConnectionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let (conn, rx) = Connection::new(id, addr, kind, self.sendq, Arc::clone(&self.send_pool));
        debug!(conn = %id, %addr, transport = kind.as_str(), "connection accepted");
        Some((permit, conn, rx))
    }
}

/// The Gateway accepts incoming connections and spawns a driver for each.
pub struct Gateway<E> {
    plain: TcpListener,
    tls: Option<TlsListener>,
    websocket: Option<WebSocketListener>,
    shared: Arc<Shared<E>>,
}

impl<E: ConnectionEvents> Gateway<E> {
    /// Bind every configured listener.
    ///
    /// `certs` must be present when `config.tls` is.
    pub async fn bind(
        config: &Config,
        events: Arc<E>,
        certs: Option<Arc<dyn CertificateProvider>>,
    ) -> io::Result<Self> {
        let plain = TcpListener::bind(config.listen.address).await?;
        info!(address = %plain.local_addr()?, "Plaintext listener bound");

        let tls = match (&config.tls, certs) {
            (Some(tls_cfg), Some(certs)) => {
                let listener = TcpListener::bind(tls_cfg.address).await?;
                info!(address = %listener.local_addr()?, "TLS listener bound");
                Some(TlsListener {
                    listener,
                    certs,
                    handshake_timeout: Duration::from_secs(tls_cfg.handshake_timeout_secs),
                })
            }
            (Some(_), None) => {
                return Err(io::Error::new(
                    io::ErrorKind::InvalidInput,
                    "TLS listener configured without certificates",
                ));
            }
            (None, _) => None,
        };

        let websocket = match &config.websocket {
            Some(ws_cfg) => {
                let listener = TcpListener::bind(ws_cfg.address).await?;
                info!(address = %listener.local_addr()?, "WebSocket listener bound");
                Some(WebSocketListener {
                    listener,
                    allow_origins: ws_cfg.allow_origins.clone().into(),
                })
            }
            None => None,
        };

        let limits = &config.limits;
        Ok(Self {
            plain,
            tls,
            websocket,
            shared: Arc::new(Shared {
                events,
                limiter: Arc::new(ConnectionLimiter::new(limits)),
                recv_pool: BufferPool::for_receive(POOLED_BUFFERS),
                send_pool: BufferPool::new(SEND_BUFFER_HINT, POOLED_BUFFERS),
                sendq: limits.sendq_lines,
                next_id: AtomicU64::new(1),
            }),
        })
    }

    /// Address of the plaintext listener.
    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.plain.local_addr()
    }

    /// Accept connections until `shutdown` fires.
    #[instrument(skip_all, name = "gateway")]
    pub async fn run(self, shutdown: CancellationToken) {
        let mut loops = Vec::new();

        if let Some(tls) = self.tls {
            let shared = Arc::clone(&self.shared);
            let shutdown = shutdown.clone();
            loops.push(tokio::spawn(async move {
                accept_tls(tls, shared, shutdown).await;
            }));
        }
        if let Some(ws) = self.websocket {
            let shared = Arc::clone(&self.shared);
            let shutdown = shutdown.clone();
            loops.push(tokio::spawn(async move {
                accept_websocket(ws, shared, shutdown).await;
            }));
        }

        let cleanup_shared = Arc::clone(&self.shared);
        let cleanup_shutdown = shutdown.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(Duration::from_secs(60));
            loop {
                tokio::select! {
                    _ = cleanup_shutdown.cancelled() => break,
                    _ = ticker.tick() => cleanup_shared.limiter.cleanup(),
                }
            }
        });

        accept_plain(self.plain, self.shared, shutdown).await;
        for handle in loops {
            let _ = handle.await;
        }
        info!("Gateway stopped accepting connections");
    }
}

async fn accept_next(
    listener: &TcpListener,
    shutdown: &CancellationToken,
) -> Option<io::Result<(TcpStream, SocketAddr)>> {
    tokio::select! {
        _ = shutdown.cancelled() => None,
        accepted = listener.accept() => Some(accepted),
    }
}

async fn accept_plain<E: ConnectionEvents>(
    listener: TcpListener,
    shared: Arc<Shared<E>>,
    shutdown: CancellationToken,
) {
    while let Some(accepted) = accept_next(&listener, &shutdown).await {
        let (stream, addr) = match accepted {
            Ok(pair) => pair,
            Err(e) => {
                error!(error = %e, "Failed to accept plaintext connection");
                continue;
            }
        };
        let Some((permit, conn, rx)) = shared.open(&stream, addr, TransportKind::Plain) else {
            continue;
        };
        let shared = Arc::clone(&shared);
        tokio::spawn(async move {
            let _permit = permit;
            plain::serve(
                stream,
                conn,
                rx,
                Arc::clone(&shared.events),
                Arc::clone(&shared.recv_pool),
                Arc::clone(&shared.send_pool),
            )
            .await;
        });
    }
}

async fn accept_tls<E: ConnectionEvents>(
    tls: TlsListener,
    shared: Arc<Shared<E>>,
    shutdown: CancellationToken,
) {
    while let Some(accepted) = accept_next(&tls.listener, &shutdown).await {
        let (stream, addr) = match accepted {
            Ok(pair) => pair,
            Err(e) => {
                error!(error = %e, "Failed to accept TLS connection");
                continue;
            }
        };
        let Some((permit, conn, rx)) = shared.open(&stream, addr, TransportKind::Tls) else {
            continue;
        };
        let acceptor = tls.certs.acceptor();
        let timeout = tls.handshake_timeout;
        let shared = Arc::clone(&shared);
        tokio::spawn(async move {
            let _permit = permit;
            let result = tls::serve(
                stream,
                acceptor,
                timeout,
                conn,
                rx,
                Arc::clone(&shared.events),
                Arc::clone(&shared.recv_pool),
                Arc::clone(&shared.send_pool),
            )
            .await;
            if let Err(e) = result {
                warn!(%addr, error = %e, "TLS handshake failed");
                crate::metrics::record_transport_error(e.kind());
            }
        });
    }
}

async fn accept_websocket<E: ConnectionEvents>(
    ws: WebSocketListener,
    shared: Arc<Shared<E>>,
    shutdown: CancellationToken,
) {
    while let Some(accepted) = accept_next(&ws.listener, &shutdown).await {
        let (stream, addr) = match accepted {
            Ok(pair) => pair,
            Err(e) => {
                error!(error = %e, "Failed to accept WebSocket connection");
                continue;
            }
        };
        let Some((permit, conn, rx)) = shared.open(&stream, addr, TransportKind::WebSocket) else {
            continue;
        };
        let allow_origins = Arc::clone(&ws.allow_origins);
        let shared = Arc::clone(&shared);
        tokio::spawn(async move {
            let _permit = permit;
            let result = websocket::serve(
                stream,
                allow_origins,
                conn,
                rx,
                Arc::clone(&shared.events),
                Arc::clone(&shared.recv_pool),
                Arc::clone(&shared.send_pool),
            )
            .await;
            if let Err(e) = result {
                warn!(%addr, error = %e, "WebSocket handshake failed");
                crate::metrics::record_transport_error(e.kind());
            }
        });
    }
}
