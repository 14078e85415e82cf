//! TLS driver and certificate loading.
//!
//! The handshake runs under a timeout; a peer that fails or stalls it is
//! dropped before any upcall happens. After the handshake the stream is
//! split: reads stay in this task, writes go through the connection's
//! single writer task.

use super::{StreamSink, TransportError, finish, write_loop};
use crate::network::buffer::{BufferPool, RecvBuffer};
use crate::network::connection::{Connection, ConnectionEvents};
use parking_lot::RwLock;
use rustls_pemfile::{certs, private_key};
use std::io::{self, BufReader, Cursor};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_rustls::TlsAcceptor;
use tokio_rustls::rustls::ServerConfig;
use tokio_rustls::rustls::pki_types::{CertificateDer, PrivateKeyDer};
use tracing::{debug, info};

/// Certificate loading failures.
#[derive(Debug, Error)]
pub enum CertError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("no certificates found in {0}")]
    NoCertificates(PathBuf),
    #[error("no private key found in {0}")]
    NoPrivateKey(PathBuf),
    #[error("invalid certificate or key: {0}")]
    Rustls(#[from] tokio_rustls::rustls::Error),
}

/// Source of the server's current TLS identity.
pub trait CertificateProvider: Send + Sync {
    /// Acceptor to use for the next handshake.
    fn acceptor(&self) -> TlsAcceptor;
}

/// Certificate chain and key read from PEM files.
pub struct PemCertificates {
    cert_path: PathBuf,
    key_path: PathBuf,
    current: RwLock<TlsAcceptor>,
}

impl PemCertificates {
    /// Load the chain and key. Accepts PKCS#8, PKCS#1 (RSA) and SEC1 keys.
    pub fn load(cert_path: impl AsRef<Path>, key_path: impl AsRef<Path>) -> Result<Self, CertError> {
        let cert_path = cert_path.as_ref().to_path_buf();
        let key_path = key_path.as_ref().to_path_buf();
        let acceptor = build_acceptor(&cert_path, &key_path)?;
        Ok(Self {
            cert_path,
            key_path,
            current: RwLock::new(acceptor),
        })
    }

    /// Re-read both files. On failure the previous identity stays active.
    pub fn reload(&self) -> Result<(), CertError> {
        let acceptor = build_acceptor(&self.cert_path, &self.key_path)?;
        *self.current.write() = acceptor;
        info!(cert = %self.cert_path.display(), "TLS certificates reloaded");
        Ok(())
    }
}

impl CertificateProvider for PemCertificates {
    fn acceptor(&self) -> TlsAcceptor {
        self.current.read().clone()
    }
}

fn read_file(path: &Path) -> Result<Vec<u8>, CertError> {
    std::fs::read(path).map_err(|source| CertError::Read {
        path: path.to_path_buf(),
        source,
    })
}

fn build_acceptor(cert_path: &Path, key_path: &Path) -> Result<TlsAcceptor, CertError> {
    let cert_pem = read_file(cert_path)?;
    let chain: Vec<CertificateDer<'static>> = certs(&mut BufReader::new(Cursor::new(cert_pem)))
        .collect::<Result<_, _>>()
        .map_err(|source| CertError::Read {
            path: cert_path.to_path_buf(),
            source,
        })?;
    if chain.is_empty() {
        return Err(CertError::NoCertificates(cert_path.to_path_buf()));
    }

    let key_pem = read_file(key_path)?;
    let key: PrivateKeyDer<'static> = private_key(&mut BufReader::new(Cursor::new(key_pem)))
        .map_err(|source| CertError::Read {
            path: key_path.to_path_buf(),
            source,
        })?
        .ok_or_else(|| CertError::NoPrivateKey(key_path.to_path_buf()))?;

    let config = ServerConfig::builder()
        .with_no_client_auth()
        .with_single_cert(chain, key)?;
    Ok(TlsAcceptor::from(Arc::new(config)))
}

/// Run the handshake, then the connection, until it closes.
#[allow(clippy::too_many_arguments)]
pub async fn serve<E: ConnectionEvents>(
    stream: TcpStream,
    acceptor: TlsAcceptor,
    handshake_timeout: Duration,
    conn: Arc<Connection>,
    rx: mpsc::Receiver<Vec<u8>>,
    events: Arc<E>,
    recv_pool: Arc<BufferPool>,
    send_pool: Arc<BufferPool>,
) -> Result<(), TransportError> {
    let tls = match tokio::time::timeout(handshake_timeout, acceptor.accept(stream)).await {
        Ok(Ok(tls)) => tls,
        Ok(Err(e)) => return Err(e.into()),
        Err(_) => return Err(TransportError::HandshakeTimeout),
    };
    debug!(conn = %conn.id(), "TLS handshake complete");

    let (mut read, write) = tokio::io::split(tls);
    let peer = events.on_connected(&conn);
    let writer = tokio::spawn(write_loop(
        StreamSink::new(write),
        rx,
        Arc::clone(&conn),
        send_pool,
    ));

    let mut recv = recv_pool.recv_buffer();
    let result = read_loop(&mut read, &conn, &mut recv, &*events, &peer).await;
    finish(&*events, peer, &conn, recv, writer, result).await;
    Ok(())
}

pub(crate) async fn read_loop<R, E>(
    read: &mut R,
    conn: &Connection,
    recv: &mut RecvBuffer,
    events: &E,
    peer: &E::Peer,
) -> Result<(), TransportError>
where
    R: AsyncRead + Unpin,
    E: ConnectionEvents,
{
    loop {
        let n = tokio::select! {
            biased;
            _ = conn.closed().cancelled() => return Ok(()),
            n = read.read(recv.spare()) => n?,
        };
        if n == 0 {
            return Ok(());
        }
        recv.commit(n);
        recv.drain_lines(|line| events.on_line(peer, line))?;
    }
}
