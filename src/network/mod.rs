//! Network layer.
//!
//! Contains the Gateway (listeners and connection caps), the transport
//! independent [`Connection`] handle and one driver per transport kind.

pub mod buffer;
pub mod connection;
pub mod gateway;
pub mod transport;

pub use buffer::{BufferPool, RecvBuffer};
pub use connection::{Connection, ConnectionEvents, ConnectionId, TransportKind};
pub use gateway::Gateway;
pub use transport::TransportError;
pub use transport::tls::{CertificateProvider, PemCertificates};
