//! Configuration loading and management.
//!
//! - [`types`]: top-level `Config`, server identity, MOTD
//! - [`listen`]: plaintext, TLS and WebSocket listeners
//! - [`limits`]: flood limiter, queue and connection caps
//! - [`security`]: flood-exempt networks
//! - [`oper`]: operator blocks
//! - [`validation`]: startup sanity checks

mod limits;
mod listen;
mod oper;
mod security;
mod types;
pub mod validation;

pub use limits::LimitsConfig;
pub use listen::{ListenConfig, TlsConfig, WebSocketConfig};
pub use oper::{OperBlock, OperPermission};
pub use security::SecurityConfig;
pub use types::{Config, ConfigError, LogFormat, MotdConfig, ServerConfig};
