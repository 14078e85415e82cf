//! Abuse resistance and privileges.
//!
//! - **Flood limiter**: per-session token bucket with debt tracking
//! - **Connection limits**: governor-based per-IP connection rate plus
//!   concurrency caps, applied by the gateway
//! - **Permissions**: bitflags cached on each session and resolved from
//!   `[[oper]]` blocks

pub mod conn_limit;
pub mod flood;
pub mod permissions;

pub use conn_limit::{ConnectionLimiter, ConnectionPermit, Rejection};
pub use flood::{FloodLimiter, FloodVerdict};
pub use permissions::{OperPermissions, PermissionResolver, Permissions};
