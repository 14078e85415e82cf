//! Integration test common infrastructure.
//!
//! Spawns the `slircd` binary against a throwaway config and drives it
//! with line-oriented test clients.

pub mod client;
pub mod server;

#[allow(unused_imports)]
pub use client::TestClient;
#[allow(unused_imports)]
pub use server::TestServer;
