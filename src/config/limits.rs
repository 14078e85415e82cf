//! Flood limiter, queue and connection limits.

use serde::Deserialize;

/// Per-session and server-wide limits.
#[derive(Debug, Clone, Deserialize)]
pub struct LimitsConfig {
    /// Commands a client may burst before throttling (default: 10).
    #[serde(default = "default_flood_burst")]
    pub flood_burst: u32,
    /// Seconds to earn back one command token (default: 1.0).
    #[serde(default = "default_flood_interval")]
    pub flood_interval_secs: f64,
    /// Accumulated throttled cost that disconnects with "Excess Flood" (default: 20).
    #[serde(default = "default_flood_excess_threshold")]
    pub flood_excess_threshold: u32,
    /// Pending commands per session before the oldest is shed (default: 64).
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
    /// Outbound lines queued per connection before it is dropped (default: 1024).
    #[serde(default = "default_sendq_lines")]
    pub sendq_lines: usize,
    /// Maximum concurrent clients (default: 4096).
    #[serde(default = "default_max_clients")]
    pub max_clients: usize,
    /// Maximum concurrent connections from one IP (default: 16).
    #[serde(default = "default_max_connections_per_ip")]
    pub max_connections_per_ip: usize,
    /// New connections per IP allowed in a burst; refills one per second (default: 10).
    #[serde(default = "default_connection_burst_per_ip")]
    pub connection_burst_per_ip: u32,
    /// Maximum nickname length (default: 30).
    #[serde(default = "default_nick_len")]
    pub nick_len: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            flood_burst: default_flood_burst(),
            flood_interval_secs: default_flood_interval(),
            flood_excess_threshold: default_flood_excess_threshold(),
            queue_capacity: default_queue_capacity(),
            sendq_lines: default_sendq_lines(),
            max_clients: default_max_clients(),
            max_connections_per_ip: default_max_connections_per_ip(),
            connection_burst_per_ip: default_connection_burst_per_ip(),
            nick_len: default_nick_len(),
        }
    }
}

fn default_flood_burst() -> u32 {
    10
}

fn default_flood_interval() -> f64 {
    1.0
}

fn default_flood_excess_threshold() -> u32 {
    20
}

fn default_queue_capacity() -> usize {
    64
}

fn default_sendq_lines() -> usize {
    1024
}

fn default_max_clients() -> usize {
    4096
}

fn default_max_connections_per_ip() -> usize {
    16
}

fn default_connection_burst_per_ip() -> u32 {
    10
}

fn default_nick_len() -> usize {
    30
}
