//! Core configuration types and loading.

use serde::Deserialize;
use std::path::Path;
use thiserror::Error;

use super::limits::LimitsConfig;
use super::listen::{ListenConfig, TlsConfig, WebSocketConfig};
use super::oper::OperBlock;
use super::security::SecurityConfig;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Server information.
    pub server: ServerConfig,
    /// Plaintext listener.
    pub listen: ListenConfig,
    /// Optional TLS listener.
    pub tls: Option<TlsConfig>,
    /// Optional WebSocket listener.
    pub websocket: Option<WebSocketConfig>,
    /// Operator blocks.
    #[serde(default)]
    pub oper: Vec<OperBlock>,
    /// Flood exemptions.
    #[serde(default)]
    pub security: SecurityConfig,
    /// Flood limiter, queue and connection limits.
    #[serde(default)]
    pub limits: LimitsConfig,
    /// Message of the Day.
    #[serde(default)]
    pub motd: MotdConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }
}

/// Server identity configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Server name (e.g., "irc.straylight.net").
    pub name: String,
    /// Network name (e.g., "Straylight").
    pub network: String,
    /// Server ID (3 characters), used as the UID prefix.
    pub sid: String,
    /// Server description.
    #[serde(default)]
    pub description: String,
    /// Connection password (PASS) required at registration, if set.
    pub password: Option<String>,
    /// Prometheus metrics HTTP port; absent or 0 disables the endpoint.
    pub metrics_port: Option<u16>,
    /// Log output format.
    #[serde(default)]
    pub log_format: LogFormat,
}

/// Log output format for the tracing subscriber.
#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human readable lines.
    #[default]
    Text,
    /// One JSON object per event.
    Json,
}

/// Message of the Day.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MotdConfig {
    /// MOTD lines, sent as RPL_MOTD in order.
    #[serde(default)]
    pub lines: Vec<String>,
}
