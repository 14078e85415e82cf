//! Flood exemption configuration.

use ipnet::IpNet;
use serde::Deserialize;
use std::net::IpAddr;

/// Security configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SecurityConfig {
    /// Networks whose sessions get no flood limiter at all (trusted
    /// gateways, bouncers). Connection caps still apply.
    #[serde(default)]
    pub flood_exempt: Vec<IpNet>,
}

impl SecurityConfig {
    /// Whether `ip` falls inside a flood-exempt network.
    pub fn is_flood_exempt(&self, ip: IpAddr) -> bool {
        self.flood_exempt.iter().any(|net| net.contains(&ip))
    }
}
