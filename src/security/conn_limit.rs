//! Server-wide connection caps.
//!
//! Checked by the gateway before a connection is handed to a transport
//! driver. Flood-exempt peers and operators are still subject to these.
//!
//! - global maximum number of clients
//! - concurrent connections per IP
//! - new-connection rate per IP (governor token bucket, one per second with
//!   a configurable burst)

use crate::config::LimitsConfig;
use dashmap::DashMap;
use governor::{Quota, RateLimiter as GovRateLimiter};
use std::net::IpAddr;
use std::num::NonZeroU32;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use thiserror::Error;
use tracing::debug;

type DirectRateLimiter = governor::DefaultDirectRateLimiter;

/// Why a connection was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum Rejection {
    #[error("Server is full")]
    ServerFull,
    #[error("Too many connections from your host")]
    TooManyFromHost,
    #[error("Connecting too fast")]
    Throttled,
}

impl Rejection {
    /// Label for metrics.
    pub fn as_str(self) -> &'static str {
        match self {
            Rejection::ServerFull => "server_full",
            Rejection::TooManyFromHost => "per_ip_limit",
            Rejection::Throttled => "rate_limited",
        }
    }
}

/// Tracks live connections and per-IP connection rates.
#[derive(Debug)]
pub struct ConnectionLimiter {
    rates: DashMap<IpAddr, DirectRateLimiter>,
    active: DashMap<IpAddr, usize>,
    total: AtomicUsize,
    max_clients: usize,
    max_per_ip: usize,
    burst: NonZeroU32,
}

/// Held by a live connection; releases its slot on drop.
#[derive(Debug)]
pub struct ConnectionPermit {
    limiter: Arc<ConnectionLimiter>,
    ip: IpAddr,
}

impl ConnectionLimiter {
    /// Create a limiter from the `[limits]` section.
    pub fn new(limits: &LimitsConfig) -> Self {
        Self {
            rates: DashMap::new(),
            active: DashMap::new(),
            total: AtomicUsize::new(0),
            max_clients: limits.max_clients,
            max_per_ip: limits.max_connections_per_ip,
            burst: NonZeroU32::new(limits.connection_burst_per_ip).unwrap_or(NonZeroU32::MIN),
        }
    }

    /// Admit a new connection from `ip`, or say why not.
    pub fn admit(self: &Arc<Self>, ip: IpAddr) -> Result<ConnectionPermit, Rejection> {
        let allowed = self
            .rates
            .entry(ip)
            .or_insert_with(|| {
                GovRateLimiter::direct(Quota::per_second(NonZeroU32::MIN).allow_burst(self.burst))
            })
            .check()
            .is_ok();
        if !allowed {
            debug!(%ip, "connection rate limit exceeded");
            return Err(Rejection::Throttled);
        }

        if self.total.fetch_add(1, Ordering::AcqRel) >= self.max_clients {
            self.total.fetch_sub(1, Ordering::AcqRel);
            return Err(Rejection::ServerFull);
        }

        let mut count = self.active.entry(ip).or_insert(0);
        if *count >= self.max_per_ip {
            drop(count);
            self.total.fetch_sub(1, Ordering::AcqRel);
            debug!(%ip, "per-IP connection limit reached");
            return Err(Rejection::TooManyFromHost);
        }
        *count += 1;

        Ok(ConnectionPermit {
            limiter: Arc::clone(self),
            ip,
        })
    }

    /// Connections currently admitted.
    pub fn active_total(&self) -> usize {
        self.total.load(Ordering::Acquire)
    }

    /// Connections currently admitted from `ip`.
    pub fn active_for(&self, ip: IpAddr) -> usize {
        self.active.get(&ip).map_or(0, |c| *c)
    }

    /// Drop idle rate limiter entries once the table gets large.
    pub fn cleanup(&self) {
        const MAX_ENTRIES: usize = 10_000;
        if self.rates.len() > MAX_ENTRIES {
            self.rates.retain(|ip, _| self.active.contains_key(ip));
            debug!(remaining = self.rates.len(), "pruned connection rate limiters");
        }
    }

    fn release(&self, ip: IpAddr) {
        if let Some(mut count) = self.active.get_mut(&ip) {
            *count = count.saturating_sub(1);
        }
        self.active.remove_if(&ip, |_, count| *count == 0);
        self.total.fetch_sub(1, Ordering::AcqRel);
    }
}

impl Drop for ConnectionPermit {
    fn drop(&mut self) {
        self.limiter.release(self.ip);
    }
}
