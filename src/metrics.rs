//! Prometheus metrics collection for slircd.
//!
//! Metrics live in `OnceLock` statics registered by [`init`]. Recording
//! before `init` is a no-op, which keeps unit tests free of setup.
//!
//! - `irc_command_total{command}` - commands processed by type
//! - `irc_command_duration_seconds{command}` - command latency histogram
//! - `irc_command_errors_total{command,error}` - handler errors
//! - `irc_flood_events_total{verdict}` - throttled and excess-flood lines
//! - `irc_connected_sessions` - live sessions

use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, IntGauge, Opts, Registry,
    TextEncoder,
};
use std::sync::OnceLock;

/// Global Prometheus registry for all metrics.
pub static REGISTRY: OnceLock<Registry> = OnceLock::new();

pub fn registry() -> &'static Registry {
    REGISTRY.get_or_init(Registry::new)
}

// ========================================================================
// Counters
// ========================================================================

/// Commands processed by type.
pub static COMMAND_COUNTER: OnceLock<IntCounterVec> = OnceLock::new();

/// Command processing latency by type.
pub static COMMAND_LATENCY: OnceLock<HistogramVec> = OnceLock::new();

/// Command errors by type and error kind.
pub static COMMAND_ERRORS: OnceLock<IntCounterVec> = OnceLock::new();

/// Lines refused by the flood limiter, by verdict.
pub static FLOOD_EVENTS: OnceLock<IntCounterVec> = OnceLock::new();

/// Lines rejected for exceeding the protocol length limits.
pub static INPUT_TOO_LONG: OnceLock<IntCounter> = OnceLock::new();

/// Pending commands discarded because a session queue was full.
pub static QUEUE_DROPS: OnceLock<IntCounter> = OnceLock::new();

/// Handler panics caught at the queue boundary.
pub static HANDLER_PANICS: OnceLock<IntCounter> = OnceLock::new();

/// Connections refused by the gateway, by reason.
pub static CONNECTIONS_REJECTED: OnceLock<IntCounterVec> = OnceLock::new();

/// Transport failures (overflow, handshake, i/o), by kind.
pub static TRANSPORT_ERRORS: OnceLock<IntCounterVec> = OnceLock::new();

/// Connections dropped because their send queue filled.
pub static SENDQ_EXCEEDED: OnceLock<IntCounter> = OnceLock::new();

// ========================================================================
// Gauges
// ========================================================================

/// Currently connected sessions.
pub static CONNECTED_SESSIONS: OnceLock<IntGauge> = OnceLock::new();

/// Initialize the Prometheus metrics registry.
///
/// Called once at startup. Later calls leave the existing metrics in place.
pub fn init() {
    let r = registry();

    macro_rules! register {
        ($metric:ident, $init:expr) => {
            match $init {
                Ok(m) => {
                    if let Err(e) = r.register(Box::new(m.clone())) {
                        tracing::warn!(error = %e, concat!("Failed to register metric ", stringify!($metric)));
                    }
                    let _ = $metric.set(m);
                }
                Err(e) => {
                    tracing::warn!(error = %e, concat!("Failed to create metric ", stringify!($metric)));
                }
            }
        };
    }

    register!(COMMAND_COUNTER, IntCounterVec::new(Opts::new("irc_command_total", "IRC commands processed by type"), &["command"]));
    register!(COMMAND_LATENCY, HistogramVec::new(
        HistogramOpts::new("irc_command_duration_seconds", "IRC command latency by type")
            .buckets(vec![0.00005, 0.0001, 0.0005, 0.001, 0.005, 0.01, 0.05, 0.1, 0.5]),
        &["command"]));
    register!(COMMAND_ERRORS, IntCounterVec::new(Opts::new("irc_command_errors_total", "IRC command errors by type"), &["command", "error"]));
    register!(FLOOD_EVENTS, IntCounterVec::new(Opts::new("irc_flood_events_total", "Lines refused by the flood limiter"), &["verdict"]));
    register!(INPUT_TOO_LONG, IntCounter::new("irc_input_too_long_total", "Lines over the protocol length limits"));
    register!(QUEUE_DROPS, IntCounter::new("irc_queue_drops_total", "Commands dropped from full session queues"));
    register!(HANDLER_PANICS, IntCounter::new("irc_handler_panics_total", "Handler panics caught"));
    register!(CONNECTIONS_REJECTED, IntCounterVec::new(Opts::new("irc_connections_rejected_total", "Connections refused by the gateway"), &["reason"]));
    register!(TRANSPORT_ERRORS, IntCounterVec::new(Opts::new("irc_transport_errors_total", "Transport failures by kind"), &["kind"]));
    register!(SENDQ_EXCEEDED, IntCounter::new("irc_sendq_exceeded_total", "Connections dropped for a full send queue"));
    register!(CONNECTED_SESSIONS, IntGauge::new("irc_connected_sessions", "Currently connected sessions"));
}

/// Gather all metrics and encode them in Prometheus text format.
pub fn gather_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = registry().gather();
    let mut buffer = vec![];
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        tracing::error!(error = %e, "Failed to encode Prometheus metrics");
        return String::new();
    }
    match String::from_utf8(buffer) {
        Ok(s) => s,
        Err(e) => {
            tracing::error!(error = %e, "Prometheus metrics were not valid UTF-8");
            String::new()
        }
    }
}

// ============================================================================
// Recording helpers
// ============================================================================

fn inc(metric: &OnceLock<IntCounter>) {
    if let Some(c) = metric.get() {
        c.inc();
    }
}

fn inc_vec(metric: &OnceLock<IntCounterVec>, labels: &[&str]) {
    if let Some(c) = metric.get() {
        c.with_label_values(labels).inc();
    }
}

/// Record a command execution with latency.
#[inline]
pub fn record_command(command: &str, duration_secs: f64) {
    inc_vec(&COMMAND_COUNTER, &[command]);
    if let Some(h) = COMMAND_LATENCY.get() {
        h.with_label_values(&[command]).observe(duration_secs);
    }
}

/// Record a command error.
#[inline]
pub fn record_command_error(command: &str, error: &str) {
    inc_vec(&COMMAND_ERRORS, &[command, error]);
}

/// Record a line refused by the flood limiter.
pub fn record_flood(verdict: &str) {
    inc_vec(&FLOOD_EVENTS, &[verdict]);
}

pub fn record_input_too_long() {
    inc(&INPUT_TOO_LONG);
}

pub fn record_queue_drop() {
    inc(&QUEUE_DROPS);
}

pub fn record_handler_panic() {
    inc(&HANDLER_PANICS);
}

pub fn record_connection_rejected(reason: &str) {
    inc_vec(&CONNECTIONS_REJECTED, &[reason]);
}

pub fn record_transport_error(kind: &str) {
    inc_vec(&TRANSPORT_ERRORS, &[kind]);
}

pub fn record_sendq_exceeded() {
    inc(&SENDQ_EXCEEDED);
}

pub fn set_connected_sessions(count: usize) {
    if let Some(g) = CONNECTED_SESSIONS.get() {
        g.set(i64::try_from(count).unwrap_or(i64::MAX));
    }
}
