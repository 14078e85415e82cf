//! Telemetry utilities for logging setup and command timing.

use crate::config::LogFormat;
use std::time::Instant;
use tracing_subscriber::EnvFilter;

/// Install the global tracing subscriber.
///
/// `RUST_LOG` overrides the default `info` filter.
pub fn init_logging(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true);
    let result = match format {
        LogFormat::Text => builder.try_init(),
        LogFormat::Json => builder.json().try_init(),
    };
    if let Err(e) = result {
        eprintln!("tracing subscriber already installed: {e}");
    }
}

/// Guard for timing command execution and recording metrics.
///
/// Records command latency when dropped.
pub struct CommandTimer {
    command: &'static str,
    start: Instant,
}

impl CommandTimer {
    /// Start timing a command.
    pub fn new(command: &'static str) -> Self {
        Self {
            command,
            start: Instant::now(),
        }
    }
}

impl Drop for CommandTimer {
    fn drop(&mut self) {
        let duration = self.start.elapsed().as_secs_f64();
        crate::metrics::record_command(self.command, duration);
    }
}

/// Standardized span constructors.
pub mod spans {
    use tracing::{Span, debug_span, info_span};

    /// Create a span for a client session.
    pub fn session(uid: &str, ip: &str) -> Span {
        info_span!("session", uid = %uid, ip = %ip)
    }

    /// Create a span for a command execution.
    pub fn command(name: &str, uid: &str, label: Option<&str>) -> Span {
        if let Some(label) = label {
            debug_span!("irc.command", command = %name, uid = %uid, label = %label)
        } else {
            debug_span!("irc.command", command = %name, uid = %uid)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timer_records_on_drop() {
        crate::metrics::init();
        {
            let _timer = CommandTimer::new("TIMED");
        }
        assert!(crate::metrics::gather_metrics().contains("command=\"TIMED\""));
    }
}
