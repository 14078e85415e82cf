//! Configuration validation.
//!
//! Runs once at startup and reports every problem found, not just the first.

use super::Config;
use std::collections::HashSet;
use std::path::Path;
use thiserror::Error;

/// Validation errors for configuration.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("server.name is required")]
    MissingServerName,
    #[error("server.name must not contain spaces")]
    ServerNameHasSpace,
    #[error("server.network is required")]
    MissingNetworkName,
    #[error("server.sid must be exactly 3 characters, got {0}")]
    InvalidSid(usize),
    #[error("server.sid must match pattern [0-9][A-Z0-9][A-Z0-9], got '{0}'")]
    InvalidSidFormat(String),
    #[error("tls.cert_path does not exist: {0}")]
    TlsCertNotFound(String),
    #[error("tls.key_path does not exist: {0}")]
    TlsKeyNotFound(String),
    #[error("tls.handshake_timeout_secs must be at least 1")]
    ZeroHandshakeTimeout,
    #[error("limits.flood_burst must be at least 1")]
    ZeroFloodBurst,
    #[error("limits.flood_interval_secs must be a positive number, got {0}")]
    InvalidFloodInterval(f64),
    #[error("limits.flood_excess_threshold must be at least 1")]
    ZeroFloodThreshold,
    #[error("limits.queue_capacity must be at least 1")]
    ZeroQueueCapacity,
    #[error("limits.sendq_lines must be at least 1")]
    ZeroSendq,
    #[error("duplicate oper block name: {0}")]
    DuplicateOper(String),
}

/// Validate a configuration, returning all errors found.
pub fn validate(config: &Config) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.server.name.is_empty() {
        errors.push(ValidationError::MissingServerName);
    } else if config.server.name.contains(' ') {
        errors.push(ValidationError::ServerNameHasSpace);
    }
    if config.server.network.is_empty() {
        errors.push(ValidationError::MissingNetworkName);
    }

    let sid = config.server.sid.as_bytes();
    if sid.len() != 3 {
        errors.push(ValidationError::InvalidSid(sid.len()));
    } else {
        let tail_ok = |b: u8| b.is_ascii_uppercase() || b.is_ascii_digit();
        if !(sid[0].is_ascii_digit() && tail_ok(sid[1]) && tail_ok(sid[2])) {
            errors.push(ValidationError::InvalidSidFormat(config.server.sid.clone()));
        }
    }

    if let Some(ref tls) = config.tls {
        if !Path::new(&tls.cert_path).exists() {
            errors.push(ValidationError::TlsCertNotFound(tls.cert_path.clone()));
        }
        if !Path::new(&tls.key_path).exists() {
            errors.push(ValidationError::TlsKeyNotFound(tls.key_path.clone()));
        }
        if tls.handshake_timeout_secs == 0 {
            errors.push(ValidationError::ZeroHandshakeTimeout);
        }
    }

    let limits = &config.limits;
    if limits.flood_burst == 0 {
        errors.push(ValidationError::ZeroFloodBurst);
    }
    if !(limits.flood_interval_secs.is_finite() && limits.flood_interval_secs > 0.0) {
        errors.push(ValidationError::InvalidFloodInterval(limits.flood_interval_secs));
    }
    if limits.flood_excess_threshold == 0 {
        errors.push(ValidationError::ZeroFloodThreshold);
    }
    if limits.queue_capacity == 0 {
        errors.push(ValidationError::ZeroQueueCapacity);
    }
    if limits.sendq_lines == 0 {
        errors.push(ValidationError::ZeroSendq);
    }

    let mut seen = HashSet::new();
    for oper in &config.oper {
        if !seen.insert(oper.name.as_str()) {
            errors.push(ValidationError::DuplicateOper(oper.name.clone()));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BASE: &str = r#"
[server]
name = "test.server"
network = "TestNet"
sid = "00T"
description = "Test"

[listen]
address = "127.0.0.1:6667"
"#;

    fn parse(extra: &str) -> Config {
        toml::from_str(&format!("{BASE}{extra}")).unwrap()
    }

    #[test]
    fn test_valid_config_passes() {
        assert!(validate(&parse("")).is_ok());
    }

    #[test]
    fn test_bad_sid_format_fails() {
        let mut config = parse("");
        config.server.sid = "A0T".into();
        let errors = validate(&config).unwrap_err();
        assert!(errors.iter().any(|e| matches!(e, ValidationError::InvalidSidFormat(_))));
    }

    #[test]
    fn test_missing_tls_files_fail() {
        let config = parse(
            r#"
[tls]
address = "127.0.0.1:6697"
cert_path = "/nonexistent/cert.pem"
key_path = "/nonexistent/key.pem"
"#,
        );
        let errors = validate(&config).unwrap_err();
        assert!(errors.iter().any(|e| matches!(e, ValidationError::TlsCertNotFound(_))));
        assert!(errors.iter().any(|e| matches!(e, ValidationError::TlsKeyNotFound(_))));
    }

    #[test]
    fn test_flood_limits_checked() {
        let config = parse(
            r#"
[limits]
flood_burst = 0
flood_interval_secs = -1.0
flood_excess_threshold = 0
queue_capacity = 0
"#,
        );
        let errors = validate(&config).unwrap_err();
        assert_eq!(errors.len(), 4);
    }

    #[test]
    fn test_duplicate_oper_names() {
        let config = parse(
            r#"
[[oper]]
name = "a"
password = "x"

[[oper]]
name = "a"
password = "y"
"#,
        );
        let errors = validate(&config).unwrap_err();
        assert!(matches!(&errors[..], [ValidationError::DuplicateOper(n)] if n == "a"));
    }
}
