//! Operator block configuration.

use serde::Deserialize;
use subtle::ConstantTimeEq;

/// Permission names grantable to an operator block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperPermission {
    /// Disconnect other users (KILL).
    Kill,
    /// Skip the per-session flood limiter.
    FloodExempt,
}

/// Operator block configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct OperBlock {
    /// Operator name (used in OPER command).
    pub name: String,
    /// Password (plaintext or bcrypt hash).
    pub password: String,
    /// Permissions granted after a successful OPER.
    #[serde(default)]
    pub permissions: Vec<OperPermission>,
}

impl OperBlock {
    /// Verify the provided password against the stored password (plaintext or bcrypt).
    pub fn verify_password(&self, password: &str) -> bool {
        if self.password.starts_with("$2") {
            bcrypt::verify(password, &self.password).unwrap_or(false)
        } else {
            self.password.as_bytes().ct_eq(password.as_bytes()).into()
        }
    }
}
