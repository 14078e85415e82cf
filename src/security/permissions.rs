//! Operator permission bits and the resolver seam.
//!
//! The dispatcher never asks "is this user an oper?" directly. It reads the
//! bitmask cached on the session, which a [`PermissionResolver`] fills in at
//! registration and again after a successful OPER.

use crate::config::{OperBlock, OperPermission};
use bitflags::bitflags;
use std::collections::HashMap;

bitflags! {
    /// Privileges a session may hold.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct Permissions: u32 {
        /// May disconnect other users with KILL.
        const KILL = 1 << 0;
        /// Bypasses the per-session flood limiter.
        const FLOOD_EXEMPT = 1 << 1;
    }
}

impl From<OperPermission> for Permissions {
    fn from(p: OperPermission) -> Self {
        match p {
            OperPermission::Kill => Permissions::KILL,
            OperPermission::FloodExempt => Permissions::FLOOD_EXEMPT,
        }
    }
}

/// Maps an authenticated identity to its permission bits.
pub trait PermissionResolver: Send + Sync {
    /// Permissions for a session that just completed registration.
    fn on_register(&self, nick: &str) -> Permissions;

    /// Permissions granted by `OPER <name> <password>`, or `None` if the
    /// credentials do not match.
    fn on_oper(&self, name: &str, password: &str) -> Option<Permissions>;
}

/// Resolver backed by the `[[oper]]` config blocks.
#[derive(Debug, Default)]
pub struct OperPermissions {
    blocks: HashMap<String, OperBlock>,
}

impl OperPermissions {
    pub fn new(blocks: &[OperBlock]) -> Self {
        Self {
            blocks: blocks
                .iter()
                .map(|b| (b.name.clone(), b.clone()))
                .collect(),
        }
    }
}

impl PermissionResolver for OperPermissions {
    fn on_register(&self, _nick: &str) -> Permissions {
        Permissions::empty()
    }

    fn on_oper(&self, name: &str, password: &str) -> Option<Permissions> {
        let block = self.blocks.get(name)?;
        if !block.verify_password(password) {
            return None;
        }
        Some(
            block
                .permissions
                .iter()
                .fold(Permissions::empty(), |acc, p| acc | Permissions::from(*p)),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn block(name: &str, password: &str, perms: Vec<OperPermission>) -> OperBlock {
        OperBlock {
            name: name.into(),
            password: password.into(),
            permissions: perms,
        }
    }

    #[test]
    fn test_oper_grants_configured_bits() {
        let resolver = OperPermissions::new(&[block(
            "admin",
            "secret",
            vec![OperPermission::Kill, OperPermission::FloodExempt],
        )]);
        let perms = resolver.on_oper("admin", "secret").unwrap();
        assert!(perms.contains(Permissions::KILL | Permissions::FLOOD_EXEMPT));
    }

    #[test]
    fn test_oper_rejects_bad_credentials() {
        let resolver = OperPermissions::new(&[block("admin", "secret", vec![OperPermission::Kill])]);
        assert!(resolver.on_oper("admin", "wrong").is_none());
        assert!(resolver.on_oper("nobody", "secret").is_none());
    }

    #[test]
    fn test_registration_grants_nothing() {
        let resolver = OperPermissions::default();
        assert!(resolver.on_register("alice").is_empty());
    }
}
