//! Advertised IRCv3 capabilities.

/// Capabilities the server offers in `CAP LS`.
#[derive(Debug, Clone)]
pub struct CapabilityRegistry {
    caps: Vec<(String, Option<String>)>,
}

/// Capabilities the core itself implements.
pub const DEFAULT_CAPS: &[&str] = &[
    "batch",
    "cap-notify",
    "labeled-response",
    "message-tags",
    "server-time",
];

impl Default for CapabilityRegistry {
    fn default() -> Self {
        let mut registry = Self { caps: Vec::new() };
        for name in DEFAULT_CAPS {
            registry.register(name, None);
        }
        registry
    }
}

impl CapabilityRegistry {
    /// Registry with nothing advertised.
    pub fn empty() -> Self {
        Self { caps: Vec::new() }
    }

    /// Advertise `name`, replacing any earlier value.
    pub fn register(&mut self, name: &str, value: Option<&str>) {
        let value = value.map(str::to_owned);
        match self.caps.iter_mut().find(|(n, _)| n == name) {
            Some(entry) => entry.1 = value,
            None => self.caps.push((name.to_owned(), value)),
        }
    }

    pub fn is_supported(&self, name: &str) -> bool {
        self.caps.iter().any(|(n, _)| n == name)
    }

    /// Tokens for `CAP LS`. Values are only shown to 302 clients.
    pub fn ls_tokens(&self, version: u32) -> Vec<String> {
        self.caps
            .iter()
            .map(|(name, value)| match value {
                Some(v) if version >= 302 => format!("{name}={v}"),
                _ => name.clone(),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_advertised() {
        let caps = CapabilityRegistry::default();
        for name in DEFAULT_CAPS {
            assert!(caps.is_supported(name));
        }
        assert!(!caps.is_supported("sasl"));
    }

    #[test]
    fn test_values_only_for_302() {
        let mut caps = CapabilityRegistry::empty();
        caps.register("sts", Some("port=6697"));
        caps.register("batch", None);
        assert_eq!(caps.ls_tokens(301), vec!["sts", "batch"]);
        assert_eq!(caps.ls_tokens(302), vec!["sts=port=6697", "batch"]);
    }

    #[test]
    fn test_register_replaces_value() {
        let mut caps = CapabilityRegistry::empty();
        caps.register("x", Some("1"));
        caps.register("x", Some("2"));
        assert_eq!(caps.ls_tokens(302), vec!["x=2"]);
    }
}
