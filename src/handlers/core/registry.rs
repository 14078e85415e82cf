//! Command handler registry.
//!
//! Maps command names to a [`CommandSpec`]: the handler plus the gates the
//! dispatcher applies before running it (minimum stage, flood cost, required
//! permission bits).

use super::traits::Handler;
use crate::handlers::{
    cap::CapHandler,
    connection::{NickHandler, PassHandler, PingHandler, PongHandler, QuitHandler, UserHandler},
    messaging::{NoticeHandler, PrivmsgHandler},
    oper::{KillHandler, OperHandler},
};
use crate::security::Permissions;
use crate::state::Stage;
use std::collections::HashMap;
use std::sync::Arc;

/// Longest command name looked up; anything longer is unknown.
const MAX_COMMAND_LEN: usize = 32;

/// A registered command and its dispatch requirements.
pub struct CommandSpec {
    pub name: &'static str,
    /// Lowest session stage the command may run in.
    pub min_stage: Stage,
    /// Flood limiter tokens charged per use; 0 skips the limiter.
    pub cost: u32,
    /// Permission bits the session must hold.
    pub requires: Permissions,
    handler: Box<dyn Handler>,
}

impl CommandSpec {
    /// A command for registered sessions, costing one token.
    pub fn new(name: &'static str, handler: impl Handler + 'static) -> Self {
        Self {
            name,
            min_stage: Stage::Registered,
            cost: 1,
            requires: Permissions::empty(),
            handler: Box::new(handler),
        }
    }

    pub fn min_stage(mut self, stage: Stage) -> Self {
        self.min_stage = stage;
        self
    }

    pub fn cost(mut self, cost: u32) -> Self {
        self.cost = cost;
        self
    }

    pub fn requires(mut self, perms: Permissions) -> Self {
        self.requires = perms;
        self
    }

    pub fn handler(&self) -> &dyn Handler {
        self.handler.as_ref()
    }
}

impl std::fmt::Debug for CommandSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandSpec")
            .field("name", &self.name)
            .field("min_stage", &self.min_stage)
            .field("cost", &self.cost)
            .field("requires", &self.requires)
            .finish()
    }
}

/// Registry of command handlers.
#[derive(Debug)]
pub struct Registry {
    commands: HashMap<&'static str, Arc<CommandSpec>>,
}

impl Registry {
    /// Create a registry with every built-in command.
    pub fn new() -> Self {
        let mut registry = Self::empty();

        // Connection/registration
        registry.insert(CommandSpec::new("CAP", CapHandler).min_stage(Stage::Connecting));
        registry.insert(CommandSpec::new("PASS", PassHandler).min_stage(Stage::Connecting));
        registry.insert(CommandSpec::new("NICK", NickHandler).min_stage(Stage::Connecting));
        registry.insert(CommandSpec::new("USER", UserHandler).min_stage(Stage::Connecting));
        registry.insert(CommandSpec::new("PING", PingHandler).min_stage(Stage::Connecting).cost(0));
        registry.insert(CommandSpec::new("PONG", PongHandler).min_stage(Stage::Connecting).cost(0));
        registry.insert(CommandSpec::new("QUIT", QuitHandler).min_stage(Stage::Connecting).cost(0));

        // Messaging
        registry.insert(CommandSpec::new("PRIVMSG", PrivmsgHandler));
        registry.insert(CommandSpec::new("NOTICE", NoticeHandler));

        // Operator
        registry.insert(CommandSpec::new("OPER", OperHandler));
        registry.insert(CommandSpec::new("KILL", KillHandler).requires(Permissions::KILL));

        registry
    }

    /// A registry with no commands.
    pub fn empty() -> Self {
        Self {
            commands: HashMap::new(),
        }
    }

    /// Add a command, replacing any earlier one with the same name.
    ///
    /// Names are stored upper-case.
    pub fn insert(&mut self, spec: CommandSpec) {
        debug_assert!(spec.name.bytes().all(|b| !b.is_ascii_lowercase()));
        self.commands.insert(spec.name, Arc::new(spec));
    }

    /// Look up a command as it appears on the wire, ignoring ASCII case.
    pub fn get(&self, command: &[u8]) -> Option<&Arc<CommandSpec>> {
        if command.len() > MAX_COMMAND_LEN {
            return None;
        }
        let mut buf = [0u8; MAX_COMMAND_LEN];
        let upper = &mut buf[..command.len()];
        upper.copy_from_slice(command);
        upper.make_ascii_uppercase();
        let name = std::str::from_utf8(upper).ok()?;
        self.commands.get(name)
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_ignores_case() {
        let registry = Registry::new();
        assert_eq!(registry.get(b"privmsg").unwrap().name, "PRIVMSG");
        assert_eq!(registry.get(b"NiCk").unwrap().name, "NICK");
        assert!(registry.get(b"JOIN").is_none());
        assert!(registry.get(&[b'A'; 40]).is_none());
        assert!(registry.get(&[0xff, 0xfe]).is_none());
    }

    #[test]
    fn test_builtin_requirements() {
        let registry = Registry::new();
        let ping = registry.get(b"PING").unwrap();
        assert_eq!(ping.min_stage, Stage::Connecting);
        assert_eq!(ping.cost, 0);

        let privmsg = registry.get(b"PRIVMSG").unwrap();
        assert_eq!(privmsg.min_stage, Stage::Registered);
        assert_eq!(privmsg.cost, 1);

        let kill = registry.get(b"KILL").unwrap();
        assert!(kill.requires.contains(Permissions::KILL));
        assert_eq!(registry.len(), 11);
    }
}
