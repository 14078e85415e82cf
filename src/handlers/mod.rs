//! IRC command handlers.
//!
//! - [`core`]: handler trait, context, registry and dispatcher
//! - [`connection`]: PASS, NICK, USER, PING, PONG, QUIT and registration
//! - [`cap`]: IRCv3 capability negotiation
//! - [`messaging`]: PRIVMSG and NOTICE between users
//! - [`oper`]: OPER and KILL

mod cap;
mod connection;
pub mod core;
mod messaging;
mod oper;

pub use self::core::{CommandSpec, Context, Dispatcher, Handler, Registry};
