//! # slirc-wire
//!
//! Wire-level building blocks for the slircd ingestion pipeline:
//!
//! - [`framer`]: stateless line framing over an accumulating byte buffer
//! - [`LineRef`]: zero-copy view over one protocol line
//! - [`Message`]: owned, decoded message
//! - [`LineBuilder`]: fixed-capacity encoder with a numeric fast path
//! - [`limits`]: protocol length constants and the input-too-long check
//!
//! ## Parsing
//!
//! ```rust
//! use slirc_wire::LineRef;
//!
//! let line = LineRef::parse(b"@id=1 :nick!u@h PRIVMSG #c :hello there").unwrap();
//! assert_eq!(line.command(), b"PRIVMSG");
//! assert_eq!(line.tags(), Some(&b"id=1"[..]));
//!
//! let msg = line.to_message().unwrap();
//! assert_eq!(msg.params, vec!["#c", "hello there"]);
//! ```
//!
//! ## Encoding
//!
//! ```rust
//! use slirc_wire::LineBuilder;
//!
//! let mut out = LineBuilder::new();
//! out.numeric("irc.example.net", 1, "nick", &["Welcome to the network"]);
//! assert_eq!(out.as_bytes(), b":irc.example.net 001 nick :Welcome to the network\r\n");
//! ```

#![deny(clippy::all)]
#![warn(missing_docs)]

pub mod builder;
pub mod casemap;
pub mod error;
pub mod framer;
pub mod limits;
pub mod line;
pub mod message;
pub mod nick;
pub mod numeric;
pub mod tags;

pub use self::builder::LineBuilder;
pub use self::casemap::{irc_eq, irc_to_lower};
pub use self::error::{LengthError, ParseError};
pub use self::framer::frame_lines;
pub use self::limits::check_line_length;
pub use self::line::LineRef;
pub use self::message::{Message, Tag};
pub use self::nick::NickExt;
pub use self::numeric::Numeric;
