//! Error types for line parsing and length validation.

use thiserror::Error;

/// Failure to decode a single protocol line.
///
/// The daemon drops these lines silently; the variant only feeds debug logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum ParseError {
    /// The line had no bytes at all.
    #[error("empty line")]
    Empty,
    /// A `@` tag block was present but nothing followed it.
    #[error("tag block is not followed by a command")]
    UnterminatedTags,
    /// `@ ` with no tag data.
    #[error("empty tag block")]
    EmptyTags,
    /// A `:` prefix block was present but nothing followed it.
    #[error("prefix is not followed by a command")]
    UnterminatedPrefix,
    /// `: ` with no prefix text.
    #[error("empty prefix")]
    EmptyPrefix,
    /// Tags and prefix parsed but the command token is missing.
    #[error("missing command")]
    MissingCommand,
    /// A field was not valid UTF-8 when promoting to an owned message.
    #[error("invalid utf-8 in {field}")]
    InvalidUtf8 {
        /// Which part of the line failed to decode.
        field: &'static str,
    },
}

/// A line that exceeds one of the protocol length limits.
///
/// Unlike [`ParseError`], these are reported back to the client with
/// `ERR_INPUTTOOLONG` instead of being dropped silently.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum LengthError {
    /// Message body (everything after the tag block, plus CRLF) is too long.
    #[error("message too long: {actual} bytes (limit {limit})")]
    LineTooLong {
        /// Observed length.
        actual: usize,
        /// Protocol limit.
        limit: usize,
    },
    /// Client tag data exceeds the allowed size.
    #[error("tags too long: {actual} bytes (limit {limit})")]
    TagsTooLong {
        /// Observed length.
        actual: usize,
        /// Protocol limit.
        limit: usize,
    },
}
