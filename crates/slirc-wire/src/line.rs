//! Zero-copy line decoding.
//!
//! [`LineRef`] borrows byte ranges out of the receive buffer and never
//! allocates. It lives for one framer callback; anything that must outlive
//! the buffer is promoted with [`LineRef::to_message`].

use nom::bytes::complete::{tag, take_till};
use nom::sequence::preceded;
use nom::IResult;
use smallvec::SmallVec;

use crate::error::ParseError;
use crate::message::{Message, Tag};

/// Borrowed view over one protocol line (terminators stripped).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineRef<'a> {
    tags: Option<&'a [u8]>,
    prefix: Option<&'a [u8]>,
    command: &'a [u8],
    middle: &'a [u8],
    trailing: Option<&'a [u8]>,
}

fn token(input: &[u8]) -> IResult<&[u8], &[u8]> {
    take_till(|b| b == b' ')(input)
}

fn marked_block<'a>(input: &'a [u8], marker: &'static [u8]) -> IResult<&'a [u8], &'a [u8]> {
    preceded(tag(marker), token)(input)
}

#[inline]
fn skip_spaces(input: &[u8]) -> &[u8] {
    let n = input.iter().take_while(|&&b| b == b' ').count();
    &input[n..]
}

/// Strip an optional `marker`-led block ending at the next space.
fn optional_block<'a>(
    input: &'a [u8],
    marker: &'static [u8],
    empty: ParseError,
    unterminated: ParseError,
) -> Result<(&'a [u8], Option<&'a [u8]>), ParseError> {
    let Ok((rest, block)) = marked_block(input, marker) else {
        return Ok((input, None));
    };
    if block.is_empty() {
        return Err(empty);
    }
    if rest.is_empty() {
        return Err(unterminated);
    }
    Ok((skip_spaces(rest), Some(block)))
}

impl<'a> LineRef<'a> {
    /// Decode one line.
    ///
    /// ```
    /// use slirc_wire::LineRef;
    ///
    /// assert!(LineRef::parse(b"QUIT").is_ok());
    /// assert!(LineRef::parse(b"@ :prefix CMD").is_err());
    /// assert!(LineRef::parse(b": CMD").is_err());
    /// ```
    pub fn parse(line: &'a [u8]) -> Result<Self, ParseError> {
        if line.is_empty() {
            return Err(ParseError::Empty);
        }

        let (rest, tags) =
            optional_block(line, b"@", ParseError::EmptyTags, ParseError::UnterminatedTags)?;
        let (rest, prefix) = optional_block(
            rest,
            b":",
            ParseError::EmptyPrefix,
            ParseError::UnterminatedPrefix,
        )?;

        if rest.is_empty() {
            return Err(ParseError::MissingCommand);
        }
        let (after, command) = token(rest).map_err(|_| ParseError::MissingCommand)?;
        if command.is_empty() {
            return Err(ParseError::MissingCommand);
        }

        // `after` is either empty or starts with the space ending the command.
        let params = after.get(1..).unwrap_or_default();
        let (middle, trailing) = if let Some(t) = params.strip_prefix(b":") {
            (&params[..0], Some(t))
        } else if let Some(pos) = params.windows(2).position(|w| w == b" :") {
            (&params[..pos], Some(&params[pos + 2..]))
        } else {
            (params, None)
        };

        Ok(Self {
            tags,
            prefix,
            command,
            middle,
            trailing,
        })
    }

    /// Raw tag blob without the leading `@`.
    pub fn tags(&self) -> Option<&'a [u8]> {
        self.tags
    }

    /// Prefix without the leading `:`.
    pub fn prefix(&self) -> Option<&'a [u8]> {
        self.prefix
    }

    /// Command token exactly as received.
    pub fn command(&self) -> &'a [u8] {
        self.command
    }

    /// Middle parameters before splitting.
    pub fn middle(&self) -> &'a [u8] {
        self.middle
    }

    /// Trailing parameter without its `:` marker.
    pub fn trailing(&self) -> Option<&'a [u8]> {
        self.trailing
    }

    /// Whether the line carried a `:`-marked trailing parameter.
    pub fn has_trailing(&self) -> bool {
        self.trailing.is_some()
    }

    /// Case-insensitive comparison of the command token.
    pub fn command_is(&self, name: &str) -> bool {
        self.command.eq_ignore_ascii_case(name.as_bytes())
    }

    /// Iterate the parameters: non-empty middle tokens, then the trailing one.
    pub fn params(&self) -> Params<'a> {
        Params {
            middle: self.middle,
            trailing: self.trailing,
        }
    }

    /// Collect the parameters without touching the heap for typical lines.
    pub fn collect_params(&self) -> SmallVec<[&'a [u8]; 15]> {
        self.params().collect()
    }

    /// Raw (still escaped) value of a tag, `Some(b"")` for a valueless tag.
    pub fn tag_value(&self, key: &str) -> Option<&'a [u8]> {
        self.tags?.split(|&b| b == b';').find_map(|item| {
            let (k, v) = match item.iter().position(|&b| b == b'=') {
                Some(eq) => (&item[..eq], &item[eq + 1..]),
                None => (item, &item[..0]),
            };
            (k == key.as_bytes()).then_some(v)
        })
    }

    /// Promote to an owned [`Message`], decoding UTF-8 and unescaping tags.
    pub fn to_message(&self) -> Result<Message, ParseError> {
        let tags = match self.tags {
            Some(raw) => Some(Tag::parse_block(utf8(raw, "tags")?)),
            None => None,
        };
        let prefix = match self.prefix {
            Some(raw) => Some(utf8(raw, "prefix")?.to_owned()),
            None => None,
        };
        let command = utf8(self.command, "command")?.to_owned();
        let raw = self.collect_params();
        let mut params = Vec::with_capacity(raw.len());
        for p in raw {
            params.push(utf8(p, "params")?.to_owned());
        }

        Ok(Message {
            tags,
            prefix,
            command,
            params,
        })
    }
}

fn utf8<'a>(raw: &'a [u8], field: &'static str) -> Result<&'a str, ParseError> {
    std::str::from_utf8(raw).map_err(|_| ParseError::InvalidUtf8 { field })
}

/// Iterator over a line's parameters.
#[derive(Debug, Clone)]
pub struct Params<'a> {
    middle: &'a [u8],
    trailing: Option<&'a [u8]>,
}

impl<'a> Iterator for Params<'a> {
    type Item = &'a [u8];

    fn next(&mut self) -> Option<&'a [u8]> {
        let rest = skip_spaces(self.middle);
        if rest.is_empty() {
            self.middle = rest;
            return self.trailing.take();
        }
        let end = rest.iter().position(|&b| b == b' ').unwrap_or(rest.len());
        self.middle = &rest[end..];
        Some(&rest[..end])
    }
}
