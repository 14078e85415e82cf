//! Owned IRC messages.

use std::fmt;
use std::str::FromStr;

use crate::builder::LineBuilder;
use crate::error::ParseError;
use crate::line::LineRef;
use crate::tags::unescape_tag_value;

/// A single IRCv3 message tag: key and optional (unescaped) value.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Tag(pub String, pub Option<String>);

impl Tag {
    /// Create a tag.
    pub fn new(key: impl Into<String>, value: Option<impl Into<String>>) -> Self {
        Tag(key.into(), value.map(Into::into))
    }

    /// Tag key, including any `+` client-only marker or vendor prefix.
    pub fn key(&self) -> &str {
        &self.0
    }

    /// Unescaped value, if any.
    pub fn value(&self) -> Option<&str> {
        self.1.as_deref()
    }

    /// Split a raw tag blob (`k=v;k2`) into tags, unescaping values.
    /// Empty segments and empty keys are skipped.
    pub fn parse_block(raw: &str) -> Vec<Tag> {
        raw.split(';')
            .filter_map(|item| {
                let (key, value) = match item.split_once('=') {
                    Some((k, v)) => (k, Some(unescape_tag_value(v))),
                    None => (item, None),
                };
                (!key.is_empty()).then(|| Tag(key.to_owned(), value))
            })
            .collect()
    }
}

/// An owned, decoded protocol message.
///
/// Only the final parameter may contain spaces, be empty or start with `:`;
/// the encoder adds the trailing marker when needed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    /// IRCv3 tags, if the line carried a tag block.
    pub tags: Option<Vec<Tag>>,
    /// Source prefix without the leading `:`.
    pub prefix: Option<String>,
    /// Command or three-digit numeric.
    pub command: String,
    /// Parameters in order.
    pub params: Vec<String>,
}

impl Message {
    /// Build a message from a command and its parameters.
    pub fn new<I, S>(command: impl Into<String>, params: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            tags: None,
            prefix: None,
            command: command.into(),
            params: params.into_iter().map(Into::into).collect(),
        }
    }

    /// `PRIVMSG <target> :<text>`
    pub fn privmsg(target: &str, text: &str) -> Self {
        Self::new("PRIVMSG", [target, text])
    }

    /// `NOTICE <target> :<text>`
    pub fn notice(target: &str, text: &str) -> Self {
        Self::new("NOTICE", [target, text])
    }

    /// `PONG <server> <token>`
    pub fn pong(server: &str, token: &str) -> Self {
        Self::new("PONG", [server, token])
    }

    /// `ERROR :<reason>`
    pub fn error(reason: &str) -> Self {
        Self::new("ERROR", [reason])
    }

    /// Replace the prefix.
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = Some(prefix.into());
        self
    }

    /// Append a tag.
    pub fn with_tag(mut self, key: &str, value: Option<&str>) -> Self {
        self.tags
            .get_or_insert_with(Vec::new)
            .push(Tag::new(key, value));
        self
    }

    /// Append several tags.
    pub fn with_tags(mut self, tags: impl IntoIterator<Item = Tag>) -> Self {
        let list = self.tags.get_or_insert_with(Vec::new);
        list.extend(tags);
        if list.is_empty() {
            self.tags = None;
        }
        self
    }

    /// Value of the first tag named `key`. Valueless tags yield `Some("")`.
    pub fn tag_value(&self, key: &str) -> Option<&str> {
        self.tags
            .as_ref()?
            .iter()
            .find(|t| t.0 == key)
            .map(|t| t.value().unwrap_or(""))
    }

    /// Parameter at `index`.
    pub fn arg(&self, index: usize) -> Option<&str> {
        self.params.get(index).map(String::as_str)
    }

    /// Numeric code if the command is three ASCII digits.
    pub fn numeric(&self) -> Option<u16> {
        let b = self.command.as_bytes();
        if b.len() == 3 && b.iter().all(u8::is_ascii_digit) {
            self.command.parse().ok()
        } else {
            None
        }
    }

    /// Encode into `out`, replacing its previous contents.
    pub fn encode<'b>(&self, out: &'b mut LineBuilder) -> &'b [u8] {
        out.line(
            self.tags.as_deref().unwrap_or_default(),
            self.prefix.as_deref(),
            &self.command,
            self.params.as_slice(),
        )
    }

    /// Encode to an owned CRLF-terminated byte vector.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = LineBuilder::new();
        self.encode(&mut out).to_vec()
    }
}

impl FromStr for Message {
    type Err = ParseError;

    /// Parse one line; trailing CR/LF are ignored.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        LineRef::parse(s.trim_end_matches(['\r', '\n']).as_bytes())?.to_message()
    }
}

impl fmt::Display for Message {
    /// Writes the encoded line, CRLF included.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut out = LineBuilder::new();
        f.write_str(&String::from_utf8_lossy(self.encode(&mut out)))
    }
}
