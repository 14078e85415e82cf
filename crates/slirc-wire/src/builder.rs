//! Fixed-capacity line encoder.
//!
//! [`LineBuilder`] writes into an inline buffer sized for the largest legal
//! outbound line, so encoding never touches the heap. Content that does not
//! fit is cut rather than overflowing:
//!
//! - a tag that does not fit whole is dropped
//! - the parameter that crosses the 512-byte body limit is truncated at a
//!   UTF-8 boundary and any later parameters are dropped
//!
//! CR, LF and NUL are never copied out of parameter text, so a handler can
//! not smuggle a second line onto the wire.

use crate::limits::{MAX_LINE_LEN, MAX_SERVER_TAG_DATA, SEND_BUFFER_LEN};
use crate::message::Tag;
use crate::tags::{escape_byte, escaped_len};

/// Reusable outbound line buffer.
pub struct LineBuilder {
    buf: [u8; SEND_BUFFER_LEN],
    len: usize,
    truncated: bool,
}

impl Default for LineBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl LineBuilder {
    /// Create an empty builder.
    pub fn new() -> Self {
        Self {
            buf: [0; SEND_BUFFER_LEN],
            len: 0,
            truncated: false,
        }
    }

    /// Bytes of the last encoded line, CRLF included.
    pub fn as_bytes(&self) -> &[u8] {
        &self.buf[..self.len]
    }

    /// Whether the last encoded line lost content to the length limits.
    pub fn is_truncated(&self) -> bool {
        self.truncated
    }

    /// Encode `[@tags] [:prefix] COMMAND params...`.
    pub fn line<S: AsRef<str>>(
        &mut self,
        tags: &[Tag],
        prefix: Option<&str>,
        command: &str,
        params: &[S],
    ) -> &[u8] {
        self.reset();
        self.write_tags(tags);

        let body_limit = self.len + MAX_LINE_LEN - 2;
        if let Some(prefix) = prefix {
            self.put_byte(b':', body_limit);
            self.put_text(prefix, body_limit);
            self.put_byte(b' ', body_limit);
        }
        self.put_text(command, body_limit);
        self.write_params(params, body_limit);
        self.finish()
    }

    /// Numeric fast path: `:source NNN target params...`.
    ///
    /// The code is always written as three digits.
    pub fn numeric<S: AsRef<str>>(
        &mut self,
        source: &str,
        code: u16,
        target: &str,
        params: &[S],
    ) -> &[u8] {
        self.reset();
        let body_limit = MAX_LINE_LEN - 2;

        self.put_byte(b':', body_limit);
        self.put_text(source, body_limit);
        let code = code % 1000;
        let digits = [
            b'0' + (code / 100) as u8,
            b'0' + (code / 10 % 10) as u8,
            b'0' + (code % 10) as u8,
            b' ',
        ];
        for d in digits {
            self.put_byte(d, body_limit);
        }
        self.put_text(target, body_limit);
        self.write_params(params, body_limit);
        self.finish()
    }

    fn reset(&mut self) {
        self.len = 0;
        self.truncated = false;
    }

    fn finish(&mut self) -> &[u8] {
        // Body limits always leave two bytes of room for the terminator.
        self.buf[self.len] = b'\r';
        self.buf[self.len + 1] = b'\n';
        self.len += 2;
        self.as_bytes()
    }

    fn write_tags(&mut self, tags: &[Tag]) {
        if tags.is_empty() {
            return;
        }
        let start = self.len;
        let limit = start + 1 + MAX_SERVER_TAG_DATA;
        self.buf[self.len] = b'@';
        self.len += 1;

        for Tag(key, value) in tags {
            let sep = usize::from(self.len > start + 1);
            let needed = sep + key.len() + value.as_deref().map_or(0, |v| 1 + escaped_len(v));
            if key.is_empty() || self.len + needed > limit {
                self.truncated = true;
                continue;
            }
            if sep == 1 {
                self.raw(b";");
            }
            self.raw(key.as_bytes());
            if let Some(value) = value {
                self.raw(b"=");
                for b in value.bytes() {
                    match escape_byte(b) {
                        Some(esc) => self.raw(esc),
                        None => self.raw(&[b]),
                    }
                }
            }
        }

        if self.len == start + 1 {
            self.len = start;
        } else {
            self.raw(b" ");
        }
    }

    fn write_params<S: AsRef<str>>(&mut self, params: &[S], limit: usize) {
        let Some(last) = params.len().checked_sub(1) else {
            return;
        };
        for (i, param) in params.iter().enumerate() {
            let param = param.as_ref();
            let colon = i == last
                && (param.is_empty() || param.starts_with(':') || param.contains(' '));
            let mark = self.len;

            let head: &[u8] = if colon { b" :" } else { b" " };
            if self.len + head.len() > limit {
                self.truncated = true;
                return;
            }
            self.raw(head);
            let before = self.len;
            if !self.put_text(param, limit) {
                // A truncated middle parameter must still be non-empty.
                if self.len == before && !colon {
                    self.len = mark;
                }
                return;
            }
        }
    }

    #[inline]
    fn raw(&mut self, bytes: &[u8]) {
        self.buf[self.len..self.len + bytes.len()].copy_from_slice(bytes);
        self.len += bytes.len();
    }

    fn put_byte(&mut self, b: u8, limit: usize) {
        if self.len < limit {
            self.buf[self.len] = b;
            self.len += 1;
        } else {
            self.truncated = true;
        }
    }

    /// Copy `text` up to `limit`, dropping line-breaking characters and
    /// stopping at a character boundary. Returns `false` if it was cut.
    fn put_text(&mut self, text: &str, limit: usize) -> bool {
        for c in text.chars() {
            if matches!(c, '\r' | '\n' | '\0') {
                continue;
            }
            let mut utf8 = [0u8; 4];
            let encoded = c.encode_utf8(&mut utf8).as_bytes();
            if self.len + encoded.len() > limit {
                self.truncated = true;
                return false;
            }
            self.raw(encoded);
        }
        true
    }
}
