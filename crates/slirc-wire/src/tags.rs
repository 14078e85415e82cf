//! IRCv3 tag value escaping.
//!
//! | raw        | escaped |
//! |------------|---------|
//! | `;`        | `\:`    |
//! | space      | `\s`    |
//! | `\`        | `\\`    |
//! | CR         | `\r`    |
//! | LF         | `\n`    |

/// Escape sequence for a byte, or `None` if it is written as-is.
#[inline]
pub(crate) fn escape_byte(b: u8) -> Option<&'static [u8; 2]> {
    match b {
        b';' => Some(b"\\:"),
        b' ' => Some(b"\\s"),
        b'\\' => Some(b"\\\\"),
        b'\r' => Some(b"\\r"),
        b'\n' => Some(b"\\n"),
        _ => None,
    }
}

/// Length of `value` once escaped.
pub fn escaped_len(value: &str) -> usize {
    value
        .bytes()
        .map(|b| if escape_byte(b).is_some() { 2 } else { 1 })
        .sum()
}

/// Escape a tag value for the wire.
pub fn escape_tag_value(value: &str) -> String {
    let mut out = String::with_capacity(escaped_len(value));
    for c in value.chars() {
        match c {
            ';' => out.push_str("\\:"),
            ' ' => out.push_str("\\s"),
            '\\' => out.push_str("\\\\"),
            '\r' => out.push_str("\\r"),
            '\n' => out.push_str("\\n"),
            c => out.push(c),
        }
    }
    out
}

/// Reverse [`escape_tag_value`].
///
/// A lone trailing backslash is dropped; an unknown escape yields the escaped
/// character itself.
pub fn unescape_tag_value(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut chars = value.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some(':') => out.push(';'),
            Some('s') => out.push(' '),
            Some('r') => out.push('\r'),
            Some('n') => out.push('\n'),
            Some(other) => out.push(other),
            None => break,
        }
    }
    out
}
