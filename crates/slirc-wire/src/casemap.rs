//! RFC 1459 casemapping.
//!
//! Besides ASCII letters, `[]\~` fold to `{}|^`. Nickname indices key on the
//! folded form so that `Foo[1]` and `foo{1}` collide.

/// Fold one byte.
#[inline]
pub const fn irc_lower_byte(b: u8) -> u8 {
    match b {
        b'A'..=b'Z' => b + 32,
        b'[' => b'{',
        b']' => b'}',
        b'\\' => b'|',
        b'~' => b'^',
        _ => b,
    }
}

/// Fold a string. Non-ASCII characters pass through unchanged.
pub fn irc_to_lower(s: &str) -> String {
    s.chars()
        .map(|c| {
            if c.is_ascii() {
                irc_lower_byte(c as u8) as char
            } else {
                c
            }
        })
        .collect()
}

/// Case-insensitive equality under RFC 1459 folding.
pub fn irc_eq(a: &str, b: &str) -> bool {
    a.len() == b.len()
        && a
            .bytes()
            .zip(b.bytes())
            .all(|(x, y)| irc_lower_byte(x) == irc_lower_byte(y))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fold_specials() {
        assert_eq!(irc_to_lower("Nick[A]\\~"), "nick{a}|^");
    }

    #[test]
    fn test_non_ascii_untouched() {
        assert_eq!(irc_to_lower("ÉLAN"), "Élan");
    }

    #[test]
    fn test_eq() {
        assert!(irc_eq("Foo[1]", "foo{1}"));
        assert!(!irc_eq("foo", "fooo"));
        assert!(!irc_eq("foo", "bar"));
    }
}
