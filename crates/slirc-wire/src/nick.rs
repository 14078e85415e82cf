//! Nickname validation (RFC 2812 section 2.3.1).

/// Longest nickname accepted when no explicit limit is configured.
pub const DEFAULT_NICK_MAX_LEN: usize = 30;

#[inline]
fn is_special(c: char) -> bool {
    matches!(c, '[' | ']' | '\\' | '`' | '_' | '^' | '{' | '|' | '}')
}

/// Nickname syntax checks.
pub trait NickExt {
    /// Valid nickname of at most [`DEFAULT_NICK_MAX_LEN`] characters.
    fn is_valid_nick(&self) -> bool {
        self.is_valid_nick_len(DEFAULT_NICK_MAX_LEN)
    }

    /// Valid nickname of at most `max_len` bytes: a letter or special first,
    /// then letters, digits, specials or `-`.
    fn is_valid_nick_len(&self, max_len: usize) -> bool;
}

impl NickExt for str {
    fn is_valid_nick_len(&self, max_len: usize) -> bool {
        let mut chars = self.chars();
        let Some(first) = chars.next() else {
            return false;
        };
        self.len() <= max_len
            && (first.is_ascii_alphabetic() || is_special(first))
            && chars.all(|c| c.is_ascii_alphanumeric() || is_special(c) || c == '-')
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accepts_letters_digits_specials() {
        assert!("alice".is_valid_nick());
        assert!("[bob]".is_valid_nick());
        assert!("c-3po".is_valid_nick());
        assert!("`quote|".is_valid_nick());
    }

    #[test]
    fn test_rejects_bad_first_char_and_separators() {
        assert!(!"".is_valid_nick());
        assert!(!"1abc".is_valid_nick());
        assert!(!"-abc".is_valid_nick());
        assert!(!"a b".is_valid_nick());
        assert!(!"a!b".is_valid_nick());
        assert!(!"a:b".is_valid_nick());
    }

    #[test]
    fn test_length_limit() {
        assert!("abcde".is_valid_nick_len(5));
        assert!(!"abcdef".is_valid_nick_len(5));
        assert!(!"a".repeat(DEFAULT_NICK_MAX_LEN + 1).is_valid_nick());
    }
}
