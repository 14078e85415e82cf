//! Session identifiers.
//!
//! A UID is the server's SID followed by six base-36 characters, e.g.
//! `001AAAAAB`. UIDs are never reused for the life of the process.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// Unique identifier for a session.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Uid(Arc<str>);

impl Uid {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Uid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::ops::Deref for Uid {
    type Target = str;

    fn deref(&self) -> &str {
        &self.0
    }
}

impl std::borrow::Borrow<str> for Uid {
    fn borrow(&self) -> &str {
        &self.0
    }
}

const ALPHABET: &[u8; 36] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Hands out UIDs for one server.
#[derive(Debug)]
pub struct UidGenerator {
    sid: String,
    counter: AtomicU64,
}

impl UidGenerator {
    pub fn new(sid: impl Into<String>) -> Self {
        Self {
            sid: sid.into(),
            counter: AtomicU64::new(0),
        }
    }

    /// The next unused UID.
    pub fn next(&self) -> Uid {
        let n = self.counter.fetch_add(1, Ordering::Relaxed);
        let mut uid = String::with_capacity(self.sid.len() + 6);
        uid.push_str(&self.sid);
        uid.extend(base36_6(n).iter().map(|&b| char::from(b)));
        Uid(uid.into())
    }
}

/// Six base-36 digits, most significant first. Wraps past 36^6.
fn base36_6(mut n: u64) -> [u8; 6] {
    let mut out = [ALPHABET[0]; 6];
    for slot in out.iter_mut().rev() {
        *slot = ALPHABET[(n % 36) as usize];
        n /= 36;
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sequential_uids() {
        let generator = UidGenerator::new("001");
        assert_eq!(generator.next().as_str(), "001AAAAAA");
        assert_eq!(generator.next().as_str(), "001AAAAAB");
    }

    #[test]
    fn test_base36_digits() {
        assert_eq!(&base36_6(0), b"AAAAAA");
        assert_eq!(&base36_6(35), b"AAAAA9");
        assert_eq!(&base36_6(36), b"AAAABA");
    }

    #[test]
    fn test_uid_derefs_to_str() {
        let uid = UidGenerator::new("9XY").next();
        assert!(uid.starts_with("9XY"));
        assert_eq!(uid.len(), 9);
    }
}
