//! Property tests for the encoder/decoder pair and the framer.
//!
//! 1. Encoding a message and decoding the bytes yields the same command,
//!    parameters and trailing-ness.
//! 2. Splitting a byte stream into arbitrary chunks and framing incrementally
//!    yields exactly the lines a single pass yields.

use proptest::prelude::*;
use slirc_wire::{frame_lines, LineBuilder, LineRef, Message, Tag};

fn command_strategy() -> impl Strategy<Value = String> {
    prop_oneof![
        prop::string::string_regex("[A-Z]{1,12}").expect("valid regex"),
        prop::string::string_regex("[0-9]{3}").expect("valid regex"),
    ]
}

/// Middle parameters: non-empty, no spaces, never start with ':'.
fn middle_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[!-9;-~][!-~]{0,15}").expect("valid regex")
}

/// Final parameter: anything printable, including spaces and leading ':'.
fn trailing_strategy() -> impl Strategy<Value = String> {
    prop_oneof![
        Just(String::new()),
        Just(":".to_string()),
        Just(": leading".to_string()),
        Just("  spaced  out  ".to_string()),
        prop::string::string_regex("[ -~]{0,120}").expect("valid regex"),
    ]
}

fn tag_strategy() -> impl Strategy<Value = Tag> {
    (
        prop::string::string_regex("\\+?[a-z][a-z0-9-]{0,15}").expect("valid regex"),
        prop::option::of(prop::string::string_regex("[ -~]{0,40}").expect("valid regex")),
    )
        .prop_map(|(k, v)| Tag(k, v))
}

fn message_strategy() -> impl Strategy<Value = Message> {
    (
        prop::collection::vec(tag_strategy(), 0..4),
        prop::option::of(prop::string::string_regex("[a-z]{1,9}(![a-z]{1,9}@[a-z.]{1,20})?").expect("valid regex")),
        command_strategy(),
        prop::collection::vec(middle_strategy(), 0..6),
        prop::option::of(trailing_strategy()),
    )
        .prop_map(|(tags, prefix, command, mut params, trailing)| {
            params.extend(trailing);
            Message {
                tags: (!tags.is_empty()).then_some(tags),
                prefix,
                command,
                params,
            }
        })
}

fn needs_trailing_marker(last: &str) -> bool {
    last.is_empty() || last.starts_with(':') || last.contains(' ')
}

proptest! {
    #[test]
    fn test_encode_then_decode_preserves_message(msg in message_strategy()) {
        let mut out = LineBuilder::new();
        let bytes = msg.encode(&mut out).to_vec();
        prop_assert!(!out.is_truncated());
        prop_assert!(bytes.ends_with(b"\r\n"));

        let line = LineRef::parse(&bytes[..bytes.len() - 2]).unwrap();
        let decoded = line.to_message().unwrap();
        prop_assert_eq!(&decoded.command, &msg.command);
        prop_assert_eq!(&decoded.params, &msg.params);
        prop_assert_eq!(&decoded.prefix, &msg.prefix);
        prop_assert_eq!(&decoded.tags, &msg.tags);

        let expect_trailing = msg.params.last().is_some_and(|p| needs_trailing_marker(p));
        prop_assert_eq!(line.has_trailing(), expect_trailing);
    }

    #[test]
    fn test_parser_never_panics(bytes in prop::collection::vec(any::<u8>(), 0..600)) {
        if let Ok(line) = LineRef::parse(&bytes) {
            let _ = line.to_message();
            prop_assert!(line.params().all(|p| line.trailing() == Some(p) || !p.is_empty()));
        }
    }

    #[test]
    fn test_framing_is_segmentation_independent(
        lines in prop::collection::vec(prop::string::string_regex("[ -~]{0,40}").expect("valid regex"), 0..12),
        crlf in prop::collection::vec(any::<bool>(), 12),
        cuts in prop::collection::vec(1usize..17, 0..40),
    ) {
        let mut stream = Vec::new();
        for (i, l) in lines.iter().enumerate() {
            stream.extend_from_slice(l.as_bytes());
            stream.extend_from_slice(if crlf[i] { b"\r\n" } else { b"\n" });
        }

        let mut whole = Vec::new();
        frame_lines(&stream, stream.len(), |l| whole.push(l.to_vec()));

        let mut pieces = Vec::new();
        let mut buf: Vec<u8> = Vec::new();
        let mut pos = 0;
        let mut cuts = cuts.into_iter();
        while pos < stream.len() {
            let take = cuts.next().unwrap_or(stream.len() - pos).min(stream.len() - pos);
            buf.extend_from_slice(&stream[pos..pos + take]);
            pos += take;
            let used = frame_lines(&buf, buf.len(), |l| pieces.push(l.to_vec()));
            buf.drain(..used);
        }

        prop_assert_eq!(whole, pieces);
        prop_assert!(buf.is_empty());
    }
}
