//! Parser behaviour on hand-picked lines.

use slirc_wire::{LineRef, Message, ParseError};

#[test]
fn test_tagged_prefixed_privmsg() {
    let line = LineRef::parse(b"@id=1 :nick!u@h PRIVMSG #c :hello there").unwrap();
    let msg = line.to_message().unwrap();
    assert_eq!(line.tags(), Some(&b"id=1"[..]));
    assert_eq!(msg.prefix.as_deref(), Some("nick!u@h"));
    assert_eq!(msg.command, "PRIVMSG");
    assert_eq!(msg.params, vec!["#c", "hello there"]);
}

#[test]
fn test_quit_without_params() {
    let msg: Message = "QUIT".parse().unwrap();
    assert!(msg.params.is_empty());
}

#[test]
fn test_empty_tag_block_and_prefix_fail() {
    assert_eq!(LineRef::parse(b"@ :prefix CMD").unwrap_err(), ParseError::EmptyTags);
    assert_eq!(LineRef::parse(b": CMD").unwrap_err(), ParseError::EmptyPrefix);
}

#[test]
fn test_middle_params_are_never_empty() {
    let msg: Message = "MODE   #c    +b   :".parse().unwrap();
    assert_eq!(msg.params, vec!["#c", "+b", ""]);
}

#[test]
fn test_cap_req_trailing_list() {
    let msg: Message = "CAP REQ :labeled-response message-tags".parse().unwrap();
    assert_eq!(msg.arg(0), Some("REQ"));
    assert_eq!(msg.arg(1), Some("labeled-response message-tags"));
}
