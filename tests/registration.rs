//! Registration state machine over a real socket.

mod common;

use common::TestServer;
use std::time::Duration;

#[tokio::test]
async fn test_welcome_burst_order() {
    let server = TestServer::spawn().await.unwrap();
    let mut client = server.connect("alice").await.unwrap();
    let burst = client.register().await.unwrap();

    let numerics: Vec<u16> = burst.iter().filter_map(|m| m.numeric()).collect();
    assert_eq!(&numerics[..5], &[1, 2, 3, 4, 5]);
    assert_eq!(numerics.last(), Some(&376));
    assert!(numerics.contains(&375));

    let welcome = &burst[0];
    assert_eq!(welcome.prefix.as_deref(), Some("test.server"));
    assert_eq!(welcome.arg(0), Some("alice"));
    assert!(welcome.arg(1).unwrap().starts_with("Welcome to the TestNet"));
}

#[tokio::test]
async fn test_commands_before_registration_are_gated() {
    let server = TestServer::spawn().await.unwrap();
    let mut client = server.connect("bob").await.unwrap();

    // Nothing sent yet: gated commands are dropped without a reply.
    client.send_raw("PRIVMSG bob :hi").await.unwrap();
    assert!(client.is_quiet(Duration::from_millis(300)).await);

    client.send_raw("NICK bob").await.unwrap();
    client.send_raw("PRIVMSG bob :hi").await.unwrap();
    let reply = client.recv().await.unwrap();
    assert_eq!(reply.numeric(), Some(451));
    assert_eq!(reply.arg(0), Some("bob"));

    client.send_raw("USER bob 0 * :Bob").await.unwrap();
    let burst = client
        .recv_until(|m| m.numeric() == Some(376))
        .await
        .unwrap();
    assert_eq!(burst[0].numeric(), Some(1));
}

#[tokio::test]
async fn test_ping_works_before_registration() {
    let server = TestServer::spawn().await.unwrap();
    let mut client = server.connect("early").await.unwrap();
    client.send_raw("PING :token123").await.unwrap();
    let pong = client.recv().await.unwrap();
    assert_eq!(pong.command, "PONG");
    assert_eq!(pong.arg(1), Some("token123"));
}

#[tokio::test]
async fn test_nickname_in_use() {
    let server = TestServer::spawn().await.unwrap();
    let _first = server.connect_registered("taken").await.unwrap();

    let mut second = server.connect("taken").await.unwrap();
    second.send_raw("NICK TAKEN").await.unwrap();
    let reply = second.recv().await.unwrap();
    assert_eq!(reply.numeric(), Some(433));
    assert_eq!(reply.arg(1), Some("TAKEN"));
}

#[tokio::test]
async fn test_cap_negotiation_holds_registration() {
    let server = TestServer::spawn().await.unwrap();
    let mut client = server.connect("capper").await.unwrap();

    client.send_raw("CAP LS 302").await.unwrap();
    client.send_raw("NICK capper").await.unwrap();
    client.send_raw("USER capper 0 * :Cap").await.unwrap();
    let ls = client.recv().await.unwrap();
    assert_eq!(ls.command, "CAP");
    assert_eq!(ls.arg(1), Some("LS"));
    assert!(client.is_quiet(Duration::from_millis(300)).await);

    client.send_raw("CAP REQ :labeled-response").await.unwrap();
    let ack = client.recv().await.unwrap();
    assert_eq!(ack.arg(1), Some("ACK"));

    client.send_raw("CAP END").await.unwrap();
    let welcome = client.recv().await.unwrap();
    assert_eq!(welcome.numeric(), Some(1));
}

#[tokio::test]
async fn test_wrong_server_password_disconnects() {
    let server = TestServer::spawn_with_server_password("letmein").await.unwrap();
    let mut client = server.connect("guest").await.unwrap();
    client.send_raw("PASS wrong").await.unwrap();
    client.send_raw("NICK guest").await.unwrap();
    client.send_raw("USER guest 0 * :Guest").await.unwrap();

    let lines = client.recv_until_closed().await.unwrap();
    assert!(lines.iter().any(|m| m.numeric() == Some(464)));
    let error = lines.iter().find(|m| m.command == "ERROR").unwrap();
    assert!(error.arg(0).unwrap().contains("Bad Password"));
    assert!(!lines.iter().any(|m| m.numeric() == Some(1)));
}

#[tokio::test]
async fn test_right_server_password_registers() {
    let server = TestServer::spawn_with_server_password("letmein").await.unwrap();
    let mut client = server.connect("member").await.unwrap();
    client.send_raw("PASS letmein").await.unwrap();
    client.register().await.unwrap();
}
