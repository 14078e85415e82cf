//! Test IRC client.

use slirc_wire::{LineRef, Message};
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::time::timeout;

/// A line-oriented IRC client for integration tests.
pub struct TestClient {
    reader: BufReader<OwnedReadHalf>,
    writer: OwnedWriteHalf,
    nick: String,
}

impl TestClient {
    pub async fn connect(address: &str, nick: &str) -> anyhow::Result<Self> {
        let stream = TcpStream::connect(address).await?;
        let (read_half, write_half) = stream.into_split();
        Ok(Self {
            reader: BufReader::new(read_half),
            writer: write_half,
            nick: nick.to_string(),
        })
    }

    /// Send one line, appending CRLF when missing.
    pub async fn send_raw(&mut self, line: &str) -> anyhow::Result<()> {
        let mut data = line.as_bytes().to_vec();
        if !line.ends_with('\n') {
            data.extend_from_slice(b"\r\n");
        }
        self.writer.write_all(&data).await?;
        Ok(())
    }

    /// Write bytes exactly as given.
    #[allow(dead_code)]
    pub async fn send_bytes(&mut self, data: &[u8]) -> anyhow::Result<()> {
        self.writer.write_all(data).await?;
        Ok(())
    }

    pub async fn recv(&mut self) -> anyhow::Result<Message> {
        self.recv_timeout(Duration::from_secs(5)).await
    }

    /// Receive one message; errors on timeout or when the server hangs up.
    pub async fn recv_timeout(&mut self, dur: Duration) -> anyhow::Result<Message> {
        let mut line = String::new();
        let read = timeout(dur, self.reader.read_line(&mut line)).await??;
        if read == 0 {
            anyhow::bail!("connection closed");
        }
        let trimmed = line.trim_end_matches(['\r', '\n']);
        LineRef::parse(trimmed.as_bytes())
            .and_then(|l| l.to_message())
            .map_err(|e| anyhow::anyhow!("parse error on {trimmed:?}: {e}"))
    }

    /// Receive until `predicate` matches; returns everything read.
    pub async fn recv_until<F>(&mut self, mut predicate: F) -> anyhow::Result<Vec<Message>>
    where
        F: FnMut(&Message) -> bool,
    {
        let mut messages = Vec::new();
        loop {
            let msg = self.recv().await?;
            let done = predicate(&msg);
            messages.push(msg);
            if done {
                return Ok(messages);
            }
        }
    }

    /// Whether nothing arrives within `dur`.
    #[allow(dead_code)]
    pub async fn is_quiet(&mut self, dur: Duration) -> bool {
        let mut line = String::new();
        timeout(dur, self.reader.read_line(&mut line)).await.is_err()
    }

    /// Read until the server closes the connection; returns what was read.
    ///
    /// A reset counts as closed. Only a timeout is an error.
    #[allow(dead_code)]
    pub async fn recv_until_closed(&mut self) -> anyhow::Result<Vec<Message>> {
        let mut messages = Vec::new();
        loop {
            match self.recv().await {
                Ok(msg) => messages.push(msg),
                Err(e) if e.is::<tokio::time::error::Elapsed>() => return Err(e),
                Err(_) => return Ok(messages),
            }
        }
    }

    /// NICK + USER, then wait for the end of the MOTD.
    pub async fn register(&mut self) -> anyhow::Result<Vec<Message>> {
        let nick = self.nick.clone();
        self.send_raw(&format!("NICK {nick}")).await?;
        self.send_raw(&format!("USER {nick} 0 * :Test User {nick}"))
            .await?;
        let messages = self
            .recv_until(|m| matches!(m.numeric(), Some(376) | Some(422)))
            .await?;
        if !messages.iter().any(|m| m.numeric() == Some(1)) {
            anyhow::bail!("Registration failed: no RPL_WELCOME received");
        }
        Ok(messages)
    }
}
