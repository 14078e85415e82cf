//! Test server management.

use std::net::TcpListener;
use std::process::{Child, Command, Stdio};
use std::time::Duration;
use tempfile::TempDir;
use tokio::time::sleep;

/// A running `slircd` process bound to a free local port.
pub struct TestServer {
    child: Child,
    port: u16,
    websocket_port: Option<u16>,
    _dir: TempDir,
}

impl TestServer {
    /// Spawn with the default test configuration.
    #[allow(dead_code)]
    pub async fn spawn() -> anyhow::Result<Self> {
        Self::spawn_with("").await
    }

    /// Spawn with `extra` TOML appended to the base configuration.
    ///
    /// `extra` may add whole tables (`[limits]`, `[[oper]]`) but must not
    /// repeat `[server]`, `[listen]` or `[motd]`.
    #[allow(dead_code)]
    pub async fn spawn_with(extra: &str) -> anyhow::Result<Self> {
        Self::spawn_configured("", extra).await
    }

    /// Spawn with a server password required at registration.
    #[allow(dead_code)]
    pub async fn spawn_with_server_password(password: &str) -> anyhow::Result<Self> {
        Self::spawn_configured(&format!("password = \"{password}\""), "").await
    }

    /// Spawn with a WebSocket listener next to the plaintext one.
    #[allow(dead_code)]
    pub async fn spawn_with_websocket() -> anyhow::Result<Self> {
        let ws_port = free_port()?;
        let extra = format!("[websocket]\naddress = \"127.0.0.1:{ws_port}\"\n");
        let mut server = Self::spawn_configured("", &extra).await?;
        server.websocket_port = Some(ws_port);
        server.wait_for_port(ws_port).await?;
        Ok(server)
    }

    /// `server_extra` lands inside `[server]`, `extra` after every table.
    async fn spawn_configured(server_extra: &str, extra: &str) -> anyhow::Result<Self> {
        let port = free_port()?;
        let dir = tempfile::tempdir()?;
        let config_path = dir.path().join("config.toml");
        let config = format!(
            r#"
[server]
name = "test.server"
network = "TestNet"
sid = "00T"
description = "Test IRC Server"
{server_extra}

[listen]
address = "127.0.0.1:{port}"

[motd]
lines = ["Test Server"]

{extra}
"#
        );
        std::fs::write(&config_path, config)?;

        let child = Command::new(env!("CARGO_BIN_EXE_slircd"))
            .arg(&config_path)
            .env("RUST_LOG", "warn")
            .stdout(Stdio::null())
            .spawn()?;

        let server = Self {
            child,
            port,
            websocket_port: None,
            _dir: dir,
        };
        server.wait_for_port(port).await?;
        Ok(server)
    }

    async fn wait_for_port(&self, port: u16) -> anyhow::Result<()> {
        for _ in 0..50 {
            if tokio::net::TcpStream::connect(("127.0.0.1", port))
                .await
                .is_ok()
            {
                return Ok(());
            }
            sleep(Duration::from_millis(100)).await;
        }
        anyhow::bail!("Server failed to start within 5 seconds")
    }

    pub fn address(&self) -> String {
        format!("127.0.0.1:{}", self.port)
    }

    /// `ws://` URL of the WebSocket listener, when one was configured.
    #[allow(dead_code)]
    pub fn websocket_url(&self) -> Option<String> {
        self.websocket_port.map(|p| format!("ws://127.0.0.1:{p}/"))
    }

    /// Open a client connection without registering.
    pub async fn connect(&self, nick: &str) -> anyhow::Result<super::client::TestClient> {
        super::client::TestClient::connect(&self.address(), nick).await
    }

    /// Open a client connection and complete registration.
    #[allow(dead_code)]
    pub async fn connect_registered(
        &self,
        nick: &str,
    ) -> anyhow::Result<super::client::TestClient> {
        let mut client = self.connect(nick).await?;
        client.register().await?;
        Ok(client)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}

fn free_port() -> std::io::Result<u16> {
    let listener = TcpListener::bind("127.0.0.1:0")?;
    Ok(listener.local_addr()?.port())
}
