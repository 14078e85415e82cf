//! slircd - Straylight IRC daemon core.
//!
//! Accepts clients over plaintext, TLS and WebSocket listeners, frames and
//! parses their lines, and runs each session's commands in order on its own
//! queue behind flood control and the registration state machine.

mod config;
mod error;
mod handlers;
mod http;
mod metrics;
mod network;
mod security;
mod state;
mod telemetry;

use crate::config::Config;
use crate::handlers::{Dispatcher, Registry};
use crate::network::{CertificateProvider, Gateway, PemCertificates};
use crate::security::OperPermissions;
use crate::state::Matrix;
use anyhow::Context as _;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "config.toml".to_string());

    let config = Config::load(&config_path)
        .with_context(|| format!("failed to load config from {config_path}"))?;

    telemetry::init_logging(config.server.log_format);

    if let Err(errors) = config::validation::validate(&config) {
        for e in &errors {
            error!(error = %e, "Invalid configuration");
        }
        anyhow::bail!("{} configuration error(s) in {config_path}", errors.len());
    }

    info!(
        server = %config.server.name,
        network = %config.server.network,
        sid = %config.server.sid,
        "Starting slircd"
    );

    metrics::init();

    let certs = match &config.tls {
        Some(tls) => Some(Arc::new(
            PemCertificates::load(&tls.cert_path, &tls.key_path)
                .context("failed to load TLS certificates")?,
        )),
        None => None,
    };

    let shutdown = CancellationToken::new();

    #[cfg(unix)]
    if let Some(certs) = &certs {
        spawn_reload_on_sighup(Arc::clone(certs), shutdown.clone())?;
    }

    if let Some(port) = config.server.metrics_port {
        tokio::spawn(http::run_http_server(port, shutdown.clone()));
    }

    let permissions = Arc::new(OperPermissions::new(&config.oper));
    let matrix = Arc::new(Matrix::new(config.clone(), permissions));
    let dispatcher = Arc::new(Dispatcher::new(
        Arc::clone(&matrix),
        Arc::new(Registry::new()),
    ));

    let provider = certs.map(|c| c as Arc<dyn CertificateProvider>);
    let gateway = Gateway::bind(&config, dispatcher, provider)
        .await
        .context("failed to bind listeners")?;
    info!(address = %gateway.local_addr()?, "Gateway ready");

    let gateway_task = tokio::spawn(gateway.run(shutdown.clone()));

    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for shutdown signal")?;
    info!("Shutdown requested");

    shutdown.cancel();
    matrix.close_all("Server shutting down");
    if let Err(e) = gateway_task.await {
        warn!(error = %e, "Gateway task ended abnormally");
    }
    // Give writer tasks a moment to flush the closing ERROR lines.
    tokio::time::sleep(std::time::Duration::from_millis(200)).await;
    info!("slircd stopped");
    Ok(())
}

/// Reload the TLS certificate chain and key on SIGHUP.
#[cfg(unix)]
fn spawn_reload_on_sighup(
    certs: Arc<PemCertificates>,
    shutdown: CancellationToken,
) -> anyhow::Result<()> {
    use tokio::signal::unix::{SignalKind, signal};

    let mut hangup = signal(SignalKind::hangup()).context("failed to install SIGHUP handler")?;
    tokio::spawn(async move {
        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                received = hangup.recv() => {
                    if received.is_none() {
                        break;
                    }
                    if let Err(e) = certs.reload() {
                        error!(error = %e, "TLS certificate reload failed");
                    }
                }
            }
        }
    });
    Ok(())
}
