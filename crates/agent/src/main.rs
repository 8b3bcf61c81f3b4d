//! Trellis: an experimental telemetry agent wired as a graph of
//! components. The configuration language supports expressions that
//! reference other components, and the agent can be reconfigured at
//! runtime via SIGHUP.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use prometheus::Registry;
use tokio::net::TcpListener;
use tokio::signal::unix::{signal, SignalKind};
use tokio::sync::{mpsc, watch};
use tracing::{error, info};

use trellis_agent::shutdown::{cancel_pair, cancelled};
use trellis_agent::{http, System, SystemOptions};
use trellis_common::init_tracing;

/// Trellis - a graph-configured telemetry agent
#[derive(Parser, Debug)]
#[command(name = "trellis")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the config file to load
    #[arg(long = "config.file", value_name = "PATH")]
    config_file: PathBuf,

    /// Address to listen on for HTTP traffic
    #[arg(
        long = "server.http-listen-addr",
        value_name = "ADDR",
        default_value = ":8080"
    )]
    http_listen_addr: String,

    /// Working directory for remote_write write-ahead logs
    #[arg(
        long = "storage.wal-dir",
        value_name = "PATH",
        default_value = "data-trellis/wal"
    )]
    wal_dir: PathBuf,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing()?;

    let registry = Registry::new();
    let system = Arc::new(
        System::new(
            SystemOptions {
                config_file: cli.config_file,
                wal_dir: cli.wal_dir,
            },
            registry,
        )
        .context("registering system metrics")?,
    );

    system.load().context("initial configuration load")?;

    let (shutdown_tx, shutdown_rx) = cancel_pair();
    let (reload_tx, reload_rx) = mpsc::channel(1);
    spawn_signal_watcher(shutdown_tx.clone(), reload_tx);

    // HTTP server
    let addr = normalize_listen_addr(&cli.http_listen_addr);
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to listen on {}", addr))?;
    info!(addr = %addr, "now listening for http traffic");

    let app = http::router(system.clone());
    let server = tokio::spawn({
        let mut shutdown = shutdown_rx.clone();
        let shutdown_tx = shutdown_tx.clone();
        async move {
            let result = axum::serve(listener, app)
                .with_graceful_shutdown(async move { cancelled(&mut shutdown).await })
                .await;
            if let Err(err) = result {
                error!(error = %err, "http server failed");
                let _ = shutdown_tx.send(true);
            }
        }
    });

    system.run(shutdown_rx, reload_rx).await;
    let _ = server.await;

    info!("shutdown complete");
    Ok(())
}

/// Forward OS signals to the cooperative channels: SIGINT/SIGTERM shut the
/// agent down, SIGHUP triggers a configuration reload.
fn spawn_signal_watcher(shutdown: watch::Sender<bool>, reload: mpsc::Sender<()>) {
    tokio::spawn(async move {
        let mut sigint =
            signal(SignalKind::interrupt()).expect("failed to install SIGINT handler");
        let mut sigterm =
            signal(SignalKind::terminate()).expect("failed to install SIGTERM handler");
        let mut sighup = signal(SignalKind::hangup()).expect("failed to install SIGHUP handler");

        loop {
            tokio::select! {
                _ = sigint.recv() => {
                    info!("received SIGINT, shutting down");
                    let _ = shutdown.send(true);
                    return;
                }
                _ = sigterm.recv() => {
                    info!("received SIGTERM, shutting down");
                    let _ = shutdown.send(true);
                    return;
                }
                _ = sighup.recv() => {
                    info!("received SIGHUP, triggering configuration reload");
                    // A pending reload subsumes this one.
                    let _ = reload.try_send(());
                }
            }
        }
    });
}

/// Accept bare `:port` listen addresses by binding all interfaces.
fn normalize_listen_addr(addr: &str) -> String {
    if let Some(port) = addr.strip_prefix(':') {
        format!("0.0.0.0:{}", port)
    } else {
        addr.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_bare_port_addresses() {
        assert_eq!(normalize_listen_addr(":8080"), "0.0.0.0:8080");
        assert_eq!(normalize_listen_addr("127.0.0.1:9090"), "127.0.0.1:9090");
    }
}
