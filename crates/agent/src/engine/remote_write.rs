//! Remote-write engine: ships collected samples to a remote endpoint.
//!
//! Owns the write-ahead log directory handed to it at construction; the
//! core holds no persistent state of its own. The shipping backend stays
//! behind this boundary.

use std::path::PathBuf;

use parking_lot::Mutex;
use prometheus::{IntGaugeVec, Opts, Registry};
use tokio::sync::watch;
use tokio::sync::Notify;
use tracing::{error, info, warn};

use trellis_common::ScopedCollectors;
use trellis_config::RemoteWriteBlockConfig;

use crate::shutdown::cancelled;

/// The long-running remote-write collaborator for one endpoint.
pub struct RemoteWriteEngine {
    name: String,
    wal_dir: PathBuf,
    registry: Registry,
    config: Mutex<Option<RemoteWriteBlockConfig>>,
    reload: Notify,
}

impl RemoteWriteEngine {
    pub fn new(name: impl Into<String>, wal_dir: PathBuf, registry: Registry) -> Self {
        Self {
            name: name.into(),
            wal_dir,
            registry,
            config: Mutex::new(None),
            reload: Notify::new(),
        }
    }

    /// Atomically store a new configuration and signal the run loop. If a
    /// reload is already pending it subsumes this one.
    pub fn configure(&self, config: RemoteWriteBlockConfig) {
        *self.config.lock() = Some(config);
        self.reload.notify_one();
    }

    /// Run the engine until cancelled. The WAL directory is created on
    /// startup; metrics registered here are scoped to this invocation.
    pub async fn run(&self, mut cancel: watch::Receiver<bool>) {
        if let Err(err) = tokio::fs::create_dir_all(&self.wal_dir).await {
            warn!(
                remote_write = %self.name,
                wal_dir = %self.wal_dir.display(),
                error = %err,
                "failed to create the WAL directory"
            );
        }

        let mut scoped = ScopedCollectors::new(self.registry.clone());
        let gauge = IntGaugeVec::new(
            Opts::new(
                "trellis_remote_write_configured",
                "Whether the remote_write endpoint has an active configuration.",
            ),
            &["remote_write"],
        )
        .and_then(|gauge| scoped.register(gauge));
        let configured_gauge = match gauge {
            Ok(gauge) => gauge,
            Err(err) => {
                error!(remote_write = %self.name, error = %err, "failed to register metrics");
                return;
            }
        };

        loop {
            tokio::select! {
                _ = cancelled(&mut cancel) => {
                    info!(remote_write = %self.name, "remote_write engine stopped");
                    return;
                }
                _ = self.reload.notified() => {
                    let config = self.config.lock().clone();
                    let Some(config) = config else { continue };
                    configured_gauge.with_label_values(&[&self.name]).set(1);
                    info!(
                        remote_write = %self.name,
                        url = %config.url,
                        wal_dir = %self.wal_dir.display(),
                        "applied remote_write configuration"
                    );
                }
            }
        }
    }
}
