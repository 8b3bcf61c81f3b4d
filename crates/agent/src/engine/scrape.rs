//! Scrape engine: collects metrics from the bound target set.
//!
//! The engine owns the scrape loop for one `scrape` component. The
//! collection backend itself stays behind this boundary; the rest of the
//! system only sees the reconfiguration contract and the exported metrics.

use std::time::Duration;

use parking_lot::Mutex;
use prometheus::{IntCounterVec, IntGaugeVec, Opts, Registry};
use tokio::sync::watch;
use tokio::sync::Notify;
use tokio::time::{interval, Interval, MissedTickBehavior};
use tracing::{debug, error, info};

use trellis_common::{LabelSet, ScopedCollectors};

use crate::shutdown::cancelled;

/// Global scrape settings inherited from the root block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScrapeDefaults {
    pub interval: Duration,
    pub timeout: Duration,
}

impl Default for ScrapeDefaults {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(60),
            timeout: Duration::from_secs(10),
        }
    }
}

#[derive(Debug)]
struct ScrapeShared {
    defaults: ScrapeDefaults,
    targets: Vec<LabelSet>,
    configured: bool,
}

/// The long-running scrape collaborator for one scrape job.
pub struct ScrapeEngine {
    job: String,
    registry: Registry,
    shared: Mutex<ScrapeShared>,
    reload: Notify,
}

impl ScrapeEngine {
    pub fn new(job: impl Into<String>, registry: Registry, defaults: ScrapeDefaults) -> Self {
        Self {
            job: job.into(),
            registry,
            shared: Mutex::new(ScrapeShared {
                defaults,
                targets: Vec::new(),
                configured: false,
            }),
            reload: Notify::new(),
        }
    }

    /// Atomically store a new target set and signal the run loop. If a
    /// reload is already pending it subsumes this one.
    pub fn configure(&self, targets: Vec<LabelSet>) {
        let mut shared = self.shared.lock();
        shared.targets = targets;
        shared.configured = true;
        drop(shared);
        self.reload.notify_one();
    }

    /// Update the inherited defaults, re-applying the configuration if one
    /// is already active.
    pub fn set_defaults(&self, defaults: ScrapeDefaults) {
        let mut shared = self.shared.lock();
        if shared.defaults == defaults {
            return;
        }
        shared.defaults = defaults;
        let configured = shared.configured;
        drop(shared);
        if configured {
            self.reload.notify_one();
        }
    }

    /// Run the engine until cancelled. Metrics registered here are scoped
    /// to this invocation and unregistered on every exit path.
    pub async fn run(&self, mut cancel: watch::Receiver<bool>) {
        let mut scoped = ScopedCollectors::new(self.registry.clone());
        let (target_gauge, cycle_counter) = match register_metrics(&mut scoped) {
            Ok(collectors) => collectors,
            Err(err) => {
                error!(scrape = %self.job, error = %err, "failed to register scrape metrics");
                return;
            }
        };

        let mut ticker: Option<Interval> = None;
        let mut target_count = 0usize;

        loop {
            tokio::select! {
                _ = cancelled(&mut cancel) => {
                    info!(scrape = %self.job, "scrape engine stopped");
                    return;
                }
                _ = self.reload.notified() => {
                    let (defaults, count) = {
                        let shared = self.shared.lock();
                        (shared.defaults, shared.targets.len())
                    };
                    target_count = count;
                    target_gauge
                        .with_label_values(&[&self.job])
                        .set(target_count as i64);

                    let mut tick = interval(defaults.interval);
                    tick.set_missed_tick_behavior(MissedTickBehavior::Skip);
                    ticker = Some(tick);

                    info!(
                        scrape = %self.job,
                        targets = target_count,
                        interval = ?defaults.interval,
                        "applied scrape configuration"
                    );
                }
                _ = next_tick(&mut ticker) => {
                    cycle_counter.with_label_values(&[&self.job]).inc();
                    debug!(scrape = %self.job, targets = target_count, "scrape cycle");
                }
            }
        }
    }

    #[cfg(test)]
    pub(crate) fn snapshot_targets(&self) -> Vec<LabelSet> {
        self.shared.lock().targets.clone()
    }
}

fn register_metrics(
    scoped: &mut ScopedCollectors,
) -> Result<(IntGaugeVec, IntCounterVec), prometheus::Error> {
    let target_gauge = scoped.register(IntGaugeVec::new(
        Opts::new(
            "trellis_scrape_targets",
            "Number of targets bound to the scrape job.",
        ),
        &["scrape"],
    )?)?;
    let cycle_counter = scoped.register(IntCounterVec::new(
        Opts::new(
            "trellis_scrape_cycles_total",
            "Completed scrape cycles per job.",
        ),
        &["scrape"],
    )?)?;
    Ok((target_gauge, cycle_counter))
}

/// Wait for the next scrape tick; pends forever until configured.
async fn next_tick(ticker: &mut Option<Interval>) {
    match ticker {
        Some(interval) => {
            interval.tick().await;
        }
        None => std::future::pending().await,
    }
}
