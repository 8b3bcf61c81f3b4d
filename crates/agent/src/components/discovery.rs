//! Discovery components: static and chain.
//!
//! Both publish the same state shape, `{ targets: [label_set] }`, holding
//! the flat resolved target list. Downstream components reference it as
//! `discovery.<kind>.<name>.targets`.

use parking_lot::Mutex;
use tokio::sync::watch;
use tokio::sync::Notify;
use tracing::debug;

use trellis_common::LabelSet;
use trellis_config::{
    decode_body, Body, ChainDiscoveryConfig, Diagnostic, Diagnostics, EvalContext, IntoValue,
    Reference, StaticDiscoveryConfig, Value,
};

use crate::components::StateChangeFn;
use crate::shutdown::cancelled;

/// `discovery "static" "<name>"`: a fixed host list.
pub struct StaticDiscovery {
    name: String,
    publisher: TargetPublisher,
}

impl StaticDiscovery {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            publisher: TargetPublisher::new(),
        }
    }

    pub fn reference(&self) -> Reference {
        Reference::discovery("static", &self.name)
    }

    pub fn evaluate(&self, ctx: &EvalContext, body: &Body) -> Result<Value, Diagnostics> {
        let cfg: StaticDiscoveryConfig = decode_body(body, ctx)?;
        self.publisher.publish(cfg.resolve());
        cfg.into_value().map_err(|err| encode_failure(err, body))
    }

    pub fn current_state(&self) -> Value {
        self.publisher.state_value()
    }

    pub async fn run(&self, cancel: watch::Receiver<bool>, on_change: StateChangeFn) {
        self.publisher
            .run(&self.reference(), cancel, on_change, false)
            .await;
    }
}

/// `discovery "chain" "<name>"`: target groups assembled from other
/// components' outputs. Emits its input once at startup and then idles
/// until reconfigured.
pub struct ChainDiscovery {
    name: String,
    publisher: TargetPublisher,
}

impl ChainDiscovery {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            publisher: TargetPublisher::new(),
        }
    }

    pub fn reference(&self) -> Reference {
        Reference::discovery("chain", &self.name)
    }

    pub fn evaluate(&self, ctx: &EvalContext, body: &Body) -> Result<Value, Diagnostics> {
        let cfg: ChainDiscoveryConfig = decode_body(body, ctx)?;
        self.publisher.publish(cfg.resolve());
        cfg.into_value().map_err(|err| encode_failure(err, body))
    }

    pub fn current_state(&self) -> Value {
        self.publisher.state_value()
    }

    pub async fn run(&self, cancel: watch::Receiver<bool>, on_change: StateChangeFn) {
        self.publisher
            .run(&self.reference(), cancel, on_change, true)
            .await;
    }
}

fn encode_failure(err: trellis_config::ValueError, body: &Body) -> Diagnostics {
    Diagnostic::error("Encoding failure", err.to_string(), body.span).into()
}

/// Shared state publication for discovery kinds: the resolved target list
/// plus a single-slot change signal consumed by the run task.
struct TargetPublisher {
    targets: Mutex<Vec<LabelSet>>,
    changed: Notify,
}

impl TargetPublisher {
    fn new() -> Self {
        Self {
            targets: Mutex::new(Vec::new()),
            changed: Notify::new(),
        }
    }

    fn publish(&self, targets: Vec<LabelSet>) {
        *self.targets.lock() = targets;
        self.changed.notify_one();
    }

    fn snapshot(&self) -> Vec<LabelSet> {
        self.targets.lock().clone()
    }

    /// The exported state: `{ targets: [label_set] }`. The shape is the
    /// same on every call; only the contents change.
    fn state_value(&self) -> Value {
        let targets = self
            .snapshot()
            .into_iter()
            .map(|labels| {
                Value::Object(
                    labels
                        .into_iter()
                        .map(|(name, value)| (name, Value::String(value)))
                        .collect(),
                )
            })
            .collect();
        Value::object([("targets".to_string(), Value::List(targets))])
    }

    async fn run(
        &self,
        reference: &Reference,
        mut cancel: watch::Receiver<bool>,
        on_change: StateChangeFn,
        announce_initial: bool,
    ) {
        let mut last = self.snapshot();
        if announce_initial && !last.is_empty() {
            on_change(reference);
        }

        loop {
            tokio::select! {
                _ = cancelled(&mut cancel) => return,
                _ = self.changed.notified() => {
                    let current = self.snapshot();
                    if current != last {
                        debug!(
                            component = %reference,
                            targets = current.len(),
                            "discovery targets updated"
                        );
                        last = current;
                        on_change(reference);
                    }
                }
            }
        }
    }
}
