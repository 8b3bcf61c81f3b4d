//! Components: the runnable units declared by configuration blocks.
//!
//! The set of component kinds is closed by the grammar, so the component
//! contract is a tagged enum rather than a trait object. Every kind
//! implements the same surface:
//!
//! - `reference`/`name`: canonical identity, equal to the dotted reference
//! - `evaluate`: decode the block body against the evaluation context and
//!   stage the resulting configuration for the run task
//! - `current_state`: the exported state other components may reference,
//!   always the same shape, or `None` for kinds without exported state
//! - `run`: the long-lived task, cancelled cooperatively; it invokes the
//!   state-change callback whenever `current_state` would change

use std::sync::Arc;

use tokio::sync::watch;

use trellis_config::{Body, Diagnostics, EvalContext, Reference, Value};

pub mod discovery;
pub mod remote_write;
pub mod scrape;

pub use discovery::{ChainDiscovery, StaticDiscovery};
pub use remote_write::RemoteWriteComponent;
pub use scrape::ScrapeComponent;

/// Callback invoked by run tasks when their exported state changed.
pub type StateChangeFn = Arc<dyn Fn(&Reference) + Send + Sync>;

/// A declared component.
pub enum Component {
    DiscoveryStatic(StaticDiscovery),
    DiscoveryChain(ChainDiscovery),
    Scrape(ScrapeComponent),
    RemoteWrite(RemoteWriteComponent),
}

impl Component {
    /// The canonical reference this component is registered under.
    pub fn reference(&self) -> Reference {
        match self {
            Component::DiscoveryStatic(c) => c.reference(),
            Component::DiscoveryChain(c) => c.reference(),
            Component::Scrape(c) => c.reference(),
            Component::RemoteWrite(c) => c.reference(),
        }
    }

    /// Display name; equal to the canonical reference string.
    pub fn name(&self) -> String {
        self.reference().to_string()
    }

    /// Evaluate the component's body against the context, staging the new
    /// configuration for the run task, and return the encoded input value.
    pub fn evaluate(&self, ctx: &EvalContext, body: &Body) -> Result<Value, Diagnostics> {
        match self {
            Component::DiscoveryStatic(c) => c.evaluate(ctx, body),
            Component::DiscoveryChain(c) => c.evaluate(ctx, body),
            Component::Scrape(c) => c.evaluate(ctx, body),
            Component::RemoteWrite(c) => c.evaluate(ctx, body),
        }
    }

    /// The component's exported state, if it has any.
    pub fn current_state(&self) -> Option<Value> {
        match self {
            Component::DiscoveryStatic(c) => Some(c.current_state()),
            Component::DiscoveryChain(c) => Some(c.current_state()),
            // Scrape and remote_write export no referenceable state.
            Component::Scrape(_) | Component::RemoteWrite(_) => None,
        }
    }

    /// Run the component until cancelled.
    pub async fn run(&self, cancel: watch::Receiver<bool>, on_change: StateChangeFn) {
        match self {
            Component::DiscoveryStatic(c) => c.run(cancel, on_change).await,
            Component::DiscoveryChain(c) => c.run(cancel, on_change).await,
            Component::Scrape(c) => c.run(cancel).await,
            Component::RemoteWrite(c) => c.run(cancel).await,
        }
    }
}
