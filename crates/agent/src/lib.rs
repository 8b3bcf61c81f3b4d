//! Trellis agent core.
//!
//! The agent expresses its runtime wiring as a graph of components
//! declared in a labeled-block configuration with referential
//! expressions. [`system::System`] owns the graph and the component
//! registry; [`components`] holds the runnable kinds; [`engine`] holds
//! the long-running collaborators behind them.

pub mod components;
pub mod engine;
pub mod errors;
pub mod http;
pub mod node;
pub mod shutdown;
pub mod system;

pub use errors::LoadError;
pub use node::AgentNode;
pub use system::{LoadDiff, System, SystemOptions};
