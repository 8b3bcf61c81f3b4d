//! Shared types and infrastructure for the Trellis agent.
//!
//! # Module Organization
//!
//! - [`types`]: target model shared between the config layer and the engines
//! - [`metrics`]: scoped metric registration against an explicit registry
//! - [`observability`]: logging/tracing initialization

pub mod metrics;
pub mod observability;
pub mod types;

pub use metrics::ScopedCollectors;
pub use observability::init_tracing;
pub use types::{LabelSet, TargetGroup, ADDRESS_LABEL};
