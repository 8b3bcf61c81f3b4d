//! Long-running collaborator engines.
//!
//! Engines sit behind the components and keep running between loads. They
//! all follow the same reconfiguration contract: `configure` stores the
//! new configuration and nudges a single-slot reload signal, and the run
//! loop snapshots and applies it. Bursts of reconfiguration coalesce so at
//! most one reload is ever pending.

pub mod remote_write;
pub mod scrape;

pub use remote_write::RemoteWriteEngine;
pub use scrape::{ScrapeDefaults, ScrapeEngine};
