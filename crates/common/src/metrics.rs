//! Scoped metric registration against an explicit registry.
//!
//! Component run tasks register their collectors through a
//! [`ScopedCollectors`], which unregisters everything it registered when it
//! is dropped. Run tasks come and go across reloads; without scoping, a
//! replaced component would leave its collectors behind in the registry.

use prometheus::core::Collector;
use prometheus::Registry;
use tracing::warn;

/// Tracks collectors registered against a registry and unregisters them all
/// on drop.
pub struct ScopedCollectors {
    registry: Registry,
    registered: Vec<Box<dyn Collector>>,
}

impl ScopedCollectors {
    /// Create a new scope over the given registry.
    pub fn new(registry: Registry) -> Self {
        Self {
            registry,
            registered: Vec::new(),
        }
    }

    /// Register a collector, remembering it for unregistration.
    ///
    /// Returns the collector so callers can keep using it directly.
    pub fn register<C>(&mut self, collector: C) -> Result<C, prometheus::Error>
    where
        C: Collector + Clone + 'static,
    {
        self.registry.register(Box::new(collector.clone()))?;
        self.registered.push(Box::new(collector.clone()));
        Ok(collector)
    }
}

impl Drop for ScopedCollectors {
    fn drop(&mut self) {
        for collector in self.registered.drain(..) {
            if let Err(err) = self.registry.unregister(collector) {
                warn!(error = %err, "failed to unregister scoped collector");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use prometheus::{IntGauge, Opts};

    #[test]
    fn drop_unregisters_collectors() {
        let registry = Registry::new();

        {
            let mut scoped = ScopedCollectors::new(registry.clone());
            let gauge = scoped
                .register(IntGauge::with_opts(Opts::new("test_gauge", "help")).unwrap())
                .unwrap();
            gauge.set(3);
            assert_eq!(registry.gather().len(), 1);
        }

        // Scope dropped, the registry is empty again and the same collector
        // can be registered anew.
        assert!(registry.gather().is_empty());
        let mut scoped = ScopedCollectors::new(registry.clone());
        scoped
            .register(IntGauge::with_opts(Opts::new("test_gauge", "help")).unwrap())
            .unwrap();
        assert_eq!(registry.gather().len(), 1);
    }
}
