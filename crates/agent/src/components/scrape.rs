//! Scrape component: binds a scrape job to its resolved target set.
//!
//! Unlike the upstream convention of reconciling targets separately, the
//! target set lives inside the scrape block and is bound directly to the
//! job.

use prometheus::Registry;
use tokio::sync::watch;

use trellis_config::{
    decode_body, Body, Diagnostic, Diagnostics, EvalContext, IntoValue, Reference,
    ScrapeBlockConfig, Value,
};

use crate::engine::{ScrapeDefaults, ScrapeEngine};

/// `scrape "<name>"`.
pub struct ScrapeComponent {
    name: String,
    engine: ScrapeEngine,
}

impl ScrapeComponent {
    pub fn new(name: impl Into<String>, registry: Registry, defaults: ScrapeDefaults) -> Self {
        let name = name.into();
        Self {
            engine: ScrapeEngine::new(name.clone(), registry, defaults),
            name,
        }
    }

    pub fn reference(&self) -> Reference {
        Reference::scrape(&self.name)
    }

    /// Update the root-level scrape defaults; a no-op when unchanged.
    pub fn set_defaults(&self, defaults: ScrapeDefaults) {
        self.engine.set_defaults(defaults);
    }

    pub fn evaluate(&self, ctx: &EvalContext, body: &Body) -> Result<Value, Diagnostics> {
        let cfg: ScrapeBlockConfig = decode_body(body, ctx)?;
        self.engine.configure(cfg.targets.clone());
        cfg.into_value().map_err(|err| {
            Diagnostics::from(Diagnostic::error(
                "Encoding failure",
                err.to_string(),
                body.span,
            ))
        })
    }

    pub async fn run(&self, cancel: watch::Receiver<bool>) {
        self.engine.run(cancel).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use trellis_config::parse_file;

    #[test]
    fn evaluate_configures_the_engine() {
        let component = ScrapeComponent::new("s", Registry::new(), ScrapeDefaults::default());
        let body = parse_file("targets = [{ __address__ = \"a:1\" }]\n").unwrap().body;

        let value = component.evaluate(&EvalContext::new(), &body).unwrap();

        assert!(value.as_object().unwrap().contains_key("targets"));
        assert_eq!(component.engine.snapshot_targets().len(), 1);
    }

    #[test]
    fn evaluate_rejects_a_bad_target_shape() {
        let component = ScrapeComponent::new("s", Registry::new(), ScrapeDefaults::default());
        let body = parse_file("targets = \"nope\"\n").unwrap().body;

        let err = component.evaluate(&EvalContext::new(), &body).unwrap_err();
        assert!(err.has_errors());
    }
}
