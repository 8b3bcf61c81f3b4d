//! Remote-write component: configures where collected samples are shipped.

use std::path::PathBuf;

use prometheus::Registry;
use tokio::sync::watch;

use trellis_config::{
    decode_body, Body, Diagnostic, Diagnostics, EvalContext, IntoValue, Reference,
    RemoteWriteBlockConfig, Value,
};

use crate::engine::RemoteWriteEngine;

/// `remote_write "<name>"`.
pub struct RemoteWriteComponent {
    name: String,
    engine: RemoteWriteEngine,
}

impl RemoteWriteComponent {
    pub fn new(name: impl Into<String>, wal_dir: PathBuf, registry: Registry) -> Self {
        let name = name.into();
        Self {
            engine: RemoteWriteEngine::new(name.clone(), wal_dir, registry),
            name,
        }
    }

    pub fn reference(&self) -> Reference {
        Reference::remote_write(&self.name)
    }

    pub fn evaluate(&self, ctx: &EvalContext, body: &Body) -> Result<Value, Diagnostics> {
        let cfg: RemoteWriteBlockConfig = decode_body(body, ctx)?;
        self.engine.configure(cfg.clone());
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
    fn evaluate_returns_the_encoded_input() {
        let component = RemoteWriteComponent::new(
            "primary",
            PathBuf::from("/tmp/trellis-test-wal"),
            Registry::new(),
        );
        let body = parse_file("url = \"https://example/push\"\n").unwrap().body;

        let value = component.evaluate(&EvalContext::new(), &body).unwrap();
        let fields = value.as_object().unwrap();
        assert_eq!(
            fields.get("url").and_then(Value::as_str),
            Some("https://example/push")
        );
    }

    #[test]
    fn evaluate_requires_the_url() {
        let component = RemoteWriteComponent::new(
            "primary",
            PathBuf::from("/tmp/trellis-test-wal"),
            Registry::new(),
        );
        let body = parse_file("").unwrap().body;

        let err = component.evaluate(&EvalContext::new(), &body).unwrap_err();
        assert!(err.to_string().contains("missing required attribute \"url\""));
    }
}
