//! Load-time error type for the agent.

use std::path::PathBuf;

use thiserror::Error;
use trellis_config::{Diagnostics, Reference, ShapeConflict};
use trellis_dag::GraphError;

/// Errors from [`crate::system::System::load`].
///
/// Parse, decode, and evaluation problems arrive as rendered diagnostic
/// reports; the remaining variants are internal invariant violations that
/// indicate a bug rather than a bad configuration.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("reading config file {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid configuration\n{report}")]
    Invalid {
        diagnostics: Diagnostics,
        report: String,
    },

    #[error("wiring the component graph: {0}")]
    Graph(#[from] GraphError),

    #[error("building the variable tree: {0}")]
    Shape(#[from] ShapeConflict),

    /// A graph node had no recorded body. Bodies are registered alongside
    /// nodes, so this cannot happen for a well-formed load.
    #[error("no body recorded for component {reference}")]
    MissingBody { reference: Reference },

    /// A component's input and state objects share a field name.
    #[error("component {reference}: input and state both define the field {field:?}")]
    MergeConflict { reference: Reference, field: String },

    /// A component published something other than an object.
    #[error("component {reference} published a non-object {kind} value as {what}")]
    NonObjectValue {
        reference: Reference,
        what: &'static str,
        kind: &'static str,
    },

    /// Some components were never reached by the topological walk, which
    /// means the reference wiring produced a cycle.
    #[error("configuration contains a reference cycle through: {nodes}")]
    Cycle { nodes: String },
}

impl LoadError {
    /// Wrap diagnostics with their rendered report.
    pub fn invalid(diagnostics: Diagnostics, file_name: &str, source: &str) -> Self {
        let report = diagnostics.render(file_name, source);
        LoadError::Invalid {
            diagnostics,
            report,
        }
    }
}
