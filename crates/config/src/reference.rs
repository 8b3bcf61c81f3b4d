//! Canonical component references.
//!
//! A reference is the dotted identity of a component, e.g.
//! `discovery.static.localhost` or `scrape.metrics`. References double as
//! component identities: the segments are fixed per block kind and line up
//! with the block labels.

use std::fmt;

use crate::ast::{Traversal, TraversalStep};
use crate::diag::{Diagnostic, Diagnostics};

/// Ordered segments identifying a referenceable component.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Reference(Vec<String>);

impl Reference {
    pub fn discovery(kind: impl Into<String>, name: impl Into<String>) -> Self {
        Self(vec!["discovery".to_string(), kind.into(), name.into()])
    }

    pub fn scrape(name: impl Into<String>) -> Self {
        Self(vec!["scrape".to_string(), name.into()])
    }

    pub fn remote_write(name: impl Into<String>) -> Self {
        Self(vec!["remote_write".to_string(), name.into()])
    }

    /// A reference from raw segments. Source text goes through the
    /// schema-checked [`parse_reference`] instead; this is for callers
    /// that already hold canonical segments.
    pub fn from_segments(segments: impl IntoIterator<Item = String>) -> Self {
        Self(segments.into_iter().collect())
    }

    pub fn segments(&self) -> &[String] {
        &self.0
    }
}

impl fmt::Display for Reference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.join("."))
    }
}

/// Interpret a variable traversal as a component reference.
///
/// The supported shapes line up with the top-level blocks:
///
/// ```text
/// discovery.<kind>.<name>
/// scrape.<name>
/// remote_write.<name>
/// ```
///
/// The traversal is only parsed up to these names; excess trailing steps
/// are ignored here and followed later by expression evaluation.
pub fn parse_reference(traversal: &Traversal) -> Result<Reference, Diagnostics> {
    match traversal.root.as_str() {
        "discovery" => {
            let (kind, name) = two_attr_steps(traversal, "discovery")?;
            Ok(Reference::discovery(kind, name))
        }
        "scrape" => {
            let name = one_attr_step(traversal, "scrape")?;
            Ok(Reference::scrape(name))
        }
        "remote_write" => {
            let name = one_attr_step(traversal, "remote_write")?;
            Ok(Reference::remote_write(name))
        }
        other => Err(invalid(
            format!("{:?} is not a valid key name", other),
            traversal,
        )),
    }
}

fn two_attr_steps(traversal: &Traversal, root: &str) -> Result<(String, String), Diagnostics> {
    if traversal.steps.len() < 2 {
        return Err(invalid(
            format!(
                "{:?} must be followed by two attribute names: the discovery kind and name",
                root
            ),
            traversal,
        ));
    }
    let kind = attr_step(traversal, 0, root)?;
    let name = attr_step(traversal, 1, root)?;
    Ok((kind, name))
}

fn one_attr_step(traversal: &Traversal, root: &str) -> Result<String, Diagnostics> {
    if traversal.steps.is_empty() {
        return Err(invalid(
            format!("{:?} must be followed by the name attribute", root),
            traversal,
        ));
    }
    attr_step(traversal, 0, root)
}

fn attr_step(traversal: &Traversal, index: usize, root: &str) -> Result<String, Diagnostics> {
    match &traversal.steps[index] {
        TraversalStep::Attr { name, .. } => Ok(name.clone()),
        TraversalStep::Index { span, .. } => Err(Diagnostic::error(
            "Invalid reference",
            format!("the {:?} object does not support this operation", root),
            *span,
        )
        .into()),
    }
}

fn invalid(detail: String, traversal: &Traversal) -> Diagnostics {
    Diagnostic::error("Invalid reference", detail, traversal.span()).into()
}
