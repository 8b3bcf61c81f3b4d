//! Graph node type for the component DAG.

use trellis_config::Reference;
use trellis_dag::Node;

/// A vertex in the component graph: the system root or one component.
///
/// The root is a dedicated variant so the system can dominate every
/// component without structural self-reference.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum AgentNode {
    Root,
    Component(Reference),
}

impl Node for AgentNode {
    fn display_name(&self) -> String {
        match self {
            AgentNode::Root => "<root>".to_string(),
            AgentNode::Component(reference) => reference.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_names_match_reference_strings() {
        assert_eq!(AgentNode::Root.display_name(), "<root>");
        assert_eq!(
            AgentNode::Component(Reference::discovery("static", "a")).display_name(),
            "discovery.static.a"
        );
    }
}
