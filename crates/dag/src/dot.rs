//! DOT (Graphviz) marshalling.

use std::fmt::Write;

use crate::{Graph, Node};

/// Marshal the graph into the DOT language.
///
/// Node and edge order inside the output is unspecified; consumers that
/// diff the output should compare sorted lines.
pub fn marshal_dot<N: Node>(graph: &Graph<N>) -> String {
    let mut out = String::with_capacity(256);
    out.push_str("digraph {\n");
    out.push_str("\trankdir=\"LR\"\n");

    out.push_str("\n\t// Vertices:\n");
    for node in graph.nodes() {
        let _ = writeln!(out, "\t{}", quote(&node.display_name()));
    }

    out.push_str("\n\t// Edges:\n");
    for (from, to) in graph.edges() {
        let _ = writeln!(
            out,
            "\t{} -> {}",
            quote(&from.display_name()),
            quote(&to.display_name())
        );
    }

    out.push_str("}\n");
    out
}

fn quote(name: &str) -> String {
    let mut quoted = String::with_capacity(name.len() + 2);
    quoted.push('"');
    for ch in name.chars() {
        if ch == '"' || ch == '\\' {
            quoted.push('\\');
        }
        quoted.push(ch);
    }
    quoted.push('"');
    quoted
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::TestNode;
    use crate::Graph;

    fn sample() -> Graph<TestNode> {
        let mut g = Graph::new();
        g.add(TestNode("<root>"));
        g.add(TestNode("discovery.static.a"));
        g.add(TestNode("scrape.s"));
        g.add_edge(TestNode("<root>"), TestNode("discovery.static.a"))
            .unwrap();
        g.add_edge(TestNode("scrape.s"), TestNode("discovery.static.a"))
            .unwrap();
        g
    }

    fn sorted_lines(text: &str) -> Vec<&str> {
        let mut lines: Vec<&str> = text.lines().collect();
        lines.sort_unstable();
        lines
    }

    #[test]
    fn marshals_quoted_vertices_and_edges() {
        let dot = marshal_dot(&sample());

        assert!(dot.starts_with("digraph {"));
        assert!(dot.contains("\trankdir=\"LR\"\n"));
        assert!(dot.contains("\t\"discovery.static.a\"\n"));
        assert!(dot.contains("\t\"<root>\" -> \"discovery.static.a\"\n"));
        assert!(dot.contains("\t\"scrape.s\" -> \"discovery.static.a\"\n"));
        assert!(dot.ends_with("}\n"));
    }

    #[test]
    fn output_is_stable_modulo_iteration_order() {
        let a = marshal_dot(&sample());
        let b = marshal_dot(&sample());
        assert_eq!(sorted_lines(&a), sorted_lines(&b));
    }
}
