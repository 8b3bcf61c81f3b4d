//! Transitive reduction.

use crate::{Graph, Node};

impl<N: Node> Graph<N> {
    /// Transitively reduce the graph: remove as many edges as possible while
    /// preserving reachability. On a DAG the result is the unique minimum
    /// equivalent graph.
    ///
    /// A direct edge `u -> v'` is redundant when `v'` is also reachable from
    /// `u` through some other dependency, i.e. a path `u -> v -> .. -> v'`
    /// of length >= 2 exists. For every node we depth-first search from its
    /// direct dependencies and drop every `u -> v'` where a visited node
    /// also has `v'` as a direct dependency.
    pub fn reduce(&mut self) {
        let nodes: Vec<N> = self.nodes().cloned().collect();

        for u in nodes {
            let deps: Vec<N> = self.dependencies(&u).cloned().collect();

            // Collect first, remove after: removals only ever touch edges
            // out of u, and u is unreachable from its own dependencies on a
            // DAG, so the walk never observes the mutation.
            let mut redundant: Vec<N> = Vec::new();
            let _ = self.walk(deps, |v| -> Result<(), ()> {
                redundant.extend(self.dependencies(v).cloned());
                Ok(())
            });

            for v_prime in redundant {
                self.remove_edge(&u, &v_prime);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use crate::testutil::TestNode;
    use crate::Graph;

    fn n(label: &'static str) -> TestNode {
        TestNode(label)
    }

    fn reachable(g: &Graph<TestNode>, from: &TestNode) -> HashSet<&'static str> {
        let mut seen = HashSet::new();
        g.walk([from.clone()], |node| -> Result<(), ()> {
            seen.insert(node.0);
            Ok(())
        })
        .unwrap();
        seen
    }

    #[test]
    fn reduce_drops_shortcut_edges() {
        // root->a, root->b, root->c, b->a, c->b, c->a.
        let mut g = Graph::new();
        for label in ["root", "a", "b", "c"] {
            g.add(n(label));
        }
        g.add_edge(n("root"), n("a")).unwrap();
        g.add_edge(n("root"), n("b")).unwrap();
        g.add_edge(n("root"), n("c")).unwrap();
        g.add_edge(n("b"), n("a")).unwrap();
        g.add_edge(n("c"), n("b")).unwrap();
        g.add_edge(n("c"), n("a")).unwrap();

        g.reduce();

        let mut edges: Vec<(&str, &str)> = g.edges().iter().map(|(f, t)| (f.0, t.0)).collect();
        edges.sort_unstable();
        assert_eq!(edges, [("b", "a"), ("c", "b"), ("root", "c")]);
    }

    #[test]
    fn reduce_preserves_reachability() {
        let mut g = Graph::new();
        for label in ["root", "a", "b", "c", "d"] {
            g.add(n(label));
        }
        g.add_edge(n("root"), n("a")).unwrap();
        g.add_edge(n("root"), n("b")).unwrap();
        g.add_edge(n("root"), n("d")).unwrap();
        g.add_edge(n("a"), n("c")).unwrap();
        g.add_edge(n("b"), n("c")).unwrap();
        g.add_edge(n("a"), n("d")).unwrap();
        g.add_edge(n("d"), n("c")).unwrap();

        let before: Vec<HashSet<&str>> = ["root", "a", "b", "c", "d"]
            .iter()
            .map(|l| reachable(&g, &n(l)))
            .collect();

        g.reduce();

        let after: Vec<HashSet<&str>> = ["root", "a", "b", "c", "d"]
            .iter()
            .map(|l| reachable(&g, &n(l)))
            .collect();
        assert_eq!(before, after);

        // No surviving edge admits an alternative path of length >= 2.
        for (from, to) in g.edges() {
            let mut without = g.clone();
            without.remove_edge(&from, &to);
            assert!(
                !reachable(&without, &from).contains(to.0),
                "edge {} -> {} is still redundant",
                from.0,
                to.0
            );
        }
    }

    #[test]
    fn reduce_keeps_plain_chain_intact() {
        let mut g = Graph::new();
        for label in ["a", "b", "c"] {
            g.add(n(label));
        }
        g.add_edge(n("a"), n("b")).unwrap();
        g.add_edge(n("b"), n("c")).unwrap();

        g.reduce();
        assert_eq!(g.edges().len(), 2);
    }
}
