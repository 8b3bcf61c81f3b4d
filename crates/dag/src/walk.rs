//! Graph walks: forward, reverse, and topological.

use std::collections::{HashMap, HashSet};

use crate::{Graph, Node};

impl<N: Node> Graph<N> {
    /// Depth-first search over outgoing edges for all nodes in `start`. The
    /// visitor is invoked once per reachable node in unspecified order; the
    /// walk aborts on the first visitor error.
    pub fn walk<E>(
        &self,
        start: impl IntoIterator<Item = N>,
        mut visit: impl FnMut(&N) -> Result<(), E>,
    ) -> Result<(), E> {
        let mut visited: HashSet<N> = HashSet::new();
        let mut unchecked: Vec<N> = start.into_iter().collect();

        while let Some(check) = unchecked.pop() {
            if !visited.insert(check.clone()) {
                continue;
            }
            visit(&check)?;

            if let Some(outs) = self.out_set(&check) {
                unchecked.extend(outs.iter().cloned());
            }
        }

        Ok(())
    }

    /// Depth-first search over incoming edges for all nodes in `start`.
    /// Otherwise identical to [`Graph::walk`].
    pub fn walk_reverse<E>(
        &self,
        start: impl IntoIterator<Item = N>,
        mut visit: impl FnMut(&N) -> Result<(), E>,
    ) -> Result<(), E> {
        let mut visited: HashSet<N> = HashSet::new();
        let mut unchecked: Vec<N> = start.into_iter().collect();

        while let Some(check) = unchecked.pop() {
            if !visited.insert(check.clone()) {
                continue;
            }
            visit(&check)?;

            if let Some(ins) = self.in_set(&check) {
                unchecked.extend(ins.iter().cloned());
            }
        }

        Ok(())
    }

    /// Walk the graph topologically in dependency order: a node is visited
    /// only after all of its outgoing neighbors have been visited.
    ///
    /// This is Kahn's algorithm seeded from [`Graph::leaves`], tracking an
    /// outstanding-dependency counter per node. The graph is left
    /// unmodified.
    pub fn walk_topological<E>(&self, mut visit: impl FnMut(&N) -> Result<(), E>) -> Result<(), E> {
        let mut visited: HashSet<N> = HashSet::new();
        let mut unchecked: Vec<N> = self.leaves();
        let mut remaining_deps: HashMap<N, usize> = HashMap::new();

        while let Some(check) = unchecked.pop() {
            if !visited.insert(check.clone()) {
                continue;
            }
            visit(&check)?;

            // Consume one outgoing edge from every dependant of check; a
            // dependant is enqueued once its last dependency was visited.
            if let Some(ins) = self.in_set(&check) {
                for node in ins {
                    let counter = remaining_deps
                        .entry(node.clone())
                        .or_insert_with(|| self.out_degree(node));
                    *counter -= 1;
                    if *counter == 0 {
                        unchecked.push(node.clone());
                    }
                }
            }
        }

        Ok(())
    }
}
