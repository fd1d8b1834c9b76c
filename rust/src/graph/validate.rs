//! Structural invariant checks over a built forest.

use super::dfg::{DataflowGraph, GraphError};
use super::node::Node;
use super::traversal::NodeVisitor;
use super::types::MAX_DIMENSIONS;

/// Collects the first violation seen during a walk.
#[derive(Default)]
struct InvariantChecker {
    violation: Option<GraphError>,
}

impl InvariantChecker {
    fn fail(&mut self, node: &Node, reason: String) {
        if self.violation.is_none() {
            self.violation = Some(GraphError::InvariantViolation {
                node: node.id(),
                reason,
            });
        }
    }

    fn check_common(&mut self, graph: &DataflowGraph, node: &Node) {
        match node.parent() {
            Some(parent_id) => {
                let Ok(parent) = graph.node(parent_id) else {
                    return self.fail(node, format!("parent {parent_id} does not exist"));
                };
                if node.level() != parent.level() + 1 {
                    self.fail(
                        node,
                        format!("level {} but parent level {}", node.level(), parent.level()),
                    );
                }
                if !parent.subgraph().is_some_and(|g| g.contains(node.id())) {
                    self.fail(node, format!("not a member of parent {parent_id}"));
                }
            }
            None => {
                if !node.is_root() || node.level() != 0 {
                    self.fail(node, "parentless node is not a level-0 root".to_string());
                }
            }
        }
        if node.dimensions().count() > MAX_DIMENSIONS {
            self.fail(node, format!("{} dimensions", node.dimensions().count()));
        }
    }
}

impl NodeVisitor for InvariantChecker {
    fn visit_internal(&mut self, graph: &DataflowGraph, node: &Node) {
        self.check_common(graph, node);
        let Some(sub) = node.subgraph() else {
            return;
        };
        for dummy in [sub.entry(), sub.exit()] {
            let owned = graph
                .node(dummy)
                .is_ok_and(|d| d.parent() == Some(node.id()));
            if !sub.contains(dummy) || !owned {
                self.fail(node, format!("entry/exit {dummy} not owned by subgraph"));
            }
        }
        for &edge_id in sub.edges() {
            let Ok(edge) = graph.edge(edge_id) else {
                return self.fail(node, format!("subgraph lists removed edge {edge_id}"));
            };
            if !sub.contains(edge.source) || !sub.contains(edge.dest) {
                self.fail(node, format!("edge {edge_id} leaves the subgraph"));
                continue;
            }
            let (Ok(src), Ok(dst)) = (graph.node(edge.source), graph.node(edge.dest)) else {
                continue;
            };
            if dst.rank() < src.rank() + 1 {
                self.fail(
                    node,
                    format!("edge {edge_id}: rank {} -> {} is not increasing", src.rank(), dst.rank()),
                );
            }
        }
    }

    fn visit_leaf(&mut self, graph: &DataflowGraph, node: &Node) {
        self.check_common(graph, node);
    }
}

impl DataflowGraph {
    /// Check levels, parent membership, rank order on every edge and
    /// Entry/Exit ownership for every tree reachable from the roots.
    pub fn validate(&self) -> Result<(), GraphError> {
        let mut checker = InvariantChecker::default();
        self.walk_forest(self.roots(), &mut checker)?;
        match checker.violation {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}
