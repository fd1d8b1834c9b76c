//! Pre-order walks over the node hierarchy.

use super::dfg::{DataflowGraph, GraphError};
use super::node::{Node, NodeKind};
use super::types::NodeId;

/// Callbacks for a pre-order walk. Internal nodes are reported before
/// their children, children in their subgraph's current order.
pub trait NodeVisitor {
    fn visit_internal(&mut self, _graph: &DataflowGraph, _node: &Node) {}
    fn visit_leaf(&mut self, graph: &DataflowGraph, node: &Node);
}

impl DataflowGraph {
    /// Walk the tree rooted at `start`, Entry/Exit included.
    pub fn walk<V: NodeVisitor + ?Sized>(&self, start: NodeId, visitor: &mut V) -> Result<(), GraphError> {
        let mut stack = vec![start];
        while let Some(id) = stack.pop() {
            let node = self.node(id)?;
            match node.kind() {
                NodeKind::Internal(graph) => {
                    visitor.visit_internal(self, node);
                    stack.extend(graph.children().iter().rev().copied());
                }
                NodeKind::Leaf => visitor.visit_leaf(self, node),
            }
        }
        Ok(())
    }

    /// Walk every tree of `roots` in order.
    pub fn walk_forest<V: NodeVisitor + ?Sized>(&self, roots: &[NodeId], visitor: &mut V) -> Result<(), GraphError> {
        for &root in roots {
            self.walk(root, visitor)?;
        }
        Ok(())
    }
}
