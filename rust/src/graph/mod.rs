//! Hierarchical dataflow graph model.
//!
//! Nodes are either Internal (owning a nested subgraph with its own Entry and
//! Exit dummies) or Leaf. Every node of a forest lives in one arena,
//! [`DataflowGraph`], and is addressed by [`NodeId`].

mod dfg;
mod edge;
mod node;
mod traversal;
mod types;
mod validate;

pub use dfg::{DataflowGraph, GraphError};
pub use edge::Edge;
pub use node::{Node, NodeKind, NodeSpec, Subgraph};
pub use traversal::NodeVisitor;
pub use types::{DimLimit, Dimensions, EdgeId, EdgeKind, FunctionRef, NodeId, Target, MAX_DIMENSIONS};
