//! Node and subgraph types of the hierarchical dataflow graph.

use crate::timing::{CostModel, TaskTiming};

use super::types::{Dimensions, EdgeId, FunctionRef, NodeId, Target};

/// Construction parameters for a new node.
#[derive(Clone, Debug, Default)]
pub struct NodeSpec {
    /// Task name the node is known by (its function's name).
    pub name: String,
    pub function: Option<FunctionRef>,
    pub dimensions: Dimensions,
    /// Preferred execution backend.
    pub hint: Target,
}

impl NodeSpec {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn with_function(mut self, function: FunctionRef) -> Self {
        self.function = Some(function);
        self
    }

    pub fn with_dimensions(mut self, dimensions: Dimensions) -> Self {
        self.dimensions = dimensions;
        self
    }

    pub fn with_hint(mut self, hint: Target) -> Self {
        self.hint = hint;
        self
    }
}

/// Nested graph owned by an Internal node.
///
/// Entry and Exit are created together with the subgraph and are never
/// removed from it.
#[derive(Clone, Debug)]
pub struct Subgraph {
    pub(crate) children: Vec<NodeId>,
    pub(crate) edges: Vec<EdgeId>,
    pub(crate) entry: NodeId,
    pub(crate) exit: NodeId,
}

impl Subgraph {
    pub(crate) fn new(entry: NodeId, exit: NodeId) -> Self {
        Self {
            children: vec![entry, exit],
            edges: Vec::new(),
            entry,
            exit,
        }
    }

    /// Children in their current order (insertion order until sorted).
    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    pub fn edges(&self) -> &[EdgeId] {
        &self.edges
    }

    pub fn entry(&self) -> NodeId {
        self.entry
    }

    pub fn exit(&self) -> NodeId {
        self.exit
    }

    pub fn is_entry(&self, node: NodeId) -> bool {
        node == self.entry
    }

    pub fn is_exit(&self, node: NodeId) -> bool {
        node == self.exit
    }

    pub fn contains(&self, node: NodeId) -> bool {
        self.children.contains(&node)
    }

    /// Returns false if the node was already a member.
    pub(crate) fn add_child(&mut self, node: NodeId) -> bool {
        if self.contains(node) {
            return false;
        }
        self.children.push(node);
        true
    }

    pub(crate) fn remove_child(&mut self, node: NodeId) -> bool {
        match self.children.iter().position(|&c| c == node) {
            Some(pos) => {
                self.children.remove(pos);
                true
            }
            None => false,
        }
    }

    pub(crate) fn add_edge(&mut self, edge: EdgeId) -> bool {
        if self.edges.contains(&edge) {
            return false;
        }
        self.edges.push(edge);
        true
    }

    pub(crate) fn remove_edge(&mut self, edge: EdgeId) -> bool {
        match self.edges.iter().position(|&e| e == edge) {
            Some(pos) => {
                self.edges.remove(pos);
                true
            }
            None => false,
        }
    }
}

/// Internal nodes own a subgraph, leaves own nothing.
#[derive(Clone, Debug)]
pub enum NodeKind {
    Internal(Subgraph),
    Leaf,
}

/// A task in the hierarchical graph.
///
/// Structural fields are fixed once the graph is built; rank, tag, duration
/// slots and timing annotations change afterwards.
#[derive(Clone, Debug)]
pub struct Node {
    pub(crate) id: NodeId,
    pub(crate) name: String,
    pub(crate) function: Option<FunctionRef>,
    pub(crate) kind: NodeKind,
    /// Non-owning link to the Internal node whose subgraph holds this node.
    pub(crate) parent: Option<NodeId>,
    pub(crate) level: u32,
    pub(crate) rank: u32,
    pub(crate) is_root: bool,
    pub(crate) dimensions: Dimensions,
    pub(crate) successors: Vec<NodeId>,
    pub(crate) in_edges: Vec<EdgeId>,
    pub(crate) out_edges: Vec<EdgeId>,
    pub(crate) hint: Target,
    pub(crate) tag: Target,
    pub(crate) durations: [Option<f64>; 2],
    pub(crate) timings: [Option<TaskTiming>; 2],
}

impl Node {
    pub(crate) fn new(id: NodeId, spec: NodeSpec, parent: Option<NodeId>, level: u32) -> Self {
        Self {
            id,
            name: spec.name,
            function: spec.function,
            kind: NodeKind::Leaf,
            parent,
            level,
            rank: 0,
            is_root: false,
            dimensions: spec.dimensions,
            successors: Vec::new(),
            in_edges: Vec::new(),
            out_edges: Vec::new(),
            hint: spec.hint,
            tag: Target::None,
            durations: [None; 2],
            timings: [None; 2],
        }
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn function(&self) -> Option<FunctionRef> {
        self.function
    }

    pub fn kind(&self) -> &NodeKind {
        &self.kind
    }

    pub fn is_internal(&self) -> bool {
        matches!(self.kind, NodeKind::Internal(_))
    }

    pub fn is_leaf(&self) -> bool {
        matches!(self.kind, NodeKind::Leaf)
    }

    pub fn subgraph(&self) -> Option<&Subgraph> {
        match &self.kind {
            NodeKind::Internal(graph) => Some(graph),
            NodeKind::Leaf => None,
        }
    }

    pub(crate) fn subgraph_mut(&mut self) -> Option<&mut Subgraph> {
        match &mut self.kind {
            NodeKind::Internal(graph) => Some(graph),
            NodeKind::Leaf => None,
        }
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    /// Distance from the forest root.
    pub fn level(&self) -> u32 {
        self.level
    }

    /// Topological position among siblings.
    pub fn rank(&self) -> u32 {
        self.rank
    }

    pub fn is_root(&self) -> bool {
        self.is_root
    }

    pub fn dimensions(&self) -> &Dimensions {
        &self.dimensions
    }

    pub fn successors(&self) -> &[NodeId] {
        &self.successors
    }

    pub fn in_edges(&self) -> &[EdgeId] {
        &self.in_edges
    }

    pub fn out_edges(&self) -> &[EdgeId] {
        &self.out_edges
    }

    pub fn hint(&self) -> Target {
        self.hint
    }

    pub fn tag(&self) -> Target {
        self.tag
    }

    /// Externally supplied duration under `model`, if any.
    pub fn duration(&self, model: CostModel) -> Option<f64> {
        self.durations[model.index()]
    }

    /// Timing computed by the last scheduling walk under `model`.
    pub fn timing(&self, model: CostModel) -> Option<TaskTiming> {
        self.timings[model.index()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::types::DimLimit;

    #[test]
    fn test_subgraph_membership_is_idempotent() {
        let mut graph = Subgraph::new(NodeId(1), NodeId(2));
        assert!(graph.add_child(NodeId(3)));
        assert!(!graph.add_child(NodeId(3)));
        assert_eq!(graph.children(), &[NodeId(1), NodeId(2), NodeId(3)]);

        assert!(graph.remove_child(NodeId(3)));
        assert!(!graph.remove_child(NodeId(3)));
        assert_eq!(graph.children().len(), 2);
    }

    #[test]
    fn test_node_spec_builder() {
        let dims = Dimensions::from_limits(vec![DimLimit::Constant(16)]).unwrap();
        let spec = NodeSpec::new("kernel")
            .with_function(FunctionRef(7))
            .with_dimensions(dims)
            .with_hint(Target::Gpu);
        let node = Node::new(NodeId(0), spec, None, 0);

        assert_eq!(node.name(), "kernel");
        assert_eq!(node.function(), Some(FunctionRef(7)));
        assert_eq!(node.dimensions().count(), 1);
        assert_eq!(node.hint(), Target::Gpu);
        assert_eq!(node.tag(), Target::None);
        assert!(node.is_leaf());
        assert_eq!(node.duration(CostModel::Software), None);
        assert_eq!(node.timing(CostModel::Hardware), None);
    }
}
