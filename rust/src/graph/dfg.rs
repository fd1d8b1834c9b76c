//! Arena-backed hierarchical dataflow graph.
//!
//! All nodes and edges of a forest live in one [`DataflowGraph`] and are
//! referred to by [`NodeId`]/[`EdgeId`]. A subgraph owns its children by
//! listing their IDs; a child's `parent` field is only a lookup link back up.

use rustc_hash::FxHashSet;
use std::collections::VecDeque;
use thiserror::Error;

use crate::log_debug;
use crate::timing::{CostModel, TaskTiming};

use super::edge::Edge;
use super::node::{Node, NodeKind, NodeSpec, Subgraph};
use super::types::{EdgeId, NodeId, Target};

/// Errors raised by graph construction and queries.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GraphError {
    #[error("Unknown node: {0}")]
    UnknownNode(NodeId),
    #[error("Unknown edge: {0}")]
    UnknownEdge(EdgeId),
    #[error("Node {0} is not an internal node")]
    NotAnInternalNode(NodeId),
    #[error("Edge {from} -> {to} has an endpoint outside the subgraph of {owner}")]
    InvalidEdgeEndpoint {
        from: NodeId,
        to: NodeId,
        owner: NodeId,
    },
    #[error("Edge {from} -> {to} would create a cycle")]
    CycleDetected { from: NodeId, to: NodeId },
    #[error("Invalid dimensions: declared {count}, got {limits} limits")]
    InvalidDimensions { count: usize, limits: usize },
    #[error("Node {0} has a parent and cannot be a root")]
    ParentedRoot(NodeId),
    #[error("Node {0} is detached from the forest")]
    DetachedNode(NodeId),
    #[error("Invariant violated at {node}: {reason}")]
    InvariantViolation { node: NodeId, reason: String },
}

/// A forest of hierarchical dataflow graphs.
#[derive(Clone, Debug, Default)]
pub struct DataflowGraph {
    nodes: Vec<Node>,
    /// Removed edges leave a `None` slot so IDs stay stable.
    edges: Vec<Option<Edge>>,
    roots: Vec<NodeId>,
    verbosity: u8,
}

impl DataflowGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enable debug output for rank propagation.
    pub fn set_verbosity(&mut self, verbosity: u8) {
        self.verbosity = verbosity;
    }

    pub fn verbosity(&self) -> u8 {
        self.verbosity
    }

    // --- Construction ---

    /// Create an Internal node with no parent and mark it as a forest root.
    pub fn add_root(&mut self, spec: NodeSpec) -> NodeId {
        let id = self.create_node(spec, None, true);
        self.nodes[id.index()].is_root = true;
        self.roots.push(id);
        id
    }

    /// Create an Internal node inside the subgraph of `parent`.
    pub fn add_internal(&mut self, parent: NodeId, spec: NodeSpec) -> Result<NodeId, GraphError> {
        self.subgraph(parent)?;
        let id = self.create_node(spec, Some(parent), true);
        self.subgraph_mut(parent)?.add_child(id);
        Ok(id)
    }

    /// Create a Leaf node inside the subgraph of `parent`.
    pub fn add_leaf(&mut self, parent: NodeId, spec: NodeSpec) -> Result<NodeId, GraphError> {
        self.subgraph(parent)?;
        let id = self.create_node(spec, Some(parent), false);
        self.subgraph_mut(parent)?.add_child(id);
        Ok(id)
    }

    fn create_node(&mut self, spec: NodeSpec, parent: Option<NodeId>, internal: bool) -> NodeId {
        let level = parent.map_or(0, |p| self.nodes[p.index()].level + 1);
        let id = self.next_node_id();
        let name = spec.name.clone();
        let function = spec.function;
        self.nodes.push(Node::new(id, spec, parent, level));

        if internal {
            // Entry/Exit carry the owner's name and function, no hint.
            let dummy = || NodeSpec {
                name: name.clone(),
                function,
                ..NodeSpec::default()
            };
            let entry = self.next_node_id();
            self.nodes.push(Node::new(entry, dummy(), Some(id), level + 1));
            let exit = self.next_node_id();
            self.nodes.push(Node::new(exit, dummy(), Some(id), level + 1));
            self.nodes[id.index()].kind = NodeKind::Internal(Subgraph::new(entry, exit));
        }
        id
    }

    fn next_node_id(&self) -> NodeId {
        NodeId(self.nodes.len() as u32)
    }

    /// Declare an existing parentless Internal node a forest root.
    pub fn mark_root(&mut self, node: NodeId) -> Result<(), GraphError> {
        let entry = self.node(node)?;
        if entry.parent.is_some() {
            return Err(GraphError::ParentedRoot(node));
        }
        if !entry.is_internal() {
            return Err(GraphError::NotAnInternalNode(node));
        }
        self.nodes[node.index()].is_root = true;
        self.relevel(node);
        if !self.roots.contains(&node) {
            self.roots.push(node);
        }
        Ok(())
    }

    // --- Lookup ---

    pub fn node(&self, id: NodeId) -> Result<&Node, GraphError> {
        self.nodes.get(id.index()).ok_or(GraphError::UnknownNode(id))
    }

    fn node_mut(&mut self, id: NodeId) -> Result<&mut Node, GraphError> {
        self.nodes.get_mut(id.index()).ok_or(GraphError::UnknownNode(id))
    }

    /// Live edge by ID. Removed edges are reported as unknown.
    pub fn edge(&self, id: EdgeId) -> Result<&Edge, GraphError> {
        self.edges
            .get(id.index())
            .and_then(Option::as_ref)
            .ok_or(GraphError::UnknownEdge(id))
    }

    pub fn subgraph(&self, owner: NodeId) -> Result<&Subgraph, GraphError> {
        self.node(owner)?
            .subgraph()
            .ok_or(GraphError::NotAnInternalNode(owner))
    }

    fn subgraph_mut(&mut self, owner: NodeId) -> Result<&mut Subgraph, GraphError> {
        self.node_mut(owner)?
            .subgraph_mut()
            .ok_or(GraphError::NotAnInternalNode(owner))
    }

    /// Forest roots in declaration order.
    pub fn roots(&self) -> &[NodeId] {
        &self.roots
    }

    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.iter()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Number of edges that have not been removed.
    pub fn edge_count(&self) -> usize {
        self.edges.iter().filter(|e| e.is_some()).count()
    }

    /// Subgraph that holds `node`, if it has a parent.
    fn enclosing(&self, node: NodeId) -> Option<&Subgraph> {
        let parent = self.nodes.get(node.index())?.parent?;
        self.nodes.get(parent.index())?.subgraph()
    }

    pub fn is_entry(&self, node: NodeId) -> bool {
        self.enclosing(node).is_some_and(|g| g.is_entry(node))
    }

    pub fn is_exit(&self, node: NodeId) -> bool {
        self.enclosing(node).is_some_and(|g| g.is_exit(node))
    }

    pub fn is_dummy(&self, node: NodeId) -> bool {
        self.is_entry(node) || self.is_exit(node)
    }

    /// Whether any edge of `owner`'s subgraph is streaming.
    pub fn is_streaming(&self, owner: NodeId) -> Result<bool, GraphError> {
        let graph = self.subgraph(owner)?;
        for &id in graph.edges() {
            if self.edge(id)?.streaming {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Number of parent hops from `node` up to `ancestor`, or `None` when
    /// `ancestor` is not on the parent chain. A node is its own ancestor at 0.
    pub fn ancestor_distance(&self, node: NodeId, ancestor: NodeId) -> Option<u32> {
        let mut current = Some(node);
        let mut hops = 0;
        while let Some(id) = current {
            if id == ancestor {
                return Some(hops);
            }
            current = self.nodes.get(id.index())?.parent;
            hops += 1;
        }
        None
    }

    // --- Membership ---

    /// Add `child` to `owner`'s subgraph. Idempotent.
    ///
    /// A node that lives in another subgraph is moved: its edges in the old
    /// subgraph are removed, then its parent link and the levels of its
    /// whole subtree are updated.
    pub fn add_child(&mut self, owner: NodeId, child: NodeId) -> Result<bool, GraphError> {
        self.subgraph(owner)?;
        let old_parent = self.node(child)?.parent;
        if self.ancestor_distance(owner, child).is_some() {
            return Err(GraphError::InvariantViolation {
                node: child,
                reason: format!("cannot own its descendant {owner}"),
            });
        }
        if old_parent != Some(owner) && self.is_dummy(child) {
            return Err(GraphError::InvariantViolation {
                node: child,
                reason: "entry/exit nodes cannot change subgraph".to_string(),
            });
        }

        if old_parent != Some(owner) {
            let node = &self.nodes[child.index()];
            let attached: Vec<EdgeId> = node.in_edges.iter().chain(&node.out_edges).copied().collect();
            for id in attached {
                log_debug!(self.verbosity, "  detach {} from moved node {}", id, child);
                self.remove_edge(id)?;
            }
        }

        let added = self.subgraph_mut(owner)?.add_child(child);
        if old_parent != Some(owner) {
            if let Some(old) = old_parent {
                self.subgraph_mut(old)?.remove_child(child);
            }
            if self.nodes[child.index()].is_root {
                self.nodes[child.index()].is_root = false;
                self.roots.retain(|&r| r != child);
            }
            self.nodes[child.index()].parent = Some(owner);
            self.relevel(child);
        }
        Ok(added)
    }

    /// Remove `child` from `owner`'s subgraph. Removing a non-member, or
    /// the subgraph's own Entry/Exit, is a no-op.
    pub fn remove_child(&mut self, owner: NodeId, child: NodeId) -> Result<bool, GraphError> {
        let graph = self.subgraph(owner)?;
        if graph.is_entry(child) || graph.is_exit(child) {
            return Ok(false);
        }
        let removed = self.subgraph_mut(owner)?.remove_child(child);
        if removed {
            let node = self.node_mut(child)?;
            if node.parent == Some(owner) {
                node.parent = None;
            }
        }
        Ok(removed)
    }

    /// Recompute levels below `start` from its parent's level.
    fn relevel(&mut self, start: NodeId) {
        let mut stack = vec![start];
        while let Some(id) = stack.pop() {
            let level = self.nodes[id.index()]
                .parent
                .map_or(0, |p| self.nodes[p.index()].level + 1);
            let node = &mut self.nodes[id.index()];
            node.level = level;
            if let Some(graph) = node.subgraph() {
                stack.extend(graph.children().iter().copied());
            }
        }
    }

    // --- Edges ---

    /// Add an edge between two members of `owner`'s subgraph.
    ///
    /// Adding an edge identical to one already present returns the existing
    /// ID. On success the destination's rank is raised above the source's
    /// and the raise is propagated to every successor that needs it.
    pub fn add_edge(&mut self, owner: NodeId, edge: Edge) -> Result<EdgeId, GraphError> {
        let graph = self.subgraph(owner)?;
        if !graph.contains(edge.source) || !graph.contains(edge.dest) {
            return Err(GraphError::InvalidEdgeEndpoint {
                from: edge.source,
                to: edge.dest,
                owner,
            });
        }
        let existing = graph
            .edges()
            .iter()
            .copied()
            .find(|e| self.edges[e.index()].as_ref() == Some(&edge));
        if let Some(id) = existing {
            return Ok(id);
        }
        if edge.source == edge.dest || self.search_successors(edge.dest, edge.source, true) {
            return Err(GraphError::CycleDetected {
                from: edge.source,
                to: edge.dest,
            });
        }

        let id = EdgeId(self.edges.len() as u32);
        self.edges.push(Some(edge));
        self.subgraph_mut(owner)?.add_edge(id);

        let source = &mut self.nodes[edge.source.index()];
        source.successors.push(edge.dest);
        source.out_edges.push(id);
        let source_rank = source.rank;
        self.nodes[edge.dest.index()].in_edges.push(id);

        if self.nodes[edge.dest.index()].rank <= source_rank {
            self.propagate_rank(edge.dest, source_rank + 1);
        }
        Ok(id)
    }

    /// Detach an edge from its subgraph and endpoints.
    ///
    /// Ranks are not lowered afterwards: they stay a valid upper bound.
    /// Returns false if the edge was already removed.
    pub fn remove_edge(&mut self, id: EdgeId) -> Result<bool, GraphError> {
        let slot = self
            .edges
            .get_mut(id.index())
            .ok_or(GraphError::UnknownEdge(id))?;
        let Some(edge) = slot.take() else {
            return Ok(false);
        };

        let owner = self.nodes[edge.source.index()]
            .parent
            .or(self.nodes[edge.dest.index()].parent);
        if let Some(owner) = owner {
            self.subgraph_mut(owner)?.remove_edge(id);
        }
        let source = &mut self.nodes[edge.source.index()];
        // Only one successor entry per edge; parallel edges keep theirs.
        if let Some(pos) = source.successors.iter().position(|&s| s == edge.dest) {
            source.successors.remove(pos);
        }
        source.out_edges.retain(|&e| e != id);
        self.nodes[edge.dest.index()].in_edges.retain(|&e| e != id);
        Ok(true)
    }

    /// Raise `node`'s rank to at least `rank`, pushing successors along.
    pub fn raise_rank(&mut self, node: NodeId, rank: u32) -> Result<(), GraphError> {
        self.node(node)?;
        self.propagate_rank(node, rank);
        Ok(())
    }

    fn propagate_rank(&mut self, start: NodeId, rank: u32) {
        // Terminates because add_edge keeps each subgraph acyclic.
        let mut queue = VecDeque::from([(start, rank)]);
        while let Some((id, rank)) = queue.pop_front() {
            let node = &mut self.nodes[id.index()];
            if node.rank >= rank {
                continue;
            }
            log_debug!(self.verbosity, "  rank {} ({}): {} -> {}", id, node.name, node.rank, rank);
            node.rank = rank;
            queue.extend(node.successors.iter().map(|&s| (s, rank + 1)));
        }
    }

    /// Reorder `owner`'s children by ascending rank. Ties keep their
    /// current relative order.
    pub fn sort_children(&mut self, owner: NodeId) -> Result<&[NodeId], GraphError> {
        let mut children = std::mem::take(&mut self.subgraph_mut(owner)?.children);
        children.sort_by_key(|c| self.nodes[c.index()].rank);
        let graph = self.subgraph_mut(owner)?;
        graph.children = children;
        Ok(&graph.children)
    }

    /// Whether a chain of successor links leads from `from` to `to` inside
    /// their subgraph. Dummy nodes are walked through but never match.
    pub fn has_sibling_path(&self, from: NodeId, to: NodeId) -> bool {
        self.search_successors(from, to, false)
    }

    fn search_successors(&self, from: NodeId, to: NodeId, match_dummies: bool) -> bool {
        let Some(start) = self.nodes.get(from.index()) else {
            return false;
        };
        let mut visited: FxHashSet<NodeId> = FxHashSet::default();
        let mut stack: Vec<NodeId> = start.successors.clone();
        while let Some(id) = stack.pop() {
            if id == to && (match_dummies || !self.is_dummy(id)) {
                return true;
            }
            if !visited.insert(id) {
                continue;
            }
            stack.extend(self.nodes[id.index()].successors.iter().copied());
        }
        false
    }

    // --- Ports ---

    /// Incoming edge bound to input `port` of `node`.
    pub fn in_edge_at(&self, node: NodeId, port: u32) -> Result<Option<EdgeId>, GraphError> {
        for &id in self.node(node)?.in_edges() {
            if self.edge(id)?.dest_port == port {
                return Ok(Some(id));
            }
        }
        Ok(None)
    }

    /// Outgoing edge bound to output `port` of `node`.
    pub fn out_edge_at(&self, node: NodeId, port: u32) -> Result<Option<EdgeId>, GraphError> {
        for &id in self.node(node)?.out_edges() {
            if self.edge(id)?.source_port == port {
                return Ok(Some(id));
            }
        }
        Ok(None)
    }

    /// Incoming edge at `port`, looking through the enclosing Entry node.
    ///
    /// When the edge comes from Entry, the parent's matching incoming edge
    /// is returned instead; if that one leaves an Internal node, the edge
    /// reaching that node's Exit is returned. Roots stop the search.
    pub fn extended_in_edge_at(&self, node: NodeId, port: u32) -> Result<Option<EdgeId>, GraphError> {
        let Some(id) = self.in_edge_at(node, port)? else {
            return Ok(None);
        };
        let edge = self.edge(id)?;
        if !self.is_entry(edge.source) {
            return Ok(Some(id));
        }
        let Some(parent) = self.node(node)?.parent else {
            return Ok(Some(id));
        };
        if self.node(parent)?.is_root {
            return Ok(Some(id));
        }
        let Some(outer_id) = self.in_edge_at(parent, edge.source_port)? else {
            return Ok(Some(id));
        };
        let outer = self.edge(outer_id)?;
        match self.node(outer.source)?.subgraph() {
            Some(inner) => self.in_edge_at(inner.exit(), outer.source_port),
            None => Ok(Some(outer_id)),
        }
    }

    /// Outgoing edge at `port`, looking through the enclosing Exit node.
    /// Mirror image of [`extended_in_edge_at`](Self::extended_in_edge_at).
    pub fn extended_out_edge_at(&self, node: NodeId, port: u32) -> Result<Option<EdgeId>, GraphError> {
        let Some(id) = self.out_edge_at(node, port)? else {
            return Ok(None);
        };
        let edge = self.edge(id)?;
        if !self.is_exit(edge.dest) {
            return Ok(Some(id));
        }
        let Some(parent) = self.node(node)?.parent else {
            return Ok(Some(id));
        };
        if self.node(parent)?.is_root {
            return Ok(Some(id));
        }
        let Some(outer_id) = self.out_edge_at(parent, edge.dest_port)? else {
            return Ok(Some(id));
        };
        let outer = self.edge(outer_id)?;
        match self.node(outer.dest)?.subgraph() {
            Some(inner) => self.out_edge_at(inner.entry(), outer.dest_port),
            None => Ok(Some(outer_id)),
        }
    }

    // --- Annotations ---

    pub fn set_tag(&mut self, node: NodeId, tag: Target) -> Result<(), GraphError> {
        self.node_mut(node)?.tag = tag;
        Ok(())
    }

    /// Record the externally measured duration of `node` under `model`.
    pub fn set_duration(&mut self, node: NodeId, model: CostModel, duration: f64) -> Result<(), GraphError> {
        self.node_mut(node)?.durations[model.index()] = Some(duration);
        Ok(())
    }

    /// Forget every recorded duration under both cost models.
    pub fn clear_durations(&mut self) {
        for node in &mut self.nodes {
            node.durations = [None; 2];
        }
    }

    pub fn timing(&self, node: NodeId, model: CostModel) -> Option<TaskTiming> {
        self.nodes.get(node.index())?.timing(model)
    }

    pub(crate) fn set_timing(&mut self, node: NodeId, model: CostModel, timing: TaskTiming) -> Result<(), GraphError> {
        self.node_mut(node)?.timings[model.index()] = Some(timing);
        Ok(())
    }

    /// Drop every timing computed under `model`.
    pub(crate) fn clear_timings(&mut self, model: CostModel) {
        for node in &mut self.nodes {
            node.timings[model.index()] = None;
        }
    }

    /// Drop timings of `owner`'s direct children under `model`.
    pub(crate) fn clear_child_timings(&mut self, owner: NodeId, model: CostModel) -> Result<(), GraphError> {
        let children = self.subgraph(owner)?.children().to_vec();
        for child in children {
            self.nodes[child.index()].timings[model.index()] = None;
        }
        Ok(())
    }
}
