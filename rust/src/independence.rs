//! Ordering-independence of two tasks anywhere in the forest.
//!
//! Two nodes at different depths are compared by lifting the deeper one to
//! the level of the other, then lifting both until they are siblings. The
//! sibling-level dataflow edges decide whether one is ordered before the
//! other.

use crate::config::RootPolicy;
use crate::graph::{DataflowGraph, GraphError, NodeId};
use crate::{log_checks, log_debug};

fn parent_of(graph: &DataflowGraph, node: NodeId) -> Result<NodeId, GraphError> {
    graph.node(node)?.parent().ok_or(GraphError::DetachedNode(node))
}

/// Whether dataflow edges order `from` before `to`.
///
/// A node is ordered with its own ancestors and descendants. Distinct roots
/// are ordered under [`RootPolicy::Sequential`] and unordered under
/// [`RootPolicy::Independent`].
pub fn exists_forward_path(
    graph: &DataflowGraph,
    from: NodeId,
    to: NodeId,
    policy: RootPolicy,
) -> Result<bool, GraphError> {
    if let Some(hops) = graph
        .ancestor_distance(from, to)
        .or_else(|| graph.ancestor_distance(to, from))
    {
        log_debug!(graph.verbosity(), "  {} and {} are nested ({} hops)", from, to, hops);
        return Ok(true);
    }

    let (mut a, mut b) = (from, to);
    let mut level_a = graph.node(a)?.level();
    let mut level_b = graph.node(b)?.level();
    while level_a > level_b {
        a = parent_of(graph, a)?;
        level_a -= 1;
    }
    while level_b > level_a {
        b = parent_of(graph, b)?;
        level_b -= 1;
    }

    loop {
        let (node_a, node_b) = (graph.node(a)?, graph.node(b)?);
        if node_a.is_root() || node_b.is_root() {
            return Ok(policy == RootPolicy::Sequential);
        }
        let (parent_a, parent_b) = (parent_of(graph, a)?, parent_of(graph, b)?);
        if parent_a == parent_b {
            return Ok(graph.has_sibling_path(a, b));
        }
        a = parent_a;
        b = parent_b;
    }
}

/// Whether `a` and `b` may run concurrently: neither reaches the other.
/// A node is never parallel with itself.
pub fn are_parallel(
    graph: &DataflowGraph,
    a: NodeId,
    b: NodeId,
    policy: RootPolicy,
    verbosity: u8,
) -> Result<bool, GraphError> {
    if a == b {
        return Ok(false);
    }
    let forward = exists_forward_path(graph, a, b, policy)?;
    let backward = !forward && exists_forward_path(graph, b, a, policy)?;
    let parallel = !forward && !backward;
    log_checks!(
        verbosity,
        "  {} ({}) vs {} ({}): {}",
        graph.node(a)?.name(),
        a,
        graph.node(b)?.name(),
        b,
        if parallel {
            "parallel"
        } else if forward {
            "ordered, forward"
        } else {
            "ordered, backward"
        }
    );
    Ok(parallel)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{Edge, NodeSpec};

    fn make_leaf(graph: &mut DataflowGraph, parent: NodeId, name: &str) -> NodeId {
        graph.add_leaf(parent, NodeSpec::new(name)).unwrap()
    }

    fn parallel(graph: &DataflowGraph, a: NodeId, b: NodeId) -> bool {
        are_parallel(graph, a, b, RootPolicy::Sequential, 0).unwrap()
    }

    #[test]
    fn test_siblings() {
        // a -> b, c unconnected
        let mut graph = DataflowGraph::new();
        let root = graph.add_root(NodeSpec::new("root"));
        let a = make_leaf(&mut graph, root, "a");
        let b = make_leaf(&mut graph, root, "b");
        let c = make_leaf(&mut graph, root, "c");
        graph.add_edge(root, Edge::new(a, b)).unwrap();

        assert!(exists_forward_path(&graph, a, b, RootPolicy::Sequential).unwrap());
        assert!(!exists_forward_path(&graph, b, a, RootPolicy::Sequential).unwrap());
        assert!(!parallel(&graph, a, b));
        assert!(parallel(&graph, a, c));
        assert!(parallel(&graph, b, c));
        assert!(!parallel(&graph, a, a));
    }

    #[test]
    fn test_transitive_path() {
        let mut graph = DataflowGraph::new();
        let root = graph.add_root(NodeSpec::new("root"));
        let a = make_leaf(&mut graph, root, "a");
        let b = make_leaf(&mut graph, root, "b");
        let c = make_leaf(&mut graph, root, "c");
        graph.add_edge(root, Edge::new(a, b)).unwrap();
        graph.add_edge(root, Edge::new(b, c)).unwrap();
        assert!(exists_forward_path(&graph, a, c, RootPolicy::Sequential).unwrap());
        assert!(!parallel(&graph, a, c));
    }

    #[test]
    fn test_paths_through_entry_and_exit_do_not_match_dummies() {
        // entry -> a, entry -> b: a and b share only a dummy predecessor
        let mut graph = DataflowGraph::new();
        let root = graph.add_root(NodeSpec::new("root"));
        let sub = graph.subgraph(root).unwrap();
        let (entry, exit) = (sub.entry(), sub.exit());
        let a = make_leaf(&mut graph, root, "a");
        let b = make_leaf(&mut graph, root, "b");
        graph.add_edge(root, Edge::new(entry, a)).unwrap();
        graph.add_edge(root, Edge::new(entry, b)).unwrap();
        graph.add_edge(root, Edge::new(a, exit)).unwrap();
        graph.add_edge(root, Edge::new(b, exit)).unwrap();
        assert!(parallel(&graph, a, b));
    }

    #[test]
    fn test_nested_tasks_follow_their_ancestors() {
        // root { p -> q }, p { x, y }, q { z }
        let mut graph = DataflowGraph::new();
        let root = graph.add_root(NodeSpec::new("root"));
        let p = graph.add_internal(root, NodeSpec::new("p")).unwrap();
        let q = graph.add_internal(root, NodeSpec::new("q")).unwrap();
        let x = make_leaf(&mut graph, p, "x");
        let y = make_leaf(&mut graph, p, "y");
        let z = make_leaf(&mut graph, q, "z");
        graph.add_edge(root, Edge::new(p, q)).unwrap();

        assert!(exists_forward_path(&graph, x, z, RootPolicy::Sequential).unwrap());
        assert!(!exists_forward_path(&graph, z, x, RootPolicy::Sequential).unwrap());
        assert!(!parallel(&graph, x, z));
        assert!(parallel(&graph, x, y));
    }

    #[test]
    fn test_different_depths() {
        // root { a, inner { deep { x } }, b } with inner -> a
        let mut graph = DataflowGraph::new();
        let root = graph.add_root(NodeSpec::new("root"));
        let a = make_leaf(&mut graph, root, "a");
        let inner = graph.add_internal(root, NodeSpec::new("inner")).unwrap();
        let deep = graph.add_internal(inner, NodeSpec::new("deep")).unwrap();
        let x = make_leaf(&mut graph, deep, "x");
        let b = make_leaf(&mut graph, root, "b");
        graph.add_edge(root, Edge::new(inner, a)).unwrap();

        assert!(exists_forward_path(&graph, x, a, RootPolicy::Sequential).unwrap());
        assert!(!parallel(&graph, x, a));
        assert!(parallel(&graph, x, b));
    }

    #[test]
    fn test_ancestor_is_ordered() {
        let mut graph = DataflowGraph::new();
        let root = graph.add_root(NodeSpec::new("root"));
        let inner = graph.add_internal(root, NodeSpec::new("inner")).unwrap();
        let x = make_leaf(&mut graph, inner, "x");
        assert!(exists_forward_path(&graph, inner, x, RootPolicy::Independent).unwrap());
        assert!(exists_forward_path(&graph, x, inner, RootPolicy::Independent).unwrap());
        assert!(!parallel(&graph, inner, x));
    }

    #[test]
    fn test_root_policy_decides_across_roots() {
        let mut graph = DataflowGraph::new();
        let r1 = graph.add_root(NodeSpec::new("r1"));
        let r2 = graph.add_root(NodeSpec::new("r2"));
        let x = make_leaf(&mut graph, r1, "x");
        let y = make_leaf(&mut graph, r2, "y");

        assert!(!are_parallel(&graph, x, y, RootPolicy::Sequential, 0).unwrap());
        assert!(are_parallel(&graph, x, y, RootPolicy::Independent, 0).unwrap());
    }

    #[test]
    fn test_detached_node_is_an_error() {
        let mut graph = DataflowGraph::new();
        let root = graph.add_root(NodeSpec::new("root"));
        let inner = graph.add_internal(root, NodeSpec::new("inner")).unwrap();
        let x = make_leaf(&mut graph, inner, "x");
        let a = make_leaf(&mut graph, root, "a");
        graph.remove_child(root, inner).unwrap();

        let err = exists_forward_path(&graph, x, a, RootPolicy::Sequential).unwrap_err();
        assert_eq!(err, GraphError::DetachedNode(inner));
    }

    #[test]
    fn test_removed_edge_no_longer_orders() {
        let mut graph = DataflowGraph::new();
        let root = graph.add_root(NodeSpec::new("root"));
        let a = make_leaf(&mut graph, root, "a");
        let b = make_leaf(&mut graph, root, "b");
        let edge = graph.add_edge(root, Edge::new(a, b)).unwrap();
        assert!(!parallel(&graph, a, b));
        graph.remove_edge(edge).unwrap();
        assert!(parallel(&graph, a, b));
    }
}
