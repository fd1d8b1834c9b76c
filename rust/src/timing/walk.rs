//! Earliest start / finish time propagation over the node hierarchy.
//!
//! Each Internal node is scheduled by visiting its children in rank order:
//! a child starts when its latest predecessor finishes, Internal children are
//! scheduled recursively, and the enclosing node finishes when its Exit does.

use thiserror::Error;

use crate::config::RootPolicy;
use crate::graph::{DataflowGraph, GraphError, NodeId};
use crate::{log_debug, log_summary};

use super::types::{CostModel, DurationTable, TaskTiming};

/// Errors that can occur during the scheduling walk.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ScheduleError {
    #[error("Predecessor {predecessor} of {node} was not scheduled before it (rank order broken)")]
    UnvisitedPredecessor { node: NodeId, predecessor: NodeId },
    #[error(transparent)]
    Graph(#[from] GraphError),
}

/// Build the duration table of `model` from the nodes' duration slots.
pub fn collect_durations(graph: &DataflowGraph, model: CostModel) -> DurationTable {
    graph
        .nodes()
        .filter_map(|node| node.duration(model).map(|d| (node.id(), d)))
        .collect()
}

/// Schedule the subgraph of `node`, which starts at `start`.
///
/// Leaf durations come from `durations` (0 when absent); the duration of an
/// Internal node is always derived from its subgraph. Returns the timing
/// recorded for `node`.
pub fn schedule_internal(
    graph: &mut DataflowGraph,
    node: NodeId,
    start: f64,
    model: CostModel,
    durations: &DurationTable,
    verbosity: u8,
) -> Result<TaskTiming, ScheduleError> {
    graph.clear_child_timings(node, model)?;
    let order = graph.sort_children(node)?.to_vec();
    let (entry, exit) = {
        let sub = graph.subgraph(node)?;
        (sub.entry(), sub.exit())
    };

    graph.set_timing(entry, model, TaskTiming::instant(start))?;

    // Children without successors may not be wired to Exit.
    let mut exiting: Vec<NodeId> = Vec::new();

    for child in order {
        if child == entry || child == exit {
            continue;
        }
        let earliest_start = latest_predecessor_finish(graph, child, start, model)?;

        let timing = if graph.node(child)?.is_internal() {
            schedule_internal(graph, child, earliest_start, model, durations, verbosity)?
        } else {
            let duration = durations.get(&child).copied().unwrap_or(0.0);
            let timing = TaskTiming::new(earliest_start, duration);
            graph.set_timing(child, model, timing)?;
            timing
        };
        log_debug!(
            verbosity,
            "  [{}] {} ({}): est={:.3} eft={:.3}",
            model,
            graph.node(child)?.name(),
            child,
            timing.earliest_start,
            timing.earliest_finish
        );

        if graph.node(child)?.successors().is_empty() {
            exiting.push(child);
        }
    }

    let mut finish = latest_predecessor_finish(graph, exit, start, model)?;
    for id in exiting {
        if let Some(timing) = graph.timing(id, model) {
            finish = finish.max(timing.earliest_finish);
        }
    }
    graph.set_timing(exit, model, TaskTiming::instant(finish))?;

    let timing = TaskTiming::new(start, finish - start);
    graph.set_timing(node, model, timing)?;
    log_debug!(
        verbosity,
        "  [{}] subgraph {} ({}): duration={:.3}",
        model,
        graph.node(node)?.name(),
        node,
        timing.duration
    );
    Ok(timing)
}

/// Latest finish among `node`'s direct predecessors, never earlier than
/// `floor` (the start of the enclosing node).
fn latest_predecessor_finish(
    graph: &DataflowGraph,
    node: NodeId,
    floor: f64,
    model: CostModel,
) -> Result<f64, ScheduleError> {
    let mut latest = floor;
    for &edge_id in graph.node(node)?.in_edges() {
        let predecessor = graph.edge(edge_id)?.source;
        let timing = graph
            .timing(predecessor, model)
            .ok_or(ScheduleError::UnvisitedPredecessor { node, predecessor })?;
        if timing.earliest_finish > latest {
            latest = timing.earliest_finish;
        }
    }
    Ok(latest)
}

/// Schedule every root of `roots` under `model`.
///
/// With [`RootPolicy::Independent`] each root starts at 0. With
/// [`RootPolicy::Sequential`] root i starts when root i-1 finishes.
/// Previous timings of `model` are discarded first.
pub fn schedule_forest(
    graph: &mut DataflowGraph,
    roots: &[NodeId],
    policy: RootPolicy,
    model: CostModel,
    durations: &DurationTable,
    verbosity: u8,
) -> Result<Vec<TaskTiming>, ScheduleError> {
    graph.clear_timings(model);

    let mut timings = Vec::with_capacity(roots.len());
    let mut previous_finish = 0.0;
    for &root in roots {
        let start = match policy {
            RootPolicy::Independent => 0.0,
            RootPolicy::Sequential => previous_finish,
        };
        let timing = schedule_internal(graph, root, start, model, durations, verbosity)?;
        log_summary!(
            verbosity,
            "[{}] root {}: start={:.3} finish={:.3}",
            model,
            graph.node(root)?.name(),
            timing.earliest_start,
            timing.earliest_finish
        );
        previous_finish = timing.earliest_finish;
        timings.push(timing);
    }
    Ok(timings)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{Edge, NodeSpec};

    fn make_leaf(graph: &mut DataflowGraph, parent: NodeId, name: &str, duration: f64) -> NodeId {
        let id = graph.add_leaf(parent, NodeSpec::new(name)).unwrap();
        graph.set_duration(id, CostModel::Software, duration).unwrap();
        id
    }

    fn est(graph: &DataflowGraph, node: NodeId) -> f64 {
        graph.timing(node, CostModel::Software).unwrap().earliest_start
    }

    fn eft(graph: &DataflowGraph, node: NodeId) -> f64 {
        graph.timing(node, CostModel::Software).unwrap().earliest_finish
    }

    fn schedule_sw(graph: &mut DataflowGraph, policy: RootPolicy) -> Vec<TaskTiming> {
        let durations = collect_durations(graph, CostModel::Software);
        let roots = graph.roots().to_vec();
        schedule_forest(graph, &roots, policy, CostModel::Software, &durations, 0).unwrap()
    }

    #[test]
    fn test_chain_and_independent_task() {
        // a -> b, c unconnected
        let mut graph = DataflowGraph::new();
        let root = graph.add_root(NodeSpec::new("root"));
        let a = make_leaf(&mut graph, root, "a", 2.0);
        let b = make_leaf(&mut graph, root, "b", 3.0);
        let c = make_leaf(&mut graph, root, "c", 1.0);
        graph.add_edge(root, Edge::new(a, b)).unwrap();

        let timings = schedule_sw(&mut graph, RootPolicy::Sequential);

        assert_eq!((est(&graph, a), eft(&graph, a)), (0.0, 2.0));
        assert_eq!((est(&graph, b), eft(&graph, b)), (2.0, 5.0));
        assert_eq!((est(&graph, c), eft(&graph, c)), (0.0, 1.0));
        // Unwired b and c still bound the root through the exiting set.
        assert_eq!(timings[0].earliest_finish, 5.0);
        assert_eq!(timings[0].duration, 5.0);
    }

    #[test]
    fn test_entry_and_exit_bracket_the_subgraph() {
        let mut graph = DataflowGraph::new();
        let root = graph.add_root(NodeSpec::new("root"));
        let sub = graph.subgraph(root).unwrap();
        let (entry, exit) = (sub.entry(), sub.exit());
        let a = make_leaf(&mut graph, root, "a", 4.0);
        graph.add_edge(root, Edge::new(entry, a)).unwrap();
        graph.add_edge(root, Edge::new(a, exit)).unwrap();

        schedule_sw(&mut graph, RootPolicy::Sequential);

        assert_eq!(est(&graph, entry), est(&graph, root));
        assert_eq!(eft(&graph, exit), eft(&graph, root));
        assert_eq!(eft(&graph, root), 4.0);
        for id in [root, entry, exit, a] {
            assert!(graph.timing(id, CostModel::Software).unwrap().is_consistent());
        }
    }

    #[test]
    fn test_nested_internal_node_duration_is_derived() {
        // root { a -> inner { x -> y } -> b }
        let mut graph = DataflowGraph::new();
        let root = graph.add_root(NodeSpec::new("root"));
        let a = make_leaf(&mut graph, root, "a", 1.0);
        let inner = graph.add_internal(root, NodeSpec::new("inner")).unwrap();
        let b = make_leaf(&mut graph, root, "b", 2.0);
        let x = make_leaf(&mut graph, inner, "x", 3.0);
        let y = make_leaf(&mut graph, inner, "y", 4.0);
        let inner_entry = graph.subgraph(inner).unwrap().entry();
        let inner_exit = graph.subgraph(inner).unwrap().exit();

        graph.add_edge(root, Edge::new(a, inner)).unwrap();
        graph.add_edge(root, Edge::new(inner, b)).unwrap();
        graph.add_edge(inner, Edge::new(inner_entry, x)).unwrap();
        graph.add_edge(inner, Edge::new(x, y)).unwrap();
        graph.add_edge(inner, Edge::new(y, inner_exit)).unwrap();
        // A duration supplied for an Internal node is ignored.
        graph.set_duration(inner, CostModel::Software, 100.0).unwrap();

        schedule_sw(&mut graph, RootPolicy::Sequential);

        assert_eq!(est(&graph, inner), 1.0);
        assert_eq!(est(&graph, x), 1.0);
        assert_eq!(est(&graph, y), 4.0);
        assert_eq!(eft(&graph, inner), 8.0);
        assert_eq!(graph.timing(inner, CostModel::Software).unwrap().duration, 7.0);
        assert_eq!(est(&graph, b), 8.0);
        assert_eq!(eft(&graph, root), 10.0);
    }

    #[test]
    fn test_unconnected_child_starts_with_its_parent() {
        let mut graph = DataflowGraph::new();
        let root = graph.add_root(NodeSpec::new("root"));
        let a = make_leaf(&mut graph, root, "a", 5.0);
        let inner = graph.add_internal(root, NodeSpec::new("inner")).unwrap();
        let x = make_leaf(&mut graph, inner, "x", 1.0);
        graph.add_edge(root, Edge::new(a, inner)).unwrap();

        schedule_sw(&mut graph, RootPolicy::Sequential);
        assert_eq!(est(&graph, x), 5.0);
        assert_eq!(eft(&graph, inner), 6.0);
    }

    #[test]
    fn test_empty_subgraph_has_zero_duration() {
        let mut graph = DataflowGraph::new();
        let root = graph.add_root(NodeSpec::new("root"));
        let timings = schedule_sw(&mut graph, RootPolicy::Sequential);
        assert_eq!(timings[0], TaskTiming::instant(0.0));
    }

    #[test]
    fn test_missing_duration_defaults_to_zero() {
        let mut graph = DataflowGraph::new();
        let root = graph.add_root(NodeSpec::new("root"));
        let a = graph.add_leaf(root, NodeSpec::new("a")).unwrap();
        schedule_sw(&mut graph, RootPolicy::Sequential);
        assert_eq!(eft(&graph, a), 0.0);
    }

    #[test]
    fn test_root_policies() {
        let mut graph = DataflowGraph::new();
        let r1 = graph.add_root(NodeSpec::new("r1"));
        let r2 = graph.add_root(NodeSpec::new("r2"));
        make_leaf(&mut graph, r1, "x", 3.0);
        let y = make_leaf(&mut graph, r2, "y", 2.0);

        schedule_sw(&mut graph, RootPolicy::Independent);
        assert_eq!(est(&graph, r1), 0.0);
        assert_eq!(est(&graph, r2), 0.0);

        schedule_sw(&mut graph, RootPolicy::Sequential);
        assert_eq!(est(&graph, r2), eft(&graph, r1));
        assert_eq!(est(&graph, y), 3.0);
        assert_eq!(eft(&graph, r2), 5.0);
    }

    #[test]
    fn test_cost_models_are_independent() {
        let mut graph = DataflowGraph::new();
        let root = graph.add_root(NodeSpec::new("root"));
        let a = make_leaf(&mut graph, root, "a", 10.0);
        let b = make_leaf(&mut graph, root, "b", 1.0);
        graph.set_duration(a, CostModel::Hardware, 2.0).unwrap();
        graph.add_edge(root, Edge::new(a, b)).unwrap();

        let roots = graph.roots().to_vec();
        for model in CostModel::ALL {
            let durations = collect_durations(&graph, model);
            schedule_forest(&mut graph, &roots, RootPolicy::Sequential, model, &durations, 0).unwrap();
        }

        assert_eq!(est(&graph, b), 10.0);
        assert_eq!(graph.timing(b, CostModel::Hardware).unwrap().earliest_start, 2.0);
        assert_eq!(graph.timing(b, CostModel::Hardware).unwrap().duration, 0.0);
    }

    #[test]
    fn test_edge_out_of_exit_is_reported() {
        let mut graph = DataflowGraph::new();
        let root = graph.add_root(NodeSpec::new("root"));
        let exit = graph.subgraph(root).unwrap().exit();
        let a = make_leaf(&mut graph, root, "a", 1.0);
        graph.add_edge(root, Edge::new(exit, a)).unwrap();

        let durations = collect_durations(&graph, CostModel::Software);
        let err = schedule_internal(&mut graph, root, 0.0, CostModel::Software, &durations, 0).unwrap_err();
        assert_eq!(
            err,
            ScheduleError::UnvisitedPredecessor {
                node: a,
                predecessor: exit
            }
        );
    }

    #[test]
    fn test_non_internal_node_is_rejected() {
        let mut graph = DataflowGraph::new();
        let root = graph.add_root(NodeSpec::new("root"));
        let a = make_leaf(&mut graph, root, "a", 1.0);
        let durations = DurationTable::default();
        let err = schedule_internal(&mut graph, a, 0.0, CostModel::Software, &durations, 0).unwrap_err();
        assert_eq!(err, ScheduleError::Graph(GraphError::NotAnInternalNode(a)));
    }
}
