//! Mapping of caller-supplied task names onto graph nodes.

use rustc_hash::{FxHashMap, FxHashSet};

use crate::graph::{DataflowGraph, GraphError, Node, NodeId, NodeVisitor};
use crate::models::TaskTimes;
use crate::{log_debug, log_summary};

/// Result of resolving a task list against a forest.
#[derive(Clone, Debug, Default)]
pub struct NameResolution {
    /// Task name -> the first matching Leaf node in pre-order.
    pub nodes: FxHashMap<String, NodeId>,
    /// Names from the task list with no matching node, in list order.
    pub unresolved: Vec<String>,
}

impl NameResolution {
    pub fn get(&self, name: &str) -> Option<NodeId> {
        self.nodes.get(name).copied()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

/// Binds wanted task names to non-dummy leaves. Internal nodes are walked
/// through without being bound.
struct TaskNameCollector<'a> {
    wanted: FxHashSet<&'a str>,
    found: FxHashMap<String, NodeId>,
    verbosity: u8,
}

impl NodeVisitor for TaskNameCollector<'_> {
    fn visit_leaf(&mut self, graph: &DataflowGraph, node: &Node) {
        if graph.is_dummy(node.id()) || !self.wanted.contains(node.name()) {
            return;
        }
        if self.found.contains_key(node.name()) {
            return;
        }
        log_debug!(self.verbosity, "  bound task {} to {}", node.name(), node.id());
        self.found.insert(node.name().to_string(), node.id());
    }
}

/// Resolve every task name of `tasks` to a leaf node under `roots`.
///
/// Unknown names are not an error; they are reported in
/// [`NameResolution::unresolved`].
pub fn resolve_task_names(
    graph: &DataflowGraph,
    roots: &[NodeId],
    tasks: &[TaskTimes],
    verbosity: u8,
) -> Result<NameResolution, GraphError> {
    let mut collector = TaskNameCollector {
        wanted: tasks.iter().map(|t| t.name.as_str()).collect(),
        found: FxHashMap::default(),
        verbosity,
    };
    graph.walk_forest(roots, &mut collector)?;

    let mut unresolved: Vec<String> = Vec::new();
    for task in tasks {
        if !collector.found.contains_key(&task.name) && !unresolved.contains(&task.name) {
            unresolved.push(task.name.clone());
        }
    }
    log_summary!(
        verbosity,
        "Resolved {} task names, {} unresolved",
        collector.found.len(),
        unresolved.len()
    );
    for name in &unresolved {
        log_summary!(verbosity, "  unresolved task: {}", name);
    }

    Ok(NameResolution {
        nodes: collector.found,
        unresolved,
    })
}
