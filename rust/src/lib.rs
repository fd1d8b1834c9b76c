//! Rust core of the trireme dataflow-graph analysis.
//!
//! Given a hierarchical task graph and a list of named tasks with software
//! and hardware durations, this crate computes which tasks may run in
//! parallel, which are loop-parallel, and each task's earliest start time
//! under both cost models.

// Allow clippy warning triggered by PyO3 macro expansion
#![allow(clippy::useless_conversion)]

use pyo3::exceptions::PyValueError;
use pyo3::prelude::*;

pub mod analysis;
mod config;
pub mod graph;
pub mod independence;
pub mod logging;
mod models;
pub mod name_resolution;
pub mod timing;

pub use analysis::{analyze, AnalysisError};
pub use config::{AnalysisConfig, RootPolicy};
pub use graph::{
    DataflowGraph, DimLimit, Dimensions, Edge, EdgeId, EdgeKind, GraphError, NodeId, NodeSpec, Target,
};
pub use independence::{are_parallel, exists_forward_path};
pub use models::{AnalysisReport, EarliestStartRow, ParallelLoopsRow, ParallelTasksRow, TaskTimes};
pub use timing::{CostModel, ScheduleError, TaskTiming};

fn value_error(e: impl std::fmt::Display) -> PyErr {
    PyValueError::new_err(e.to_string())
}

fn parse_target(name: Option<&str>) -> PyResult<Target> {
    match name.map(str::to_ascii_lowercase).as_deref() {
        None | Some("none") => Ok(Target::None),
        Some("cpu") => Ok(Target::Cpu),
        Some("gpu") => Ok(Target::Gpu),
        Some("accelerator") => Ok(Target::Accelerator),
        Some(other) => Err(value_error(format!("Unknown target: {}", other))),
    }
}

fn parse_model(name: &str) -> PyResult<CostModel> {
    match name {
        "sw" | "software" => Ok(CostModel::Software),
        "hw" | "hardware" => Ok(CostModel::Hardware),
        other => Err(value_error(format!("Unknown cost model: {}", other))),
    }
}

/// Node spec from Python arguments. `dims` lists one trip count per
/// dimension, `None` for a count that is not constant.
fn make_spec(name: String, dims: Option<Vec<Option<u64>>>, hint: Option<&str>) -> PyResult<NodeSpec> {
    let limits: Vec<DimLimit> = dims.unwrap_or_default().into_iter().map(DimLimit::from).collect();
    let dimensions = Dimensions::from_limits(limits).map_err(value_error)?;
    Ok(NodeSpec::new(name)
        .with_dimensions(dimensions)
        .with_hint(parse_target(hint)?))
}

/// Builder over a hierarchical dataflow graph (PyO3 wrapper).
///
/// Nodes and edges are referred to by the integer handles returned when
/// they are added.
#[pyclass(name = "TaskGraph")]
#[derive(Clone, Debug, Default)]
pub struct PyTaskGraph {
    graph: DataflowGraph,
}

impl PyTaskGraph {
    fn id(&self, raw: u32) -> PyResult<NodeId> {
        let id = NodeId(raw);
        self.graph.node(id).map_err(value_error)?;
        Ok(id)
    }
}

#[pymethods]
impl PyTaskGraph {
    #[new]
    fn new() -> Self {
        Self::default()
    }

    /// Add a root Internal node.
    #[pyo3(signature = (name, dims=None, hint=None))]
    fn add_root(&mut self, name: String, dims: Option<Vec<Option<u64>>>, hint: Option<&str>) -> PyResult<u32> {
        let spec = make_spec(name, dims, hint)?;
        Ok(self.graph.add_root(spec).raw())
    }

    #[pyo3(signature = (parent, name, dims=None, hint=None))]
    fn add_internal(
        &mut self,
        parent: u32,
        name: String,
        dims: Option<Vec<Option<u64>>>,
        hint: Option<&str>,
    ) -> PyResult<u32> {
        let parent = self.id(parent)?;
        let spec = make_spec(name, dims, hint)?;
        let id = self.graph.add_internal(parent, spec).map_err(value_error)?;
        Ok(id.raw())
    }

    #[pyo3(signature = (parent, name, dims=None, hint=None))]
    fn add_leaf(
        &mut self,
        parent: u32,
        name: String,
        dims: Option<Vec<Option<u64>>>,
        hint: Option<&str>,
    ) -> PyResult<u32> {
        let parent = self.id(parent)?;
        let spec = make_spec(name, dims, hint)?;
        let id = self.graph.add_leaf(parent, spec).map_err(value_error)?;
        Ok(id.raw())
    }

    /// Connect two siblings. The edge is added to their parent's subgraph.
    #[pyo3(signature = (source, dest, source_port=0, dest_port=0, all_to_all=false, streaming=false))]
    fn add_edge(
        &mut self,
        source: u32,
        dest: u32,
        source_port: u32,
        dest_port: u32,
        all_to_all: bool,
        streaming: bool,
    ) -> PyResult<u32> {
        let (source, dest) = (self.id(source)?, self.id(dest)?);
        let owner = self
            .graph
            .node(source)
            .map_err(value_error)?
            .parent()
            .ok_or_else(|| value_error(GraphError::DetachedNode(source)))?;
        let kind = if all_to_all {
            EdgeKind::AllToAll
        } else {
            EdgeKind::OneToOne
        };
        let edge = Edge::new(source, dest)
            .with_ports(source_port, dest_port)
            .with_kind(kind)
            .with_streaming(streaming);
        let id = self.graph.add_edge(owner, edge).map_err(value_error)?;
        Ok(id.raw())
    }

    /// Returns False if the edge was already removed.
    fn remove_edge(&mut self, edge: u32) -> PyResult<bool> {
        self.graph.remove_edge(EdgeId(edge)).map_err(value_error)
    }

    fn entry(&self, node: u32) -> PyResult<u32> {
        let sub = self.graph.subgraph(self.id(node)?).map_err(value_error)?;
        Ok(sub.entry().raw())
    }

    fn exit(&self, node: u32) -> PyResult<u32> {
        let sub = self.graph.subgraph(self.id(node)?).map_err(value_error)?;
        Ok(sub.exit().raw())
    }

    fn rank(&self, node: u32) -> PyResult<u32> {
        let node = self.graph.node(self.id(node)?).map_err(value_error)?;
        Ok(node.rank())
    }

    fn level(&self, node: u32) -> PyResult<u32> {
        let node = self.graph.node(self.id(node)?).map_err(value_error)?;
        Ok(node.level())
    }

    fn is_streaming(&self, node: u32) -> PyResult<bool> {
        self.graph.is_streaming(self.id(node)?).map_err(value_error)
    }

    /// (EST, EFT) of a node from the last analysis, or None.
    fn timing(&self, node: u32, model: &str) -> PyResult<Option<(f64, f64)>> {
        let (node, model) = (self.id(node)?, parse_model(model)?);
        Ok(self
            .graph
            .timing(node, model)
            .map(|t| (t.earliest_start, t.earliest_finish)))
    }

    /// Check every structural invariant of the graph.
    ///
    /// # Raises
    /// * ValueError naming the first violation found
    fn validate(&self) -> PyResult<()> {
        self.graph.validate().map_err(value_error)
    }

    /// Run the full analysis over every root of this graph.
    #[pyo3(signature = (tasks, config=None))]
    fn analyze(&mut self, tasks: Vec<TaskTimes>, config: Option<AnalysisConfig>) -> PyResult<AnalysisReport> {
        run_analysis(&mut self.graph, &tasks, config)
    }

    fn __len__(&self) -> usize {
        self.graph.len()
    }

    fn __repr__(&self) -> String {
        format!(
            "TaskGraph(nodes={}, edges={}, roots={})",
            self.graph.len(),
            self.graph.edge_count(),
            self.graph.roots().len()
        )
    }
}

fn run_analysis(
    graph: &mut DataflowGraph,
    tasks: &[TaskTimes],
    config: Option<AnalysisConfig>,
) -> PyResult<AnalysisReport> {
    let config = config.unwrap_or_default();
    analyze(graph, tasks, &config).map_err(value_error)
}

/// Analyze a task list against a graph.
///
/// # Arguments
/// * `graph` - Graph to analyze; its timings are updated in place
/// * `tasks` - (name, software time, hardware time) entries
/// * `config` - Analysis configuration (root policy, verbosity, NC marker)
///
/// # Returns
/// * AnalysisReport with the parallel-task, loop and earliest-start tables
///
/// # Raises
/// * ValueError if the graph is malformed
#[pyfunction]
#[pyo3(name = "analyze", signature = (graph, tasks, config=None))]
fn py_analyze(
    mut graph: PyRefMut<'_, PyTaskGraph>,
    tasks: Vec<TaskTimes>,
    config: Option<AnalysisConfig>,
) -> PyResult<AnalysisReport> {
    run_analysis(&mut graph.graph, &tasks, config)
}

/// The trireme.rust Python module.
#[pymodule]
fn rust(m: &Bound<'_, PyModule>) -> PyResult<()> {
    // Graph and inputs
    m.add_class::<PyTaskGraph>()?;
    m.add_class::<TaskTimes>()?;

    // Config types
    m.add_class::<AnalysisConfig>()?;

    // Result tables
    m.add_class::<ParallelTasksRow>()?;
    m.add_class::<ParallelLoopsRow>()?;
    m.add_class::<EarliestStartRow>()?;
    m.add_class::<AnalysisReport>()?;

    // Algorithms
    m.add_function(wrap_pyfunction!(py_analyze, m)?)?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_target() {
        assert_eq!(parse_target(None).unwrap(), Target::None);
        assert_eq!(parse_target(Some("GPU")).unwrap(), Target::Gpu);
        assert_eq!(parse_target(Some("accelerator")).unwrap(), Target::Accelerator);
    }

    #[test]
    fn test_parse_model() {
        assert_eq!(parse_model("sw").unwrap(), CostModel::Software);
        assert_eq!(parse_model("hardware").unwrap(), CostModel::Hardware);
    }

    #[test]
    fn test_task_graph_builder() {
        let mut graph = PyTaskGraph::new();
        let root = graph.add_root("root".to_string(), None, None).unwrap();
        let a = graph.add_leaf(root, "a".to_string(), None, None).unwrap();
        let b = graph
            .add_leaf(root, "b".to_string(), Some(vec![Some(4), None]), Some("gpu"))
            .unwrap();
        graph.add_edge(a, b, 0, 0, false, true).unwrap();

        assert_eq!(graph.rank(b).unwrap(), graph.rank(a).unwrap() + 1);
        assert_eq!(graph.level(a).unwrap(), 1);
        assert!(graph.is_streaming(root).unwrap());
        assert_ne!(graph.entry(root).unwrap(), graph.exit(root).unwrap());
        assert!(graph.validate().is_ok());

        let report = run_analysis(
            &mut graph.graph,
            &[TaskTimes::new("a", 2.0, 1.0), TaskTimes::new("b", 1.0, 1.0)],
            None,
        )
        .unwrap();
        assert_eq!(report.parallel_loops.len(), 1);
        assert_eq!(graph.timing(b, "sw").unwrap(), Some((2.0, 3.0)));
    }

    #[test]
    fn test_task_graph_rejects_unknown_handles() {
        let mut graph = PyTaskGraph::new();
        let root = graph.add_root("root".to_string(), None, None).unwrap();
        assert!(graph.add_leaf(root + 100, "x".to_string(), None, None).is_err());
        assert!(graph.remove_edge(7).is_err());
    }
}
