//! Input and output data types of the analysis.

use pyo3::prelude::*;

/// A task name with its measured software and hardware durations.
#[pyclass]
#[derive(Clone, Debug, PartialEq)]
pub struct TaskTimes {
    #[pyo3(get, set)]
    pub name: String,
    #[pyo3(get, set)]
    pub sw_time: f64,
    #[pyo3(get, set)]
    pub hw_time: f64,
}

impl TaskTimes {
    pub fn new(name: impl Into<String>, sw_time: f64, hw_time: f64) -> Self {
        Self {
            name: name.into(),
            sw_time,
            hw_time,
        }
    }
}

#[pymethods]
impl TaskTimes {
    #[new]
    #[pyo3(signature = (name, sw_time=0.0, hw_time=0.0))]
    fn py_new(name: String, sw_time: f64, hw_time: f64) -> Self {
        Self::new(name, sw_time, hw_time)
    }

    fn __repr__(&self) -> String {
        format!(
            "TaskTimes(name={:?}, sw_time={}, hw_time={})",
            self.name, self.sw_time, self.hw_time
        )
    }
}

fn task_field(name: &str) -> String {
    format!("@{}", name)
}

/// Tasks that may run concurrently with `task`.
#[pyclass]
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ParallelTasksRow {
    #[pyo3(get)]
    pub task: String,
    #[pyo3(get)]
    pub parallel_with: Vec<String>,
}

#[pymethods]
impl ParallelTasksRow {
    /// Row as ordered fields: the task, then each parallel task.
    pub fn fields(&self) -> Vec<String> {
        std::iter::once(&self.task)
            .chain(&self.parallel_with)
            .map(|name| task_field(name))
            .collect()
    }

    fn __repr__(&self) -> String {
        format!(
            "ParallelTasksRow(task={:?}, parallel_with={:?})",
            self.task, self.parallel_with
        )
    }
}

/// Replication dimensions of a loop-parallel task.
#[pyclass]
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ParallelLoopsRow {
    #[pyo3(get)]
    pub task: String,
    #[pyo3(get)]
    pub dimension_count: usize,
    /// Trip count per dimension; `None` when not statically known.
    #[pyo3(get)]
    pub trip_counts: Vec<Option<u64>>,
}

#[pymethods]
impl ParallelLoopsRow {
    /// Row as ordered fields: task, dimension count, then each trip count
    /// with `not_constant_marker` standing in for unknown ones.
    #[pyo3(signature = (not_constant_marker="NC"))]
    pub fn fields(&self, not_constant_marker: &str) -> Vec<String> {
        let mut fields = vec![task_field(&self.task), self.dimension_count.to_string()];
        fields.extend(self.trip_counts.iter().map(|count| match count {
            Some(n) => n.to_string(),
            None => not_constant_marker.to_string(),
        }));
        fields
    }

    fn __repr__(&self) -> String {
        format!(
            "ParallelLoopsRow(task={:?}, dimension_count={}, trip_counts={:?})",
            self.task, self.dimension_count, self.trip_counts
        )
    }
}

/// Earliest start time of a task under both cost models.
#[pyclass]
#[derive(Clone, Debug, Default, PartialEq)]
pub struct EarliestStartRow {
    #[pyo3(get)]
    pub task: String,
    #[pyo3(get)]
    pub software: f64,
    #[pyo3(get)]
    pub hardware: f64,
}

#[pymethods]
impl EarliestStartRow {
    /// Row as ordered fields: task, software EST, hardware EST.
    pub fn fields(&self) -> Vec<String> {
        vec![
            task_field(&self.task),
            format!("{:.6}", self.software),
            format!("{:.6}", self.hardware),
        ]
    }

    fn __repr__(&self) -> String {
        format!(
            "EarliestStartRow(task={:?}, software={}, hardware={})",
            self.task, self.software, self.hardware
        )
    }
}

/// The three tables produced by an analysis run.
///
/// Rows follow the order of the caller's task list, one row per resolved
/// task. Names that matched no node are listed in `unresolved`.
#[pyclass]
#[derive(Clone, Debug, Default)]
pub struct AnalysisReport {
    #[pyo3(get)]
    pub parallel_tasks: Vec<ParallelTasksRow>,
    #[pyo3(get)]
    pub parallel_loops: Vec<ParallelLoopsRow>,
    #[pyo3(get)]
    pub earliest_start: Vec<EarliestStartRow>,
    #[pyo3(get)]
    pub unresolved: Vec<String>,
}

#[pymethods]
impl AnalysisReport {
    fn __repr__(&self) -> String {
        format!(
            "AnalysisReport(parallel_tasks={}, parallel_loops={}, earliest_start={}, unresolved={})",
            self.parallel_tasks.len(),
            self.parallel_loops.len(),
            self.earliest_start.len(),
            self.unresolved.len()
        )
    }
}

impl AnalysisReport {
    /// Parallel set of `task`, if it was resolved.
    pub fn parallel_with(&self, task: &str) -> Option<&[String]> {
        self.parallel_tasks
            .iter()
            .find(|row| row.task == task)
            .map(|row| row.parallel_with.as_slice())
    }

    /// (software, hardware) earliest start of `task`, if it was resolved.
    pub fn earliest_start_of(&self, task: &str) -> Option<(f64, f64)> {
        self.earliest_start
            .iter()
            .find(|row| row.task == task)
            .map(|row| (row.software, row.hardware))
    }
}
