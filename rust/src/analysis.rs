//! End-to-end analysis: name resolution, scheduling under both cost models,
//! and assembly of the three result tables.

use thiserror::Error;

use crate::config::AnalysisConfig;
use crate::graph::{DataflowGraph, GraphError, NodeId};
use crate::independence::are_parallel;
use crate::log_summary;
use crate::models::{AnalysisReport, EarliestStartRow, ParallelLoopsRow, ParallelTasksRow, TaskTimes};
use crate::name_resolution::resolve_task_names;
use crate::timing::{collect_durations, schedule_forest, CostModel, ScheduleError};

/// Errors that abort an analysis run. No partial report is produced.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AnalysisError {
    #[error("Graph error: {0}")]
    Graph(#[from] GraphError),
    #[error("Scheduling failed: {0}")]
    Schedule(#[from] ScheduleError),
}

/// Analyze `tasks` against every root of `graph`.
///
/// Every node's duration slots are reset, then the durations of the
/// resolved tasks are written into them (a repeated name keeps its last
/// durations), so a node not in `tasks` counts as 0. Both cost models are
/// scheduled from scratch. Rows follow the order of `tasks`, one per
/// distinct resolved name.
pub fn analyze(
    graph: &mut DataflowGraph,
    tasks: &[TaskTimes],
    config: &AnalysisConfig,
) -> Result<AnalysisReport, AnalysisError> {
    let verbosity = config.verbosity;
    let policy = config.root_policy();
    graph.set_verbosity(verbosity);
    let roots = graph.roots().to_vec();

    let resolution = resolve_task_names(graph, &roots, tasks, verbosity)?;
    graph.clear_durations();
    for task in tasks {
        if let Some(node) = resolution.get(&task.name) {
            graph.set_duration(node, CostModel::Software, task.sw_time)?;
            graph.set_duration(node, CostModel::Hardware, task.hw_time)?;
        }
    }

    for model in CostModel::ALL {
        let durations = collect_durations(graph, model);
        schedule_forest(graph, &roots, policy, model, &durations, verbosity)?;
    }

    let mut resolved: Vec<(&str, NodeId)> = Vec::with_capacity(resolution.len());
    for task in tasks {
        if let Some(node) = resolution.get(&task.name) {
            if !resolved.iter().any(|(name, _)| *name == task.name) {
                resolved.push((task.name.as_str(), node));
            }
        }
    }

    let mut parallel_with: Vec<Vec<String>> = vec![Vec::new(); resolved.len()];
    for (i, &(name_a, a)) in resolved.iter().enumerate() {
        for (j, &(name_b, b)) in resolved.iter().enumerate().skip(i + 1) {
            if are_parallel(graph, a, b, policy, verbosity)? {
                parallel_with[i].push(name_b.to_string());
                parallel_with[j].push(name_a.to_string());
            }
        }
    }

    let mut report = AnalysisReport {
        unresolved: resolution.unresolved,
        ..Default::default()
    };
    for ((name, node), parallel) in resolved.iter().zip(parallel_with) {
        report.parallel_tasks.push(ParallelTasksRow {
            task: name.to_string(),
            parallel_with: parallel,
        });

        let dimensions = graph.node(*node)?.dimensions();
        if dimensions.is_replicated() {
            report.parallel_loops.push(ParallelLoopsRow {
                task: name.to_string(),
                dimension_count: dimensions.count(),
                trip_counts: dimensions.limits().iter().map(|l| l.as_constant()).collect(),
            });
        }

        let start = |model| graph.timing(*node, model).map_or(0.0, |t| t.earliest_start);
        report.earliest_start.push(EarliestStartRow {
            task: name.to_string(),
            software: start(CostModel::Software),
            hardware: start(CostModel::Hardware),
        });
    }

    log_summary!(
        verbosity,
        "Analysis complete: {} tasks, {} loop-parallel, {} unresolved",
        report.parallel_tasks.len(),
        report.parallel_loops.len(),
        report.unresolved.len()
    );
    Ok(report)
}
