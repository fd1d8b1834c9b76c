//! Types for earliest-start scheduling.

use rustc_hash::FxHashMap;
use std::fmt;

use crate::graph::NodeId;

/// Cost model under which durations are measured.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CostModel {
    /// Task runs as software on a general purpose core.
    Software,
    /// Task runs on a hardware accelerator.
    Hardware,
}

impl CostModel {
    pub const ALL: [CostModel; 2] = [CostModel::Software, CostModel::Hardware];

    /// Slot of this model in per-node annotation arrays.
    #[inline]
    pub fn index(self) -> usize {
        match self {
            CostModel::Software => 0,
            CostModel::Hardware => 1,
        }
    }
}

impl fmt::Display for CostModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CostModel::Software => write!(f, "sw"),
            CostModel::Hardware => write!(f, "hw"),
        }
    }
}

/// Leaf durations for one cost model, keyed by node.
pub type DurationTable = FxHashMap<NodeId, f64>;

/// Per-node timing computed by the scheduling walk.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct TaskTiming {
    /// Earliest possible start time.
    pub earliest_start: f64,
    /// Earliest possible finish time.
    pub earliest_finish: f64,
    /// earliest_finish - earliest_start.
    pub duration: f64,
}

impl TaskTiming {
    pub fn new(earliest_start: f64, duration: f64) -> Self {
        Self {
            earliest_start,
            earliest_finish: earliest_start + duration,
            duration,
        }
    }

    /// Zero-length timing, used for Entry/Exit nodes.
    pub fn instant(at: f64) -> Self {
        Self::new(at, 0.0)
    }

    /// Whether finish equals start plus duration (within float noise).
    #[cfg(test)]
    pub(crate) fn is_consistent(&self) -> bool {
        (self.earliest_start + self.duration - self.earliest_finish).abs() < 1e-9
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cost_model_slots_are_distinct() {
        assert_eq!(CostModel::Software.index(), 0);
        assert_eq!(CostModel::Hardware.index(), 1);
        assert_eq!(CostModel::ALL.len(), 2);
    }

    #[test]
    fn test_task_timing_finish() {
        let timing = TaskTiming::new(2.0, 3.0);
        assert_eq!(timing.earliest_finish, 5.0);
        assert!(timing.is_consistent());

        let instant = TaskTiming::instant(4.0);
        assert_eq!(instant.earliest_start, instant.earliest_finish);
        assert_eq!(instant.duration, 0.0);
    }
}
