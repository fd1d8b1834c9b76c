//! Earliest start and finish times under the software and hardware cost
//! models.

mod types;
mod walk;

pub use types::{CostModel, DurationTable, TaskTiming};
pub use walk::{collect_durations, schedule_forest, schedule_internal, ScheduleError};
