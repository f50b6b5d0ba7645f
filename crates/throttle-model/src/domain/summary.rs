use serde::{Deserialize, Serialize};

use crate::{DurationMs, TaskOutcome, TaskReport};

/// Result of a finished dispatch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunSummary {
    /// Queue length.
    pub total: usize,
    /// Successful tasks.
    pub completed: usize,
    /// Failed tasks.
    pub failed: usize,
    /// Every finished task, whatever its outcome.
    pub attempted: usize,
    /// Highest number of simultaneously admitted tasks observed by the gate.
    pub peak_active: usize,
    pub elapsed_ms: DurationMs,
    /// Per-task reports in completion order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub reports: Vec<TaskReport>,
}

impl RunSummary {
    /// Returns `true` when every queued task finished successfully.
    pub fn is_complete(&self) -> bool {
        self.completed == self.total && self.failed == 0
    }

    pub fn reports_with(&self, outcome: TaskOutcome) -> impl Iterator<Item = &TaskReport> {
        self.reports.iter().filter(move |r| r.outcome == outcome)
    }
}
