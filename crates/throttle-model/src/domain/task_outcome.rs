use serde::{Deserialize, Serialize};

use crate::{DurationMs, Task};

/// Final state of a task that went through the dispatcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TaskOutcome {
    /// Work step returned successfully.
    Succeeded,
    /// Work step returned an error or panicked. Siblings are unaffected.
    Failed,
}

impl TaskOutcome {
    /// Short symbolic name, used as a metrics label.
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskOutcome::Succeeded => "succeeded",
            TaskOutcome::Failed => "failed",
        }
    }

    #[inline]
    pub fn is_success(&self) -> bool {
        matches!(self, TaskOutcome::Succeeded)
    }
}

/// Record of one finished task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskReport {
    pub task: Task,
    pub outcome: TaskOutcome,
    /// Wall time between admission and completion.
    pub elapsed_ms: DurationMs,
    /// Error message when the outcome is [`TaskOutcome::Failed`].
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl TaskReport {
    pub fn succeeded(task: Task, elapsed_ms: DurationMs) -> Self {
        Self {
            task,
            outcome: TaskOutcome::Succeeded,
            elapsed_ms,
            error: None,
        }
    }

    pub fn failed(task: Task, elapsed_ms: DurationMs, error: impl Into<String>) -> Self {
        Self {
            task,
            outcome: TaskOutcome::Failed,
            elapsed_ms,
            error: Some(error.into()),
        }
    }
}
