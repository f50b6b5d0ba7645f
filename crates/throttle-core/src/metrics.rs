use std::{sync::Arc, time::Duration};

use throttle_model::{Task, TaskOutcome};

/// Sink for per-task execution metrics.
///
/// Called from worker tasks; implementations must be cheap and must not block.
pub trait MetricsBackend: Send + Sync {
    fn task_started(&self, task: &Task);
    fn task_finished(&self, task: &Task, outcome: TaskOutcome, elapsed: Duration);
}

pub type MetricsHandle = Arc<dyn MetricsBackend>;

/// Discards everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopMetrics;

impl MetricsBackend for NoopMetrics {
    #[inline]
    fn task_started(&self, _task: &Task) {}

    #[inline]
    fn task_finished(&self, _task: &Task, _outcome: TaskOutcome, _elapsed: Duration) {}
}
