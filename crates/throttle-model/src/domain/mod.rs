mod task;
pub use task::Task;

mod task_queue;
pub use task_queue::{DEFAULT_LABELS_LEN, TaskQueue};

mod task_outcome;
pub use task_outcome::{TaskOutcome, TaskReport};

mod snapshot;
pub use snapshot::ProgressSnapshot;

mod summary;
pub use summary::RunSummary;

/// Duration value in milliseconds.
///
/// Used in run configuration and in reports where a plain integer is easier to log and serialise.
pub type DurationMs = u64;
