use std::fmt;

use serde::{Deserialize, Serialize};

/// Point-in-time view of a run, produced by the progress reporter.
///
/// Fields are read from independent atomics, so a snapshot is approximate:
/// `active` and `completed` may come from slightly different instants.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressSnapshot {
    /// Tasks currently holding an admission unit.
    pub active: usize,
    /// Total queue length; constant for the run.
    pub queued: usize,
    /// Tasks finished successfully so far.
    pub completed: usize,
    /// Tasks finished with a failure so far.
    pub failed: usize,
}

impl ProgressSnapshot {
    /// Tasks that have not finished yet (in flight or not yet admitted).
    pub fn remaining(&self) -> usize {
        self.queued.saturating_sub(self.completed + self.failed)
    }
}

impl fmt::Display for ProgressSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Concurrency: {} | Queue: {} | Done: {}",
            self.active, self.queued, self.completed
        )
    }
}
