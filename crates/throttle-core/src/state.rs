use std::sync::{
    Arc,
    atomic::{AtomicUsize, Ordering},
};

use throttle_model::{ProgressSnapshot, TaskOutcome};

/// Shared run counters, handed to every task and to the reporter.
#[derive(Clone, Default)]
pub struct RunState {
    inner: Arc<Counters>,
}

#[derive(Default)]
struct Counters {
    completed: AtomicUsize,
    failed: AtomicUsize,
    attempted: AtomicUsize,
}

impl RunState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Account for one finished task. Called exactly once per task.
    pub fn record(&self, outcome: TaskOutcome) {
        match outcome {
            TaskOutcome::Succeeded => self.inner.completed.fetch_add(1, Ordering::AcqRel),
            TaskOutcome::Failed => self.inner.failed.fetch_add(1, Ordering::AcqRel),
        };
        self.inner.attempted.fetch_add(1, Ordering::AcqRel);
    }

    #[inline]
    pub fn completed(&self) -> usize {
        self.inner.completed.load(Ordering::Acquire)
    }

    #[inline]
    pub fn failed(&self) -> usize {
        self.inner.failed.load(Ordering::Acquire)
    }

    #[inline]
    pub fn attempted(&self) -> usize {
        self.inner.attempted.load(Ordering::Acquire)
    }

    pub fn snapshot(&self, active: usize, queued: usize) -> ProgressSnapshot {
        ProgressSnapshot {
            active,
            queued,
            completed: self.completed(),
            failed: self.failed(),
        }
    }
}
