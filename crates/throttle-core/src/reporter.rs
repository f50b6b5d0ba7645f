use std::{sync::Arc, time::Duration};

use throttle_model::ProgressSnapshot;
use tokio::{
    task::JoinHandle,
    time::{Instant, MissedTickBehavior},
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::{gate::AdmissionGate, state::RunState};

/// Receiver of periodic progress snapshots.
pub trait SnapshotSink: Send + Sync {
    fn publish(&self, snapshot: &ProgressSnapshot);
}

impl<F> SnapshotSink for F
where
    F: Fn(&ProgressSnapshot) + Send + Sync,
{
    fn publish(&self, snapshot: &ProgressSnapshot) {
        self(snapshot)
    }
}

/// Writes each snapshot as an `info` event.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

impl SnapshotSink for LogSink {
    fn publish(&self, s: &ProgressSnapshot) {
        info!(
            active = s.active,
            queued = s.queued,
            completed = s.completed,
            failed = s.failed,
            "{s}"
        );
    }
}

/// Periodic, read-only observer of a run.
///
/// Holds handles to the gate and counters but never mutates them, so a run
/// produces the same result whether or not a reporter is attached.
pub struct Reporter {
    gate: AdmissionGate,
    state: RunState,
    queued: usize,
    interval: Duration,
    sink: Arc<dyn SnapshotSink>,
}

impl Reporter {
    pub fn new(
        gate: AdmissionGate,
        state: RunState,
        queued: usize,
        interval: Duration,
        sink: Arc<dyn SnapshotSink>,
    ) -> Self {
        Self {
            gate,
            state,
            queued,
            interval: interval.max(Duration::from_millis(1)),
            sink,
        }
    }

    pub fn snapshot(&self) -> ProgressSnapshot {
        self.state.snapshot(self.gate.in_use(), self.queued)
    }

    /// Run on the current runtime until `token` is cancelled.
    pub fn spawn(self, token: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(self.run(token))
    }

    /// First snapshot is taken one interval after start.
    pub async fn run(self, token: CancellationToken) {
        let mut ticker = tokio::time::interval_at(Instant::now() + self.interval, self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                _ = token.cancelled() => break,
                _ = ticker.tick() => self.sink.publish(&self.snapshot()),
            }
        }
        debug!("progress reporter stopped");
    }
}
