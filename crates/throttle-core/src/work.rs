use std::time::Duration;

use async_trait::async_trait;
use rand::Rng;
use throttle_model::Task;
use tracing::trace;

use crate::{config::DispatchConfig, error::WorkError};

/// The body of a task.
///
/// Implementations must be total with respect to the admission gate: whatever
/// they return, the dispatcher releases the task's unit afterwards.
#[async_trait]
pub trait Work: Send + Sync + 'static {
    fn name(&self) -> &'static str;

    async fn run(&self, task: &Task) -> Result<(), WorkError>;
}

/// Sleeps for a uniformly random duration in `[0, max_duration)`.
///
/// With a non-zero failure rate, each step fails with that probability after
/// its sleep.
#[derive(Debug, Clone)]
pub struct SimulatedWork {
    max_duration_ms: u64,
    failure_rate: f64,
}

impl SimulatedWork {
    pub fn new(max_duration_ms: u64) -> Self {
        Self {
            max_duration_ms,
            failure_rate: 0.0,
        }
    }

    pub fn from_config(cfg: &DispatchConfig) -> Self {
        Self::new(cfg.max_duration_ms).with_failure_rate(cfg.failure_rate)
    }

    /// Probability is clamped to `[0, 1]`; NaN disables failures.
    pub fn with_failure_rate(mut self, failure_rate: f64) -> Self {
        self.failure_rate = if failure_rate.is_nan() {
            0.0
        } else {
            failure_rate.clamp(0.0, 1.0)
        };
        self
    }

    /// Draw the sleep length and whether this step fails.
    fn draw(&self) -> (Duration, bool) {
        let mut rng = rand::rng();
        let delay_ms = if self.max_duration_ms == 0 {
            0
        } else {
            rng.random_range(0..self.max_duration_ms)
        };
        let fail = self.failure_rate > 0.0 && rng.random_bool(self.failure_rate);
        (Duration::from_millis(delay_ms), fail)
    }
}

#[async_trait]
impl Work for SimulatedWork {
    fn name(&self) -> &'static str {
        "simulated"
    }

    async fn run(&self, task: &Task) -> Result<(), WorkError> {
        let (delay, fail) = self.draw();
        trace!(task = %task, delay_ms = delay.as_millis() as u64, "simulating work");

        tokio::time::sleep(delay).await;
        if fail {
            return Err(WorkError::Simulated {
                elapsed_ms: delay.as_millis() as u64,
            });
        }
        Ok(())
    }
}
