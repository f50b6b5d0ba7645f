//! Bounded-concurrency dispatch of independent tasks.
//!
//! A [`Dispatcher`] walks a [`TaskQueue`](throttle_model::TaskQueue) in order,
//! takes one unit from its [`AdmissionGate`] per task and runs the task's
//! [`Work`] on the tokio runtime. At most `concurrency` tasks hold a unit at
//! any instant. A [`Reporter`] samples the gate and the [`RunState`] counters
//! on a fixed interval and is cancelled as soon as dispatch drains.
//!
//! ## Example
//! ```rust,no_run
//! use throttle_core::{DispatchConfig, Dispatcher};
//! use throttle_model::TaskQueue;
//!
//! # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
//! let dispatcher = Dispatcher::builder(DispatchConfig::default()).build()?;
//! let summary = dispatcher.run(&TaskQueue::default_labels()).await?;
//! assert!(summary.is_complete());
//! # Ok(())
//! # }
//! ```

mod config;
pub use config::{
    DispatchConfig, ENV_CONCURRENCY, ENV_FAILURE_RATE, ENV_MAX_DURATION_MS,
    ENV_REPORT_INTERVAL_MS,
};

mod error;
pub use error::{ConfigError, DispatchError, GateClosed, WorkError};

mod gate;
pub use gate::{AdmissionGate, AdmissionPermit};

mod state;
pub use state::RunState;

mod work;
pub use work::{SimulatedWork, Work};

mod metrics;
pub use metrics::{MetricsBackend, MetricsHandle, NoopMetrics};

mod reporter;
pub use reporter::{LogSink, Reporter, SnapshotSink};

mod dispatcher;
pub use dispatcher::{Dispatcher, DispatcherBuilder};
