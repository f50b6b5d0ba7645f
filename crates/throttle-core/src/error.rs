use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("{key}: cannot parse {value:?}: {reason}")]
    InvalidValue {
        key: &'static str,
        value: String,
        reason: String,
    },
    #[error("concurrency must be at least 1")]
    ZeroConcurrency,
    #[error("concurrency {0} exceeds the admission gate capacity limit")]
    ConcurrencyTooLarge(usize),
    #[error("report interval must be at least 1ms")]
    ZeroReportInterval,
    #[error("failure rate {0} is outside [0, 1]")]
    FailureRateOutOfRange(f64),
}

/// Returned by [`AdmissionGate::acquire`](crate::AdmissionGate::acquire) once the gate is closed.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("admission gate is closed")]
pub struct GateClosed;

#[derive(Error, Debug)]
pub enum DispatchError {
    /// Submission stopped early; tasks already admitted were drained first.
    #[error("admission gate closed after {submitted} of {total} tasks were submitted")]
    GateClosed { submitted: usize, total: usize },
    #[error("invalid dispatch config: {0}")]
    Config(#[from] ConfigError),
}

/// Failure of a single work step. Never aborts sibling tasks.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WorkError {
    #[error("simulated failure after {elapsed_ms}ms")]
    Simulated { elapsed_ms: u64 },
    #[error("{0}")]
    Failed(String),
    /// The work step unwound. Caught inside the task so the permit outlives it.
    #[error("task panicked")]
    Panicked,
}
