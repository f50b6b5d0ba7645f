use std::time::Duration;

use prometheus::{
    Encoder, Histogram, HistogramOpts, IntCounter, IntCounterVec, IntGauge, Opts, Registry,
    TextEncoder, proto::MetricFamily,
};
use throttle_core::MetricsBackend;
use throttle_model::{Task, TaskOutcome};

/// Task durations are bounded by the simulated maximum (5s by default).
const DURATION_BUCKETS: &[f64] = &[0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.0, 3.0, 4.0, 5.0, 10.0];

/// Cheap to clone; clones share collectors and registry.
#[derive(Clone)]
pub struct PrometheusMetrics {
    registry: Registry,
    active: IntGauge,
    started: IntCounter,
    finished: IntCounterVec,
    duration: Histogram,
}

impl PrometheusMetrics {
    /// Create collectors in a fresh registry.
    pub fn new() -> Result<Self, prometheus::Error> {
        Self::with_registry(Registry::new())
    }

    /// Register collectors in an existing registry.
    pub fn with_registry(registry: Registry) -> Result<Self, prometheus::Error> {
        let active = IntGauge::new("throttle_tasks_active", "Tasks currently holding an admission unit")?;
        let started = IntCounter::new("throttle_tasks_started_total", "Tasks admitted and started")?;
        let finished = IntCounterVec::new(
            Opts::new("throttle_tasks_finished_total", "Tasks finished, by outcome"),
            &["outcome"],
        )?;
        let duration = Histogram::with_opts(
            HistogramOpts::new("throttle_task_duration_seconds", "Task run time in seconds")
                .buckets(DURATION_BUCKETS.to_vec()),
        )?;

        registry.register(Box::new(active.clone()))?;
        registry.register(Box::new(started.clone()))?;
        registry.register(Box::new(finished.clone()))?;
        registry.register(Box::new(duration.clone()))?;

        Ok(Self {
            registry,
            active,
            started,
            finished,
            duration,
        })
    }

    pub fn gather(&self) -> Vec<MetricFamily> {
        self.registry.gather()
    }

    /// Text exposition format of all collectors.
    pub fn encode(&self) -> Result<String, prometheus::Error> {
        let encoder = TextEncoder::new();
        let mut buf = Vec::new();
        encoder.encode(&self.gather(), &mut buf)?;
        String::from_utf8(buf).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }
}

impl MetricsBackend for PrometheusMetrics {
    fn task_started(&self, _task: &Task) {
        self.active.inc();
        self.started.inc();
    }

    fn task_finished(&self, _task: &Task, outcome: TaskOutcome, elapsed: Duration) {
        self.active.dec();
        self.finished.with_label_values(&[outcome.as_str()]).inc();
        self.duration.observe(elapsed.as_secs_f64());
    }
}
