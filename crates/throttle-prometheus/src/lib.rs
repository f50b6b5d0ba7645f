//! Prometheus metrics backend for the throttle dispatcher.
//!
//! [`PrometheusMetrics`] implements [`throttle_core::MetricsBackend`] and keeps
//! its collectors in a private `prometheus::Registry`.
//!
//! ## Example
//! ```rust
//! use std::sync::Arc;
//! use throttle_core::{DispatchConfig, Dispatcher};
//! use throttle_prometheus::PrometheusMetrics;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let metrics = PrometheusMetrics::new()?;
//! let dispatcher = Dispatcher::builder(DispatchConfig::default())
//!     .with_metrics(Arc::new(metrics.clone()))
//!     .build()?;
//! # let _ = dispatcher;
//! let exposition = metrics.encode()?;
//! assert!(exposition.contains("throttle_tasks_active"));
//! # Ok(())
//! # }
//! ```
//!
//! ## Metrics
//! - `throttle_tasks_active` - Gauge
//! - `throttle_tasks_started_total` - Counter
//! - `throttle_tasks_finished_total{outcome}` - Counter
//! - `throttle_task_duration_seconds` - Histogram
//!
//! No HTTP endpoint is provided; callers decide where the exposition goes.

mod backend;
pub use backend::PrometheusMetrics;
