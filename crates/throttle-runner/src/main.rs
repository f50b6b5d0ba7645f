use std::sync::Arc;

use anyhow::Context;
use tracing::{info, warn};

use throttle_core::{DispatchConfig, Dispatcher};
use throttle_model::{RunSummary, TaskQueue};
use throttle_observe::{LoggerConfig, logger_init};
use throttle_prometheus::PrometheusMetrics;

/// Set to `1` or `true` to print the Prometheus exposition after the run.
const ENV_METRICS: &str = "THROTTLE_METRICS";

fn main() -> anyhow::Result<()> {
    // 1) Logger, before the runtime starts its worker threads.
    let log_cfg = LoggerConfig::from_env()?;
    logger_init(&log_cfg)?;

    // 2) Dispatch settings
    let cfg = DispatchConfig::from_env().context("reading dispatch config")?;
    let queue = TaskQueue::default_labels();
    print!("{}", banner(queue.len(), &cfg));

    // 3) Runtime
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("building tokio runtime")?;

    let summary = runtime.block_on(run(cfg, queue))?;
    if summary.failed > 0 {
        warn!(failed = summary.failed, "some tasks failed");
    }
    Ok(())
}

async fn run(cfg: DispatchConfig, queue: TaskQueue) -> anyhow::Result<RunSummary> {
    let metrics = PrometheusMetrics::new().context("registering metrics")?;
    let dispatcher = Dispatcher::builder(cfg)
        .with_metrics(Arc::new(metrics.clone()))
        .build()?;
    info!(run = %dispatcher.run_id(), "dispatcher ready");

    let summary = dispatcher.run(&queue).await?;
    info!(
        completed = summary.completed,
        failed = summary.failed,
        total = summary.total,
        "all tasks finished"
    );

    if metrics_requested() {
        print!("{}", metrics.encode().context("encoding metrics")?);
    }
    Ok(summary)
}

fn metrics_requested() -> bool {
    std::env::var(ENV_METRICS)
        .map(|v| matches!(v.trim(), "1" | "true" | "yes"))
        .unwrap_or(false)
}

fn banner(queue_len: usize, cfg: &DispatchConfig) -> String {
    format!(
        "\nQueue: {queue_len}\nConcurrency: {}\nDuration: up to {} milliseconds\n\n",
        cfg.concurrency, cfg.max_duration_ms
    )
}
