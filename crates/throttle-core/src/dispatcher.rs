use std::{collections::HashMap, panic::AssertUnwindSafe, sync::Arc, time::Duration};

use futures::FutureExt;

use throttle_model::{RunSummary, Task, TaskOutcome, TaskQueue, TaskReport};
use tokio::{
    task::{Id, JoinError, JoinSet},
    time::Instant,
};
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, debug, error, info, info_span, instrument, warn};
use uuid::Uuid;

use crate::{
    config::DispatchConfig,
    error::{ConfigError, DispatchError, WorkError},
    gate::{AdmissionGate, AdmissionPermit},
    metrics::{MetricsHandle, NoopMetrics},
    reporter::{LogSink, Reporter, SnapshotSink},
    state::RunState,
    work::{SimulatedWork, Work},
};

/// Feeds a task queue through a fixed-size admission gate.
///
/// A dispatcher owns one gate and one set of counters. Calling
/// [`Dispatcher::dispatch`] more than once reuses them: the gate bound holds
/// across calls, while [`RunState`] counters keep accumulating.
pub struct Dispatcher {
    config: DispatchConfig,
    run_id: Uuid,
    gate: AdmissionGate,
    state: RunState,
    work: Arc<dyn Work>,
    metrics: MetricsHandle,
    sink: Arc<dyn SnapshotSink>,
}

pub struct DispatcherBuilder {
    config: DispatchConfig,
    work: Option<Arc<dyn Work>>,
    metrics: Option<MetricsHandle>,
    sink: Option<Arc<dyn SnapshotSink>>,
}

impl DispatcherBuilder {
    /// Replace the default [`SimulatedWork`].
    pub fn with_work(mut self, work: Arc<dyn Work>) -> Self {
        self.work = Some(work);
        self
    }

    pub fn with_metrics(mut self, metrics: MetricsHandle) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Replace the default [`LogSink`] used by [`Dispatcher::run`].
    pub fn with_sink(mut self, sink: Arc<dyn SnapshotSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    pub fn build(self) -> Result<Dispatcher, ConfigError> {
        self.config.validate()?;

        let work = self
            .work
            .unwrap_or_else(|| Arc::new(SimulatedWork::from_config(&self.config)));
        Ok(Dispatcher {
            run_id: Uuid::new_v4(),
            gate: AdmissionGate::new(self.config.concurrency),
            state: RunState::new(),
            metrics: self.metrics.unwrap_or_else(|| Arc::new(NoopMetrics)),
            sink: self.sink.unwrap_or_else(|| Arc::new(LogSink)),
            config: self.config,
            work,
        })
    }
}

impl Dispatcher {
    pub fn builder(config: DispatchConfig) -> DispatcherBuilder {
        DispatcherBuilder {
            config,
            work: None,
            metrics: None,
            sink: None,
        }
    }

    #[inline]
    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    pub fn gate(&self) -> AdmissionGate {
        self.gate.clone()
    }

    pub fn state(&self) -> RunState {
        self.state.clone()
    }

    /// Dispatch with a progress reporter attached for the duration of the run.
    ///
    /// The reporter is cancelled and joined before this returns, so it never
    /// outlives the dispatch.
    pub async fn run(&self, queue: &TaskQueue) -> Result<RunSummary, DispatchError> {
        let token = CancellationToken::new();
        let reporter = Reporter::new(
            self.gate(),
            self.state(),
            queue.len(),
            self.config.report_interval(),
            Arc::clone(&self.sink),
        )
        .spawn(token.clone());

        let result = self.dispatch(queue).await;

        token.cancel();
        if let Err(e) = reporter.await {
            warn!(run = %self.run_id, error = %e, "progress reporter terminated abnormally");
        }
        result
    }

    /// Run every task in `queue` exactly once, at most `concurrency` at a time.
    ///
    /// Returns once all launched tasks have finished. Task failures are
    /// isolated and show up in the summary. If the gate is closed mid-run,
    /// tasks not yet admitted are skipped, admitted ones are drained and
    /// [`DispatchError::GateClosed`] is returned.
    #[instrument(level = "info", skip_all, fields(run = %self.run_id, total = queue.len()))]
    pub async fn dispatch(&self, queue: &TaskQueue) -> Result<RunSummary, DispatchError> {
        let started = Instant::now();
        let total = queue.len();

        let mut group: JoinSet<TaskReport> = JoinSet::new();
        let mut inflight: HashMap<Id, Task> = HashMap::new();
        let mut reports = Vec::with_capacity(total);
        let mut submitted = 0;
        let mut closed = false;

        for task in queue {
            let permit = match self.gate.acquire().await {
                Ok(permit) => permit,
                Err(_) => {
                    closed = true;
                    break;
                }
            };

            while let Some(joined) = group.try_join_next_with_id() {
                reports.push(self.settle(joined, &mut inflight));
            }

            let span = info_span!("task", task = %task);
            let fut = execute(
                task.clone(),
                permit,
                Arc::clone(&self.work),
                self.state.clone(),
                Arc::clone(&self.metrics),
            );
            let handle = group.spawn(fut.instrument(span));
            inflight.insert(handle.id(), task.clone());
            submitted += 1;
        }

        debug!(submitted, "all tasks submitted; waiting for run group");
        while let Some(joined) = group.join_next_with_id().await {
            reports.push(self.settle(joined, &mut inflight));
        }

        if closed {
            error!(submitted, total, "admission gate closed; remaining tasks skipped");
            return Err(DispatchError::GateClosed { submitted, total });
        }

        let completed = reports.iter().filter(|r| r.outcome.is_success()).count();
        let summary = RunSummary {
            total,
            completed,
            failed: reports.len() - completed,
            attempted: reports.len(),
            peak_active: self.gate.peak(),
            elapsed_ms: started.elapsed().as_millis() as u64,
            reports,
        };
        info!(
            completed = summary.completed,
            failed = summary.failed,
            peak_active = summary.peak_active,
            elapsed_ms = summary.elapsed_ms,
            "dispatch finished"
        );
        Ok(summary)
    }

    /// Turn a joined task into its report.
    ///
    /// Panics are caught inside [`execute`], so a join error here means the
    /// task was cancelled before it could report.
    fn settle(
        &self,
        joined: Result<(Id, TaskReport), JoinError>,
        inflight: &mut HashMap<Id, Task>,
    ) -> TaskReport {
        match joined {
            Ok((id, report)) => {
                inflight.remove(&id);
                report
            }
            Err(e) => {
                let task = inflight
                    .remove(&e.id())
                    .unwrap_or_else(|| Task::new("unknown"));

                self.state.record(TaskOutcome::Failed);
                self.metrics
                    .task_finished(&task, TaskOutcome::Failed, Duration::ZERO);
                error!(task = %task, reason = %e, "job end (aborted)");
                TaskReport::failed(task, 0, e.to_string())
            }
        }
    }
}

/// Body of one spawned task.
///
/// `permit` is dropped last: the end of a task, panicked or not, is recorded
/// and logged before its admission unit goes back to the gate.
async fn execute(
    task: Task,
    permit: AdmissionPermit,
    work: Arc<dyn Work>,
    state: RunState,
    metrics: MetricsHandle,
) -> TaskReport {
    let _permit = permit;
    let started = Instant::now();

    info!(task = %task, "job start");
    metrics.task_started(&task);

    let result = match AssertUnwindSafe(work.run(&task)).catch_unwind().await {
        Ok(result) => result,
        Err(_) => Err(WorkError::Panicked),
    };
    let elapsed = started.elapsed();
    let elapsed_ms = elapsed.as_millis() as u64;

    let outcome = if result.is_ok() {
        TaskOutcome::Succeeded
    } else {
        TaskOutcome::Failed
    };
    state.record(outcome);
    metrics.task_finished(&task, outcome, elapsed);

    match result {
        Ok(()) => {
            info!(task = %task, elapsed_ms, "job end");
            TaskReport::succeeded(task, elapsed_ms)
        }
        Err(e) => {
            warn!(
                task = %task,
                elapsed_ms,
                runner = work.name(),
                error = %e,
                "job end (failed)"
            );
            TaskReport::failed(task, elapsed_ms, e.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{
        Mutex,
        atomic::{AtomicUsize, Ordering},
    };

    use async_trait::async_trait;
    use throttle_model::ProgressSnapshot;

    use super::*;

    #[derive(Debug, Clone, PartialEq, Eq)]
    enum Event {
        Start(String),
        End(String),
    }

    /// Fixed-delay work that records start/end order and the live task count.
    #[derive(Default)]
    struct Recorder {
        delay_ms: u64,
        fail: Vec<&'static str>,
        panic_on: Option<&'static str>,
        live: AtomicUsize,
        max_live: AtomicUsize,
        events: Mutex<Vec<Event>>,
    }

    impl Recorder {
        fn with_delay(delay_ms: u64) -> Self {
            Self {
                delay_ms,
                ..Default::default()
            }
        }

        fn events(&self) -> Vec<Event> {
            self.events.lock().unwrap().clone()
        }

        fn starts(&self) -> Vec<String> {
            self.events()
                .into_iter()
                .filter_map(|e| match e {
                    Event::Start(label) => Some(label),
                    Event::End(_) => None,
                })
                .collect()
        }
    }

    #[async_trait]
    impl Work for Recorder {
        fn name(&self) -> &'static str {
            "recorder"
        }

        async fn run(&self, task: &Task) -> Result<(), WorkError> {
            let now = self.live.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_live.fetch_max(now, Ordering::SeqCst);
            self.events
                .lock()
                .unwrap()
                .push(Event::Start(task.to_string()));

            tokio::time::sleep(Duration::from_millis(self.delay_ms)).await;
            if self.panic_on == Some(task.label()) {
                panic!("panic on {task}");
            }

            self.events.lock().unwrap().push(Event::End(task.to_string()));
            self.live.fetch_sub(1, Ordering::SeqCst);

            if self.fail.iter().any(|l| *l == task.label()) {
                return Err(WorkError::Failed(format!("{task} refused")));
            }
            Ok(())
        }
    }

    /// `(message, task)` of every event seen while installed.
    #[derive(Clone, Default)]
    struct LogCapture(Arc<Mutex<Vec<(String, Option<String>)>>>);

    impl LogCapture {
        fn lines(&self) -> Vec<(String, Option<String>)> {
            self.0.lock().unwrap().clone()
        }
    }

    impl<S: tracing::Subscriber> tracing_subscriber::Layer<S> for LogCapture {
        fn on_event(
            &self,
            event: &tracing::Event<'_>,
            _ctx: tracing_subscriber::layer::Context<'_, S>,
        ) {
            let mut fields = EventFields::default();
            event.record(&mut fields);
            self.0.lock().unwrap().push((fields.message, fields.task));
        }
    }

    #[derive(Default)]
    struct EventFields {
        message: String,
        task: Option<String>,
    }

    impl tracing::field::Visit for EventFields {
        fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn std::fmt::Debug) {
            match field.name() {
                "message" => self.message = format!("{value:?}"),
                "task" => self.task = Some(format!("{value:?}")),
                _ => {}
            }
        }
    }

    fn dispatcher(concurrency: usize, work: Arc<dyn Work>) -> Dispatcher {
        Dispatcher::builder(DispatchConfig::default().with_concurrency(concurrency))
            .with_work(work)
            .build()
            .unwrap()
    }

    fn labels(n: usize) -> TaskQueue {
        TaskQueue::from_labels((0..n).map(|i| format!("t{i}")))
    }

    #[tokio::test(start_paused = true)]
    async fn active_tasks_never_exceed_concurrency() {
        let recorder = Arc::new(Recorder::with_delay(10));
        let d = dispatcher(4, recorder.clone());

        let summary = d.dispatch(&labels(40)).await.unwrap();

        assert_eq!(recorder.max_live.load(Ordering::SeqCst), 4);
        assert!(summary.peak_active <= 4);
        assert_eq!(d.gate().in_use(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn every_task_runs_exactly_once() {
        let recorder = Arc::new(Recorder::with_delay(3));
        let d = dispatcher(5, recorder.clone());
        let queue = TaskQueue::default_labels();

        let summary = d.dispatch(&queue).await.unwrap();

        assert!(summary.is_complete());
        assert_eq!(summary.completed, queue.len());
        assert_eq!(d.state().completed(), queue.len());

        let mut started = recorder.starts();
        started.sort();
        let mut expected: Vec<String> = queue.iter().map(|t| t.to_string()).collect();
        expected.sort();
        assert_eq!(started, expected);
    }

    #[tokio::test(start_paused = true)]
    async fn empty_queue_returns_immediately() {
        for concurrency in [1, 3, 64] {
            let d = dispatcher(concurrency, Arc::new(Recorder::with_delay(1_000)));
            let summary = d.dispatch(&TaskQueue::default()).await.unwrap();

            assert_eq!(summary.total, 0);
            assert_eq!(summary.attempted, 0);
            assert_eq!(summary.elapsed_ms, 0);
            assert!(summary.is_complete());
        }
    }

    #[tokio::test(start_paused = true)]
    async fn single_worker_alternates_start_and_end() {
        let recorder = Arc::new(Recorder::with_delay(7));
        let d = dispatcher(1, recorder.clone());

        d.dispatch(&labels(6)).await.unwrap();

        let events = recorder.events();
        assert_eq!(events.len(), 12);
        for pair in events.chunks(2) {
            match pair {
                [Event::Start(a), Event::End(b)] => assert_eq!(a, b),
                other => panic!("overlapping tasks: {other:?}"),
            }
        }
        // With one slot, start order is submission order.
        let expected: Vec<String> = (0..6).map(|i| format!("t{i}")).collect();
        assert_eq!(recorder.starts(), expected);
    }

    #[tokio::test(start_paused = true)]
    async fn full_concurrency_starts_everything_at_once() {
        let recorder = Arc::new(Recorder::with_delay(100));
        let d = dispatcher(10, recorder.clone());

        let summary = d.dispatch(&labels(10)).await.unwrap();

        assert_eq!(recorder.max_live.load(Ordering::SeqCst), 10);
        assert_eq!(summary.peak_active, 10);
        // All ran side by side, so the run took one task's duration.
        assert!(summary.elapsed_ms < 200, "elapsed {}", summary.elapsed_ms);
    }

    #[tokio::test(start_paused = true)]
    async fn stress_thousand_tasks_loses_no_updates() {
        let d = Dispatcher::builder(
            DispatchConfig::default()
                .with_concurrency(1_000)
                .with_max_duration_ms(50),
        )
        .build()
        .unwrap();

        let summary = d.dispatch(&labels(1_000)).await.unwrap();

        assert_eq!(summary.completed, 1_000);
        assert_eq!(d.state().completed(), 1_000);
        assert_eq!(d.state().attempted(), 1_000);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn stress_on_parallel_runtime() {
        let recorder = Arc::new(Recorder::with_delay(1));
        let d = dispatcher(8, recorder.clone());

        let summary = d.dispatch(&labels(500)).await.unwrap();

        assert_eq!(summary.completed, 500);
        assert!(recorder.max_live.load(Ordering::SeqCst) <= 8);
        assert!(d.gate().peak() <= 8);
    }

    #[tokio::test(start_paused = true)]
    async fn failures_are_isolated() {
        let recorder = Arc::new(Recorder {
            delay_ms: 5,
            fail: vec!["t1", "t3"],
            ..Default::default()
        });
        let d = dispatcher(2, recorder.clone());

        let summary = d.dispatch(&labels(6)).await.unwrap();

        assert_eq!(summary.completed, 4);
        assert_eq!(summary.failed, 2);
        assert_eq!(summary.attempted, 6);
        assert!(!summary.is_complete());
        assert_eq!(d.state().failed(), 2);
        assert_eq!(d.gate().in_use(), 0);

        let mut failed: Vec<&str> = summary
            .reports_with(TaskOutcome::Failed)
            .map(|r| r.task.label())
            .collect();
        failed.sort();
        assert_eq!(failed, vec!["t1", "t3"]);
    }

    #[tokio::test(start_paused = true)]
    async fn panicking_task_releases_its_slot() {
        let recorder = Arc::new(Recorder {
            delay_ms: 5,
            panic_on: Some("t0"),
            ..Default::default()
        });
        let d = dispatcher(1, recorder.clone());

        let summary = d.dispatch(&labels(3)).await.unwrap();

        assert_eq!(summary.completed, 2);
        assert_eq!(summary.failed, 1);
        let failed: Vec<_> = summary.reports_with(TaskOutcome::Failed).collect();
        assert_eq!(failed[0].task.label(), "t0");
        assert_eq!(failed[0].error.as_deref(), Some("task panicked"));
        assert_eq!(d.gate().in_use(), 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn panicked_task_is_recorded_before_its_slot_is_reused() {
        /// Start/finish callbacks in the order the backend saw them.
        #[derive(Default)]
        struct Journal(Mutex<Vec<String>>);

        impl crate::MetricsBackend for Journal {
            fn task_started(&self, task: &Task) {
                self.0.lock().unwrap().push(format!("start {task}"));
            }
            fn task_finished(&self, task: &Task, _outcome: TaskOutcome, _elapsed: Duration) {
                self.0.lock().unwrap().push(format!("end {task}"));
            }
        }

        let expected: Vec<String> = (0..3)
            .flat_map(|i| [format!("start t{i}"), format!("end t{i}")])
            .collect();

        for _ in 0..100 {
            let journal = Arc::new(Journal::default());
            let d = Dispatcher::builder(DispatchConfig::default().with_concurrency(1))
                .with_work(Arc::new(Recorder {
                    delay_ms: 1,
                    panic_on: Some("t0"),
                    ..Default::default()
                }))
                .with_metrics(journal.clone())
                .build()
                .unwrap();

            let summary = d.dispatch(&labels(3)).await.unwrap();

            assert_eq!(summary.failed, 1);
            assert_eq!(*journal.0.lock().unwrap(), expected);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn start_and_end_lines_are_logged_per_task() {
        use tracing_subscriber::layer::SubscriberExt;

        let capture = LogCapture::default();
        let _guard = tracing::subscriber::set_default(
            tracing_subscriber::registry().with(capture.clone()),
        );

        let recorder = Arc::new(Recorder {
            delay_ms: 4,
            fail: vec!["t2"],
            panic_on: Some("t4"),
            ..Default::default()
        });
        let d = dispatcher(1, recorder);
        d.dispatch(&labels(6)).await.unwrap();

        let lines: Vec<(String, String)> = capture
            .lines()
            .into_iter()
            .filter(|(msg, _)| msg.starts_with("job "))
            .map(|(msg, task)| (msg, task.expect("job line without a task field")))
            .collect();

        assert_eq!(lines.len(), 12);
        for (i, pair) in lines.chunks(2).enumerate() {
            let label = format!("t{i}");
            assert_eq!(pair[0], ("job start".to_string(), label.clone()));
            assert!(pair[1].0.starts_with("job end"), "{pair:?}");
            assert_eq!(pair[1].1, label);
        }
        assert_eq!(lines[5].0, "job end (failed)");
        assert_eq!(lines[9].0, "job end (failed)");
    }

    #[tokio::test(start_paused = true)]
    async fn closed_gate_stops_submission() {
        let d = dispatcher(2, Arc::new(Recorder::with_delay(5)));
        d.gate().close();

        let err = d.dispatch(&labels(4)).await.unwrap_err();
        assert!(matches!(
            err,
            DispatchError::GateClosed {
                submitted: 0,
                total: 4
            }
        ));

        // Nothing to admit, nothing to refuse.
        assert!(d.dispatch(&TaskQueue::default()).await.is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn gate_closed_mid_run_drains_admitted_tasks() {
        let recorder = Arc::new(Recorder::with_delay(50));
        let d = dispatcher(2, recorder.clone());

        let closer = {
            let gate = d.gate();
            tokio::spawn(async move {
                tokio::time::sleep(Duration::from_millis(10)).await;
                gate.close();
            })
        };

        let err = d.dispatch(&labels(10)).await.unwrap_err();
        closer.await.unwrap();

        assert!(matches!(
            err,
            DispatchError::GateClosed {
                submitted: 2,
                total: 10
            }
        ));
        // Both admitted tasks ran to completion before the error surfaced.
        assert_eq!(d.state().completed(), 2);
        assert_eq!(d.gate().in_use(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn reporter_does_not_change_the_result() {
        let queue = labels(30);
        let config = DispatchConfig::default()
            .with_concurrency(3)
            .with_report_interval_ms(10);

        let snapshots = Arc::new(Mutex::new(Vec::<ProgressSnapshot>::new()));
        let sink: Arc<dyn SnapshotSink> = {
            let snapshots = Arc::clone(&snapshots);
            Arc::new(move |s: &ProgressSnapshot| snapshots.lock().unwrap().push(*s))
        };

        let with_reporter = Dispatcher::builder(config.clone())
            .with_work(Arc::new(Recorder::with_delay(20)))
            .with_sink(sink)
            .build()
            .unwrap();
        let without_reporter = Dispatcher::builder(config)
            .with_work(Arc::new(Recorder::with_delay(20)))
            .build()
            .unwrap();

        let a = with_reporter.run(&queue).await.unwrap();
        let b = without_reporter.dispatch(&queue).await.unwrap();

        assert_eq!(a.completed, 30);
        assert_eq!(a.completed, b.completed);
        assert_eq!(a.attempted, b.attempted);

        let snapshots = snapshots.lock().unwrap();
        assert!(!snapshots.is_empty());
        assert!(snapshots.iter().all(|s| s.active <= 3 && s.queued == 30));
        assert!(snapshots.windows(2).all(|w| w[0].completed <= w[1].completed));
    }

    #[tokio::test(start_paused = true)]
    async fn metrics_see_every_task() {
        #[derive(Default)]
        struct Counting {
            started: AtomicUsize,
            finished: AtomicUsize,
        }

        impl crate::MetricsBackend for Counting {
            fn task_started(&self, _task: &Task) {
                self.started.fetch_add(1, Ordering::SeqCst);
            }
            fn task_finished(&self, _task: &Task, _outcome: TaskOutcome, _elapsed: Duration) {
                self.finished.fetch_add(1, Ordering::SeqCst);
            }
        }

        let metrics = Arc::new(Counting::default());
        let d = Dispatcher::builder(DispatchConfig::default().with_concurrency(4))
            .with_work(Arc::new(Recorder::with_delay(2)))
            .with_metrics(metrics.clone())
            .build()
            .unwrap();

        d.dispatch(&labels(12)).await.unwrap();

        assert_eq!(metrics.started.load(Ordering::SeqCst), 12);
        assert_eq!(metrics.finished.load(Ordering::SeqCst), 12);
    }

    #[test]
    fn invalid_config_is_rejected_at_build() {
        let err = Dispatcher::builder(DispatchConfig::default().with_concurrency(0))
            .build()
            .err();
        assert_eq!(err, Some(ConfigError::ZeroConcurrency));
    }
}
