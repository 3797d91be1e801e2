use crate::domain::error::RelayError;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, oneshot, Mutex, RwLock, Semaphore};
use tokio::time::Instant;
use tracing::{debug, info};

/// What the Adaptive Queue's retry classifier decided for a failed attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    Retry(Duration),
    GiveUp,
}

/// `status()` (spec.md §4.2): a coarse run state, distinct from the
/// per-task `QueuedItem`/`QueueMetrics` detail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RunState {
    Running,
    Paused,
    Killed,
}

/// Reads a `RelayError`'s kind tag and the attempt count so far and decides
/// whether to retry, and after how long. Generalizes the teacher's
/// `TransactionProcessor::process_transaction` fixed `sleep(2s)` loop into
/// exponential backoff with jitter, bounded by `max_delay`.
pub fn classify(
    err: &RelayError,
    attempt: u32,
    base_delay: Duration,
    max_delay: Duration,
) -> RetryDecision {
    if !err.is_retriable() {
        return RetryDecision::GiveUp;
    }
    if let Some(retry_after) = err.retry_after_secs() {
        return RetryDecision::Retry(Duration::from_secs(retry_after));
    }
    let exp = base_delay.saturating_mul(1u32 << attempt.min(10));
    let capped = exp.min(max_delay);
    let jitter_ms = rand::rng().random_range(0..=(capped.as_millis() as u64).max(1) / 4);
    RetryDecision::Retry(capped + Duration::from_millis(jitter_ms))
}

/// Tunables for one `AdaptiveQueue` instance. Each of the Finalizer Queue and
/// Submission Queue gets its own, independently configured.
#[derive(Debug, Clone)]
pub struct QueueConfig {
    pub min_concurrency: usize,
    pub max_concurrency: usize,
    pub initial_concurrency: usize,
    pub max_retries: u32,
    pub base_retry_delay: Duration,
    pub max_retry_delay: Duration,
    pub target_queue_size: usize,
    pub autoscale_interval: Duration,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            min_concurrency: 1,
            max_concurrency: 8,
            initial_concurrency: 2,
            max_retries: 3,
            base_retry_delay: Duration::from_millis(500),
            max_retry_delay: Duration::from_secs(60),
            target_queue_size: 50,
            autoscale_interval: Duration::from_secs(10),
        }
    }
}

/// Rolling counters exposed at `GET /monitoring/metrics`.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct QueueMetrics {
    pub processed: u64,
    pub failed: u64,
    pub retries: u64,
    pub avg_processing_time_ms: f64,
    pub throughput_per_sec: f64,
    pub success_rate: f64,
    pub utilization: f64,
    pub peak_queue_len: usize,
    pub current_queue_len: usize,
    pub current_concurrency: usize,
}

/// Broadcast on the queue's event surface. Subscribers (monitoring, tests)
/// get a best-effort feed; a lagging receiver just misses old events.
#[derive(Debug, Clone, Serialize)]
pub enum QueueEvent {
    TaskStarted { id: String },
    TaskCompleted { id: String, elapsed_ms: u64 },
    TaskFailed { id: String, error: String, attempt: u32 },
    TaskRetrying { id: String, attempt: u32, delay_ms: u64 },
    TaskGivenUp { id: String, error: String },
    MetricsTick(QueueMetrics),
    ConcurrencyAdjusted { from: usize, to: usize },
    Paused,
    Resumed,
    Killed,
}

type TaskFuture<R> = Pin<Box<dyn Future<Output = Result<R, RelayError>> + Send>>;
type TaskFn<T, R> = Arc<dyn Fn(T) -> TaskFuture<R> + Send + Sync>;

struct QueuedItem<T> {
    id: String,
    payload: T,
    attempt: u32,
}

struct ProcessingWindow {
    samples: VecDeque<u64>,
    capacity: usize,
}

impl ProcessingWindow {
    fn new(capacity: usize) -> Self {
        Self { samples: VecDeque::with_capacity(capacity), capacity }
    }

    fn push(&mut self, ms: u64) {
        if self.samples.len() == self.capacity {
            self.samples.pop_front();
        }
        self.samples.push_back(ms);
    }

    fn avg(&self) -> f64 {
        if self.samples.is_empty() {
            0.0
        } else {
            self.samples.iter().sum::<u64>() as f64 / self.samples.len() as f64
        }
    }
}

/// Generic adaptive work queue: bounded concurrency, retry with backoff and
/// jitter, rolling metrics, an autoscaler, and a broadcast event surface.
///
/// Generalized from the teacher's `TransactionProcessor`/`TransactionQueue`
/// (`Arc<Mutex<VecDeque<_>>>` + `tokio::spawn` worker-pool, `Arc<RwLock<bool>>`
/// running flag) — same shape, but concurrency is a `Semaphore` sized by the
/// autoscaler instead of a fixed 10 workers, and each task gets its own retry
/// loop instead of three attempts inlined into the worker body.
pub struct AdaptiveQueue<T, R> {
    config: RwLock<QueueConfig>,
    task_fn: TaskFn<T, R>,
    queue: Mutex<VecDeque<QueuedItem<T>>>,
    semaphore: Arc<Semaphore>,
    permits_issued: AtomicUsize,
    paused: AtomicBool,
    killed: AtomicBool,
    events: broadcast::Sender<QueueEvent>,
    metrics: RwLock<QueueMetrics>,
    window: Mutex<ProcessingWindow>,
    processed: AtomicUsize,
    failed: AtomicUsize,
    retried: AtomicUsize,
    notify: tokio::sync::Notify,
    started_at: Instant,
    completions: Mutex<HashMap<String, oneshot::Sender<Result<R, RelayError>>>>,
}

impl<T, R> AdaptiveQueue<T, R>
where
    T: Send + 'static,
    R: Send + 'static,
{
    pub fn new<F, Fut>(config: QueueConfig, task_fn: F) -> Arc<Self>
    where
        F: Fn(T) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<R, RelayError>> + Send + 'static,
    {
        let (tx, _rx) = broadcast::channel(256);
        let initial = config.initial_concurrency.max(config.min_concurrency);
        let queue = Arc::new(Self {
            semaphore: Arc::new(Semaphore::new(initial)),
            config: RwLock::new(config),
            task_fn: Arc::new(move |t| Box::pin(task_fn(t))),
            queue: Mutex::new(VecDeque::new()),
            permits_issued: AtomicUsize::new(initial),
            paused: AtomicBool::new(false),
            killed: AtomicBool::new(false),
            events: tx,
            metrics: RwLock::new(QueueMetrics { current_concurrency: initial, ..Default::default() }),
            window: Mutex::new(ProcessingWindow::new(100)),
            processed: AtomicUsize::new(0),
            failed: AtomicUsize::new(0),
            retried: AtomicUsize::new(0),
            notify: tokio::sync::Notify::new(),
            started_at: Instant::now(),
            completions: Mutex::new(HashMap::new()),
        });
        queue.clone().spawn_dispatcher();
        queue.clone().spawn_autoscaler();
        queue
    }

    pub fn subscribe(&self) -> broadcast::Receiver<QueueEvent> {
        self.events.subscribe()
    }

    fn emit(&self, event: QueueEvent) {
        let _ = self.events.send(event);
    }

    pub async fn push(&self, id: impl Into<String>, payload: T) {
        let item = QueuedItem { id: id.into(), payload, attempt: 0 };
        let mut guard = self.queue.lock().await;
        guard.push_back(item);
        let mut metrics = self.metrics.write().await;
        metrics.current_queue_len = guard.len();
        metrics.peak_queue_len = metrics.peak_queue_len.max(guard.len());
        drop(metrics);
        drop(guard);
        self.notify.notify_one();
    }

    /// Enqueues and resolves with the effector's result (or the final
    /// retained error after retries are exhausted) — the `push(task) →
    /// future<result>` contract, layered on top of the fire-and-forget
    /// `push` the dispatcher and autoscaler already use internally.
    pub async fn push_and_wait(&self, id: impl Into<String>, payload: T) -> Result<R, RelayError> {
        let id = id.into();
        let (tx, rx) = oneshot::channel();
        self.completions.lock().await.insert(id.clone(), tx);
        self.push(id, payload).await;
        rx.await
            .unwrap_or_else(|_| Err(RelayError::Fatal("adaptive queue dropped task before completion".into())))
    }

    /// `unshift(task) → future<result>` (spec.md §4.2): enqueue at the
    /// head instead of the tail, for priority dispatch ahead of whatever's
    /// already queued.
    pub async fn unshift(&self, id: impl Into<String>, payload: T) {
        let item = QueuedItem { id: id.into(), payload, attempt: 0 };
        let mut guard = self.queue.lock().await;
        guard.push_front(item);
        let mut metrics = self.metrics.write().await;
        metrics.current_queue_len = guard.len();
        metrics.peak_queue_len = metrics.peak_queue_len.max(guard.len());
        drop(metrics);
        drop(guard);
        self.notify.notify_one();
    }

    /// `length()` (spec.md §4.2): number of items waiting to be dispatched.
    pub async fn length(&self) -> usize {
        self.queue.lock().await.len()
    }

    /// `running()` (spec.md §4.2): number of tasks currently executing.
    pub fn running(&self) -> usize {
        let concurrency = self.permits_issued.load(Ordering::SeqCst);
        concurrency.saturating_sub(self.semaphore.available_permits().min(concurrency))
    }

    /// `idle()` (spec.md §4.2): no queued work and nothing in flight.
    pub async fn idle(&self) -> bool {
        self.length().await == 0 && self.running() == 0
    }

    /// `status()` (spec.md §4.2): coarse run state.
    pub fn status(&self) -> RunState {
        if self.killed.load(Ordering::SeqCst) {
            RunState::Killed
        } else if self.paused.load(Ordering::SeqCst) {
            RunState::Paused
        } else {
            RunState::Running
        }
    }

    /// `drain() → future<void>` (spec.md §4.2): resolves once the queue has
    /// no queued work and nothing in flight. Polls rather than subscribing
    /// to completion events, since a poll-based wait is simplest to reason
    /// about against a queue whose contents can grow while draining.
    pub async fn drain(&self) {
        while !self.idle().await {
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    }

    pub async fn pause(&self) {
        self.paused.store(true, Ordering::SeqCst);
        self.emit(QueueEvent::Paused);
    }

    pub async fn resume(&self) {
        self.paused.store(false, Ordering::SeqCst);
        self.notify.notify_waiters();
        self.emit(QueueEvent::Resumed);
    }

    pub async fn kill(&self) {
        self.killed.store(true, Ordering::SeqCst);
        self.notify.notify_waiters();
        self.emit(QueueEvent::Killed);
    }

    pub async fn set_concurrency(&self, target: usize) {
        let mut cfg = self.config.write().await;
        let target = target.clamp(cfg.min_concurrency, cfg.max_concurrency);
        let current = self.permits_issued.load(Ordering::SeqCst);
        if target == current {
            return;
        }
        if target > current {
            self.semaphore.add_permits(target - current);
        } else {
            let to_remove = current - target;
            let sem = self.semaphore.clone();
            tokio::spawn(async move {
                if let Ok(permits) = sem.acquire_many_owned(to_remove as u32).await {
                    permits.forget();
                }
            });
        }
        self.permits_issued.store(target, Ordering::SeqCst);
        cfg.initial_concurrency = target;
        self.metrics.write().await.current_concurrency = target;
        self.emit(QueueEvent::ConcurrencyAdjusted { from: current, to: target });
    }

    pub async fn metrics_snapshot(&self) -> QueueMetrics {
        self.metrics.read().await.clone()
    }

    fn spawn_dispatcher(self: Arc<Self>) {
        tokio::spawn(async move {
            loop {
                if self.killed.load(Ordering::SeqCst) {
                    debug!("adaptive queue dispatcher shutting down");
                    break;
                }
                if self.paused.load(Ordering::SeqCst) {
                    self.notify.notified().await;
                    continue;
                }
                let item = {
                    let mut guard = self.queue.lock().await;
                    let popped = guard.pop_front();
                    let mut metrics = self.metrics.write().await;
                    metrics.current_queue_len = guard.len();
                    popped
                };
                let Some(item) = item else {
                    self.notify.notified().await;
                    continue;
                };
                let Ok(permit) = self.semaphore.clone().acquire_owned().await else {
                    break;
                };
                let this = self.clone();
                tokio::spawn(async move {
                    this.run_item(item).await;
                    drop(permit);
                });
            }
        });
    }

    async fn run_item(self: Arc<Self>, mut item: QueuedItem<T>) {
        self.emit(QueueEvent::TaskStarted { id: item.id.clone() });
        let started = Instant::now();
        let result = (self.task_fn)(item.payload).await;
        let elapsed_ms = started.elapsed().as_millis() as u64;

        match result {
            Ok(value) => {
                self.processed.fetch_add(1, Ordering::SeqCst);
                self.window.lock().await.push(elapsed_ms);
                self.refresh_metrics().await;
                self.emit(QueueEvent::TaskCompleted { id: item.id.clone(), elapsed_ms });
                if let Some(tx) = self.completions.lock().await.remove(&item.id) {
                    let _ = tx.send(Ok(value));
                }
            }
            Err(err) => {
                let cfg = self.config.read().await.clone();
                let decision = classify(&err, item.attempt, cfg.base_retry_delay, cfg.max_retry_delay);
                self.emit(QueueEvent::TaskFailed {
                    id: item.id.clone(),
                    error: err.to_string(),
                    attempt: item.attempt,
                });
                match decision {
                    // `item.attempt` counts retries already spent, so `item.attempt + 1`
                    // is the total number of executions so far (this one included).
                    // `max_retries` is the total attempt budget (spec.md §4.2: "maximum
                    // attempts per task (total, including first)"), so another retry is
                    // only allowed while that total hasn't yet reached the cap.
                    RetryDecision::Retry(delay) if item.attempt + 1 < cfg.max_retries => {
                        self.retried.fetch_add(1, Ordering::SeqCst);
                        item.attempt += 1;
                        let delay_ms = delay.as_millis() as u64;
                        self.emit(QueueEvent::TaskRetrying {
                            id: item.id.clone(),
                            attempt: item.attempt,
                            delay_ms,
                        });
                        let this = self.clone();
                        tokio::spawn(async move {
                            tokio::time::sleep(delay).await;
                            let mut guard = this.queue.lock().await;
                            guard.push_back(item);
                            drop(guard);
                            this.notify.notify_one();
                        });
                    }
                    _ => {
                        self.failed.fetch_add(1, Ordering::SeqCst);
                        self.refresh_metrics().await;
                        self.emit(QueueEvent::TaskGivenUp { id: item.id.clone(), error: err.to_string() });
                        if let Some(tx) = self.completions.lock().await.remove(&item.id) {
                            let _ = tx.send(Err(err));
                        }
                    }
                }
            }
        }
    }

    async fn refresh_metrics(&self) {
        let processed = self.processed.load(Ordering::SeqCst) as u64;
        let failed = self.failed.load(Ordering::SeqCst) as u64;
        let retries = self.retried.load(Ordering::SeqCst) as u64;
        let total = processed + failed;
        let elapsed_secs = self.started_at.elapsed().as_secs_f64().max(0.001);
        let mut metrics = self.metrics.write().await;
        metrics.processed = processed;
        metrics.failed = failed;
        metrics.retries = retries;
        metrics.avg_processing_time_ms = self.window.lock().await.avg();
        metrics.throughput_per_sec = processed as f64 / elapsed_secs;
        metrics.success_rate = if total > 0 { processed as f64 / total as f64 } else { 1.0 };
        let concurrency = self.permits_issued.load(Ordering::SeqCst).max(1);
        metrics.utilization =
            (concurrency - self.semaphore.available_permits().min(concurrency)) as f64 / concurrency as f64;
    }

    fn spawn_autoscaler(self: Arc<Self>) {
        tokio::spawn(async move {
            loop {
                if self.killed.load(Ordering::SeqCst) {
                    break;
                }
                let interval = self.config.read().await.autoscale_interval;
                tokio::time::sleep(interval).await;
                self.refresh_metrics().await;
                let metrics = self.metrics.read().await.clone();
                let cfg = self.config.read().await.clone();

                let queue_len = metrics.current_queue_len;
                let current = self.permits_issued.load(Ordering::SeqCst);
                let running = self.running();
                let avg_time = metrics.avg_processing_time_ms;
                let success_rate = metrics.success_rate;

                // spec.md §4.2 autoscaler rule, evaluated in priority order.
                let (target, reason) = if queue_len > 2 * current && success_rate > 0.95 && avg_time < 5000.0 {
                    ((current + 1).min(cfg.max_concurrency), "queue backlog with healthy throughput")
                } else if avg_time > 10_000.0 || success_rate < 0.90 {
                    (current.saturating_sub(1).max(cfg.min_concurrency), "elevated latency or degraded success rate")
                } else if queue_len == 0 && running < current / 2 {
                    (current.saturating_sub(1).max(cfg.min_concurrency), "idle capacity")
                } else {
                    (current, "steady state")
                };

                if target != current {
                    info!(from = current, to = target, queue_len, reason, "autoscaling adaptive queue concurrency");
                    self.set_concurrency(target).await;
                } else {
                    self.emit(QueueEvent::MetricsTick(metrics));
                }
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicU32;

    #[tokio::test]
    async fn retries_until_success_then_stops() {
        let attempts = Arc::new(AtomicU32::new(0));
        let attempts_clone = attempts.clone();
        let queue: Arc<AdaptiveQueue<u32, ()>> = AdaptiveQueue::new(
            QueueConfig { base_retry_delay: Duration::from_millis(5), ..Default::default() },
            move |_n| {
                let attempts = attempts_clone.clone();
                async move {
                    let count = attempts.fetch_add(1, Ordering::SeqCst);
                    if count < 2 {
                        Err(RelayError::TransientNetwork("not yet".into()))
                    } else {
                        Ok(())
                    }
                }
            },
        );
        let mut rx = queue.subscribe();
        queue.push("t1", 1u32).await;

        let mut completed = false;
        for _ in 0..20 {
            if let Ok(QueueEvent::TaskCompleted { .. }) =
                tokio::time::timeout(Duration::from_millis(200), rx.recv()).await.unwrap_or(Err(broadcast::error::RecvError::Closed))
            {
                completed = true;
                break;
            }
        }
        assert!(completed, "task should eventually succeed after retries");
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn exhausting_retriable_task_runs_exactly_max_retries_times() {
        let attempts = Arc::new(AtomicU32::new(0));
        let attempts_clone = attempts.clone();
        let queue: Arc<AdaptiveQueue<u32, ()>> = AdaptiveQueue::new(
            QueueConfig { max_retries: 3, base_retry_delay: Duration::from_millis(5), ..Default::default() },
            move |_n| {
                let attempts = attempts_clone.clone();
                async move {
                    attempts.fetch_add(1, Ordering::SeqCst);
                    Err(RelayError::TransientNetwork("always fails".into()))
                }
            },
        );
        let mut rx = queue.subscribe();
        queue.push("t1", 1u32).await;

        let mut gave_up = false;
        for _ in 0..20 {
            if let Ok(QueueEvent::TaskGivenUp { .. }) =
                tokio::time::timeout(Duration::from_millis(200), rx.recv()).await.unwrap_or(Err(broadcast::error::RecvError::Closed))
            {
                gave_up = true;
                break;
            }
        }
        assert!(gave_up);
        // retryAttempts=3 is a total-attempt budget including the first try,
        // so an always-failing task must execute exactly 3 times, not 4.
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn non_retriable_error_gives_up_immediately() {
        let calls = Arc::new(AtomicU32::new(0));
        let calls_clone = calls.clone();
        let queue: Arc<AdaptiveQueue<u32, ()>> = AdaptiveQueue::new(QueueConfig::default(), move |_n| {
            let calls = calls_clone.clone();
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(RelayError::Validation("bad payload".into()))
            }
        });
        let mut rx = queue.subscribe();
        queue.push("t1", 1u32).await;

        let mut gave_up = false;
        for _ in 0..20 {
            if let Ok(QueueEvent::TaskGivenUp { .. }) =
                tokio::time::timeout(Duration::from_millis(200), rx.recv()).await.unwrap_or(Err(broadcast::error::RecvError::Closed))
            {
                gave_up = true;
                break;
            }
        }
        assert!(gave_up);
        assert_eq!(calls.load(Ordering::SeqCst), 1, "non-retriable error must not retry");
    }

    #[test]
    fn classify_honors_retry_after_over_backoff() {
        let err = RelayError::RateLimited { message: "slow down".into(), retry_after_secs: Some(7) };
        let decision = classify(&err, 0, Duration::from_millis(500), Duration::from_secs(60));
        assert_eq!(decision, RetryDecision::Retry(Duration::from_secs(7)));
    }

    #[tokio::test]
    async fn push_and_wait_resolves_with_the_task_result() {
        let queue: Arc<AdaptiveQueue<u32, u32>> =
            AdaptiveQueue::new(QueueConfig::default(), |n| async move { Ok(n * 2) });
        let result = queue.push_and_wait("t1", 21u32).await.unwrap();
        assert_eq!(result, 42);
    }

    #[tokio::test]
    async fn push_and_wait_resolves_with_the_final_error_after_giving_up() {
        let queue: Arc<AdaptiveQueue<u32, u32>> = AdaptiveQueue::new(QueueConfig::default(), |_n| async move {
            Err(RelayError::Validation("bad".into()))
        });
        let result = queue.push_and_wait("t1", 1u32).await;
        assert!(matches!(result, Err(RelayError::Validation(_))));
    }

    #[test]
    fn classify_gives_up_on_non_retriable() {
        let err = RelayError::Expired("past maxTime".into());
        let decision = classify(&err, 0, Duration::from_millis(500), Duration::from_secs(60));
        assert_eq!(decision, RetryDecision::GiveUp);
    }

    #[tokio::test]
    async fn unshift_dispatches_ahead_of_already_queued_items() {
        let order = Arc::new(Mutex::new(Vec::new()));
        let queue: Arc<AdaptiveQueue<String, ()>> = AdaptiveQueue::new(
            QueueConfig { initial_concurrency: 1, min_concurrency: 1, ..Default::default() },
            {
                let order = order.clone();
                move |id: String| {
                    let order = order.clone();
                    async move {
                        order.lock().await.push(id);
                        Ok(())
                    }
                }
            },
        );
        // Pause so both items accumulate before the dispatcher drains them.
        queue.pause().await;
        queue.push("back", "back".to_string()).await;
        queue.unshift("front", "front".to_string()).await;
        assert_eq!(queue.length().await, 2);
        queue.resume().await;
        queue.drain().await;
        assert_eq!(*order.lock().await, vec!["front".to_string(), "back".to_string()]);
    }

    #[tokio::test]
    async fn idle_and_drain_reflect_empty_queue_and_no_in_flight_work() {
        let queue: Arc<AdaptiveQueue<u32, ()>> =
            AdaptiveQueue::new(QueueConfig::default(), |_n| async move { Ok(()) });
        assert!(queue.idle().await);
        queue.push("t1", 1u32).await;
        queue.drain().await;
        assert!(queue.idle().await);
        assert_eq!(queue.length().await, 0);
    }

    #[tokio::test]
    async fn status_reports_run_state() {
        let queue: Arc<AdaptiveQueue<u32, ()>> =
            AdaptiveQueue::new(QueueConfig::default(), |_n| async move { Ok(()) });
        assert_eq!(queue.status(), RunState::Running);
        queue.pause().await;
        assert_eq!(queue.status(), RunState::Paused);
        queue.kill().await;
        assert_eq!(queue.status(), RunState::Killed);
    }
}
