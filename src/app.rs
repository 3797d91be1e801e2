use crate::domain::transaction::TransactionRecord;
use crate::infrastructure::config::Config;
use crate::infrastructure::monitoring::manager::MonitoringManager;
use crate::infrastructure::storage::Store;
use crate::pipeline::{CallbackDispatcher, Scheduler, SubmissionRouter};
use crate::queue::adaptive_queue::{AdaptiveQueue, QueueConfig};
use crate::validators::transaction_validator::TransactionValidator;
use std::sync::Arc;
use std::time::Duration;

/// The application root: owns every long-lived handle and wires them in
/// the order spec.md §5/§9 requires (Store → Queues → Scheduler),
/// grounded in the teacher's `main.rs` manual `Arc`-wiring idiom (the
/// teacher never collected these handles into a struct; this expansion
/// does, since `api::handlers` needs a single `actix_web::web::Data<T>`
/// to share across routes).
pub struct AppState {
    pub config: Arc<Config>,
    pub store: Arc<dyn Store>,
    pub finalizer_queue: Arc<AdaptiveQueue<String, ()>>,
    pub submission_queue: Arc<AdaptiveQueue<TransactionRecord, TransactionRecord>>,
    pub scheduler: Arc<Scheduler>,
    pub monitoring: Arc<MonitoringManager>,
    pub validator: Arc<TransactionValidator>,
}

impl AppState {
    /// Builds every handle but does not start the Scheduler's tick loop or
    /// run crash recovery — callers (`main.rs`, tests) control startup
    /// ordering explicitly via `start()`.
    pub fn build(config: Config, store: Arc<dyn Store>) -> Arc<Self> {
        let config = Arc::new(config);
        let monitoring = Arc::new(MonitoringManager::new());
        let validator = Arc::new(TransactionValidator::new(config.clone()));

        let submission_router = Arc::new(SubmissionRouter::new(config.networks.clone()));
        let submission_queue: Arc<AdaptiveQueue<TransactionRecord, TransactionRecord>> = {
            let router = submission_router.clone();
            AdaptiveQueue::new(
                QueueConfig {
                    min_concurrency: 1,
                    max_concurrency: config.max_submission_concurrency,
                    initial_concurrency: config.submission_concurrency,
                    max_retries: config.submission_retry_attempts,
                    base_retry_delay: config.submission_retry_delay(),
                    max_retry_delay: Duration::from_secs(60),
                    target_queue_size: config.target_queue_size,
                    autoscale_interval: config.metrics_interval(),
                },
                move |record: TransactionRecord| {
                    let router = router.clone();
                    async move { router.submit_transaction(record).await }
                },
            )
        };

        let callback_dispatcher = Arc::new(CallbackDispatcher::new());
        let finalizer_queue: Arc<AdaptiveQueue<String, ()>> = {
            let store = store.clone();
            let dispatcher = callback_dispatcher.clone();
            let submission_queue = submission_queue.clone();
            AdaptiveQueue::new(
                QueueConfig {
                    min_concurrency: config.min_parallel_tasks,
                    max_concurrency: config.max_parallel_tasks,
                    initial_concurrency: config.parallel_tasks,
                    max_retries: config.retry_attempts,
                    base_retry_delay: config.retry_delay(),
                    max_retry_delay: Duration::from_secs(60),
                    target_queue_size: config.target_queue_size,
                    autoscale_interval: config.metrics_interval(),
                },
                move |hash: String| {
                    let store = store.clone();
                    let dispatcher = dispatcher.clone();
                    let submission_queue = submission_queue.clone();
                    async move {
                        crate::pipeline::finalizer::process_tx(store, dispatcher, submission_queue, hash).await
                    }
                },
            )
        };

        let scheduler = Scheduler::new(
            store.clone(),
            finalizer_queue.clone(),
            config.target_queue_size,
            config.ticker_timeout(),
        );

        Arc::new(Self {
            config,
            store,
            finalizer_queue,
            submission_queue,
            scheduler,
            monitoring,
            validator,
        })
    }

    /// Crash recovery, then spawns the Scheduler's tick loop. Called once
    /// at process startup, after `build`, before the HTTP listener binds.
    pub async fn start(&self) -> Result<(), crate::domain::error::RelayError> {
        self.scheduler.reset_processing_status().await?;
        let scheduler = self.scheduler.clone();
        tokio::spawn(scheduler.run());
        Ok(())
    }

    /// Graceful shutdown: stop accepting new Scheduler ticks and kill both
    /// queues (in-flight tasks are allowed to finish; see spec.md §5).
    pub async fn shutdown(&self) {
        self.scheduler.shutdown();
        self.finalizer_queue.kill().await;
        self.submission_queue.kill().await;
    }
}
