use crate::domain::error::RelayError;
use crate::domain::transaction::{TransactionRecord, TxStatus};
use crate::infrastructure::storage::{Store, TransactionPatch};
use crate::pipeline::callback_dispatcher::CallbackDispatcher;
use crate::queue::adaptive_queue::AdaptiveQueue;
use chrono::Utc;
use std::sync::Arc;
use tracing::{info, warn};

/// `processTx` (spec.md §4.4): the six-step contract handed to the
/// Finalizer Queue as its task function. Grounded in the teacher's
/// `TransactionProcessor::process_transaction` for the retry-logging shape
/// (structured `tracing` fields in place of its `println!`s), but a single
/// attempt per dispatch — retries are the Adaptive Queue's job, not this
/// function's, per spec.md §4.2/§4.4's division of labor.
pub async fn process_tx(
    store: Arc<dyn Store>,
    callback_dispatcher: Arc<CallbackDispatcher>,
    submission_queue: Arc<AdaptiveQueue<TransactionRecord, TransactionRecord>>,
    hash: String,
) -> Result<(), RelayError> {
    // Step 1: stale-dispatch check.
    let Some(record) = store.find_transaction(&hash).await? else {
        return Err(RelayError::NotFound(hash));
    };
    if record.status != TxStatus::Ready {
        info!(hash = %hash, status = record.status.as_str(), "stale dispatch, skipping");
        return Ok(());
    }

    // Step 2: CAS lock ready -> processing. A miss means another worker won.
    let locked = store
        .update_tx_status(&hash, TxStatus::Processing, TxStatus::Ready, None)
        .await?;
    if !locked {
        info!(hash = %hash, "lost the processing CAS race, another worker has it");
        return Ok(());
    }

    let now = Utc::now().timestamp();

    // Step 3: expiry check, proceeds straight to terminal commit with an
    // "expired" failure — no effector is invoked.
    if record.is_expired(now) {
        let error = "expired: maxTime has passed".to_string();
        commit_failure(&store, &hash, error.clone()).await;
        return Err(RelayError::Expired(error));
    }

    // Step 4/5: rehydration happens inside each effector (callback POST
    // body, submission envelope) from the record's `payload` + accumulated
    // `signatures`; conditionally invoke the Callback Dispatcher and/or
    // Submission Router, awaiting each outcome.
    let outcome = run_effectors(&callback_dispatcher, &submission_queue, record).await;

    // Step 6: atomically commit terminal state.
    match outcome {
        Ok(submitted_record) => {
            let patch = TransactionPatch {
                status: Some(TxStatus::Processed),
                submitted: submitted_record.submitted,
                result: submitted_record.result,
                ..Default::default()
            };
            let committed = store.update_transaction(&hash, patch, TxStatus::Processing).await?;
            if !committed {
                warn!(hash = %hash, "terminal commit lost its CAS; record moved under us");
                return Err(RelayError::StateConflict(hash));
            }
            Ok(())
        }
        Err(err) => {
            commit_failure(&store, &hash, err.to_string()).await;
            Err(err)
        }
    }
}

async fn run_effectors(
    callback_dispatcher: &Arc<CallbackDispatcher>,
    submission_queue: &Arc<AdaptiveQueue<TransactionRecord, TransactionRecord>>,
    record: TransactionRecord,
) -> Result<TransactionRecord, RelayError> {
    let mut record = record;

    if record.callback_url.is_some() {
        callback_dispatcher.process_callback(&record).await?;
    }

    if record.submit {
        let hash = record.hash.clone();
        record = submission_queue.push_and_wait(hash, record).await?;
    }

    Ok(record)
}

/// Best-effort terminal failure commit (spec.md §4.4 step 6): does not
/// itself CAS-fail the error report, since the record may already have
/// moved — the Queue's own retry/failure accounting is what matters upward.
async fn commit_failure(store: &Arc<dyn Store>, hash: &str, error: String) {
    if let Err(e) = store
        .update_tx_status(hash, TxStatus::Failed, TxStatus::Processing, Some(error))
        .await
    {
        warn!(hash = %hash, error = %e, "failed to record terminal failure");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::storage::FileStore;
    use crate::queue::adaptive_queue::QueueConfig;
    use tempfile::tempdir;

    fn ready_record(hash: &str, submit: bool, callback_url: Option<&str>) -> TransactionRecord {
        let mut r = TransactionRecord::new(
            hash.into(), "stellar".into(), "testnet".into(), "deadbeef".into(), "hex".into(),
            submit, callback_url.map(String::from), 0, None,
        );
        r.status = TxStatus::Ready;
        r
    }

    #[tokio::test]
    async fn stale_dispatch_of_a_non_ready_record_is_a_no_op() {
        let dir = tempdir().unwrap();
        let store: Arc<dyn Store> = Arc::new(FileStore::new(dir.path()).unwrap());
        let mut record = ready_record("h1", false, None);
        record.status = TxStatus::Processed;
        store.save_transaction(record).await.unwrap();

        let dispatcher = Arc::new(CallbackDispatcher::new());
        let submission_queue: Arc<AdaptiveQueue<TransactionRecord, TransactionRecord>> =
            AdaptiveQueue::new(QueueConfig::default(), |r| async move { Ok(r) });

        process_tx(store.clone(), dispatcher, submission_queue, "h1".into()).await.unwrap();
        let record = store.find_transaction("h1").await.unwrap().unwrap();
        assert_eq!(record.status, TxStatus::Processed);
    }

    #[tokio::test]
    async fn expired_record_fails_without_invoking_any_effector() {
        let dir = tempdir().unwrap();
        let store: Arc<dyn Store> = Arc::new(FileStore::new(dir.path()).unwrap());
        let mut record = ready_record("h1", true, Some("http://should-not-be-called/"));
        record.max_time = Some(Utc::now().timestamp() - 1);
        store.save_transaction(record).await.unwrap();

        let dispatcher = Arc::new(CallbackDispatcher::new());
        let submission_queue: Arc<AdaptiveQueue<TransactionRecord, TransactionRecord>> =
            AdaptiveQueue::new(QueueConfig::default(), |_r| async move {
                panic!("submission effector must not be invoked for an expired record")
            });

        let err = process_tx(store.clone(), dispatcher, submission_queue, "h1".into()).await.unwrap_err();
        assert!(matches!(err, RelayError::Expired(_)));

        let record = store.find_transaction("h1").await.unwrap().unwrap();
        assert_eq!(record.status, TxStatus::Failed);
        assert!(record.last_error.unwrap().contains("expired"));
    }

    #[tokio::test]
    async fn submit_only_record_reaches_processed_with_submitted_and_result_set() {
        let dir = tempdir().unwrap();
        let store: Arc<dyn Store> = Arc::new(FileStore::new(dir.path()).unwrap());
        store.save_transaction(ready_record("h1", true, None)).await.unwrap();

        let dispatcher = Arc::new(CallbackDispatcher::new());
        let submission_queue: Arc<AdaptiveQueue<TransactionRecord, TransactionRecord>> =
            AdaptiveQueue::new(QueueConfig::default(), |mut r| async move {
                r.submitted = Some(Utc::now().timestamp());
                r.result = Some(serde_json::json!({"hash": "0xabc"}));
                Ok(r)
            });

        process_tx(store.clone(), dispatcher, submission_queue, "h1".into()).await.unwrap();

        let record = store.find_transaction("h1").await.unwrap().unwrap();
        assert_eq!(record.status, TxStatus::Processed);
        assert!(record.submitted.is_some());
        assert!(record.result.is_some());
    }

    #[tokio::test]
    async fn only_one_worker_wins_the_processing_cas_on_concurrent_dispatch() {
        let dir = tempdir().unwrap();
        let store: Arc<dyn Store> = Arc::new(FileStore::new(dir.path()).unwrap());
        store.save_transaction(ready_record("h1", false, None)).await.unwrap();

        let dispatcher = Arc::new(CallbackDispatcher::new());
        let submission_queue: Arc<AdaptiveQueue<TransactionRecord, TransactionRecord>> =
            AdaptiveQueue::new(QueueConfig::default(), |r| async move { Ok(r) });

        let (r1, r2) = tokio::join!(
            process_tx(store.clone(), dispatcher.clone(), submission_queue.clone(), "h1".into()),
            process_tx(store.clone(), dispatcher.clone(), submission_queue.clone(), "h1".into()),
        );
        // Both calls return Ok: the CAS loser's step 2 miss is a no-op, not
        // an error. The CAS itself is what guarantees only one of them
        // actually drove the record to a terminal state.
        assert!(r1.is_ok() && r2.is_ok());

        let stats = store.get_transaction_stats(None).await.unwrap();
        assert_eq!(stats.processed, 1);
    }

    #[tokio::test]
    async fn unknown_hash_is_not_found() {
        let dir = tempdir().unwrap();
        let store: Arc<dyn Store> = Arc::new(FileStore::new(dir.path()).unwrap());
        let dispatcher = Arc::new(CallbackDispatcher::new());
        let submission_queue: Arc<AdaptiveQueue<TransactionRecord, TransactionRecord>> =
            AdaptiveQueue::new(QueueConfig::default(), |r| async move { Ok(r) });

        let err = process_tx(store, dispatcher, submission_queue, "missing".into()).await.unwrap_err();
        assert!(matches!(err, RelayError::NotFound(_)));
    }
}
