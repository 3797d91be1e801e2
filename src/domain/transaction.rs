use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Status of a transaction record. Transitions are gated by Store CAS;
/// see `infrastructure::storage::store::Store::update_tx_status`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TxStatus {
    Pending,
    Ready,
    Processing,
    Processed,
    Failed,
}

impl TxStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TxStatus::Pending => "pending",
            TxStatus::Ready => "ready",
            TxStatus::Processing => "processing",
            TxStatus::Processed => "processed",
            TxStatus::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, TxStatus::Processed | TxStatus::Failed)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignatureEntry {
    pub key: String,
    pub signature: String,
}

/// The primary entity, keyed by `hash`. See SPEC_FULL.md §3. Wire format is
/// camelCase per spec.md §6's external interface.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionRecord {
    pub hash: String,
    pub blockchain: String,
    pub network_name: String,
    pub payload: String,
    pub encoding: String,
    pub signatures: Vec<SignatureEntry>,
    pub status: TxStatus,
    pub submit: bool,
    pub callback_url: Option<String>,
    pub min_time: i64,
    pub max_time: Option<i64>,
    pub submitted: Option<i64>,
    pub retry_count: u32,
    pub last_error: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
    pub result: Option<serde_json::Value>,
}

impl TransactionRecord {
    pub fn new(
        hash: String,
        blockchain: String,
        network_name: String,
        payload: String,
        encoding: String,
        submit: bool,
        callback_url: Option<String>,
        min_time: i64,
        max_time: Option<i64>,
    ) -> Self {
        let now = Utc::now().timestamp();
        Self {
            hash,
            blockchain,
            network_name,
            payload,
            encoding,
            signatures: Vec::new(),
            status: TxStatus::Pending,
            submit,
            callback_url,
            min_time,
            max_time,
            submitted: None,
            retry_count: 0,
            last_error: None,
            created_at: now,
            updated_at: now,
            result: None,
        }
    }

    /// Merges freshly-deposited signatures into the accumulated set, unique
    /// by key. Only legal while the record is `pending`/`ready` — callers
    /// must check `status` before calling this (invariant: additive only
    /// pre-`Processing`).
    pub fn merge_signatures(&mut self, incoming: &[SignatureEntry]) {
        let existing: HashSet<&str> = self.signatures.iter().map(|s| s.key.as_str()).collect();
        for sig in incoming {
            if !existing.contains(sig.key.as_str()) {
                self.signatures.push(sig.clone());
            }
        }
    }

    pub fn is_expired(&self, now: i64) -> bool {
        matches!(self.max_time, Some(t) if t < now)
    }

    pub fn is_due(&self, now: i64) -> bool {
        self.status == TxStatus::Ready && self.min_time <= now
    }

    /// Combines the stored `payload` with the accumulated `signatures` into
    /// the canonical signed form the Callback Dispatcher POSTs and the
    /// Submission Router effectors build their envelopes from (spec.md
    /// §4.4 step 4). Real per-chain SDK encoding (XDR envelope assembly,
    /// RLP signature splicing) is out of scope (spec.md §1); this returns
    /// the generic `{payload, encoding, signatures}` shape every effector
    /// builds its chain-specific request from.
    pub fn rehydrate(&self) -> serde_json::Value {
        serde_json::json!({
            "hash": self.hash,
            "blockchain": self.blockchain,
            "networkName": self.network_name,
            "payload": self.payload,
            "encoding": self.encoding,
            "signatures": self.signatures,
            "minTime": self.min_time,
            "maxTime": self.max_time,
        })
    }
}

/// Filter accepted by `Store::list_transactions`.
#[derive(Debug, Clone, Default)]
pub struct TransactionFilter {
    pub status: Option<TxStatus>,
    pub min_time_before: Option<i64>,
    pub blockchain: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct TransactionStats {
    pub pending: u64,
    pub ready: u64,
    pub processing: u64,
    pub processed: u64,
    pub failed: u64,
}

impl TransactionStats {
    pub fn total(&self) -> u64 {
        self.pending + self.ready + self.processing + self.processed + self.failed
    }

    pub fn record(&mut self, status: TxStatus) {
        match status {
            TxStatus::Pending => self.pending += 1,
            TxStatus::Ready => self.ready += 1,
            TxStatus::Processing => self.processing += 1,
            TxStatus::Processed => self.processed += 1,
            TxStatus::Failed => self.failed += 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merge_signatures_is_unique_by_key() {
        let mut tx = TransactionRecord::new(
            "deadbeef".into(),
            "stellar".into(),
            "testnet".into(),
            "AAAA".into(),
            "base64".into(),
            false,
            None,
            0,
            None,
        );
        tx.merge_signatures(&[SignatureEntry { key: "a".into(), signature: "sig1".into() }]);
        tx.merge_signatures(&[
            SignatureEntry { key: "a".into(), signature: "sig1-dup".into() },
            SignatureEntry { key: "b".into(), signature: "sig2".into() },
        ]);
        assert_eq!(tx.signatures.len(), 2);
        assert_eq!(tx.signatures[0].signature, "sig1");
    }

    #[test]
    fn expiry_and_due_checks() {
        let mut tx = TransactionRecord::new(
            "h".into(), "stellar".into(), "public".into(), "p".into(), "base64".into(),
            false, None, 100, Some(200),
        );
        assert!(!tx.is_expired(150));
        assert!(tx.is_expired(250));
        assert!(!tx.is_due(50)); // pending, not ready
        tx.status = TxStatus::Ready;
        assert!(!tx.is_due(50)); // min_time not reached
        assert!(tx.is_due(150));
    }
}
