use crate::domain::error::{BlockchainError, BlockchainErrorKind, RelayError};
use crate::domain::transaction::TransactionRecord;
use crate::infrastructure::config::NetworkConfig;
use chrono::Utc;
use reqwest::Client;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Chain families this router knows how to dispatch to. Anything else is
/// `RelayError::Blockchain(UnsupportedChain)`; a tag this router recognizes
/// but whose network isn't configured is `NotImplemented` instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ChainFamily {
    /// The reference chain (spec.md §4.6) — Horizon-style HTTP submission.
    Reference,
    /// The generic RPC / EVM-compatible family — `eth_sendRawTransaction`.
    GenericRpc,
}

fn classify_chain(blockchain: &str) -> Option<ChainFamily> {
    match blockchain {
        "stellar" => Some(ChainFamily::Reference),
        "ethereum" | "evm" | "base" | "polygon" | "arbitrum" | "optimism" | "celo" => {
            Some(ChainFamily::GenericRpc)
        }
        _ => None,
    }
}

/// Dispatches a rehydrated record to its chain's effector, grounded in the
/// teacher's `BlockchainManager` for the generic-RPC family (its
/// `provider.send_raw_transaction` call via `ethers::providers::{Provider,
/// Http}`) and newly written for the reference-chain family, which the
/// teacher has no equivalent of. One `reqwest::Client` is cached per
/// network endpoint, mirroring the teacher's per-chain `Provider<Http>`
/// cache in `BlockchainManager::new`.
pub struct SubmissionRouter {
    networks: HashMap<String, NetworkConfig>,
    clients: RwLock<HashMap<String, Arc<Client>>>,
}

impl SubmissionRouter {
    pub fn new(networks: HashMap<String, NetworkConfig>) -> Self {
        Self { networks, clients: RwLock::new(HashMap::new()) }
    }

    async fn client_for(&self, network_name: &str) -> Arc<Client> {
        if let Some(client) = self.clients.read().await.get(network_name) {
            return client.clone();
        }
        let client = Arc::new(Client::new());
        self.clients.write().await.insert(network_name.to_string(), client.clone());
        client
    }

    /// `submitTransaction` (spec.md §4.6). Dispatches on `record.blockchain`
    /// and returns the record carrying `submitted`/`result` on success.
    pub async fn submit_transaction(
        &self,
        mut record: TransactionRecord,
    ) -> Result<TransactionRecord, RelayError> {
        let Some(family) = classify_chain(&record.blockchain) else {
            return Err(RelayError::Blockchain(BlockchainError::new(
                BlockchainErrorKind::UnsupportedChain,
                format!("no effector registered for blockchain '{}'", record.blockchain),
            )));
        };

        let Some(network) = self.networks.get(&record.network_name).cloned() else {
            return Err(RelayError::Blockchain(BlockchainError::new(
                BlockchainErrorKind::NotImplemented,
                format!("network '{}' is not configured", record.network_name),
            )));
        };

        let result = match family {
            ChainFamily::Reference => self.submit_reference_chain(&record, &network).await?,
            ChainFamily::GenericRpc => self.submit_generic_rpc(&record, &network).await?,
        };

        record.submitted = Some(Utc::now().timestamp());
        record.result = Some(result);
        Ok(record)
    }

    /// Horizon-style reference-chain effector: POST the rehydrated envelope
    /// to `{endpoint}/transactions`, preserving `status`/`detail`/
    /// `result_codes`/`operation_codes`/`retry-after` on failure so the
    /// classifier can tell 429 apart from 400-class rejections.
    async fn submit_reference_chain(
        &self,
        record: &TransactionRecord,
        network: &NetworkConfig,
    ) -> Result<serde_json::Value, RelayError> {
        let client = self.client_for(&record.network_name).await;
        let url = format!("{}/transactions", network.endpoint.trim_end_matches('/'));
        let body = serde_json::json!({
            "tx": record.payload,
            "signatures": record.signatures,
            "networkPassphrase": network.passphrase,
        });

        let response = client.post(&url).json(&body).send().await?;
        let status = response.status();
        let retry_after_secs = response
            .headers()
            .get(reqwest::header::RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse::<u64>().ok());

        if status.is_success() {
            let payload: serde_json::Value = response.json().await.unwrap_or(serde_json::Value::Null);
            return Ok(serde_json::json!({
                "hash": record.hash,
                "submittedAt": Utc::now().timestamp(),
                "chainResponse": payload,
            }));
        }

        let body: serde_json::Value = response.json().await.unwrap_or(serde_json::Value::Null);
        let mut err = BlockchainError::new(
            BlockchainErrorKind::SubmissionRejected,
            format!("reference chain endpoint rejected submission with status {status}"),
        );
        err.status = Some(status.as_u16());
        err.detail = body.get("detail").and_then(|v| v.as_str()).map(String::from);
        err.result_codes = body.get("extras").and_then(|e| e.get("result_codes")).cloned();
        err.operation_codes = err
            .result_codes
            .as_ref()
            .and_then(|rc| rc.get("operations"))
            .and_then(|ops| ops.as_array())
            .map(|ops| ops.iter().filter_map(|v| v.as_str().map(String::from)).collect());
        err.retry_after_secs = retry_after_secs;
        Err(RelayError::Blockchain(err))
    }

    /// Generic-RPC / EVM-family effector: `eth_sendRawTransaction` over
    /// JSON-RPC, classifying the RPC `error` field into a
    /// `RelayError::Blockchain` instead of leaning on a fixed chain-id
    /// table the way the teacher's deleted `BlockchainManager` did.
    async fn submit_generic_rpc(
        &self,
        record: &TransactionRecord,
        network: &NetworkConfig,
    ) -> Result<serde_json::Value, RelayError> {
        let client = self.client_for(&record.network_name).await;
        let raw_tx = if record.payload.starts_with("0x") {
            record.payload.clone()
        } else {
            format!("0x{}", record.payload)
        };

        let rpc_request = serde_json::json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": "eth_sendRawTransaction",
            "params": [raw_tx],
        });

        let response = client.post(&network.endpoint).json(&rpc_request).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(RelayError::TransientNetwork(format!(
                "RPC endpoint returned {status}"
            )));
        }

        let body: serde_json::Value = response.json().await?;
        if let Some(error) = body.get("error") {
            let code = error.get("code").and_then(|c| c.as_i64()).unwrap_or(-1);
            let message = error
                .get("message")
                .and_then(|m| m.as_str())
                .unwrap_or("unknown RPC error")
                .to_string();
            let mut err = BlockchainError::new(BlockchainErrorKind::RpcError, message);
            err.status = Some(if code == -32000 { 429 } else { 400 });
            return Err(RelayError::Blockchain(err));
        }

        let tx_hash = body
            .get("result")
            .and_then(|r| r.as_str())
            .ok_or_else(|| RelayError::Blockchain(BlockchainError::new(
                BlockchainErrorKind::RpcError,
                "RPC response carried neither result nor error",
            )))?;

        Ok(serde_json::json!({
            "hash": tx_hash,
            "submittedAt": Utc::now().timestamp(),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_record(blockchain: &str, network_name: &str) -> TransactionRecord {
        TransactionRecord::new(
            "h1".into(), blockchain.into(), network_name.into(), "deadbeef".into(), "hex".into(),
            true, None, 0, None,
        )
    }

    #[tokio::test]
    async fn unknown_blockchain_is_unsupported() {
        let router = SubmissionRouter::new(HashMap::new());
        let err = router.submit_transaction(sample_record("dogecoin", "mainnet")).await.unwrap_err();
        match err {
            RelayError::Blockchain(e) => assert_eq!(e.kind, BlockchainErrorKind::UnsupportedChain),
            other => panic!("expected Blockchain(UnsupportedChain), got {other:?}"),
        }
    }

    #[tokio::test]
    async fn recognized_chain_without_configured_network_is_not_implemented() {
        let router = SubmissionRouter::new(HashMap::new());
        let err = router.submit_transaction(sample_record("ethereum", "nowhere")).await.unwrap_err();
        match err {
            RelayError::Blockchain(e) => assert_eq!(e.kind, BlockchainErrorKind::NotImplemented),
            other => panic!("expected Blockchain(NotImplemented), got {other:?}"),
        }
    }
}
