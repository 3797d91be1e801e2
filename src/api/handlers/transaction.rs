use crate::app::AppState;
use crate::domain::transaction::{SignatureEntry, TransactionRecord, TxStatus};
use actix_web::{web, HttpResponse, Responder, ResponseError};
use chrono::Utc;
use serde::Deserialize;
use std::sync::Arc;

/// The canonical deposit shape (spec.md §3/§6).
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CanonicalDeposit {
    hash: String,
    blockchain: String,
    network_name: String,
    payload: String,
    #[serde(default = "default_encoding")]
    encoding: String,
    #[serde(default)]
    signatures: Vec<SignatureEntry>,
    #[serde(default)]
    submit: bool,
    #[serde(default)]
    callback_url: Option<String>,
    #[serde(default)]
    min_time: i64,
    #[serde(default)]
    max_time: Option<i64>,
}

/// The legacy deposit shape this endpoint must still accept (spec.md §6):
/// a bare `{network, xdr, …}` envelope from the reference chain's older
/// client integrations, predating the multi-chain `blockchain`/`payload`
/// fields.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LegacyDeposit {
    hash: String,
    network: String,
    xdr: String,
    #[serde(default)]
    signatures: Vec<SignatureEntry>,
    #[serde(default)]
    submit: bool,
    #[serde(default)]
    callback_url: Option<String>,
    #[serde(default)]
    min_time: i64,
    #[serde(default)]
    max_time: Option<i64>,
}

fn default_encoding() -> String {
    "base64".to_string()
}

/// Accepts either shape, normalizing the legacy form to canonical fields.
/// The legacy form only ever spoke for the reference chain, so its
/// `network` maps to `networkName` with `blockchain` fixed at `"stellar"`
/// and `xdr` treated as a base64-encoded `payload`.
#[derive(Debug)]
struct NormalizedDeposit {
    hash: String,
    blockchain: String,
    network_name: String,
    payload: String,
    encoding: String,
    signatures: Vec<SignatureEntry>,
    submit: bool,
    callback_url: Option<String>,
    min_time: i64,
    max_time: Option<i64>,
}

impl From<CanonicalDeposit> for NormalizedDeposit {
    fn from(d: CanonicalDeposit) -> Self {
        Self {
            hash: d.hash,
            blockchain: d.blockchain,
            network_name: d.network_name,
            payload: d.payload,
            encoding: d.encoding,
            signatures: d.signatures,
            submit: d.submit,
            callback_url: d.callback_url,
            min_time: d.min_time,
            max_time: d.max_time,
        }
    }
}

impl From<LegacyDeposit> for NormalizedDeposit {
    fn from(d: LegacyDeposit) -> Self {
        Self {
            hash: d.hash,
            blockchain: "stellar".to_string(),
            network_name: d.network,
            payload: d.xdr,
            encoding: "base64".to_string(),
            signatures: d.signatures,
            submit: d.submit,
            callback_url: d.callback_url,
            min_time: d.min_time,
            max_time: d.max_time,
        }
    }
}

fn normalize(body: &serde_json::Value) -> Result<NormalizedDeposit, String> {
    if body.get("xdr").is_some() || body.get("network").is_some() {
        serde_json::from_value::<LegacyDeposit>(body.clone())
            .map(NormalizedDeposit::from)
            .map_err(|e| format!("invalid legacy deposit: {e}"))
    } else {
        serde_json::from_value::<CanonicalDeposit>(body.clone())
            .map(NormalizedDeposit::from)
            .map_err(|e| format!("invalid deposit: {e}"))
    }
}

/// `GET /tx/{hash}` → rehydrated record JSON; `404` if unknown.
pub async fn get_transaction(
    state: web::Data<Arc<AppState>>,
    path: web::Path<String>,
) -> impl Responder {
    let hash = path.into_inner();
    match state.store.find_transaction(&hash).await {
        Ok(Some(record)) => HttpResponse::Ok().json(record),
        Ok(None) => HttpResponse::NotFound().json(serde_json::json!({
            "error": "NOT_FOUND",
            "message": format!("no transaction with hash '{hash}'"),
        })),
        Err(err) => err.error_response(),
    }
}

/// `POST /tx` → accept a deposit in canonical or legacy form; upsert;
/// return the rehydrated record. Triggers an immediate scheduler check so
/// a deposit that's already `ready ∧ due` doesn't wait for the next
/// regular tick.
pub async fn submit_transaction(
    state: web::Data<Arc<AppState>>,
    body: web::Json<serde_json::Value>,
) -> impl Responder {
    let deposit = match normalize(&body) {
        Ok(d) => d,
        Err(message) => {
            return HttpResponse::BadRequest().json(serde_json::json!({
                "error": "VALIDATION_ERROR",
                "message": message,
            }));
        }
    };

    let validation = state.validator.validate_deposit(
        &deposit.hash,
        &deposit.blockchain,
        &deposit.payload,
        &deposit.encoding,
        &deposit.signatures,
        deposit.min_time,
        deposit.max_time,
    );
    if !validation.valid {
        return HttpResponse::BadRequest().json(serde_json::json!({
            "error": "VALIDATION_ERROR",
            "errors": validation.errors,
            "warnings": validation.warnings,
        }));
    }

    let mut record = TransactionRecord::new(
        deposit.hash.clone(),
        deposit.blockchain,
        deposit.network_name,
        deposit.payload,
        deposit.encoding,
        deposit.submit,
        deposit.callback_url,
        deposit.min_time,
        deposit.max_time,
    );
    record.signatures = deposit.signatures;
    // Readiness (sufficient-signature inference) is an external signer-
    // discovery collaborator's job (spec.md §1 out-of-scope); any deposit
    // carrying at least one signature is treated as ready to finalize here.
    if !record.signatures.is_empty() {
        record.status = TxStatus::Ready;
    }

    if let Err(err) = state.store.save_transaction(record).await {
        return err.error_response();
    }

    if deposit.min_time <= Utc::now().timestamp() {
        state.scheduler.trigger_immediate_check().await;
    }

    match state.store.find_transaction(&deposit.hash).await {
        Ok(Some(saved)) => HttpResponse::Ok().json(saved),
        Ok(None) => HttpResponse::InternalServerError().json(serde_json::json!({
            "error": "INTERNAL_ERROR",
            "message": "record vanished immediately after being saved",
        })),
        Err(err) => err.error_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn legacy_deposit_normalizes_to_stellar_canonical_fields() {
        let body = serde_json::json!({
            "hash": "deadbeef",
            "network": "testnet",
            "xdr": "AAAAAgAAAAA=",
            "submit": true,
        });
        let normalized = normalize(&body).unwrap();
        assert_eq!(normalized.blockchain, "stellar");
        assert_eq!(normalized.network_name, "testnet");
        assert_eq!(normalized.payload, "AAAAAgAAAAA=");
        assert_eq!(normalized.encoding, "base64");
        assert!(normalized.submit);
    }

    #[test]
    fn canonical_deposit_passes_through_with_default_encoding() {
        let body = serde_json::json!({
            "hash": "deadbeef",
            "blockchain": "ethereum",
            "networkName": "mainnet",
            "payload": "0xdead",
        });
        let normalized = normalize(&body).unwrap();
        assert_eq!(normalized.blockchain, "ethereum");
        assert_eq!(normalized.encoding, "base64");
    }

    #[test]
    fn malformed_body_is_rejected() {
        let body = serde_json::json!({"hash": "deadbeef"});
        assert!(normalize(&body).is_err());
    }
}
