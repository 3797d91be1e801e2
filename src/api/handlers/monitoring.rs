use crate::app::AppState;
use crate::domain::auth::AuthManager;
use crate::infrastructure::monitoring::manager::QueueGauge;
use crate::queue::adaptive_queue::RunState;
use actix_web::{web, HttpRequest, HttpResponse, Responder};
use serde::Deserialize;
use std::sync::Arc;

/// Admin endpoints (`/monitoring/queue/*`, `/monitoring/cleanup/expired`)
/// read this. Authentication of admin endpoints is out of scope for the
/// finalization pipeline itself (spec.md §1); this guard is the thin
/// ambient service the expansion adds, grounded in `domain::auth`'s
/// JWT/API-key idiom. A missing or invalid credential is a `401`, never a
/// silent no-op.
fn require_admin(req: &HttpRequest, state: &AppState) -> Result<(), HttpResponse> {
    if !state.config.security.enable_api_key_validation && !state.config.security.enable_jwt_validation {
        return Ok(());
    }
    if state.config.security.enable_api_key_validation {
        if let Some(key) = req.headers().get("x-api-key").and_then(|v| v.to_str().ok()) {
            if key == state.config.security.api_key {
                return Ok(());
            }
        }
    }
    if state.config.security.enable_jwt_validation {
        if let Some(auth) = req.headers().get("authorization").and_then(|v| v.to_str().ok()) {
            if let Some(token) = auth.strip_prefix("Bearer ") {
                if AuthManager::verify_jwt_token(token).is_ok() {
                    return Ok(());
                }
            }
        }
    }
    Err(HttpResponse::Unauthorized().json(serde_json::json!({
        "error": "UNAUTHORIZED",
        "message": "admin endpoint requires a valid x-api-key header or Bearer JWT",
    })))
}

/// `GET /monitoring/metrics[?blockchain=…]` → `{finalizer:{metrics,status}, database, timestamp}`
/// (spec.md §6). The `blockchain` filter scopes `getTransactionStats`, not the
/// queue gauges themselves — the two Adaptive Queue instances aren't
/// per-blockchain.
#[derive(Debug, Deserialize)]
pub struct MetricsQuery {
    pub blockchain: Option<String>,
}

pub async fn get_metrics(
    state: web::Data<Arc<AppState>>,
    query: web::Query<MetricsQuery>,
) -> impl Responder {
    let finalizer_metrics = state.finalizer_queue.metrics_snapshot().await;
    let submission_metrics = state.submission_queue.metrics_snapshot().await;
    let database = state.store.check_health().await;
    let finalizer_paused = state.finalizer_queue.status() != RunState::Running;
    let submission_paused = state.submission_queue.status() != RunState::Running;
    let mut body = state.monitoring.metrics_snapshot(
        QueueGauge { name: "finalizer".into(), metrics: finalizer_metrics, paused: finalizer_paused },
        QueueGauge { name: "submission".into(), metrics: submission_metrics, paused: submission_paused },
        database,
    );

    if let Some(blockchain) = &query.blockchain {
        match state.store.get_transaction_stats(Some(blockchain)).await {
            Ok(stats) => {
                body["transactionStats"] = serde_json::json!({ "blockchain": blockchain, "stats": stats });
            }
            Err(err) => return err.error_response_json(),
        }
    }

    HttpResponse::Ok().json(body)
}

/// `GET /monitoring/health` → `200 {status:"healthy", queue, database}` iff
/// `!paused ∧ concurrency>0 ∧ db.connected`; else `503 "unhealthy"`
/// (spec.md §6).
pub async fn get_health(state: web::Data<Arc<AppState>>) -> impl Responder {
    let finalizer_metrics = state.finalizer_queue.metrics_snapshot().await;
    let database = state.store.check_health().await;

    let not_paused = state.finalizer_queue.status() == RunState::Running;
    let queue_healthy = not_paused && finalizer_metrics.current_concurrency > 0;
    let healthy = queue_healthy && database.is_healthy;

    let body = serde_json::json!({
        "status": if healthy { "healthy" } else { "unhealthy" },
        "queue": finalizer_metrics,
        "database": database,
    });

    if healthy {
        HttpResponse::Ok().json(body)
    } else {
        HttpResponse::ServiceUnavailable().json(body)
    }
}

/// `POST /monitoring/queue/pause` (admin).
pub async fn pause_queue(req: HttpRequest, state: web::Data<Arc<AppState>>) -> impl Responder {
    if let Err(resp) = require_admin(&req, &state) {
        return resp;
    }
    state.finalizer_queue.pause().await;
    HttpResponse::Ok().json(serde_json::json!({ "status": "paused" }))
}

/// `POST /monitoring/queue/resume` (admin).
pub async fn resume_queue(req: HttpRequest, state: web::Data<Arc<AppState>>) -> impl Responder {
    if let Err(resp) = require_admin(&req, &state) {
        return resp;
    }
    state.finalizer_queue.resume().await;
    HttpResponse::Ok().json(serde_json::json!({ "status": "resumed" }))
}

#[derive(Debug, Deserialize)]
pub struct ConcurrencyRequest {
    pub concurrency: usize,
}

/// `POST /monitoring/queue/concurrency {concurrency∈[1,100]}` (admin).
pub async fn set_concurrency(
    req: HttpRequest,
    state: web::Data<Arc<AppState>>,
    body: web::Json<ConcurrencyRequest>,
) -> impl Responder {
    if let Err(resp) = require_admin(&req, &state) {
        return resp;
    }
    if !(1..=100).contains(&body.concurrency) {
        return HttpResponse::BadRequest().json(serde_json::json!({
            "error": "VALIDATION_ERROR",
            "message": "concurrency must be in [1, 100]",
        }));
    }
    state.finalizer_queue.set_concurrency(body.concurrency).await;
    let metrics = state.finalizer_queue.metrics_snapshot().await;
    HttpResponse::Ok().json(serde_json::json!({ "concurrency": metrics.current_concurrency }))
}

/// `POST /monitoring/cleanup/expired` (admin) → `{cleanedTransactions}`.
pub async fn cleanup_expired(req: HttpRequest, state: web::Data<Arc<AppState>>) -> impl Responder {
    if let Err(resp) = require_admin(&req, &state) {
        return resp;
    }
    match state.store.cleanup_expired_transactions().await {
        Ok(count) => HttpResponse::Ok().json(serde_json::json!({ "cleanedTransactions": count })),
        Err(err) => err.error_response_json(),
    }
}

trait ErrorResponseJson {
    fn error_response_json(&self) -> HttpResponse;
}

impl ErrorResponseJson for crate::domain::error::RelayError {
    fn error_response_json(&self) -> HttpResponse {
        let (status, body) = self.to_http_response();
        HttpResponse::build(status).json(body)
    }
}
