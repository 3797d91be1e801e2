pub mod handlers;

use crate::app::AppState;
use actix_web::web;
use std::sync::Arc;

/// Wires every endpoint in spec.md §6 onto the `/api` scope `main.rs`
/// mounts. Kept as a standalone `configure` function (rather than
/// `.service`-registered `#[actix_web::get]` handlers, as the teacher's
/// `main.rs` did for its own routes) because these handlers take their
/// path/body shape from the spec's external interface directly and have
/// no annotated route macros of their own.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/tx/{hash}", web::get().to(handlers::transaction::get_transaction))
        .route("/tx", web::post().to(handlers::transaction::submit_transaction))
        .route("/monitoring/metrics", web::get().to(handlers::monitoring::get_metrics))
        .route("/monitoring/health", web::get().to(handlers::monitoring::get_health))
        .route("/monitoring/queue/pause", web::post().to(handlers::monitoring::pause_queue))
        .route("/monitoring/queue/resume", web::post().to(handlers::monitoring::resume_queue))
        .route(
            "/monitoring/queue/concurrency",
            web::post().to(handlers::monitoring::set_concurrency),
        )
        .route(
            "/monitoring/cleanup/expired",
            web::post().to(handlers::monitoring::cleanup_expired),
        );
}

/// Liveness probe registered outside the `/api` scope's security/rate-limit
/// middleware stack, the way the teacher's `main.rs` keeps its own health
/// endpoints unwrapped.
pub async fn liveness(state: web::Data<Arc<AppState>>) -> impl actix_web::Responder {
    let database = state.store.check_health().await;
    actix_web::HttpResponse::Ok().json(serde_json::json!({
        "status": "ok",
        "database": database,
    }))
}
