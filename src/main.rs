use actix_web::{web, App, HttpServer};
use airchainpay_relay::api;
use airchainpay_relay::app::AppState;
use airchainpay_relay::domain::error::RelayError;
use airchainpay_relay::infrastructure::config::Config;
use airchainpay_relay::infrastructure::logger::Logger;
use airchainpay_relay::infrastructure::monitoring::manager::MonitoringManager;
use airchainpay_relay::infrastructure::storage::FileStore;
use airchainpay_relay::middleware::error_handling::ErrorHandlingMiddleware;
use airchainpay_relay::middleware::metrics::MetricsMiddleware;
use airchainpay_relay::middleware::rate_limiting::RateLimitingMiddleware;
use airchainpay_relay::middleware::{ComprehensiveSecurityMiddleware, EnhancedSecurityConfig};
use airchainpay_relay::utils::error_handler::EnhancedErrorHandler;
use std::sync::Arc;
use std::time::Duration;

/// Process entry point: wires the application root in the order spec.md
/// §9 requires (Store → Queues → Scheduler), binds the HTTP surface, and
/// drives graceful shutdown on SIGINT with a 10s hard-kill timer (spec.md
/// §5/§6). Grounded in the teacher's `main.rs` manual Arc-wiring and staged
/// `log::info!` startup narration, re-pointed at `AppState` instead of the
/// teacher's standalone handle list — the teacher never had a graceful
/// shutdown path, which this expansion supplements per SPEC_FULL.md's
/// ambient-stack section.
#[actix_web::main]
async fn main() -> std::io::Result<()> {
    Logger::init("info");
    log::info!("starting finalization pipeline relay");

    let config = match Config::from_env() {
        Ok(config) => {
            log::info!("configuration loaded: environment={}", config.environment);
            config
        }
        Err(e) => {
            log::error!("configuration failed to load: {e}");
            return Err(io_error(e.to_string()));
        }
    };

    let store = match FileStore::new(&config.data_dir) {
        Ok(store) => {
            log::info!("store initialized at {}", config.data_dir);
            Arc::new(store)
        }
        Err(e) => {
            log::error!("store failed to initialize: {e}");
            return Err(io_error(e.to_string()));
        }
    };

    let port = config.port;
    let app_state = AppState::build(config, store);

    if let Err(e) = app_state.start().await {
        log::error!("crash recovery / scheduler startup failed: {e}");
        return Err(io_error(e.to_string()));
    }
    log::info!("crash recovery complete, scheduler running");

    let error_handler = Arc::new(EnhancedErrorHandler::new());
    let security_config = EnhancedSecurityConfig {
        metrics: airchainpay_relay::middleware::metrics::MetricsCollector::new(Arc::new(
            MonitoringManager::new(),
        )),
        ..EnhancedSecurityConfig::default()
    };

    let server_state = app_state.clone();
    let server = HttpServer::new(move || {
        let monitoring = Arc::clone(&server_state.monitoring);
        App::new()
            .wrap(actix_web::middleware::Logger::default())
            .wrap(actix_web::middleware::Compress::default())
            .wrap(actix_cors::Cors::permissive())
            .app_data(web::Data::new(Arc::clone(&server_state)))
            .route("/health", web::get().to(api::liveness))
            .service(
                web::scope("/api")
                    .wrap(ComprehensiveSecurityMiddleware::new(security_config.clone()))
                    .wrap(MetricsMiddleware::new(monitoring))
                    .wrap(ErrorHandlingMiddleware::new(Arc::clone(&error_handler)))
                    .wrap(RateLimitingMiddleware::new(100, 10, Duration::from_secs(60)))
                    .configure(api::configure),
            )
    })
    .bind(("0.0.0.0", port))?
    .run();

    let server_handle = server.handle();
    log::info!("listening on 0.0.0.0:{port}");

    let shutdown_state = app_state.clone();
    tokio::select! {
        result = server => {
            if let Err(e) = result {
                log::error!("HTTP server exited with error: {e}");
                shutdown_state.shutdown().await;
                return Err(e);
            }
        }
        _ = tokio::signal::ctrl_c() => {
            log::info!("shutdown signal received, draining in-flight work");
            let graceful = tokio::time::timeout(Duration::from_secs(10), async {
                server_handle.stop(true).await;
                shutdown_state.shutdown().await;
            });
            if graceful.await.is_err() {
                log::error!("graceful shutdown exceeded 10s, forcing exit");
                std::process::exit(255);
            }
        }
    }

    log::info!("shutdown complete");
    Ok(())
}

fn io_error(message: String) -> std::io::Error {
    std::io::Error::other(message)
}

#[allow(dead_code)]
fn assert_relay_error_is_send_sync() {
    fn check<T: Send + Sync>() {}
    check::<RelayError>();
}
