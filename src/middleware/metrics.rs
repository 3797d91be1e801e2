use actix_web::{
    dev::{Service, Transform},
    Error,
};
use std::task::{Context, Poll};
use std::sync::Arc;
use std::time::Instant;
use futures_util::future::{LocalBoxFuture, Ready};
use actix_web::body::BoxBody;
use futures_util::future::ready;
use crate::infrastructure::monitoring::manager::MonitoringManager;
use std::marker::PhantomData;

#[derive(Clone)]
pub struct MetricsMiddleware {
    monitoring_manager: Arc<MonitoringManager>,
}

impl MetricsMiddleware {
    pub fn new(monitoring_manager: Arc<MonitoringManager>) -> Self {
        Self { monitoring_manager }
    }
}

impl<S> Transform<S, actix_web::dev::ServiceRequest> for MetricsMiddleware
where
    S: Service<actix_web::dev::ServiceRequest, Response = actix_web::dev::ServiceResponse<BoxBody>, Error = Error> + 'static,
    S::Future: 'static,
{
    type Response = actix_web::dev::ServiceResponse<BoxBody>;
    type Error = Error;
    type Transform = MetricsService<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(MetricsService {
            service: Arc::new(service),
            monitoring_manager: Arc::clone(&self.monitoring_manager),
            _phantom: PhantomData,
        }))
    }
}

#[derive(Clone)]
pub struct MetricsService<S> {
    service: Arc<S>,
    monitoring_manager: Arc<MonitoringManager>,
    _phantom: PhantomData<BoxBody>,
}

impl<S> Service<actix_web::dev::ServiceRequest> for MetricsService<S>
where
    S: Service<actix_web::dev::ServiceRequest, Response = actix_web::dev::ServiceResponse<BoxBody>, Error = Error> + 'static,
    S::Future: 'static,
{
    type Response = actix_web::dev::ServiceResponse<BoxBody>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.service.poll_ready(cx)
    }

    fn call(&self, req: actix_web::dev::ServiceRequest) -> Self::Future {
        let service = Arc::clone(&self.service);
        let monitoring_manager: Arc<MonitoringManager> = Arc::clone(&self.monitoring_manager);
        let start_time = Instant::now();

        Box::pin(async move {
            let path = req.path().to_string();
            let method = req.method().to_string();
            let client_ip = req.connection_info().peer_addr().unwrap_or("unknown").to_string();

            let fut = service.call(req);
            let res = fut.await;
            let response_time_ms = start_time.elapsed().as_millis() as f64;

            match res {
                Ok(res) => {
                    let status = res.status();
                    monitoring_manager.record_request(!status.is_success());
                    log::info!(
                        "Request processed: {method} {path} - Status: {status} - Time: {response_time_ms}ms - IP: {client_ip}"
                    );
                    Ok(res)
                }
                Err(e) => {
                    monitoring_manager.record_request(true);
                    log::error!(
                        "Request failed: {method} {path} - Error: {e} - Time: {response_time_ms}ms - IP: {client_ip}"
                    );
                    Err(e)
                }
            }
        })
    }
}

// Metrics collection utilities
#[derive(Debug, Clone)]
#[allow(dead_code)]
pub struct MetricsCollector {
    monitoring_manager: Arc<MonitoringManager>,
}

impl MetricsCollector {
    pub fn new(monitoring_manager: Arc<MonitoringManager>) -> Self {
        Self { monitoring_manager }
    }
}