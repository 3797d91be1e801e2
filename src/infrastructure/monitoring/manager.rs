use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::queue::adaptive_queue::QueueMetrics;
use crate::utils::database::DatabaseHealth;

/// One queue's rolling metrics plus its static identity, as surfaced at
/// `GET /monitoring/metrics`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueGauge {
    pub name: String,
    pub metrics: QueueMetrics,
    pub paused: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum AlertSeverity {
    Info,
    Warning,
    Critical,
}

impl std::fmt::Display for AlertSeverity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AlertSeverity::Info => write!(f, "info"),
            AlertSeverity::Warning => write!(f, "warning"),
            AlertSeverity::Critical => write!(f, "critical"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Alert {
    pub id: String,
    pub name: String,
    pub severity: AlertSeverity,
    pub message: String,
    pub timestamp: DateTime<Utc>,
    pub resolved: bool,
}

/// Generalized from the teacher's `MonitoringManager` (gas-price /
/// device-health / Prometheus counters for the payment-relay domain) down
/// to what the finalization pipeline's own queues and store actually emit:
/// per-queue gauges, a small rolling alert log, and request counters for
/// `GET /monitoring/metrics` and `GET /monitoring/health`.
#[derive(Debug)]
pub struct MonitoringManager {
    started_at: Instant,
    requests_total: std::sync::atomic::AtomicU64,
    requests_failed: std::sync::atomic::AtomicU64,
    alerts: RwLock<Vec<Alert>>,
}

impl Default for MonitoringManager {
    fn default() -> Self {
        Self::new()
    }
}

impl MonitoringManager {
    pub fn new() -> Self {
        Self {
            started_at: Instant::now(),
            requests_total: std::sync::atomic::AtomicU64::new(0),
            requests_failed: std::sync::atomic::AtomicU64::new(0),
            alerts: RwLock::new(Vec::new()),
        }
    }

    pub fn record_request(&self, failed: bool) {
        self.requests_total.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
        if failed {
            self.requests_failed.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
        }
    }

    pub fn uptime_seconds(&self) -> f64 {
        self.started_at.elapsed().as_secs_f64()
    }

    pub async fn raise_alert(&self, name: &str, severity: AlertSeverity, message: impl Into<String>) {
        let alert = Alert {
            id: Uuid::new_v4().to_string(),
            name: name.to_string(),
            severity,
            message: message.into(),
            timestamp: Utc::now(),
            resolved: false,
        };
        let mut alerts = self.alerts.write().await;
        alerts.push(alert);
        if alerts.len() > 500 {
            let excess = alerts.len() - 500;
            alerts.drain(0..excess);
        }
    }

    pub async fn recent_alerts(&self, limit: usize) -> Vec<Alert> {
        let alerts = self.alerts.read().await;
        alerts.iter().rev().take(limit).cloned().collect()
    }

    /// Builds the `{finalizer:{metrics,status}, database, timestamp}` shape
    /// `GET /monitoring/metrics` returns (spec.md §6).
    pub fn metrics_snapshot(
        &self,
        finalizer: QueueGauge,
        submission: QueueGauge,
        database: DatabaseHealth,
    ) -> serde_json::Value {
        serde_json::json!({
            "finalizer": { "metrics": finalizer.metrics, "status": if finalizer.paused { "paused" } else { "running" } },
            "submission": { "metrics": submission.metrics, "status": if submission.paused { "paused" } else { "running" } },
            "database": database,
            "requests": {
                "total": self.requests_total.load(std::sync::atomic::Ordering::Relaxed),
                "failed": self.requests_failed.load(std::sync::atomic::Ordering::Relaxed),
            },
            "uptimeSeconds": self.uptime_seconds(),
            "timestamp": Utc::now().to_rfc3339(),
        })
    }
}

pub type SharedMonitoring = Arc<MonitoringManager>;

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn alerts_are_capped_and_return_newest_first() {
        let mgr = MonitoringManager::new();
        for i in 0..5 {
            mgr.raise_alert("test", AlertSeverity::Info, format!("alert {i}")).await;
        }
        let recent = mgr.recent_alerts(2).await;
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].message, "alert 4");
    }
}
