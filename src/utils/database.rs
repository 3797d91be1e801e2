use serde::{Deserialize, Serialize};

/// Snapshot returned by `Store::check_health`, surfaced at
/// `/monitoring/health`. Trimmed from the teacher's broader device/backup
/// health record down to the fields the content-addressed store can
/// actually speak to.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseHealth {
    pub is_healthy: bool,
    pub latency_ms: u64,
    pub error: Option<String>,
    pub total_transactions: u32,
}
