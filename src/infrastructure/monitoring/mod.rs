pub mod manager;

pub use manager::{Alert, AlertSeverity, MonitoringManager, QueueGauge, SharedMonitoring};
