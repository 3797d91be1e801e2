pub mod adaptive_queue;

pub use adaptive_queue::{AdaptiveQueue, QueueConfig, QueueEvent, QueueMetrics, RetryDecision, RunState};
