//! Telemetry for the pool.
//!
//! Counters and a queue-wait histogram, readable via `ThreadPool::metrics`.

#[cfg(feature = "telemetry")]
pub mod metrics;

#[cfg(feature = "telemetry")]
pub use metrics::{Metrics, MetricsSnapshot};

// Stub implementations when telemetry is disabled
#[cfg(not(feature = "telemetry"))]
pub mod metrics {
    use std::time::Duration;

    #[derive(Debug, Clone, Default)]
    pub struct Metrics;

    impl Metrics {
        pub fn new() -> Self { Self }
        pub fn record_task_submitted(&self) {}
        pub fn record_task_execution(&self, _: u64) {}
        pub fn record_queue_wait(&self, _: u64) {}
        pub fn record_task_panic(&self) {}
        pub fn record_task_rejected(&self) {}
        pub fn record_tasks_abandoned(&self, _: u64) {}
        pub fn snapshot(&self) -> MetricsSnapshot { MetricsSnapshot::default() }
    }

    #[derive(Debug, Clone, Default)]
    pub struct MetricsSnapshot {
        pub uptime: Duration,
        pub tasks_submitted: u64,
        pub tasks_executed: u64,
        pub tasks_panicked: u64,
        pub tasks_rejected: u64,
        pub tasks_abandoned: u64,
        pub busy_time_ns: u64,
        pub avg_queue_wait_ns: u64,
        pub p99_queue_wait_ns: u64,
        pub max_queue_wait_ns: u64,
    }
}

#[cfg(not(feature = "telemetry"))]
pub use metrics::{Metrics, MetricsSnapshot};
