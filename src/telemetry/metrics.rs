//! Metrics collection for pool monitoring.

use hdrhistogram::Histogram;
use parking_lot::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Pool metrics collector
#[derive(Debug)]
pub struct Metrics {
    // Task counters
    tasks_submitted: AtomicU64,
    tasks_executed: AtomicU64,
    tasks_panicked: AtomicU64,
    tasks_rejected: AtomicU64,
    tasks_abandoned: AtomicU64,

    busy_time_ns: AtomicU64,

    // Time spent queued before a worker picked the task up
    queue_wait_histogram: Option<RwLock<Histogram<u64>>>,

    start_time: Instant,
}

impl Metrics {
    pub fn new() -> Self {
        // 3 significant figures, max value of 1 hour in nanoseconds
        let histogram = Histogram::new_with_max(3_600_000_000_000, 3).ok();

        Self {
            tasks_submitted: AtomicU64::new(0),
            tasks_executed: AtomicU64::new(0),
            tasks_panicked: AtomicU64::new(0),
            tasks_rejected: AtomicU64::new(0),
            tasks_abandoned: AtomicU64::new(0),
            busy_time_ns: AtomicU64::new(0),
            queue_wait_histogram: histogram.map(RwLock::new),
            start_time: Instant::now(),
        }
    }

    pub fn record_task_submitted(&self) {
        self.tasks_submitted.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a finished task with its run time
    pub fn record_task_execution(&self, duration_ns: u64) {
        self.tasks_executed.fetch_add(1, Ordering::Relaxed);
        self.busy_time_ns.fetch_add(duration_ns, Ordering::Relaxed);
    }

    pub fn record_queue_wait(&self, wait_ns: u64) {
        if let Some(hist) = &self.queue_wait_histogram {
            if let Some(mut hist) = hist.try_write() {
                let _ = hist.record(wait_ns);
            }
        }
    }

    pub fn record_task_panic(&self) {
        self.tasks_panicked.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_task_rejected(&self) {
        self.tasks_rejected.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_tasks_abandoned(&self, count: u64) {
        self.tasks_abandoned.fetch_add(count, Ordering::Relaxed);
    }

    /// Get a snapshot of current metrics
    pub fn snapshot(&self) -> MetricsSnapshot {
        let (avg_wait_ns, p99_wait_ns, max_wait_ns) = match &self.queue_wait_histogram {
            Some(hist) => {
                let hist = hist.read();
                if hist.len() > 0 {
                    (
                        hist.mean() as u64,
                        hist.value_at_quantile(0.99),
                        hist.max(),
                    )
                } else {
                    (0, 0, 0)
                }
            }
            None => (0, 0, 0),
        };

        MetricsSnapshot {
            uptime: self.start_time.elapsed(),
            tasks_submitted: self.tasks_submitted.load(Ordering::Relaxed),
            tasks_executed: self.tasks_executed.load(Ordering::Relaxed),
            tasks_panicked: self.tasks_panicked.load(Ordering::Relaxed),
            tasks_rejected: self.tasks_rejected.load(Ordering::Relaxed),
            tasks_abandoned: self.tasks_abandoned.load(Ordering::Relaxed),
            busy_time_ns: self.busy_time_ns.load(Ordering::Relaxed),
            avg_queue_wait_ns: avg_wait_ns,
            p99_queue_wait_ns: p99_wait_ns,
            max_queue_wait_ns: max_wait_ns,
        }
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Snapshot of metrics at a point in time
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

impl MetricsSnapshot {
    /// Calculate tasks per second
    pub fn tasks_per_second(&self) -> f64 {
        let seconds = self.uptime.as_secs_f64();
        if seconds == 0.0 {
            return 0.0;
        }
        self.tasks_executed as f64 / seconds
    }

    /// Busy time summed across workers, as a fraction of `workers * uptime`.
    pub fn utilization(&self, workers: usize) -> f64 {
        let total = self.uptime.as_nanos() as f64 * workers as f64;
        if total == 0.0 {
            return 0.0;
        }
        (self.busy_time_ns as f64 / total).min(1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_basic() {
        let metrics = Metrics::new();

        metrics.record_task_submitted();
        metrics.record_task_submitted();
        metrics.record_task_execution(1000);
        metrics.record_task_execution(2000);
        metrics.record_task_panic();
        metrics.record_queue_wait(500);

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.tasks_submitted, 2);
        assert_eq!(snapshot.tasks_executed, 2);
        assert_eq!(snapshot.tasks_panicked, 1);
        assert_eq!(snapshot.busy_time_ns, 3000);
        assert!(snapshot.avg_queue_wait_ns > 0);
    }

    #[test]
    fn test_rejected_and_abandoned() {
        let metrics = Metrics::new();

        metrics.record_task_rejected();
        metrics.record_tasks_abandoned(3);

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.tasks_rejected, 1);
        assert_eq!(snapshot.tasks_abandoned, 3);
        assert_eq!(snapshot.avg_queue_wait_ns, 0);
    }

    #[test]
    fn test_utilization() {
        let snapshot = MetricsSnapshot {
            uptime: Duration::from_secs(1),
            busy_time_ns: 1_000_000_000,
            ..Default::default()
        };

        assert_eq!(snapshot.utilization(2), 0.5);
        assert_eq!(snapshot.utilization(0), 0.0);
    }
}
