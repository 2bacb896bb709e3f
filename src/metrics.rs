// Task metrics module
//
// Lightweight counters for the selection and launch coordinators

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Counters for background task activity
///
/// Uses atomic operations so the worker threads and the polling consumer can
/// record without locks. The summary is logged on shutdown.
#[derive(Debug)]
pub struct Metrics {
    /// Selection tasks started
    pub selections_started: AtomicU64,

    /// `start` calls rejected because a task was already in flight
    pub selections_rejected: AtomicU64,

    /// Selection results handed to the consumer
    pub selections_completed: AtomicU64,

    /// Completed selections that carried no path
    pub selections_empty: AtomicU64,

    /// Selection tasks abandoned through cancel
    pub selections_abandoned: AtomicU64,

    /// Comparison runs started
    pub launches_started: AtomicU64,

    /// `launch` calls rejected because a run was already active
    pub launches_rejected: AtomicU64,

    /// Runs that exited with code 0
    pub launches_succeeded: AtomicU64,

    /// Runs that failed to launch, exited non-zero or were signalled
    pub launches_failed: AtomicU64,

    /// Total time spent in the comparison tool, in milliseconds
    pub total_launch_time_ms: AtomicU64,

    /// Metadata lookups started
    pub probes_started: AtomicU64,

    /// Lookups that returned stream information
    pub probes_succeeded: AtomicU64,

    /// Lookups that failed, timed out or were abandoned
    pub probes_failed: AtomicU64,

    start_time: Instant,
}

impl Metrics {
    pub fn new() -> Self {
        Self {
            selections_started: AtomicU64::new(0),
            selections_rejected: AtomicU64::new(0),
            selections_completed: AtomicU64::new(0),
            selections_empty: AtomicU64::new(0),
            selections_abandoned: AtomicU64::new(0),
            launches_started: AtomicU64::new(0),
            launches_rejected: AtomicU64::new(0),
            launches_succeeded: AtomicU64::new(0),
            launches_failed: AtomicU64::new(0),
            total_launch_time_ms: AtomicU64::new(0),
            probes_started: AtomicU64::new(0),
            probes_succeeded: AtomicU64::new(0),
            probes_failed: AtomicU64::new(0),
            start_time: Instant::now(),
        }
    }

    pub fn record_selection_started(&self) {
        self.selections_started.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_selection_rejected(&self) {
        self.selections_rejected.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a selection result reaching the consumer
    pub fn record_selection_completed(&self, had_path: bool) {
        self.selections_completed.fetch_add(1, Ordering::Relaxed);
        if !had_path {
            self.selections_empty.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn record_selection_abandoned(&self) {
        self.selections_abandoned.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_launch_started(&self) {
        self.launches_started.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_launch_rejected(&self) {
        self.launches_rejected.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a finished run and the time it took
    pub fn record_launch_finished(&self, success: bool, duration: Duration) {
        if success {
            self.launches_succeeded.fetch_add(1, Ordering::Relaxed);
        } else {
            self.launches_failed.fetch_add(1, Ordering::Relaxed);
        }
        self.total_launch_time_ms
            .fetch_add(duration.as_millis() as u64, Ordering::Relaxed);
    }

    pub fn record_probe_started(&self) {
        self.probes_started.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_probe_finished(&self, success: bool) {
        if success {
            self.probes_succeeded.fetch_add(1, Ordering::Relaxed);
        } else {
            self.probes_failed.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn uptime(&self) -> Duration {
        self.start_time.elapsed()
    }

    /// Log metrics summary
    pub fn log_summary(&self) {
        tracing::info!("=== Task Metrics Summary ===");
        tracing::info!("Uptime: {:.2}s", self.uptime().as_secs_f64());
        tracing::info!(
            "Selections: {} started, {} rejected, {} completed ({} empty), {} abandoned",
            self.selections_started.load(Ordering::Relaxed),
            self.selections_rejected.load(Ordering::Relaxed),
            self.selections_completed.load(Ordering::Relaxed),
            self.selections_empty.load(Ordering::Relaxed),
            self.selections_abandoned.load(Ordering::Relaxed)
        );
        tracing::info!(
            "Launches: {} started, {} rejected, {} succeeded, {} failed, {:.2}s in tool",
            self.launches_started.load(Ordering::Relaxed),
            self.launches_rejected.load(Ordering::Relaxed),
            self.launches_succeeded.load(Ordering::Relaxed),
            self.launches_failed.load(Ordering::Relaxed),
            self.total_launch_time_ms.load(Ordering::Relaxed) as f64 / 1000.0
        );
        tracing::info!(
            "Probes: {} started, {} succeeded, {} failed",
            self.probes_started.load(Ordering::Relaxed),
            self.probes_succeeded.load(Ordering::Relaxed),
            self.probes_failed.load(Ordering::Relaxed)
        );
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_metrics_creation() {
        let metrics = Metrics::new();
        assert_eq!(metrics.selections_started.load(Ordering::Relaxed), 0);
        assert_eq!(metrics.launches_started.load(Ordering::Relaxed), 0);
    }

    #[test]
    fn test_record_selection_operations() {
        let metrics = Metrics::new();

        metrics.record_selection_started();
        metrics.record_selection_rejected();
        metrics.record_selection_rejected();
        metrics.record_selection_completed(true);
        metrics.record_selection_completed(false);
        metrics.record_selection_abandoned();

        assert_eq!(metrics.selections_started.load(Ordering::Relaxed), 1);
        assert_eq!(metrics.selections_rejected.load(Ordering::Relaxed), 2);
        assert_eq!(metrics.selections_completed.load(Ordering::Relaxed), 2);
        assert_eq!(metrics.selections_empty.load(Ordering::Relaxed), 1);
        assert_eq!(metrics.selections_abandoned.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn test_record_launch_time() {
        let metrics = Metrics::new();

        metrics.record_launch_finished(true, Duration::from_millis(100));
        metrics.record_launch_finished(false, Duration::from_millis(200));

        assert_eq!(metrics.launches_succeeded.load(Ordering::Relaxed), 1);
        assert_eq!(metrics.launches_failed.load(Ordering::Relaxed), 1);
        assert_eq!(metrics.total_launch_time_ms.load(Ordering::Relaxed), 300);
    }

    #[test]
    fn test_record_probe_operations() {
        let metrics = Metrics::new();

        metrics.record_probe_started();
        metrics.record_probe_started();
        metrics.record_probe_finished(true);
        metrics.record_probe_finished(false);

        assert_eq!(metrics.probes_started.load(Ordering::Relaxed), 2);
        assert_eq!(metrics.probes_succeeded.load(Ordering::Relaxed), 1);
        assert_eq!(metrics.probes_failed.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn test_uptime() {
        let metrics = Metrics::new();
        thread::sleep(Duration::from_millis(10));
        assert!(metrics.uptime().as_millis() >= 10);
    }
}
