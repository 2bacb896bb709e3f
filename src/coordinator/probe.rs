// Probe coordinator - ffprobe lookups polled from the presentation loop
//
// Same start/poll contract as the other coordinators. The lookup is async, so it
// runs as a plain tokio task instead of on the blocking pool.

use crate::metrics::Metrics;
use crate::models::Slot;
use crate::services::probe::{ProbeError, VideoInfo, VideoProber};
use crate::state::{TaskCell, TaskState};
use std::sync::Arc;

/// A finished metadata lookup
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeReport {
    pub slot: Slot,
    pub input: String,
    pub result: Result<VideoInfo, ProbeError>,
}

/// Runs at most one ffprobe lookup at a time
pub struct ProbeCoordinator {
    cell: TaskCell<Slot, ProbeReport>,
    prober: Arc<VideoProber>,
    runtime: tokio::runtime::Handle,
    metrics: Arc<Metrics>,
}

impl ProbeCoordinator {
    pub fn new(prober: VideoProber, runtime: tokio::runtime::Handle) -> Self {
        Self {
            cell: TaskCell::new(),
            prober: Arc::new(prober),
            runtime,
            metrics: Arc::new(Metrics::new()),
        }
    }

    pub fn with_metrics(mut self, metrics: Arc<Metrics>) -> Self {
        self.metrics = metrics;
        self
    }

    /// Look up `input` for `slot` in the background.
    ///
    /// Returns false if a lookup is still running or its report has not been polled.
    pub fn start(&self, slot: Slot, input: impl Into<String>) -> bool {
        let Some(id) = self.cell.try_begin(slot) else {
            tracing::debug!("Probe for {} rejected: another lookup is active", slot);
            return false;
        };

        let input = input.into();
        let fallback = ProbeReport {
            slot,
            input: input.clone(),
            result: Err(ProbeError::Interrupted),
        };
        let guard = self.cell.publish_guard(id, fallback);
        let prober = Arc::clone(&self.prober);

        // A task dropped at runtime shutdown drops the guard, which publishes
        // the fallback
        let _ = self.runtime.spawn(async move {
            let result = prober.probe(&input).await;
            guard.publish(ProbeReport { slot, input, result });
        });

        self.metrics.record_probe_started();
        tracing::debug!("Probe task {} started for {}", id, slot);
        true
    }

    /// Take the finished lookup, if there is one
    pub fn poll(&self) -> Option<ProbeReport> {
        let report = self.cell.take()?;
        self.metrics.record_probe_finished(report.result.is_ok());
        Some(report)
    }

    pub fn is_in_flight(&self) -> bool {
        self.cell.is_in_flight()
    }

    pub fn state(&self) -> TaskState<Slot, ProbeReport> {
        self.cell.snapshot()
    }

    pub fn metrics(&self) -> &Arc<Metrics> {
        &self.metrics
    }
}
