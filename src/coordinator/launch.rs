// Launch coordinator - runs video-compare without blocking the caller
//
// Same shape as the selection coordinator: launch() starts a worker on the
// blocking pool, poll() collects the finished report once.

use crate::metrics::Metrics;
use crate::models::{CompareSettings, ProcessOutcome};
use crate::services::comparison::{
    ComparisonError, ComparisonRequest, WindowSize, build_arguments, candidates_from_settings,
    default_base_dirs, window_from_settings,
};
use crate::services::process::ProcessRunner;
use crate::state::{TaskCell, TaskState};
use camino::{Utf8Path, Utf8PathBuf};
use std::sync::Arc;

/// A finished comparison run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchReport {
    pub request: ComparisonRequest,
    pub outcome: ProcessOutcome,
}

/// Runs at most one comparison at a time
pub struct LaunchCoordinator {
    cell: TaskCell<ComparisonRequest, LaunchReport>,
    runner: ProcessRunner,

    /// Executable locations, tried in order
    candidates: Vec<Utf8PathBuf>,

    /// `None` asks the tool to fit the display
    window: Option<WindowSize>,

    log_path: Utf8PathBuf,
    runtime: tokio::runtime::Handle,
    metrics: Arc<Metrics>,
}

impl LaunchCoordinator {
    pub fn new(
        candidates: Vec<Utf8PathBuf>,
        log_path: impl Into<Utf8PathBuf>,
        runtime: tokio::runtime::Handle,
    ) -> Self {
        Self {
            cell: TaskCell::new(),
            runner: ProcessRunner::new(),
            candidates,
            window: None,
            log_path: log_path.into(),
            runtime,
            metrics: Arc::new(Metrics::new()),
        }
    }

    /// Build from the `compare` section of the configuration.
    ///
    /// Fails only on a malformed window size.
    pub fn from_settings(
        settings: &CompareSettings,
        runtime: tokio::runtime::Handle,
    ) -> Result<Self, ComparisonError> {
        let window = window_from_settings(settings)?;
        let candidates = candidates_from_settings(settings, &default_base_dirs());

        tracing::debug!(
            "Launch coordinator: {} candidates, window {:?}, log {}",
            candidates.len(),
            window,
            settings.log_file
        );

        Ok(Self::new(candidates, settings.log_file.as_str(), runtime).with_window(window))
    }

    pub fn with_window(mut self, window: Option<WindowSize>) -> Self {
        self.window = window;
        self
    }

    pub fn with_metrics(mut self, metrics: Arc<Metrics>) -> Self {
        self.metrics = metrics;
        self
    }

    /// Start `video-compare` for `request` in the background.
    ///
    /// Returns false if a run is still active or its report has not been polled.
    pub fn launch(&self, request: ComparisonRequest) -> bool {
        let Some(id) = self.cell.try_begin(request.clone()) else {
            tracing::debug!("Launch rejected: a comparison is already running");
            self.metrics.record_launch_rejected();
            return false;
        };

        let args = build_arguments(&anchored(&request), self.window);
        let fallback = LaunchReport {
            request: request.clone(),
            outcome: ProcessOutcome::launch_failed(
                "launch worker stopped before finishing",
                self.log_path.clone(),
            ),
        };
        let guard = self.cell.publish_guard(id, fallback);

        let runner = self.runner;
        let candidates = self.candidates.clone();
        let log_path = self.log_path.clone();

        let _ = self.runtime.spawn_blocking(move || {
            let outcome = runner.run(&candidates, &args, &log_path);
            guard.publish(LaunchReport { request, outcome });
        });

        self.metrics.record_launch_started();
        tracing::info!("Launch task {} started", id);
        true
    }

    /// Take the finished run, if there is one
    pub fn poll(&self) -> Option<LaunchReport> {
        let report = self.cell.take()?;

        self.metrics
            .record_launch_finished(report.outcome.is_success(), report.outcome.duration);
        if report.outcome.is_success() {
            tracing::info!("{}", report.outcome.summary());
        } else {
            tracing::warn!("{}", report.outcome.summary());
        }

        Some(report)
    }

    /// Snapshot: is the tool still running?
    pub fn is_running(&self) -> bool {
        self.cell.is_in_flight()
    }

    pub fn log_path(&self) -> &Utf8Path {
        &self.log_path
    }

    pub fn candidates(&self) -> &[Utf8PathBuf] {
        &self.candidates
    }

    pub fn state(&self) -> TaskState<ComparisonRequest, LaunchReport> {
        self.cell.snapshot()
    }

    pub fn metrics(&self) -> &Arc<Metrics> {
        &self.metrics
    }
}

/// Anchor relative file paths to the caller's working directory
fn anchored(request: &ComparisonRequest) -> ComparisonRequest {
    match std::env::current_dir().map(Utf8PathBuf::try_from) {
        Ok(Ok(cwd)) => request.resolve_relative_to(&cwd),
        Ok(Err(e)) => {
            tracing::warn!("Working directory is not UTF-8 ({}); passing paths as given", e);
            request.clone()
        }
        Err(e) => {
            tracing::warn!("Cannot read working directory ({}); passing paths as given", e);
            request.clone()
        }
    }
}
