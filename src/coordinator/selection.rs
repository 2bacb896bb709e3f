// Selection coordinator - runs file dialogs off the UI thread
//
// TaskCoordinator owns the one state slot for file selection. The presentation
// loop calls start() on a click and poll() once per frame; the dialog itself runs
// on tokio's blocking pool and reports back only through the slot.

use crate::metrics::Metrics;
use crate::models::{SelectionOutcome, Slot};
use crate::services::dialog::{DialogError, FilePicker, PickRequest, normalize_selection};
use crate::state::{
    CancelHandle, CancelToken, PublishGuard, TaskCell, TaskId, TaskState, cancel_pair,
};
use std::sync::{Arc, Mutex, PoisonError};

/// Coordinates at most one in-flight file selection
///
/// # Contract
///
/// - [`start`](Self::start) never blocks and never hands out the worker; it only
///   reports whether a task was started
/// - [`poll`](Self::poll) never blocks; it yields each result exactly once
/// - [`is_in_flight`](Self::is_in_flight) is a hint for UI affordances; `start`
///   is what enforces the single-task rule
/// - [`cancel`](Self::cancel) abandons the current task; the dialog may stay
///   open if the platform cannot close it, but its result is discarded
///
/// # Example
/// ```ignore
/// let coordinator = TaskCoordinator::new(picker, runtime.handle().clone());
///
/// // On click
/// if !coordinator.start(Slot::Left) {
///     tracing::debug!("Dialog already open");
/// }
///
/// // Every frame
/// if let Some(outcome) = coordinator.poll() {
///     selections.apply(outcome);
/// }
/// ```
pub struct TaskCoordinator {
    cell: TaskCell<Slot, SelectionOutcome>,

    picker: Arc<dyn FilePicker>,

    /// Runtime whose blocking pool hosts the dialog workers
    runtime: tokio::runtime::Handle,

    /// Extensions offered in the dialog filter
    extensions: Vec<String>,

    /// Cancellation handle of the most recently started task
    cancel: Mutex<Option<(TaskId, CancelHandle)>>,

    metrics: Arc<Metrics>,
}

impl TaskCoordinator {
    pub fn new(picker: Arc<dyn FilePicker>, runtime: tokio::runtime::Handle) -> Self {
        Self {
            cell: TaskCell::new(),
            picker,
            runtime,
            extensions: Vec::new(),
            cancel: Mutex::new(None),
            metrics: Arc::new(Metrics::new()),
        }
    }

    /// Offer only these extensions in the dialog
    pub fn with_extensions(mut self, extensions: Vec<String>) -> Self {
        self.extensions = extensions;
        self
    }

    pub fn with_metrics(mut self, metrics: Arc<Metrics>) -> Self {
        self.metrics = metrics;
        self
    }

    /// Begin a background selection for `slot`.
    ///
    /// Returns false, with no side effect, unless the coordinator is idle. A
    /// result that has not been polled yet also counts as busy.
    pub fn start(&self, slot: Slot) -> bool {
        let Some(id) = self.cell.try_begin(slot) else {
            tracing::debug!("Selection for {} slot rejected: a task is already active", slot);
            self.metrics.record_selection_rejected();
            return false;
        };

        let (handle, token) = cancel_pair();
        *self.cancel.lock().unwrap_or_else(PoisonError::into_inner) = Some((id, handle));

        let guard = self.cell.publish_guard(id, SelectionOutcome::empty(slot));
        let picker = Arc::clone(&self.picker);
        let request = PickRequest::for_slot(slot, &self.extensions);

        // Detached: completion is only ever observed through the cell. If the
        // runtime drops the closure unrun, the guard still publishes.
        let _ = self
            .runtime
            .spawn_blocking(move || run_selection(picker.as_ref(), slot, request, token, guard));

        self.metrics.record_selection_started();
        tracing::info!("Selection task {} started for {} slot", id, slot);
        true
    }

    /// Take the finished selection, if there is one.
    ///
    /// Returns `Some` once per completed task and resets the coordinator to idle.
    pub fn poll(&self) -> Option<SelectionOutcome> {
        let outcome = self.cell.take()?;

        self.metrics.record_selection_completed(outcome.path.is_some());
        match &outcome.path {
            Some(path) => tracing::info!("Selected {} video: {}", outcome.slot, path),
            None => tracing::info!("No {} video selected", outcome.slot),
        }

        Some(outcome)
    }

    /// Snapshot: is a dialog currently open? May be stale by the time it is used.
    pub fn is_in_flight(&self) -> bool {
        self.cell.is_in_flight()
    }

    /// Slot of the open dialog, if any
    pub fn in_flight_slot(&self) -> Option<Slot> {
        self.cell.in_flight_key()
    }

    /// Abandon the in-flight selection.
    ///
    /// Signals the worker's cancellation token and returns the coordinator to
    /// idle immediately, so a new selection can start. Returns false if nothing
    /// was in flight.
    pub fn cancel(&self) -> bool {
        let Some(id) = self.cell.abandon() else {
            return false;
        };

        let active = self
            .cancel
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some((active_id, handle)) = active {
            if active_id == id {
                handle.cancel();
            }
        }

        self.metrics.record_selection_abandoned();
        tracing::info!("Selection task {} abandoned", id);
        true
    }

    /// Current state of the slot, for diagnostics
    pub fn state(&self) -> TaskState<Slot, SelectionOutcome> {
        self.cell.snapshot()
    }

    pub fn metrics(&self) -> &Arc<Metrics> {
        &self.metrics
    }
}

/// Worker body: ask the picker, normalize, publish once.
///
/// Every failure degrades to "no path chosen". The guard publishes that
/// fallback even if the picker panics.
fn run_selection(
    picker: &dyn FilePicker,
    slot: Slot,
    request: PickRequest,
    cancel: CancelToken,
    guard: PublishGuard<Slot, SelectionOutcome>,
) {
    let id = guard.id();

    let path = match picker.pick(&request, &cancel) {
        Ok(Some(raw)) => normalize_selection(&raw),
        Ok(None) => None,
        Err(DialogError::Cancelled) => {
            tracing::info!("Selection task {} cancelled", id);
            None
        }
        Err(e) => {
            tracing::warn!("File dialog failed for task {}: {}", id, e);
            None
        }
    };

    let published = guard.publish(SelectionOutcome { slot, path });
    if !published {
        tracing::debug!("Selection task {} finished after being abandoned", id);
    }
}
