// State management module
//
// This module provides TaskCell, the single shared slot through which a background
// worker hands its result to a polling consumer. It replaces process-wide globals
// with an owned object so the at-most-one-in-flight rule can be tested in isolation.

pub mod cancel;

pub use cancel::{CancelHandle, CancelToken, cancel_pair};

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Identifier of one started task, unique per [`TaskCell`]
pub type TaskId = u64;

/// The coordination point between one worker and the polling consumer.
///
/// Transitions:
/// - `Idle -> InFlight` via [`TaskCell::try_begin`]
/// - `InFlight -> ResultReady` via [`TaskCell::publish`] (worker, once)
/// - `ResultReady -> Idle` via [`TaskCell::take`] (consumer)
/// - `InFlight -> Idle` via [`TaskCell::abandon`] (consumer gives up)
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskState<K, T> {
    Idle,
    InFlight { key: K, id: TaskId },
    ResultReady(T),
}

impl<K, T> TaskState<K, T> {
    pub fn is_idle(&self) -> bool {
        matches!(self, TaskState::Idle)
    }

    pub fn is_in_flight(&self) -> bool {
        matches!(self, TaskState::InFlight { .. })
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, TaskState::ResultReady(_))
    }
}

/// Thread-safe single-slot task state
///
/// Every operation takes the lock for one read or one assignment and never
/// blocks otherwise, so it is safe to call from a UI frame. A poisoned lock is
/// recovered rather than propagated: the state is a plain value and is always
/// consistent between statements.
///
/// Cloning yields another handle to the same slot, which is how the worker
/// thread gets its publish access.
pub struct TaskCell<K, T> {
    state: Arc<Mutex<TaskState<K, T>>>,
    next_id: Arc<AtomicU64>,
}

impl<K, T> TaskCell<K, T> {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(TaskState::Idle)),
            next_id: Arc::new(AtomicU64::new(1)),
        }
    }

    fn lock(&self) -> MutexGuard<'_, TaskState<K, T>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Move `Idle -> InFlight(key)`.
    ///
    /// Returns the new task's id, or `None` without touching the state if the
    /// slot is not idle (a task is running or its result has not been taken).
    pub fn try_begin(&self, key: K) -> Option<TaskId> {
        let mut state = self.lock();
        if !state.is_idle() {
            return None;
        }

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        *state = TaskState::InFlight { key, id };
        Some(id)
    }

    /// Move `InFlight(id) -> ResultReady(value)`.
    ///
    /// Returns false and drops `value` if task `id` is no longer the one in
    /// flight (it was abandoned, possibly followed by a newer task).
    pub fn publish(&self, id: TaskId, value: T) -> bool {
        let mut state = self.lock();
        match *state {
            TaskState::InFlight { id: current, .. } if current == id => {
                *state = TaskState::ResultReady(value);
                true
            }
            _ => false,
        }
    }

    /// Read and clear a ready result, moving `ResultReady -> Idle`
    pub fn take(&self) -> Option<T> {
        let mut state = self.lock();
        if !state.is_ready() {
            return None;
        }

        match std::mem::replace(&mut *state, TaskState::Idle) {
            TaskState::ResultReady(value) => Some(value),
            _ => None,
        }
    }

    /// Give up on the in-flight task, moving `InFlight -> Idle`.
    ///
    /// Returns the abandoned task's id; its later publish will be discarded.
    pub fn abandon(&self) -> Option<TaskId> {
        let mut state = self.lock();
        let TaskState::InFlight { id, .. } = *state else {
            return None;
        };

        *state = TaskState::Idle;
        Some(id)
    }

    pub fn is_in_flight(&self) -> bool {
        self.lock().is_in_flight()
    }

    pub fn is_idle(&self) -> bool {
        self.lock().is_idle()
    }

    /// Create a guard that publishes `fallback` for task `id` unless
    /// [`PublishGuard::publish`] is called first.
    pub fn publish_guard(&self, id: TaskId, fallback: T) -> PublishGuard<K, T> {
        PublishGuard {
            cell: self.clone(),
            id,
            fallback: Some(fallback),
        }
    }
}

impl<K: Clone, T> TaskCell<K, T> {
    /// Key of the in-flight task, if any
    pub fn in_flight_key(&self) -> Option<K> {
        match &*self.lock() {
            TaskState::InFlight { key, .. } => Some(key.clone()),
            _ => None,
        }
    }
}

impl<K: Clone, T: Clone> TaskCell<K, T> {
    /// Clone of the current state, for diagnostics and tests
    pub fn snapshot(&self) -> TaskState<K, T> {
        self.lock().clone()
    }
}

impl<K, T> Default for TaskCell<K, T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K, T> Clone for TaskCell<K, T> {
    fn clone(&self) -> Self {
        Self {
            state: Arc::clone(&self.state),
            next_id: Arc::clone(&self.next_id),
        }
    }
}

/// Publishes a task's result exactly once, on every exit path.
///
/// Dropping the guard without calling [`publish`](Self::publish) (early return,
/// panic unwinding) publishes the fallback value instead, so the slot can never
/// stay `InFlight` after its worker is gone.
pub struct PublishGuard<K, T> {
    cell: TaskCell<K, T>,
    id: TaskId,
    fallback: Option<T>,
}

impl<K, T> PublishGuard<K, T> {
    pub fn id(&self) -> TaskId {
        self.id
    }

    /// Publish `value` in place of the fallback.
    ///
    /// Returns false if the task was abandoned before it finished.
    pub fn publish(mut self, value: T) -> bool {
        self.fallback = None;
        self.cell.publish(self.id, value)
    }
}

impl<K, T> Drop for PublishGuard<K, T> {
    fn drop(&mut self) {
        if let Some(fallback) = self.fallback.take() {
            if !self.cell.publish(self.id, fallback) {
                tracing::debug!("Task {} dropped without result after being abandoned", self.id);
            }
        }
    }
}
