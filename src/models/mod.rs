//! Data models for the launcher.
//!
//! - [`Slot`], [`SelectionOutcome`], [`SelectionPair`]: what the file picker produced
//! - [`ProcessOutcome`], [`OutcomeKind`]: how a `video-compare` run ended
//! - [`LauncherConfig`]: settings loaded from `launcher.yaml`
//!
//! All of these are plain values. Shared mutable state lives in
//! [`TaskCell`](crate::state::TaskCell), never here.

pub mod config;
pub mod outcome;
pub mod selection;

pub use config::{CompareSettings, DialogBackend, DialogSettings, LauncherConfig, LoggingSettings, ProbeSettings};
pub use outcome::{OutcomeKind, ProcessOutcome};
pub use selection::{SelectionOutcome, SelectionPair, Slot, UnknownSlot};
