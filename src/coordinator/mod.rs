// Coordinator module - background tasks polled from the presentation loop
//
// This module contains:
// - TaskCoordinator: one file selection at a time, results collected by poll()
// - LaunchCoordinator: one video-compare run at a time, same start/poll contract
// - ProbeCoordinator: one ffprobe lookup at a time, tagged with its slot

pub mod launch;
pub mod probe;
pub mod selection;

pub use launch::{LaunchCoordinator, LaunchReport};
pub use probe::{ProbeCoordinator, ProbeReport};
pub use selection::TaskCoordinator;
