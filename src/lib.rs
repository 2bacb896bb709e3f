// Video Compare Launcher - pick two videos and hand them to video-compare
//
// This is the library crate containing the task coordinators and the services
// they run. The binary crate (main.rs) provides a terminal front end.

pub mod config;
pub mod coordinator;
pub mod logging;
pub mod metrics;
pub mod models;
pub mod services;
pub mod state;

// Re-export commonly used types for convenience
pub use config::ConfigManager;
pub use coordinator::{LaunchCoordinator, LaunchReport, ProbeCoordinator, ProbeReport, TaskCoordinator};
pub use metrics::Metrics;
pub use models::{LauncherConfig, OutcomeKind, ProcessOutcome, SelectionOutcome, SelectionPair, Slot};
pub use services::ProcessRunner;

/// Application version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name
pub const APP_NAME: &str = env!("CARGO_PKG_NAME");
