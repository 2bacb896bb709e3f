use camino::Utf8PathBuf;
use std::fmt;
use std::time::Duration;

/// How an external process run ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutcomeKind {
    /// Exited normally with code 0
    Success,
    /// Exited normally with a non-zero code
    NonZeroExit(i32),
    /// Terminated by a signal
    KilledBySignal(i32),
    /// Never ran: executable not found or the spawn itself failed
    LaunchFailed(String),
}

impl fmt::Display for OutcomeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutcomeKind::Success => write!(f, "exited successfully"),
            OutcomeKind::NonZeroExit(code) => write!(f, "exited with code {}", code),
            OutcomeKind::KilledBySignal(signal) => write!(f, "killed by signal {}", signal),
            OutcomeKind::LaunchFailed(reason) => write!(f, "failed to launch: {}", reason),
        }
    }
}

/// Result of [`ProcessRunner::run`](crate::services::ProcessRunner::run)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessOutcome {
    pub kind: OutcomeKind,

    /// Log file that received the child's stdout and stderr
    pub log_path: Utf8PathBuf,

    /// Wall time from spawn to exit (zero when nothing was spawned)
    pub duration: Duration,
}

impl ProcessOutcome {
    pub fn launch_failed(reason: impl Into<String>, log_path: Utf8PathBuf) -> Self {
        Self {
            kind: OutcomeKind::LaunchFailed(reason.into()),
            log_path,
            duration: Duration::ZERO,
        }
    }

    pub fn is_success(&self) -> bool {
        self.kind == OutcomeKind::Success
    }

    /// True if the process ran, so the log may hold diagnostics
    pub fn has_log(&self) -> bool {
        !matches!(self.kind, OutcomeKind::LaunchFailed(_))
    }

    /// Message suitable for a status line
    pub fn summary(&self) -> String {
        match &self.kind {
            OutcomeKind::Success => format!("video-compare {}", self.kind),
            OutcomeKind::LaunchFailed(_) => format!("video-compare {}", self.kind),
            _ => format!("video-compare {} (see {})", self.kind, self.log_path),
        }
    }
}
