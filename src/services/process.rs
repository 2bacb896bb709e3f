use crate::models::{OutcomeKind, ProcessOutcome};
use camino::{Utf8Path, Utf8PathBuf};
use std::fs::{self, File};
use std::process::{Command, ExitStatus, Stdio};
use std::time::Instant;

/// Reason reported when no candidate and no PATH entry matched
pub const NOT_FOUND: &str = "not found";

/// Launches one external executable and waits for it.
///
/// The runner is synchronous and has no timeout: [`run`](Self::run) occupies the
/// calling thread for the full lifetime of the child. Callers that must stay
/// responsive run it on a worker (see
/// [`LaunchCoordinator`](crate::coordinator::LaunchCoordinator)).
#[derive(Debug, Default, Clone, Copy)]
pub struct ProcessRunner;

impl ProcessRunner {
    pub fn new() -> Self {
        Self
    }

    /// Resolve, spawn and wait for an executable.
    ///
    /// # Arguments
    /// * `candidates` - Paths tried in order; the first existing executable file wins.
    ///   If none qualifies, each candidate's file name is looked up on `PATH`.
    /// * `args` - Argument vector passed verbatim, no shell involved
    /// * `log_path` - Truncated and used for the child's stdout and stderr
    ///
    /// # Returns
    /// The classified outcome. Nothing is spawned and the log is not touched when
    /// resolution fails.
    pub fn run(&self, candidates: &[Utf8PathBuf], args: &[String], log_path: &Utf8Path) -> ProcessOutcome {
        let Some(executable) = resolve_executable(candidates) else {
            tracing::warn!("No executable found among {} candidates", candidates.len());
            return ProcessOutcome::launch_failed(NOT_FOUND, log_path.to_path_buf());
        };
        // The child runs in the executable's directory, so a relative path would
        // be ambiguous once the working directory changes.
        let executable = executable.canonicalize_utf8().unwrap_or(executable);

        let mut command = Command::new(executable.as_std_path());
        command.args(args).stdin(Stdio::null());

        if let Some(dir) = executable.parent().filter(|dir| !dir.as_str().is_empty()) {
            command.current_dir(dir);
        }

        match open_log(log_path) {
            Ok((stdout, stderr)) => {
                command.stdout(stdout).stderr(stderr);
            }
            Err(e) => {
                tracing::warn!("Cannot open log {}: {}; output will be discarded", log_path, e);
                command.stdout(Stdio::null()).stderr(Stdio::null());
            }
        }

        tracing::info!("Executing: {} {:?}", executable, args);
        let start = Instant::now();

        let mut child = match command.spawn() {
            Ok(child) => child,
            Err(e) => {
                tracing::error!("Failed to spawn {}: {}", executable, e);
                return ProcessOutcome::launch_failed(e.to_string(), log_path.to_path_buf());
            }
        };

        // Drop our copies of the log handles; the child holds its own.
        drop(command);

        let kind = match child.wait() {
            Ok(status) => classify(status),
            Err(e) => {
                tracing::error!("Failed to wait for {}: {}", executable, e);
                OutcomeKind::LaunchFailed(e.to_string())
            }
        };

        let duration = start.elapsed();
        tracing::info!(
            "{} finished in {:.2}s: {}",
            executable,
            duration.as_secs_f32(),
            kind
        );

        ProcessOutcome {
            kind,
            log_path: log_path.to_path_buf(),
            duration,
        }
    }
}

/// Pick the executable to launch.
///
/// Tries each candidate path in order, then each candidate's bare file name
/// through the `PATH` search.
pub fn resolve_executable(candidates: &[Utf8PathBuf]) -> Option<Utf8PathBuf> {
    if let Some(found) = candidates.iter().find(|path| is_executable(path)) {
        tracing::debug!("Resolved executable candidate: {}", found);
        return Some(found.clone());
    }

    let mut tried = Vec::new();
    for name in candidates.iter().filter_map(|path| path.file_name()) {
        if tried.contains(&name) {
            continue;
        }
        tried.push(name);

        match which::which(name) {
            Ok(path) => match Utf8PathBuf::try_from(path) {
                Ok(path) => {
                    tracing::debug!("Resolved {} on PATH: {}", name, path);
                    return Some(path);
                }
                Err(e) => tracing::warn!("Ignoring non UTF-8 PATH match for {}: {}", name, e),
            },
            Err(e) => tracing::debug!("{} not on PATH: {}", name, e),
        }
    }

    None
}

/// True if `path` is an existing file the current user may execute
pub fn is_executable(path: &Utf8Path) -> bool {
    let Ok(metadata) = fs::metadata(path) else {
        return false;
    };
    metadata.is_file() && has_execute_permission(&metadata)
}

#[cfg(unix)]
fn has_execute_permission(metadata: &fs::Metadata) -> bool {
    use std::os::unix::fs::PermissionsExt;
    metadata.permissions().mode() & 0o111 != 0
}

#[cfg(not(unix))]
fn has_execute_permission(_metadata: &fs::Metadata) -> bool {
    true
}

fn open_log(log_path: &Utf8Path) -> std::io::Result<(File, File)> {
    if let Some(parent) = log_path.parent().filter(|dir| !dir.as_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }

    let stdout = File::create(log_path)?;
    let stderr = stdout.try_clone()?;
    Ok((stdout, stderr))
}

/// Map an exit status to an [`OutcomeKind`]
pub fn classify(status: ExitStatus) -> OutcomeKind {
    if let Some(code) = status.code() {
        return if code == 0 {
            OutcomeKind::Success
        } else {
            OutcomeKind::NonZeroExit(code)
        };
    }

    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return OutcomeKind::KilledBySignal(signal);
        }
    }

    OutcomeKind::LaunchFailed(format!("unrecognised exit status: {}", status))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn temp_dir() -> (TempDir, Utf8PathBuf) {
        let dir = TempDir::new().unwrap();
        let path = Utf8PathBuf::try_from(dir.path().to_path_buf()).unwrap();
        (dir, path)
    }

    #[test]
    fn test_missing_candidates_do_not_resolve() {
        let candidates = vec![Utf8PathBuf::from("/nonexistent/dir/no-such-tool-7f3a9c")];
        assert_eq!(resolve_executable(&candidates), None);
    }

    #[test]
    fn test_empty_candidate_list_does_not_resolve() {
        assert_eq!(resolve_executable(&[]), None);
    }

    #[test]
    fn test_directory_is_not_executable() {
        let (_guard, dir) = temp_dir();
        assert!(!is_executable(&dir));
    }

    #[cfg(unix)]
    #[test]
    fn test_non_executable_file_is_skipped() {
        let (_guard, dir) = temp_dir();
        let plain = dir.join("video-compare");
        fs::write(&plain, "not a program").unwrap();

        assert!(!is_executable(&plain));

        let sh = Utf8PathBuf::from("/bin/sh");
        let resolved = resolve_executable(&[plain, sh.clone()]);
        assert_eq!(resolved, Some(sh));
    }

    #[cfg(unix)]
    #[test]
    fn test_bare_name_falls_back_to_path() {
        let resolved = resolve_executable(&[Utf8PathBuf::from("/nonexistent/dir/sh")]);
        let resolved = resolved.expect("sh should be on PATH");
        assert_eq!(resolved.file_name(), Some("sh"));
        assert!(is_executable(&resolved));
    }

    #[cfg(unix)]
    #[test]
    fn test_classify_exit_codes() {
        use std::os::unix::process::ExitStatusExt;

        // Raw wait statuses: exit code in the high byte, signal in the low bits
        assert_eq!(classify(ExitStatus::from_raw(0)), OutcomeKind::Success);
        assert_eq!(classify(ExitStatus::from_raw(3 << 8)), OutcomeKind::NonZeroExit(3));
        assert_eq!(classify(ExitStatus::from_raw(9)), OutcomeKind::KilledBySignal(9));
    }

    #[test]
    fn test_open_log_creates_parent_dirs() {
        let (_guard, dir) = temp_dir();
        let log = dir.join("nested").join("deeper").join("run.log");

        let (mut stdout, mut stderr) = open_log(&log).unwrap();
        use std::io::Write;
        writeln!(stdout, "out").unwrap();
        writeln!(stderr, "err").unwrap();
        drop((stdout, stderr));

        assert_eq!(fs::read_to_string(&log).unwrap(), "out\nerr\n");
    }
}
