use crate::models::{DialogBackend, DialogSettings, Slot};
use crate::state::CancelToken;
use camino::Utf8PathBuf;
use std::io::{self, BufRead, BufReader, Read, Stdin, Stdout, Write};
use std::process::{Child, Command, Stdio};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use thiserror::Error;

/// File type filter shown by the dialog
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileFilter {
    pub name: String,
    pub extensions: Vec<String>,
}

/// What to ask the user for
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PickRequest {
    pub title: String,
    pub filter: Option<FileFilter>,
}

impl PickRequest {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            filter: None,
        }
    }

    /// Request for one comparison slot, filtered to the given video extensions
    pub fn for_slot(slot: Slot, extensions: &[String]) -> Self {
        let filter = (!extensions.is_empty()).then(|| FileFilter {
            name: "Video".to_string(),
            extensions: extensions.to_vec(),
        });

        Self {
            title: format!("Select {} video", slot),
            filter,
        }
    }
}

/// Errors a file picker can report.
///
/// The selection worker never propagates these: every one of them collapses to
/// "no path chosen" after being logged.
#[derive(Error, Debug)]
pub enum DialogError {
    #[error("Dialog helper '{0}' not found")]
    HelperMissing(String),

    #[error("Dialog helper failed: {0}")]
    HelperFailed(String),

    #[error("Selected path is not valid UTF-8: {0}")]
    NonUtf8Path(String),

    #[error("Dialog cancelled")]
    Cancelled,

    #[error("Dialog I/O error: {0}")]
    Io(#[from] io::Error),
}

/// A blocking "choose a file" interaction.
///
/// Implementations may block for as long as the user takes. They should check
/// `cancel` where the platform allows it and return [`DialogError::Cancelled`].
/// `Ok(None)` means the user dismissed the dialog.
#[cfg_attr(test, mockall::automock)]
pub trait FilePicker: Send + Sync {
    fn pick(&self, request: &PickRequest, cancel: &CancelToken)
    -> Result<Option<String>, DialogError>;
}

/// Strip trailing line terminators; an empty result means nothing was chosen
pub fn normalize_selection(raw: &str) -> Option<Utf8PathBuf> {
    let trimmed = raw.trim_end_matches(['\r', '\n']);
    if trimmed.is_empty() {
        None
    } else {
        Some(Utf8PathBuf::from(trimmed))
    }
}

/// Build the picker selected in the configuration
pub fn picker_from_settings(settings: &DialogSettings) -> Arc<dyn FilePicker> {
    match settings.backend {
        DialogBackend::Native => Arc::new(NativePicker),
        DialogBackend::Helper => Arc::new(HelperPicker::from_settings(settings)),
        DialogBackend::Prompt => Arc::new(PromptPicker::stdio()),
    }
}

/// OS-native dialog through `rfd`.
///
/// The native call cannot be interrupted, so cancellation is only observed
/// before the dialog opens.
#[derive(Debug, Default, Clone, Copy)]
pub struct NativePicker;

impl FilePicker for NativePicker {
    fn pick(
        &self,
        request: &PickRequest,
        cancel: &CancelToken,
    ) -> Result<Option<String>, DialogError> {
        use rfd::FileDialog;

        if cancel.is_cancelled() {
            return Err(DialogError::Cancelled);
        }

        let mut dialog = FileDialog::new().set_title(request.title.as_str());
        if let Some(filter) = &request.filter {
            dialog = dialog.add_filter(filter.name.as_str(), filter.extensions.as_slice());
        }

        let Some(path) = dialog.pick_file() else {
            return Ok(None);
        };

        Utf8PathBuf::try_from(path)
            .map(|path| Some(path.into_string()))
            .map_err(|e| DialogError::NonUtf8Path(e.into_path_buf().display().to_string()))
    }
}

/// Runs an external helper program that prints the chosen path on stdout.
///
/// Exit code 0 is a selection, exit code 1 is the user cancelling (both
/// `zenity` and `osascript` use it), anything else is a failure. The helper is
/// killed when the task is cancelled.
#[derive(Debug, Clone)]
pub struct HelperPicker {
    program: String,
    args: Vec<String>,
    poll_interval: Duration,
}

impl HelperPicker {
    /// Create a picker for `program`; `{title}` and `{extensions}` in `args`
    /// are substituted per request
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
            poll_interval: Duration::from_millis(50),
        }
    }

    /// `osascript` on macOS, `zenity` everywhere else
    pub fn platform_default() -> Self {
        if cfg!(target_os = "macos") {
            Self::new(
                "osascript",
                vec![
                    "-e".to_string(),
                    "POSIX path of (choose file with prompt \"{title}\")".to_string(),
                ],
            )
        } else {
            Self::new(
                "zenity",
                vec![
                    "--file-selection".to_string(),
                    "--title={title}".to_string(),
                    "--file-filter=Video | {extensions}".to_string(),
                ],
            )
        }
    }

    pub fn from_settings(settings: &DialogSettings) -> Self {
        match &settings.helper_program {
            Some(program) => Self::new(program.clone(), settings.helper_args.clone()),
            None => Self::platform_default(),
        }
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    /// Arguments for one request with placeholders filled in
    pub fn expand_args(&self, request: &PickRequest) -> Vec<String> {
        let extensions = match &request.filter {
            Some(filter) if !filter.extensions.is_empty() => filter
                .extensions
                .iter()
                .map(|ext| format!("*.{}", ext))
                .collect::<Vec<_>>()
                .join(" "),
            _ => "*".to_string(),
        };

        self.args
            .iter()
            .map(|arg| {
                arg.replace("{title}", &request.title)
                    .replace("{extensions}", &extensions)
            })
            .collect()
    }
}

impl FilePicker for HelperPicker {
    fn pick(
        &self,
        request: &PickRequest,
        cancel: &CancelToken,
    ) -> Result<Option<String>, DialogError> {
        let args = self.expand_args(request);
        tracing::debug!("Running dialog helper: {} {:?}", self.program, args);

        let mut command = Command::new(&self.program);
        command
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null());

        // Own process group, so cancel reaches anything the helper started
        #[cfg(unix)]
        {
            use std::os::unix::process::CommandExt;
            command.process_group(0);
        }

        let mut child = match command.spawn() {
            Ok(child) => child,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(DialogError::HelperMissing(self.program.clone()));
            }
            Err(e) => return Err(e.into()),
        };

        // Drain stdout while the helper runs; a full pipe would stall it
        let (output_tx, output_rx) = mpsc::channel();
        match child.stdout.take() {
            Some(mut stdout) => {
                std::thread::spawn(move || {
                    let mut output = Vec::new();
                    let _ = output_tx.send(stdout.read_to_end(&mut output).map(|_| output));
                });
            }
            None => drop(output_tx),
        }

        let status = loop {
            if cancel.is_cancelled() {
                tracing::info!("Dialog helper cancelled, killing {}", self.program);
                stop_helper(&mut child);
                return Err(DialogError::Cancelled);
            }

            match child.try_wait()? {
                Some(status) => break status,
                None => std::thread::sleep(self.poll_interval),
            }
        };

        // The pipe stays open while anything the helper started still holds it
        let output = loop {
            if cancel.is_cancelled() {
                tracing::info!("Dialog helper cancelled while its output was pending");
                stop_helper(&mut child);
                return Err(DialogError::Cancelled);
            }

            match output_rx.recv_timeout(self.poll_interval) {
                Ok(output) => break output?,
                Err(RecvTimeoutError::Timeout) => continue,
                Err(RecvTimeoutError::Disconnected) => break Vec::new(),
            }
        };

        match status.code() {
            Some(0) => String::from_utf8(output)
                .map(Some)
                .map_err(|e| DialogError::NonUtf8Path(String::from_utf8_lossy(e.as_bytes()).into_owned())),
            Some(1) => Ok(None),
            _ => Err(DialogError::HelperFailed(status.to_string())),
        }
    }
}

/// Kill the helper and everything in its process group
fn stop_helper(child: &mut Child) {
    #[cfg(unix)]
    {
        let group = format!("kill -TERM -{}", child.id());
        match Command::new("sh")
            .args(["-c", &group])
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
        {
            Ok(status) if !status.success() => {
                tracing::debug!("Process group of dialog helper already gone ({})", status)
            }
            Ok(_) => {}
            Err(e) => tracing::warn!("Failed to signal dialog helper group: {}", e),
        }
    }

    let _ = child.kill();
    let _ = child.wait();
}

/// Line-oriented prompt, the portable fallback when no dialog is available.
///
/// Writes the request title to `output` and reads one line from `input`.
/// End of input means nothing was chosen.
pub struct PromptPicker<R, W> {
    io: Mutex<(R, W)>,
}

impl PromptPicker<BufReader<Stdin>, Stdout> {
    pub fn stdio() -> Self {
        Self::new(BufReader::new(io::stdin()), io::stdout())
    }
}

impl<R, W> PromptPicker<R, W>
where
    R: BufRead + Send,
    W: Write + Send,
{
    pub fn new(input: R, output: W) -> Self {
        Self {
            io: Mutex::new((input, output)),
        }
    }

    /// Give back the reader and writer
    pub fn into_inner(self) -> (R, W) {
        self.io.into_inner().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<R, W> FilePicker for PromptPicker<R, W>
where
    R: BufRead + Send,
    W: Write + Send,
{
    fn pick(
        &self,
        request: &PickRequest,
        cancel: &CancelToken,
    ) -> Result<Option<String>, DialogError> {
        if cancel.is_cancelled() {
            return Err(DialogError::Cancelled);
        }

        let mut io = self.io.lock().unwrap_or_else(PoisonError::into_inner);
        let (input, output) = &mut *io;

        match &request.filter {
            Some(filter) => write!(output, "{} ({}): ", request.title, filter.extensions.join(", "))?,
            None => write!(output, "{}: ", request.title)?,
        }
        output.flush()?;

        let mut line = String::new();
        if input.read_line(&mut line)? == 0 {
            return Ok(None);
        }

        Ok(Some(line))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::cancel_pair;
    use std::io::Cursor;

    #[test]
    fn test_normalize_strips_line_terminators() {
        assert_eq!(
            normalize_selection("/tmp/a.mp4\r\n"),
            Some(Utf8PathBuf::from("/tmp/a.mp4"))
        );
        assert_eq!(
            normalize_selection("/tmp/with space.mp4\n"),
            Some(Utf8PathBuf::from("/tmp/with space.mp4"))
        );
    }

    #[test]
    fn test_normalize_empty_is_none() {
        assert_eq!(normalize_selection(""), None);
        assert_eq!(normalize_selection("\n"), None);
        assert_eq!(normalize_selection("\r\n"), None);
    }

    #[test]
    fn test_request_for_slot() {
        let request = PickRequest::for_slot(Slot::Right, &["mp4".to_string()]);
        assert_eq!(request.title, "Select right video");
        assert_eq!(request.filter.unwrap().extensions, vec!["mp4".to_string()]);

        let unfiltered = PickRequest::for_slot(Slot::Left, &[]);
        assert!(unfiltered.filter.is_none());
    }

    #[test]
    fn test_helper_args_substitution() {
        let helper = HelperPicker::new(
            "zenity",
            vec!["--title={title}".to_string(), "--file-filter=Video | {extensions}".to_string()],
        );
        let request = PickRequest::for_slot(Slot::Left, &["mp4".to_string(), "mkv".to_string()]);

        assert_eq!(
            helper.expand_args(&request),
            vec![
                "--title=Select left video".to_string(),
                "--file-filter=Video | *.mp4 *.mkv".to_string(),
            ]
        );
    }

    #[test]
    fn test_helper_args_without_filter() {
        let helper = HelperPicker::new("zenity", vec!["{extensions}".to_string()]);
        assert_eq!(helper.expand_args(&PickRequest::new("x")), vec!["*".to_string()]);
    }

    #[test]
    fn test_helper_missing_program() {
        let helper = HelperPicker::new("definitely-not-a-dialog-helper-4242", Vec::new());
        let result = helper.pick(&PickRequest::new("x"), &CancelToken::never());
        assert!(matches!(result, Err(DialogError::HelperMissing(_))));
    }

    #[cfg(unix)]
    fn sh(script: &str) -> HelperPicker {
        HelperPicker::new("/bin/sh", vec!["-c".to_string(), script.to_string()])
            .with_poll_interval(Duration::from_millis(5))
    }

    #[cfg(unix)]
    #[test]
    fn test_helper_reports_selection() {
        let result = sh("echo /tmp/a.mp4").pick(&PickRequest::new("x"), &CancelToken::never());
        assert_eq!(result.unwrap().as_deref(), Some("/tmp/a.mp4\n"));
    }

    #[cfg(unix)]
    #[test]
    fn test_helper_exit_one_is_dismissal() {
        let result = sh("exit 1").pick(&PickRequest::new("x"), &CancelToken::never());
        assert_eq!(result.unwrap(), None);
    }

    #[cfg(unix)]
    #[test]
    fn test_helper_other_exit_is_failure() {
        let result = sh("exit 5").pick(&PickRequest::new("x"), &CancelToken::never());
        assert!(matches!(result, Err(DialogError::HelperFailed(_))));
    }

    #[cfg(unix)]
    #[test]
    fn test_helper_killed_on_cancel() {
        let (handle, token) = cancel_pair();
        handle.cancel();

        let started = std::time::Instant::now();
        let result = sh("exec sleep 30").pick(&PickRequest::new("x"), &token);

        assert!(matches!(result, Err(DialogError::Cancelled)));
        assert!(started.elapsed() < Duration::from_secs(10));
    }

    #[cfg(unix)]
    #[test]
    fn test_helper_large_output_does_not_stall() {
        // Well past the 64 KiB pipe buffer
        let helper = sh("dd if=/dev/zero bs=1000 count=200 2>/dev/null | tr '\\0' a");

        let result = helper.pick(&PickRequest::new("x"), &CancelToken::never()).unwrap();
        let output = result.unwrap();

        assert_eq!(output.len(), 200_000);
        assert!(output.bytes().all(|b| b == b'a'));
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_cancel_stops_processes_started_by_helper() {
        let dir = tempfile::TempDir::new().unwrap();
        let pid_file = dir.path().join("sleeper.pid");
        let script = format!("sleep 30 & echo $! > '{}'; wait", pid_file.display());
        let helper = sh(&script);

        let (handle, token) = cancel_pair();
        let worker = std::thread::spawn(move || helper.pick(&PickRequest::new("x"), &token));

        let deadline = std::time::Instant::now() + Duration::from_secs(10);
        let pid = loop {
            if let Some(pid) = std::fs::read_to_string(&pid_file)
                .ok()
                .and_then(|text| text.trim().parse::<u32>().ok())
            {
                break pid;
            }
            assert!(std::time::Instant::now() < deadline, "helper never started its child");
            std::thread::sleep(Duration::from_millis(5));
        };

        handle.cancel();
        let result = worker.join().unwrap();
        assert!(matches!(result, Err(DialogError::Cancelled)));

        // Gone, or a zombie waiting for init to reap it
        let stopped = || match std::fs::read_to_string(format!("/proc/{pid}/stat")) {
            Err(_) => true,
            Ok(stat) => stat
                .rsplit_once(") ")
                .is_some_and(|(_, rest)| rest.starts_with('Z')),
        };
        let deadline = std::time::Instant::now() + Duration::from_secs(2);
        while !stopped() && std::time::Instant::now() < deadline {
            std::thread::sleep(Duration::from_millis(10));
        }
        assert!(stopped(), "sleep {pid} outlived the cancelled helper");
    }

    #[test]
    fn test_prompt_reads_one_line() {
        let picker = PromptPicker::new(Cursor::new(b"/tmp/a.mp4\n/tmp/b.mp4\n".to_vec()), Vec::new());
        let request = PickRequest::for_slot(Slot::Left, &["mp4".to_string()]);

        let first = picker.pick(&request, &CancelToken::never()).unwrap();
        assert_eq!(first.as_deref(), Some("/tmp/a.mp4\n"));

        let (_, output) = picker.into_inner();
        assert_eq!(String::from_utf8(output).unwrap(), "Select left video (mp4): ");
    }

    #[test]
    fn test_prompt_end_of_input_is_none() {
        let picker = PromptPicker::new(Cursor::new(Vec::new()), Vec::new());
        let result = picker.pick(&PickRequest::new("x"), &CancelToken::never());
        assert_eq!(result.unwrap(), None);
    }

    #[test]
    fn test_prompt_respects_cancel() {
        let (handle, token) = cancel_pair();
        handle.cancel();

        let picker = PromptPicker::new(Cursor::new(b"/tmp/a.mp4\n".to_vec()), Vec::new());
        let result = picker.pick(&PickRequest::new("x"), &token);
        assert!(matches!(result, Err(DialogError::Cancelled)));
    }
}
