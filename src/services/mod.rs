//! Services module - blocking work the coordinators run off the UI thread.
//!
//! Nothing in here spawns threads or touches shared state. Each service is a
//! plain synchronous call, which keeps it testable on its own; the
//! [`coordinator`](crate::coordinator) module decides where it runs.
//!
//! # Components
//!
//! - [`FilePicker`]: a blocking "choose a file" interaction, with three backends:
//!   - [`NativePicker`]: the OS dialog through `rfd`
//!   - [`HelperPicker`]: an external helper program (`zenity`, `osascript`), killable on cancel
//!   - [`PromptPicker`]: a line-oriented terminal prompt
//! - [`ProcessRunner`]: resolves an executable from a candidate list, redirects its
//!   output into a log file, waits for it and classifies the exit
//! - [`VideoProber`]: async `ffprobe` lookup with a time limit, parsed into [`VideoInfo`]
//! - [`comparison`]: argument building and executable candidates for `video-compare`
//!
//! # Usage Example
//!
//! ```ignore
//! use video_compare_launcher::services::{build_arguments, ComparisonRequest, ProcessRunner};
//!
//! let request = ComparisonRequest::new("/videos/a.mp4", "/videos/b.mp4");
//! let args = build_arguments(&request, Some("1280x720".parse()?));
//!
//! let outcome = ProcessRunner::new().run(&candidates, &args, Utf8Path::new("logs/video-compare.log"));
//! println!("{}", outcome.summary());
//! ```

pub mod comparison;
pub mod dialog;
pub mod probe;
pub mod process;

pub use comparison::{ComparisonError, ComparisonRequest, WindowSize, build_arguments, is_stream_url};
pub use dialog::{
    DialogError, FileFilter, FilePicker, HelperPicker, NativePicker, PickRequest, PromptPicker,
    normalize_selection, picker_from_settings,
};
pub use probe::{ProbeError, VideoInfo, VideoProber};
pub use process::{ProcessRunner, resolve_executable};
