use crate::models::CompareSettings;
use camino::{Utf8Path, Utf8PathBuf};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Flag `video-compare` uses for an explicit window size
pub const WINDOW_FLAG: &str = "-w";

/// Flag passed instead of `-w` when no size is configured
pub const FIT_DISPLAY_FLAG: &str = "--window-fit-display";

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ComparisonError {
    #[error("Invalid window size '{0}' (expected WIDTHxHEIGHT, e.g. 1280x720)")]
    InvalidWindowSize(String),
}

/// Comparison window size, written `WIDTHxHEIGHT`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowSize {
    pub width: u32,
    pub height: u32,
}

impl WindowSize {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

impl fmt::Display for WindowSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

impl FromStr for WindowSize {
    type Err = ComparisonError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ComparisonError::InvalidWindowSize(s.to_string());

        let (width, height) = s.trim().split_once(['x', 'X']).ok_or_else(invalid)?;
        let width: u32 = width.trim().parse().map_err(|_| invalid())?;
        let height: u32 = height.trim().parse().map_err(|_| invalid())?;

        if width == 0 || height == 0 {
            return Err(invalid());
        }

        Ok(Self { width, height })
    }
}

/// Two files to compare plus per-run options
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComparisonRequest {
    pub left: Utf8PathBuf,
    pub right: Utf8PathBuf,
    pub mode: Option<String>,
    pub extra_args: Vec<String>,
}

impl ComparisonRequest {
    pub fn new(left: impl Into<Utf8PathBuf>, right: impl Into<Utf8PathBuf>) -> Self {
        Self {
            left: left.into(),
            right: right.into(),
            mode: None,
            extra_args: Vec::new(),
        }
    }

    /// Copy of the request with relative file paths joined onto `base`.
    ///
    /// Stream URLs and absolute paths are left alone. The tool runs in its own
    /// directory, so relative paths must be anchored before launch.
    pub fn resolve_relative_to(&self, base: &Utf8Path) -> Self {
        Self {
            left: anchor(&self.left, base),
            right: anchor(&self.right, base),
            ..self.clone()
        }
    }

    /// Request with the mode and extra arguments from the configuration
    pub fn with_settings(
        left: impl Into<Utf8PathBuf>,
        right: impl Into<Utf8PathBuf>,
        settings: &CompareSettings,
    ) -> Self {
        Self {
            mode: settings.mode.clone().filter(|mode| !mode.trim().is_empty()),
            extra_args: settings.extra_args.clone(),
            ..Self::new(left, right)
        }
    }
}

/// True for inputs the tools read over the network instead of from disk
pub fn is_stream_url(input: &str) -> bool {
    let Some((scheme, _)) = input.split_once("://") else {
        return false;
    };
    ["http", "https", "rtmp", "rtsp"]
        .iter()
        .any(|known| scheme.eq_ignore_ascii_case(known))
}

fn anchor(path: &Utf8Path, base: &Utf8Path) -> Utf8PathBuf {
    if path.as_str().is_empty() || path.is_absolute() || is_stream_url(path.as_str()) {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}

/// Build the argument vector for `video-compare`.
///
/// Order: `-m <mode>`, extra arguments, the window flag, then the two files.
/// An explicit `-w` among the extra arguments wins over `window`; with neither,
/// the tool is asked to fit the display.
pub fn build_arguments(request: &ComparisonRequest, window: Option<WindowSize>) -> Vec<String> {
    let mut args = Vec::with_capacity(request.extra_args.len() + 6);

    if let Some(mode) = &request.mode {
        args.push("-m".to_string());
        args.push(mode.clone());
    }

    args.extend(request.extra_args.iter().cloned());

    if !request.extra_args.iter().any(|arg| arg == WINDOW_FLAG) {
        match window {
            Some(size) => {
                args.push(WINDOW_FLAG.to_string());
                args.push(size.to_string());
            }
            None => args.push(FIT_DISPLAY_FLAG.to_string()),
        }
    }

    args.push(request.left.to_string());
    args.push(request.right.to_string());
    args
}

/// Subdirectory the bundled tool ships in for this platform
pub fn platform_inner_dir() -> &'static str {
    if cfg!(target_os = "macos") {
        "mac-inner"
    } else {
        "win-inner"
    }
}

/// Built-in executable locations under each base directory.
///
/// For every directory: `<dir>/<platform-inner>/<exe>` then `<dir>/<exe>`.
pub fn default_candidates(executable: &str, base_dirs: &[Utf8PathBuf]) -> Vec<Utf8PathBuf> {
    base_dirs
        .iter()
        .flat_map(|dir| {
            [
                dir.join(platform_inner_dir()).join(executable),
                dir.join(executable),
            ]
        })
        .collect()
}

/// Directories searched by default: next to the launcher binary, then the
/// current directory
pub fn default_base_dirs() -> Vec<Utf8PathBuf> {
    let mut dirs = Vec::new();

    if let Some(exe_dir) = std::env::current_exe()
        .ok()
        .and_then(|exe| Utf8PathBuf::try_from(exe).ok())
        .and_then(|exe| exe.parent().map(Utf8Path::to_path_buf))
    {
        dirs.push(exe_dir);
    }

    if let Some(cwd) = std::env::current_dir()
        .ok()
        .and_then(|cwd| Utf8PathBuf::try_from(cwd).ok())
    {
        if !dirs.contains(&cwd) {
            dirs.push(cwd);
        }
    }

    dirs
}

/// Full candidate list for the configured tool: explicit candidates first,
/// then the built-in locations
pub fn candidates_from_settings(settings: &CompareSettings, base_dirs: &[Utf8PathBuf]) -> Vec<Utf8PathBuf> {
    let mut candidates: Vec<Utf8PathBuf> = settings
        .candidates
        .iter()
        .filter(|candidate| !candidate.trim().is_empty())
        .map(Utf8PathBuf::from)
        .collect();

    candidates.extend(default_candidates(&settings.executable, base_dirs));
    candidates
}

/// Parse the configured window size; blank means "fit the display"
pub fn window_from_settings(settings: &CompareSettings) -> Result<Option<WindowSize>, ComparisonError> {
    match settings.window_size.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(size) => size.parse().map(Some),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_window_size_parse_and_display() {
        let size: WindowSize = "1920x1080".parse().unwrap();
        assert_eq!(size, WindowSize::new(1920, 1080));
        assert_eq!(size.to_string(), "1920x1080");

        assert_eq!(" 800X600 ".parse::<WindowSize>().unwrap(), WindowSize::new(800, 600));
    }

    #[test]
    fn test_window_size_rejects_garbage() {
        for bad in ["", "1280", "x720", "1280x", "0x720", "1280x0", "-1x5", "axb"] {
            assert_eq!(
                bad.parse::<WindowSize>(),
                Err(ComparisonError::InvalidWindowSize(bad.to_string())),
                "{bad:?} should be rejected"
            );
        }
    }

    #[test]
    fn test_default_arguments() {
        let request = ComparisonRequest::new("/videos/a.mp4", "/videos/b.mp4");
        let args = build_arguments(&request, Some(WindowSize::new(1280, 720)));

        assert_eq!(args, vec!["-w", "1280x720", "/videos/a.mp4", "/videos/b.mp4"]);
    }

    #[test]
    fn test_arguments_keep_spaces_and_quotes_intact() {
        let request = ComparisonRequest::new("/videos/my clip.mp4", "/videos/it's \"b\".mp4");
        let args = build_arguments(&request, Some(WindowSize::new(640, 480)));

        assert_eq!(args[2], "/videos/my clip.mp4");
        assert_eq!(args[3], "/videos/it's \"b\".mp4");
    }

    #[test]
    fn test_mode_and_extra_arguments() {
        let request = ComparisonRequest {
            mode: Some("vstack".to_string()),
            extra_args: vec!["-t".to_string(), "2".to_string()],
            ..ComparisonRequest::new("a.mp4", "b.mp4")
        };
        let args = build_arguments(&request, None);

        assert_eq!(
            args,
            vec!["-m", "vstack", "-t", "2", FIT_DISPLAY_FLAG, "a.mp4", "b.mp4"]
        );
    }

    #[test]
    fn test_explicit_window_flag_wins() {
        let request = ComparisonRequest {
            extra_args: vec!["-w".to_string(), "800x600".to_string()],
            ..ComparisonRequest::new("a.mp4", "b.mp4")
        };
        let args = build_arguments(&request, Some(WindowSize::new(1280, 720)));

        assert_eq!(args, vec!["-w", "800x600", "a.mp4", "b.mp4"]);
    }

    #[test]
    fn test_default_candidates_order() {
        let dirs = vec![Utf8PathBuf::from("/opt/app"), Utf8PathBuf::from("/work")];
        let candidates = default_candidates("video-compare", &dirs);

        let inner = platform_inner_dir();
        assert_eq!(
            candidates,
            vec![
                Utf8PathBuf::from(format!("/opt/app/{inner}/video-compare")),
                Utf8PathBuf::from("/opt/app/video-compare"),
                Utf8PathBuf::from(format!("/work/{inner}/video-compare")),
                Utf8PathBuf::from("/work/video-compare"),
            ]
        );
    }

    #[test]
    fn test_candidates_from_settings_puts_explicit_first() {
        let settings = CompareSettings {
            executable: "video-compare".to_string(),
            candidates: vec!["/custom/video-compare".to_string(), "  ".to_string()],
            ..CompareSettings::default()
        };
        let candidates = candidates_from_settings(&settings, &[Utf8PathBuf::from("/opt/app")]);

        assert_eq!(candidates.len(), 3);
        assert_eq!(candidates[0], Utf8PathBuf::from("/custom/video-compare"));
    }

    #[test]
    fn test_window_from_settings() {
        let mut settings = CompareSettings::default();
        assert_eq!(window_from_settings(&settings), Ok(Some(WindowSize::new(1280, 720))));

        settings.window_size = Some(" ".to_string());
        assert_eq!(window_from_settings(&settings), Ok(None));

        settings.window_size = None;
        assert_eq!(window_from_settings(&settings), Ok(None));

        settings.window_size = Some("huge".to_string());
        assert!(window_from_settings(&settings).is_err());
    }

    #[test]
    fn test_stream_urls_are_recognised() {
        assert!(is_stream_url("http://example.com/a.mp4"));
        assert!(is_stream_url("RTSP://camera.local/stream"));
        assert!(is_stream_url("rtmp://live/app"));
        assert!(!is_stream_url("ftp://example.com/a.mp4"));
        assert!(!is_stream_url("videos/http.mp4"));
        assert!(!is_stream_url("C:\\videos\\a.mp4"));
    }

    #[test]
    fn test_relative_paths_are_anchored() {
        let request = ComparisonRequest {
            mode: Some("vstack".to_string()),
            ..ComparisonRequest::new("clips/a.mp4", "/videos/b.mp4")
        };
        let resolved = request.resolve_relative_to(Utf8Path::new("/work"));

        assert_eq!(resolved.left, Utf8PathBuf::from("/work/clips/a.mp4"));
        assert_eq!(resolved.right, Utf8PathBuf::from("/videos/b.mp4"));
        assert_eq!(resolved.mode, request.mode);
    }

    #[test]
    fn test_stream_urls_are_not_anchored() {
        let request = ComparisonRequest::new("https://example.com/a.m3u8", "b.mp4");
        let resolved = request.resolve_relative_to(Utf8Path::new("/work"));

        assert_eq!(resolved.left, Utf8PathBuf::from("https://example.com/a.m3u8"));
        assert_eq!(resolved.right, Utf8PathBuf::from("/work/b.mp4"));
    }

    #[test]
    fn test_request_with_settings_ignores_blank_mode() {
        let settings = CompareSettings {
            mode: Some(" ".to_string()),
            extra_args: vec!["--high-dpi".to_string()],
            ..CompareSettings::default()
        };
        let request = ComparisonRequest::with_settings("a.mp4", "b.mp4", &settings);

        assert_eq!(request.mode, None);
        assert_eq!(request.extra_args, vec!["--high-dpi".to_string()]);
    }
}
