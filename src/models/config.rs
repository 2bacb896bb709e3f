use serde::{Deserialize, Serialize};

/// Launcher configuration from `launcher.yaml`
///
/// Every field has a default, so an empty or missing file yields a working setup.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LauncherConfig {
    pub compare: CompareSettings,
    pub dialog: DialogSettings,
    pub probe: ProbeSettings,
    pub logging: LoggingSettings,
}

/// Settings for the external `video-compare` tool
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompareSettings {
    /// Bare executable name, also used for the PATH fallback
    pub executable: String,

    /// Extra candidate paths tried before the built-in locations
    pub candidates: Vec<String>,

    /// Window size passed as `-w WxH`; `None` lets the tool fit the display
    pub window_size: Option<String>,

    /// Where stdout/stderr of the tool are captured
    pub log_file: String,

    /// Comparison mode passed as `-m <mode>`
    pub mode: Option<String>,

    pub extra_args: Vec<String>,
}

impl Default for CompareSettings {
    fn default() -> Self {
        Self {
            executable: default_executable_name().to_string(),
            candidates: Vec::new(),
            window_size: Some("1280x720".to_string()),
            log_file: "logs/video-compare.log".to_string(),
            mode: None,
            extra_args: Vec::new(),
        }
    }
}

fn default_executable_name() -> &'static str {
    if cfg!(target_os = "windows") {
        "video-compare.exe"
    } else {
        "video-compare"
    }
}

/// Which file picker backs the selection worker
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DialogBackend {
    /// OS-native dialog
    Native,
    /// External helper program (zenity, osascript, ...)
    Helper,
    /// Line-oriented prompt on the terminal
    Prompt,
}

impl Default for DialogBackend {
    // The native macOS dialog must run on the main thread, which the selection
    // worker never is.
    fn default() -> Self {
        if cfg!(target_os = "macos") {
            DialogBackend::Helper
        } else {
            DialogBackend::Native
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DialogSettings {
    pub backend: DialogBackend,

    /// Helper program; the platform default is used when unset
    pub helper_program: Option<String>,

    /// Helper arguments. `{title}` and `{extensions}` are substituted.
    pub helper_args: Vec<String>,

    pub video_extensions: Vec<String>,
}

impl Default for DialogSettings {
    fn default() -> Self {
        Self {
            backend: DialogBackend::default(),
            helper_program: None,
            helper_args: Vec::new(),
            video_extensions: ["mp4", "mkv", "avi", "mov", "wmv", "flv", "webm"]
                .into_iter()
                .map(String::from)
                .collect(),
        }
    }
}

/// Settings for the `ffprobe` metadata lookup shown before a comparison
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProbeSettings {
    pub enabled: bool,

    /// Bare executable name, searched like the comparison tool
    pub executable: String,

    /// Extra candidate paths tried before the built-in locations
    pub candidates: Vec<String>,

    /// Time limit for local files, in milliseconds
    pub timeout_ms: u64,

    /// Time limit for stream URLs, in milliseconds
    pub url_timeout_ms: u64,

    /// Extra attempts after a failed stream URL lookup
    pub url_retries: u32,
}

impl Default for ProbeSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            executable: if cfg!(target_os = "windows") {
                "ffprobe.exe".to_string()
            } else {
                "ffprobe".to_string()
            },
            candidates: Vec::new(),
            timeout_ms: 5_000,
            url_timeout_ms: 15_000,
            url_retries: 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    pub directory: String,

    /// File name prefix for the daily log files
    pub prefix: String,

    pub debug: bool,

    /// Mirror log output to the terminal
    pub console: bool,

    /// Write the log file as JSON lines instead of plain text
    pub json: bool,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            directory: "logs".to_string(),
            prefix: "video-compare-launcher".to_string(),
            debug: false,
            console: true,
            json: false,
        }
    }
}
