use crate::models::ProbeSettings;
use crate::services::comparison::{default_candidates, is_stream_url};
use crate::services::process::resolve_executable;
use camino::{Utf8Path, Utf8PathBuf};
use serde::Deserialize;
use std::fmt;
use std::process::Stdio;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::process::Command;
use tokio::time::timeout;

/// Placeholder for fields ffprobe did not report
const UNKNOWN: &str = "unknown";

/// Probe-specific errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProbeError {
    #[error("Video file does not exist: {0}")]
    MissingInput(String),

    #[error("ffprobe executable not found")]
    ToolMissing,

    #[error("Failed to start ffprobe: {0}")]
    Spawn(String),

    #[error("ffprobe timed out after {0:?}")]
    Timeout(Duration),

    #[error("ffprobe failed with exit code {code:?}: {stderr}")]
    Failed { code: Option<i32>, stderr: String },

    #[error("Failed to parse ffprobe output: {0}")]
    Parse(String),

    #[error("Probe stopped before finishing")]
    Interrupted,
}

/// Container-level information
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormatSummary {
    /// Seconds, as ffprobe prints them
    pub duration: Option<String>,
    /// Bytes
    pub size: Option<String>,
    pub bit_rate: Option<String>,
    pub format_name: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VideoStreamSummary {
    pub codec: Option<String>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    /// Rational frame rate such as `30000/1001`
    pub frame_rate: Option<String>,
    pub bit_rate: Option<String>,
    pub pixel_format: Option<String>,
    /// `color_space`, or `color_primaries` when the former is absent
    pub color_space: Option<String>,
}

impl VideoStreamSummary {
    /// `WIDTHxHEIGHT`, with `?` for a missing dimension
    pub fn resolution(&self) -> String {
        let dim = |value: Option<u32>| value.map_or_else(|| "?".to_string(), |v| v.to_string());
        format!("{}x{}", dim(self.width), dim(self.height))
    }

    /// Pixel format for display. Plain `yuv420p` is limited range.
    pub fn pixel_format_label(&self) -> String {
        match self.pixel_format.as_deref() {
            Some("yuv420p") => "yuv420p (tv)".to_string(),
            Some(format) => format.to_string(),
            None => UNKNOWN.to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AudioStreamSummary {
    pub codec: Option<String>,
    pub channels: Option<u32>,
    pub sample_rate: Option<String>,
    pub language: Option<String>,
}

/// What ffprobe reported about one input
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VideoInfo {
    pub format: FormatSummary,
    pub video_streams: Vec<VideoStreamSummary>,
    pub audio_streams: Vec<AudioStreamSummary>,
}

fn or_unknown(value: &Option<String>) -> &str {
    value.as_deref().unwrap_or(UNKNOWN)
}

impl fmt::Display for VideoInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "format {} | duration {}s | size {} bytes | bit rate {}",
            or_unknown(&self.format.format_name),
            or_unknown(&self.format.duration),
            or_unknown(&self.format.size),
            or_unknown(&self.format.bit_rate)
        )?;

        for (index, stream) in self.video_streams.iter().enumerate() {
            writeln!(
                f,
                "  video #{index}: {} {} @ {} fps | {} | {} | bit rate {}",
                or_unknown(&stream.codec),
                stream.resolution(),
                or_unknown(&stream.frame_rate),
                stream.pixel_format_label(),
                or_unknown(&stream.color_space),
                or_unknown(&stream.bit_rate)
            )?;
        }

        for (index, stream) in self.audio_streams.iter().enumerate() {
            let channels = stream
                .channels
                .map_or_else(|| UNKNOWN.to_string(), |c| c.to_string());
            writeln!(
                f,
                "  audio #{index}: {} | {} channels | {} Hz | {}",
                or_unknown(&stream.codec),
                channels,
                or_unknown(&stream.sample_rate),
                or_unknown(&stream.language)
            )?;
        }

        Ok(())
    }
}

// Subset of `ffprobe -print_format json -show_format -show_streams`

#[derive(Deserialize)]
struct RawOutput {
    #[serde(default)]
    format: RawFormat,
    #[serde(default)]
    streams: Vec<RawStream>,
}

#[derive(Deserialize, Default)]
struct RawFormat {
    duration: Option<String>,
    size: Option<String>,
    bit_rate: Option<String>,
    format_name: Option<String>,
}

#[derive(Deserialize)]
struct RawStream {
    codec_type: Option<String>,
    codec_name: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
    r_frame_rate: Option<String>,
    bit_rate: Option<String>,
    pix_fmt: Option<String>,
    color_space: Option<String>,
    color_primaries: Option<String>,
    channels: Option<u32>,
    sample_rate: Option<String>,
    #[serde(default)]
    tags: RawTags,
}

#[derive(Deserialize, Default)]
struct RawTags {
    language: Option<String>,
}

/// Parse ffprobe's JSON output into a [`VideoInfo`].
///
/// Streams other than video and audio (subtitles, data) are skipped.
pub fn parse_probe_output(stdout: &[u8]) -> Result<VideoInfo, ProbeError> {
    let raw: RawOutput =
        serde_json::from_slice(stdout).map_err(|e| ProbeError::Parse(e.to_string()))?;

    let mut info = VideoInfo {
        format: FormatSummary {
            duration: raw.format.duration,
            size: raw.format.size,
            bit_rate: raw.format.bit_rate,
            format_name: raw.format.format_name,
        },
        ..VideoInfo::default()
    };

    for stream in raw.streams {
        match stream.codec_type.as_deref() {
            Some("video") => info.video_streams.push(VideoStreamSummary {
                codec: stream.codec_name,
                width: stream.width,
                height: stream.height,
                frame_rate: stream.r_frame_rate,
                bit_rate: stream.bit_rate,
                pixel_format: stream.pix_fmt,
                color_space: stream.color_space.or(stream.color_primaries),
            }),
            Some("audio") => info.audio_streams.push(AudioStreamSummary {
                codec: stream.codec_name,
                channels: stream.channels,
                sample_rate: stream.sample_rate,
                language: stream.tags.language,
            }),
            _ => {}
        }
    }

    Ok(info)
}

/// ffprobe arguments for one input. Stream URLs get a bounded analysis window.
pub fn probe_arguments(input: &str) -> Vec<String> {
    let mut args: Vec<String> = [
        "-v",
        "quiet",
        "-print_format",
        "json",
        "-show_format",
        "-show_streams",
    ]
    .into_iter()
    .map(String::from)
    .collect();

    if is_stream_url(input) {
        // 10 seconds / 10 MB
        args.extend(
            ["-analyzeduration", "10000000", "-probesize", "10000000"]
                .into_iter()
                .map(String::from),
        );
    }

    args.push(input.to_string());
    args
}

/// Reads stream metadata through `ffprobe`
#[derive(Debug, Clone)]
pub struct VideoProber {
    /// Executable locations, tried in order
    candidates: Vec<Utf8PathBuf>,

    /// Limit for local files
    timeout: Duration,

    /// Limit for stream URLs
    url_timeout: Duration,

    /// Extra attempts for stream URLs
    url_retries: u32,
}

impl VideoProber {
    pub fn new(candidates: Vec<Utf8PathBuf>) -> Self {
        let defaults = ProbeSettings::default();
        Self {
            candidates,
            timeout: Duration::from_millis(defaults.timeout_ms),
            url_timeout: Duration::from_millis(defaults.url_timeout_ms),
            url_retries: defaults.url_retries,
        }
    }

    /// Build from the `probe` section: explicit candidates first, then the
    /// bundled locations under `base_dirs`
    pub fn from_settings(settings: &ProbeSettings, base_dirs: &[Utf8PathBuf]) -> Self {
        let mut candidates: Vec<Utf8PathBuf> = settings
            .candidates
            .iter()
            .filter(|candidate| !candidate.trim().is_empty())
            .map(Utf8PathBuf::from)
            .collect();
        candidates.extend(default_candidates(&settings.executable, base_dirs));

        Self {
            candidates,
            timeout: Duration::from_millis(settings.timeout_ms),
            url_timeout: Duration::from_millis(settings.url_timeout_ms),
            url_retries: settings.url_retries,
        }
    }

    pub fn with_timeouts(mut self, local: Duration, url: Duration) -> Self {
        self.timeout = local;
        self.url_timeout = url;
        self
    }

    pub fn with_url_retries(mut self, retries: u32) -> Self {
        self.url_retries = retries;
        self
    }

    pub fn candidates(&self) -> &[Utf8PathBuf] {
        &self.candidates
    }

    /// Probe a local file or stream URL.
    ///
    /// Local files must exist. A run that exceeds its time limit is killed.
    /// Failed stream URL lookups are retried `url_retries` times; local files
    /// get a single attempt.
    pub async fn probe(&self, input: &str) -> Result<VideoInfo, ProbeError> {
        let is_url = is_stream_url(input);
        if !is_url && !Utf8Path::new(input).exists() {
            return Err(ProbeError::MissingInput(input.to_string()));
        }

        let executable = resolve_executable(&self.candidates).ok_or(ProbeError::ToolMissing)?;
        let (limit, retries) = if is_url {
            (self.url_timeout, self.url_retries)
        } else {
            (self.timeout, 0)
        };

        let mut attempt = 0;
        loop {
            match self.probe_once(&executable, input, limit).await {
                Ok(info) => return Ok(info),
                Err(e) if attempt < retries => {
                    attempt += 1;
                    tracing::warn!("Probe of {} failed ({}); retry {}/{}", input, e, attempt, retries);
                }
                Err(e) => {
                    tracing::warn!("Probe of {} failed: {}", input, e);
                    return Err(e);
                }
            }
        }
    }

    async fn probe_once(
        &self,
        executable: &Utf8Path,
        input: &str,
        limit: Duration,
    ) -> Result<VideoInfo, ProbeError> {
        let args = probe_arguments(input);
        tracing::debug!("Executing: {} {:?}", executable, args);
        let start = Instant::now();

        let child = Command::new(executable.as_std_path())
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| ProbeError::Spawn(e.to_string()))?;

        // Dropping the wait future on timeout drops the child, which kills it
        let output = timeout(limit, child.wait_with_output())
            .await
            .map_err(|_| ProbeError::Timeout(limit))?
            .map_err(|e| ProbeError::Spawn(e.to_string()))?;

        tracing::debug!(
            "ffprobe finished in {:.2}s with {}",
            start.elapsed().as_secs_f32(),
            output.status
        );

        if !output.status.success() {
            return Err(ProbeError::Failed {
                code: output.status.code(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        parse_probe_output(&output.stdout)
    }
}
