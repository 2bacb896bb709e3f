use crate::models::LoggingSettings;
use anyhow::{Context, Result};
use camino::Utf8PathBuf;
use std::fs;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling;
use tracing::Subscriber;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::{EnvFilter, Layer, layer::SubscriberExt, util::SubscriberInitExt};

/// Setup logging with a daily rotating log file and optional console output.
///
/// `RUST_LOG` overrides the level chosen by `settings.debug`.
///
/// # Returns
/// A guard that must be held for the duration of the program to keep logging active
pub fn init_logging(settings: &LoggingSettings) -> Result<WorkerGuard> {
    let log_dir = ensure_log_dir(&settings.directory)?;

    let file_appender = rolling::daily(&log_dir, &settings.prefix);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let console_layer = settings.console.then(|| {
        tracing_subscriber::fmt::layer()
            .with_ansi(true)
            .with_target(false)
    });

    tracing_subscriber::registry()
        .with(log_filter(settings.debug))
        .with(file_layer(settings.json, non_blocking))
        .with(console_layer)
        .try_init()
        .context("Logging was already initialized")?;

    tracing::info!(
        "Logging initialized: dir={}, prefix={}, debug={}, console={}, json={}",
        log_dir,
        settings.prefix,
        settings.debug,
        settings.console,
        settings.json
    );

    Ok(guard)
}

/// File output layer: plain text, or one JSON object per line when `json` is set
fn file_layer<S, W>(json: bool, writer: W) -> Box<dyn Layer<S> + Send + Sync>
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    let layer = tracing_subscriber::fmt::layer()
        .with_writer(writer)
        .with_ansi(false) // No ANSI codes in log files
        .with_target(true)
        .with_thread_ids(true)
        .with_thread_names(true)
        .with_file(true)
        .with_line_number(true);

    if json {
        layer.json().boxed()
    } else {
        layer.boxed()
    }
}

fn ensure_log_dir(dir: &str) -> Result<Utf8PathBuf> {
    let log_dir = Utf8PathBuf::from(dir);
    if !log_dir.exists() {
        fs::create_dir_all(&log_dir)
            .with_context(|| format!("Failed to create log directory: {}", log_dir))?;
    }
    Ok(log_dir)
}

fn log_filter(debug_mode: bool) -> EnvFilter {
    let default_level = if debug_mode { "debug" } else { "info" };
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level))
}
