//! Video Compare Launcher
//!
//! Terminal front end for the selection and launch coordinators.
//!
//! # Overview
//!
//! The binary plays the part of a UI event loop. It never blocks on a dialog or
//! on the comparison tool; instead it ticks at a fixed frame rate and polls the
//! coordinators, the same way a GUI would once per frame.
//!
//! # Execution Flow
//!
//! 1. Load `launcher.yaml` (defaults → file → `VCL_*` environment)
//! 2. Initialize logging → `logs/video-compare-launcher.<date>`
//! 3. Create a multi-thread tokio runtime; dialogs and the tool run on its blocking pool
//! 4. Ask for the left and right videos (skipped for paths given on the command line)
//! 5. Show ffprobe stream information for each file (when enabled)
//! 6. Launch `video-compare` and wait for the report
//! 7. Log the metrics summary and shut the runtime down
//!
//! Ctrl-C abandons an open dialog, or stops waiting for a running comparison.
//!
//! # Usage
//!
//! ```text
//! video-compare-launcher [--init-config] [--left PATH] [--right PATH] [LEFT [RIGHT]]
//! ```

use anyhow::{Result, bail};
use camino::Utf8PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;
use video_compare_launcher::services::comparison::default_base_dirs;
use video_compare_launcher::services::{ComparisonRequest, VideoProber, picker_from_settings};
use video_compare_launcher::{
    APP_NAME, ConfigManager, LaunchCoordinator, LauncherConfig, Metrics, ProbeCoordinator,
    SelectionOutcome, SelectionPair, Slot, TaskCoordinator, VERSION,
};

/// Poll interval of the presentation loop (about 60 Hz)
const FRAME: Duration = Duration::from_millis(16);

/// Directory holding `launcher.yaml`
const CONFIG_DIR: &str = ".";

/// Exit code reported when the user interrupts with Ctrl-C
const INTERRUPTED: u8 = 130;

#[derive(Debug, Default)]
struct CliArgs {
    init_config: bool,
    help: bool,
    preset: SelectionPair,
}

const USAGE: &str = "[--init-config] [--left PATH] [--right PATH] [LEFT [RIGHT]]";

/// Parse command line arguments.
///
/// `--left` / `--right` fill a slot directly; bare paths fill the slots that
/// are still empty, left first.
fn parse_args(args: impl IntoIterator<Item = String>) -> Result<CliArgs> {
    let mut cli = CliArgs::default();
    let mut positional = Vec::new();
    let mut args = args.into_iter();

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--init-config" => cli.init_config = true,
            "-h" | "--help" => cli.help = true,
            "--left" | "--right" => {
                let slot: Slot = arg.trim_start_matches("--").parse()?;
                let Some(path) = args.next() else {
                    bail!("{} needs a path", arg);
                };
                cli.preset.apply(SelectionOutcome::chosen(slot, path));
            }
            flag if flag.starts_with('-') => bail!("Unknown option: {}", flag),
            _ => positional.push(Utf8PathBuf::from(arg)),
        }
    }

    let open_slots = cli.preset.missing();
    if positional.len() > open_slots.len() {
        bail!(
            "Expected at most {} video paths, got {}",
            open_slots.len(),
            positional.len()
        );
    }

    for (slot, path) in open_slots.into_iter().zip(positional) {
        cli.preset.apply(SelectionOutcome::chosen(slot, path));
    }

    Ok(cli)
}

fn main() -> Result<ExitCode> {
    let args = parse_args(std::env::args().skip(1))?;
    if args.help {
        println!("Usage: {} {}", APP_NAME, USAGE);
        return Ok(ExitCode::SUCCESS);
    }

    let config_manager = ConfigManager::new(CONFIG_DIR)?;
    if args.init_config && config_manager.write_default_if_missing()? {
        println!("Wrote default configuration to {}", config_manager.config_path());
    }
    let config = config_manager.load()?;

    let _log_guard = video_compare_launcher::logging::init_logging(&config.logging)?;

    tracing::info!("Starting {} v{}", APP_NAME, VERSION);

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .worker_threads(2)
        .thread_name("vcl-worker")
        .build()?;

    let metrics = Arc::new(Metrics::new());
    let result = runtime.block_on(run(
        &config,
        runtime.handle().clone(),
        Arc::clone(&metrics),
        args.preset,
    ));

    metrics.log_summary();

    // An abandoned dialog or a still-running comparison may keep a blocking
    // thread busy; do not wait for it.
    runtime.shutdown_timeout(Duration::from_secs(1));

    tracing::info!("Application shutdown complete");

    result.map_err(|e| {
        tracing::error!("Launcher error: {:#}", e);
        e
    })
}

async fn run(
    config: &LauncherConfig,
    runtime: Handle,
    metrics: Arc<Metrics>,
    mut selections: SelectionPair,
) -> Result<ExitCode> {
    let selector = TaskCoordinator::new(picker_from_settings(&config.dialog), runtime.clone())
        .with_extensions(config.dialog.video_extensions.clone())
        .with_metrics(Arc::clone(&metrics));
    let prober = ProbeCoordinator::new(
        VideoProber::from_settings(&config.probe, &default_base_dirs()),
        runtime.clone(),
    )
    .with_metrics(Arc::clone(&metrics));
    let launcher = LaunchCoordinator::from_settings(&config.compare, runtime)?
        .with_metrics(metrics);

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    let mut ticker = tokio::time::interval(FRAME);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    for slot in selections.missing() {
        if !selector.start(slot) {
            bail!("Could not start selection for {} slot", slot);
        }
        println!("Choose the {} video...", slot);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if let Some(outcome) = selector.poll() {
                        selections.apply(outcome);
                        break;
                    }
                }
                _ = &mut ctrl_c => {
                    let open = selector.in_flight_slot();
                    selector.cancel();
                    match open {
                        Some(slot) => println!("{} selection cancelled", slot_label(slot)),
                        None => println!("Selection cancelled"),
                    }
                    return Ok(ExitCode::from(INTERRUPTED));
                }
            }
        }

        match selections.get(slot) {
            Some(path) => println!("{}: {}", slot_label(slot), path),
            None => println!("{}: nothing selected", slot_label(slot)),
        }
    }

    let Some((left, right)) = selections.both() else {
        println!("Both videos are needed to run a comparison");
        return Ok(ExitCode::FAILURE);
    };

    if config.probe.enabled {
        for (slot, input) in [(Slot::Left, &left), (Slot::Right, &right)] {
            if !prober.start(slot, input.as_str()) {
                bail!("Could not start ffprobe for {} slot", slot);
            }

            let report = loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        if let Some(report) = prober.poll() {
                            break report;
                        }
                    }
                    _ = &mut ctrl_c => {
                        println!("Interrupted while reading stream information");
                        return Ok(ExitCode::from(INTERRUPTED));
                    }
                }
            };

            // Missing metadata never blocks the comparison itself
            match report.result {
                Ok(info) => print!("{} stream information:\n{}", slot_label(report.slot), info),
                Err(e) => println!("{}: no stream information ({})", slot_label(report.slot), e),
            }
        }
    }

    let request = ComparisonRequest::with_settings(left, right, &config.compare);
    if !launcher.launch(request) {
        bail!("Could not start video-compare");
    }
    println!("Running video-compare...");

    let report = loop {
        tokio::select! {
            _ = ticker.tick() => {
                if let Some(report) = launcher.poll() {
                    break report;
                }
            }
            _ = &mut ctrl_c => {
                println!("Stopped waiting; video-compare keeps running");
                return Ok(ExitCode::from(INTERRUPTED));
            }
        }
    };

    println!("{}", report.outcome.summary());
    Ok(if report.outcome.is_success() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

fn slot_label(slot: Slot) -> &'static str {
    match slot {
        Slot::Left => "Left",
        Slot::Right => "Right",
    }
}
