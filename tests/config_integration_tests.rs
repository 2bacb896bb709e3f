//! Integration tests for ConfigManager and the settings-driven constructors

use camino::Utf8PathBuf;
use config::Map;
use std::fs;
use tempfile::TempDir;
use video_compare_launcher::models::DialogBackend;
use video_compare_launcher::services::comparison::window_from_settings;
use video_compare_launcher::services::{ComparisonRequest, WindowSize, build_arguments};
use video_compare_launcher::{ConfigManager, LaunchCoordinator, LauncherConfig};

fn manager_in(dir: &TempDir) -> ConfigManager {
    let path = Utf8PathBuf::try_from(dir.path().to_path_buf()).unwrap();
    ConfigManager::new(path).unwrap().with_env_source(Map::new())
}

#[test]
fn test_full_config_file() {
    let temp_dir = TempDir::new().unwrap();
    let manager = manager_in(&temp_dir);

    fs::write(
        manager.config_path(),
        r#"
compare:
  executable: video-compare
  candidates:
    - /opt/video-compare/video-compare
  window_size: 1920x1080
  log_file: /tmp/vc.log
  mode: vstack
  extra_args: ["--high-dpi"]
dialog:
  backend: helper
  helper_program: kdialog
  helper_args: ["--getopenfilename", ".", "{extensions}"]
  video_extensions: [mp4, mkv]
logging:
  directory: /tmp/vcl-logs
  prefix: vcl
  debug: true
  console: false
  json: true
"#,
    )
    .unwrap();

    let config = manager.load().unwrap();

    assert_eq!(config.compare.candidates, vec!["/opt/video-compare/video-compare".to_string()]);
    assert_eq!(window_from_settings(&config.compare), Ok(Some(WindowSize::new(1920, 1080))));
    assert_eq!(config.dialog.backend, DialogBackend::Helper);
    assert_eq!(config.dialog.helper_program.as_deref(), Some("kdialog"));
    assert_eq!(config.dialog.video_extensions, vec!["mp4".to_string(), "mkv".to_string()]);
    assert!(config.logging.debug);
    assert!(config.logging.json);
    assert!(!config.logging.console);
}

#[test]
fn test_config_drives_arguments() {
    let temp_dir = TempDir::new().unwrap();
    let manager = manager_in(&temp_dir);
    fs::write(
        manager.config_path(),
        "compare:\n  window_size: \"\"\n  mode: hstack\n",
    )
    .unwrap();

    let config = manager.load().unwrap();
    let request = ComparisonRequest::with_settings("l.mp4", "r.mp4", &config.compare);
    let window = window_from_settings(&config.compare).unwrap();

    assert_eq!(
        build_arguments(&request, window),
        vec!["-m", "hstack", "--window-fit-display", "l.mp4", "r.mp4"]
    );
}

#[test]
fn test_environment_beats_file() {
    let temp_dir = TempDir::new().unwrap();
    let manager = manager_in(&temp_dir);
    fs::write(manager.config_path(), "compare:\n  window_size: 640x480\n").unwrap();

    let mut vars = Map::new();
    vars.insert("VCL_COMPARE__WINDOW_SIZE".to_string(), "800x600".to_string());
    let config = manager.with_env_source(vars).load().unwrap();

    assert_eq!(config.compare.window_size.as_deref(), Some("800x600"));
}

#[test]
fn test_seeded_file_round_trips() {
    let temp_dir = TempDir::new().unwrap();
    let manager = manager_in(&temp_dir);

    assert!(manager.write_default_if_missing().unwrap());

    let yaml = fs::read_to_string(manager.config_path()).unwrap();
    assert!(yaml.contains("window_size"));
    assert_eq!(manager.load().unwrap(), LauncherConfig::default());
}

#[test]
fn test_launch_coordinator_from_loaded_config() {
    let temp_dir = TempDir::new().unwrap();
    let manager = manager_in(&temp_dir);
    fs::write(
        manager.config_path(),
        "compare:\n  candidates: [/custom/vc]\n  log_file: /tmp/custom.log\n",
    )
    .unwrap();
    let config = manager.load().unwrap();

    let runtime = tokio::runtime::Runtime::new().unwrap();
    let launcher = LaunchCoordinator::from_settings(&config.compare, runtime.handle().clone()).unwrap();

    assert_eq!(launcher.candidates()[0], Utf8PathBuf::from("/custom/vc"));
    assert_eq!(launcher.log_path(), "/tmp/custom.log");
    assert!(!launcher.is_running());
}
