use crate::models::LauncherConfig;
use anyhow::{Context, Result};
use camino::{Utf8Path, Utf8PathBuf};
use config::{Config, Environment, File, FileFormat, Map};
use std::fs;

/// File name of the launcher configuration inside the config directory
pub const CONFIG_FILE_NAME: &str = "launcher.yaml";

/// Default prefix for environment overrides, e.g. `VCL_COMPARE__WINDOW_SIZE`
pub const DEFAULT_ENV_PREFIX: &str = "VCL";

/// Loads and saves `launcher.yaml`.
///
/// Sources are layered, later ones winning:
/// 1. Built-in defaults ([`LauncherConfig::default`])
/// 2. `launcher.yaml` in the config directory, if present
/// 3. Environment variables `<PREFIX>_<SECTION>__<KEY>`
#[derive(Debug, Clone)]
pub struct ConfigManager {
    config_dir: Utf8PathBuf,
    config_path: Utf8PathBuf,
    env_prefix: String,

    /// Replaces the process environment when set
    env_source: Option<Map<String, String>>,
}

impl ConfigManager {
    /// Create a new ConfigManager, creating `config_dir` if needed.
    pub fn new<P: AsRef<Utf8Path>>(config_dir: P) -> Result<Self> {
        let config_dir = config_dir.as_ref().to_path_buf();

        if !config_dir.exists() {
            fs::create_dir_all(&config_dir)
                .with_context(|| format!("Failed to create config directory: {}", config_dir))?;
        }

        Ok(Self {
            config_path: config_dir.join(CONFIG_FILE_NAME),
            config_dir,
            env_prefix: DEFAULT_ENV_PREFIX.to_string(),
            env_source: None,
        })
    }

    pub fn with_env_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.env_prefix = prefix.into();
        self
    }

    /// Read overrides from `vars` instead of the process environment
    pub fn with_env_source(mut self, vars: Map<String, String>) -> Self {
        self.env_source = Some(vars);
        self
    }

    pub fn config_dir(&self) -> &Utf8Path {
        &self.config_dir
    }

    pub fn config_path(&self) -> &Utf8Path {
        &self.config_path
    }

    /// Load the layered configuration.
    ///
    /// A missing file is not an error; a malformed one is.
    pub fn load(&self) -> Result<LauncherConfig> {
        let defaults = Config::try_from(&LauncherConfig::default())
            .context("Failed to build default configuration")?;

        let file = File::from(self.config_path.as_std_path())
            .format(FileFormat::Yaml)
            .required(false);

        let environment = Environment::with_prefix(&self.env_prefix)
            .prefix_separator("_")
            .separator("__")
            .try_parsing(true)
            .source(self.env_source.clone());

        let config: LauncherConfig = Config::builder()
            .add_source(defaults)
            .add_source(file)
            .add_source(environment)
            .build()
            .with_context(|| format!("Failed to read config: {}", self.config_path))?
            .try_deserialize()
            .with_context(|| format!("Failed to parse config: {}", self.config_path))?;

        if self.config_path.exists() {
            tracing::info!("Loaded config from {}", self.config_path);
        } else {
            tracing::info!("Config file {} not found, using defaults", self.config_path);
        }

        Ok(config)
    }

    /// Save the configuration as YAML.
    pub fn save(&self, config: &LauncherConfig) -> Result<()> {
        let yaml_string =
            serde_yaml_ng::to_string(config).context("Failed to serialize config to YAML")?;

        fs::write(&self.config_path, yaml_string)
            .with_context(|| format!("Failed to write config: {}", self.config_path))?;

        tracing::info!("Saved config to {}", self.config_path);
        Ok(())
    }

    /// Seed `launcher.yaml` with the defaults. Returns true if a file was written.
    pub fn write_default_if_missing(&self) -> Result<bool> {
        if self.config_path.exists() {
            return Ok(false);
        }

        self.save(&LauncherConfig::default())?;
        Ok(true)
    }
}
