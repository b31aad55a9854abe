//! Application configuration for configforge.
//!
//! User config lives at `~/.configforge/configforge.toml`.
//! CLI flags override config file values, which override defaults.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{ConfigForgeError, Result};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "configforge.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".configforge";

// ---------------------------------------------------------------------------
// Config structs (matching configforge.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Build loop settings.
    #[serde(default)]
    pub build: BuildConfig,

    /// Source-of-truth API settings.
    #[serde(default)]
    pub source: SourceConfig,
}

/// `[build]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildConfig {
    /// Seconds between build cycles when no trigger fires.
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,

    /// If true, any precompute failure aborts the whole cycle.
    #[serde(default)]
    pub all_devices_must_build: bool,

    /// Bounded capacity of the per-cycle report channel. Sized so a burst
    /// of concurrent per-device failures does not stall compute tasks.
    #[serde(default = "default_report_channel_capacity")]
    pub report_channel_capacity: usize,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_interval_secs(),
            all_devices_must_build: false,
            report_channel_capacity: default_report_channel_capacity(),
        }
    }
}

impl BuildConfig {
    /// The inter-cycle interval as a `Duration`.
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }
}

fn default_interval_secs() -> u64 {
    300
}
fn default_report_channel_capacity() -> usize {
    512
}

/// `[source]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    /// Base URL of the source-of-truth API.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Name of the env var holding the API token (never store the token itself).
    #[serde(default = "default_token_env")]
    pub token_env: String,

    /// Per-request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            token_env: default_token_env(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_base_url() -> String {
    "http://localhost:8080/api".into()
}
fn default_token_env() -> String {
    "CONFIGFORGE_SOURCE_TOKEN".into()
}
fn default_timeout_secs() -> u64 {
    30
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.configforge/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| ConfigForgeError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.configforge/configforge.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigForgeError::io(path, e))?;

    toml::from_str(&content).map_err(|e| {
        ConfigForgeError::config(format!("failed to parse {}: {e}", path.display()))
    })
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| ConfigForgeError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| ConfigForgeError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| ConfigForgeError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}
