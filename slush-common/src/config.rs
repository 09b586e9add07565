//! Configuration loading and root folder resolution
//!
//! Bootstrap configuration comes from a TOML file. Values resolve in this
//! priority order (highest first):
//! 1. Command-line argument
//! 2. Environment variable
//! 3. TOML config file
//! 4. OS-dependent compiled default

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Environment variable naming the root folder
pub const ROOT_FOLDER_ENV: &str = "SLUSH_ROOT_FOLDER";

/// Bootstrap configuration loaded from TOML file
///
/// These settings cannot change while the service runs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TomlConfig {
    /// Root folder for uploads, outputs and presets (optional)
    #[serde(default)]
    pub root_folder: Option<PathBuf>,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,

    /// HTTP listener
    #[serde(default)]
    pub server: ServerConfig,

    /// Upload and output directories
    #[serde(default)]
    pub storage: StorageConfig,

    /// Preset catalog file; relative paths resolve against the root folder
    #[serde(default)]
    pub presets_path: Option<PathBuf>,

    /// External processing tool binary
    #[serde(default = "default_sox_binary")]
    pub sox_binary: String,

    /// Number of jobs allowed to run at the same time
    #[serde(default = "default_worker_slots")]
    pub worker_slots: usize,

    /// Output artifact retention
    #[serde(default)]
    pub retention: RetentionConfig,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

/// HTTP listener configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

/// Storage directories (relative paths resolve against the root folder)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_uploads_dir")]
    pub uploads_dir: PathBuf,
    #[serde(default = "default_outputs_dir")]
    pub outputs_dir: PathBuf,
}

/// Output retention configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetentionConfig {
    /// Artifacts older than this are deleted by the sweeper
    #[serde(default = "default_max_age_secs")]
    pub max_age_secs: u64,
    /// Time between sweeps
    #[serde(default = "default_sweep_interval_secs")]
    pub sweep_interval_secs: u64,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    5000
}

fn default_uploads_dir() -> PathBuf {
    PathBuf::from("uploads")
}

fn default_outputs_dir() -> PathBuf {
    PathBuf::from("outputs")
}

fn default_sox_binary() -> String {
    "sox".to_string()
}

fn default_worker_slots() -> usize {
    2
}

fn default_max_age_secs() -> u64 {
    3600
}

fn default_sweep_interval_secs() -> u64 {
    3600
}

impl Default for TomlConfig {
    fn default() -> Self {
        Self {
            root_folder: None,
            logging: LoggingConfig::default(),
            server: ServerConfig::default(),
            storage: StorageConfig::default(),
            presets_path: None,
            sox_binary: default_sox_binary(),
            worker_slots: default_worker_slots(),
            retention: RetentionConfig::default(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            uploads_dir: default_uploads_dir(),
            outputs_dir: default_outputs_dir(),
        }
    }
}

impl Default for RetentionConfig {
    fn default() -> Self {
        Self {
            max_age_secs: default_max_age_secs(),
            sweep_interval_secs: default_sweep_interval_secs(),
        }
    }
}

impl StorageConfig {
    /// Resolve (uploads, outputs) against the root folder
    pub fn resolve(&self, root_folder: &Path) -> (PathBuf, PathBuf) {
        (
            resolve_under(root_folder, &self.uploads_dir),
            resolve_under(root_folder, &self.outputs_dir),
        )
    }
}

/// Join `path` onto `root` unless it is already absolute
pub fn resolve_under(root: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        root.join(path)
    }
}

/// Root folder resolution
///
/// 1. Command-line argument (highest priority)
/// 2. Environment variable
/// 3. TOML config file
/// 4. OS-dependent compiled default (fallback)
pub fn resolve_root_folder(
    cli_arg: Option<&Path>,
    env_var_name: &str,
    toml_config: &TomlConfig,
) -> PathBuf {
    if let Some(path) = cli_arg {
        return path.to_path_buf();
    }

    if let Ok(path) = std::env::var(env_var_name) {
        if !path.trim().is_empty() {
            return PathBuf::from(path);
        }
    }

    if let Some(path) = &toml_config.root_folder {
        return path.clone();
    }

    get_default_root_folder()
}

/// Locate the platform config file, if one exists
///
/// Linux checks `~/.config/slushwave/config.toml`, then
/// `/etc/slushwave/config.toml`.
pub fn find_config_file() -> Option<PathBuf> {
    let user_config = dirs::config_dir().map(|d| d.join("slushwave").join("config.toml"));
    if let Some(path) = user_config {
        if path.exists() {
            return Some(path);
        }
    }

    if cfg!(target_os = "linux") {
        let system_config = PathBuf::from("/etc/slushwave/config.toml");
        if system_config.exists() {
            return Some(system_config);
        }
    }

    None
}

/// Read and parse a TOML config file
pub fn load_toml_config(path: &Path) -> Result<TomlConfig> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("Read TOML failed ({}): {}", path.display(), e)))?;
    let config = toml::from_str(&content)?;
    debug!(path = %path.display(), "Loaded TOML config");
    Ok(config)
}

/// Load the TOML config from an explicit path or the platform location
///
/// A missing file yields the defaults; an unreadable or malformed file is an error.
pub fn load_or_default(explicit: Option<&Path>) -> Result<TomlConfig> {
    match explicit {
        Some(path) => load_toml_config(path),
        None => match find_config_file() {
            Some(path) => load_toml_config(&path),
            None => {
                debug!("No config file found, using built-in defaults");
                Ok(TomlConfig::default())
            }
        },
    }
}

/// Write TOML config atomically (temp file + rename)
pub fn write_toml_config(config: &TomlConfig, path: &Path) -> Result<()> {
    let content = toml::to_string_pretty(config)?;

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let tmp_path = path.with_extension("toml.tmp");
    std::fs::write(&tmp_path, content)?;
    if let Err(e) = std::fs::rename(&tmp_path, path) {
        warn!(path = %path.display(), error = %e, "Atomic rename of TOML config failed");
        let _ = std::fs::remove_file(&tmp_path);
        return Err(e.into());
    }

    Ok(())
}

/// Get OS-dependent default root folder path
fn get_default_root_folder() -> PathBuf {
    if cfg!(target_os = "linux") {
        // ~/.local/share/slushwave (or /var/lib/slushwave for system-wide)
        dirs::data_local_dir()
            .map(|d| d.join("slushwave"))
            .unwrap_or_else(|| PathBuf::from("/var/lib/slushwave"))
    } else if cfg!(target_os = "macos") {
        dirs::data_dir()
            .map(|d| d.join("slushwave"))
            .unwrap_or_else(|| PathBuf::from("/Library/Application Support/slushwave"))
    } else if cfg!(target_os = "windows") {
        dirs::data_local_dir()
            .map(|d| d.join("slushwave"))
            .unwrap_or_else(|| PathBuf::from("C:\\ProgramData\\slushwave"))
    } else {
        PathBuf::from("./slushwave_data")
    }
}
