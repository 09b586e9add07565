//! Service configuration
//!
//! Command-line flags (each with a `SLUSH_*` environment fallback) override
//! the TOML file, which overrides built-in defaults.

use clap::Parser;
use slush_common::config::{resolve_root_folder, resolve_under, TomlConfig, ROOT_FOLDER_ENV};
use std::path::PathBuf;
use std::time::Duration;

/// Command-line arguments for slush-vaporizer
#[derive(Parser, Debug, Default, Clone)]
#[command(name = "slush-vaporizer")]
#[command(about = "Asynchronous audio vaporization service")]
#[command(version)]
pub struct Cli {
    /// TOML config file (default: platform config location)
    #[arg(short, long, env = "SLUSH_CONFIG")]
    pub config: Option<PathBuf>,

    /// Root folder for uploads, outputs and presets (env: SLUSH_ROOT_FOLDER)
    #[arg(short, long)]
    pub root_folder: Option<PathBuf>,

    /// Address to bind
    #[arg(long, env = "SLUSH_HOST")]
    pub host: Option<String>,

    /// Port to listen on
    #[arg(short, long, env = "SLUSH_PORT")]
    pub port: Option<u16>,

    /// SoX binary name or path
    #[arg(long, env = "SLUSH_SOX_BINARY")]
    pub sox_binary: Option<String>,

    /// Jobs allowed to run at once
    #[arg(long, env = "SLUSH_WORKER_SLOTS")]
    pub worker_slots: Option<usize>,

    /// Preset catalog file
    #[arg(long, env = "SLUSH_PRESETS")]
    pub presets: Option<PathBuf>,

    /// Log level used when RUST_LOG is unset
    #[arg(long, env = "SLUSH_LOG_LEVEL")]
    pub log_level: Option<String>,
}

/// Fully resolved settings
#[derive(Debug, Clone)]
pub struct ServiceSettings {
    pub root_folder: PathBuf,
    pub uploads_dir: PathBuf,
    pub outputs_dir: PathBuf,
    /// `None` means the built-in catalog
    pub presets_path: Option<PathBuf>,
    pub host: String,
    pub port: u16,
    pub sox_binary: String,
    pub worker_slots: usize,
    pub retention: Duration,
    pub sweep_interval: Duration,
    pub log_level: String,
}

impl ServiceSettings {
    pub fn resolve(cli: &Cli, toml: &TomlConfig) -> Self {
        let root_folder = resolve_root_folder(cli.root_folder.as_deref(), ROOT_FOLDER_ENV, toml);
        let (uploads_dir, outputs_dir) = toml.storage.resolve(&root_folder);
        let presets_path = cli
            .presets
            .clone()
            .or_else(|| toml.presets_path.clone())
            .map(|p| resolve_under(&root_folder, &p));

        Self {
            uploads_dir,
            outputs_dir,
            presets_path,
            host: cli.host.clone().unwrap_or_else(|| toml.server.host.clone()),
            port: cli.port.unwrap_or(toml.server.port),
            sox_binary: cli
                .sox_binary
                .clone()
                .unwrap_or_else(|| toml.sox_binary.clone()),
            worker_slots: cli.worker_slots.unwrap_or(toml.worker_slots).max(1),
            retention: Duration::from_secs(toml.retention.max_age_secs),
            sweep_interval: Duration::from_secs(toml.retention.sweep_interval_secs.max(1)),
            log_level: cli
                .log_level
                .clone()
                .unwrap_or_else(|| toml.logging.level.clone()),
            root_folder,
        }
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
