//! Command line definition and configuration resolution.

use std::path::PathBuf;

use clap::{ArgAction, Parser, ValueEnum};
use mountain_common::config::WatchConfig;
use mountain_common::error::Result;

/// mountain: watch a device directory and mount new disks.
#[derive(Parser, Debug)]
#[command(name = "mountain", version, about, long_about = None, disable_version_flag = true)]
pub struct Cli {
    /// Directory to watch for new device nodes (usually /dev).
    #[arg(env = "MOUNTAIN_WATCH_PATH", required_unless_present = "config")]
    pub path: Option<PathBuf>,

    /// Verbose output.
    #[arg(short = 'V', long)]
    pub verbose: bool,

    /// Automatically mount drives when found (requires root).
    #[arg(short, long)]
    pub mount: bool,

    /// Directory under which mount points are created.
    #[arg(long, value_name = "DIR")]
    pub mount_root: Option<PathBuf>,

    /// JSON configuration file; flags override its values.
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Log output format.
    #[arg(long, value_enum, default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,

    /// Show the version and exit.
    #[arg(short = 'v', long, action = ArgAction::Version)]
    pub version: (),
}

/// Formats accepted by `--log-format`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    /// Human-readable lines.
    Text,
    /// One JSON object per line.
    Json,
}

impl Cli {
    /// Builds the watch configuration from the optional file and the flags.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration file cannot be loaded.
    pub fn resolve_config(&self) -> Result<WatchConfig> {
        let mut config = match &self.config {
            Some(path) => WatchConfig::load(path)?,
            None => WatchConfig::default(),
        };
        if let Some(path) = &self.path {
            config.watch_path.clone_from(path);
        }
        if let Some(root) = &self.mount_root {
            config.mount_root.clone_from(root);
        }
        config.verbose |= self.verbose;
        config.mount_enabled |= self.mount;
        Ok(config)
    }
}
