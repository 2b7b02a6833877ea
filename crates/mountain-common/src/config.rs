//! Configuration model handed to the watch loop at startup.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::constants::{DEFAULT_MOUNT_ROOT, DEFAULT_WATCH_PATH};
use crate::error::{MountainError, Result};

/// Runtime configuration for a single watch session.
///
/// Built once by the binary (from flags and an optional JSON file) and
/// never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WatchConfig {
    /// Directory registered with the notification channel.
    pub watch_path: PathBuf,
    /// Emit per-event and per-outcome detail.
    pub verbose: bool,
    /// Whether discovered devices are actually mounted.
    pub mount_enabled: bool,
    /// Directory under which `<name>-mountain` mount points are created.
    pub mount_root: PathBuf,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            watch_path: PathBuf::from(DEFAULT_WATCH_PATH),
            verbose: false,
            mount_enabled: false,
            mount_root: PathBuf::from(DEFAULT_MOUNT_ROOT),
        }
    }
}

impl WatchConfig {
    /// Creates a configuration watching `watch_path` with everything else defaulted.
    #[must_use]
    pub fn new(watch_path: impl Into<PathBuf>) -> Self {
        Self {
            watch_path: watch_path.into(),
            ..Self::default()
        }
    }

    /// Loads a configuration from a JSON file.
    ///
    /// Missing fields fall back to their defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or is not valid JSON.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| MountainError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;
        Ok(serde_json::from_str(&raw)?)
    }

    /// Checks that the watch path names an existing directory.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the path is missing or not a directory.
    pub fn validate(&self) -> Result<()> {
        match std::fs::metadata(&self.watch_path) {
            Ok(meta) if meta.is_dir() => Ok(()),
            Ok(_) => Err(MountainError::Config {
                message: format!("{} is not a directory", self.watch_path.display()),
            }),
            Err(e) => Err(MountainError::Config {
                message: format!("cannot watch {}: {e}", self.watch_path.display()),
            }),
        }
    }

    /// Default `tracing` filter directive for this configuration.
    #[must_use]
    pub const fn log_level(&self) -> &'static str {
        if self.verbose { "debug" } else { "info" }
    }
}
