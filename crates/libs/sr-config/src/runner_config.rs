//! Core configuration types for scriptrun.

use std::{
    path::{Path, PathBuf},
    time::Duration,
};

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::prelude::*;

/// Shell used when the configuration does not name one.
pub const DEFAULT_SHELL: &str = "/bin/bash";
/// Live child processes allowed at once when not configured.
pub const DEFAULT_MAX_CONCURRENT_RUNS: usize = 4;
/// Delay between the graceful and the forceful termination signal.
pub const DEFAULT_KILL_GRACE_PERIOD_MS: u64 = 1000;

/// Storage settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserStorageConfig {
    /// Directory holding the script index, the sources and `.logs/`.
    pub root: Option<PathBuf>,
}

/// Process execution settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRunnerSettings {
    /// Shell that interprets resolved command lines.
    pub shell: Option<String>,
    /// Upper bound on concurrently running child processes.
    pub max_concurrent_runs: Option<usize>,
    /// Grace period before a stopped process is killed, in milliseconds.
    pub kill_grace_period_ms: Option<u64>,
}

/// User-provided configuration, usually loaded from a TOML file.
///
/// Every field is optional; [`RunnerConfig::from_user_config`] fills in defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserConfig {
    #[serde(default)]
    pub storage: UserStorageConfig,
    #[serde(default)]
    pub runner: UserRunnerSettings,
}

impl UserConfig {
    /// Load configuration from a TOML file.
    pub fn from_file(file_path: &Path) -> Result<Self> {
        info!("Loading configuration from {}", file_path.display());
        let contents = std::fs::read_to_string(file_path)?;
        Self::from_toml(&contents)
    }

    /// Parse configuration from TOML string.
    pub fn from_toml(value: &str) -> Result<Self> {
        Ok(toml::from_str(value)?)
    }

    /// Serialize configuration back to TOML.
    pub fn to_toml(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }
}

/// Resolved configuration used by the run manager.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunnerConfig {
    /// Storage root; runs are rejected while this is unset.
    pub storage_root: Option<PathBuf>,
    /// Shell that interprets resolved command lines.
    pub shell: String,
    /// Upper bound on concurrently running child processes, at least 1.
    pub max_concurrent_runs: usize,
    /// Delay between `SIGTERM` and `SIGKILL` when a run is stopped.
    pub kill_grace_period: Duration,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            storage_root: None,
            shell: String::from(DEFAULT_SHELL),
            max_concurrent_runs: DEFAULT_MAX_CONCURRENT_RUNS,
            kill_grace_period: Duration::from_millis(DEFAULT_KILL_GRACE_PERIOD_MS),
        }
    }
}

impl RunnerConfig {
    /// Convert user configuration to the resolved configuration.
    pub fn from_user_config(config: UserConfig) -> Self {
        let max_concurrent_runs = match config.runner.max_concurrent_runs {
            Some(0) => {
                warn!("max_concurrent_runs = 0 would block every run, using 1");
                1
            }
            Some(n) => n,
            None => DEFAULT_MAX_CONCURRENT_RUNS,
        };
        Self {
            storage_root: config.storage.root,
            shell: config
                .runner
                .shell
                .unwrap_or_else(|| String::from(DEFAULT_SHELL)),
            max_concurrent_runs,
            kill_grace_period: Duration::from_millis(
                config
                    .runner
                    .kill_grace_period_ms
                    .unwrap_or(DEFAULT_KILL_GRACE_PERIOD_MS),
            ),
        }
    }

    /// Replace the storage root.
    pub fn with_storage_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.storage_root = Some(root.into());
        self
    }
}
