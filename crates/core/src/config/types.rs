use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::purge::DEFAULT_PURGE_INTERVAL;
use crate::ticket::DEFAULT_RETENTION_DAYS;

/// Root configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub retention: RetentionConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Where the ticket document lives
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StorageConfig {
    /// Directory holding the data file, created on first run
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
    #[serde(default = "default_file_name")]
    pub file_name: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            file_name: default_file_name(),
        }
    }
}

impl StorageConfig {
    /// Full path of the data file.
    pub fn data_file(&self) -> PathBuf {
        self.data_dir.join(&self.file_name)
    }
}

/// `~/Documents/ITRepairTracker`, or `ITRepairData` beside the executable
/// when no home directory is known.
pub fn default_data_dir() -> PathBuf {
    let home = std::env::var_os("HOME")
        .or_else(|| std::env::var_os("USERPROFILE"))
        .filter(|h| !h.is_empty());

    match home {
        Some(home) => PathBuf::from(home)
            .join("Documents")
            .join("ITRepairTracker"),
        None => std::env::current_exe()
            .ok()
            .and_then(|exe| exe.parent().map(|dir| dir.join("ITRepairData")))
            .unwrap_or_else(|| PathBuf::from("ITRepairData")),
    }
}

fn default_file_name() -> String {
    "repair_data.json".to_string()
}

/// Purge policy for repaired tickets
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RetentionConfig {
    /// Days a Repaired ticket is kept after its repair date
    #[serde(default = "default_repaired_days")]
    pub repaired_days: u32,
    /// Seconds between purge runs (default: one day)
    #[serde(default = "default_purge_interval_secs")]
    pub purge_interval_secs: u64,
}

impl Default for RetentionConfig {
    fn default() -> Self {
        Self {
            repaired_days: default_repaired_days(),
            purge_interval_secs: default_purge_interval_secs(),
        }
    }
}

impl RetentionConfig {
    pub fn purge_interval(&self) -> Duration {
        Duration::from_secs(self.purge_interval_secs)
    }
}

fn default_repaired_days() -> u32 {
    DEFAULT_RETENTION_DAYS
}

fn default_purge_interval_secs() -> u64 {
    DEFAULT_PURGE_INTERVAL.as_secs()
}

/// Log output settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    /// Default filter directive, overridden by `RUST_LOG`
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default)]
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
        }
    }
}

fn default_log_level() -> String {
    "warn".to_string()
}

#[derive(Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}
