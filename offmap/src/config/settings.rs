//! Settings structs for `config.ini`.

use std::path::PathBuf;
use std::time::Duration;

use crate::download::{DEFAULT_TIMEOUT_SECS, DEFAULT_USER_AGENT};

/// Name of the configuration directory under the home directory.
pub const CONFIG_DIR_NAME: &str = ".offmap";

/// Default log file name.
pub const DEFAULT_LOG_FILE: &str = "offmap.log";

/// Root for everything this crate writes (`~/.offmap`).
pub fn config_directory() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(CONFIG_DIR_NAME)
}

/// Default path of the configuration file (`~/.offmap/config.ini`).
pub fn config_file_path() -> PathBuf {
    config_directory().join("config.ini")
}

/// `[storage]` section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageSettings {
    /// Root of the on-disk archive store.
    pub directory: PathBuf,
    /// Byte limit for stored archives and styles. `None` means unlimited.
    pub quota: Option<u64>,
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            directory: config_directory().join("store"),
            quota: None,
        }
    }
}

/// `[download]` section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadSettings {
    pub timeout_secs: u64,
    /// Bytes per range request. `None` lets the server decide.
    pub chunk_size: Option<u64>,
    pub user_agent: String,
}

impl DownloadSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for DownloadSettings {
    fn default() -> Self {
        Self {
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            chunk_size: None,
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

/// `[logging]` section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggingSettings {
    pub directory: PathBuf,
    pub file: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            directory: config_directory().join("logs"),
            file: DEFAULT_LOG_FILE.to_string(),
        }
    }
}

/// Full contents of `config.ini`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigFile {
    pub storage: StorageSettings,
    pub download: DownloadSettings,
    pub logging: LoggingSettings,
}
