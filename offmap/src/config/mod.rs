//! User configuration.
//!
//! Settings live in `~/.offmap/config.ini`:
//!
//! ```ini
//! [storage]
//! directory = ~/.offmap/store
//! quota = 2GB
//!
//! [download]
//! timeout_secs = 300
//! chunk_size = 8MB
//! user_agent = offmap/0.1.0
//!
//! [logging]
//! directory = ~/.offmap/logs
//! file = offmap.log
//! ```
//!
//! A missing file or key falls back to the defaults in [`settings`].

mod file;
mod parser;
pub mod settings;
mod size;

pub use file::ConfigError;
pub use settings::{
    config_directory, config_file_path, ConfigFile, DownloadSettings, LoggingSettings,
    StorageSettings,
};
pub use size::{format_bytes, format_size, parse_size, SizeParseError};
