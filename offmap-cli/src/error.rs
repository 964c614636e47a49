//! CLI error handling with user-facing messages.

use std::fmt;
use std::path::PathBuf;
use std::process;

use offmap::config::ConfigError;
use offmap::download::{DownloadError, TransportError};
use offmap::engine::LoaderError;
use offmap::resolver::ResolveError;
use offmap::storage::StorageError;
use offmap::OffmapError;

/// Errors surfaced to the user. Every one exits with code 1.
#[derive(Debug)]
pub enum CliError {
    /// Failed to initialize logging
    LoggingInit(String),
    /// Configuration could not be loaded
    Config(ConfigError),
    /// Failed to create the Tokio runtime
    Runtime(String),
    /// A library operation failed
    Offmap(OffmapError),
    /// The named archive or tile does not exist
    NotFound(String),
    /// Failed to write an output file
    FileWrite { path: PathBuf, error: std::io::Error },
}

impl CliError {
    /// Print the error and exit the process.
    pub fn exit(&self) -> ! {
        eprintln!("Error: {}", self);

        match self {
            CliError::Offmap(e) if e.is_quota() => {
                eprintln!();
                eprintln!("Storage is full. Free space with 'offmap delete <name>' or raise");
                eprintln!("the quota in the [storage] section of the config file.");
            }
            CliError::Config(_) => {
                eprintln!();
                eprintln!("Check the file shown by 'offmap config path'.");
            }
            _ => {}
        }

        process::exit(1)
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::LoggingInit(msg) => write!(f, "Failed to initialize logging: {}", msg),
            CliError::Config(e) => write!(f, "Configuration error: {}", e),
            CliError::Runtime(msg) => write!(f, "Failed to create Tokio runtime: {}", msg),
            CliError::Offmap(e) => write!(f, "{}", e),
            CliError::NotFound(what) => write!(f, "{} not found", what),
            CliError::FileWrite { path, error } => {
                write!(f, "Failed to write file '{}': {}", path.display(), error)
            }
        }
    }
}

impl std::error::Error for CliError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CliError::Config(e) => Some(e),
            CliError::Offmap(e) => Some(e),
            CliError::FileWrite { error, .. } => Some(error),
            _ => None,
        }
    }
}

impl From<ConfigError> for CliError {
    fn from(e: ConfigError) -> Self {
        CliError::Config(e)
    }
}

impl From<OffmapError> for CliError {
    fn from(e: OffmapError) -> Self {
        CliError::Offmap(e)
    }
}

/// Library errors that reach the CLI through [`OffmapError`].
macro_rules! via_offmap_error {
    ($($ty:ty),* $(,)?) => {
        $(
            impl From<$ty> for CliError {
                fn from(e: $ty) -> Self {
                    CliError::Offmap(e.into())
                }
            }
        )*
    };
}

via_offmap_error!(DownloadError, TransportError, ResolveError, StorageError, LoaderError);
