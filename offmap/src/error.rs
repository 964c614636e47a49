//! Crate-level error type.
//!
//! Each module has its own error enum. [`OffmapError`] collects them for
//! callers that drive several modules at once, such as the CLI.

use thiserror::Error;

use crate::config::ConfigError;
use crate::download::{DownloadError, TransportError};
use crate::engine::LoaderError;
use crate::resolver::ResolveError;
use crate::storage::StorageError;

/// Any error this crate can return.
#[derive(Debug, Error)]
pub enum OffmapError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Download(#[from] DownloadError),

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Resolve(#[from] ResolveError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Loader(#[from] LoaderError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl OffmapError {
    /// Whether storage capacity was the cause.
    pub fn is_quota(&self) -> bool {
        match self {
            OffmapError::Download(e) => e.is_quota(),
            OffmapError::Storage(e) => e.is_quota(),
            OffmapError::Resolve(ResolveError::Storage(e)) => e.is_quota(),
            OffmapError::Loader(LoaderError::Storage(e)) => e.is_quota(),
            _ => false,
        }
    }
}

/// Result alias using [`OffmapError`].
pub type Result<T> = std::result::Result<T, OffmapError>;
