//! Error types for protocol resolution.

use thiserror::Error;

use crate::archive::ArchiveError;
use crate::storage::StorageError;

/// Errors that can occur while resolving a custom-scheme request.
#[derive(Debug, Error)]
pub enum ResolveError {
    /// No archive is stored under the requested name.
    #[error("Archive '{name}' not found")]
    NotFound { name: String },

    /// The request was cancelled before it completed.
    #[error("Request aborted")]
    Aborted,

    /// The URL does not have a supported shape.
    #[error("Unsupported request: {0}")]
    UnsupportedRequest(String),

    #[error(transparent)]
    Archive(#[from] ArchiveError),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl ResolveError {
    pub fn is_aborted(&self) -> bool {
        matches!(self, Self::Aborted)
    }
}
