//! Error types for downloads.

use thiserror::Error;

use super::http::TransportError;
use crate::storage::StorageError;

/// Result type for download operations.
pub type DownloadResult<T> = Result<T, DownloadError>;

/// Errors that can occur while downloading an archive.
#[derive(Debug, Error)]
pub enum DownloadError {
    /// The archive could not be fetched or reassembled.
    #[error("Download of {url} failed{}: {reason}", .status.map(|s| format!(" (HTTP {})", s)).unwrap_or_default())]
    DownloadFailed {
        url: String,
        status: Option<u16>,
        reason: String,
    },

    /// A style given by URL could not be fetched or parsed.
    #[error("Failed to fetch style from {url}: {reason}")]
    StyleFetchFailed { url: String, reason: String },

    /// Persisting the archive or style failed.
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// The caller cancelled the download.
    #[error("Download aborted")]
    Aborted,
}

impl DownloadError {
    pub(crate) fn failed(url: &str, reason: impl Into<String>) -> Self {
        Self::DownloadFailed {
            url: url.to_string(),
            status: None,
            reason: reason.into(),
        }
    }

    pub(crate) fn bad_status(url: &str, status: u16, reason: impl Into<String>) -> Self {
        Self::DownloadFailed {
            url: url.to_string(),
            status: Some(status),
            reason: reason.into(),
        }
    }

    /// Whether this failure is storage capacity exhaustion.
    pub fn is_quota(&self) -> bool {
        matches!(self, Self::Storage(e) if e.is_quota())
    }
}

impl From<TransportError> for DownloadError {
    fn from(e: TransportError) -> Self {
        Self::DownloadFailed {
            url: e.url,
            status: None,
            reason: e.reason,
        }
    }
}
