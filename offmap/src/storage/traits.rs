//! Core traits for the archive store.
//!
//! The `ArchiveStore` trait is the storage gateway: keyed put/get/delete for
//! archive blobs and style documents, plus enumeration and usage estimation.
//! Both tables are keyed by archive name; pairing an archive with its style
//! is a caller convention, nothing here couples the two writes.
//!
//! # Design Principles
//!
//! - **String keys**: Archive names are human-readable and double as the
//!   custom-scheme host part
//! - **Bytes values**: Archives are opaque blobs, shared without copying
//! - **Dyn-compatible**: Uses `Pin<Box<dyn Future>>` so stores can be held as
//!   `Arc<dyn ArchiveStore>`

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::archive::{BlobSource, ByteRangeSource};
use crate::style::StyleDocument;

/// Boxed future type for dyn-compatible async methods.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Errors that can occur during store operations.
#[derive(Debug, Error)]
pub enum StorageError {
    /// I/O error while reading or writing a record.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A record could not be encoded or decoded.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Writing the record would exceed the storage quota.
    #[error("Storage quota exceeded: need {requested} bytes, {available} available")]
    QuotaExceeded { requested: u64, available: u64 },

    /// The record name cannot be stored or addressed.
    #[error("Invalid record name '{0}'")]
    InvalidName(String),
}

impl StorageError {
    /// Whether this error means storage capacity is exhausted.
    pub fn is_quota(&self) -> bool {
        match self {
            StorageError::QuotaExceeded { .. } => true,
            StorageError::Io(e) => matches!(
                e.kind(),
                std::io::ErrorKind::StorageFull | std::io::ErrorKind::QuotaExceeded
            ),
            _ => false,
        }
    }
}

/// A stored archive.
#[derive(Debug, Clone, PartialEq)]
pub struct ArchiveRecord {
    pub name: String,
    pub data: Bytes,
    pub created_at: DateTime<Utc>,
}

/// A stored style document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StyleRecord {
    pub name: String,
    pub style: StyleDocument,
    pub created_at: DateTime<Utc>,
}

/// Listing entry for a stored archive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArchiveSummary {
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub size_bytes: u64,
}

/// Raw usage figures reported by a store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StorageEstimate {
    pub used: u64,
    pub quota: u64,
}

/// Check that a name can be stored and later addressed by the custom scheme.
pub fn validate_name(name: &str) -> Result<(), StorageError> {
    if name.is_empty() || name.contains('/') {
        return Err(StorageError::InvalidName(name.to_string()));
    }
    Ok(())
}

/// Storage gateway for archives and their styles.
///
/// Every put stamps the record with the current time and replaces any
/// existing record of the same name wholesale.
///
/// # Thread Safety
///
/// All implementations must be `Send + Sync`. Concurrent writes to one name
/// are not coordinated: the last write wins.
pub trait ArchiveStore: Send + Sync {
    /// Store an archive blob under `name`.
    fn put_archive(&self, name: &str, data: Bytes) -> BoxFuture<'_, Result<(), StorageError>>;

    /// Retrieve an archive.
    ///
    /// # Returns
    ///
    /// - `Ok(Some(record))` if the archive exists
    /// - `Ok(None)` if it does not
    fn get_archive(&self, name: &str) -> BoxFuture<'_, Result<Option<ArchiveRecord>, StorageError>>;

    /// Delete an archive. Returns whether it existed.
    fn delete_archive(&self, name: &str) -> BoxFuture<'_, Result<bool, StorageError>>;

    /// Store a style document under `name`.
    fn put_style(
        &self,
        name: &str,
        style: StyleDocument,
    ) -> BoxFuture<'_, Result<(), StorageError>>;

    /// Retrieve a style document.
    ///
    /// Most callers want [`load_style`], which treats failures as absence.
    fn get_style(&self, name: &str) -> BoxFuture<'_, Result<Option<StyleRecord>, StorageError>>;

    /// Delete a style document. Returns whether it existed.
    fn delete_style(&self, name: &str) -> BoxFuture<'_, Result<bool, StorageError>>;

    /// Enumerate stored archives, sorted by name.
    fn list_archives(&self) -> BoxFuture<'_, Result<Vec<ArchiveSummary>, StorageError>>;

    /// Open an archive for random-access reads.
    ///
    /// The default loads the whole blob and wraps it in a [`BlobSource`].
    /// Stores that can serve ranges directly should override this.
    fn open_archive(
        &self,
        name: &str,
    ) -> BoxFuture<'_, Result<Option<Arc<dyn ByteRangeSource>>, StorageError>> {
        let name = name.to_string();
        Box::pin(async move {
            let record = self.get_archive(&name).await?;
            Ok(record.map(|r| {
                let source: Arc<dyn ByteRangeSource> = Arc::new(BlobSource::new(r.name, r.data));
                source
            }))
        })
    }

    /// Usage figures, if this store can estimate them.
    fn estimate(&self) -> BoxFuture<'_, Result<Option<StorageEstimate>, StorageError>> {
        Box::pin(async { Ok(None) })
    }
}
