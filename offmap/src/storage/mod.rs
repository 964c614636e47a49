//! Persistent storage for downloaded archives and their styles.
//!
//! - [`ArchiveStore`]: the storage gateway trait
//! - [`MemoryStore`]: in-process tables, used by tests and short-lived tools
//! - [`DiskStore`]: directory-backed tables, used by the CLI
//!
//! [`load_style`] and [`storage_usage`] are the convenience reads layered on
//! top of any store.

mod disk;
mod memory;
mod traits;

pub use disk::DiskStore;
pub use memory::MemoryStore;
pub use traits::{
    validate_name, ArchiveRecord, ArchiveStore, ArchiveSummary, BoxFuture, StorageError,
    StorageEstimate, StyleRecord,
};

use serde::Serialize;
use tracing::warn;

use crate::style::StyleDocument;

/// Read the style stored for `name`.
///
/// A failed read is logged and treated the same as a missing style.
pub async fn load_style(store: &dyn ArchiveStore, name: &str) -> Option<StyleDocument> {
    match store.get_style(name).await {
        Ok(record) => record.map(|r| r.style),
        Err(e) => {
            warn!(name = %name, error = %e, "Failed to read style, ignoring");
            None
        }
    }
}

/// Storage consumption relative to the quota.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct StorageUsage {
    pub used: u64,
    pub quota: u64,
    /// `used / quota * 100`. Not finite when the quota is zero.
    pub percent: f64,
}

impl From<StorageEstimate> for StorageUsage {
    fn from(estimate: StorageEstimate) -> Self {
        Self {
            used: estimate.used,
            quota: estimate.quota,
            percent: estimate.used as f64 / estimate.quota as f64 * 100.0,
        }
    }
}

/// Current storage usage, or `None` if the store cannot estimate it.
pub async fn storage_usage(
    store: &dyn ArchiveStore,
) -> Result<Option<StorageUsage>, StorageError> {
    Ok(store.estimate().await?.map(StorageUsage::from))
}
