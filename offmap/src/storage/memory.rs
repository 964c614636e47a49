//! In-memory archive store.
//!
//! Keeps both tables in `parking_lot` maps. Records are never evicted; an
//! optional quota makes puts fail with [`StorageError::QuotaExceeded`] once
//! the stored bytes would pass the limit, which is how tests and embedders
//! exercise the quota path without filling a disk.

use std::collections::HashMap;

use bytes::Bytes;
use chrono::Utc;
use parking_lot::RwLock;

use super::traits::{
    validate_name, ArchiveRecord, ArchiveStore, ArchiveSummary, BoxFuture, StorageError,
    StorageEstimate, StyleRecord,
};
use crate::style::StyleDocument;

/// In-memory archive store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    archives: RwLock<HashMap<String, ArchiveRecord>>,
    styles: RwLock<HashMap<String, (StyleRecord, u64)>>,
    quota: Option<u64>,
}

impl MemoryStore {
    /// Create an unbounded store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store that refuses writes beyond `quota_bytes`.
    pub fn with_quota(quota_bytes: u64) -> Self {
        Self {
            quota: Some(quota_bytes),
            ..Self::default()
        }
    }

    /// Total bytes held by both tables.
    pub fn used_bytes(&self) -> u64 {
        let archives: u64 = self
            .archives
            .read()
            .values()
            .map(|r| r.data.len() as u64)
            .sum();
        let styles: u64 = self.styles.read().values().map(|(_, size)| *size).sum();
        archives + styles
    }

    /// Check that replacing `old` bytes with `new` bytes stays within quota.
    fn check_quota(&self, old: u64, new: u64) -> Result<(), StorageError> {
        let Some(quota) = self.quota else {
            return Ok(());
        };
        let remaining_used = self.used_bytes().saturating_sub(old);
        if remaining_used + new > quota {
            return Err(StorageError::QuotaExceeded {
                requested: new,
                available: quota.saturating_sub(remaining_used),
            });
        }
        Ok(())
    }
}

impl ArchiveStore for MemoryStore {
    fn put_archive(&self, name: &str, data: Bytes) -> BoxFuture<'_, Result<(), StorageError>> {
        let name = name.to_string();
        Box::pin(async move {
            validate_name(&name)?;
            let old = self
                .archives
                .read()
                .get(&name)
                .map(|r| r.data.len() as u64)
                .unwrap_or(0);
            self.check_quota(old, data.len() as u64)?;

            let record = ArchiveRecord {
                name: name.clone(),
                data,
                created_at: Utc::now(),
            };
            self.archives.write().insert(name, record);
            Ok(())
        })
    }

    fn get_archive(&self, name: &str) -> BoxFuture<'_, Result<Option<ArchiveRecord>, StorageError>> {
        let name = name.to_string();
        Box::pin(async move { Ok(self.archives.read().get(&name).cloned()) })
    }

    fn delete_archive(&self, name: &str) -> BoxFuture<'_, Result<bool, StorageError>> {
        let name = name.to_string();
        Box::pin(async move { Ok(self.archives.write().remove(&name).is_some()) })
    }

    fn put_style(
        &self,
        name: &str,
        style: StyleDocument,
    ) -> BoxFuture<'_, Result<(), StorageError>> {
        let name = name.to_string();
        Box::pin(async move {
            validate_name(&name)?;
            let size = serde_json::to_vec(&style)?.len() as u64;
            let old = self
                .styles
                .read()
                .get(&name)
                .map(|(_, s)| *s)
                .unwrap_or(0);
            self.check_quota(old, size)?;

            let record = StyleRecord {
                name: name.clone(),
                style,
                created_at: Utc::now(),
            };
            self.styles.write().insert(name, (record, size));
            Ok(())
        })
    }

    fn get_style(&self, name: &str) -> BoxFuture<'_, Result<Option<StyleRecord>, StorageError>> {
        let name = name.to_string();
        Box::pin(async move { Ok(self.styles.read().get(&name).map(|(r, _)| r.clone())) })
    }

    fn delete_style(&self, name: &str) -> BoxFuture<'_, Result<bool, StorageError>> {
        let name = name.to_string();
        Box::pin(async move { Ok(self.styles.write().remove(&name).is_some()) })
    }

    fn list_archives(&self) -> BoxFuture<'_, Result<Vec<ArchiveSummary>, StorageError>> {
        Box::pin(async move {
            let mut list: Vec<ArchiveSummary> = self
                .archives
                .read()
                .values()
                .map(|r| ArchiveSummary {
                    name: r.name.clone(),
                    created_at: r.created_at,
                    size_bytes: r.data.len() as u64,
                })
                .collect();
            list.sort_by(|a, b| a.name.cmp(&b.name));
            Ok(list)
        })
    }

    fn estimate(&self) -> BoxFuture<'_, Result<Option<StorageEstimate>, StorageError>> {
        Box::pin(async move {
            Ok(self.quota.map(|quota| StorageEstimate {
                used: self.used_bytes(),
                quota,
            }))
        })
    }
}
