//! On-disk archive store.
//!
//! Layout under the root directory:
//!
//! ```text
//! <root>/
//!   archives/<hex>.pmtiles   archive blob
//!   archives/<hex>.json      {name, created_at, size_bytes}
//!   styles/<hex>.json        {name, created_at, style}
//! ```
//!
//! `<hex>` is the hex encoding of the archive name, so any name survives the
//! trip through the filesystem. Every write lands in a temporary file first
//! and is renamed into place.

use std::ffi::OsString;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use bytes::Bytes;
use chrono::Utc;
use tracing::debug;

use super::traits::{
    validate_name, ArchiveRecord, ArchiveStore, ArchiveSummary, BoxFuture, StorageError,
    StorageEstimate, StyleRecord,
};
use crate::archive::{ByteRangeSource, FileSource};
use crate::style::StyleDocument;

const ARCHIVES_DIR: &str = "archives";
const STYLES_DIR: &str = "styles";
const BLOB_EXT: &str = "pmtiles";
const RECORD_EXT: &str = "json";
const TEMP_EXT: &str = "tmp";

/// Archive store backed by a directory tree.
#[derive(Debug, Clone)]
pub struct DiskStore {
    root: PathBuf,
    quota: Option<u64>,
}

impl DiskStore {
    /// Create a store rooted at `root`. Directories are created on first write.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            quota: None,
        }
    }

    /// Limit the total bytes this store may hold.
    pub fn with_quota(mut self, quota_bytes: Option<u64>) -> Self {
        self.quota = quota_bytes;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn file_stem(name: &str) -> String {
        hex::encode(name.as_bytes())
    }

    fn blob_path(&self, name: &str) -> PathBuf {
        self.root
            .join(ARCHIVES_DIR)
            .join(format!("{}.{}", Self::file_stem(name), BLOB_EXT))
    }

    fn record_path(&self, name: &str) -> PathBuf {
        self.root
            .join(ARCHIVES_DIR)
            .join(format!("{}.{}", Self::file_stem(name), RECORD_EXT))
    }

    fn style_path(&self, name: &str) -> PathBuf {
        self.root
            .join(STYLES_DIR)
            .join(format!("{}.{}", Self::file_stem(name), RECORD_EXT))
    }

    /// Total bytes held by files in both tables.
    pub async fn used_bytes(&self) -> Result<u64, StorageError> {
        let mut total = 0;
        for dir in [ARCHIVES_DIR, STYLES_DIR] {
            total += dir_size(&self.root.join(dir)).await?;
        }
        Ok(total)
    }

    async fn check_quota(&self, replaced: &[PathBuf], new: u64) -> Result<(), StorageError> {
        let Some(quota) = self.quota else {
            return Ok(());
        };
        let mut old = 0;
        for path in replaced {
            old += file_len(path).await?.unwrap_or(0);
        }
        let remaining_used = self.used_bytes().await?.saturating_sub(old);
        if remaining_used + new > quota {
            return Err(StorageError::QuotaExceeded {
                requested: new,
                available: quota.saturating_sub(remaining_used),
            });
        }
        Ok(())
    }
}

/// Size of a file, or `None` if it does not exist.
async fn file_len(path: &Path) -> Result<Option<u64>, StorageError> {
    match tokio::fs::metadata(path).await {
        Ok(meta) => Ok(Some(meta.len())),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

async fn dir_size(dir: &Path) -> Result<u64, StorageError> {
    let mut entries = match tokio::fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(0),
        Err(e) => return Err(e.into()),
    };
    let mut total = 0;
    while let Some(entry) = entries.next_entry().await? {
        let meta = entry.metadata().await?;
        if meta.is_file() {
            total += meta.len();
        }
    }
    Ok(total)
}

/// Read a whole file, or `None` if it does not exist.
async fn read_optional(path: &Path) -> Result<Option<Vec<u8>>, StorageError> {
    match tokio::fs::read(path).await {
        Ok(data) => Ok(Some(data)),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Remove a file. Returns whether it existed.
async fn remove_optional(path: &Path) -> Result<bool, StorageError> {
    match tokio::fs::remove_file(path).await {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e.into()),
    }
}

static TEMP_SEQ: AtomicU64 = AtomicU64::new(0);

/// Sibling temp path for `path`: `<file name>.<seq>.tmp`. Every write gets
/// its own temp file, including writes to files that differ only by
/// extension.
fn temp_path(path: &Path) -> PathBuf {
    let seq = TEMP_SEQ.fetch_add(1, Ordering::Relaxed);
    let mut name = path.file_name().map(OsString::from).unwrap_or_default();
    name.push(format!(".{}.{}", seq, TEMP_EXT));
    path.with_file_name(name)
}

/// Write `data` to a sibling temp file, then rename it over `path`.
async fn write_replace(path: &Path, data: &[u8]) -> Result<(), StorageError> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    let temp = temp_path(path);
    let result = async {
        tokio::fs::write(&temp, data).await?;
        tokio::fs::rename(&temp, path).await
    }
    .await;

    if let Err(e) = result {
        let _ = tokio::fs::remove_file(&temp).await;
        return Err(match e.kind() {
            ErrorKind::StorageFull | ErrorKind::QuotaExceeded => StorageError::QuotaExceeded {
                requested: data.len() as u64,
                available: 0,
            },
            _ => e.into(),
        });
    }
    Ok(())
}

impl ArchiveStore for DiskStore {
    fn put_archive(&self, name: &str, data: Bytes) -> BoxFuture<'_, Result<(), StorageError>> {
        let name = name.to_string();
        Box::pin(async move {
            validate_name(&name)?;
            let blob_path = self.blob_path(&name);
            let record_path = self.record_path(&name);
            self.check_quota(&[blob_path.clone()], data.len() as u64)
                .await?;

            let summary = ArchiveSummary {
                name: name.clone(),
                created_at: Utc::now(),
                size_bytes: data.len() as u64,
            };
            write_replace(&blob_path, &data).await?;
            write_replace(&record_path, &serde_json::to_vec(&summary)?).await?;

            debug!(name = %name, bytes = data.len(), path = %blob_path.display(), "Stored archive");
            Ok(())
        })
    }

    fn get_archive(&self, name: &str) -> BoxFuture<'_, Result<Option<ArchiveRecord>, StorageError>> {
        let name = name.to_string();
        Box::pin(async move {
            let Some(record) = read_optional(&self.record_path(&name)).await? else {
                return Ok(None);
            };
            let summary: ArchiveSummary = serde_json::from_slice(&record)?;
            let Some(data) = read_optional(&self.blob_path(&name)).await? else {
                return Ok(None);
            };
            Ok(Some(ArchiveRecord {
                name: summary.name,
                data: Bytes::from(data),
                created_at: summary.created_at,
            }))
        })
    }

    fn delete_archive(&self, name: &str) -> BoxFuture<'_, Result<bool, StorageError>> {
        let name = name.to_string();
        Box::pin(async move {
            let had_record = remove_optional(&self.record_path(&name)).await?;
            let had_blob = remove_optional(&self.blob_path(&name)).await?;
            Ok(had_record || had_blob)
        })
    }

    fn put_style(
        &self,
        name: &str,
        style: StyleDocument,
    ) -> BoxFuture<'_, Result<(), StorageError>> {
        let name = name.to_string();
        Box::pin(async move {
            validate_name(&name)?;
            let record = StyleRecord {
                name: name.clone(),
                style,
                created_at: Utc::now(),
            };
            let encoded = serde_json::to_vec(&record)?;
            let path = self.style_path(&name);
            self.check_quota(&[path.clone()], encoded.len() as u64)
                .await?;
            write_replace(&path, &encoded).await
        })
    }

    fn get_style(&self, name: &str) -> BoxFuture<'_, Result<Option<StyleRecord>, StorageError>> {
        let name = name.to_string();
        Box::pin(async move {
            match read_optional(&self.style_path(&name)).await? {
                Some(data) => Ok(Some(serde_json::from_slice(&data)?)),
                None => Ok(None),
            }
        })
    }

    fn delete_style(&self, name: &str) -> BoxFuture<'_, Result<bool, StorageError>> {
        let name = name.to_string();
        Box::pin(async move { remove_optional(&self.style_path(&name)).await })
    }

    fn list_archives(&self) -> BoxFuture<'_, Result<Vec<ArchiveSummary>, StorageError>> {
        Box::pin(async move {
            let dir = self.root.join(ARCHIVES_DIR);
            let mut entries = match tokio::fs::read_dir(&dir).await {
                Ok(entries) => entries,
                Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
                Err(e) => return Err(e.into()),
            };

            let mut list = Vec::new();
            while let Some(entry) = entries.next_entry().await? {
                let path = entry.path();
                if path.extension().and_then(|e| e.to_str()) != Some(RECORD_EXT) {
                    continue;
                }
                let data = tokio::fs::read(&path).await?;
                list.push(serde_json::from_slice::<ArchiveSummary>(&data)?);
            }
            list.sort_by(|a, b| a.name.cmp(&b.name));
            Ok(list)
        })
    }

    fn open_archive(
        &self,
        name: &str,
    ) -> BoxFuture<'_, Result<Option<Arc<dyn ByteRangeSource>>, StorageError>> {
        let name = name.to_string();
        Box::pin(async move {
            let path = self.blob_path(&name);
            if file_len(&path).await?.is_none() {
                return Ok(None);
            }
            let source: Arc<dyn ByteRangeSource> = Arc::new(FileSource::new(name, path));
            Ok(Some(source))
        })
    }

    fn estimate(&self) -> BoxFuture<'_, Result<Option<StorageEstimate>, StorageError>> {
        Box::pin(async move {
            match self.quota {
                Some(quota) => Ok(Some(StorageEstimate {
                    used: self.used_bytes().await?,
                    quota,
                })),
                None => Ok(None),
            }
        })
    }
}
