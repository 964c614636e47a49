//! Random-access byte sources for archive readers.
//!
//! A [`ByteRangeSource`] hands out exact byte ranges of a stored archive.
//! Readers call it many times per operation (header, metadata, directories,
//! tile data), so implementations keep no per-call state.

use std::io::SeekFrom;
use std::path::PathBuf;

use bytes::Bytes;
use thiserror::Error;
use tokio::io::{AsyncReadExt, AsyncSeekExt};

use crate::storage::BoxFuture;

/// Errors raised by byte sources.
#[derive(Debug, Error)]
pub enum SourceError {
    /// The requested range could not be produced.
    #[error("failed to read {length} bytes at offset {offset} from {key}: {reason}")]
    ReadFailed {
        key: String,
        offset: u64,
        length: u64,
        reason: String,
    },
}

impl SourceError {
    fn read_failed(key: &str, offset: u64, length: u64, reason: impl Into<String>) -> Self {
        SourceError::ReadFailed {
            key: key.to_string(),
            offset,
            length,
            reason: reason.into(),
        }
    }
}

/// Random-access reader over an archive payload.
pub trait ByteRangeSource: Send + Sync {
    /// Display key identifying the wrapped archive.
    fn key(&self) -> &str;

    /// Read exactly `length` bytes starting at `offset`.
    ///
    /// Archive bounds are the reader's concern; a range that cannot be
    /// produced in full fails instead of returning a short buffer.
    fn read(&self, offset: u64, length: u64) -> BoxFuture<'_, Result<Bytes, SourceError>>;
}

/// Byte source over an in-memory blob.
#[derive(Debug, Clone)]
pub struct BlobSource {
    key: String,
    data: Bytes,
}

impl BlobSource {
    pub fn new(key: impl Into<String>, data: impl Into<Bytes>) -> Self {
        Self {
            key: key.into(),
            data: data.into(),
        }
    }

    /// Total size of the wrapped blob.
    pub fn len(&self) -> u64 {
        self.data.len() as u64
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

impl ByteRangeSource for BlobSource {
    fn key(&self) -> &str {
        &self.key
    }

    fn read(&self, offset: u64, length: u64) -> BoxFuture<'_, Result<Bytes, SourceError>> {
        Box::pin(async move {
            let end = offset
                .checked_add(length)
                .ok_or_else(|| SourceError::read_failed(&self.key, offset, length, "overflow"))?;
            if end > self.len() {
                return Err(SourceError::read_failed(
                    &self.key,
                    offset,
                    length,
                    format!("range ends past blob of {} bytes", self.len()),
                ));
            }
            // Bytes::slice is a cheap refcounted view
            Ok(self.data.slice(offset as usize..end as usize))
        })
    }
}

/// Byte source reading ranges straight from a file.
///
/// The file is opened per read so that concurrent lookups never share a
/// cursor, and an archive deleted mid-session surfaces as a read failure.
#[derive(Debug, Clone)]
pub struct FileSource {
    key: String,
    path: PathBuf,
}

impl FileSource {
    pub fn new(key: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            key: key.into(),
            path: path.into(),
        }
    }

    pub fn path(&self) -> &std::path::Path {
        &self.path
    }
}

impl ByteRangeSource for FileSource {
    fn key(&self) -> &str {
        &self.key
    }

    fn read(&self, offset: u64, length: u64) -> BoxFuture<'_, Result<Bytes, SourceError>> {
        Box::pin(async move {
            let fail = |e: std::io::Error| {
                SourceError::read_failed(&self.key, offset, length, e.to_string())
            };

            let mut file = tokio::fs::File::open(&self.path).await.map_err(fail)?;

            // Check the range against the file before allocating for it.
            let file_len = file.metadata().await.map_err(fail)?.len();
            let end = offset
                .checked_add(length)
                .ok_or_else(|| SourceError::read_failed(&self.key, offset, length, "overflow"))?;
            if end > file_len {
                return Err(SourceError::read_failed(
                    &self.key,
                    offset,
                    length,
                    format!("range ends past file of {} bytes", file_len),
                ));
            }
            let len = usize::try_from(length).map_err(|_| {
                SourceError::read_failed(&self.key, offset, length, "length exceeds address space")
            })?;

            file.seek(SeekFrom::Start(offset)).await.map_err(fail)?;
            let mut buf = vec![0u8; len];
            file.read_exact(&mut buf).await.map_err(fail)?;
            Ok(Bytes::from(buf))
        })
    }
}
