//! Per-download reassembly state.

use bytes::{Bytes, BytesMut};

use super::error::{DownloadError, DownloadResult};
use crate::status::percent_of;

/// State of one in-progress archive download.
///
/// Chunks are kept in arrival order and concatenated once at the end.
#[derive(Debug, Clone)]
pub struct DownloadSession {
    /// Source URL.
    pub url: String,
    /// Storage name the archive is saved under.
    pub name: String,
    chunks: Vec<Bytes>,
    received: u64,
    total: Option<u64>,
}

impl DownloadSession {
    pub fn new(url: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            name: name.into(),
            chunks: Vec::new(),
            received: 0,
            total: None,
        }
    }

    /// Bytes received so far.
    pub fn received(&self) -> u64 {
        self.received
    }

    /// Expected archive size, once a `Content-Range` has revealed it.
    pub fn total(&self) -> Option<u64> {
        self.total
    }

    pub fn set_total(&mut self, total: u64) {
        self.total = Some(total);
    }

    /// Number of chunks received.
    pub fn chunk_count(&self) -> usize {
        self.chunks.len()
    }

    /// Append a chunk.
    ///
    /// Fails if the chunk would take the session past the known total.
    pub fn push_chunk(&mut self, chunk: Bytes) -> DownloadResult<()> {
        let received = self.received + chunk.len() as u64;
        if let Some(total) = self.total {
            if received > total {
                return Err(DownloadError::failed(
                    &self.url,
                    format!("received {} bytes, expected {}", received, total),
                ));
            }
        }
        self.received = received;
        self.chunks.push(chunk);
        Ok(())
    }

    /// Whether every expected byte has arrived. Always false while the total
    /// is unknown.
    pub fn is_complete(&self) -> bool {
        self.total.is_some_and(|total| self.received >= total)
    }

    /// Progress percentage, one decimal, if the total is known.
    pub fn percent(&self) -> Option<f64> {
        self.total.map(|total| percent_of(self.received, total))
    }

    /// Concatenate all chunks into the final blob.
    pub fn into_blob(self) -> Bytes {
        if self.chunks.len() == 1 {
            return self.chunks.into_iter().next().unwrap_or_default();
        }
        let mut blob = BytesMut::with_capacity(self.received as usize);
        for chunk in &self.chunks {
            blob.extend_from_slice(chunk);
        }
        blob.freeze()
    }
}
