//! Archive reader abstraction.
//!
//! The resolver never decodes archives itself. It binds a [`ByteRangeSource`]
//! to an [`ArchiveFormat`] and talks to the resulting [`ArchiveReader`], so
//! other container formats can be slotted in without touching resolution.

use std::sync::Arc;

use bytes::Bytes;
use thiserror::Error;

use super::source::{ByteRangeSource, SourceError};
use crate::storage::BoxFuture;

/// Tile type code for vector (MVT) tiles.
pub const TILE_TYPE_MVT: u8 = 1;
/// Tile type code for PNG tiles.
pub const TILE_TYPE_PNG: u8 = 2;
/// Tile type code for JPEG tiles.
pub const TILE_TYPE_JPEG: u8 = 3;
/// Tile type code for WebP tiles.
pub const TILE_TYPE_WEBP: u8 = 4;

/// Errors raised while decoding an archive.
#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error(transparent)]
    Source(#[from] SourceError),

    #[error("invalid archive header: {0}")]
    InvalidHeader(String),

    #[error("unsupported archive version {0}")]
    UnsupportedVersion(u8),

    #[error("unsupported compression code {0}")]
    UnsupportedCompression(u8),

    #[error("invalid archive metadata: {0}")]
    Metadata(String),

    #[error("invalid tile directory: {0}")]
    Directory(String),
}

/// Header fields every archive format exposes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ArchiveHeader {
    pub min_zoom: u8,
    pub max_zoom: u8,
    pub min_lon: f64,
    pub min_lat: f64,
    pub max_lon: f64,
    pub max_lat: f64,
    /// Format-level tile type code (see the `TILE_TYPE_*` constants).
    pub tile_type: u8,
}

impl ArchiveHeader {
    /// Bounding box as `[min_lon, min_lat, max_lon, max_lat]`.
    pub fn bounds(&self) -> [f64; 4] {
        [self.min_lon, self.min_lat, self.max_lon, self.max_lat]
    }
}

/// Read access to a single archive.
pub trait ArchiveReader: Send + Sync {
    /// Decode the archive header.
    fn header(&self) -> BoxFuture<'_, Result<ArchiveHeader, ArchiveError>>;

    /// Decode the JSON metadata block, if the archive carries one.
    fn metadata(&self) -> BoxFuture<'_, Result<Option<serde_json::Value>, ArchiveError>>;

    /// Look up the raw bytes of a tile. `Ok(None)` means the tile is absent.
    fn tile(&self, z: u8, x: u32, y: u32) -> BoxFuture<'_, Result<Option<Bytes>, ArchiveError>>;
}

/// Factory binding byte sources to readers of one container format.
pub trait ArchiveFormat: Send + Sync {
    /// Short format name for logs.
    fn name(&self) -> &'static str;

    /// Create a reader over `source`. Decoding is deferred to the first call.
    fn open(&self, source: Arc<dyn ByteRangeSource>) -> Box<dyn ArchiveReader>;
}
