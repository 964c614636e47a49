//! Tile archive access.
//!
//! - [`ByteRangeSource`]: random-access reads over a stored archive
//! - [`ArchiveReader`] / [`ArchiveFormat`]: format-neutral header, metadata
//!   and tile lookup
//! - [`PmTilesFormat`]: the PMTiles v3 implementation

mod pmtiles;
mod reader;
mod source;

#[cfg(test)]
pub(crate) mod testing;

pub use pmtiles::{
    decode_directory, find_entry, tile_id, Compression, Entry, PmTilesFormat, PmTilesHeader,
    PmTilesReader, HEADER_LEN,
};
pub use reader::{
    ArchiveError, ArchiveFormat, ArchiveHeader, ArchiveReader, TILE_TYPE_JPEG, TILE_TYPE_MVT,
    TILE_TYPE_PNG, TILE_TYPE_WEBP,
};
pub use source::{BlobSource, ByteRangeSource, FileSource, SourceError};
