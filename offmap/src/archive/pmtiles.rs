//! PMTiles v3 archive reader.
//!
//! Layout of a v3 archive:
//!
//! ```text
//! ┌──────────────┬──────────┬──────────┬───────────────┬───────────┐
//! │ header (127) │ root dir │ metadata │ leaf dirs ... │ tile data │
//! └──────────────┴──────────┴──────────┴───────────────┴───────────┘
//! ```
//!
//! Tiles are addressed by a Hilbert-curve tile id. Directories are
//! varint-encoded entry lists (optionally gzip-compressed); an entry with a
//! zero run length points at a leaf directory instead of tile data.
//!
//! Every read goes through the [`ByteRangeSource`], so only the header, the
//! directories on the lookup path and the tile itself are ever loaded.

use std::io::Read;
use std::sync::Arc;

use bytes::Bytes;
use flate2::read::GzDecoder;
use tokio::sync::OnceCell;
use tracing::trace;

use super::reader::{ArchiveError, ArchiveFormat, ArchiveHeader, ArchiveReader};
use super::source::ByteRangeSource;
use crate::storage::BoxFuture;

/// Size of the fixed v3 header in bytes.
pub const HEADER_LEN: u64 = 127;

pub(crate) const MAGIC: &[u8; 7] = b"PMTiles";
pub(crate) const SPEC_VERSION: u8 = 3;

/// Root plus at most three levels of leaves.
const MAX_DIRECTORY_DEPTH: usize = 4;

/// Highest zoom level whose tile ids fit in a `u64`.
const MAX_ZOOM: u8 = 31;

/// Compression applied to directories, metadata or tiles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Compression {
    Unknown,
    None,
    Gzip,
    Brotli,
    Zstd,
    Other(u8),
}

impl From<u8> for Compression {
    fn from(code: u8) -> Self {
        match code {
            0 => Compression::Unknown,
            1 => Compression::None,
            2 => Compression::Gzip,
            3 => Compression::Brotli,
            4 => Compression::Zstd,
            other => Compression::Other(other),
        }
    }
}

impl Compression {
    fn code(&self) -> u8 {
        match self {
            Compression::Unknown => 0,
            Compression::None => 1,
            Compression::Gzip => 2,
            Compression::Brotli => 3,
            Compression::Zstd => 4,
            Compression::Other(code) => *code,
        }
    }
}

/// Decoded v3 header.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PmTilesHeader {
    pub root_dir_offset: u64,
    pub root_dir_length: u64,
    pub metadata_offset: u64,
    pub metadata_length: u64,
    pub leaf_dirs_offset: u64,
    pub leaf_dirs_length: u64,
    pub tile_data_offset: u64,
    pub tile_data_length: u64,
    pub addressed_tiles_count: u64,
    pub tile_entries_count: u64,
    pub tile_contents_count: u64,
    pub clustered: bool,
    pub internal_compression: Compression,
    pub tile_compression: Compression,
    pub tile_type: u8,
    pub min_zoom: u8,
    pub max_zoom: u8,
    pub min_lon: f64,
    pub min_lat: f64,
    pub max_lon: f64,
    pub max_lat: f64,
    pub center_zoom: u8,
    pub center_lon: f64,
    pub center_lat: f64,
}

impl PmTilesHeader {
    /// Parse the fixed-size header from the first bytes of an archive.
    pub fn parse(buf: &[u8]) -> Result<Self, ArchiveError> {
        if buf.len() < HEADER_LEN as usize {
            return Err(ArchiveError::InvalidHeader(format!(
                "expected {} bytes, got {}",
                HEADER_LEN,
                buf.len()
            )));
        }
        if &buf[0..7] != MAGIC {
            return Err(ArchiveError::InvalidHeader("missing PMTiles magic".to_string()));
        }
        if buf[7] != SPEC_VERSION {
            return Err(ArchiveError::UnsupportedVersion(buf[7]));
        }

        Ok(Self {
            root_dir_offset: read_u64(buf, 8),
            root_dir_length: read_u64(buf, 16),
            metadata_offset: read_u64(buf, 24),
            metadata_length: read_u64(buf, 32),
            leaf_dirs_offset: read_u64(buf, 40),
            leaf_dirs_length: read_u64(buf, 48),
            tile_data_offset: read_u64(buf, 56),
            tile_data_length: read_u64(buf, 64),
            addressed_tiles_count: read_u64(buf, 72),
            tile_entries_count: read_u64(buf, 80),
            tile_contents_count: read_u64(buf, 88),
            clustered: buf[96] == 1,
            internal_compression: Compression::from(buf[97]),
            tile_compression: Compression::from(buf[98]),
            tile_type: buf[99],
            min_zoom: buf[100],
            max_zoom: buf[101],
            min_lon: read_e7(buf, 102),
            min_lat: read_e7(buf, 106),
            max_lon: read_e7(buf, 110),
            max_lat: read_e7(buf, 114),
            center_zoom: buf[118],
            center_lon: read_e7(buf, 119),
            center_lat: read_e7(buf, 123),
        })
    }
}

impl From<&PmTilesHeader> for ArchiveHeader {
    fn from(h: &PmTilesHeader) -> Self {
        ArchiveHeader {
            min_zoom: h.min_zoom,
            max_zoom: h.max_zoom,
            min_lon: h.min_lon,
            min_lat: h.min_lat,
            max_lon: h.max_lon,
            max_lat: h.max_lat,
            tile_type: h.tile_type,
        }
    }
}

fn read_u64(buf: &[u8], at: usize) -> u64 {
    let mut raw = [0u8; 8];
    raw.copy_from_slice(&buf[at..at + 8]);
    u64::from_le_bytes(raw)
}

fn read_e7(buf: &[u8], at: usize) -> f64 {
    let mut raw = [0u8; 4];
    raw.copy_from_slice(&buf[at..at + 4]);
    i32::from_le_bytes(raw) as f64 / 10_000_000.0
}

/// Convert a z/x/y coordinate into a Hilbert tile id.
///
/// Returns `None` when the coordinate lies outside the zoom level's grid.
pub fn tile_id(z: u8, x: u32, y: u32) -> Option<u64> {
    if z > MAX_ZOOM {
        return None;
    }
    let n: u64 = 1 << z;
    let (mut x, mut y) = (x as u64, y as u64);
    if x >= n || y >= n {
        return None;
    }

    // Number of tiles on all lower zoom levels
    let base = ((1u64 << (2 * z as u32)) - 1) / 3;

    let mut d = 0u64;
    let mut s = n / 2;
    while s > 0 {
        let rx = u64::from((x & s) > 0);
        let ry = u64::from((y & s) > 0);
        d += s * s * ((3 * rx) ^ ry);
        if ry == 0 {
            if rx == 1 {
                // Only the bits below `s` matter from here on
                x = (s - 1) - (x & (s - 1));
                y = (s - 1) - (y & (s - 1));
            }
            std::mem::swap(&mut x, &mut y);
        }
        s /= 2;
    }
    Some(base + d)
}

/// One directory entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Entry {
    pub tile_id: u64,
    pub offset: u64,
    pub length: u32,
    /// Number of consecutive tile ids sharing this content; 0 marks a leaf.
    pub run_length: u32,
}

fn read_varint(buf: &[u8], pos: &mut usize) -> Result<u64, ArchiveError> {
    let mut value = 0u64;
    let mut shift = 0u32;
    loop {
        let byte = *buf
            .get(*pos)
            .ok_or_else(|| ArchiveError::Directory("truncated varint".to_string()))?;
        *pos += 1;
        if shift >= 64 {
            return Err(ArchiveError::Directory("varint overflow".to_string()));
        }
        value |= u64::from(byte & 0x7f) << shift;
        if byte & 0x80 == 0 {
            return Ok(value);
        }
        shift += 7;
    }
}

fn read_varint_u32(buf: &[u8], pos: &mut usize) -> Result<u32, ArchiveError> {
    let value = read_varint(buf, pos)?;
    u32::try_from(value)
        .map_err(|_| ArchiveError::Directory(format!("value {} exceeds 32 bits", value)))
}

/// Decode an uncompressed directory.
pub fn decode_directory(buf: &[u8]) -> Result<Vec<Entry>, ArchiveError> {
    let mut pos = 0;
    let count = read_varint(buf, &mut pos)? as usize;
    // Every entry needs at least one byte per column
    if count > buf.len() {
        return Err(ArchiveError::Directory(format!(
            "entry count {} exceeds directory size",
            count
        )));
    }

    let mut entries = Vec::with_capacity(count);
    let mut last_id = 0u64;
    for _ in 0..count {
        last_id = last_id
            .checked_add(read_varint(buf, &mut pos)?)
            .ok_or_else(|| ArchiveError::Directory("tile id overflow".to_string()))?;
        entries.push(Entry {
            tile_id: last_id,
            offset: 0,
            length: 0,
            run_length: 0,
        });
    }
    for entry in entries.iter_mut() {
        entry.run_length = read_varint_u32(buf, &mut pos)?;
    }
    for entry in entries.iter_mut() {
        entry.length = read_varint_u32(buf, &mut pos)?;
    }
    for i in 0..count {
        let raw = read_varint(buf, &mut pos)?;
        entries[i].offset = if raw == 0 && i > 0 {
            let prev = entries[i - 1];
            prev.offset
                .checked_add(u64::from(prev.length))
                .ok_or_else(|| ArchiveError::Directory("entry offset overflow".to_string()))?
        } else if raw == 0 {
            return Err(ArchiveError::Directory(
                "first entry cannot use a relative offset".to_string(),
            ));
        } else {
            raw - 1
        };
    }
    Ok(entries)
}

/// Find the entry covering `tile_id`, which may be a leaf pointer.
pub fn find_entry(entries: &[Entry], tile_id: u64) -> Option<&Entry> {
    match entries.binary_search_by_key(&tile_id, |e| e.tile_id) {
        Ok(i) => Some(&entries[i]),
        Err(0) => None,
        Err(i) => {
            let candidate = &entries[i - 1];
            let within_run = tile_id - candidate.tile_id < u64::from(candidate.run_length);
            if candidate.run_length == 0 || within_run {
                Some(candidate)
            } else {
                None
            }
        }
    }
}

fn decompress(data: Bytes, compression: Compression) -> Result<Bytes, ArchiveError> {
    match compression {
        Compression::None | Compression::Unknown => Ok(data),
        Compression::Gzip => {
            let mut out = Vec::with_capacity(data.len() * 4);
            GzDecoder::new(&data[..])
                .read_to_end(&mut out)
                .map_err(|e| ArchiveError::Directory(format!("gzip: {}", e)))?;
            Ok(Bytes::from(out))
        }
        other => Err(ArchiveError::UnsupportedCompression(other.code())),
    }
}

/// Reader over one PMTiles v3 archive.
pub struct PmTilesReader {
    source: Arc<dyn ByteRangeSource>,
    header: OnceCell<PmTilesHeader>,
}

impl PmTilesReader {
    pub fn new(source: Arc<dyn ByteRangeSource>) -> Self {
        Self {
            source,
            header: OnceCell::new(),
        }
    }

    /// Decode (once) and return the full v3 header.
    pub async fn pmtiles_header(&self) -> Result<&PmTilesHeader, ArchiveError> {
        self.header
            .get_or_try_init(|| async {
                let buf = self.source.read(0, HEADER_LEN).await?;
                PmTilesHeader::parse(&buf)
            })
            .await
    }

    async fn read_directory(
        &self,
        offset: u64,
        length: u64,
        compression: Compression,
    ) -> Result<Vec<Entry>, ArchiveError> {
        let raw = self.source.read(offset, length).await?;
        let buf = decompress(raw, compression)?;
        decode_directory(&buf)
    }

    async fn lookup(&self, z: u8, x: u32, y: u32) -> Result<Option<Bytes>, ArchiveError> {
        let header = *self.pmtiles_header().await?;
        let Some(id) = tile_id(z, x, y) else {
            return Ok(None);
        };

        let mut dir_offset = header.root_dir_offset;
        let mut dir_length = header.root_dir_length;
        for depth in 0..MAX_DIRECTORY_DEPTH {
            let entries = self
                .read_directory(dir_offset, dir_length, header.internal_compression)
                .await?;
            let Some(entry) = find_entry(&entries, id) else {
                return Ok(None);
            };
            if entry.run_length > 0 {
                let offset = header
                    .tile_data_offset
                    .checked_add(entry.offset)
                    .ok_or_else(|| {
                        ArchiveError::Directory(format!("tile {} offset overflows", id))
                    })?;
                let data = self.source.read(offset, u64::from(entry.length)).await?;
                return Ok(Some(data));
            }
            trace!(
                key = self.source.key(),
                depth,
                tile_id = id,
                "Descending into leaf directory"
            );
            dir_offset = header
                .leaf_dirs_offset
                .checked_add(entry.offset)
                .ok_or_else(|| {
                    ArchiveError::Directory(format!("leaf directory offset overflows for tile {}", id))
                })?;
            dir_length = u64::from(entry.length);
        }
        Err(ArchiveError::Directory(format!(
            "tile {} not resolved within {} directory levels",
            id, MAX_DIRECTORY_DEPTH
        )))
    }
}

impl ArchiveReader for PmTilesReader {
    fn header(&self) -> BoxFuture<'_, Result<ArchiveHeader, ArchiveError>> {
        Box::pin(async move { Ok(ArchiveHeader::from(self.pmtiles_header().await?)) })
    }

    fn metadata(&self) -> BoxFuture<'_, Result<Option<serde_json::Value>, ArchiveError>> {
        Box::pin(async move {
            let header = *self.pmtiles_header().await?;
            if header.metadata_length == 0 {
                return Ok(None);
            }
            let raw = self
                .source
                .read(header.metadata_offset, header.metadata_length)
                .await?;
            let buf = decompress(raw, header.internal_compression)?;
            let value = serde_json::from_slice(&buf)
                .map_err(|e| ArchiveError::Metadata(e.to_string()))?;
            Ok(Some(value))
        })
    }

    fn tile(&self, z: u8, x: u32, y: u32) -> BoxFuture<'_, Result<Option<Bytes>, ArchiveError>> {
        Box::pin(self.lookup(z, x, y))
    }
}

/// [`ArchiveFormat`] producing [`PmTilesReader`]s.
#[derive(Debug, Clone, Copy, Default)]
pub struct PmTilesFormat;

impl ArchiveFormat for PmTilesFormat {
    fn name(&self) -> &'static str {
        "pmtiles"
    }

    fn open(&self, source: Arc<dyn ByteRangeSource>) -> Box<dyn ArchiveReader> {
        Box::new(PmTilesReader::new(source))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archive::source::BlobSource;
    use crate::archive::testing::{push_varint, PmTilesFixture as Fixture};

    #[test]
    fn test_tile_id_known_values() {
        assert_eq!(tile_id(0, 0, 0), Some(0));
        assert_eq!(tile_id(1, 0, 0), Some(1));
        assert_eq!(tile_id(1, 0, 1), Some(2));
        assert_eq!(tile_id(1, 1, 1), Some(3));
        assert_eq!(tile_id(1, 1, 0), Some(4));
        assert_eq!(tile_id(2, 0, 0), Some(5));
    }

    #[test]
    fn test_tile_id_is_unique_per_zoom() {
        let mut ids: Vec<u64> = (0..8u32)
            .flat_map(|x| (0..8u32).map(move |y| tile_id(3, x, y).unwrap()))
            .collect();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), 64);
        assert_eq!(ids[0], 21);
        assert_eq!(ids[63], 84);
    }

    #[test]
    fn test_tile_id_out_of_grid() {
        assert_eq!(tile_id(1, 2, 0), None);
        assert_eq!(tile_id(32, 0, 0), None);
    }

    #[test]
    fn test_varint_roundtrip_edges() {
        for value in [0u64, 1, 127, 128, 300, u32::MAX as u64, u64::MAX] {
            let mut buf = Vec::new();
            push_varint(&mut buf, value);
            let mut pos = 0;
            assert_eq!(read_varint(&buf, &mut pos).unwrap(), value);
            assert_eq!(pos, buf.len());
        }
    }

    #[test]
    fn test_truncated_varint_fails() {
        let mut pos = 0;
        assert!(read_varint(&[0x80, 0x80], &mut pos).is_err());
    }

    #[test]
    fn test_decode_directory_relative_offsets() {
        // count=2, ids 5,+1, run lengths 1,1, lengths 10,20, offsets 1(=0), 0(=prev+len)
        let buf = [2, 5, 1, 1, 1, 10, 20, 1, 0];
        let entries = decode_directory(&buf).unwrap();
        assert_eq!(entries[0].tile_id, 5);
        assert_eq!(entries[1].tile_id, 6);
        assert_eq!(entries[0].offset, 0);
        assert_eq!(entries[1].offset, 10);
        assert_eq!(entries[1].length, 20);
    }

    #[test]
    fn test_decode_directory_rejects_leading_relative_offset() {
        let buf = [1, 5, 1, 10, 0];
        assert!(decode_directory(&buf).is_err());
    }

    #[test]
    fn test_decode_directory_relative_offset_overflow() {
        let mut buf = vec![2, 5, 1, 1, 1, 10, 20];
        push_varint(&mut buf, u64::MAX);
        buf.push(0);
        assert!(matches!(
            decode_directory(&buf),
            Err(ArchiveError::Directory(_))
        ));
    }

    #[test]
    fn test_find_entry_with_run_length() {
        let entries = vec![
            Entry { tile_id: 10, offset: 0, length: 4, run_length: 3 },
            Entry { tile_id: 20, offset: 4, length: 4, run_length: 1 },
        ];
        assert_eq!(find_entry(&entries, 12).unwrap().tile_id, 10);
        assert!(find_entry(&entries, 13).is_none());
        assert!(find_entry(&entries, 9).is_none());
        assert_eq!(find_entry(&entries, 20).unwrap().tile_id, 20);
        assert!(find_entry(&entries, 21).is_none());
    }

    #[test]
    fn test_find_entry_leaf_pointer_covers_following_ids() {
        let entries = vec![Entry { tile_id: 0, offset: 0, length: 9, run_length: 0 }];
        assert_eq!(find_entry(&entries, 1000).unwrap().run_length, 0);
    }

    #[test]
    fn test_parse_header_rejects_bad_magic() {
        let buf = vec![0u8; HEADER_LEN as usize];
        assert!(matches!(
            PmTilesHeader::parse(&buf),
            Err(ArchiveError::InvalidHeader(_))
        ));
    }

    #[test]
    fn test_parse_header_rejects_v2() {
        let mut buf = Fixture::default().build();
        buf[7] = 2;
        assert!(matches!(
            PmTilesHeader::parse(&buf),
            Err(ArchiveError::UnsupportedVersion(2))
        ));
    }

    #[test]
    fn test_parse_header_short_buffer() {
        assert!(PmTilesHeader::parse(b"PMTiles").is_err());
    }

    #[tokio::test]
    async fn test_reader_header_fields() {
        let reader = Fixture::default().reader();
        let header = reader.header().await.unwrap();
        assert_eq!(header.min_zoom, 0);
        assert_eq!(header.max_zoom, 1);
        assert_eq!(header.tile_type, 1);
        assert!((header.min_lon - 2.0).abs() < 1e-7);
        assert!((header.max_lat - 48.5).abs() < 1e-7);
    }

    #[tokio::test]
    async fn test_reader_metadata() {
        let reader = Fixture::default().reader();
        let metadata = reader.metadata().await.unwrap().unwrap();
        assert_eq!(metadata["name"], "fixture");
    }

    #[tokio::test]
    async fn test_reader_without_metadata() {
        let fixture = Fixture {
            metadata: None,
            ..Default::default()
        };
        assert!(fixture.reader().metadata().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_reader_finds_tiles() {
        let reader = Fixture::default().reader();
        assert_eq!(&reader.tile(0, 0, 0).await.unwrap().unwrap()[..], b"z0");
        assert_eq!(&reader.tile(1, 1, 0).await.unwrap().unwrap()[..], b"z1-1-0");
        assert_eq!(&reader.tile(1, 0, 1).await.unwrap().unwrap()[..], b"z1-0-1");
    }

    #[tokio::test]
    async fn test_reader_absent_tile_is_none() {
        let reader = Fixture::default().reader();
        assert!(reader.tile(1, 1, 1).await.unwrap().is_none());
        assert!(reader.tile(5, 3, 3).await.unwrap().is_none());
        assert!(reader.tile(1, 9, 9).await.unwrap().is_none());
    }

    fn reader_over(buf: Vec<u8>) -> PmTilesReader {
        PmTilesReader::new(Arc::new(BlobSource::new("crafted", buf)))
    }

    #[tokio::test]
    async fn test_reader_tile_offset_overflow_is_directory_error() {
        let mut buf = Fixture::default().build();
        // tile_data_offset
        buf[56..64].copy_from_slice(&u64::MAX.to_le_bytes());

        let err = reader_over(buf).tile(1, 0, 1).await.unwrap_err();
        assert!(matches!(err, ArchiveError::Directory(_)));
    }

    #[tokio::test]
    async fn test_reader_leaf_offset_overflow_is_directory_error() {
        let mut buf = Fixture::default().build();
        // Root directory: one leaf pointer at tile 0, length 9, offset 5.
        let root = [1u8, 0, 0, 9, 6];
        let root_off = HEADER_LEN as usize;
        buf[root_off..root_off + root.len()].copy_from_slice(&root);
        buf[16..24].copy_from_slice(&(root.len() as u64).to_le_bytes());
        // leaf_dirs_offset
        buf[40..48].copy_from_slice(&u64::MAX.to_le_bytes());

        let err = reader_over(buf).tile(0, 0, 0).await.unwrap_err();
        assert!(matches!(err, ArchiveError::Directory(_)));
    }

    #[tokio::test]
    async fn test_reader_gzip_directories_and_leaves() {
        let fixture = Fixture {
            gzip: true,
            leaf: true,
            ..Default::default()
        };
        let reader = fixture.reader();
        assert_eq!(&reader.tile(1, 0, 1).await.unwrap().unwrap()[..], b"z1-0-1");
        assert!(reader.tile(1, 1, 1).await.unwrap().is_none());
        assert_eq!(reader.metadata().await.unwrap().unwrap()["name"], "fixture");
    }

    #[tokio::test]
    async fn test_format_opens_reader() {
        let format = PmTilesFormat;
        assert_eq!(format.name(), "pmtiles");
        let source = Arc::new(BlobSource::new("f", Fixture::default().build()));
        let reader = format.open(source);
        assert_eq!(reader.header().await.unwrap().max_zoom, 1);
    }

    #[tokio::test]
    async fn test_truncated_archive_surfaces_source_error() {
        let mut bytes = Fixture::default().build();
        bytes.truncate(HEADER_LEN as usize + 2);
        let reader = PmTilesReader::new(Arc::new(BlobSource::new("cut", bytes)));
        assert!(matches!(
            reader.tile(0, 0, 0).await,
            Err(ArchiveError::Source(_))
        ));
    }
}
