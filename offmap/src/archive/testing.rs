//! PMTiles archives built in memory for unit tests.

use std::io::Write;
use std::sync::Arc;

use flate2::write::GzEncoder;

use super::pmtiles::{tile_id, Entry, PmTilesReader, HEADER_LEN, MAGIC, SPEC_VERSION};
use super::source::BlobSource;

pub(crate) fn push_varint(out: &mut Vec<u8>, mut value: u64) {
    while value >= 0x80 {
        out.push((value as u8) | 0x80);
        value >>= 7;
    }
    out.push(value as u8);
}

fn encode_directory(entries: &[Entry]) -> Vec<u8> {
    let mut out = Vec::new();
    push_varint(&mut out, entries.len() as u64);
    let mut last = 0;
    for e in entries {
        push_varint(&mut out, e.tile_id - last);
        last = e.tile_id;
    }
    for e in entries {
        push_varint(&mut out, e.run_length as u64);
    }
    for e in entries {
        push_varint(&mut out, e.length as u64);
    }
    for e in entries {
        push_varint(&mut out, e.offset + 1);
    }
    out
}

fn gzip(data: &[u8]) -> Vec<u8> {
    let mut enc = GzEncoder::new(Vec::new(), flate2::Compression::default());
    enc.write_all(data).unwrap();
    enc.finish().unwrap()
}

/// A small archive: three tiles over zooms 0 and 1 plus a metadata block.
pub(crate) struct PmTilesFixture {
    pub tiles: Vec<(u8, u32, u32, Vec<u8>)>,
    pub metadata: Option<serde_json::Value>,
    pub tile_type: u8,
    pub bounds: [f64; 4],
    pub gzip: bool,
    pub leaf: bool,
}

impl Default for PmTilesFixture {
    fn default() -> Self {
        Self {
            tiles: vec![
                (0, 0, 0, b"z0".to_vec()),
                (1, 0, 1, b"z1-0-1".to_vec()),
                (1, 1, 0, b"z1-1-0".to_vec()),
            ],
            metadata: Some(serde_json::json!({"name": "fixture"})),
            tile_type: 1,
            bounds: [2.0, 48.0, 2.5, 48.5],
            gzip: false,
            leaf: false,
        }
    }
}

impl PmTilesFixture {
    pub fn build(&self) -> Vec<u8> {
        let mut tiles: Vec<(u64, &Vec<u8>)> = self
            .tiles
            .iter()
            .map(|(z, x, y, d)| (tile_id(*z, *x, *y).unwrap(), d))
            .collect();
        tiles.sort_by_key(|(id, _)| *id);

        let mut data = Vec::new();
        let mut entries = Vec::new();
        for (id, bytes) in &tiles {
            entries.push(Entry {
                tile_id: *id,
                offset: data.len() as u64,
                length: bytes.len() as u32,
                run_length: 1,
            });
            data.extend_from_slice(bytes);
        }

        let compress = |raw: Vec<u8>| if self.gzip { gzip(&raw) } else { raw };
        let (root, leaves) = if self.leaf {
            let leaf = compress(encode_directory(&entries));
            let pointer = Entry {
                tile_id: entries[0].tile_id,
                offset: 0,
                length: leaf.len() as u32,
                run_length: 0,
            };
            (compress(encode_directory(&[pointer])), leaf)
        } else {
            (compress(encode_directory(&entries)), Vec::new())
        };
        let metadata = self
            .metadata
            .as_ref()
            .map(|m| compress(serde_json::to_vec(m).unwrap()))
            .unwrap_or_default();

        let root_off = HEADER_LEN;
        let meta_off = root_off + root.len() as u64;
        let leaf_off = meta_off + metadata.len() as u64;
        let data_off = leaf_off + leaves.len() as u64;

        let mut h = vec![0u8; HEADER_LEN as usize];
        h[0..7].copy_from_slice(MAGIC);
        h[7] = SPEC_VERSION;
        let fields = [
            root_off,
            root.len() as u64,
            meta_off,
            metadata.len() as u64,
            leaf_off,
            leaves.len() as u64,
            data_off,
            data.len() as u64,
            tiles.len() as u64,
            tiles.len() as u64,
            tiles.len() as u64,
        ];
        for (i, v) in fields.iter().enumerate() {
            h[8 + i * 8..16 + i * 8].copy_from_slice(&v.to_le_bytes());
        }
        h[96] = 1;
        h[97] = if self.gzip { 2 } else { 1 };
        h[98] = 1;
        h[99] = self.tile_type;
        h[100] = self.tiles.iter().map(|t| t.0).min().unwrap_or(0);
        h[101] = self.tiles.iter().map(|t| t.0).max().unwrap_or(0);
        for (i, v) in self.bounds.iter().enumerate() {
            let e7 = (v * 10_000_000.0).round() as i32;
            h[102 + i * 4..106 + i * 4].copy_from_slice(&e7.to_le_bytes());
        }

        let mut out = h;
        out.extend(root);
        out.extend(metadata);
        out.extend(leaves);
        out.extend(data);
        out
    }

    pub fn reader(&self) -> PmTilesReader {
        PmTilesReader::new(Arc::new(BlobSource::new("fixture", self.build())))
    }
}
