//! Shared fixtures for integration tests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Arc;

use bytes::Bytes;
use parking_lot::Mutex;
use serde_json::{Map, Value};

use offmap::archive::{tile_id, HEADER_LEN};
use offmap::download::{ByteRange, HttpResponse, HttpTransport, TransportError};
use offmap::engine::{EngineError, MapEngine, ProtocolHandler};
use offmap::status::{StatusReporter, StatusUpdate};
use offmap::style::{layer_id, StyleDocument};

// =============================================================================
// Archives
// =============================================================================

fn push_varint(out: &mut Vec<u8>, mut value: u64) {
    while value >= 0x80 {
        out.push((value as u8) | 0x80);
        value >>= 7;
    }
    out.push(value as u8);
}

/// Build an uncompressed PMTiles v3 archive.
pub fn build_pmtiles(tiles: &[(u8, u32, u32, &[u8])], metadata: &Value, tile_type: u8) -> Vec<u8> {
    let mut sorted: Vec<(u64, &[u8])> = tiles
        .iter()
        .map(|(z, x, y, d)| (tile_id(*z, *x, *y).unwrap(), *d))
        .collect();
    sorted.sort_by_key(|(id, _)| *id);

    let mut data = Vec::new();
    let mut offsets = Vec::new();
    for (_, bytes) in &sorted {
        offsets.push(data.len() as u64);
        data.extend_from_slice(bytes);
    }

    let mut root = Vec::new();
    push_varint(&mut root, sorted.len() as u64);
    let mut last = 0;
    for (id, _) in &sorted {
        push_varint(&mut root, id - last);
        last = *id;
    }
    for _ in &sorted {
        push_varint(&mut root, 1);
    }
    for (_, bytes) in &sorted {
        push_varint(&mut root, bytes.len() as u64);
    }
    for offset in &offsets {
        push_varint(&mut root, offset + 1);
    }

    let metadata = serde_json::to_vec(metadata).unwrap();

    let root_off = HEADER_LEN;
    let meta_off = root_off + root.len() as u64;
    let data_off = meta_off + metadata.len() as u64;

    let mut out = vec![0u8; HEADER_LEN as usize];
    out[0..7].copy_from_slice(b"PMTiles");
    out[7] = 3;
    let fields = [
        root_off,
        root.len() as u64,
        meta_off,
        metadata.len() as u64,
        data_off,
        0,
        data_off,
        data.len() as u64,
        sorted.len() as u64,
        sorted.len() as u64,
        sorted.len() as u64,
    ];
    for (i, v) in fields.iter().enumerate() {
        out[8 + i * 8..16 + i * 8].copy_from_slice(&v.to_le_bytes());
    }
    out[96] = 1;
    out[97] = 1;
    out[98] = 1;
    out[99] = tile_type;
    out[100] = tiles.iter().map(|t| t.0).min().unwrap_or(0);
    out[101] = tiles.iter().map(|t| t.0).max().unwrap_or(0);
    for (i, v) in [2.0f64, 48.0, 2.5, 48.5].iter().enumerate() {
        let e7 = (v * 10_000_000.0).round() as i32;
        out[102 + i * 4..106 + i * 4].copy_from_slice(&e7.to_le_bytes());
    }

    out.extend(root);
    out.extend(metadata);
    out.extend(data);
    out
}

/// A vector archive of Paris with two layers.
pub fn paris_archive() -> Vec<u8> {
    build_pmtiles(
        &[
            (0, 0, 0, b"world"),
            (1, 1, 0, b"north-east"),
            (2, 2, 1, b"paris"),
        ],
        &serde_json::json!({
            "name": "Paris",
            "attribution": "OpenStreetMap contributors",
            "vector_layers": [{"id": "roads"}, {"id": "water"}]
        }),
        1,
    )
}

// =============================================================================
// HTTP
// =============================================================================

/// Server that honors ranges, answering at most `max_chunk` bytes at a time.
/// `max_chunk == 0` means it ignores ranges and answers 200.
#[derive(Default)]
pub struct ScriptedServer {
    resources: HashMap<String, (Bytes, u64)>,
    requests: Mutex<Vec<Option<ByteRange>>>,
}

impl ScriptedServer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn serve(mut self, url: &str, body: impl Into<Bytes>, max_chunk: u64) -> Self {
        self.resources.insert(url.to_string(), (body.into(), max_chunk));
        self
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().len()
    }
}

impl HttpTransport for ScriptedServer {
    async fn get(&self, url: &str, range: Option<ByteRange>) -> Result<HttpResponse, TransportError> {
        self.requests.lock().push(range);
        let Some((body, max_chunk)) = self.resources.get(url) else {
            return Err(TransportError {
                url: url.to_string(),
                reason: "connection refused".to_string(),
            });
        };

        let len = body.len() as u64;
        match range {
            Some(range) if *max_chunk > 0 && range.start < len => {
                let mut end = (range.start + max_chunk - 1).min(len - 1);
                if let Some(requested) = range.end {
                    end = end.min(requested);
                }
                Ok(HttpResponse {
                    status: 206,
                    content_range: Some(format!("bytes {}-{}/{}", range.start, end, len)),
                    body: body.slice(range.start as usize..=end as usize),
                })
            }
            _ => Ok(HttpResponse {
                status: 200,
                content_range: None,
                body: body.clone(),
            }),
        }
    }
}

// =============================================================================
// Status
// =============================================================================

/// Reporter that keeps every update.
pub fn recording_reporter() -> (StatusReporter, Arc<Mutex<Vec<StatusUpdate>>>) {
    let updates = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&updates);
    let reporter = StatusReporter::from_fn(move |u| sink.lock().push(u.clone()));
    (reporter, updates)
}

// =============================================================================
// Engine
// =============================================================================

#[derive(Default)]
struct EngineState {
    protocols: HashMap<String, Arc<dyn ProtocolHandler>>,
    sources: Map<String, Value>,
    layers: Vec<Value>,
}

/// Engine that keeps sources and layers in memory.
#[derive(Default)]
pub struct TestEngine {
    state: Mutex<EngineState>,
}

impl TestEngine {
    pub fn handler(&self, scheme: &str) -> Option<Arc<dyn ProtocolHandler>> {
        self.state.lock().protocols.get(scheme).cloned()
    }

    pub fn layer_ids(&self) -> Vec<String> {
        self.state
            .lock()
            .layers
            .iter()
            .filter_map(layer_id)
            .map(str::to_string)
            .collect()
    }
}

fn rejected(operation: &'static str, id: &str, reason: &str) -> EngineError {
    EngineError {
        operation,
        id: id.to_string(),
        reason: reason.to_string(),
    }
}

impl MapEngine for TestEngine {
    fn add_protocol(&self, scheme: &str, handler: Arc<dyn ProtocolHandler>) {
        self.state.lock().protocols.insert(scheme.to_string(), handler);
    }

    fn add_source(&self, id: &str, descriptor: Value) -> Result<(), EngineError> {
        let mut state = self.state.lock();
        if state.sources.contains_key(id) {
            return Err(rejected("add_source", id, "already exists"));
        }
        state.sources.insert(id.to_string(), descriptor);
        Ok(())
    }

    fn remove_source(&self, id: &str) -> Result<(), EngineError> {
        self.state
            .lock()
            .sources
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| rejected("remove_source", id, "no such source"))
    }

    fn add_layer(&self, definition: Value, _before_id: Option<&str>) -> Result<(), EngineError> {
        self.state.lock().layers.push(definition);
        Ok(())
    }

    fn remove_layer(&self, id: &str) -> Result<(), EngineError> {
        let mut state = self.state.lock();
        let before = state.layers.len();
        state.layers.retain(|l| layer_id(l) != Some(id));
        if state.layers.len() == before {
            return Err(rejected("remove_layer", id, "no such layer"));
        }
        Ok(())
    }

    fn get_layer(&self, id: &str) -> Option<Value> {
        self.state
            .lock()
            .layers
            .iter()
            .find(|l| layer_id(l) == Some(id))
            .cloned()
    }

    fn get_source(&self, id: &str) -> Option<Value> {
        self.state.lock().sources.get(id).cloned()
    }

    fn set_layout_property(&self, id: &str, property: &str, value: Value) -> Result<(), EngineError> {
        let mut state = self.state.lock();
        let layer = state
            .layers
            .iter_mut()
            .find(|l| layer_id(l) == Some(id))
            .ok_or_else(|| rejected("set_layout_property", id, "no such layer"))?;
        layer["layout"][property] = value;
        Ok(())
    }

    fn get_style(&self) -> StyleDocument {
        StyleDocument::with_layers(self.state.lock().layers.clone())
    }
}
