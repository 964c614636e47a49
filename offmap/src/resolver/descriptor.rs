//! Tile-source descriptors built from archive header and metadata.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::request::ProtocolRequest;
use crate::archive::{ArchiveHeader, TILE_TYPE_JPEG, TILE_TYPE_PNG, TILE_TYPE_WEBP};

/// Whether an archive holds vector or raster tiles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    Vector,
    Raster,
}

/// Encoding of individual tiles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TileFormat {
    Pbf,
    Png,
    Jpeg,
    Webp,
}

impl TileFormat {
    /// Map an archive tile type code. Unknown codes are treated as vector.
    pub fn from_tile_type(code: u8) -> Self {
        match code {
            TILE_TYPE_PNG => Self::Png,
            TILE_TYPE_JPEG => Self::Jpeg,
            TILE_TYPE_WEBP => Self::Webp,
            _ => Self::Pbf,
        }
    }

    pub fn kind(&self) -> SourceKind {
        match self {
            Self::Pbf => SourceKind::Vector,
            Self::Png | Self::Jpeg | Self::Webp => SourceKind::Raster,
        }
    }
}

/// Source definition handed to the rendering engine for one archive.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TileSourceDescriptor {
    #[serde(rename = "type")]
    pub kind: SourceKind,
    pub format: TileFormat,
    pub tiles: Vec<String>,
    pub minzoom: u8,
    pub maxzoom: u8,
    pub bounds: [f64; 4],
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attribution: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vector_layers: Option<Value>,
}

impl TileSourceDescriptor {
    /// Build the descriptor for archive `name`.
    ///
    /// Header bounds and zooms are used unless the header has no longitude
    /// extent (both longitude bounds zero) and the metadata carries a
    /// `"w,s,e,n"` bounds string. Only when that bounds fallback does not
    /// apply do numeric `minzoom`/`maxzoom` metadata entries replace the
    /// header zooms.
    pub fn describe(name: &str, header: &ArchiveHeader, metadata: Option<&Value>) -> Self {
        let format = TileFormat::from_tile_type(header.tile_type);
        let mut bounds = header.bounds();
        let mut minzoom = header.min_zoom;
        let mut maxzoom = header.max_zoom;

        let fallback_bounds = if header.min_lon == 0.0 && header.max_lon == 0.0 {
            metadata.and_then(|m| m.get("bounds")).and_then(parse_bounds)
        } else {
            None
        };
        if let Some(fallback) = fallback_bounds {
            bounds = fallback;
        } else if let Some(metadata) = metadata {
            if let Some(z) = metadata.get("minzoom").and_then(zoom_value) {
                minzoom = z;
            }
            if let Some(z) = metadata.get("maxzoom").and_then(zoom_value) {
                maxzoom = z;
            }
        }

        let text = |key: &str| {
            metadata
                .and_then(|m| m.get(key))
                .and_then(Value::as_str)
                .map(str::to_string)
        };

        Self {
            kind: format.kind(),
            format,
            tiles: vec![ProtocolRequest::tile_template(name)],
            minzoom,
            maxzoom,
            bounds,
            name: text("name"),
            attribution: text("attribution"),
            vector_layers: metadata.and_then(|m| m.get("vector_layers")).cloned(),
        }
    }

    /// Ids of the vector layers listed in the metadata.
    pub fn vector_layer_ids(&self) -> Vec<String> {
        self.vector_layers
            .as_ref()
            .and_then(Value::as_array)
            .map(|layers| {
                layers
                    .iter()
                    .filter_map(|l| l.get("id").and_then(Value::as_str))
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default()
    }
}

/// Parse a `"w,s,e,n"` bounds string.
fn parse_bounds(value: &Value) -> Option<[f64; 4]> {
    let parts: Vec<f64> = value
        .as_str()?
        .split(',')
        .map(|p| p.trim().parse::<f64>())
        .collect::<Result<_, _>>()
        .ok()?;
    parts.try_into().ok()
}

/// A zoom level given as a JSON number or a numeric string.
fn zoom_value(value: &Value) -> Option<u8> {
    match value {
        Value::Number(n) => n.as_u64().and_then(|z| u8::try_from(z).ok()),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}
