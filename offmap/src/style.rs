//! Style documents.
//!
//! A style is an ordered list of layer definitions plus whatever auxiliary
//! fields the producer put next to it (`version`, `sprite`, `glyphs`, ...).
//! Layers and auxiliary fields are kept verbatim as JSON; only `layers` is
//! interpreted.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A style document: layer definitions plus auxiliary fields.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StyleDocument {
    #[serde(default)]
    pub layers: Vec<Value>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl StyleDocument {
    /// Style with the given layers and no auxiliary fields.
    pub fn with_layers(layers: Vec<Value>) -> Self {
        Self {
            layers,
            extra: Map::new(),
        }
    }

    /// Parse a style from JSON text. Only JSON objects are accepted.
    pub fn parse(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    /// Ids of all layers, in order. Layers without an id are skipped.
    pub fn layer_ids(&self) -> Vec<&str> {
        self.layers.iter().filter_map(layer_id).collect()
    }
}

/// The `id` of a layer definition.
pub fn layer_id(layer: &Value) -> Option<&str> {
    layer.get("id").and_then(Value::as_str)
}

/// The `source` a layer definition draws from.
pub fn layer_source(layer: &Value) -> Option<&str> {
    layer.get("source").and_then(Value::as_str)
}
