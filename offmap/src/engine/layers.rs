//! Default layers for archives without a stored style.

use serde_json::{json, Value};

use crate::resolver::{SourceKind, TileSourceDescriptor};

/// Hue step between consecutive vector layers, in degrees.
const HUE_STEP: usize = 137;

/// Color for the vector layer at `index`.
///
/// Consecutive indices land far apart on the color wheel, and the same index
/// always gets the same color.
pub fn layer_color(index: usize) -> String {
    format!("hsl({}, 70%, 50%)", (index * HUE_STEP) % 360)
}

/// Layers that draw every feature of archive `name`.
///
/// Raster archives get one raster layer. Vector archives get a fill, a line
/// and a circle layer per entry of `vector_layers`, all three in the color
/// of that entry.
pub fn default_layers(name: &str, descriptor: &TileSourceDescriptor) -> Vec<Value> {
    if descriptor.kind == SourceKind::Raster {
        return vec![json!({
            "id": format!("{}-raster", name),
            "type": "raster",
            "source": name,
        })];
    }

    descriptor
        .vector_layer_ids()
        .iter()
        .enumerate()
        .flat_map(|(index, layer)| {
            let color = layer_color(index);
            [
                json!({
                    "id": format!("{}-{}-fill", name, layer),
                    "type": "fill",
                    "source": name,
                    "source-layer": layer,
                    "filter": ["==", "$type", "Polygon"],
                    "paint": {"fill-color": color, "fill-opacity": 0.4},
                }),
                json!({
                    "id": format!("{}-{}-line", name, layer),
                    "type": "line",
                    "source": name,
                    "source-layer": layer,
                    "filter": ["==", "$type", "LineString"],
                    "paint": {"line-color": color, "line-width": 1},
                }),
                json!({
                    "id": format!("{}-{}-circle", name, layer),
                    "type": "circle",
                    "source": name,
                    "source-layer": layer,
                    "filter": ["==", "$type", "Point"],
                    "paint": {"circle-color": color, "circle-radius": 3},
                }),
            ]
        })
        .collect()
}
