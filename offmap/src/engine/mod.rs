//! Rendering-engine integration.
//!
//! The engine itself is external. [`MapEngine`] is the handle this crate
//! drives and [`ProtocolHandler`] is what the engine calls back into.
//! [`MapLoader`] implements activate, unload, remove and visibility on top.

mod layers;
mod loader;
mod traits;

pub use layers::{default_layers, layer_color};
pub use loader::{register_protocol, LoaderError, MapLoader};
pub use traits::{EngineError, MapEngine, ProtocolHandler};
