//! Showing, hiding and removing stored archives on a rendering engine.

use std::sync::Arc;

use dashmap::DashMap;
use serde_json::Value;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use super::layers::default_layers;
use super::traits::{EngineError, MapEngine};
use crate::resolver::{
    ProtocolRequest, ProtocolResolver, ProtocolResponse, ResolveError, TileSourceDescriptor,
    SCHEME,
};
use crate::storage::{load_style, StorageError};
use crate::style::{layer_id, layer_source};

/// Errors raised by [`MapLoader`] operations.
#[derive(Debug, Error)]
pub enum LoaderError {
    #[error(transparent)]
    Resolve(#[from] ResolveError),

    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error("Descriptor could not be encoded: {0}")]
    Descriptor(#[from] serde_json::Error),
}

/// Register `resolver` as the handler for the custom scheme on `engine`.
///
/// Call once per engine instance before activating archives.
pub fn register_protocol(engine: &dyn MapEngine, resolver: Arc<ProtocolResolver>) {
    engine.add_protocol(SCHEME, resolver);
    debug!(scheme = SCHEME, "Registered protocol handler");
}

/// Drives the engine for stored archives.
///
/// Clones share the record of which layers each activation added.
#[derive(Debug, Clone)]
pub struct MapLoader {
    resolver: Arc<ProtocolResolver>,
    added_layers: Arc<DashMap<String, Vec<String>>>,
}

impl MapLoader {
    pub fn new(resolver: Arc<ProtocolResolver>) -> Self {
        Self {
            resolver,
            added_layers: Arc::new(DashMap::new()),
        }
    }

    pub fn resolver(&self) -> &Arc<ProtocolResolver> {
        &self.resolver
    }

    /// Metadata descriptor for archive `name`.
    pub async fn descriptor(&self, name: &str) -> Result<TileSourceDescriptor, LoaderError> {
        let url = ProtocolRequest::metadata_url(name);
        match self.resolver.resolve(&url, &CancellationToken::new()).await? {
            ProtocolResponse::Metadata(descriptor) => Ok(descriptor),
            _ => Err(ResolveError::UnsupportedRequest(url).into()),
        }
    }

    /// Add archive `name` as a source and draw it.
    ///
    /// Layers come from the stored style when there is one, otherwise from
    /// [`default_layers`]. Layers the engine already has are skipped.
    /// Returns the ids of the layers added.
    pub async fn activate(
        &self,
        engine: &dyn MapEngine,
        name: &str,
    ) -> Result<Vec<String>, LoaderError> {
        let descriptor = self.descriptor(name).await?;
        if engine.get_source(name).is_none() {
            engine.add_source(name, serde_json::to_value(&descriptor)?)?;
        }

        let layers = match load_style(self.resolver.store().as_ref(), name).await {
            Some(style) if !style.layers.is_empty() => style.layers,
            _ => default_layers(name, &descriptor),
        };

        let mut added = Vec::new();
        for layer in layers {
            let Some(id) = layer_id(&layer).map(str::to_string) else {
                continue;
            };
            if engine.get_layer(&id).is_some() {
                continue;
            }
            engine.add_layer(layer, None)?;
            added.push(id);
        }

        let mut record = self.added_layers.entry(name.to_string()).or_default();
        for id in &added {
            if !record.contains(id) {
                record.push(id.clone());
            }
        }
        drop(record);

        info!(name = name, layers = added.len(), "Activated archive");
        Ok(added)
    }

    /// Remove archive `name` from the engine. Storage is left untouched.
    ///
    /// Returns the ids of the layers removed.
    pub fn unload(&self, engine: &dyn MapEngine, name: &str) -> Result<Vec<String>, LoaderError> {
        let ids = self.archive_layer_ids(engine, name);
        for id in &ids {
            engine.remove_layer(id)?;
        }
        self.added_layers.remove(name);
        if engine.get_source(name).is_some() {
            engine.remove_source(name)?;
        }
        debug!(name = name, layers = ids.len(), "Unloaded archive");
        Ok(ids)
    }

    /// Unload archive `name` and delete it and its style from storage.
    pub async fn remove(&self, engine: &dyn MapEngine, name: &str) -> Result<(), LoaderError> {
        self.unload(engine, name)?;
        let store = self.resolver.store();
        store.delete_archive(name).await?;
        store.delete_style(name).await?;
        info!(name = name, "Removed archive");
        Ok(())
    }

    /// Show or hide every layer drawing archive `name`.
    pub fn set_visibility(
        &self,
        engine: &dyn MapEngine,
        name: &str,
        visible: bool,
    ) -> Result<(), LoaderError> {
        let value = Value::from(if visible { "visible" } else { "none" });
        for id in self.archive_layer_ids(engine, name) {
            engine.set_layout_property(&id, "visibility", value.clone())?;
        }
        Ok(())
    }

    /// Ids of the engine layers belonging to archive `name`: those drawing
    /// its source plus those [`activate`](Self::activate) added for it.
    /// Layers no longer on the engine are left out.
    fn archive_layer_ids(&self, engine: &dyn MapEngine, name: &str) -> Vec<String> {
        let recorded = self
            .added_layers
            .get(name)
            .map(|ids| ids.value().clone())
            .unwrap_or_default();
        engine
            .get_style()
            .layers
            .iter()
            .filter_map(|layer| {
                let id = layer_id(layer)?;
                let owned = layer_source(layer) == Some(name) || recorded.iter().any(|r| r == id);
                owned.then(|| id.to_string())
            })
            .collect()
    }
}
