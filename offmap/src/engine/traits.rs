//! Seams to the external rendering engine.

use std::sync::Arc;

use serde_json::Value;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

use crate::resolver::{ProtocolResponse, ResolveError};
use crate::storage::BoxFuture;
use crate::style::StyleDocument;

/// The engine refused an operation.
#[derive(Debug, Error)]
#[error("Engine rejected {operation} '{id}': {reason}")]
pub struct EngineError {
    pub operation: &'static str,
    pub id: String,
    pub reason: String,
}

/// Handler the engine calls for every URL under a registered scheme.
pub trait ProtocolHandler: Send + Sync {
    /// Resolve `url`. The engine cancels `token` when it no longer needs the
    /// answer.
    fn handle<'a>(
        &'a self,
        url: &'a str,
        token: &'a CancellationToken,
    ) -> BoxFuture<'a, Result<ProtocolResponse, ResolveError>>;
}

/// Handle on a rendering engine instance.
///
/// Sources and layer definitions are passed as JSON in the engine's own
/// style vocabulary.
pub trait MapEngine: Send + Sync {
    /// Route requests for `scheme://...` to `handler`.
    fn add_protocol(&self, scheme: &str, handler: Arc<dyn ProtocolHandler>);

    fn add_source(&self, id: &str, descriptor: Value) -> Result<(), EngineError>;

    fn remove_source(&self, id: &str) -> Result<(), EngineError>;

    /// Add a layer, below `before_id` if given, otherwise on top.
    fn add_layer(&self, definition: Value, before_id: Option<&str>) -> Result<(), EngineError>;

    fn remove_layer(&self, id: &str) -> Result<(), EngineError>;

    fn get_layer(&self, id: &str) -> Option<Value>;

    fn get_source(&self, id: &str) -> Option<Value>;

    fn set_layout_property(&self, id: &str, property: &str, value: Value)
        -> Result<(), EngineError>;

    /// Current style, layers in drawing order.
    fn get_style(&self) -> StyleDocument;
}
