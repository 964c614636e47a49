//! Resolution of custom-scheme requests against stored archives.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use bytes::Bytes;
use dashmap::DashMap;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, trace};

use super::descriptor::TileSourceDescriptor;
use super::error::ResolveError;
use super::request::ProtocolRequest;
use crate::archive::{ArchiveFormat, PmTilesFormat};
use crate::engine::ProtocolHandler;
use crate::status::StatusReporter;
use crate::storage::{ArchiveStore, BoxFuture};

/// Answer to a custom-scheme request.
#[derive(Debug, Clone, PartialEq)]
pub enum ProtocolResponse {
    /// Source descriptor for a metadata request.
    Metadata(TileSourceDescriptor),
    /// Raw tile bytes.
    Tile(Bytes),
    /// The tile is not in the archive.
    Empty,
}

/// Steps a request passes through. Cancellation is checked before each.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ResolveState {
    Received,
    Validating,
    LoadingArchive,
    MetadataResolution,
    TileLookup,
    Responding,
}

impl fmt::Display for ResolveState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Received => "received",
            Self::Validating => "validating",
            Self::LoadingArchive => "loading-archive",
            Self::MetadataResolution => "metadata-resolution",
            Self::TileLookup => "tile-lookup",
            Self::Responding => "responding",
        };
        f.write_str(name)
    }
}

/// Tracks one request through its states.
struct Transitions<'a> {
    url: &'a str,
    token: &'a CancellationToken,
    state: ResolveState,
}

impl<'a> Transitions<'a> {
    fn new(url: &'a str, token: &'a CancellationToken) -> Self {
        trace!(url = url, state = %ResolveState::Received, "Resolver state");
        Self {
            url,
            token,
            state: ResolveState::Received,
        }
    }

    fn advance(&mut self, next: ResolveState) -> Result<(), ResolveError> {
        if self.token.is_cancelled() {
            return Err(ResolveError::Aborted);
        }
        trace!(url = self.url, from = %self.state, to = %next, "Resolver state");
        self.state = next;
        Ok(())
    }
}

/// A request registered in the in-flight table.
#[derive(Debug, Clone)]
pub struct InflightRequest {
    pub id: u64,
    pub url: String,
    pub token: CancellationToken,
}

/// Serves custom-scheme requests from an [`ArchiveStore`].
pub struct ProtocolResolver {
    store: Arc<dyn ArchiveStore>,
    format: Arc<dyn ArchiveFormat>,
    reporter: StatusReporter,
    inflight: DashMap<u64, CancellationToken>,
    next_id: AtomicU64,
}

impl fmt::Debug for ProtocolResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProtocolResolver")
            .field("format", &self.format.name())
            .field("inflight", &self.inflight.len())
            .finish()
    }
}

impl ProtocolResolver {
    /// Resolver reading PMTiles archives from `store`.
    pub fn new(store: Arc<dyn ArchiveStore>) -> Self {
        Self {
            store,
            format: Arc::new(PmTilesFormat),
            reporter: StatusReporter::silent(),
            inflight: DashMap::new(),
            next_id: AtomicU64::new(1),
        }
    }

    /// Use a different archive format.
    pub fn with_format(mut self, format: Arc<dyn ArchiveFormat>) -> Self {
        self.format = format;
        self
    }

    /// Report failures through `reporter`.
    pub fn with_reporter(mut self, reporter: StatusReporter) -> Self {
        self.reporter = reporter;
        self
    }

    pub fn store(&self) -> &Arc<dyn ArchiveStore> {
        &self.store
    }

    /// Resolve a custom-scheme URL.
    ///
    /// Cancellation yields [`ResolveError::Aborted`], which is neither
    /// reported nor logged as an error. Other failures are logged, reported
    /// as ERROR and returned.
    pub async fn resolve(
        &self,
        url: &str,
        token: &CancellationToken,
    ) -> Result<ProtocolResponse, ResolveError> {
        match self.run(url, token).await {
            Ok(response) => Ok(response),
            Err(ResolveError::Aborted) => {
                debug!(url = url, "Request aborted");
                Err(ResolveError::Aborted)
            }
            Err(e) => {
                error!(url = url, error = %e, "Failed to resolve request");
                self.reporter.error(e.to_string());
                Err(e)
            }
        }
    }

    async fn run(
        &self,
        url: &str,
        token: &CancellationToken,
    ) -> Result<ProtocolResponse, ResolveError> {
        let mut states = Transitions::new(url, token);

        states.advance(ResolveState::Validating)?;
        let request = ProtocolRequest::parse(url)?;

        states.advance(ResolveState::LoadingArchive)?;
        let source = self
            .store
            .open_archive(request.name())
            .await?
            .ok_or_else(|| ResolveError::NotFound {
                name: request.name().to_string(),
            })?;
        let reader = self.format.open(source);

        let response = match &request {
            ProtocolRequest::Metadata { name } => {
                states.advance(ResolveState::MetadataResolution)?;
                let header = reader.header().await?;
                let metadata = reader.metadata().await?;
                ProtocolResponse::Metadata(TileSourceDescriptor::describe(
                    name,
                    &header,
                    metadata.as_ref(),
                ))
            }
            ProtocolRequest::Tile { z, x, y, .. } => {
                states.advance(ResolveState::TileLookup)?;
                match reader.tile(*z, *x, *y).await? {
                    Some(bytes) => ProtocolResponse::Tile(bytes),
                    None => ProtocolResponse::Empty,
                }
            }
        };

        states.advance(ResolveState::Responding)?;
        Ok(response)
    }

    /// Register a request in the in-flight table.
    pub fn begin(&self, url: impl Into<String>) -> InflightRequest {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let token = CancellationToken::new();
        self.inflight.insert(id, token.clone());
        InflightRequest {
            id,
            url: url.into(),
            token,
        }
    }

    /// Cancel an in-flight request. Returns whether it was still in flight.
    pub fn cancel(&self, id: u64) -> bool {
        match self.inflight.get(&id) {
            Some(token) => {
                token.cancel();
                true
            }
            None => false,
        }
    }

    /// Resolve a registered request and remove it from the table.
    pub async fn fetch(
        &self,
        request: &InflightRequest,
    ) -> Result<ProtocolResponse, ResolveError> {
        let result = self.resolve(&request.url, &request.token).await;
        self.inflight.remove(&request.id);
        result
    }

    /// Number of registered requests not yet fetched.
    pub fn inflight_count(&self) -> usize {
        self.inflight.len()
    }
}

impl ProtocolHandler for ProtocolResolver {
    fn handle<'a>(
        &'a self,
        url: &'a str,
        token: &'a CancellationToken,
    ) -> BoxFuture<'a, Result<ProtocolResponse, ResolveError>> {
        Box::pin(self.resolve(url, token))
    }
}
