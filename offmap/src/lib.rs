//! OffMap - offline map tile archives
//!
//! Downloads single-file tile archives (PMTiles v3) over HTTP, keeps them in
//! a local store and serves their tiles and metadata to a rendering engine
//! through the `offmap://` scheme.
//!
//! # Layout
//!
//! - [`download`]: chunked HTTP acquisition with progress reporting
//! - [`storage`]: the archive and style tables ([`MemoryStore`], [`DiskStore`])
//! - [`archive`]: random-access archive reading
//! - [`resolver`]: `offmap://` request resolution with cancellation
//! - [`engine`]: the rendering-engine seam and [`MapLoader`]
//! - [`config`], [`logging`]: ambient setup used by the CLI
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use offmap::{DownloadManager, DownloadRequest, MemoryStore, ProtocolResolver};
//! use offmap::download::ReqwestTransport;
//! use offmap::status::StatusReporter;
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn run() -> offmap::error::Result<()> {
//! let store = Arc::new(MemoryStore::new());
//! let transport = ReqwestTransport::new(
//!     std::time::Duration::from_secs(300),
//!     offmap::download::DEFAULT_USER_AGENT,
//! )?;
//! let manager = DownloadManager::new(transport, store.clone());
//! manager
//!     .download(
//!         DownloadRequest::new("https://example.com/paris.pmtiles", "paris"),
//!         &StatusReporter::silent(),
//!     )
//!     .await?;
//!
//! let resolver = ProtocolResolver::new(store);
//! let tile = resolver
//!     .resolve("offmap://paris/12/2074/1409", &CancellationToken::new())
//!     .await?;
//! # let _ = tile;
//! # Ok(())
//! # }
//! ```

pub mod archive;
pub mod config;
pub mod download;
pub mod engine;
pub mod error;
pub mod logging;
pub mod resolver;
pub mod status;
pub mod storage;
pub mod style;

pub use download::{DownloadManager, DownloadRequest, DownloadSummary};
pub use engine::{MapEngine, MapLoader};
pub use error::OffmapError;
pub use resolver::{ProtocolResolver, ProtocolResponse};
pub use status::{StatusCode, StatusReporter, StatusUpdate};
pub use storage::{ArchiveStore, DiskStore, MemoryStore};
