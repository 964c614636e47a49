//! Custom-scheme protocol resolution.
//!
//! The rendering engine asks for `offmap://<name>` (source metadata) and
//! `offmap://<name>/<z>/<x>/<y>` (tiles). [`ProtocolResolver`] answers both
//! from the archive store through random-access reads, never loading an
//! archive whole unless the store can only hand out blobs.

mod descriptor;
mod error;
mod request;
#[allow(clippy::module_inception)]
mod resolver;

pub use descriptor::{SourceKind, TileFormat, TileSourceDescriptor};
pub use error::ResolveError;
pub use request::{ProtocolRequest, SCHEME};
pub use resolver::{InflightRequest, ProtocolResolver, ProtocolResponse};
