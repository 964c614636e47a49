//! Custom-scheme URL parsing.
//!
//! Two shapes are accepted:
//!
//! ```text
//! offmap://<name>               archive metadata
//! offmap://<name>/<z>/<x>/<y>   one tile
//! ```

use std::fmt;

use super::error::ResolveError;

/// URL scheme served by the resolver.
pub const SCHEME: &str = "offmap";

/// A parsed custom-scheme request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProtocolRequest {
    Metadata { name: String },
    Tile { name: String, z: u8, x: u32, y: u32 },
}

impl ProtocolRequest {
    /// Parse a custom-scheme URL.
    pub fn parse(url: &str) -> Result<Self, ResolveError> {
        let unsupported = || ResolveError::UnsupportedRequest(url.to_string());

        let path = url
            .strip_prefix(SCHEME)
            .and_then(|rest| rest.strip_prefix("://"))
            .ok_or_else(unsupported)?;
        let parts: Vec<&str> = path.split('/').collect();
        if parts[0].is_empty() {
            return Err(unsupported());
        }
        let name = parts[0].to_string();

        match parts.as_slice() {
            [_] => Ok(Self::Metadata { name }),
            [_, z, x, y] => Ok(Self::Tile {
                name,
                z: z.parse().map_err(|_| unsupported())?,
                x: x.parse().map_err(|_| unsupported())?,
                y: y.parse().map_err(|_| unsupported())?,
            }),
            _ => Err(unsupported()),
        }
    }

    /// Archive the request addresses.
    pub fn name(&self) -> &str {
        match self {
            Self::Metadata { name } | Self::Tile { name, .. } => name,
        }
    }

    /// Tile URL template for an archive, as handed to the engine.
    pub fn tile_template(name: &str) -> String {
        format!("{}://{}/{{z}}/{{x}}/{{y}}", SCHEME, name)
    }

    /// Metadata URL for an archive.
    pub fn metadata_url(name: &str) -> String {
        format!("{}://{}", SCHEME, name)
    }
}

impl fmt::Display for ProtocolRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Metadata { name } => write!(f, "{}://{}", SCHEME, name),
            Self::Tile { name, z, x, y } => write!(f, "{}://{}/{}/{}/{}", SCHEME, name, z, x, y),
        }
    }
}
