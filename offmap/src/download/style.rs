//! Style sources accepted alongside a download.

use tracing::debug;

use super::error::{DownloadError, DownloadResult};
use super::http::HttpTransport;
use crate::style::StyleDocument;

/// Where the style for a downloaded archive comes from.
#[derive(Debug, Clone, PartialEq)]
pub enum StyleSource {
    /// Either inline style JSON or a URL to fetch it from.
    Text(String),
    /// An already-parsed style.
    Document(StyleDocument),
}

impl From<&str> for StyleSource {
    fn from(text: &str) -> Self {
        Self::Text(text.to_string())
    }
}

impl From<StyleDocument> for StyleSource {
    fn from(document: StyleDocument) -> Self {
        Self::Document(document)
    }
}

impl StyleSource {
    /// Produce the style document, fetching it if the text is not JSON.
    pub async fn resolve<T: HttpTransport>(self, transport: &T) -> DownloadResult<StyleDocument> {
        let text = match self {
            Self::Document(document) => return Ok(document),
            Self::Text(text) => text,
        };
        if let Ok(document) = StyleDocument::parse(&text) {
            return Ok(document);
        }

        let url = text.trim();
        debug!(url = url, "Style is not inline JSON, fetching");
        let fetch_failed = |reason: String| DownloadError::StyleFetchFailed {
            url: url.to_string(),
            reason,
        };

        let response = transport
            .get(url, None)
            .await
            .map_err(|e| fetch_failed(e.reason))?;
        if !response.is_success() {
            return Err(fetch_failed(format!("HTTP {}", response.status)));
        }
        let body = std::str::from_utf8(&response.body)
            .map_err(|e| fetch_failed(format!("body is not UTF-8: {}", e)))?;
        StyleDocument::parse(body).map_err(|e| fetch_failed(format!("invalid style JSON: {}", e)))
    }
}
