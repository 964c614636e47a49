//! HTTP transport for archive and style downloads.
//!
//! The download manager only needs one operation: a GET with an optional
//! `Range` header, answered with status, `Content-Range` and body. Keeping
//! that behind [`HttpTransport`] lets tests script servers that answer in
//! full, in ranges, or not at all.

use std::future::Future;
use std::time::Duration;

use bytes::Bytes;
use reqwest::header::{CONTENT_RANGE, RANGE};
use thiserror::Error;
use tracing::{debug, trace, warn};

/// Default timeout for HTTP requests in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 300;

/// Default user agent sent with every request.
pub const DEFAULT_USER_AGENT: &str = concat!("offmap/", env!("CARGO_PKG_VERSION"));

/// HTTP status for a partial-content response.
pub const STATUS_PARTIAL_CONTENT: u16 = 206;

/// A byte range for a `Range: bytes=...` request header.
///
/// `end` is inclusive; `None` means "to the end of the resource".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ByteRange {
    pub start: u64,
    pub end: Option<u64>,
}

impl ByteRange {
    /// Everything from `start` onwards.
    pub fn starting_at(start: u64) -> Self {
        Self { start, end: None }
    }

    /// At most `len` bytes beginning at `start`. `len` must be non-zero.
    pub fn sized(start: u64, len: u64) -> Self {
        Self {
            start,
            end: Some(start + len.max(1) - 1),
        }
    }

    /// Value for the `Range` request header.
    pub fn header_value(&self) -> String {
        match self.end {
            Some(end) => format!("bytes={}-{}", self.start, end),
            None => format!("bytes={}-", self.start),
        }
    }
}

/// A fully-read HTTP response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub content_range: Option<String>,
    pub body: Bytes,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn is_partial(&self) -> bool {
        self.status == STATUS_PARTIAL_CONTENT
    }
}

/// The request never produced a response.
#[derive(Debug, Error)]
#[error("Request to {url} failed: {reason}")]
pub struct TransportError {
    pub url: String,
    pub reason: String,
}

/// Async HTTP GET with optional byte range.
pub trait HttpTransport: Send + Sync {
    /// Issue a GET request and read the whole body.
    ///
    /// Non-success statuses are returned as responses, not errors.
    fn get(
        &self,
        url: &str,
        range: Option<ByteRange>,
    ) -> impl Future<Output = Result<HttpResponse, TransportError>> + Send;
}

/// [`HttpTransport`] over an async `reqwest::Client`.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    /// Create a transport with the given timeout and user agent.
    pub fn new(timeout: Duration, user_agent: &str) -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(user_agent)
            .build()
            .map_err(|e| TransportError {
                url: String::new(),
                reason: format!("Failed to create HTTP client: {}", e),
            })?;
        Ok(Self { client })
    }

    /// Wrap an existing client.
    pub fn from_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

impl HttpTransport for ReqwestTransport {
    async fn get(&self, url: &str, range: Option<ByteRange>) -> Result<HttpResponse, TransportError> {
        trace!(url = url, range = ?range, "HTTP GET request starting");

        let mut request = self.client.get(url);
        if let Some(range) = range {
            request = request.header(RANGE, range.header_value());
        }

        let response = request.send().await.map_err(|e| {
            warn!(
                url = url,
                error = %e,
                is_connect = e.is_connect(),
                is_timeout = e.is_timeout(),
                "HTTP request failed"
            );
            TransportError {
                url: url.to_string(),
                reason: e.to_string(),
            }
        })?;

        let status = response.status().as_u16();
        let content_range = response
            .headers()
            .get(CONTENT_RANGE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        debug!(url = url, status = status, content_range = ?content_range, "HTTP response received");

        let body = response.bytes().await.map_err(|e| TransportError {
            url: url.to_string(),
            reason: format!("Failed to read response: {}", e),
        })?;
        trace!(url = url, bytes = body.len(), "HTTP response body read");

        Ok(HttpResponse {
            status,
            content_range,
            body,
        })
    }
}

#[cfg(test)]
pub(crate) mod mock {
    //! Scripted in-process server for download tests.

    use std::collections::HashMap;

    use parking_lot::Mutex;

    use super::*;

    /// How a mock resource answers range requests.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub enum RangeMode {
        /// Ignore ranges, always 200 with the full body.
        Full,
        /// Honor ranges, serving at most `max_chunk` bytes per response.
        Partial { max_chunk: u64 },
        /// 206 with the full body and no `Content-Range`.
        PartialWithoutHeader,
        /// 206 with a `Content-Range` whose total is `*`.
        PartialUnknownTotal,
        /// First response honors the range, later ones answer 200.
        PartialThenFull { max_chunk: u64 },
    }

    #[derive(Debug, Clone)]
    struct Resource {
        status: u16,
        body: Bytes,
        mode: RangeMode,
    }

    /// In-memory HTTP server.
    #[derive(Debug, Default)]
    pub struct MockTransport {
        resources: HashMap<String, Resource>,
        requests: Mutex<Vec<(String, Option<ByteRange>)>>,
    }

    impl MockTransport {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn with_resource(mut self, url: &str, body: impl Into<Bytes>, mode: RangeMode) -> Self {
            self.resources.insert(
                url.to_string(),
                Resource {
                    status: 200,
                    body: body.into(),
                    mode,
                },
            );
            self
        }

        pub fn with_status(mut self, url: &str, status: u16) -> Self {
            self.resources.insert(
                url.to_string(),
                Resource {
                    status,
                    body: Bytes::new(),
                    mode: RangeMode::Full,
                },
            );
            self
        }

        pub fn requests(&self) -> Vec<(String, Option<ByteRange>)> {
            self.requests.lock().clone()
        }

        fn partial(body: &Bytes, range: ByteRange, max_chunk: u64, total: &str) -> HttpResponse {
            let len = body.len() as u64;
            if range.start >= len {
                return HttpResponse {
                    status: 416,
                    content_range: Some(format!("bytes */{}", len)),
                    body: Bytes::new(),
                };
            }
            let mut end = (range.start + max_chunk - 1).min(len - 1);
            if let Some(requested_end) = range.end {
                end = end.min(requested_end);
            }
            HttpResponse {
                status: STATUS_PARTIAL_CONTENT,
                content_range: Some(format!("bytes {}-{}/{}", range.start, end, total)),
                body: body.slice(range.start as usize..=end as usize),
            }
        }

        fn full(body: &Bytes) -> HttpResponse {
            HttpResponse {
                status: 200,
                content_range: None,
                body: body.clone(),
            }
        }
    }

    impl HttpTransport for MockTransport {
        async fn get(
            &self,
            url: &str,
            range: Option<ByteRange>,
        ) -> Result<HttpResponse, TransportError> {
            let previous = {
                let mut requests = self.requests.lock();
                let previous = requests.iter().filter(|(u, _)| u == url).count();
                requests.push((url.to_string(), range));
                previous
            };

            let Some(resource) = self.resources.get(url) else {
                return Err(TransportError {
                    url: url.to_string(),
                    reason: "connection refused".to_string(),
                });
            };
            if resource.status != 200 {
                return Ok(HttpResponse {
                    status: resource.status,
                    content_range: None,
                    body: Bytes::new(),
                });
            }

            let body = &resource.body;
            let total = body.len().to_string();
            let response = match (resource.mode, range) {
                (_, None) | (RangeMode::Full, _) => Self::full(body),
                (RangeMode::Partial { max_chunk }, Some(range)) => {
                    Self::partial(body, range, max_chunk, &total)
                }
                (RangeMode::PartialThenFull { max_chunk }, Some(range)) => {
                    if previous == 0 {
                        Self::partial(body, range, max_chunk, &total)
                    } else {
                        Self::full(body)
                    }
                }
                (RangeMode::PartialWithoutHeader, Some(_)) => HttpResponse {
                    status: STATUS_PARTIAL_CONTENT,
                    content_range: None,
                    body: body.clone(),
                },
                (RangeMode::PartialUnknownTotal, Some(range)) => {
                    Self::partial(body, range, body.len() as u64, "*")
                }
            };
            Ok(response)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_byte_range_header_value() {
        assert_eq!(ByteRange::starting_at(0).header_value(), "bytes=0-");
        assert_eq!(ByteRange::starting_at(1024).header_value(), "bytes=1024-");
        assert_eq!(ByteRange::sized(0, 1024).header_value(), "bytes=0-1023");
        assert_eq!(ByteRange::sized(10, 1).header_value(), "bytes=10-10");
    }

    #[test]
    fn test_response_status_classes() {
        let response = HttpResponse {
            status: 206,
            content_range: None,
            body: Bytes::new(),
        };
        assert!(response.is_success());
        assert!(response.is_partial());

        let response = HttpResponse {
            status: 404,
            ..response
        };
        assert!(!response.is_success());
        assert!(!response.is_partial());
    }

    #[tokio::test]
    async fn test_mock_transport_serves_ranges() {
        use mock::{MockTransport, RangeMode};

        let transport = MockTransport::new().with_resource(
            "http://host/a.pmtiles",
            b"0123456789".to_vec(),
            RangeMode::Partial { max_chunk: 4 },
        );

        let first = transport
            .get("http://host/a.pmtiles", Some(ByteRange::starting_at(0)))
            .await
            .unwrap();
        assert_eq!(first.status, 206);
        assert_eq!(first.content_range.as_deref(), Some("bytes 0-3/10"));
        assert_eq!(&first.body[..], b"0123");

        let last = transport
            .get("http://host/a.pmtiles", Some(ByteRange::starting_at(8)))
            .await
            .unwrap();
        assert_eq!(&last.body[..], b"89");
        assert_eq!(transport.requests().len(), 2);
    }
}
