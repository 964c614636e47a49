//! Archive download orchestration.
//!
//! A download fetches one archive over HTTP, in ranges when the server
//! supports them, stores it under the caller's name and optionally stores a
//! style next to it. Progress and failures are reported through a
//! [`StatusReporter`] and failures are also returned.

use std::sync::Arc;

use bytes::Bytes;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::error::{DownloadError, DownloadResult};
use super::http::{ByteRange, HttpTransport};
use super::range::parse_content_range;
use super::session::DownloadSession;
use super::style::StyleSource;
use crate::status::StatusReporter;
use crate::storage::ArchiveStore;

/// What to download and where to put it.
#[derive(Debug, Clone)]
pub struct DownloadRequest {
    /// Archive URL.
    pub url: String,
    /// Storage name for the archive and its style.
    pub name: String,
    /// Optional style stored under the same name.
    pub style: Option<StyleSource>,
    /// Checked before every request.
    pub cancellation: Option<CancellationToken>,
}

impl DownloadRequest {
    pub fn new(url: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            name: name.into(),
            style: None,
            cancellation: None,
        }
    }

    pub fn with_style(mut self, style: impl Into<StyleSource>) -> Self {
        self.style = Some(style.into());
        self
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = Some(token);
        self
    }

    fn check_cancelled(&self) -> DownloadResult<()> {
        match &self.cancellation {
            Some(token) if token.is_cancelled() => Err(DownloadError::Aborted),
            _ => Ok(()),
        }
    }
}

/// Outcome of a successful download.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadSummary {
    pub name: String,
    /// Size of the stored archive.
    pub bytes: u64,
    /// Number of HTTP responses the archive was assembled from.
    pub chunks: usize,
    /// Whether a style was stored alongside.
    pub style_saved: bool,
}

/// Downloads archives into an [`ArchiveStore`].
pub struct DownloadManager<T: HttpTransport> {
    transport: T,
    store: Arc<dyn ArchiveStore>,
    chunk_size: Option<u64>,
}

impl<T: HttpTransport> DownloadManager<T> {
    /// Create a manager that lets the server decide range sizes.
    pub fn new(transport: T, store: Arc<dyn ArchiveStore>) -> Self {
        Self {
            transport,
            store,
            chunk_size: None,
        }
    }

    /// Request at most `chunk_size` bytes per range request.
    pub fn with_chunk_size(mut self, chunk_size: Option<u64>) -> Self {
        self.chunk_size = chunk_size.filter(|&size| size > 0);
        self
    }

    pub fn store(&self) -> &Arc<dyn ArchiveStore> {
        &self.store
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Download, store and report.
    ///
    /// Emits START, PROGRESS updates and COMPLETE on success. On failure
    /// emits ERROR, or ERROR_QUOTA if storage was exhausted, and returns the
    /// error.
    pub async fn download(
        &self,
        request: DownloadRequest,
        reporter: &StatusReporter,
    ) -> DownloadResult<DownloadSummary> {
        info!(url = %request.url, name = %request.name, "Starting archive download");
        reporter.start(format!("Downloading {}", request.name));

        match self.run(&request, reporter).await {
            Ok(summary) => {
                info!(
                    name = %summary.name,
                    bytes = summary.bytes,
                    chunks = summary.chunks,
                    "Archive download complete"
                );
                reporter.complete(format!("Downloaded {}", summary.name));
                Ok(summary)
            }
            Err(e) => {
                if e.is_quota() {
                    reporter.quota_error(e.to_string());
                } else {
                    reporter.error(e.to_string());
                }
                Err(e)
            }
        }
    }

    async fn run(
        &self,
        request: &DownloadRequest,
        reporter: &StatusReporter,
    ) -> DownloadResult<DownloadSummary> {
        if request.url.trim().is_empty() {
            return Err(DownloadError::failed(&request.url, "no URL given"));
        }

        let session = self.fetch(request, reporter).await?;
        let chunks = session.chunk_count();
        let blob = session.into_blob();
        let bytes = blob.len() as u64;

        request.check_cancelled()?;
        self.store.put_archive(&request.name, blob).await?;
        reporter.progress(format!("Saved archive {}", request.name));

        let mut style_saved = false;
        if let Some(style) = request.style.clone() {
            request.check_cancelled()?;
            let document = style.resolve(&self.transport).await?;
            self.store.put_style(&request.name, document).await?;
            reporter.progress(format!("Saved style for {}", request.name));
            style_saved = true;
        }

        Ok(DownloadSummary {
            name: request.name.clone(),
            bytes,
            chunks,
            style_saved,
        })
    }

    fn range_from(&self, start: u64) -> ByteRange {
        match self.chunk_size {
            Some(size) => ByteRange::sized(start, size),
            None => ByteRange::starting_at(start),
        }
    }

    /// Fetch the archive bytes, following partial-content responses.
    async fn fetch(
        &self,
        request: &DownloadRequest,
        reporter: &StatusReporter,
    ) -> DownloadResult<DownloadSession> {
        let url = request.url.as_str();
        let mut session = DownloadSession::new(url, &request.name);

        request.check_cancelled()?;
        let response = self.transport.get(url, Some(self.range_from(0))).await?;
        if !response.is_success() {
            return Err(DownloadError::bad_status(
                url,
                response.status,
                "unexpected response status",
            ));
        }

        let header = match (response.is_partial(), response.content_range.as_deref()) {
            (true, Some(header)) => header,
            _ => {
                debug!(url = url, status = response.status, "Server sent the whole archive");
                session.push_chunk(response.body)?;
                reporter.progress("Downloading in full-download mode");
                return Ok(session);
            }
        };

        let range = parse_content_range(header)
            .map_err(|e| DownloadError::failed(url, e.to_string()))?;
        let total = range
            .total
            .ok_or_else(|| DownloadError::failed(url, "server did not report the archive size"))?;
        session.set_total(total);
        self.accept_chunk(&mut session, range.start, response.body, reporter)?;

        while !session.is_complete() {
            request.check_cancelled()?;
            let response = self
                .transport
                .get(url, Some(self.range_from(session.received())))
                .await?;
            if !response.is_partial() {
                return Err(DownloadError::bad_status(
                    url,
                    response.status,
                    "expected partial content",
                ));
            }
            if response.body.is_empty() {
                return Err(DownloadError::failed(url, "server sent an empty chunk"));
            }
            let start = match response.content_range.as_deref() {
                Some(header) => parse_content_range(header)
                    .map_err(|e| DownloadError::failed(url, e.to_string()))?
                    .start,
                None => session.received(),
            };
            self.accept_chunk(&mut session, start, response.body, reporter)?;
        }

        Ok(session)
    }

    fn accept_chunk(
        &self,
        session: &mut DownloadSession,
        start: u64,
        chunk: Bytes,
        reporter: &StatusReporter,
    ) -> DownloadResult<()> {
        if start != session.received() {
            warn!(
                url = %session.url,
                expected = session.received(),
                got = start,
                "Server returned a misplaced range"
            );
            return Err(DownloadError::failed(
                &session.url,
                format!("expected range at {}, got {}", session.received(), start),
            ));
        }
        session.push_chunk(chunk)?;

        let total = session.total().unwrap_or_default();
        let percent = session.percent().unwrap_or_default();
        debug!(
            name = %session.name,
            received = session.received(),
            total = total,
            percent = percent,
            "Chunk received"
        );
        reporter.progress_percent(
            format!("Downloaded {} of {} bytes", session.received(), total),
            percent,
        );
        Ok(())
    }
}
