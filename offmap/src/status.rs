//! Shared progress and error vocabulary.
//!
//! Both the download manager and the protocol resolver report to callers
//! through a [`StatusReporter`]. Updates carry one of five codes and an
//! optional percentage that is only present for chunked-download progress.
//!
//! When no callback is installed, updates are written to the log instead of
//! being surfaced.

use std::fmt;
use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, error, info};

/// Status codes delivered to progress callbacks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StatusCode {
    Start,
    Progress,
    Complete,
    Error,
    /// Storage capacity was exhausted while persisting.
    ErrorQuota,
}

impl StatusCode {
    /// Whether this code signals a failure.
    pub fn is_error(&self) -> bool {
        matches!(self, StatusCode::Error | StatusCode::ErrorQuota)
    }

    /// Wire name of the code.
    pub fn as_str(&self) -> &'static str {
        match self {
            StatusCode::Start => "START",
            StatusCode::Progress => "PROGRESS",
            StatusCode::Complete => "COMPLETE",
            StatusCode::Error => "ERROR",
            StatusCode::ErrorQuota => "ERROR_QUOTA",
        }
    }
}

impl fmt::Display for StatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single status update.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatusUpdate {
    pub code: StatusCode,
    pub message: String,
    /// Percentage in `0.0..=100.0` with one decimal place.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub progress: Option<f64>,
}

impl StatusUpdate {
    /// Create an update without a percentage.
    pub fn new(code: StatusCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            progress: None,
        }
    }

    /// Create a progress update carrying a percentage.
    pub fn with_progress(message: impl Into<String>, percent: f64) -> Self {
        Self {
            code: StatusCode::Progress,
            message: message.into(),
            progress: Some(percent),
        }
    }
}

/// Callback invoked with every status update.
pub type ProgressCallback = Arc<dyn Fn(&StatusUpdate) + Send + Sync>;

/// Delivers status updates to an optional caller-supplied callback.
///
/// Without a callback, updates are only logged.
#[derive(Clone, Default)]
pub struct StatusReporter {
    callback: Option<ProgressCallback>,
}

impl fmt::Debug for StatusReporter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StatusReporter")
            .field("has_callback", &self.callback.is_some())
            .finish()
    }
}

impl StatusReporter {
    /// Reporter that forwards to `callback`.
    pub fn new(callback: ProgressCallback) -> Self {
        Self {
            callback: Some(callback),
        }
    }

    /// Reporter that only logs.
    pub fn silent() -> Self {
        Self { callback: None }
    }

    /// Build a reporter from any closure.
    pub fn from_fn<F>(f: F) -> Self
    where
        F: Fn(&StatusUpdate) + Send + Sync + 'static,
    {
        Self::new(Arc::new(f))
    }

    /// Whether a callback is installed.
    pub fn has_callback(&self) -> bool {
        self.callback.is_some()
    }

    /// Deliver an update.
    pub fn report(&self, update: StatusUpdate) {
        match &self.callback {
            Some(cb) => cb(&update),
            None => log_update(&update),
        }
    }

    pub fn start(&self, message: impl Into<String>) {
        self.report(StatusUpdate::new(StatusCode::Start, message));
    }

    pub fn progress(&self, message: impl Into<String>) {
        self.report(StatusUpdate::new(StatusCode::Progress, message));
    }

    pub fn progress_percent(&self, message: impl Into<String>, percent: f64) {
        self.report(StatusUpdate::with_progress(message, percent));
    }

    pub fn complete(&self, message: impl Into<String>) {
        self.report(StatusUpdate::new(StatusCode::Complete, message));
    }

    pub fn error(&self, message: impl Into<String>) {
        self.report(StatusUpdate::new(StatusCode::Error, message));
    }

    pub fn quota_error(&self, message: impl Into<String>) {
        self.report(StatusUpdate::new(StatusCode::ErrorQuota, message));
    }
}

fn log_update(update: &StatusUpdate) {
    match update.code {
        StatusCode::Error | StatusCode::ErrorQuota => {
            error!(code = %update.code, "{}", update.message)
        }
        StatusCode::Progress => match update.progress {
            Some(p) => debug!(code = %update.code, progress = p, "{}", update.message),
            None => debug!(code = %update.code, "{}", update.message),
        },
        StatusCode::Start | StatusCode::Complete => {
            info!(code = %update.code, "{}", update.message)
        }
    }
}

/// Percentage of `received` over `total`, rounded to one decimal place.
///
/// The result only reaches `100.0` when `received >= total`; a value that
/// would round up to 100 early is held at `99.9`.
pub fn percent_of(received: u64, total: u64) -> f64 {
    if total == 0 || received >= total {
        return 100.0;
    }
    let rounded = ((received as f64 / total as f64) * 1000.0).round() / 10.0;
    rounded.min(99.9)
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    #[test]
    fn test_status_code_wire_names() {
        assert_eq!(StatusCode::Start.as_str(), "START");
        assert_eq!(StatusCode::ErrorQuota.to_string(), "ERROR_QUOTA");
        let json = serde_json::to_string(&StatusCode::ErrorQuota).unwrap();
        assert_eq!(json, "\"ERROR_QUOTA\"");
    }

    #[test]
    fn test_is_error() {
        assert!(StatusCode::Error.is_error());
        assert!(StatusCode::ErrorQuota.is_error());
        assert!(!StatusCode::Complete.is_error());
    }

    #[test]
    fn test_update_serialization_omits_missing_progress() {
        let update = StatusUpdate::new(StatusCode::Start, "starting");
        let json = serde_json::to_value(&update).unwrap();
        assert_eq!(json["code"], "START");
        assert!(json.get("progress").is_none());

        let update = StatusUpdate::with_progress("chunk", 42.5);
        let json = serde_json::to_value(&update).unwrap();
        assert_eq!(json["progress"], 42.5);
    }

    #[test]
    fn test_reporter_forwards_to_callback() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let reporter = StatusReporter::from_fn(move |u| sink.lock().push(u.clone()));

        reporter.start("go");
        reporter.progress_percent("half", 50.0);
        reporter.quota_error("full");

        let seen = seen.lock();
        assert_eq!(seen.len(), 3);
        assert_eq!(seen[0].code, StatusCode::Start);
        assert_eq!(seen[1].progress, Some(50.0));
        assert_eq!(seen[2].code, StatusCode::ErrorQuota);
    }

    #[test]
    fn test_silent_reporter_does_not_panic() {
        let reporter = StatusReporter::silent();
        assert!(!reporter.has_callback());
        reporter.error("logged only");
    }

    #[test]
    fn test_percent_of_rounds_to_one_decimal() {
        assert_eq!(percent_of(1, 3), 33.3);
        assert_eq!(percent_of(2, 3), 66.7);
        assert_eq!(percent_of(500, 1000), 50.0);
    }

    #[test]
    fn test_percent_of_holds_below_hundred_until_complete() {
        assert_eq!(percent_of(9_999, 10_000), 99.9);
        assert_eq!(percent_of(10_000, 10_000), 100.0);
    }
}
