//! Archive acquisition over HTTP.
//!
//! - [`DownloadManager`]: fetches an archive (whole or in ranges), stores it
//!   and an optional style, reporting progress
//! - [`HttpTransport`]: the GET-with-range seam, with [`ReqwestTransport`]
//!   as the production implementation
//! - [`DownloadSession`]: chunk reassembly for one download

mod error;
mod http;
mod manager;
mod range;
mod session;
mod style;

pub use error::{DownloadError, DownloadResult};
pub use http::{
    ByteRange, HttpResponse, HttpTransport, ReqwestTransport, TransportError,
    DEFAULT_TIMEOUT_SECS, DEFAULT_USER_AGENT, STATUS_PARTIAL_CONTENT,
};
pub use manager::{DownloadManager, DownloadRequest, DownloadSummary};
pub use range::{parse_content_range, ContentRange, ContentRangeError};
pub use session::DownloadSession;
pub use style::StyleSource;
