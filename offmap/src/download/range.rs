//! `Content-Range` response header parsing.

use thiserror::Error;

/// A parsed `Content-Range: bytes <start>-<end>/<total>` header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContentRange {
    pub start: u64,
    /// Inclusive.
    pub end: u64,
    /// `None` when the server sent `*`.
    pub total: Option<u64>,
}

impl ContentRange {
    /// Number of bytes the range covers.
    pub fn byte_count(&self) -> u64 {
        self.end - self.start + 1
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid Content-Range: {0}")]
pub struct ContentRangeError(pub String);

/// Parse a `Content-Range` header value such as `bytes 0-1023/146515`.
pub fn parse_content_range(value: &str) -> Result<ContentRange, ContentRangeError> {
    let value = value.trim();
    let invalid = || ContentRangeError(value.to_string());

    let mut parts = value.split_whitespace();
    let unit = parts.next().ok_or_else(invalid)?;
    if !unit.eq_ignore_ascii_case("bytes") {
        return Err(invalid());
    }
    let range_and_total = parts.next().ok_or_else(invalid)?;
    if parts.next().is_some() {
        return Err(invalid());
    }

    let (range_part, total_part) = range_and_total.split_once('/').ok_or_else(invalid)?;
    let total = if total_part == "*" {
        None
    } else {
        Some(total_part.parse::<u64>().map_err(|_| invalid())?)
    };

    let (start_part, end_part) = range_part.split_once('-').ok_or_else(invalid)?;
    let start: u64 = start_part.parse().map_err(|_| invalid())?;
    let end: u64 = end_part.parse().map_err(|_| invalid())?;
    if end < start {
        return Err(invalid());
    }
    if let Some(total) = total {
        if end >= total {
            return Err(invalid());
        }
    }

    Ok(ContentRange { start, end, total })
}
