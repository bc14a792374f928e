//! HEAD and GET operations used by the download executor.
//!
//! This module is the thin protocol surface of the crate: a conditional
//! [`head`] probe returning the metadata the resume gate needs, and a
//! [`get`] returning response headers plus the byte stream. Both surface
//! transport failures immediately; no retries happen here.

use crate::error::Result;

use chrono::{DateTime, Utc};
use reqwest::header::{
    ACCEPT_RANGES, CONTENT_LENGTH, CONTENT_RANGE, IF_MODIFIED_SINCE, LAST_MODIFIED, RANGE,
};
use reqwest::{Response, StatusCode, Url};
use reqwest_middleware::ClientWithMiddleware;
use tracing::debug;

/// Outcome of a conditional HEAD probe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeadResult {
    /// True when the server answered 2xx or 304 Not Modified.
    pub ok: bool,
    /// True when the server answered 304 Not Modified to a conditional
    /// probe.
    pub not_modified: bool,
    /// Advertised content length, when present and parseable.
    pub content_length: Option<u64>,
    /// Advertised last-modified time, when present and parseable.
    pub last_modified: Option<DateTime<Utc>>,
    /// True when the server advertises `Accept-Ranges: bytes`.
    pub accept_byte_ranges: bool,
}

/// Headers of a GET response; the body stream travels separately.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GetResult {
    /// True when the server answered 2xx.
    pub successful: bool,
    /// True iff the server answered 206 with a `Content-Range` starting
    /// at the requested offset.
    pub partial_content: bool,
    /// Total payload length: the `Content-Range` total when present,
    /// otherwise the `Content-Length` header.
    pub content_length: Option<u64>,
}

/// Sends a HEAD request, optionally conditional on `if_modified_since`.
pub async fn head(
    client: &ClientWithMiddleware,
    url: &Url,
    if_modified_since: Option<DateTime<Utc>>,
) -> Result<HeadResult> {
    let mut request = client.head(url.clone());
    if let Some(since) = if_modified_since {
        request = request.header(IF_MODIFIED_SINCE, format_http_date(since));
    }
    let response = request.send().await?;

    let status = response.status();
    let headers = response.headers();

    let accept_byte_ranges = match headers.get(ACCEPT_RANGES) {
        None => false,
        Some(value) if value == "none" => false,
        Some(value) => value.to_str().map(|v| v.contains("bytes")).unwrap_or(false),
    };

    let result = HeadResult {
        ok: status.is_success() || status == StatusCode::NOT_MODIFIED,
        not_modified: status == StatusCode::NOT_MODIFIED,
        content_length: header_u64(headers.get(CONTENT_LENGTH)),
        last_modified: headers
            .get(LAST_MODIFIED)
            .and_then(|value| value.to_str().ok())
            .and_then(parse_http_date),
        accept_byte_ranges,
    };
    debug!("HEAD {} -> {} {:?}", url, status, result);
    Ok(result)
}

/// Sends a GET request, ranged when `range` is given.
///
/// `range` is a half-open interval `[start, end_exclusive)` translated to
/// an inclusive `Range: bytes=start-(end_exclusive - 1)` header. The
/// returned response's byte stream must be read to exhaustion or dropped.
pub async fn get(
    client: &ClientWithMiddleware,
    url: &Url,
    range: Option<(u64, u64)>,
) -> Result<(GetResult, Response)> {
    let mut request = client.get(url.clone());
    if let Some((start, end_exclusive)) = range {
        request = request.header(
            RANGE,
            format!("bytes={}-{}", start, end_exclusive.saturating_sub(1)),
        );
    }
    let response = request.send().await?;

    let status = response.status();
    let headers = response.headers();

    let content_range = headers
        .get(CONTENT_RANGE)
        .and_then(|value| value.to_str().ok());

    // A 206 carries the partial length in Content-Length; the total we
    // care about is the one after the slash in Content-Range.
    let content_length = content_range
        .and_then(parse_content_range_total)
        .or_else(|| header_u64(headers.get(CONTENT_LENGTH)));

    // A 206 only covers the request when its Content-Range starts at the
    // requested offset; anything else is a full or shifted payload.
    let covers_range = match range {
        Some((start, _)) => content_range.and_then(parse_content_range_start) == Some(start),
        None => true,
    };

    let result = GetResult {
        successful: status.is_success(),
        partial_content: status == StatusCode::PARTIAL_CONTENT && covers_range,
        content_length,
    };
    debug!("GET {} (range {:?}) -> {} {:?}", url, range, status, result);
    Ok((result, response))
}

/// Parse a Content-Range header to extract the total size.
///
/// Content-Range format is "bytes start-end/total"; returns the number
/// after the slash.
pub fn parse_content_range_total(content_range: &str) -> Option<u64> {
    content_range
        .split('/')
        .next_back()
        .and_then(|size| size.trim().parse::<u64>().ok())
}

/// Parse a Content-Range header to extract the first covered byte.
///
/// Returns `None` for unsatisfiable ranges ("bytes */total") and
/// malformed headers.
pub fn parse_content_range_start(content_range: &str) -> Option<u64> {
    let span = content_range.trim().strip_prefix("bytes")?.trim();
    let (range, _total) = span.split_once('/')?;
    let (start, _end) = range.split_once('-')?;
    start.trim().parse::<u64>().ok()
}

/// Formats a timestamp as an IMF-fixdate for request headers.
pub fn format_http_date(date: DateTime<Utc>) -> String {
    date.format("%a, %d %b %Y %H:%M:%S GMT").to_string()
}

/// Parses an HTTP date header value.
pub fn parse_http_date(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc2822(value)
        .ok()
        .map(|date| date.with_timezone(&Utc))
}

fn header_u64(value: Option<&reqwest::header::HeaderValue>) -> Option<u64> {
    value
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<u64>().ok())
}
