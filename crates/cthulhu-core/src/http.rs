//! Shared libcurl handle setup and response-status helpers.
//!
//! Every request (probe, ranged GET, single-stream GET) uses its own
//! `curl::easy::Easy`. The number of live handles is capped by the worker count,
//! which is the user's connection limit.

use curl::easy::HttpVersion;
use std::time::Duration;

use crate::config::Settings;

/// Body read buffer handed to libcurl (one write callback per buffer).
pub const BUFFER_SIZE: usize = 64 * 1024;

/// Per-handle network options.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HttpOptions {
    /// TCP/TLS connect timeout.
    pub connect_timeout: Duration,
    /// Abort when throughput stays below this many bytes/s...
    pub low_speed_limit: u32,
    /// ...for this long. Large chunks on slow links are not killed by a wall clock.
    pub low_speed_time: Duration,
    /// Redirect hop limit.
    pub max_redirections: u32,
    /// Receive buffer size requested from libcurl.
    pub buffer_size: usize,
    /// Negotiate HTTP/2 over TLS when libcurl supports it. Plain `http://` stays
    /// on HTTP/1.1 either way.
    pub enable_http2: bool,
}

impl Default for HttpOptions {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(15),
            low_speed_limit: 1024,
            low_speed_time: Duration::from_secs(60),
            max_redirections: 10,
            buffer_size: BUFFER_SIZE,
            enable_http2: true,
        }
    }
}

impl HttpOptions {
    /// Defaults with the user's HTTP/2 preference applied.
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            enable_http2: settings.enable_http2,
            ..Self::default()
        }
    }

    pub(crate) fn http_version(&self) -> HttpVersion {
        if self.enable_http2 && curl::Version::get().feature_http2() {
            HttpVersion::V2TLS
        } else {
            HttpVersion::V11
        }
    }
}

/// New handle for `url` with redirects followed and timeouts applied.
/// No `Accept-Encoding` is sent, so bodies arrive undecoded and byte offsets
/// line up with the file on the server.
pub(crate) fn new_handle(url: &str, opts: &HttpOptions) -> Result<curl::easy::Easy, curl::Error> {
    let mut easy = curl::easy::Easy::new();
    easy.url(url)?;
    easy.follow_location(true)?;
    easy.max_redirections(opts.max_redirections)?;
    easy.connect_timeout(opts.connect_timeout)?;
    easy.low_speed_limit(opts.low_speed_limit)?;
    easy.low_speed_time(opts.low_speed_time)?;
    easy.buffer_size(opts.buffer_size)?;
    easy.http_version(opts.http_version())?;
    Ok(easy)
}

/// Parses the status code from a header line like `HTTP/1.1 206 Partial Content`
/// or `HTTP/2 200`. Returns `None` for ordinary header lines.
pub(crate) fn status_code(line: &[u8]) -> Option<u32> {
    let line = std::str::from_utf8(line).ok()?;
    if !line.starts_with("HTTP/") {
        return None;
    }
    line.split_whitespace().nth(1)?.parse().ok()
}

/// What to do with body bytes given the status of the response carrying them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum BodyAction {
    /// 200/206: bytes belong to the file.
    Write,
    /// Intermediate redirect response that libcurl is following.
    Skip,
    /// Anything else: stop the transfer.
    Reject,
}

pub(crate) fn body_action(status: u32) -> BodyAction {
    match status {
        200 | 206 => BodyAction::Write,
        300..=399 => BodyAction::Skip,
        _ => BodyAction::Reject,
    }
}
