//! Capability probe: HEAD request before committing to a transfer strategy.
//!
//! Reports whether the server explicitly advertises `Accept-Ranges: bytes`, the
//! `Content-Length`, and the `ETag`/`Last-Modified` fingerprint recorded in the
//! session metadata. Idempotent; no body is fetched.

mod parse;

use anyhow::{Context, Result};
use std::str;

use crate::control::AbortHandle;
use crate::error::TransferError;
use crate::http::{self, HttpOptions};

/// What the server told us about the resource.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProbeResult {
    /// True only if the final response sent `Accept-Ranges: bytes`.
    pub supports_ranges: bool,
    /// Total size in bytes, if `Content-Length` is present.
    pub length: Option<u64>,
    /// `ETag` value if present.
    pub etag: Option<String>,
    /// `Last-Modified` value if present (raw HTTP date).
    pub last_modified: Option<String>,
}

/// Performs a HEAD request and returns parsed metadata.
///
/// Follows redirects; only the headers of the final response count. A non-2xx
/// status fails with `TransferError::ProbeFailure` and is not retried here.
/// `abort` stops a slow probe with `TransferError::Aborted`.
/// Blocking; call from `spawn_blocking` when used from async code.
pub fn probe(url: &str, opts: &HttpOptions, abort: &AbortHandle) -> Result<ProbeResult> {
    if abort.is_aborted() {
        return Err(TransferError::Aborted.into());
    }
    let mut headers: Vec<String> = Vec::new();

    let mut easy = http::new_handle(url, opts).context("invalid URL")?;
    easy.nobody(true)?;
    easy.progress(true)?;

    let performed = {
        let mut transfer = easy.transfer();
        transfer.header_function(|data| {
            if let Ok(s) = str::from_utf8(data) {
                headers.push(s.trim_end().to_string());
            }
            true
        })?;
        transfer.progress_function(|_, _, _, _| !abort.is_aborted())?;
        transfer.perform()
    };
    if let Err(e) = performed {
        if abort.is_aborted() {
            return Err(TransferError::Aborted.into());
        }
        return Err(e).context("HEAD request failed");
    }

    let code = easy.response_code().context("no response code")?;
    if !(200..300).contains(&code) {
        return Err(TransferError::ProbeFailure {
            url: url.to_string(),
            status: code,
        }
        .into());
    }

    let result = parse::parse_headers(&headers);
    tracing::debug!(
        url,
        supports_ranges = result.supports_ranges,
        length = ?result.length,
        etag = ?result.etag,
        "probe complete"
    );
    Ok(result)
}
