//! Parse HTTP response header lines into a ProbeResult.

use super::ProbeResult;

/// Parse collected header lines. When redirects were followed the lines of
/// every hop are present; each status line starts a fresh result so only the
/// final response is reported.
pub(crate) fn parse_headers(lines: &[String]) -> ProbeResult {
    let mut result = ProbeResult::default();

    for line in lines {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if line.starts_with("HTTP/") {
            result = ProbeResult::default();
            continue;
        }
        if let Some((name, value)) = line.split_once(':') {
            let name = name.trim();
            let value = value.trim();
            if name.eq_ignore_ascii_case("content-length") {
                if let Ok(n) = value.parse::<u64>() {
                    result.length = Some(n);
                }
            } else if name.eq_ignore_ascii_case("accept-ranges") {
                result.supports_ranges = value
                    .split(',')
                    .any(|unit| unit.trim().eq_ignore_ascii_case("bytes"));
            } else if name.eq_ignore_ascii_case("etag") {
                result.etag = Some(value.to_string());
            } else if name.eq_ignore_ascii_case("last-modified") {
                result.last_modified = Some(value.to_string());
            }
        }
    }

    result
}
