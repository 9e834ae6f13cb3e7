//! Minimal HTTP/1.1 server that supports HEAD and Range GET for integration tests.
//!
//! Serves a single static body, one request per connection. HEAD answers with
//! Content-Length and (optionally) `Accept-Ranges: bytes`; GET with Range
//! answers 206 Partial Content. Every GET's Range header is recorded, along
//! with the peak number of GETs served at once.

#![allow(dead_code)]

use std::io::{Read, Write};
use std::net::TcpListener;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

#[derive(Debug, Clone, Copy)]
pub struct RangeServerOptions {
    /// Status returned to HEAD (e.g. 404 to simulate a missing file).
    pub head_status: u16,
    /// If false, GET ignores Range and always returns 200 with the full body.
    pub support_ranges: bool,
    /// If false, omit `Accept-Ranges: bytes` even if ranges work.
    pub advertise_ranges: bool,
    /// Ranged GETs starting at or past this offset get a 500.
    pub fail_from: Option<u64>,
    /// A 206 body covering this offset is cut off there and the connection closed.
    pub truncate_at: Option<u64>,
    /// Delay before answering HEAD.
    pub head_delay: Duration,
    /// Delay before answering each GET.
    pub get_delay: Duration,
}

impl Default for RangeServerOptions {
    fn default() -> Self {
        Self {
            head_status: 200,
            support_ranges: true,
            advertise_ranges: true,
            fail_from: None,
            truncate_at: None,
            head_delay: Duration::ZERO,
            get_delay: Duration::ZERO,
        }
    }
}

pub struct RangeServer {
    /// Full URL of the served file, e.g. "http://127.0.0.1:12345/data.bin".
    pub url: String,
    /// Range header of each GET, `None` for plain GETs.
    pub ranges: Arc<Mutex<Vec<Option<String>>>>,
    stats: Arc<Stats>,
}

#[derive(Default)]
struct Stats {
    active: AtomicUsize,
    peak: AtomicUsize,
}

/// Counts one GET as in flight until dropped.
struct Active<'a>(&'a Stats);

impl<'a> Active<'a> {
    fn enter(stats: &'a Stats) -> Self {
        let now = stats.active.fetch_add(1, Ordering::SeqCst) + 1;
        stats.peak.fetch_max(now, Ordering::SeqCst);
        Active(stats)
    }
}

impl Drop for Active<'_> {
    fn drop(&mut self) {
        self.0.active.fetch_sub(1, Ordering::SeqCst);
    }
}

impl RangeServer {
    pub fn ranges(&self) -> Vec<Option<String>> {
        self.ranges.lock().unwrap().clone()
    }

    /// Recorded Range headers of ranged GETs only, sorted.
    pub fn sorted_ranges(&self) -> Vec<String> {
        let mut r: Vec<String> = self.ranges().into_iter().flatten().collect();
        r.sort();
        r
    }

    /// Most GETs that were being served at the same time.
    pub fn peak_concurrency(&self) -> usize {
        self.stats.peak.load(Ordering::SeqCst)
    }
}

/// Starts a server in a background thread serving `body`. The server runs
/// until the process exits.
pub fn start(body: Vec<u8>) -> RangeServer {
    start_with_options(body, RangeServerOptions::default())
}

pub fn start_with_options(body: Vec<u8>, opts: RangeServerOptions) -> RangeServer {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    let port = listener.local_addr().unwrap().port();
    let body = Arc::new(body);
    let ranges = Arc::new(Mutex::new(Vec::new()));
    let stats = Arc::new(Stats::default());
    let log = Arc::clone(&ranges);
    let counters = Arc::clone(&stats);
    thread::spawn(move || {
        for stream in listener.incoming().flatten() {
            let body = Arc::clone(&body);
            let log = Arc::clone(&log);
            let counters = Arc::clone(&counters);
            thread::spawn(move || handle(stream, &body, opts, &log, &counters));
        }
    });
    RangeServer {
        url: format!("http://127.0.0.1:{}/data.bin", port),
        ranges,
        stats,
    }
}

fn handle(
    mut stream: std::net::TcpStream,
    body: &[u8],
    opts: RangeServerOptions,
    log: &Mutex<Vec<Option<String>>>,
    stats: &Stats,
) {
    let _ = stream.set_read_timeout(Some(std::time::Duration::from_secs(2)));
    let _ = stream.set_write_timeout(Some(std::time::Duration::from_secs(5)));
    let mut buf = [0u8; 8192];
    let n = match stream.read(&mut buf) {
        Ok(0) => return,
        Ok(n) => n,
        Err(_) => return,
    };
    let request = match std::str::from_utf8(&buf[..n]) {
        Ok(s) => s,
        Err(_) => return,
    };
    let (method, range_value, range) = parse_request(request);
    let total = body.len() as u64;
    let accept_ranges = if opts.advertise_ranges {
        "Accept-Ranges: bytes\r\n"
    } else {
        ""
    };

    if method.eq_ignore_ascii_case("HEAD") {
        thread::sleep(opts.head_delay);
        let response = if opts.head_status == 200 {
            format!(
                "HTTP/1.1 200 OK\r\nContent-Length: {}\r\nETag: \"v1\"\r\n{}Connection: close\r\n\r\n",
                total, accept_ranges
            )
        } else {
            format!(
                "HTTP/1.1 {} Error\r\nContent-Length: 0\r\nConnection: close\r\n\r\n",
                opts.head_status
            )
        };
        let _ = stream.write_all(response.as_bytes());
        return;
    }
    if !method.eq_ignore_ascii_case("GET") {
        let _ = stream.write_all(b"HTTP/1.1 405 Method Not Allowed\r\nConnection: close\r\n\r\n");
        return;
    }

    let _active = Active::enter(stats);
    log.lock().unwrap().push(range_value);
    thread::sleep(opts.get_delay);
    // `sent` < `slice.len()` closes the connection mid-body.
    let (status, content_range, slice, sent) = match range {
        Some((start, _)) if opts.support_ranges && opts.fail_from.is_some_and(|f| start >= f) => {
            let _ = stream.write_all(
                b"HTTP/1.1 500 Internal Server Error\r\nContent-Length: 0\r\nConnection: close\r\n\r\n",
            );
            return;
        }
        Some((start, end_incl)) if opts.support_ranges => {
            let end_incl = end_incl.min(total.saturating_sub(1));
            if start > end_incl {
                (
                    "416 Range Not Satisfiable",
                    Some(format!("bytes */{}", total)),
                    &body[0..0],
                    0,
                )
            } else {
                let slice = &body[start as usize..=end_incl as usize];
                let sent = match opts.truncate_at {
                    Some(cut) if cut > start && cut <= end_incl => (cut - start) as usize,
                    _ => slice.len(),
                };
                (
                    "206 Partial Content",
                    Some(format!("bytes {}-{}/{}", start, end_incl, total)),
                    slice,
                    sent,
                )
            }
        }
        _ => ("200 OK", None, body, body.len()),
    };
    let content_range = content_range
        .map(|v| format!("Content-Range: {}\r\n", v))
        .unwrap_or_default();
    let response = format!(
        "HTTP/1.1 {}\r\nContent-Length: {}\r\n{}{}Connection: close\r\n\r\n",
        status,
        slice.len(),
        content_range,
        accept_ranges
    );
    let _ = stream.write_all(response.as_bytes());
    let _ = stream.write_all(&slice[..sent]);
}

/// Returns (method, raw Range value, parsed `bytes=X-Y` as (start, end_inclusive)).
fn parse_request(request: &str) -> (&str, Option<String>, Option<(u64, u64)>) {
    let mut method = "";
    let mut raw = None;
    let mut range = None;
    for line in request.lines() {
        let line = line.trim();
        if line.is_empty() {
            break;
        }
        if method.is_empty() {
            method = line.split_whitespace().next().unwrap_or("");
            continue;
        }
        if let Some((name, value)) = line.split_once(':') {
            if name.trim().eq_ignore_ascii_case("range") {
                let value = value.trim();
                raw = Some(value.to_string());
                if let Some(part) = value.strip_prefix("bytes=") {
                    if let Some((a, b)) = part.split_once('-') {
                        let start = a.trim().parse::<u64>().unwrap_or(0);
                        let end = b.trim();
                        let end_incl = if end.is_empty() {
                            u64::MAX
                        } else {
                            end.parse::<u64>().unwrap_or(0)
                        };
                        range = Some((start, end_incl));
                    }
                }
            }
        }
    }
    (method, raw, range)
}
