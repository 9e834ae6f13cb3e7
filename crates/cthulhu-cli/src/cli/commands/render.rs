//! Progress line rendering on stderr.

use cthulhu_core::progress::Progress;
use std::io::Write;
use std::time::{Duration, Instant};
use tokio::sync::watch;

/// Redraw at most this often, however fast updates arrive.
const RENDER_INTERVAL: Duration = Duration::from_millis(100);

/// Draws the latest progress until the sender side is dropped.
pub async fn render_loop(mut rx: watch::Receiver<Option<Progress>>) {
    let mut ticker = tokio::time::interval(RENDER_INTERVAL);
    let mut meter: Option<RateMeter> = None;
    let mut drawn = false;
    loop {
        let closed = rx.changed().await.is_err();
        let latest = *rx.borrow_and_update();
        if let Some(p) = latest {
            let meter = meter.get_or_insert_with(|| RateMeter::new(p.downloaded));
            let rate = meter.rate(p.downloaded);
            let mut err = std::io::stderr();
            let _ = write!(err, "\r{}\x1b[K", format_line(&p, rate));
            let _ = err.flush();
            drawn = true;
        }
        if closed {
            break;
        }
        ticker.tick().await;
    }
    if drawn {
        eprintln!();
    }
}

/// Average throughput since the first update; bytes resumed from disk do not count.
struct RateMeter {
    start: Instant,
    base: u64,
}

impl RateMeter {
    fn new(base: u64) -> Self {
        Self {
            start: Instant::now(),
            base,
        }
    }

    fn rate(&self, downloaded: u64) -> f64 {
        let secs = self.start.elapsed().as_secs_f64();
        if secs <= 0.0 {
            return 0.0;
        }
        downloaded.saturating_sub(self.base) as f64 / secs
    }
}

pub(crate) fn format_line(p: &Progress, bytes_per_sec: f64) -> String {
    let rate = format!("{}/s", format_bytes(bytes_per_sec as u64));
    match (p.total, p.fraction()) {
        (Some(total), Some(fraction)) => {
            let eta = p
                .eta_secs(bytes_per_sec)
                .map(format_eta)
                .unwrap_or_else(|| "?".to_string());
            format!(
                "{:5.1}%  {} / {}  {}  ETA {}",
                fraction * 100.0,
                format_bytes(p.downloaded),
                format_bytes(total),
                rate,
                eta
            )
        }
        _ => format!("{}  {}", format_bytes(p.downloaded), rate),
    }
}

/// Binary units with one decimal, e.g. `1.5 MiB`.
pub(crate) fn format_bytes(n: u64) -> String {
    const UNITS: [&str; 5] = ["KiB", "MiB", "GiB", "TiB", "PiB"];
    if n < 1024 {
        return format!("{} B", n);
    }
    let mut value = n as f64 / 1024.0;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    format!("{:.1} {}", value, UNITS[unit])
}

fn format_eta(secs: f64) -> String {
    let secs = secs.round() as u64;
    if secs >= 3600 {
        format!("{}h{:02}m", secs / 3600, (secs % 3600) / 60)
    } else if secs >= 60 {
        format!("{}m{:02}s", secs / 60, secs % 60)
    } else {
        format!("{}s", secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bytes_use_binary_units() {
        assert_eq!(format_bytes(0), "0 B");
        assert_eq!(format_bytes(1023), "1023 B");
        assert_eq!(format_bytes(1536), "1.5 KiB");
        assert_eq!(format_bytes(32 << 20), "32.0 MiB");
        assert_eq!(format_bytes(3 << 30), "3.0 GiB");
    }

    #[test]
    fn eta_formatting() {
        assert_eq!(format_eta(5.4), "5s");
        assert_eq!(format_eta(125.0), "2m05s");
        assert_eq!(format_eta(3_720.0), "1h02m");
    }

    #[test]
    fn line_with_known_total() {
        let p = Progress {
            downloaded: 512 * 1024,
            total: Some(1024 * 1024),
        };
        assert_eq!(
            format_line(&p, 256.0 * 1024.0),
            " 50.0%  512.0 KiB / 1.0 MiB  256.0 KiB/s  ETA 2s"
        );
    }

    #[test]
    fn line_with_unknown_total() {
        let p = Progress {
            downloaded: 2048,
            total: None,
        };
        assert_eq!(format_line(&p, 0.0), "2.0 KiB  0 B/s");
    }
}
