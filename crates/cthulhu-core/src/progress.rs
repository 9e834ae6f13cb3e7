//! Progress reporting for transfers.
//!
//! The core reports `(downloaded, total)` after every buffer; throttling the
//! output is the caller's job (the CLI renders at most every 100 ms).

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Snapshot handed to the progress callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Progress {
    /// Bytes on disk so far (including bytes recorded by an earlier run).
    pub downloaded: u64,
    /// Total size, or `None` when the server did not report one.
    pub total: Option<u64>,
}

impl Progress {
    /// Fraction complete in [0.0, 1.0], or `None` if the total is unknown.
    pub fn fraction(&self) -> Option<f64> {
        match self.total {
            Some(0) => Some(1.0),
            Some(t) => Some((self.downloaded as f64 / t as f64).min(1.0)),
            None => None,
        }
    }

    /// Estimated seconds remaining at the given rate.
    pub fn eta_secs(&self, bytes_per_sec: f64) -> Option<f64> {
        let total = self.total?;
        let remaining = total.saturating_sub(self.downloaded);
        if remaining == 0 {
            return Some(0.0);
        }
        if bytes_per_sec <= 0.0 {
            return None;
        }
        Some(remaining as f64 / bytes_per_sec)
    }
}

/// Progress callback. Invoked from worker threads, so it must be `Send + Sync`.
pub type ProgressFn = Arc<dyn Fn(Progress) + Send + Sync>;

/// Running byte total shared by all chunk workers of one transfer.
#[derive(Debug, Clone, Default)]
pub struct ProgressCounter {
    bytes: Arc<AtomicU64>,
}

impl ProgressCounter {
    /// Counter starting at `initial` (bytes already recorded by a previous run).
    pub fn starting_at(initial: u64) -> Self {
        Self {
            bytes: Arc::new(AtomicU64::new(initial)),
        }
    }

    /// Add `n` bytes; returns the new total.
    pub fn add(&self, n: u64) -> u64 {
        self.bytes.fetch_add(n, Ordering::Relaxed) + n
    }

    pub fn get(&self) -> u64 {
        self.bytes.load(Ordering::Relaxed)
    }
}
