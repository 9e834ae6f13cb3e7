//! Cooperative cancellation for a running transfer.
//!
//! The CLI hands one `AbortHandle` to the `Downloader` and calls `abort` on
//! Ctrl-C. Curl transfers poll it from their progress and write callbacks; the
//! worker pool polls it before claiming the next chunk.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Shared abort flag. Clones observe the same flag.
#[derive(Debug, Clone, Default)]
pub struct AbortHandle {
    flag: Arc<AtomicBool>,
}

impl AbortHandle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request that the transfer stop as soon as possible.
    pub fn abort(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }

    pub fn is_aborted(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }
}
