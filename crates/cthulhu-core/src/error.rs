//! Error taxonomy for the transfer pipeline.
//!
//! Leaf failures are typed so the orchestrator and callers can tell them apart
//! (`anyhow::Error::downcast_ref::<TransferError>()`); everything else travels
//! as `anyhow` with context.

use std::path::PathBuf;

/// Failures surfaced by a transfer. Path collisions never show up here: they are
/// resolved by versioning the output name.
#[derive(Debug, thiserror::Error)]
pub enum TransferError {
    /// The capability probe got a non-success status.
    #[error("probe of {url} returned HTTP {status}")]
    ProbeFailure { url: String, status: u32 },

    /// A chunk fetch failed. Chunks completed before the failure stay recorded.
    #[error("chunk {index} failed")]
    ChunkFetch {
        index: usize,
        #[source]
        source: FetchError,
    },

    /// The resume record on disk could not be read, parsed, or violates the
    /// chunk partition. Inspect and remove it by hand.
    #[error("session metadata {} is corrupt: {reason}", path.display())]
    MetadataCorrupt { path: PathBuf, reason: String },

    /// Rejected before any network activity (bad URL, size, connection count).
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Stopped through an `AbortHandle`. Partial data and metadata stay on disk.
    #[error("transfer aborted")]
    Aborted,
}

/// Error from a single HTTP body transfer (one chunk or the single-stream GET).
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    /// Curl reported an error (timeout, connection reset, DNS, ...).
    #[error("{0}")]
    Curl(#[from] curl::Error),
    /// Response status was neither 200 nor 206.
    #[error("HTTP {0}")]
    Http(u32),
    /// Server closed the body before the requested range was delivered.
    #[error("partial transfer: expected {expected} bytes, got {received}")]
    PartialTransfer { expected: u64, received: u64 },
    /// Positional write to the output file failed (disk full, permissions).
    #[error("storage write failed")]
    Storage(#[source] std::io::Error),
    /// Cancelled mid-transfer.
    #[error("aborted")]
    Aborted,
}
