//! Transfer orchestrator: resolve the output path, probe, pick a strategy,
//! and run either the ranged chunk pipeline or the single-stream fallback.
//!
//! All network and file work is blocking (libcurl, positional writes) and runs
//! on tokio's blocking pool; `transfer` itself is async so callers can race it
//! against Ctrl-C.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

use crate::control::AbortHandle;
use crate::error::TransferError;
use crate::fetcher;
use crate::http::HttpOptions;
use crate::path;
use crate::probe::{self, ProbeResult};
use crate::progress::{Progress, ProgressFn};
use crate::session::SessionStore;
use crate::single;
use crate::storage::OffsetWriter;

/// One download as requested by the caller.
#[derive(Debug, Clone)]
pub struct TransferRequest {
    pub url: String,
    /// Target directory, or the full file path when `explicit` is set.
    pub output: PathBuf,
    pub explicit: bool,
    /// Upper bound on concurrent chunk fetches.
    pub connections: usize,
    /// Bytes per chunk for ranged transfers.
    pub chunk_size: u64,
}

impl TransferRequest {
    /// Rejects malformed URLs, zero connections, and zero chunk size before any
    /// network activity.
    pub fn validate(&self) -> Result<(), TransferError> {
        let parsed = url::Url::parse(&self.url)
            .map_err(|e| TransferError::InvalidInput(format!("invalid URL {:?}: {}", self.url, e)))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(TransferError::InvalidInput(format!(
                "unsupported URL scheme: {}",
                parsed.scheme()
            )));
        }
        if self.connections == 0 {
            return Err(TransferError::InvalidInput(
                "connection count must be at least 1".to_string(),
            ));
        }
        if self.chunk_size == 0 {
            return Err(TransferError::InvalidInput(
                "chunk size must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

/// Strategy chosen once per transfer from the probe result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferStrategy {
    /// Server advertises byte ranges and a non-zero length: chunked, resumable.
    Ranged { total: u64 },
    /// Sequential whole-file GET; no resume.
    SingleStream { total: Option<u64> },
}

impl TransferStrategy {
    pub fn select(probe: &ProbeResult) -> Self {
        match probe.length {
            Some(total) if probe.supports_ranges && total > 0 => Self::Ranged { total },
            length => Self::SingleStream { total: length },
        }
    }
}

/// What a finished transfer did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferOutcome {
    pub path: PathBuf,
    pub strategy: TransferStrategy,
    /// Final file size.
    pub bytes: u64,
    /// Bytes that were already on disk from an earlier attempt.
    pub resumed_bytes: u64,
}

/// Runs transfers with shared HTTP options and one abort handle.
#[derive(Debug, Clone, Default)]
pub struct Downloader {
    http: HttpOptions,
    abort: AbortHandle,
}

impl Downloader {
    pub fn new(http: HttpOptions) -> Self {
        Self {
            http,
            abort: AbortHandle::new(),
        }
    }

    /// Use `abort` so the caller can stop running transfers.
    pub fn with_abort(mut self, abort: AbortHandle) -> Self {
        self.abort = abort;
        self
    }

    pub fn abort_handle(&self) -> AbortHandle {
        self.abort.clone()
    }

    /// Downloads `req.url`. Failures propagate unchanged; nothing is retried.
    /// A failed ranged transfer leaves the output file and its session metadata
    /// in place so the next call with the same output resumes it.
    pub async fn transfer(
        &self,
        req: &TransferRequest,
        on_progress: Option<ProgressFn>,
    ) -> Result<TransferOutcome> {
        req.validate()?;

        let output = path::resolve_output_path(&req.url, &req.output, req.explicit);
        let probe = {
            let url = req.url.clone();
            let http = self.http;
            let abort = self.abort.clone();
            tokio::task::spawn_blocking(move || probe::probe(&url, &http, &abort))
                .await
                .context("probe task join")??
        };
        let strategy = TransferStrategy::select(&probe);
        tracing::info!(url = %req.url, output = %output.display(), ?strategy, "starting transfer");

        let this = self.clone();
        let req = req.clone();
        let outcome = tokio::task::spawn_blocking(move || match strategy {
            TransferStrategy::Ranged { total } => {
                this.run_ranged(&req, &output, total, &probe, on_progress)
            }
            TransferStrategy::SingleStream { total } => {
                this.run_single(&req, &output, total, on_progress)
            }
        })
        .await
        .context("transfer task join")??;

        tracing::info!(
            output = %outcome.path.display(),
            bytes = outcome.bytes,
            resumed_bytes = outcome.resumed_bytes,
            "transfer complete"
        );
        Ok(outcome)
    }

    fn run_ranged(
        &self,
        req: &TransferRequest,
        output: &Path,
        total: u64,
        probe: &ProbeResult,
        on_progress: Option<ProgressFn>,
    ) -> Result<TransferOutcome> {
        let store = SessionStore::for_output(output);
        if store.exists() && !output.exists() {
            tracing::warn!(
                path = %store.path().display(),
                "output file missing, discarding stale session metadata"
            );
            store.delete()?;
        }

        let mut meta = store.load_or_create(
            &req.url,
            output,
            total,
            probe.etag.clone(),
            probe.last_modified.clone(),
            req.chunk_size,
        )?;
        if meta.content_length != total || (probe.etag.is_some() && meta.etag != probe.etag) {
            tracing::warn!(
                stored_length = meta.content_length,
                probed_length = total,
                stored_etag = ?meta.etag,
                probed_etag = ?probe.etag,
                "remote fingerprint differs from session metadata; resuming anyway"
            );
        }
        let resumed_bytes = meta.bytes_done();
        let total = meta.content_length;

        {
            let writer = OffsetWriter::open_sized(output, total)?;
            fetcher::download_chunks(
                &req.url,
                &self.http,
                &mut meta,
                &store,
                &writer,
                req.connections,
                on_progress.clone(),
                &self.abort,
            )?;
            writer.sync()?;
        }

        if let Some(cb) = &on_progress {
            cb(Progress {
                downloaded: total,
                total: Some(total),
            });
        }
        store.delete()?;

        Ok(TransferOutcome {
            path: output.to_path_buf(),
            strategy: TransferStrategy::Ranged { total },
            bytes: total,
            resumed_bytes,
        })
    }

    fn run_single(
        &self,
        req: &TransferRequest,
        output: &Path,
        total: Option<u64>,
        on_progress: Option<ProgressFn>,
    ) -> Result<TransferOutcome> {
        let bytes = single::download_single(
            &req.url,
            &self.http,
            output,
            total,
            on_progress,
            &self.abort,
        )?;
        Ok(TransferOutcome {
            path: output.to_path_buf(),
            strategy: TransferStrategy::SingleStream { total },
            bytes,
            resumed_bytes: 0,
        })
    }
}
