//! Ranged chunk downloads over a bounded worker pool.
//!
//! The pending chunks are snapshotted once, queued, and drained by at most
//! `max_concurrent` worker threads, each owning one curl handle at a time.
//! Workers stream bytes straight into the shared `OffsetWriter` and bump the
//! chunk's atomic `bytes_written`. The coordinating thread persists the session
//! metadata after every completed chunk.

mod chunk;

use anyhow::{anyhow, Result};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{mpsc, Arc, Mutex, PoisonError};

use crate::chunker::{self, Chunk};
use crate::control::AbortHandle;
use crate::error::{FetchError, TransferError};
use crate::http::HttpOptions;
use crate::progress::{Progress, ProgressCounter, ProgressFn};
use crate::session::{SessionMeta, SessionStore};
use crate::storage::OffsetWriter;

/// State shared by every worker of one run.
pub(crate) struct FetchContext {
    url: String,
    opts: HttpOptions,
    writer: OffsetWriter,
    /// Per-chunk `bytes_written`, indexed like `SessionMeta::chunks`.
    written: Vec<AtomicU64>,
    counter: ProgressCounter,
    total: u64,
    on_progress: Option<ProgressFn>,
    abort: AbortHandle,
    /// Set when any chunk fails so the others stop early.
    failed: AtomicBool,
}

impl FetchContext {
    fn cancelled(&self) -> bool {
        self.abort.is_aborted() || self.failed.load(Ordering::Relaxed)
    }

    fn report(&self, n: u64) {
        let downloaded = self.counter.add(n);
        if let Some(cb) = &self.on_progress {
            cb(Progress {
                downloaded,
                total: Some(self.total),
            });
        }
    }

    /// Copy the live per-chunk counters into `meta`.
    fn snapshot_into(&self, meta: &mut SessionMeta) {
        for (chunk, written) in meta.chunks.iter_mut().zip(&self.written) {
            chunk.bytes_written = written.load(Ordering::Relaxed);
        }
    }
}

/// Downloads every chunk of `meta` that is not yet done, writing through
/// `writer` and saving `meta` via `store` after each chunk completes.
///
/// Fails as a whole on the first chunk failure (no per-chunk retry). Before
/// returning an error the current per-chunk progress is saved once more so a
/// later attempt skips bytes that already reached the file.
#[allow(clippy::too_many_arguments)]
pub fn download_chunks(
    url: &str,
    opts: &HttpOptions,
    meta: &mut SessionMeta,
    store: &SessionStore,
    writer: &OffsetWriter,
    max_concurrent: usize,
    on_progress: Option<ProgressFn>,
    abort: &AbortHandle,
) -> Result<()> {
    let work: VecDeque<(usize, Chunk)> = chunker::pending(&meta.chunks).into_iter().collect();
    if work.is_empty() {
        return Ok(());
    }
    let count = work.len();

    let ctx = Arc::new(FetchContext {
        url: url.to_string(),
        opts: *opts,
        writer: writer.clone(),
        written: meta
            .chunks
            .iter()
            .map(|c| AtomicU64::new(c.bytes_written))
            .collect(),
        counter: ProgressCounter::starting_at(meta.bytes_done()),
        total: meta.content_length,
        on_progress,
        abort: abort.clone(),
        failed: AtomicBool::new(false),
    });
    let queue = Arc::new(Mutex::new(work));
    let (tx, rx) = mpsc::channel::<(usize, Result<(), FetchError>)>();

    let num_workers = max_concurrent.max(1).min(count);
    tracing::debug!(pending = count, workers = num_workers, "starting chunk workers");
    let mut handles = Vec::with_capacity(num_workers);
    for _ in 0..num_workers {
        let ctx = Arc::clone(&ctx);
        let queue = Arc::clone(&queue);
        let tx = tx.clone();
        handles.push(std::thread::spawn(move || loop {
            if ctx.cancelled() {
                break;
            }
            let next = queue
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .pop_front();
            let Some((index, chunk)) = next else {
                break;
            };
            let res = chunk::fetch_chunk(&ctx, index, &chunk);
            if res.is_err() {
                ctx.failed.store(true, Ordering::Relaxed);
            }
            if tx.send((index, res)).is_err() {
                break;
            }
        }));
    }
    drop(tx);

    let mut failure: Option<(usize, FetchError)> = None;
    let mut save_error: Option<anyhow::Error> = None;
    let mut aborted = false;
    // Ends once every worker has exited and dropped its sender.
    for (index, res) in rx {
        match res {
            Ok(()) => {
                ctx.snapshot_into(meta);
                if let Err(e) = checkpoint(&ctx.writer, store, meta) {
                    ctx.failed.store(true, Ordering::Relaxed);
                    save_error.get_or_insert(e);
                }
                tracing::debug!(index, "chunk complete");
            }
            Err(FetchError::Aborted) => aborted = true,
            Err(e) => {
                tracing::warn!(index, error = %e, "chunk failed");
                failure.get_or_insert((index, e));
            }
        }
    }
    let mut panicked = false;
    for h in handles {
        panicked |= h.join().is_err();
    }

    ctx.snapshot_into(meta);
    let err: anyhow::Error = if let Some((index, source)) = failure {
        TransferError::ChunkFetch { index, source }.into()
    } else if let Some(e) = save_error {
        e
    } else if panicked {
        anyhow!("chunk worker panicked")
    } else if aborted || !meta.is_complete() {
        TransferError::Aborted.into()
    } else {
        return Ok(());
    };

    if let Err(e) = checkpoint(&ctx.writer, store, meta) {
        tracing::warn!(error = %e, "could not checkpoint progress after failure");
    }
    Err(err)
}

/// Flushes the output file, then saves `meta`. Bytes are only recorded as
/// written once they are on disk.
fn checkpoint(writer: &OffsetWriter, store: &SessionStore, meta: &SessionMeta) -> Result<()> {
    writer.sync()?;
    store.save(meta)
}
