//! Single-stream GET (fallback when the server does not advertise ranges or
//! a length). Writes the body sequentially into a fresh output file. No resume:
//! a retry starts from zero.

use anyhow::{Context, Result};
use std::cell::{Cell, RefCell};
use std::path::Path;

use crate::control::AbortHandle;
use crate::error::{FetchError, TransferError};
use crate::http::{self, BodyAction, HttpOptions};
use crate::progress::{Progress, ProgressFn};
use crate::storage::OffsetWriter;

/// Downloads `url` into `output` with one GET. `expected_len` is the probed
/// length, if any; it is only used for progress and a final size check.
/// Returns the number of bytes written.
pub fn download_single(
    url: &str,
    opts: &HttpOptions,
    output: &Path,
    expected_len: Option<u64>,
    on_progress: Option<ProgressFn>,
    abort: &AbortHandle,
) -> Result<u64> {
    let writer = OffsetWriter::create(output)?;
    let written = fetch_into(url, opts, &writer, expected_len, on_progress.as_ref(), abort)
        .map_err(|e| match e {
            FetchError::Aborted => anyhow::Error::new(TransferError::Aborted),
            other => anyhow::Error::new(other).context(format!("GET {} failed", url)),
        })?;
    writer.sync()?;

    if let Some(exp) = expected_len {
        if written != exp {
            return Err(FetchError::PartialTransfer {
                expected: exp,
                received: written,
            })
            .with_context(|| format!("GET {} ended early", url));
        }
    }
    Ok(written)
}

fn fetch_into(
    url: &str,
    opts: &HttpOptions,
    writer: &OffsetWriter,
    expected_len: Option<u64>,
    on_progress: Option<&ProgressFn>,
    abort: &AbortHandle,
) -> Result<u64, FetchError> {
    let mut easy = http::new_handle(url, opts)?;
    easy.progress(true)?;

    let status = Cell::new(0u32);
    let offset = Cell::new(0u64);
    let storage_error: RefCell<Option<std::io::Error>> = RefCell::new(None);

    let perform_result = {
        let mut transfer = easy.transfer();
        transfer.header_function(|line| {
            if let Some(code) = http::status_code(line) {
                status.set(code);
            }
            true
        })?;
        transfer.progress_function(|_, _, _, _| !abort.is_aborted())?;
        transfer.write_function(|data| {
            if abort.is_aborted() {
                return Ok(0);
            }
            match http::body_action(status.get()) {
                BodyAction::Write => {}
                BodyAction::Skip => return Ok(data.len()),
                BodyAction::Reject => return Ok(0),
            }
            let off = offset.get();
            if let Err(e) = writer.write_at(off, data) {
                storage_error.replace(Some(e));
                return Ok(0);
            }
            let downloaded = off + data.len() as u64;
            offset.set(downloaded);
            if let Some(cb) = on_progress {
                cb(Progress {
                    downloaded,
                    total: expected_len,
                });
            }
            Ok(data.len())
        })?;
        transfer.perform()
    };

    if let Err(e) = perform_result {
        if abort.is_aborted() {
            return Err(FetchError::Aborted);
        }
        if let Some(io_err) = storage_error.into_inner() {
            return Err(FetchError::Storage(io_err));
        }
        if e.is_write_error() && http::body_action(status.get()) == BodyAction::Reject {
            return Err(FetchError::Http(status.get()));
        }
        return Err(FetchError::Curl(e));
    }

    let code = easy.response_code()?;
    if http::body_action(code) != BodyAction::Write {
        return Err(FetchError::Http(code));
    }
    Ok(offset.get())
}
