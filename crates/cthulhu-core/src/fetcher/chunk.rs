//! One ranged GET for one chunk.

use std::cell::{Cell, RefCell};
use std::sync::atomic::Ordering;

use super::FetchContext;
use crate::chunker::Chunk;
use crate::error::FetchError;
use crate::http::{self, BodyAction};

/// Fetches `[start + bytes_written, end]` of chunk `index` and writes it at
/// the matching file offset, one libcurl buffer at a time.
///
/// 206 and 200 are both accepted. A 200 means the server ignored the range and
/// sends the body from offset 0: bytes before the resume offset are discarded,
/// and the transfer is stopped once the chunk is full.
pub(super) fn fetch_chunk(ctx: &FetchContext, index: usize, chunk: &Chunk) -> Result<(), FetchError> {
    let written = &ctx.written[index];
    let Some(range) = chunk.range_spec() else {
        return Ok(());
    };
    let resume = chunk.resume_offset();
    let expected = chunk.remaining();
    tracing::debug!(index, range = %range, "fetching chunk");

    let mut easy = http::new_handle(&ctx.url, &ctx.opts)?;
    easy.range(&range)?;
    easy.progress(true)?;

    let status = Cell::new(0u32);
    // Body bytes seen in the current response.
    let body_pos = Cell::new(0u64);
    let received = Cell::new(0u64);
    let storage_error: RefCell<Option<std::io::Error>> = RefCell::new(None);

    let perform_result = {
        let mut transfer = easy.transfer();
        transfer.header_function(|line| {
            if let Some(code) = http::status_code(line) {
                status.set(code);
                body_pos.set(0);
            }
            true
        })?;
        transfer.progress_function(|_, _, _, _| !ctx.cancelled())?;
        transfer.write_function(|data| {
            if ctx.cancelled() {
                return Ok(0);
            }
            let code = status.get();
            match http::body_action(code) {
                BodyAction::Write => {}
                BodyAction::Skip => return Ok(data.len()),
                BodyAction::Reject => return Ok(0),
            }
            let body_start = if code == 200 { 0 } else { resume };
            let data_offset = body_start + body_pos.get();
            body_pos.set(body_pos.get() + data.len() as u64);

            let got = received.get();
            let (skip, take) = window(data_offset, data.len(), resume + got, expected - got);
            if take > 0 {
                if let Err(e) = ctx.writer.write_at(resume + got, &data[skip..skip + take]) {
                    storage_error.replace(Some(e));
                    return Ok(0);
                }
                received.set(got + take as u64);
                written.fetch_add(take as u64, Ordering::Relaxed);
                ctx.report(take as u64);
            }
            // Chunk is full; stop instead of draining an ignored range.
            Ok(if received.get() == expected && skip + take < data.len() {
                0
            } else {
                data.len()
            })
        })?;
        transfer.perform()
    };

    let received = received.get();
    if let Err(e) = perform_result {
        if ctx.cancelled() {
            return Err(FetchError::Aborted);
        }
        if let Some(io_err) = storage_error.into_inner() {
            return Err(FetchError::Storage(io_err));
        }
        if e.is_write_error() {
            if received == expected {
                return Ok(());
            }
            if http::body_action(status.get()) == BodyAction::Reject {
                return Err(FetchError::Http(status.get()));
            }
        }
        return Err(FetchError::Curl(e));
    }

    let code = easy.response_code()?;
    if http::body_action(code) != BodyAction::Write {
        return Err(FetchError::Http(code));
    }
    if received != expected {
        return Err(FetchError::PartialTransfer { expected, received });
    }
    Ok(())
}

/// Part of a `len`-byte buffer starting at file offset `data_offset` that
/// falls inside `[want_from, want_from + want_len)`, as `(skip, take)`.
fn window(data_offset: u64, len: usize, want_from: u64, want_len: u64) -> (usize, usize) {
    let skip = want_from.saturating_sub(data_offset).min(len as u64) as usize;
    let take = ((len - skip) as u64).min(want_len) as usize;
    (skip, take)
}
