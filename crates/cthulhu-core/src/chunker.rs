//! Chunk type and fixed-size partitioning of a transfer.

use serde::{Deserialize, Serialize};

use crate::error::TransferError;

/// Contiguous byte range `[start, end]` (both inclusive) of the target file,
/// plus how many bytes of it are already on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Chunk {
    pub start: u64,
    pub end: u64,
    pub bytes_written: u64,
}

impl Chunk {
    pub fn new(start: u64, end: u64) -> Self {
        Self {
            start,
            end,
            bytes_written: 0,
        }
    }

    /// Length of this chunk in bytes.
    pub fn len(&self) -> u64 {
        self.end - self.start + 1
    }

    pub fn done(&self) -> bool {
        self.bytes_written >= self.len()
    }

    /// First byte not yet written. Past `end` once the chunk is complete.
    pub fn resume_offset(&self) -> u64 {
        self.start + self.bytes_written
    }

    /// Bytes still to fetch.
    pub fn remaining(&self) -> u64 {
        self.len().saturating_sub(self.bytes_written)
    }

    /// Value for libcurl's range option (`start-end`, inclusive), or `None`
    /// when nothing is left to fetch.
    pub fn range_spec(&self) -> Option<String> {
        let from = self.resume_offset();
        (from <= self.end).then(|| format!("{}-{}", from, self.end))
    }
}

/// Upper bound on chunks per transfer; keeps the plan and its JSON record bounded.
pub const MAX_CHUNKS: u64 = 1 << 20;

/// Splits `[0, total)` into chunks of `chunk_size` bytes; the last chunk may be
/// shorter. Returns no chunks for an empty file.
pub fn plan_chunks(total: u64, chunk_size: u64) -> Result<Vec<Chunk>, TransferError> {
    if chunk_size == 0 {
        return Err(TransferError::InvalidInput(
            "chunk size must be greater than zero".to_string(),
        ));
    }

    let count = total.div_ceil(chunk_size);
    if count > MAX_CHUNKS {
        return Err(TransferError::InvalidInput(format!(
            "chunk size {} splits {} bytes into {} chunks (limit {})",
            chunk_size, total, count, MAX_CHUNKS
        )));
    }
    let mut out = Vec::with_capacity(count as usize);
    let mut start = 0u64;
    while start < total {
        let end = start.saturating_add(chunk_size).min(total) - 1;
        out.push(Chunk::new(start, end));
        start = end + 1;
    }
    Ok(out)
}

/// Chunks still needing bytes, with their index. Taken once per run.
pub fn pending(chunks: &[Chunk]) -> Vec<(usize, Chunk)> {
    chunks
        .iter()
        .enumerate()
        .filter(|(_, c)| !c.done())
        .map(|(i, c)| (i, *c))
        .collect()
}

/// Checks that `chunks` cover `[0, total)` in order with no gap or overlap and
/// that no chunk claims more bytes than it holds.
pub fn check_partition(chunks: &[Chunk], total: u64) -> Result<(), String> {
    let mut expected_start = 0u64;
    for (i, c) in chunks.iter().enumerate() {
        if c.start != expected_start {
            return Err(format!(
                "chunk {} starts at {}, expected {}",
                i, c.start, expected_start
            ));
        }
        if c.end < c.start {
            return Err(format!("chunk {} ends before it starts", i));
        }
        // Keeps `len()` and `end + 1` below from overflowing.
        if c.end >= total {
            return Err(format!(
                "chunk {} ends at {}, past content length {}",
                i, c.end, total
            ));
        }
        if c.bytes_written > c.len() {
            return Err(format!(
                "chunk {} records {} bytes but holds {}",
                i,
                c.bytes_written,
                c.len()
            ));
        }
        expected_start = c.end + 1;
    }
    if expected_start != total {
        return Err(format!(
            "chunks cover {} bytes, content length is {}",
            expected_start, total
        ));
    }
    Ok(())
}
