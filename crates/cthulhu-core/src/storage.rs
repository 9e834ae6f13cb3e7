//! Output file handle with positional writes.
//!
//! One `OffsetWriter` owns the output file for a transfer. Clones share the
//! same handle; each `write_at` targets an explicit offset (pwrite on Unix) and
//! never touches a shared cursor, so chunk workers writing disjoint ranges need
//! no lock. The handle closes when the last clone drops.

use anyhow::{Context, Result};
use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
#[cfg(unix)]
use std::os::unix::fs::FileExt;
#[cfg(unix)]
use std::os::unix::io::AsRawFd;

#[derive(Debug, Clone)]
pub struct OffsetWriter {
    file: Arc<File>,
    path: PathBuf,
}

impl OffsetWriter {
    /// Open (or create) `path` without truncating and size it to `len` bytes.
    /// Existing bytes are kept so a resumed transfer only fills the gaps.
    pub fn open_sized(path: &Path, len: u64) -> Result<Self> {
        let file = File::options()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)
            .with_context(|| format!("failed to open output file: {}", path.display()))?;
        preallocate(&file, len)
            .with_context(|| format!("failed to size output file: {}", path.display()))?;
        Ok(Self {
            file: Arc::new(file),
            path: path.to_path_buf(),
        })
    }

    /// Create `path` fresh (truncating any old content), for the single-stream path.
    pub fn create(path: &Path) -> Result<Self> {
        let file = File::options()
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)
            .with_context(|| format!("failed to create output file: {}", path.display()))?;
        Ok(Self {
            file: Arc::new(file),
            path: path.to_path_buf(),
        })
    }

    /// Write all of `data` at `offset`.
    #[cfg(unix)]
    pub fn write_at(&self, offset: u64, data: &[u8]) -> io::Result<()> {
        self.file.write_all_at(data, offset)
    }

    /// Windows: `seek_write` carries its own offset per call.
    #[cfg(windows)]
    pub fn write_at(&self, mut offset: u64, mut data: &[u8]) -> io::Result<()> {
        use std::os::windows::fs::FileExt;
        while !data.is_empty() {
            let n = self.file.seek_write(data, offset)?;
            if n == 0 {
                return Err(io::Error::new(io::ErrorKind::WriteZero, "short write"));
            }
            data = &data[n..];
            offset += n as u64;
        }
        Ok(())
    }

    /// Flush file data to disk.
    pub fn sync(&self) -> Result<()> {
        self.file
            .sync_all()
            .with_context(|| format!("failed to sync output file: {}", self.path.display()))
    }
}

/// Size the file to exactly `len` bytes. On Unix a growing file first tries
/// `posix_fallocate` for real block allocation; `set_len` covers the rest
/// (sparse growth, or shrinking a stale longer file).
fn preallocate(file: &File, len: u64) -> io::Result<()> {
    let current = file.metadata()?.len();
    if current == len {
        return Ok(());
    }
    #[cfg(unix)]
    if current < len {
        let r = unsafe { libc::posix_fallocate(file.as_raw_fd(), 0, len as libc::off_t) };
        if r == 0 {
            return Ok(());
        }
        tracing::debug!(errno = r, "posix_fallocate failed, falling back to set_len");
    }
    file.set_len(len)
}
