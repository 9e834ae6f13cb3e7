//! Session metadata: the durable resume record for one ranged transfer.
//!
//! Stored as JSON next to the output file (`<output>.cthulhu.json`). Created on
//! the first attempt, loaded verbatim on later attempts, rewritten after each
//! completed chunk (temp file + rename), and deleted once every chunk is done.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::chunker::{self, Chunk};
use crate::error::TransferError;

/// Suffix appended to the output path to form the metadata path.
pub const META_SUFFIX: &str = ".cthulhu.json";

/// Serializes every metadata write in the process: at most one temp-write +
/// rename runs at a time, whichever chunk triggered it.
static SAVE_LOCK: Mutex<()> = Mutex::new(());

/// Metadata path for an output file: `file.iso` → `file.iso.cthulhu.json`.
pub fn meta_path(output: &Path) -> PathBuf {
    let mut o = output.as_os_str().to_owned();
    o.push(META_SUFFIX);
    PathBuf::from(o)
}

/// Resume record. `url`, `output_path`, `content_length`, and the chunk
/// boundaries never change after creation; only `bytes_written` moves.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionMeta {
    pub url: String,
    pub output_path: String,
    pub etag: Option<String>,
    pub last_modified: Option<String>,
    pub content_length: u64,
    pub chunks: Vec<Chunk>,
}

impl SessionMeta {
    /// Fresh record with `[0, content_length)` split into `chunk_size` chunks.
    pub fn new(
        url: &str,
        output_path: &Path,
        content_length: u64,
        etag: Option<String>,
        last_modified: Option<String>,
        chunk_size: u64,
    ) -> Result<Self, TransferError> {
        Ok(Self {
            url: url.to_string(),
            output_path: output_path.to_string_lossy().into_owned(),
            etag,
            last_modified,
            content_length,
            chunks: chunker::plan_chunks(content_length, chunk_size)?,
        })
    }

    /// Bytes recorded as written across all chunks.
    pub fn bytes_done(&self) -> u64 {
        self.chunks.iter().map(|c| c.bytes_written.min(c.len())).sum()
    }

    pub fn is_complete(&self) -> bool {
        self.chunks.iter().all(Chunk::done)
    }

    pub fn validate_partition(&self) -> Result<(), String> {
        chunker::check_partition(&self.chunks, self.content_length)
    }
}

/// Load, save, and delete the metadata file at one path.
#[derive(Debug, Clone)]
pub struct SessionStore {
    path: PathBuf,
}

impl SessionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Store for the metadata sibling of `output`.
    pub fn for_output(output: &Path) -> Self {
        Self::new(meta_path(output))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Returns the existing record as-is, or creates, persists, and returns a
    /// new one. An existing record is not checked against `content_length` or
    /// the fingerprint; an unreadable or malformed one is `MetadataCorrupt`.
    pub fn load_or_create(
        &self,
        url: &str,
        output_path: &Path,
        content_length: u64,
        etag: Option<String>,
        last_modified: Option<String>,
        chunk_size: u64,
    ) -> Result<SessionMeta> {
        if let Some(meta) = self.load()? {
            tracing::info!(
                path = %self.path.display(),
                bytes_done = meta.bytes_done(),
                content_length = meta.content_length,
                "resuming from session metadata"
            );
            return Ok(meta);
        }

        let meta = SessionMeta::new(
            url,
            output_path,
            content_length,
            etag,
            last_modified,
            chunk_size,
        )?;
        self.save(&meta)?;
        tracing::debug!(
            path = %self.path.display(),
            chunks = meta.chunks.len(),
            "created session metadata"
        );
        Ok(meta)
    }

    /// Reads the record. `Ok(None)` if the file does not exist.
    pub fn load(&self) -> Result<Option<SessionMeta>> {
        let bytes = match std::fs::read(&self.path) {
            Ok(b) => b,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(self.corrupt(format!("unreadable: {}", e)).into()),
        };
        let meta: SessionMeta =
            serde_json::from_slice(&bytes).map_err(|e| self.corrupt(e.to_string()))?;
        meta.validate_partition().map_err(|reason| self.corrupt(reason))?;
        Ok(Some(meta))
    }

    /// Writes `meta` to a temp file in the same directory, then renames it
    /// over the metadata path.
    pub fn save(&self, meta: &SessionMeta) -> Result<()> {
        let json = serde_json::to_vec_pretty(meta).context("serialize session metadata")?;
        let dir = match self.path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };

        let _guard = SAVE_LOCK.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        let mut tmp = tempfile::NamedTempFile::new_in(dir)
            .with_context(|| format!("create temp file in {}", dir.display()))?;
        tmp.write_all(&json).context("write session metadata")?;
        tmp.as_file().sync_all().context("sync session metadata")?;
        tmp.persist(&self.path)
            .map_err(|e| e.error)
            .with_context(|| format!("replace {}", self.path.display()))?;
        Ok(())
    }

    /// Removes the metadata file. A missing file is not an error.
    pub fn delete(&self) -> Result<()> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e).with_context(|| format!("remove {}", self.path.display())),
        }
    }

    fn corrupt(&self, reason: String) -> TransferError {
        TransferError::MetadataCorrupt {
            path: self.path.clone(),
            reason,
        }
    }
}
