//! Output path resolution: file name from the URL and collision versioning.

mod sanitize;

use std::path::{Path, PathBuf};

use crate::session;

pub use sanitize::sanitize_filename;

/// Used when the URL path yields nothing usable.
const DEFAULT_FILENAME: &str = "download.bin";

/// Last non-empty path segment of `url`, sanitized; `download.bin` otherwise.
///
/// - `https://example.com/a/b/file.deb` → `file.deb`
/// - `https://example.com/` → `download.bin`
pub fn filename_from_url(url: &str) -> String {
    let segment = url::Url::parse(url).ok().and_then(|parsed| {
        parsed
            .path()
            .split('/')
            .filter(|s| !s.is_empty())
            .last()
            .map(str::to_string)
    });
    let sanitized = segment.map(|s| sanitize_filename(&s)).unwrap_or_default();
    if sanitized.is_empty() || sanitized == "." || sanitized == ".." {
        DEFAULT_FILENAME.to_string()
    } else {
        sanitized
    }
}

/// Final output path for a transfer.
///
/// With `explicit`, `output` is the file path; otherwise it is a directory and
/// the URL's file name is appended. The result then goes through
/// [`next_free_path`].
pub fn resolve_output_path(url: &str, output: &Path, explicit: bool) -> PathBuf {
    let candidate = if explicit {
        output.to_path_buf()
    } else {
        output.join(filename_from_url(url))
    };
    next_free_path(&candidate)
}

/// First free name among `path`, `stem (1).ext`, `stem (2).ext`, ...
///
/// A candidate with a session metadata sibling counts as free: it is an
/// interrupted transfer and is resumed in place rather than versioned.
pub fn next_free_path(path: &Path) -> PathBuf {
    if is_free(path) {
        return path.to_path_buf();
    }

    let parent = path.parent().unwrap_or_else(|| Path::new(""));
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let ext = path
        .extension()
        .map(|e| format!(".{}", e.to_string_lossy()))
        .unwrap_or_default();

    let mut n: u64 = 1;
    loop {
        let candidate = parent.join(format!("{} ({}){}", stem, n, ext));
        if is_free(&candidate) {
            tracing::debug!(
                requested = %path.display(),
                resolved = %candidate.display(),
                "output path exists, versioned"
            );
            return candidate;
        }
        n += 1;
    }
}

fn is_free(path: &Path) -> bool {
    !path.exists() || session::meta_path(path).exists()
}
