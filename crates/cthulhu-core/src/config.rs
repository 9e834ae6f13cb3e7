//! User settings: default download directory, connection count, chunk size,
//! HTTP/2 preference.
//!
//! Stored as TOML at `~/.config/cthulhu/config.toml`.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::TransferError;
use crate::size;

/// Default chunk size: 32 MiB.
pub const DEFAULT_CHUNK_SIZE: u64 = 32 << 20;

/// Persisted user preferences.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    /// Directory downloads land in when no `-o`/`-e` is given.
    #[serde(default)]
    pub download_dir: Option<PathBuf>,
    /// Concurrent connections (chunk workers) per transfer.
    pub max_connections: usize,
    /// Bytes per chunk for ranged transfers.
    pub chunk_size_bytes: u64,
    /// Allow HTTP/2 on HTTPS connections. Missing in older files; defaults on.
    #[serde(default = "default_enable_http2")]
    pub enable_http2: bool,
}

fn default_enable_http2() -> bool {
    true
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            download_dir: None,
            max_connections: 10,
            chunk_size_bytes: DEFAULT_CHUNK_SIZE,
            enable_http2: true,
        }
    }
}

impl Settings {
    /// Set the default download directory; it must already exist.
    pub fn set_download_dir(&mut self, dir: &Path) -> Result<(), TransferError> {
        if !dir.is_dir() {
            return Err(TransferError::InvalidInput(format!(
                "'{}' is not a valid directory",
                dir.display()
            )));
        }
        self.download_dir = Some(dir.to_path_buf());
        Ok(())
    }

    pub fn set_max_connections(&mut self, n: usize) -> Result<(), TransferError> {
        if n == 0 {
            return Err(TransferError::InvalidInput(
                "connection count must be at least 1".to_string(),
            ));
        }
        self.max_connections = n;
        Ok(())
    }

    /// Set the chunk size from a human string like "16MB" or "4MiB".
    pub fn set_chunk_size(&mut self, input: &str) -> Result<u64, TransferError> {
        let bytes = size::parse_size(input)
            .map_err(|e| TransferError::InvalidInput(e.to_string()))?;
        if bytes == 0 {
            return Err(TransferError::InvalidInput(
                "chunk size must be greater than zero".to_string(),
            ));
        }
        self.chunk_size_bytes = bytes;
        Ok(bytes)
    }
}

pub fn config_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("cthulhu")?;
    Ok(xdg_dirs.place_config_file("config.toml")?)
}

/// Load settings from the default location, creating a default file if none exists.
pub fn load_or_init() -> Result<Settings> {
    load_or_init_at(&config_path()?)
}

/// Load settings from `path`, writing defaults there first if it is missing.
pub fn load_or_init_at(path: &Path) -> Result<Settings> {
    if !path.exists() {
        let default_cfg = Settings::default();
        save_to(path, &default_cfg)?;
        tracing::info!("created default config at {}", path.display());
        return Ok(default_cfg);
    }

    let data = fs::read_to_string(path)?;
    let cfg: Settings = toml::from_str(&data)?;
    Ok(cfg)
}

pub fn save(settings: &Settings) -> Result<()> {
    save_to(&config_path()?, settings)
}

pub fn save_to(path: &Path, settings: &Settings) -> Result<()> {
    let toml = toml::to_string_pretty(settings)?;
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, toml)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_values() {
        let cfg = Settings::default();
        assert!(cfg.download_dir.is_none());
        assert_eq!(cfg.max_connections, 10);
        assert_eq!(cfg.chunk_size_bytes, 32 * 1024 * 1024);
        assert!(cfg.enable_http2);
    }

    #[test]
    fn toml_roundtrip() {
        let cfg = Settings {
            download_dir: Some(PathBuf::from("/srv/downloads")),
            max_connections: 4,
            chunk_size_bytes: 1 << 20,
            enable_http2: false,
        };
        let toml = toml::to_string_pretty(&cfg).unwrap();
        let parsed: Settings = toml::from_str(&toml).unwrap();
        assert_eq!(parsed, cfg);
    }

    #[test]
    fn toml_without_download_dir() {
        let toml = r#"
            max_connections = 8
            chunk_size_bytes = 16000000
        "#;
        let cfg: Settings = toml::from_str(toml).unwrap();
        assert!(cfg.download_dir.is_none());
        assert_eq!(cfg.max_connections, 8);
        assert_eq!(cfg.chunk_size_bytes, 16_000_000);
        assert!(cfg.enable_http2);
    }

    #[test]
    fn toml_with_http2_disabled() {
        let toml = r#"
            max_connections = 8
            chunk_size_bytes = 16000000
            enable_http2 = false
        "#;
        let cfg: Settings = toml::from_str(toml).unwrap();
        assert!(!cfg.enable_http2);
    }

    #[test]
    fn load_or_init_creates_then_reads() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let first = load_or_init_at(&path).unwrap();
        assert_eq!(first, Settings::default());
        assert!(path.exists());

        let mut changed = first.clone();
        changed.set_max_connections(3).unwrap();
        save_to(&path, &changed).unwrap();
        assert_eq!(load_or_init_at(&path).unwrap().max_connections, 3);
    }

    #[test]
    fn setters_validate() {
        let dir = tempfile::tempdir().unwrap();
        let mut cfg = Settings::default();

        cfg.set_download_dir(dir.path()).unwrap();
        assert_eq!(cfg.download_dir.as_deref(), Some(dir.path()));
        assert!(cfg.set_download_dir(&dir.path().join("missing")).is_err());

        assert!(cfg.set_max_connections(0).is_err());
        assert_eq!(cfg.set_chunk_size("4MiB").unwrap(), 4 << 20);
        assert_eq!(cfg.chunk_size_bytes, 4 << 20);
        assert!(cfg.set_chunk_size("0").is_err());
        assert!(cfg.set_chunk_size("lots").is_err());
    }
}
