//! `cthulhu get` – download one URL with live progress.

use anyhow::Result;
use cthulhu_core::config::Settings;
use cthulhu_core::http::HttpOptions;
use cthulhu_core::progress::{Progress, ProgressFn};
use cthulhu_core::size::parse_size;
use cthulhu_core::{Downloader, TransferError, TransferRequest, TransferStrategy};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::watch;

use super::render::{self, format_bytes};

/// Raw `get` arguments; unset values come from settings.
#[derive(Debug, Clone, Default)]
pub struct GetArgs {
    pub url: String,
    pub output: Option<PathBuf>,
    pub explicit: Option<PathBuf>,
    pub connections: Option<usize>,
    pub chunk_size: Option<String>,
}

/// Merges `args` over `settings`. Output precedence: `-e FILE`, `-o DIR`,
/// configured download dir, then `cwd`.
pub(crate) fn build_request(settings: &Settings, args: GetArgs, cwd: &Path) -> Result<TransferRequest> {
    let (output, explicit) = match (args.explicit, args.output) {
        (Some(file), _) => (file, true),
        (None, Some(dir)) => (dir, false),
        (None, None) => (
            settings
                .download_dir
                .clone()
                .unwrap_or_else(|| cwd.to_path_buf()),
            false,
        ),
    };
    let chunk_size = match args.chunk_size.as_deref() {
        Some(s) => parse_size(s).map_err(|e| TransferError::InvalidInput(e.to_string()))?,
        None => settings.chunk_size_bytes,
    };
    let req = TransferRequest {
        url: args.url,
        output,
        explicit,
        connections: args.connections.unwrap_or(settings.max_connections),
        chunk_size,
    };
    req.validate()?;
    Ok(req)
}

pub async fn run_get(settings: &Settings, args: GetArgs) -> Result<()> {
    let req = build_request(settings, args, &std::env::current_dir()?)?;
    tracing::debug!(?req, "get");

    let downloader = Downloader::new(HttpOptions::from_settings(settings));
    let abort = downloader.abort_handle();
    let ctrl_c = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!("\ninterrupt received, stopping...");
            abort.abort();
        }
    });

    let (tx, rx) = watch::channel(None::<Progress>);
    let on_progress: ProgressFn = Arc::new(move |p| {
        tx.send_replace(Some(p));
    });
    let renderer = tokio::spawn(render::render_loop(rx));

    let result = downloader.transfer(&req, Some(on_progress)).await;
    ctrl_c.abort();
    let _ = renderer.await;

    match result {
        Ok(outcome) => {
            if outcome.resumed_bytes > 0 {
                println!(
                    "resumed with {} already on disk",
                    format_bytes(outcome.resumed_bytes)
                );
            }
            let mode = match outcome.strategy {
                TransferStrategy::Ranged { .. } => {
                    format!("{} connections", req.connections)
                }
                TransferStrategy::SingleStream { .. } => "single stream".to_string(),
            };
            println!(
                "saved {} ({}, {})",
                outcome.path.display(),
                format_bytes(outcome.bytes),
                mode
            );
            Ok(())
        }
        Err(e) => {
            if matches!(
                e.downcast_ref::<TransferError>(),
                Some(TransferError::Aborted | TransferError::ChunkFetch { .. })
            ) {
                eprintln!("partial download kept; run the same command again to resume");
            }
            Err(e)
        }
    }
}
