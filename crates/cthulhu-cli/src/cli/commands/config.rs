//! `cthulhu config` – show and update persisted settings.

use anyhow::Result;
use cthulhu_core::config::{self, Settings};
use cthulhu_core::logging;

use super::render::format_bytes;
use crate::cli::ConfigCommand;

pub fn run_config(mut settings: Settings, command: ConfigCommand) -> Result<()> {
    match command {
        ConfigCommand::Show => {
            let dir = settings
                .download_dir
                .as_ref()
                .map(|d| d.display().to_string())
                .unwrap_or_else(|| "(current directory)".to_string());
            println!("config file:   {}", config::config_path()?.display());
            println!("download dir:  {}", dir);
            println!("connections:   {}", settings.max_connections);
            println!(
                "chunk size:    {} ({} bytes)",
                format_bytes(settings.chunk_size_bytes),
                settings.chunk_size_bytes
            );
            println!("http/2:        {}", on_off(settings.enable_http2));
            if let Ok(log) = logging::log_path() {
                println!("log file:      {}", log.display());
            }
            return Ok(());
        }
        ConfigCommand::SetDir { dir } => {
            settings.set_download_dir(&dir)?;
            println!("download dir set to {}", dir.display());
        }
        ConfigCommand::SetConnections { n } => {
            settings.set_max_connections(n)?;
            println!("connections set to {}", n);
        }
        ConfigCommand::SetChunkSize { size } => {
            let bytes = settings.set_chunk_size(&size)?;
            println!("chunk size set to {} ({} bytes)", format_bytes(bytes), bytes);
        }
        ConfigCommand::SetHttp2 { enabled } => {
            settings.enable_http2 = enabled;
            println!("http/2 {}", on_off(enabled));
        }
    }
    config::save(&settings)?;
    tracing::info!("settings updated: {:?}", settings);
    Ok(())
}

fn on_off(enabled: bool) -> &'static str {
    if enabled {
        "on"
    } else {
        "off"
    }
}
