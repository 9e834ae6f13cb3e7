//! CLI for the Cthulhu downloader.

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};
use cthulhu_core::config;
use std::path::PathBuf;

use commands::{run_config, run_get, GetArgs};

/// Top-level CLI for the Cthulhu downloader.
#[derive(Debug, Parser)]
#[command(name = "cthulhu")]
#[command(about = "Cthulhu: resumable multi-connection HTTP downloader", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: CliCommand,
}

#[derive(Debug, Subcommand)]
pub enum CliCommand {
    /// Download a URL, resuming an interrupted transfer to the same file.
    Get {
        /// Direct HTTP/HTTPS URL to download.
        url: String,

        /// Directory to save into (file name taken from the URL).
        #[arg(short = 'o', long = "output", value_name = "DIR")]
        output: Option<PathBuf>,

        /// Exact file path to save to.
        #[arg(short = 'e', long = "explicit", value_name = "FILE", conflicts_with = "output")]
        explicit: Option<PathBuf>,

        /// Concurrent connections (overrides config).
        #[arg(short = 'c', long = "connections", value_name = "N")]
        connections: Option<usize>,

        /// Chunk size, e.g. 8MiB or 500KB (overrides config).
        #[arg(long = "chunk-size", value_name = "SIZE")]
        chunk_size: Option<String>,
    },

    /// Show or change persisted settings.
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Print current settings and the config file location.
    Show,
    /// Set the default download directory.
    SetDir {
        /// Existing directory.
        dir: PathBuf,
    },
    /// Set the default number of connections.
    SetConnections {
        /// At least 1.
        n: usize,
    },
    /// Set the default chunk size, e.g. 32MiB.
    SetChunkSize {
        /// Size with optional unit (B, KB, KiB, MB, MiB, GB, GiB, TB, TiB).
        size: String,
    },
    /// Allow or forbid HTTP/2 on HTTPS connections.
    SetHttp2 {
        /// on/off (also yes/no, true/false).
        #[arg(action = clap::ArgAction::Set, value_parser = clap::builder::BoolishValueParser::new())]
        enabled: bool,
    },
}

impl CliCommand {
    pub async fn run_from_args() -> Result<()> {
        let cli = Cli::parse();
        let settings = config::load_or_init()?;
        tracing::debug!("loaded settings: {:?}", settings);

        match cli.command {
            CliCommand::Get {
                url,
                output,
                explicit,
                connections,
                chunk_size,
            } => {
                let args = GetArgs {
                    url,
                    output,
                    explicit,
                    connections,
                    chunk_size,
                };
                run_get(&settings, args).await?;
            }
            CliCommand::Config { command } => run_config(settings, command)?,
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests;
