//! Tests for the get subcommand and option merging.

use super::parse;
use crate::cli::commands::{build_request, GetArgs};
use crate::cli::{Cli, CliCommand};
use clap::Parser;
use cthulhu_core::config::Settings;
use cthulhu_core::TransferError;
use std::path::{Path, PathBuf};

fn get_args(cmd: CliCommand) -> GetArgs {
    match cmd {
        CliCommand::Get {
            url,
            output,
            explicit,
            connections,
            chunk_size,
        } => GetArgs {
            url,
            output,
            explicit,
            connections,
            chunk_size,
        },
        _ => panic!("expected Get"),
    }
}

#[test]
fn cli_parse_get_minimal() {
    let args = get_args(parse(&["cthulhu", "get", "https://example.com/file.iso"]));
    assert_eq!(args.url, "https://example.com/file.iso");
    assert!(args.output.is_none());
    assert!(args.explicit.is_none());
    assert!(args.connections.is_none());
    assert!(args.chunk_size.is_none());
}

#[test]
fn cli_parse_get_all_options() {
    let args = get_args(parse(&[
        "cthulhu",
        "get",
        "https://example.com/x",
        "-o",
        "/tmp",
        "-c",
        "8",
        "--chunk-size",
        "16MiB",
    ]));
    assert_eq!(args.output.as_deref(), Some(Path::new("/tmp")));
    assert_eq!(args.connections, Some(8));
    assert_eq!(args.chunk_size.as_deref(), Some("16MiB"));
}

#[test]
fn cli_parse_get_explicit() {
    let args = get_args(parse(&[
        "cthulhu",
        "get",
        "https://example.com/x",
        "-e",
        "/tmp/out.bin",
    ]));
    assert_eq!(args.explicit.as_deref(), Some(Path::new("/tmp/out.bin")));
}

#[test]
fn cli_parse_get_output_conflicts_with_explicit() {
    let res = Cli::try_parse_from([
        "cthulhu",
        "get",
        "https://example.com/x",
        "-o",
        "/tmp",
        "-e",
        "/tmp/out.bin",
    ]);
    assert!(res.is_err());
}

#[test]
fn cli_parse_get_requires_url() {
    assert!(Cli::try_parse_from(["cthulhu", "get"]).is_err());
}

#[test]
fn request_uses_settings_defaults() {
    let settings = Settings {
        download_dir: Some(PathBuf::from("/srv/downloads")),
        max_connections: 6,
        chunk_size_bytes: 4 << 20,
        enable_http2: true,
    };
    let args = GetArgs {
        url: "https://example.com/f".to_string(),
        ..Default::default()
    };
    let req = build_request(&settings, args, Path::new("/cwd")).unwrap();
    assert_eq!(req.output, PathBuf::from("/srv/downloads"));
    assert!(!req.explicit);
    assert_eq!(req.connections, 6);
    assert_eq!(req.chunk_size, 4 << 20);
}

#[test]
fn request_falls_back_to_cwd() {
    let args = GetArgs {
        url: "https://example.com/f".to_string(),
        ..Default::default()
    };
    let req = build_request(&Settings::default(), args, Path::new("/cwd")).unwrap();
    assert_eq!(req.output, PathBuf::from("/cwd"));
    assert_eq!(req.connections, 10);
}

#[test]
fn request_flags_override_settings() {
    let args = GetArgs {
        url: "https://example.com/f".to_string(),
        explicit: Some(PathBuf::from("/tmp/out.bin")),
        connections: Some(2),
        chunk_size: Some("1.5MiB".to_string()),
        ..Default::default()
    };
    let req = build_request(&Settings::default(), args, Path::new("/cwd")).unwrap();
    assert_eq!(req.output, PathBuf::from("/tmp/out.bin"));
    assert!(req.explicit);
    assert_eq!(req.connections, 2);
    assert_eq!(req.chunk_size, 1_572_864);
}

#[test]
fn request_rejects_bad_values() {
    let bad_size = GetArgs {
        url: "https://example.com/f".to_string(),
        chunk_size: Some("12parsecs".to_string()),
        ..Default::default()
    };
    let err = build_request(&Settings::default(), bad_size, Path::new("/cwd")).unwrap_err();
    assert!(matches!(
        err.downcast_ref::<TransferError>(),
        Some(TransferError::InvalidInput(_))
    ));

    let zero_conns = GetArgs {
        url: "https://example.com/f".to_string(),
        connections: Some(0),
        ..Default::default()
    };
    assert!(build_request(&Settings::default(), zero_conns, Path::new("/cwd")).is_err());

    let bad_url = GetArgs {
        url: "example.com/f".to_string(),
        ..Default::default()
    };
    assert!(build_request(&Settings::default(), bad_url, Path::new("/cwd")).is_err());
}
