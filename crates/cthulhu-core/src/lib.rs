pub mod config;
pub mod logging;

pub mod chunker;
pub mod control;
pub mod error;
pub mod fetcher;
pub mod http;
pub mod path;
pub mod probe;
pub mod progress;
pub mod session;
pub mod single;
pub mod size;
pub mod storage;
pub mod transfer;

pub use error::{FetchError, TransferError};
pub use transfer::{Downloader, TransferOutcome, TransferRequest, TransferStrategy};
