//! CLI command handlers.

mod config;
mod get;
mod render;

pub use config::run_config;
pub use get::{run_get, GetArgs};

#[cfg(test)]
pub(crate) use get::build_request;
