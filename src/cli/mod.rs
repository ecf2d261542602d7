//! CLI module for tenantdb
//!
//! Provides command-line interface for:
//! - serve: load configuration and data, then serve the HTTP API
//! - check: validate configuration and data, then exit

mod args;
mod commands;
mod data;
mod errors;

pub use args::{Cli, Command};
pub use commands::{check, run, run_command, serve};
pub use data::LoadedData;
pub use errors::{CliError, CliResult};
