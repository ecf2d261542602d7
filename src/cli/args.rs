//! CLI argument definitions using clap
//!
//! Commands:
//! - tenantdb serve --config <path> --data <path>
//! - tenantdb check --config <path> --data <path>

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// tenantdb - multi-tenant object store with typed filters and keyset pagination
#[derive(Parser, Debug)]
#[command(name = "tenantdb")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Load the data file and serve the listing API
    Serve {
        /// Path to configuration file
        #[arg(long, default_value = "./tenantdb.json")]
        config: PathBuf,

        /// Path to the instances data file
        #[arg(long, default_value = "./data.json")]
        data: PathBuf,
    },

    /// Validate configuration and data file, then exit
    Check {
        /// Path to configuration file
        #[arg(long, default_value = "./tenantdb.json")]
        config: PathBuf,

        /// Path to the instances data file
        #[arg(long, default_value = "./data.json")]
        data: PathBuf,
    },
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}
