//! CLI-specific error types
//!
//! Every CLI error is fatal: `main` prints it and exits non-zero.

use thiserror::Error;

use crate::catalog::CatalogError;
use crate::config::ConfigError;

/// CLI result type
pub type CliResult<T> = Result<T, CliError>;

/// CLI error
#[derive(Debug, Error)]
pub enum CliError {
    #[error("{0}")]
    Config(#[from] ConfigError),

    #[error("Failed to read data file {path}: {source}")]
    DataRead {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid data file: {0}")]
    InvalidData(String),

    #[error("Invalid data file: {0}")]
    Catalog(#[from] CatalogError),

    #[error("Boot failed: {0}")]
    BootFailed(String),
}

impl CliError {
    pub fn invalid_data(msg: impl Into<String>) -> Self {
        Self::InvalidData(msg.into())
    }

    /// Error code string
    pub fn code(&self) -> &'static str {
        match self {
            Self::Config(_) => "TENANTDB_CLI_CONFIG_ERROR",
            Self::DataRead { .. } => "TENANTDB_CLI_IO_ERROR",
            Self::InvalidData(_) | Self::Catalog(_) => "TENANTDB_CLI_DATA_ERROR",
            Self::BootFailed(_) => "TENANTDB_CLI_BOOT_FAILED",
        }
    }
}
