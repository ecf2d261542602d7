//! Service configuration
//!
//! Loaded once at startup from a JSON file. Every field has a default so
//! an empty object `{}` is a valid configuration.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type for configuration loading
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid config JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid config: {0}")]
    Invalid(String),
}

/// Filter engine limits
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryConfig {
    /// Maximum `_is` lookups in one top-level filter document
    #[serde(default = "default_max_nesting")]
    pub max_nesting: usize,

    /// Row limit of an `_is` subquery
    #[serde(default = "default_subquery_limit")]
    pub subquery_limit: usize,

    /// Maximum length of a list-valued lookup
    #[serde(default = "default_max_list_len")]
    pub max_list_len: usize,
}

fn default_max_nesting() -> usize {
    4
}

fn default_subquery_limit() -> usize {
    128
}

fn default_max_list_len() -> usize {
    128
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            max_nesting: default_max_nesting(),
            subquery_limit: default_subquery_limit(),
            max_list_len: default_max_list_len(),
        }
    }
}

/// Pagination limits
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaginationConfig {
    #[serde(default = "default_page_size")]
    pub default_page_size: usize,

    #[serde(default = "default_max_page_size")]
    pub max_page_size: usize,

    /// Cumulative serialized-object budget of one page, in bytes
    #[serde(default = "default_max_response_bytes")]
    pub max_response_bytes: usize,
}

fn default_page_size() -> usize {
    100
}

fn default_max_page_size() -> usize {
    500
}

fn default_max_response_bytes() -> usize {
    2 * 1024 * 1024
}

impl Default for PaginationConfig {
    fn default() -> Self {
        Self {
            default_page_size: default_page_size(),
            max_page_size: default_max_page_size(),
            max_response_bytes: default_max_response_bytes(),
        }
    }
}

/// HTTP listener settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HttpConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Allowed CORS origins; empty allows any origin
    #[serde(default)]
    pub cors_origins: Vec<String>,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            cors_origins: Vec::new(),
        }
    }
}

impl HttpConfig {
    pub fn socket_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Top-level configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceConfig {
    #[serde(default)]
    pub query: QueryConfig,

    #[serde(default)]
    pub pagination: PaginationConfig,

    #[serde(default)]
    pub http: HttpConfig,
}

impl ServiceConfig {
    /// Load and validate configuration from a JSON file
    pub fn load(path: &Path) -> ConfigResult<Self> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json_str(&content)
    }

    pub fn from_json_str(content: &str) -> ConfigResult<Self> {
        let config: ServiceConfig = serde_json::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> ConfigResult<()> {
        let p = &self.pagination;
        if p.max_page_size == 0 {
            return Err(ConfigError::Invalid("pagination.max_page_size must be > 0".into()));
        }
        if p.default_page_size > p.max_page_size {
            return Err(ConfigError::Invalid(format!(
                "pagination.default_page_size {} exceeds max_page_size {}",
                p.default_page_size, p.max_page_size
            )));
        }
        if p.max_response_bytes == 0 {
            return Err(ConfigError::Invalid(
                "pagination.max_response_bytes must be > 0".into(),
            ));
        }
        if self.query.max_nesting == 0 {
            return Err(ConfigError::Invalid("query.max_nesting must be >= 1".into()));
        }
        if self.query.max_list_len == 0 {
            return Err(ConfigError::Invalid("query.max_list_len must be >= 1".into()));
        }
        Ok(())
    }
}
