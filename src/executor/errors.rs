//! Executor error types
//!
//! Error codes:
//! - EXECUTION_CANCELLED: the request was cancelled while rows were streaming
//! - EXECUTION_FAILED: the backing store failed

use thiserror::Error;

/// Result type for executor operations
pub type ExecutorResult<T> = Result<T, ExecutorError>;

/// Row executor errors
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ExecutorError {
    /// The request was cancelled mid-stream
    #[error("Query cancelled")]
    Cancelled,

    /// The backing store failed
    #[error("Query execution failed: {0}")]
    Failed(String),
}

impl ExecutorError {
    pub fn failed(reason: impl Into<String>) -> Self {
        ExecutorError::Failed(reason.into())
    }

    /// Stable error code
    pub fn code(&self) -> &'static str {
        match self {
            ExecutorError::Cancelled => "EXECUTION_CANCELLED",
            ExecutorError::Failed(_) => "EXECUTION_FAILED",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes() {
        assert_eq!(ExecutorError::Cancelled.code(), "EXECUTION_CANCELLED");
        assert_eq!(ExecutorError::failed("disk").code(), "EXECUTION_FAILED");
    }

    #[test]
    fn test_display() {
        assert_eq!(
            ExecutorError::failed("connection reset").to_string(),
            "Query execution failed: connection reset"
        );
    }
}
