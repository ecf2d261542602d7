//! # Pagination Errors

use thiserror::Error;

use crate::executor::ExecutorError;

/// Result type for pagination
pub type PaginationResult<T> = Result<T, PaginationError>;

/// Ordering and page-assembly errors
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PaginationError {
    // ==================
    // Client Errors
    // ==================
    /// `order_by` names a field the class does not have
    #[error("order_by {0}: unknown field")]
    UnknownOrderField(String),

    /// `order_by` names a field without an order index
    #[error("order_by {0}: field is not orderable")]
    FieldNotOrderable(String),

    /// `last_value` does not parse as the order field's type
    #[error("last_value for order_by {field}: {reason}")]
    InvalidLastValue { field: String, reason: String },

    // ==================
    // Server Errors
    // ==================
    /// The row stream failed; the page was discarded
    #[error(transparent)]
    Executor(#[from] ExecutorError),

    /// A row could not be serialized
    #[error("Failed to serialize object {id}: {reason}")]
    Serialize { id: i64, reason: String },

    /// A class is missing a built-in column
    #[error("Internal pagination error: {0}")]
    Internal(String),
}

impl PaginationError {
    /// Whether the error is caused by client input
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            PaginationError::UnknownOrderField(_)
                | PaginationError::FieldNotOrderable(_)
                | PaginationError::InvalidLastValue { .. }
        )
    }
}
