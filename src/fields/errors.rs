//! Conversion error types
//!
//! Raised when a value cannot move between its wire string form,
//! its JSON form and its typed form.

use thiserror::Error;

use super::types::FieldType;

/// Result type for field value conversions
pub type ConversionResult<T> = Result<T, ConversionError>;

/// Field value conversion errors
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConversionError {
    /// A null value was handed to a formatter
    #[error("nil value")]
    NilValue,

    /// The string form could not be parsed as the field type
    #[error("cannot parse {input:?} as {field_type}: {reason}")]
    Parse {
        field_type: FieldType,
        input: String,
        reason: String,
    },

    /// The value variant does not belong to the field type
    #[error("value of kind {found} does not fit a {field_type} field")]
    Mismatch {
        field_type: FieldType,
        found: &'static str,
    },
}

impl ConversionError {
    pub(crate) fn parse(
        field_type: FieldType,
        input: impl Into<String>,
        reason: impl ToString,
    ) -> Self {
        Self::Parse {
            field_type,
            input: input.into(),
            reason: reason.to_string(),
        }
    }
}
