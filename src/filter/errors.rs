//! # Filter Errors
//!
//! Everything a filter document can be rejected for. Every variant except
//! `Internal` is the client's fault.

use thiserror::Error;

use crate::fields::FieldType;

/// Result type for filter parsing
pub type FilterResult<T> = Result<T, FilterError>;

/// Filter document errors
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FilterError {
    // ==================
    // Structural
    // ==================
    /// The `query` parameter is not valid JSON
    #[error("Invalid filter JSON: {0}")]
    InvalidJson(String),

    /// The document is not a JSON object
    #[error("Filter must be a JSON object of field lookups")]
    NotAnObject,

    /// The document names a field the class does not have
    #[error("{0}: unknown field")]
    UnknownField(String),

    /// The field exists but is not filter-indexed
    #[error("{0}: field is not filterable")]
    FieldNotFilterable(String),

    /// The field's entry is not a lookup map
    #[error("{0}: expected a map of lookups")]
    NotAMapping(String),

    /// Too many `_is` lookups at the top level
    #[error("Too many nested queries: {count} (max {max})")]
    NestingExceeded { count: usize, max: usize },

    /// `_is` used inside an `_is` subquery
    #[error("{0}: nested queries cannot be nested again")]
    DoubleNesting(String),

    // ==================
    // Dispatch
    // ==================
    /// No operator for this lookup on this field type
    #[error("{field}: lookup {lookup} is not supported on {field_type} fields")]
    UnsupportedLookup {
        field: String,
        lookup: String,
        field_type: FieldType,
    },

    // ==================
    // Values
    // ==================
    /// The value failed shape, kind or custom validation
    #[error("{field}.{lookup}: {reason}")]
    InvalidValue {
        field: String,
        lookup: String,
        reason: String,
    },

    /// An `_is` lookup targets a class that does not exist
    #[error("{field}.{lookup}: unknown target class {class}")]
    UnknownClass {
        field: String,
        lookup: String,
        class: String,
    },

    /// A nested `_is` document was rejected
    #[error("{field}.{lookup}: {source}")]
    Nested {
        field: String,
        lookup: String,
        #[source]
        source: Box<FilterError>,
    },

    // ==================
    // Server
    // ==================
    /// Descriptor or registry misconfiguration
    #[error("{field}.{lookup}: internal filter error: {reason}")]
    Internal {
        field: String,
        lookup: String,
        reason: String,
    },
}

impl FilterError {
    /// Whether the error is caused by client input
    pub fn is_client_error(&self) -> bool {
        match self {
            FilterError::Internal { .. } => false,
            FilterError::Nested { source, .. } => source.is_client_error(),
            _ => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_name_field_and_lookup() {
        let err = FilterError::InvalidValue {
            field: "age".into(),
            lookup: "_gt".into(),
            reason: "expected integer".into(),
        };
        assert_eq!(err.to_string(), "age._gt: expected integer");

        let err = FilterError::UnsupportedLookup {
            field: "loc".into(),
            lookup: "_in".into(),
            field_type: FieldType::Geopoint,
        };
        assert_eq!(err.to_string(), "loc: lookup _in is not supported on geopoint fields");
    }

    #[test]
    fn test_client_classification() {
        assert!(FilterError::NotAnObject.is_client_error());
        let internal = FilterError::Internal {
            field: "tags".into(),
            lookup: "_contains".into(),
            reason: "bad".into(),
        };
        assert!(!internal.is_client_error());

        let nested = FilterError::Nested {
            field: "author".into(),
            lookup: "_is".into(),
            source: Box::new(internal),
        };
        assert!(!nested.is_client_error());
    }
}
