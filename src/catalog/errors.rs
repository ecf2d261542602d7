//! # Catalog Errors

use thiserror::Error;

/// Result type for class definitions
pub type CatalogResult<T> = Result<T, CatalogError>;

/// Class definition errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CatalogError {
    /// A schema field reuses the name of a fixed column
    #[error("class {class}: field {field} is a reserved column name")]
    ReservedField { class: String, field: String },

    /// Two schema fields share a name
    #[error("class {class}: field {field} is declared twice")]
    DuplicateField { class: String, field: String },
}
