//! Field type system
//!
//! Canonical value⇄string conversion, JSON coercion and SQL expression
//! synthesis for every field kind a class may declare, plus the
//! descriptors through which filters and cursors address fields.

mod descriptor;
mod errors;
mod geo;
mod types;

pub use descriptor::{builtin_columns, FieldDescriptor, FieldLookup, FieldSet, FieldSource, DATA_COLUMN};
pub use errors::{ConversionError, ConversionResult};
pub use geo::{GeoPoint, EARTH_RADIUS_METERS, SRID_WGS84};
pub use types::{
    json_number_as_int, parse_datetime_lenient, FieldType, FieldValue, DATETIME_FORMAT,
};
pub(crate) use types::json_kind_name;
