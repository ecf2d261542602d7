//! Field types and typed values
//!
//! Supported types:
//! - string: short string, stored as varchar(128)
//! - text: unbounded string
//! - integer, float, boolean
//! - datetime: UTC timestamp with microsecond precision
//! - file: stored file path
//! - reference: id of one object of a target class
//! - relation: ids of many objects of a target class
//! - object, array: arbitrary JSON
//! - geopoint: WGS 84 point

use std::cmp::Ordering;
use std::fmt;

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::errors::{ConversionError, ConversionResult};
use super::geo::GeoPoint;

/// Fixed wire format for datetime values
pub const DATETIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.6fZ";

/// PostgreSQL pattern matching `DATETIME_FORMAT`
const PG_DATETIME_FORMAT: &str = "YYYY-MM-DD\"T\"HH24:MI:SS.US\"Z\"";

/// Strings accepted as boolean true, compared case-insensitively
const TRUTH_SET: [&str; 4] = ["1", "true", "t", "yes"];

/// Field data types a class schema may declare
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    String,
    Text,
    Integer,
    Float,
    Boolean,
    Datetime,
    File,
    Reference,
    Relation,
    Object,
    Array,
    Geopoint,
}

impl FieldType {
    /// Returns the type name for error messages
    pub fn type_name(&self) -> &'static str {
        match self {
            FieldType::String => "string",
            FieldType::Text => "text",
            FieldType::Integer => "integer",
            FieldType::Float => "float",
            FieldType::Boolean => "boolean",
            FieldType::Datetime => "datetime",
            FieldType::File => "file",
            FieldType::Reference => "reference",
            FieldType::Relation => "relation",
            FieldType::Object => "object",
            FieldType::Array => "array",
            FieldType::Geopoint => "geopoint",
        }
    }

    /// Whether values of this type have a total SQL ordering usable by a
    /// keyset cursor
    pub fn is_ordered(&self) -> bool {
        !matches!(
            self,
            FieldType::Relation | FieldType::Array | FieldType::Geopoint | FieldType::Object
        )
    }

    /// Parse the string form of a value of this type.
    pub fn parse(&self, input: &str) -> ConversionResult<FieldValue> {
        let err = |reason: &dyn fmt::Display| ConversionError::parse(*self, input, reason);

        match self {
            FieldType::String | FieldType::Text | FieldType::File => {
                Ok(FieldValue::Text(input.to_string()))
            }
            FieldType::Integer | FieldType::Reference => {
                input.parse::<i64>().map(FieldValue::Int).map_err(|e| err(&e))
            }
            FieldType::Float => input.parse::<f64>().map(FieldValue::Float).map_err(|e| err(&e)),
            FieldType::Boolean => {
                let lowered = input.to_ascii_lowercase();
                Ok(FieldValue::Bool(TRUTH_SET.contains(&lowered.as_str())))
            }
            FieldType::Datetime => NaiveDateTime::parse_from_str(input, DATETIME_FORMAT)
                .map(|naive| FieldValue::Datetime(naive.and_utc()))
                .map_err(|e| err(&e)),
            FieldType::Relation => parse_id_list(input)
                .map(FieldValue::IntArray)
                .map_err(|reason| err(&reason)),
            FieldType::Object | FieldType::Array => {
                let decoded: Value = serde_json::from_str(input).map_err(|e| err(&e))?;
                self.check_json_shape(&decoded).map_err(|reason| err(&reason))?;
                Ok(FieldValue::Json(decoded))
            }
            FieldType::Geopoint => GeoPoint::from_ewkb_hex(input)
                .map(FieldValue::Point)
                .map_err(|reason| err(&reason)),
        }
    }

    /// Format a value of this type into its string form.
    ///
    /// `Null` is rejected so that an absent value never looks like an empty string.
    pub fn format(&self, value: &FieldValue) -> ConversionResult<String> {
        match (self, value) {
            (_, FieldValue::Null) => Err(ConversionError::NilValue),
            (FieldType::String | FieldType::Text | FieldType::File, FieldValue::Text(s)) => {
                Ok(s.clone())
            }
            (FieldType::Integer | FieldType::Reference, FieldValue::Int(i)) => Ok(i.to_string()),
            (FieldType::Float, FieldValue::Float(f)) => Ok(f.to_string()),
            (FieldType::Float, FieldValue::Int(i)) => Ok((*i as f64).to_string()),
            (FieldType::Boolean, FieldValue::Bool(b)) => Ok(b.to_string()),
            (FieldType::Datetime, FieldValue::Datetime(dt)) => {
                Ok(dt.format(DATETIME_FORMAT).to_string())
            }
            (FieldType::Relation, FieldValue::IntArray(ids)) => Ok(format_id_list(ids)),
            (FieldType::Object | FieldType::Array, FieldValue::Json(v)) => {
                serde_json::to_string(v).map_err(|e| ConversionError::parse(*self, "", e))
            }
            (FieldType::Geopoint, FieldValue::Point(p)) => Ok(p.to_ewkb_hex()),
            (_, other) => Err(ConversionError::Mismatch {
                field_type: *self,
                found: other.kind_name(),
            }),
        }
    }

    /// Convert a decoded JSON value into a typed value of this type.
    ///
    /// Strings carrying the wire form (datetime, geopoint, relation) go
    /// through `parse`; JSON null becomes `Null`.
    pub fn value_from_json(&self, value: &Value) -> ConversionResult<FieldValue> {
        let mismatch = || ConversionError::Mismatch {
            field_type: *self,
            found: json_kind_name(value),
        };

        match (self, value) {
            (_, Value::Null) => Ok(FieldValue::Null),
            (FieldType::String | FieldType::Text | FieldType::File, Value::String(s)) => {
                Ok(FieldValue::Text(s.clone()))
            }
            (FieldType::Integer | FieldType::Reference, Value::Number(n)) => {
                json_number_as_int(n).map(FieldValue::Int).ok_or_else(mismatch)
            }
            (FieldType::Float, Value::Number(n)) => {
                n.as_f64().map(FieldValue::Float).ok_or_else(mismatch)
            }
            (FieldType::Boolean, Value::Bool(b)) => Ok(FieldValue::Bool(*b)),
            (FieldType::Datetime, Value::String(s)) => parse_datetime_lenient(s)
                .map(FieldValue::Datetime)
                .ok_or_else(|| ConversionError::parse(*self, s.clone(), "not a timestamp")),
            (FieldType::Relation, Value::Array(items)) => items
                .iter()
                .map(|item| match item {
                    Value::Number(n) => json_number_as_int(n).ok_or_else(mismatch),
                    _ => Err(mismatch()),
                })
                .collect::<ConversionResult<Vec<_>>>()
                .map(FieldValue::IntArray),
            (FieldType::Relation, Value::String(s)) => self.parse(s),
            (FieldType::Object, Value::Object(_)) | (FieldType::Array, Value::Array(_)) => {
                Ok(FieldValue::Json(value.clone()))
            }
            (FieldType::Geopoint, Value::String(s)) => self.parse(s),
            (FieldType::Geopoint, Value::Object(map)) => {
                let coord = |key: &str| map.get(key).and_then(Value::as_f64);
                match (coord("longitude"), coord("latitude")) {
                    (Some(lon), Some(lat)) => Ok(FieldValue::Point(GeoPoint::new(lon, lat))),
                    _ => Err(mismatch()),
                }
            }
            _ => Err(mismatch()),
        }
    }

    /// SQL cast of a raw stored expression to this type's native column type.
    pub fn cast_sql(&self, raw: &str) -> String {
        match self {
            FieldType::String => format!("({})::varchar(128)", raw),
            FieldType::Text | FieldType::File => format!("({})::text", raw),
            FieldType::Integer | FieldType::Reference => format!("({})::integer", raw),
            FieldType::Float => format!("({})::double precision", raw),
            FieldType::Boolean => format!("({})::boolean", raw),
            FieldType::Datetime => format!("to_timestamp({}, '{}')", raw, PG_DATETIME_FORMAT),
            FieldType::Relation => format!("({})::integer[]", raw),
            FieldType::Object | FieldType::Array => format!("({})::jsonb", raw),
            FieldType::Geopoint => format!("({})::geography(POINT,4326)", raw),
        }
    }

    fn check_json_shape(&self, value: &Value) -> Result<(), String> {
        match (self, value) {
            (FieldType::Object, Value::Object(_)) | (FieldType::Array, Value::Array(_)) => Ok(()),
            _ => Err(format!("expected a JSON {}", self.type_name())),
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.type_name())
    }
}

/// A typed field value
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Datetime(DateTime<Utc>),
    IntArray(Vec<i64>),
    Json(Value),
    Point(GeoPoint),
}

impl FieldValue {
    pub fn is_null(&self) -> bool {
        matches!(self, FieldValue::Null)
    }

    /// Name of the variant for error messages
    pub fn kind_name(&self) -> &'static str {
        match self {
            FieldValue::Null => "null",
            FieldValue::Bool(_) => "boolean",
            FieldValue::Int(_) => "integer",
            FieldValue::Float(_) => "float",
            FieldValue::Text(_) => "string",
            FieldValue::Datetime(_) => "datetime",
            FieldValue::IntArray(_) => "id list",
            FieldValue::Json(_) => "json",
            FieldValue::Point(_) => "geopoint",
        }
    }

    /// JSON form used when serializing objects to clients
    pub fn to_json(&self) -> Value {
        match self {
            FieldValue::Null => Value::Null,
            FieldValue::Bool(b) => Value::Bool(*b),
            FieldValue::Int(i) => Value::from(*i),
            FieldValue::Float(f) => serde_json::Number::from_f64(*f)
                .map(Value::Number)
                .unwrap_or(Value::Null),
            FieldValue::Text(s) => Value::String(s.clone()),
            FieldValue::Datetime(dt) => Value::String(dt.format(DATETIME_FORMAT).to_string()),
            FieldValue::IntArray(ids) => Value::from(ids.clone()),
            FieldValue::Json(v) => v.clone(),
            FieldValue::Point(p) => serde_json::json!({
                "longitude": p.longitude,
                "latitude": p.latitude,
            }),
        }
    }

    /// SQL ordering between two values; `None` when either side is null
    /// or the kinds are not comparable.
    pub fn sql_cmp(&self, other: &FieldValue) -> Option<Ordering> {
        match (self, other) {
            (FieldValue::Int(a), FieldValue::Int(b)) => Some(a.cmp(b)),
            (FieldValue::Int(a), FieldValue::Float(b)) => (*a as f64).partial_cmp(b),
            (FieldValue::Float(a), FieldValue::Int(b)) => a.partial_cmp(&(*b as f64)),
            (FieldValue::Float(a), FieldValue::Float(b)) => a.partial_cmp(b),
            (FieldValue::Text(a), FieldValue::Text(b)) => Some(a.cmp(b)),
            (FieldValue::Bool(a), FieldValue::Bool(b)) => Some(a.cmp(b)),
            (FieldValue::Datetime(a), FieldValue::Datetime(b)) => Some(a.cmp(b)),
            (FieldValue::IntArray(a), FieldValue::IntArray(b)) => Some(a.cmp(b)),
            _ => None,
        }
    }
}

/// Accept an integral JSON number for an integer target.
///
/// Floats are narrowed only when they carry no fractional part.
pub fn json_number_as_int(n: &serde_json::Number) -> Option<i64> {
    if let Some(i) = n.as_i64() {
        return Some(i);
    }
    let f = n.as_f64()?;
    if f.fract() == 0.0 && f >= i64::MIN as f64 && f <= i64::MAX as f64 {
        Some(f as i64)
    } else {
        None
    }
}

/// Datetime from either the fixed wire format or RFC 3339
pub fn parse_datetime_lenient(input: &str) -> Option<DateTime<Utc>> {
    NaiveDateTime::parse_from_str(input, DATETIME_FORMAT)
        .map(|naive| naive.and_utc())
        .ok()
        .or_else(|| {
            DateTime::parse_from_rfc3339(input)
                .ok()
                .map(|dt| dt.with_timezone(&Utc))
        })
}

pub(crate) fn json_kind_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "list",
        Value::Object(_) => "map",
    }
}

fn parse_id_list(input: &str) -> Result<Vec<i64>, String> {
    let inner = input
        .trim()
        .strip_prefix('{')
        .and_then(|s| s.strip_suffix('}'))
        .ok_or_else(|| "expected a brace-delimited list".to_string())?;

    if inner.trim().is_empty() {
        return Ok(Vec::new());
    }

    inner
        .split(',')
        .map(|part| {
            part.trim()
                .parse::<i64>()
                .map_err(|e| format!("invalid id {:?}: {}", part.trim(), e))
        })
        .collect()
}

fn format_id_list(ids: &[i64]) -> String {
    let parts: Vec<String> = ids.iter().map(i64::to_string).collect();
    format!("{{{}}}", parts.join(","))
}
