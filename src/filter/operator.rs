//! # Filter Operators
//!
//! An operator is one (lookup suffix, type scope) entry of the registry:
//! what value shape it accepts, how it validates the value and how it turns
//! the validated value into a predicate.

use std::sync::Arc;

use serde_json::{Map, Value};

use crate::catalog::{Class, ClassCatalog};
use crate::fields::{
    json_kind_name, json_number_as_int, parse_datetime_lenient, FieldType, FieldValue, GeoPoint,
};
use crate::query::{Operand, Predicate, SelectQuery};

use super::errors::{FilterError, FilterResult};
use super::validator::QueryValidator;

/// Field types an operator applies to
///
/// Allow-list and deny-list are mutually exclusive by construction.
#[derive(Debug, Clone, Copy)]
pub enum TypeScope {
    Any,
    Only(&'static [FieldType]),
    Except(&'static [FieldType]),
}

impl TypeScope {
    pub fn matches(&self, field_type: FieldType) -> bool {
        match self {
            TypeScope::Any => true,
            TypeScope::Only(types) => types.contains(&field_type),
            TypeScope::Except(types) => !types.contains(&field_type),
        }
    }
}

/// Kind of a single value an operator expects
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    /// The field type's own scalar kind
    Native,
    Bool,
    Map,
}

/// Scalar or list value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shape {
    Scalar(ValueKind),
    List(ValueKind),
}

/// A lookup value at some stage of validation
#[derive(Debug, Clone, PartialEq)]
pub enum Resolved {
    Value(FieldValue),
    List(Vec<FieldValue>),
    Map(Map<String, Value>),
    Near { point: GeoPoint, meters: f64 },
    Subquery(Box<SelectQuery>),
}

/// Rejection raised inside an operator, before field/lookup context is attached
#[derive(Debug, Clone, PartialEq)]
pub enum Rejection {
    Invalid(String),
    UnknownClass(String),
    Nested(FilterError),
    Internal(String),
}

impl Rejection {
    pub fn invalid(reason: impl Into<String>) -> Self {
        Rejection::Invalid(reason.into())
    }

    pub fn internal(reason: impl Into<String>) -> Self {
        Rejection::Internal(reason.into())
    }

    fn into_filter_error(self, field: &str, lookup: &str) -> FilterError {
        let field = field.to_string();
        let lookup = lookup.to_string();
        match self {
            Rejection::Invalid(reason) => FilterError::InvalidValue {
                field,
                lookup,
                reason,
            },
            Rejection::UnknownClass(class) => FilterError::UnknownClass {
                field,
                lookup,
                class,
            },
            Rejection::Nested(source) => FilterError::Nested {
                field,
                lookup,
                source: Box::new(source),
            },
            Rejection::Internal(reason) => FilterError::Internal {
                field,
                lookup,
                reason,
            },
        }
    }
}

/// State available to custom validators
pub struct ValidationContext<'a> {
    pub validator: &'a QueryValidator<'a>,
    pub catalog: &'a dyn ClassCatalog,
    pub class: &'a Arc<Class>,
    pub depth: usize,
}

pub type ValidateFn = fn(&ValidationContext<'_>, &Operand, Resolved) -> Result<Resolved, Rejection>;
pub type BuildFn = fn(&Operand, Resolved) -> Result<Predicate, Rejection>;

/// One registered operator
#[derive(Clone)]
pub struct FilterOperator {
    lookup: &'static str,
    scope: TypeScope,
    shape: Shape,
    validate: Option<ValidateFn>,
    build: BuildFn,
}

impl std::fmt::Debug for FilterOperator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FilterOperator")
            .field("lookup", &self.lookup)
            .field("scope", &self.scope)
            .field("shape", &self.shape)
            .field("custom_validation", &self.validate.is_some())
            .finish()
    }
}

impl FilterOperator {
    pub fn new(lookup: &'static str, scope: TypeScope, shape: Shape, build: BuildFn) -> Self {
        Self {
            lookup,
            scope,
            shape,
            validate: None,
            build,
        }
    }

    pub fn with_validation(mut self, validate: ValidateFn) -> Self {
        self.validate = Some(validate);
        self
    }

    pub fn lookup(&self) -> &'static str {
        self.lookup
    }

    pub fn scope(&self) -> TypeScope {
        self.scope
    }

    pub fn shape(&self) -> Shape {
        self.shape
    }

    pub fn build_fn(&self) -> BuildFn {
        self.build
    }

    pub fn supports(&self, field_type: FieldType) -> bool {
        self.scope.matches(field_type)
    }

    /// Validate `raw` for `field` and build the predicate.
    pub fn apply(
        &self,
        ctx: &ValidationContext<'_>,
        field: &Operand,
        raw: &Value,
    ) -> FilterResult<Predicate> {
        self.run(ctx, field, raw)
            .map_err(|rejection| rejection.into_filter_error(field.name(), self.lookup))
    }

    fn run(
        &self,
        ctx: &ValidationContext<'_>,
        field: &Operand,
        raw: &Value,
    ) -> Result<Predicate, Rejection> {
        let field_type = field.field_type();
        let mut value = match self.shape {
            Shape::Scalar(kind) => {
                if raw.is_array() {
                    return Err(Rejection::invalid("expected a single value, got a list"));
                }
                coerce(kind, field_type, raw)?
            }
            Shape::List(kind) => {
                let items = raw
                    .as_array()
                    .ok_or_else(|| Rejection::invalid(format!("expected a list, got {}", json_kind_name(raw))))?;
                if items.is_empty() {
                    return Err(Rejection::invalid("expected a non-empty list"));
                }
                let max = ctx.validator.config().max_list_len;
                if items.len() > max {
                    return Err(Rejection::invalid(format!(
                        "list has {} items (max {})",
                        items.len(),
                        max
                    )));
                }
                let mut values = Vec::with_capacity(items.len());
                for item in items {
                    match coerce(kind, field_type, item)? {
                        Resolved::Value(v) => values.push(v),
                        _ => return Err(Rejection::invalid("list items must be scalar values")),
                    }
                }
                Resolved::List(values)
            }
        };

        if let Some(validate) = self.validate {
            value = validate(ctx, field, value)?;
        }

        if let Resolved::Value(FieldValue::Null) = value {
            return Err(Rejection::invalid("nil value"));
        }

        (self.build)(field, value)
    }
}

/// Check a raw JSON value against the expected kind for a field type.
///
/// A JSON number is narrowed to an integer only when the target expects an
/// integer and the number has no fractional part; every other mismatch fails.
fn coerce(kind: ValueKind, field_type: FieldType, raw: &Value) -> Result<Resolved, Rejection> {
    let mismatch = |expected: &str| {
        Rejection::invalid(format!("expected {}, got {}", expected, json_kind_name(raw)))
    };

    match kind {
        ValueKind::Bool => raw
            .as_bool()
            .map(|b| Resolved::Value(FieldValue::Bool(b)))
            .ok_or_else(|| mismatch("boolean")),
        ValueKind::Map => raw
            .as_object()
            .map(|map| Resolved::Map(map.clone()))
            .ok_or_else(|| mismatch("map")),
        ValueKind::Native => native_value(field_type, raw)
            .map(Resolved::Value)
            .ok_or_else(|| mismatch(native_kind_name(field_type))),
    }
}

fn native_value(field_type: FieldType, raw: &Value) -> Option<FieldValue> {
    match (field_type, raw) {
        (FieldType::String | FieldType::Text | FieldType::File, Value::String(s)) => {
            Some(FieldValue::Text(s.clone()))
        }
        (
            FieldType::Integer | FieldType::Reference | FieldType::Relation,
            Value::Number(n),
        ) => json_number_as_int(n).map(FieldValue::Int),
        (FieldType::Float, Value::Number(n)) => n.as_f64().map(FieldValue::Float),
        (FieldType::Boolean, Value::Bool(b)) => Some(FieldValue::Bool(*b)),
        (FieldType::Datetime, Value::String(s)) => {
            parse_datetime_lenient(s).map(FieldValue::Datetime)
        }
        (FieldType::Array, Value::String(_) | Value::Number(_) | Value::Bool(_)) => {
            Some(FieldValue::Json(raw.clone()))
        }
        _ => None,
    }
}

fn native_kind_name(field_type: FieldType) -> &'static str {
    match field_type {
        FieldType::String | FieldType::Text | FieldType::File => "string",
        FieldType::Integer | FieldType::Reference | FieldType::Relation => "integer",
        FieldType::Float => "number",
        FieldType::Boolean => "boolean",
        FieldType::Datetime => "timestamp string",
        FieldType::Array => "scalar",
        FieldType::Object | FieldType::Geopoint => "no scalar value",
    }
}
