//! Built-in lookups
//!
//! | Suffix | Types | Predicate |
//! |---|---|---|
//! | `_gt _gte _lt _lte _eq _neq` | scalar types | comparison |
//! | `_ieq _contains _icontains _startswith _istartswith _endswith _iendswith _like _ilike` | string, text | (I)LIKE |
//! | `_contains` | relation | `@>` integer array |
//! | `_contains` | array | `@>` jsonb array |
//! | `_in _nin` | scalar types | `[NOT] IN` |
//! | `_exists` | any | `IS [NOT] NULL` |
//! | `_near` | geopoint | `ST_DWithin` |
//! | `_is` | reference | `IN (subquery)` |
//! | `_is` | relation | `&& ARRAY(subquery)` |

use std::sync::Arc;

use serde_json::Value;

use crate::fields::{FieldType, FieldValue, GeoPoint};
use crate::query::{CmpOp, Operand, Predicate, SelectQuery};

use super::operator::{
    FilterOperator, Rejection, Resolved, Shape, TypeScope, ValidationContext, ValueKind,
};
use super::registry::RegistryBuilder;

/// Kilometers per statute mile
pub const KM_PER_MILE: f64 = 1.609344;

/// Radius used by `_near` when no distance is given
pub const DEFAULT_NEAR_MILES: f64 = 100.0;

/// Target name meaning the class being queried
pub const SELF_TARGET: &str = "self";

const NON_SCALAR: &[FieldType] = &[
    FieldType::Relation,
    FieldType::Array,
    FieldType::Geopoint,
    FieldType::Object,
];
const STRINGS: &[FieldType] = &[FieldType::String, FieldType::Text];

/// Register every built-in lookup
pub fn register_builtin(builder: RegistryBuilder) -> RegistryBuilder {
    let native = Shape::Scalar(ValueKind::Native);
    let native_list = Shape::List(ValueKind::Native);
    let map = Shape::Scalar(ValueKind::Map);
    let scalars = TypeScope::Except(NON_SCALAR);
    let strings = TypeScope::Only(STRINGS);

    builder
        // comparisons
        .register(FilterOperator::new("_gt", scalars, native, |f, v| {
            compare(f, CmpOp::Gt, v)
        }))
        .register(FilterOperator::new("_gte", scalars, native, |f, v| {
            compare(f, CmpOp::Gte, v)
        }))
        .register(FilterOperator::new("_lt", scalars, native, |f, v| {
            compare(f, CmpOp::Lt, v)
        }))
        .register(FilterOperator::new("_lte", scalars, native, |f, v| {
            compare(f, CmpOp::Lte, v)
        }))
        .register(FilterOperator::new("_eq", scalars, native, |f, v| {
            compare(f, CmpOp::Eq, v)
        }))
        .register(FilterOperator::new("_neq", scalars, native, |f, v| {
            compare(f, CmpOp::Neq, v)
        }))
        // string matching
        .register(FilterOperator::new("_ieq", strings, native, |f, v| {
            like(f, v, Wrap::Exact, true)
        }))
        .register(FilterOperator::new("_contains", strings, native, |f, v| {
            like(f, v, Wrap::Contains, false)
        }))
        .register(FilterOperator::new("_icontains", strings, native, |f, v| {
            like(f, v, Wrap::Contains, true)
        }))
        .register(FilterOperator::new("_startswith", strings, native, |f, v| {
            like(f, v, Wrap::StartsWith, false)
        }))
        .register(FilterOperator::new("_istartswith", strings, native, |f, v| {
            like(f, v, Wrap::StartsWith, true)
        }))
        .register(FilterOperator::new("_endswith", strings, native, |f, v| {
            like(f, v, Wrap::EndsWith, false)
        }))
        .register(FilterOperator::new("_iendswith", strings, native, |f, v| {
            like(f, v, Wrap::EndsWith, true)
        }))
        .register(FilterOperator::new("_like", strings, native, |f, v| {
            like(f, v, Wrap::Literal, false)
        }))
        .register(FilterOperator::new("_ilike", strings, native, |f, v| {
            like(f, v, Wrap::Literal, true)
        }))
        // containment on collections
        .register(FilterOperator::new(
            "_contains",
            TypeScope::Only(&[FieldType::Relation]),
            native_list,
            contains_ids,
        ))
        .register(FilterOperator::new(
            "_contains",
            TypeScope::Only(&[FieldType::Array]),
            native_list,
            contains_json,
        ))
        // membership
        .register(FilterOperator::new("_in", scalars, native_list, |f, v| {
            in_list(f, v, false)
        }))
        .register(FilterOperator::new("_nin", scalars, native_list, |f, v| {
            in_list(f, v, true)
        }))
        .register(FilterOperator::new(
            "_exists",
            TypeScope::Any,
            Shape::Scalar(ValueKind::Bool),
            exists,
        ))
        // geo
        .register(
            FilterOperator::new(
                "_near",
                TypeScope::Only(&[FieldType::Geopoint]),
                map,
                near,
            )
            .with_validation(validate_near),
        )
        // subqueries
        .register(
            FilterOperator::new("_is", TypeScope::Only(&[FieldType::Reference]), map, |f, v| {
                in_subquery(f, v, false)
            })
            .with_validation(validate_is),
        )
        .register(
            FilterOperator::new("_is", TypeScope::Only(&[FieldType::Relation]), map, |f, v| {
                in_subquery(f, v, true)
            })
            .with_validation(validate_is),
        )
}

fn scalar(value: Resolved) -> Result<FieldValue, Rejection> {
    match value {
        Resolved::Value(v) => Ok(v),
        other => Err(Rejection::internal(format!("expected a scalar, got {:?}", other))),
    }
}

fn list(value: Resolved) -> Result<Vec<FieldValue>, Rejection> {
    match value {
        Resolved::List(values) => Ok(values),
        other => Err(Rejection::internal(format!("expected a list, got {:?}", other))),
    }
}

fn compare(field: &Operand, op: CmpOp, value: Resolved) -> Result<Predicate, Rejection> {
    Ok(Predicate::compare(field, op, scalar(value)?))
}

#[derive(Debug, Clone, Copy)]
enum Wrap {
    Exact,
    Contains,
    StartsWith,
    EndsWith,
    Literal,
}

/// Escape LIKE wildcards so the value matches literally
fn escape_like(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        if matches!(c, '\\' | '%' | '_') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

fn like(
    field: &Operand,
    value: Resolved,
    wrap: Wrap,
    case_insensitive: bool,
) -> Result<Predicate, Rejection> {
    let text = match scalar(value)? {
        FieldValue::Text(s) => s,
        other => return Err(Rejection::internal(format!("expected text, got {}", other.kind_name()))),
    };
    let pattern = match wrap {
        Wrap::Exact => escape_like(&text),
        Wrap::Contains => format!("%{}%", escape_like(&text)),
        Wrap::StartsWith => format!("{}%", escape_like(&text)),
        Wrap::EndsWith => format!("%{}", escape_like(&text)),
        Wrap::Literal => text,
    };
    Ok(Predicate::Like {
        field: Arc::clone(field),
        pattern,
        case_insensitive,
    })
}

fn in_list(field: &Operand, value: Resolved, negated: bool) -> Result<Predicate, Rejection> {
    Ok(Predicate::InList {
        field: Arc::clone(field),
        values: list(value)?,
        negated,
    })
}

fn exists(field: &Operand, value: Resolved) -> Result<Predicate, Rejection> {
    match scalar(value)? {
        FieldValue::Bool(true) => Ok(Predicate::is_not_null(field)),
        FieldValue::Bool(false) => Ok(Predicate::is_null(field)),
        other => Err(Rejection::internal(format!("expected boolean, got {}", other.kind_name()))),
    }
}

fn contains_ids(field: &Operand, value: Resolved) -> Result<Predicate, Rejection> {
    let ids = list(value)?
        .into_iter()
        .map(|v| match v {
            FieldValue::Int(id) => Ok(id),
            other => Err(Rejection::internal(format!("expected id, got {}", other.kind_name()))),
        })
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Predicate::Contains {
        field: Arc::clone(field),
        value: FieldValue::IntArray(ids),
    })
}

fn contains_json(field: &Operand, value: Resolved) -> Result<Predicate, Rejection> {
    let items = list(value)?
        .into_iter()
        .map(|v| match v {
            FieldValue::Json(item) => Ok(item),
            other => Err(Rejection::internal(format!(
                "cannot encode {} into a JSON array",
                other.kind_name()
            ))),
        })
        .collect::<Result<Vec<_>, _>>()?;
    let encoded = serde_json::to_string(&Value::Array(items))
        .map_err(|e| Rejection::internal(format!("cannot encode JSON array: {}", e)))?;
    Ok(Predicate::Contains {
        field: Arc::clone(field),
        value: FieldValue::Text(encoded),
    })
}

fn validate_near(
    _ctx: &ValidationContext<'_>,
    _field: &Operand,
    value: Resolved,
) -> Result<Resolved, Rejection> {
    let map = match value {
        Resolved::Map(map) => map,
        other => return Err(Rejection::internal(format!("expected a map, got {:?}", other))),
    };

    for key in map.keys() {
        if !matches!(
            key.as_str(),
            "longitude" | "latitude" | "distance_in_kilometers" | "distance_in_miles"
        ) {
            return Err(Rejection::invalid(format!("unexpected key {:?}", key)));
        }
    }

    let coordinate = |key: &str, bound: f64| -> Result<f64, Rejection> {
        let v = map
            .get(key)
            .and_then(Value::as_f64)
            .ok_or_else(|| Rejection::invalid(format!("{} must be a number", key)))?;
        if v > -bound && v < bound {
            Ok(v)
        } else {
            Err(Rejection::invalid(format!("{} must be between -{} and {}", key, bound, bound)))
        }
    };
    let distance = |key: &str| -> Result<Option<f64>, Rejection> {
        match map.get(key) {
            None => Ok(None),
            Some(raw) => match raw.as_f64() {
                Some(v) if v > 0.0 => Ok(Some(v)),
                _ => Err(Rejection::invalid(format!("{} must be a positive number", key))),
            },
        }
    };

    let longitude = coordinate("longitude", 180.0)?;
    let latitude = coordinate("latitude", 90.0)?;
    let kilometers = match (distance("distance_in_kilometers")?, distance("distance_in_miles")?) {
        (Some(km), _) => km,
        (None, Some(miles)) => miles * KM_PER_MILE,
        (None, None) => DEFAULT_NEAR_MILES * KM_PER_MILE,
    };

    Ok(Resolved::Near {
        point: GeoPoint::new(longitude, latitude),
        meters: kilometers * 1000.0,
    })
}

fn near(field: &Operand, value: Resolved) -> Result<Predicate, Rejection> {
    match value {
        Resolved::Near { point, meters } => Ok(Predicate::DistanceWithin {
            field: Arc::clone(field),
            point,
            meters,
        }),
        other => Err(Rejection::internal(format!("expected a validated point, got {:?}", other))),
    }
}

/// Resolve the target class and turn the nested document into a bounded subquery.
fn validate_is(
    ctx: &ValidationContext<'_>,
    field: &Operand,
    value: Resolved,
) -> Result<Resolved, Rejection> {
    let document = match value {
        Resolved::Map(map) => Value::Object(map),
        other => return Err(Rejection::internal(format!("expected a map, got {:?}", other))),
    };

    let target_name = field
        .target()
        .ok_or_else(|| Rejection::internal("reference field has no target class"))?;
    let target = if target_name == SELF_TARGET {
        Arc::clone(ctx.class)
    } else {
        ctx.catalog
            .class(target_name)
            .ok_or_else(|| Rejection::UnknownClass(target_name.to_string()))?
    };

    let join = target
        .fields()
        .get(target.join_column())
        .cloned()
        .ok_or_else(|| Rejection::internal(format!("{} has no join column", target.name)))?;

    let depth = ctx.depth + 1;
    let predicates = ctx
        .validator
        .resolve(ctx.catalog, &target, &document, depth)
        .map_err(Rejection::Nested)?;

    let subquery = SelectQuery::aliased(target, format!("s{}", depth))
        .select_column(&join)
        .and_all(predicates)
        .limit(ctx.validator.config().subquery_limit);

    Ok(Resolved::Subquery(Box::new(subquery)))
}

fn in_subquery(field: &Operand, value: Resolved, overlap: bool) -> Result<Predicate, Rejection> {
    match value {
        Resolved::Subquery(subquery) => Ok(Predicate::InSubquery {
            field: Arc::clone(field),
            subquery,
            overlap,
        }),
        other => Err(Rejection::internal(format!("expected a subquery, got {:?}", other))),
    }
}
