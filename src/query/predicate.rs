//! Predicate tree
//!
//! Predicates reference fields through descriptors, so the same tree can be
//! rendered to SQL against any table alias or evaluated by an in-memory
//! executor.

use std::fmt;
use std::sync::Arc;

use crate::fields::{FieldDescriptor, FieldValue, GeoPoint};

use super::select::SelectQuery;
use super::sql::SqlWriter;

/// Binary comparison operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmpOp {
    Eq,
    Neq,
    Gt,
    Gte,
    Lt,
    Lte,
}

impl CmpOp {
    /// SQL glyph for this operator
    pub fn glyph(&self) -> &'static str {
        match self {
            CmpOp::Eq => "=",
            CmpOp::Neq => "<>",
            CmpOp::Gt => ">",
            CmpOp::Gte => ">=",
            CmpOp::Lt => "<",
            CmpOp::Lte => "<=",
        }
    }

    /// Whether an ordering satisfies this operator
    pub fn holds(&self, ordering: std::cmp::Ordering) -> bool {
        use std::cmp::Ordering::*;
        match self {
            CmpOp::Eq => ordering == Equal,
            CmpOp::Neq => ordering != Equal,
            CmpOp::Gt => ordering == Greater,
            CmpOp::Gte => ordering != Less,
            CmpOp::Lt => ordering == Less,
            CmpOp::Lte => ordering != Greater,
        }
    }
}

impl fmt::Display for CmpOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.glyph())
    }
}

/// Field reference inside a predicate
pub type Operand = Arc<FieldDescriptor>;

/// A boolean condition over the rows of one query
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    /// `field <op> value`
    Compare {
        field: Operand,
        op: CmpOp,
        value: FieldValue,
    },
    /// Row-value comparison `(f1, f2, ...) <op> (v1, v2, ...)`
    RowCompare {
        fields: Vec<Operand>,
        op: CmpOp,
        values: Vec<FieldValue>,
    },
    /// `field IS [NOT] NULL`
    IsNull { field: Operand, negated: bool },
    /// `field [I]LIKE pattern`
    Like {
        field: Operand,
        pattern: String,
        case_insensitive: bool,
    },
    /// `field [NOT] IN (values...)`
    InList {
        field: Operand,
        values: Vec<FieldValue>,
        negated: bool,
    },
    /// `field @> value` for id arrays and JSON arrays
    Contains { field: Operand, value: FieldValue },
    /// `field IN (subquery)` or, with `overlap`, `field && ARRAY(subquery)`
    InSubquery {
        field: Operand,
        subquery: Box<SelectQuery>,
        overlap: bool,
    },
    /// Spherical distance from `point` at most `meters`
    DistanceWithin {
        field: Operand,
        point: GeoPoint,
        meters: f64,
    },
    And(Vec<Predicate>),
    Or(Vec<Predicate>),
}

impl Predicate {
    pub fn compare(field: &Operand, op: CmpOp, value: FieldValue) -> Self {
        Predicate::Compare {
            field: Arc::clone(field),
            op,
            value,
        }
    }

    pub fn is_null(field: &Operand) -> Self {
        Predicate::IsNull {
            field: Arc::clone(field),
            negated: false,
        }
    }

    pub fn is_not_null(field: &Operand) -> Self {
        Predicate::IsNull {
            field: Arc::clone(field),
            negated: true,
        }
    }

    /// Render as SQL text for a table aliased `alias`
    pub(crate) fn render(&self, alias: &str, out: &mut SqlWriter) {
        match self {
            Predicate::Compare { field, op, value } => {
                out.push(&field.sql_expr(alias));
                out.push(&format!(" {} ", op.glyph()));
                out.bind(value.clone());
            }
            Predicate::RowCompare { fields, op, values } => {
                out.push("(");
                for (i, field) in fields.iter().enumerate() {
                    if i > 0 {
                        out.push(", ");
                    }
                    out.push(&field.sql_expr(alias));
                }
                out.push(&format!(") {} (", op.glyph()));
                for (i, value) in values.iter().enumerate() {
                    if i > 0 {
                        out.push(", ");
                    }
                    out.bind(value.clone());
                }
                out.push(")");
            }
            Predicate::IsNull { field, negated } => {
                out.push(&field.sql_expr(alias));
                out.push(if *negated { " IS NOT NULL" } else { " IS NULL" });
            }
            Predicate::Like {
                field,
                pattern,
                case_insensitive,
            } => {
                out.push(&field.sql_expr(alias));
                out.push(if *case_insensitive { " ILIKE " } else { " LIKE " });
                out.bind(FieldValue::Text(pattern.clone()));
            }
            Predicate::InList {
                field,
                values,
                negated,
            } => {
                out.push(&field.sql_expr(alias));
                out.push(if *negated { " NOT IN (" } else { " IN (" });
                for (i, value) in values.iter().enumerate() {
                    if i > 0 {
                        out.push(", ");
                    }
                    out.bind(value.clone());
                }
                out.push(")");
            }
            Predicate::Contains { field, value } => {
                out.push(&field.sql_expr(alias));
                out.push(" @> ");
                out.bind(value.clone());
                if let FieldValue::Text(_) = value {
                    out.push("::jsonb");
                }
            }
            Predicate::InSubquery {
                field,
                subquery,
                overlap,
            } => {
                out.push(&field.sql_expr(alias));
                out.push(if *overlap { " && ARRAY(" } else { " IN (" });
                subquery.render_into(out);
                out.push(")");
            }
            Predicate::DistanceWithin {
                field,
                point,
                meters,
            } => {
                out.push("ST_DWithin(");
                out.push(&field.sql_expr(alias));
                out.push(", ST_SetSRID(ST_MakePoint(");
                out.bind(FieldValue::Float(point.longitude));
                out.push(", ");
                out.bind(FieldValue::Float(point.latitude));
                out.push("), 4326)::geography, ");
                out.bind(FieldValue::Float(*meters));
                out.push(")");
            }
            Predicate::And(parts) => render_group(parts, " AND ", alias, out),
            Predicate::Or(parts) => render_group(parts, " OR ", alias, out),
        }
    }
}

fn render_group(parts: &[Predicate], joiner: &str, alias: &str, out: &mut SqlWriter) {
    if parts.is_empty() {
        out.push(if joiner == " AND " { "TRUE" } else { "FALSE" });
        return;
    }
    out.push("(");
    for (i, part) in parts.iter().enumerate() {
        if i > 0 {
            out.push(joiner);
        }
        part.render(alias, out);
    }
    out.push(")");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fields::FieldType;

    fn field(name: &str, field_type: FieldType) -> Operand {
        Arc::new(FieldDescriptor::column(name, field_type, true, true))
    }

    fn render(predicate: &Predicate) -> (String, Vec<FieldValue>) {
        let mut out = SqlWriter::new();
        predicate.render("o", &mut out);
        out.finish()
    }

    #[test]
    fn test_compare() {
        let (sql, args) = render(&Predicate::compare(
            &field("age", FieldType::Integer),
            CmpOp::Gte,
            FieldValue::Int(18),
        ));
        assert_eq!(sql, "\"o\".\"age\" >= $1");
        assert_eq!(args, vec![FieldValue::Int(18)]);
    }

    #[test]
    fn test_keyset_shape() {
        let score = field("score", FieldType::Integer);
        let id = field("id", FieldType::Integer);
        let predicate = Predicate::Or(vec![
            Predicate::is_null(&score),
            Predicate::RowCompare {
                fields: vec![Arc::clone(&score), id],
                op: CmpOp::Gt,
                values: vec![FieldValue::Int(5), FieldValue::Int(10)],
            },
        ]);
        let (sql, args) = render(&predicate);
        assert_eq!(
            sql,
            "(\"o\".\"score\" IS NULL OR (\"o\".\"score\", \"o\".\"id\") > ($1, $2))"
        );
        assert_eq!(args.len(), 2);
    }

    #[test]
    fn test_in_list() {
        let (sql, args) = render(&Predicate::InList {
            field: field("status", FieldType::String),
            values: vec![FieldValue::Text("a".into()), FieldValue::Text("b".into())],
            negated: false,
        });
        assert_eq!(sql, "\"o\".\"status\" IN ($1, $2)");
        assert_eq!(args[1], FieldValue::Text("b".into()));
    }

    #[test]
    fn test_distance() {
        let (sql, args) = render(&Predicate::DistanceWithin {
            field: field("loc", FieldType::Geopoint),
            point: GeoPoint::new(10.0, 50.0),
            meters: 5000.0,
        });
        assert_eq!(
            sql,
            "ST_DWithin(\"o\".\"loc\", ST_SetSRID(ST_MakePoint($1, $2), 4326)::geography, $3)"
        );
        assert_eq!(args[2], FieldValue::Float(5000.0));
    }

    #[test]
    fn test_cmp_op_holds() {
        use std::cmp::Ordering::*;
        assert!(CmpOp::Gte.holds(Equal));
        assert!(!CmpOp::Gt.holds(Equal));
        assert!(CmpOp::Neq.holds(Less));
        assert!(CmpOp::Lte.holds(Less));
    }
}
