//! Predicate evaluation
//!
//! Evaluates the predicate tree against fetched rows with the same
//! semantics PostgreSQL gives the rendered SQL: any comparison involving
//! NULL is false, row values compare lexicographically, `@>` is
//! containment and `&&` is overlap.

use std::cmp::Ordering;

use serde_json::Value;

use crate::fields::FieldValue;
use crate::query::{CmpOp, Predicate, SelectQuery};

use super::errors::{ExecutorError, ExecutorResult};
use super::result::Row;

/// Runs nested subqueries for `IN (subquery)` predicates
pub trait SubquerySource {
    /// Values of the subquery's selected column, in result order
    fn column_values(&self, subquery: &SelectQuery) -> ExecutorResult<Vec<FieldValue>>;
}

/// Evaluates predicates against rows
pub struct PredicateFilter<'a, S: SubquerySource> {
    subqueries: &'a S,
}

impl<'a, S: SubquerySource> PredicateFilter<'a, S> {
    pub fn new(subqueries: &'a S) -> Self {
        Self { subqueries }
    }

    /// Whether `row` satisfies every predicate (AND semantics)
    pub fn matches(&self, row: &Row, predicates: &[Predicate]) -> ExecutorResult<bool> {
        for predicate in predicates {
            if !self.matches_predicate(row, predicate)? {
                return Ok(false);
            }
        }
        Ok(true)
    }

    fn matches_predicate(&self, row: &Row, predicate: &Predicate) -> ExecutorResult<bool> {
        let matched = match predicate {
            Predicate::Compare { field, op, value } => compare(&field.get(row), *op, value),
            Predicate::RowCompare { fields, op, values } => {
                let actual: Vec<FieldValue> = fields.iter().map(|f| f.get(row)).collect();
                row_compare(&actual, *op, values)
            }
            Predicate::IsNull { field, negated } => field.get(row).is_null() != *negated,
            Predicate::Like {
                field,
                pattern,
                case_insensitive,
            } => match field.get(row) {
                FieldValue::Text(text) => like_match(pattern, &text, *case_insensitive),
                _ => false,
            },
            Predicate::InList {
                field,
                values,
                negated,
            } => {
                let actual = field.get(row);
                if actual.is_null() {
                    false
                } else {
                    let found = values
                        .iter()
                        .any(|v| actual.sql_cmp(v) == Some(Ordering::Equal));
                    found != *negated
                }
            }
            Predicate::Contains { field, value } => contains(&field.get(row), value)?,
            Predicate::InSubquery {
                field,
                subquery,
                overlap,
            } => {
                let actual = field.get(row);
                if actual.is_null() {
                    false
                } else {
                    let candidates = self.subqueries.column_values(subquery)?;
                    match (&actual, overlap) {
                        (FieldValue::IntArray(ids), true) => ids.iter().any(|id| {
                            candidates.iter().any(|c| *c == FieldValue::Int(*id))
                        }),
                        (_, true) => false,
                        (_, false) => candidates
                            .iter()
                            .any(|c| actual.sql_cmp(c) == Some(Ordering::Equal)),
                    }
                }
            }
            Predicate::DistanceWithin {
                field,
                point,
                meters,
            } => match field.get(row) {
                FieldValue::Point(location) => location.distance_meters(point) <= *meters,
                _ => false,
            },
            Predicate::And(parts) => self.matches(row, parts)?,
            Predicate::Or(parts) => {
                for part in parts {
                    if self.matches_predicate(row, part)? {
                        return Ok(true);
                    }
                }
                false
            }
        };
        Ok(matched)
    }
}

fn compare(actual: &FieldValue, op: CmpOp, expected: &FieldValue) -> bool {
    actual
        .sql_cmp(expected)
        .map(|ordering| op.holds(ordering))
        .unwrap_or(false)
}

/// `(a1, a2, ...) <op> (b1, b2, ...)`: the first unequal pair decides;
/// a NULL pair before that makes the comparison unknown (false).
fn row_compare(actual: &[FieldValue], op: CmpOp, expected: &[FieldValue]) -> bool {
    for (a, b) in actual.iter().zip(expected) {
        match a.sql_cmp(b) {
            None => return false,
            Some(Ordering::Equal) => continue,
            Some(ordering) => return op.holds(ordering),
        }
    }
    op.holds(Ordering::Equal)
}

fn contains(actual: &FieldValue, expected: &FieldValue) -> ExecutorResult<bool> {
    match (actual, expected) {
        (FieldValue::IntArray(have), FieldValue::IntArray(want)) => {
            Ok(want.iter().all(|id| have.contains(id)))
        }
        (FieldValue::Json(have), FieldValue::Text(encoded)) => {
            let want: Value = serde_json::from_str(encoded)
                .map_err(|e| ExecutorError::failed(format!("invalid jsonb operand: {}", e)))?;
            Ok(json_contains(have, &want))
        }
        (FieldValue::Json(have), FieldValue::Json(want)) => Ok(json_contains(have, want)),
        _ => Ok(false),
    }
}

/// jsonb `@>`
fn json_contains(outer: &Value, inner: &Value) -> bool {
    match (outer, inner) {
        (Value::Object(have), Value::Object(want)) => want
            .iter()
            .all(|(key, v)| have.get(key).map_or(false, |h| json_contains(h, v))),
        (Value::Array(have), Value::Array(want)) => want
            .iter()
            .all(|w| have.iter().any(|h| json_contains(h, w))),
        (Value::Array(have), scalar) if !scalar.is_object() => have.contains(scalar),
        (have, want) => have == want,
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Token {
    Any,
    One,
    Char(char),
}

fn tokenize(pattern: &str) -> Vec<Token> {
    let mut tokens = Vec::with_capacity(pattern.len());
    let mut chars = pattern.chars();
    while let Some(c) = chars.next() {
        tokens.push(match c {
            '%' => Token::Any,
            '_' => Token::One,
            '\\' => Token::Char(chars.next().unwrap_or('\\')),
            c => Token::Char(c),
        });
    }
    tokens
}

/// SQL LIKE with `%`, `_` and backslash escapes
fn like_match(pattern: &str, text: &str, case_insensitive: bool) -> bool {
    let (pattern, text) = if case_insensitive {
        (pattern.to_lowercase(), text.to_lowercase())
    } else {
        (pattern.to_string(), text.to_string())
    };
    let tokens = tokenize(&pattern);
    let text: Vec<char> = text.chars().collect();

    let (mut ti, mut pi) = (0, 0);
    let mut backtrack: Option<(usize, usize)> = None;

    while ti < text.len() {
        match tokens.get(pi) {
            Some(Token::One) => {
                ti += 1;
                pi += 1;
            }
            Some(Token::Char(c)) if *c == text[ti] => {
                ti += 1;
                pi += 1;
            }
            Some(Token::Any) => {
                backtrack = Some((pi, ti));
                pi += 1;
            }
            _ => match backtrack {
                Some((star, resume)) => {
                    pi = star + 1;
                    ti = resume + 1;
                    backtrack = Some((star, resume + 1));
                }
                None => return false,
            },
        }
    }
    tokens[pi..].iter().all(|t| *t == Token::Any)
}
