//! Row ordering
//!
//! Ascending terms sort NULLs last and descending terms sort them first,
//! matching PostgreSQL's defaults. The sort is stable.

use std::cmp::Ordering;

use crate::fields::FieldValue;
use crate::query::OrderTerm;

use super::result::Row;

/// Sorts rows by a list of order terms
pub struct RowSorter;

impl RowSorter {
    pub fn sort(rows: &mut [Row], order: &[OrderTerm]) {
        if order.is_empty() {
            return;
        }
        rows.sort_by(|a, b| {
            for term in order {
                let ordering = Self::compare_values(&term.field.get(a), &term.field.get(b));
                let ordering = if term.ascending {
                    ordering
                } else {
                    ordering.reverse()
                };
                if ordering != Ordering::Equal {
                    return ordering;
                }
            }
            Ordering::Equal
        });
    }

    /// Ascending comparison with NULL greater than every value
    fn compare_values(a: &FieldValue, b: &FieldValue) -> Ordering {
        match (a.is_null(), b.is_null()) {
            (true, true) => Ordering::Equal,
            (true, false) => Ordering::Greater,
            (false, true) => Ordering::Less,
            (false, false) => a.sql_cmp(b).unwrap_or(Ordering::Equal),
        }
    }
}
