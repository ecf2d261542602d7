//! Composable select query
//!
//! The filter engine appends predicates, the cursor appends boundary
//! predicates, ordering and a limit; the executor consumes the result.

use std::sync::Arc;

use crate::catalog::Class;
use crate::fields::FieldValue;

use super::predicate::{Operand, Predicate};
use super::sql::SqlWriter;

/// Alias of the outermost query's table
pub const ROOT_ALIAS: &str = "o";

/// One ORDER BY term
#[derive(Debug, Clone, PartialEq)]
pub struct OrderTerm {
    pub field: Operand,
    pub ascending: bool,
}

impl OrderTerm {
    pub fn new(field: &Operand, ascending: bool) -> Self {
        Self {
            field: Arc::clone(field),
            ascending,
        }
    }
}

/// A SELECT over the objects of one class
#[derive(Debug, Clone)]
pub struct SelectQuery {
    class: Arc<Class>,
    alias: String,
    column: Option<Operand>,
    predicates: Vec<Predicate>,
    order: Vec<OrderTerm>,
    limit: Option<usize>,
}

impl SelectQuery {
    /// Select whole objects of `class`
    pub fn new(class: Arc<Class>) -> Self {
        Self::aliased(class, ROOT_ALIAS)
    }

    pub fn aliased(class: Arc<Class>, alias: impl Into<String>) -> Self {
        Self {
            class,
            alias: alias.into(),
            column: None,
            predicates: Vec::new(),
            order: Vec::new(),
            limit: None,
        }
    }

    /// Select a single column instead of whole objects (subqueries)
    pub fn select_column(mut self, field: &Operand) -> Self {
        self.column = Some(Arc::clone(field));
        self
    }

    /// AND a predicate into the query
    pub fn and(mut self, predicate: Predicate) -> Self {
        self.predicates.push(predicate);
        self
    }

    pub fn and_all(mut self, predicates: impl IntoIterator<Item = Predicate>) -> Self {
        self.predicates.extend(predicates);
        self
    }

    pub fn order_by(mut self, term: OrderTerm) -> Self {
        self.order.push(term);
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn class(&self) -> &Arc<Class> {
        &self.class
    }

    pub fn alias(&self) -> &str {
        &self.alias
    }

    pub fn column(&self) -> Option<&Operand> {
        self.column.as_ref()
    }

    pub fn predicates(&self) -> &[Predicate] {
        &self.predicates
    }

    pub fn order(&self) -> &[OrderTerm] {
        &self.order
    }

    pub fn limit_value(&self) -> Option<usize> {
        self.limit
    }

    /// Render PostgreSQL text with `$n` placeholders and the bound arguments.
    pub fn to_sql(&self) -> (String, Vec<FieldValue>) {
        let mut out = SqlWriter::new();
        self.render_into(&mut out);
        out.finish()
    }

    pub(crate) fn render_into(&self, out: &mut SqlWriter) {
        let alias = self.alias.as_str();

        out.push("SELECT ");
        match &self.column {
            Some(field) => out.push(&field.sql_expr(alias)),
            None => out.push(&format!("\"{}\".*", alias)),
        }
        out.push(&format!(
            " FROM \"{}\" AS \"{}\" WHERE \"{}\".\"{}\" = ",
            self.class.table_name(),
            alias,
            alias,
            self.class.class_column()
        ));
        out.bind(FieldValue::Int(self.class.id));

        for predicate in &self.predicates {
            out.push(" AND ");
            predicate.render(alias, out);
        }

        if !self.order.is_empty() {
            out.push(" ORDER BY ");
            for (i, term) in self.order.iter().enumerate() {
                if i > 0 {
                    out.push(", ");
                }
                out.push(&term.field.sql_expr(alias));
                out.push(if term.ascending { " ASC" } else { " DESC" });
            }
        }

        if let Some(limit) = self.limit {
            out.push(&format!(" LIMIT {}", limit));
        }
    }
}

impl PartialEq for SelectQuery {
    fn eq(&self, other: &Self) -> bool {
        self.class.id == other.class.id
            && self.class.revision == other.class.revision
            && self.alias == other.alias
            && self.column == other.column
            && self.predicates == other.predicates
            && self.order == other.order
            && self.limit == other.limit
    }
}
