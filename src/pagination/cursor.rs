//! # Cursors
//!
//! A cursor is built fresh per request from `PageParams`, turns the
//! request's boundary into predicates, ordering and a limit, records the
//! first and last rows of the page and is finally turned into links.
//!
//! Backward pages are fetched in the inverted order: both the requested
//! and the default ascending flags are flipped at construction, and the
//! fetched rows are reversed back to natural order before they are
//! returned. Forward and backward pages are therefore mirror images
//! around the same boundary.

use std::sync::Arc;

use crate::catalog::Class;
use crate::executor::{Row, ID_FIELD};
use crate::fields::{FieldLookup, FieldValue};
use crate::query::{CmpOp, Operand, OrderTerm, Predicate, SelectQuery};

use super::errors::{PaginationError, PaginationResult};
use super::params::{Direction, PageParams, LAST_VALUE_PARAM, ORDER_BY_PARAM};

/// Position of a row in the page ordering
#[derive(Debug, Clone, PartialEq)]
pub struct Boundary {
    pub pk: i64,
    /// Order field value; always null for the id cursor
    pub value: FieldValue,
}

/// State shared by every cursor kind
#[derive(Debug, Clone, PartialEq)]
pub struct Cursor {
    pub limit: usize,
    pub direction: Direction,
    pub last_pk: i64,
    /// Effective ordering, already inverted for backward pages
    ascending: bool,
    /// Effective default ordering, inverted together with `ascending`
    default_ascending: bool,
    /// First and last rows in natural order
    first: Option<Boundary>,
    last: Option<Boundary>,
}

impl Cursor {
    pub fn new(params: &PageParams, default_ascending: bool) -> Self {
        let ascending = params.ascending.unwrap_or(default_ascending);
        let invert = !params.direction.is_forward();
        Self {
            limit: params.page_size,
            direction: params.direction,
            last_pk: params.last_pk,
            ascending: ascending != invert,
            default_ascending: default_ascending != invert,
            first: None,
            last: None,
        }
    }

    /// Ordering used for the fetch
    pub fn is_ascending(&self) -> bool {
        self.ascending
    }

    /// Ordering as the client requested it
    pub fn natural_ascending(&self) -> bool {
        self.ascending == self.direction.is_forward()
    }

    /// Whether the requested ordering is the call site default
    pub fn is_default_ordering(&self) -> bool {
        self.ascending == self.default_ascending
    }

    /// Record the first fetched row
    pub fn set_first(&mut self, boundary: Boundary) {
        if self.direction.is_forward() {
            self.first = Some(boundary);
        } else {
            self.last = Some(boundary);
        }
    }

    /// Record the last fetched row
    pub fn set_last(&mut self, boundary: Boundary) {
        if self.direction.is_forward() {
            self.last = Some(boundary);
        } else {
            self.first = Some(boundary);
        }
    }

    pub fn first(&self) -> Option<&Boundary> {
        self.first.as_ref()
    }

    pub fn last(&self) -> Option<&Boundary> {
        self.last.as_ref()
    }

    /// A full page was fetched in the requested direction
    fn page_is_full(&self, count: usize) -> bool {
        self.limit > 0 && count == self.limit
    }

    pub fn has_next(&self, count: usize) -> bool {
        match self.direction {
            Direction::Forward => self.page_is_full(count),
            Direction::Backward => self.last_pk > 0,
        }
    }

    pub fn has_prev(&self, count: usize) -> bool {
        match self.direction {
            Direction::Forward => self.last_pk > 0,
            Direction::Backward => self.page_is_full(count),
        }
    }
}

/// Behavior specific to one cursor kind
pub trait PageCursor {
    fn cursor(&self) -> &Cursor;

    fn cursor_mut(&mut self) -> &mut Cursor;

    /// Add boundary predicates, ordering and the page limit to `query`
    fn apply(&self, query: SelectQuery) -> SelectQuery;

    /// Boundary of `row` in this cursor's ordering
    fn boundary(&self, row: &Row) -> Boundary;

    /// Extra link parameters describing `boundary`
    fn link_params(&self, boundary: &Boundary) -> PaginationResult<Vec<(&'static str, String)>>;
}

fn id_field(class: &Class) -> PaginationResult<Operand> {
    class
        .fields()
        .get(ID_FIELD)
        .cloned()
        .ok_or_else(|| PaginationError::Internal(format!("class {} has no id field", class.name)))
}

/// Cursor over object ids
#[derive(Debug, Clone)]
pub struct IdCursor {
    cursor: Cursor,
    id: Operand,
}

impl IdCursor {
    pub fn new(class: &Class, params: &PageParams, default_ascending: bool) -> PaginationResult<Self> {
        Ok(Self {
            cursor: Cursor::new(params, default_ascending),
            id: id_field(class)?,
        })
    }
}

impl PageCursor for IdCursor {
    fn cursor(&self) -> &Cursor {
        &self.cursor
    }

    fn cursor_mut(&mut self) -> &mut Cursor {
        &mut self.cursor
    }

    fn apply(&self, mut query: SelectQuery) -> SelectQuery {
        let ascending = self.cursor.ascending;
        if self.cursor.last_pk > 0 {
            let op = if ascending { CmpOp::Gt } else { CmpOp::Lt };
            query = query.and(Predicate::compare(&self.id, op, FieldValue::Int(self.cursor.last_pk)));
        }
        query
            .order_by(OrderTerm::new(&self.id, ascending))
            .limit(self.cursor.limit)
    }

    fn boundary(&self, row: &Row) -> Boundary {
        Boundary {
            pk: row.id,
            value: FieldValue::Null,
        }
    }

    fn link_params(&self, _boundary: &Boundary) -> PaginationResult<Vec<(&'static str, String)>> {
        Ok(Vec::new())
    }
}

/// Cursor over `(order field, id)` with NULLS LAST semantics
#[derive(Debug, Clone)]
pub struct KeysetCursor {
    cursor: Cursor,
    id: Operand,
    order_field: Operand,
    order_by_name: String,
    last_value: FieldValue,
}

impl KeysetCursor {
    /// Build from `order_by`; returns `None` when the request has no `order_by`.
    pub fn from_params(class: &Class, params: &PageParams) -> PaginationResult<Option<Self>> {
        let (name, ascending) = match params.order_by_field() {
            Some(order_by) => order_by,
            None => return Ok(None),
        };

        let order_field = class
            .fields()
            .order_field(name)
            .map_err(|lookup| match lookup {
                FieldLookup::Unknown => PaginationError::UnknownOrderField(name.to_string()),
                FieldLookup::NotIndexed => PaginationError::FieldNotOrderable(name.to_string()),
            })?;

        let last_value = match params.last_value.as_deref() {
            Some(raw) if params.last_pk > 0 => order_field.value_from_string(raw).map_err(|e| {
                PaginationError::InvalidLastValue {
                    field: name.to_string(),
                    reason: e.to_string(),
                }
            })?,
            _ => FieldValue::Null,
        };

        // order_by already carries the direction, so it is also the default
        let keyset_params = PageParams {
            ascending: Some(ascending),
            ..params.clone()
        };

        Ok(Some(Self {
            cursor: Cursor::new(&keyset_params, ascending),
            id: id_field(class)?,
            order_field: Arc::clone(order_field),
            order_by_name: params.order_by.clone().unwrap_or_default(),
            last_value,
        }))
    }

    pub fn order_field(&self) -> &Operand {
        &self.order_field
    }

    pub fn last_value(&self) -> &FieldValue {
        &self.last_value
    }

    /// Boundary predicate for the effective direction
    fn boundary_predicate(&self) -> Predicate {
        let field = &self.order_field;
        let pk = FieldValue::Int(self.cursor.last_pk);
        let row_compare = |op| Predicate::RowCompare {
            fields: vec![Arc::clone(field), Arc::clone(&self.id)],
            op,
            values: vec![self.last_value.clone(), pk.clone()],
        };

        match (self.cursor.ascending, self.last_value.is_null()) {
            // nulls sort last: every null row is still ahead
            (true, false) => Predicate::Or(vec![Predicate::is_null(field), row_compare(CmpOp::Gt)]),
            // inside the trailing null run only id breaks ties
            (true, true) => Predicate::And(vec![
                Predicate::is_null(field),
                Predicate::compare(&self.id, CmpOp::Gt, pk),
            ]),
            // nulls sort first: they are all behind a non-null boundary
            (false, false) => row_compare(CmpOp::Lt),
            (false, true) => Predicate::Or(vec![
                Predicate::is_not_null(field),
                Predicate::And(vec![
                    Predicate::is_null(field),
                    Predicate::compare(&self.id, CmpOp::Lt, pk),
                ]),
            ]),
        }
    }
}

impl PageCursor for KeysetCursor {
    fn cursor(&self) -> &Cursor {
        &self.cursor
    }

    fn cursor_mut(&mut self) -> &mut Cursor {
        &mut self.cursor
    }

    fn apply(&self, mut query: SelectQuery) -> SelectQuery {
        let ascending = self.cursor.ascending;
        if self.cursor.last_pk > 0 {
            query = query.and(self.boundary_predicate());
        }
        query
            .order_by(OrderTerm::new(&self.order_field, ascending))
            .order_by(OrderTerm::new(&self.id, ascending))
            .limit(self.cursor.limit)
    }

    fn boundary(&self, row: &Row) -> Boundary {
        Boundary {
            pk: row.id,
            value: self.order_field.get(row),
        }
    }

    fn link_params(&self, boundary: &Boundary) -> PaginationResult<Vec<(&'static str, String)>> {
        let mut params = vec![(ORDER_BY_PARAM, self.order_by_name.clone())];
        if !boundary.value.is_null() {
            let encoded = self.order_field.value_to_string(&boundary.value).map_err(|e| {
                PaginationError::Internal(format!(
                    "cannot encode {} boundary: {}",
                    self.order_field.name(),
                    e
                ))
            })?;
            params.push((LAST_VALUE_PARAM, encoded));
        }
        Ok(params)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::FieldSchema;
    use crate::config::PaginationConfig;
    use crate::fields::FieldType;
    use std::collections::HashMap;

    fn class() -> Class {
        Class::new(
            3,
            "book",
            vec![
                FieldSchema::new("pages", FieldType::Integer).filtered().ordered(),
                FieldSchema::new("notes", FieldType::Text),
            ],
        )
    }

    fn params(pairs: &[(&str, &str)]) -> PageParams {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        PageParams::parse(&map, &PaginationConfig::default())
    }

    #[test]
    fn test_backward_inverts_both_flags() {
        let cursor = Cursor::new(&params(&[("direction", "0")]), true);
        assert!(!cursor.is_ascending());
        assert!(cursor.natural_ascending());
        assert!(cursor.is_default_ordering());

        let cursor = Cursor::new(&params(&[("direction", "0"), ("ordering", "desc")]), true);
        assert!(cursor.is_ascending());
        assert!(!cursor.natural_ascending());
        assert!(!cursor.is_default_ordering());
    }

    #[test]
    fn test_has_next_prev() {
        let forward = Cursor::new(&params(&[("page_size", "2"), ("last_pk", "5")]), true);
        assert!(forward.has_next(2));
        assert!(!forward.has_next(1));
        assert!(forward.has_prev(0));

        let backward = Cursor::new(&params(&[("page_size", "2"), ("direction", "0")]), true);
        assert!(backward.has_prev(2));
        assert!(!backward.has_next(2));

        let empty = Cursor::new(&params(&[("page_size", "0")]), true);
        assert!(!empty.has_next(0));
    }

    #[test]
    fn test_boundaries_follow_natural_order() {
        let mut cursor = Cursor::new(&params(&[("direction", "0")]), true);
        cursor.set_first(Boundary { pk: 9, value: FieldValue::Null });
        cursor.set_last(Boundary { pk: 7, value: FieldValue::Null });
        assert_eq!(cursor.first().unwrap().pk, 7);
        assert_eq!(cursor.last().unwrap().pk, 9);
    }

    #[test]
    fn test_id_cursor_sql() {
        let class = Arc::new(class());
        let cursor = IdCursor::new(&class, &params(&[("last_pk", "10"), ("page_size", "5")]), true).unwrap();
        let (sql, args) = cursor.apply(SelectQuery::new(Arc::clone(&class))).to_sql();
        assert!(sql.ends_with("AND \"o\".\"id\" > $2 ORDER BY \"o\".\"id\" ASC LIMIT 5"));
        assert_eq!(args[1], FieldValue::Int(10));

        let cursor = IdCursor::new(&class, &params(&[("last_pk", "10"), ("direction", "0")]), true).unwrap();
        let (sql, _) = cursor.apply(SelectQuery::new(class)).to_sql();
        assert!(sql.ends_with("AND \"o\".\"id\" < $2 ORDER BY \"o\".\"id\" DESC LIMIT 100"));
    }

    #[test]
    fn test_keyset_requires_orderable_field() {
        let class = class();
        assert_eq!(
            KeysetCursor::from_params(&class, &params(&[("order_by", "notes")])).unwrap_err(),
            PaginationError::FieldNotOrderable("notes".into())
        );
        assert_eq!(
            KeysetCursor::from_params(&class, &params(&[("order_by", "-nope")])).unwrap_err(),
            PaginationError::UnknownOrderField("nope".into())
        );
        assert!(KeysetCursor::from_params(&class, &params(&[])).unwrap().is_none());
    }

    #[test]
    fn test_keyset_last_value_parsing() {
        let class = class();
        let cursor = KeysetCursor::from_params(
            &class,
            &params(&[("order_by", "pages"), ("last_pk", "4"), ("last_value", "120")]),
        )
        .unwrap()
        .unwrap();
        assert_eq!(cursor.last_value(), &FieldValue::Int(120));

        let err = KeysetCursor::from_params(
            &class,
            &params(&[("order_by", "pages"), ("last_pk", "4"), ("last_value", "many")]),
        )
        .unwrap_err();
        assert!(matches!(err, PaginationError::InvalidLastValue { .. }));
    }

    #[test]
    fn test_keyset_predicates() {
        let class = Arc::new(class());
        let sql = |pairs: &[(&str, &str)]| {
            let cursor = KeysetCursor::from_params(&class, &params(pairs)).unwrap().unwrap();
            cursor.apply(SelectQuery::new(Arc::clone(&class))).to_sql().0
        };
        let pages = "(\"o\".\"_data\"->'pages')::integer";

        let asc = sql(&[("order_by", "pages"), ("last_pk", "4"), ("last_value", "120")]);
        assert!(asc.contains(&format!(
            "({} IS NULL OR ({}, \"o\".\"id\") > ($2, $3))",
            pages, pages
        )));
        assert!(asc.contains(&format!("ORDER BY {} ASC, \"o\".\"id\" ASC", pages)));

        let asc_null = sql(&[("order_by", "pages"), ("last_pk", "4")]);
        assert!(asc_null.contains(&format!("({} IS NULL AND \"o\".\"id\" > $2)", pages)));

        let desc = sql(&[("order_by", "-pages"), ("last_pk", "4"), ("last_value", "120")]);
        assert!(desc.contains(&format!("({}, \"o\".\"id\") < ($2, $3)", pages)));
        assert!(desc.contains(&format!("ORDER BY {} DESC, \"o\".\"id\" DESC", pages)));

        let desc_null = sql(&[("order_by", "-pages"), ("last_pk", "4")]);
        assert!(desc_null.contains(&format!(
            "({} IS NOT NULL OR ({} IS NULL AND \"o\".\"id\" < $2))",
            pages, pages
        )));

        // backward over an ascending order_by fetches descending
        let back = sql(&[("order_by", "pages"), ("last_pk", "4"), ("last_value", "120"), ("direction", "0")]);
        assert!(back.contains(&format!("({}, \"o\".\"id\") < ($2, $3)", pages)));

        let first_page = sql(&[("order_by", "pages")]);
        assert!(!first_page.contains("IS NULL"));
    }

    #[test]
    fn test_keyset_link_params() {
        let class = class();
        let cursor = KeysetCursor::from_params(&class, &params(&[("order_by", "-pages")]))
            .unwrap()
            .unwrap();
        let with_value = cursor
            .link_params(&Boundary { pk: 3, value: FieldValue::Int(99) })
            .unwrap();
        assert_eq!(
            with_value,
            vec![("order_by", "-pages".to_string()), ("last_value", "99".to_string())]
        );
        let null_value = cursor
            .link_params(&Boundary { pk: 3, value: FieldValue::Null })
            .unwrap();
        assert_eq!(null_value, vec![("order_by", "-pages".to_string())]);
    }
}
