//! Row executors
//!
//! A `RowExecutor` runs a `SelectQuery` and streams matching rows to a
//! visitor, which may stop the stream early. Execution order:
//!
//! 1. Restrict to the query's class
//! 2. Filter by predicates
//! 3. Sort by the order terms
//! 4. Apply the limit
//! 5. Stream rows until the visitor stops or rows run out

use std::collections::BTreeMap;

use crate::catalog::Class;
use crate::fields::FieldValue;
use crate::query::SelectQuery;

use super::errors::{ExecutorError, ExecutorResult};
use super::filters::{PredicateFilter, SubquerySource};
use super::result::Row;
use super::sorter::RowSorter;

/// Visitor decision after each row
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Stop,
}

/// Runs select queries against a row store
pub trait RowExecutor: Send + Sync {
    /// Stream the rows of `query` to `visit` in query order.
    ///
    /// Returning `Flow::Stop` from `visit` ends the stream without error.
    fn stream(
        &self,
        query: &SelectQuery,
        visit: &mut dyn FnMut(&Row) -> Flow,
    ) -> ExecutorResult<()>;
}

/// In-memory row store evaluating queries with PostgreSQL semantics
#[derive(Debug, Clone, Default)]
pub struct MemoryExecutor {
    /// class id → (object id → row)
    tables: BTreeMap<i64, BTreeMap<i64, Row>>,
    interrupt: Option<(usize, ExecutorError)>,
}

impl MemoryExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a row for `class`, replacing any row with the same id
    pub fn insert(&mut self, class: &Class, row: Row) {
        self.tables.entry(class.id).or_default().insert(row.id, row);
    }

    /// Fail every stream with `error` after `rows` rows were delivered
    pub fn with_interrupt(mut self, rows: usize, error: ExecutorError) -> Self {
        self.interrupt = Some((rows, error));
        self
    }

    /// Number of rows stored for `class`
    pub fn row_count(&self, class: &Class) -> usize {
        self.tables.get(&class.id).map_or(0, BTreeMap::len)
    }

    /// Matching rows of `query`, sorted and limited
    fn collect(&self, query: &SelectQuery) -> ExecutorResult<Vec<Row>> {
        let filter = PredicateFilter::new(self);
        let mut rows = Vec::new();
        if let Some(table) = self.tables.get(&query.class().id) {
            for row in table.values() {
                if filter.matches(row, query.predicates())? {
                    rows.push(row.clone());
                }
            }
        }

        RowSorter::sort(&mut rows, query.order());

        if let Some(limit) = query.limit_value() {
            rows.truncate(limit);
        }
        Ok(rows)
    }
}

impl SubquerySource for MemoryExecutor {
    fn column_values(&self, subquery: &SelectQuery) -> ExecutorResult<Vec<FieldValue>> {
        let column = subquery
            .column()
            .ok_or_else(|| ExecutorError::failed("subquery selects no column"))?;
        Ok(self
            .collect(subquery)?
            .iter()
            .map(|row| column.get(row))
            .collect())
    }
}

impl RowExecutor for MemoryExecutor {
    fn stream(
        &self,
        query: &SelectQuery,
        visit: &mut dyn FnMut(&Row) -> Flow,
    ) -> ExecutorResult<()> {
        for (delivered, row) in self.collect(query)?.iter().enumerate() {
            if let Some((after, error)) = &self.interrupt {
                if delivered >= *after {
                    return Err(error.clone());
                }
            }
            if visit(row) == Flow::Stop {
                break;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{FieldSchema, Instance, ClassCatalog};
    use crate::fields::{FieldType, GeoPoint};
    use crate::query::{CmpOp, OrderTerm, Predicate};
    use std::sync::Arc;

    fn setup() -> (Instance, MemoryExecutor) {
        let mut instance = Instance::new("acme");
        let authors = instance.add_class(Class::new(
            1,
            "author",
            vec![FieldSchema::new("name", FieldType::String).filtered()],
        ));
        let books = instance.add_class(Class::new(
            2,
            "book",
            vec![
                FieldSchema::new("title", FieldType::String).filtered().ordered(),
                FieldSchema::new("author", FieldType::Reference)
                    .with_target("author")
                    .filtered(),
                FieldSchema::new("coauthors", FieldType::Relation)
                    .with_target("author")
                    .filtered(),
                FieldSchema::new("shop", FieldType::Geopoint).filtered(),
            ],
        ));

        let mut executor = MemoryExecutor::new();
        executor.insert(&authors, Row::new(1).with("name", FieldValue::Text("Le Guin".into())));
        executor.insert(&authors, Row::new(2).with("name", FieldValue::Text("Herbert".into())));
        executor.insert(
            &books,
            Row::new(10)
                .with("title", FieldValue::Text("Dune".into()))
                .with("author", FieldValue::Int(2))
                .with("coauthors", FieldValue::IntArray(vec![1]))
                .with("shop", FieldValue::Point(GeoPoint::new(10.0, 50.0))),
        );
        executor.insert(
            &books,
            Row::new(11)
                .with("title", FieldValue::Text("Earthsea".into()))
                .with("author", FieldValue::Int(1))
                .with("coauthors", FieldValue::IntArray(vec![2, 3])),
        );
        executor.insert(&books, Row::new(12));
        (instance, executor)
    }

    fn run(executor: &MemoryExecutor, query: &SelectQuery) -> Vec<i64> {
        let mut ids = Vec::new();
        executor
            .stream(query, &mut |row| {
                ids.push(row.id);
                Flow::Continue
            })
            .unwrap();
        ids
    }

    fn field(instance: &Instance, class: &str, name: &str) -> crate::query::Operand {
        Arc::clone(instance.class(class).unwrap().fields().get(name).unwrap())
    }

    #[test]
    fn test_stream_in_id_order_with_limit() {
        let (instance, executor) = setup();
        let books = instance.class("book").unwrap();
        assert_eq!(run(&executor, &SelectQuery::new(Arc::clone(&books))), vec![10, 11, 12]);
        assert_eq!(run(&executor, &SelectQuery::new(books).limit(2)), vec![10, 11]);
    }

    #[test]
    fn test_visitor_can_stop() {
        let (instance, executor) = setup();
        let query = SelectQuery::new(instance.class("book").unwrap());
        let mut seen = 0;
        executor
            .stream(&query, &mut |_| {
                seen += 1;
                Flow::Stop
            })
            .unwrap();
        assert_eq!(seen, 1);
    }

    #[test]
    fn test_order_desc_nulls_first() {
        let (instance, executor) = setup();
        let title = field(&instance, "book", "title");
        let query = SelectQuery::new(instance.class("book").unwrap())
            .order_by(OrderTerm::new(&title, false));
        assert_eq!(run(&executor, &query), vec![12, 11, 10]);
    }

    #[test]
    fn test_reference_subquery() {
        let (instance, executor) = setup();
        let author = field(&instance, "book", "author");
        let name = field(&instance, "author", "name");
        let id = field(&instance, "author", "id");

        let subquery = SelectQuery::aliased(instance.class("author").unwrap(), "s1")
            .select_column(&id)
            .and(Predicate::compare(&name, CmpOp::Eq, FieldValue::Text("Herbert".into())));
        let query = SelectQuery::new(instance.class("book").unwrap()).and(Predicate::InSubquery {
            field: author,
            subquery: Box::new(subquery),
            overlap: false,
        });
        assert_eq!(run(&executor, &query), vec![10]);
    }

    #[test]
    fn test_relation_overlap() {
        let (instance, executor) = setup();
        let coauthors = field(&instance, "book", "coauthors");
        let id = field(&instance, "author", "id");

        let subquery = SelectQuery::aliased(instance.class("author").unwrap(), "s1")
            .select_column(&id)
            .and(Predicate::compare(&id, CmpOp::Eq, FieldValue::Int(2)));
        let query = SelectQuery::new(instance.class("book").unwrap()).and(Predicate::InSubquery {
            field: coauthors,
            subquery: Box::new(subquery),
            overlap: true,
        });
        assert_eq!(run(&executor, &query), vec![11]);
    }

    #[test]
    fn test_distance_within() {
        let (instance, executor) = setup();
        let shop = field(&instance, "book", "shop");
        let near = |meters: f64| {
            SelectQuery::new(instance.class("book").unwrap()).and(Predicate::DistanceWithin {
                field: Arc::clone(&shop),
                point: GeoPoint::new(10.01, 50.0),
                meters,
            })
        };
        assert_eq!(run(&executor, &near(1_000.0)), vec![10]);
        assert!(run(&executor, &near(500.0)).is_empty());
    }

    #[test]
    fn test_interrupt() {
        let (instance, executor) = setup();
        let executor = executor.with_interrupt(1, ExecutorError::Cancelled);
        let query = SelectQuery::new(instance.class("book").unwrap());
        let mut seen = Vec::new();
        let result = executor.stream(&query, &mut |row| {
            seen.push(row.id);
            Flow::Continue
        });
        assert_eq!(result, Err(ExecutorError::Cancelled));
        assert_eq!(seen, vec![10]);
    }
}
