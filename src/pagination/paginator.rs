//! # Paginator
//!
//! Streams the rows of a cursor-bounded query, serializes them under a
//! cumulative byte budget and commits the page boundaries to the cursor
//! once the stream finished cleanly.

use serde_json::Value;

use crate::config::PaginationConfig;
use crate::executor::{Flow, Row, RowExecutor};
use crate::observability::{Event, Logger};
use crate::query::SelectQuery;

use super::cursor::{Boundary, PageCursor};
use super::errors::{PaginationError, PaginationResult};
use super::page::{LinkBase, PageEnvelope, PageRows};

/// Turns a row into the JSON item placed in `objects`
pub trait ItemSerializer {
    fn serialize(&self, row: &Row) -> PaginationResult<Value>;
}

/// Serializes every stored field of a row
#[derive(Debug, Clone, Copy, Default)]
pub struct ObjectSerializer;

impl ItemSerializer for ObjectSerializer {
    fn serialize(&self, row: &Row) -> PaginationResult<Value> {
        Ok(row.to_json())
    }
}

/// Runs paginated listings against a row executor
pub struct Paginator<'a, E: RowExecutor + ?Sized, S: ItemSerializer = ObjectSerializer> {
    executor: &'a E,
    serializer: S,
    config: &'a PaginationConfig,
}

impl<'a, E: RowExecutor + ?Sized> Paginator<'a, E, ObjectSerializer> {
    pub fn new(executor: &'a E, config: &'a PaginationConfig) -> Self {
        Self::with_serializer(executor, ObjectSerializer, config)
    }
}

impl<'a, E: RowExecutor + ?Sized, S: ItemSerializer> Paginator<'a, E, S> {
    pub fn with_serializer(executor: &'a E, serializer: S, config: &'a PaginationConfig) -> Self {
        Self {
            executor,
            serializer,
            config,
        }
    }

    /// Fetch one page and wrap it in the response envelope
    pub fn page<C: PageCursor>(
        &self,
        query: SelectQuery,
        cursor: &mut C,
        base: &LinkBase,
    ) -> PaginationResult<PageEnvelope> {
        let rows = self.fetch(query, cursor)?;
        PageEnvelope::build(cursor, rows, base, self.config)
    }

    /// Fetch one page of serialized objects in natural order.
    ///
    /// On an executor error nothing is committed to the cursor and the
    /// partial page is dropped.
    pub fn fetch<C: PageCursor>(&self, query: SelectQuery, cursor: &mut C) -> PaginationResult<PageRows> {
        let query = cursor.apply(query);
        let limit = cursor.cursor().limit;
        let budget = self.config.max_response_bytes;

        let mut objects = Vec::new();
        let mut used_bytes = 0usize;
        let mut truncated = false;
        let mut first: Option<Boundary> = None;
        let mut last: Option<Boundary> = None;
        let mut failure: Option<PaginationError> = None;

        let streamed = {
            let cursor: &C = cursor;
            self.executor.stream(&query, &mut |row| {
                if objects.len() >= limit {
                    return Flow::Stop;
                }
                let item = match self.sized_item(row) {
                    Ok(item) => item,
                    Err(err) => {
                        failure = Some(err);
                        return Flow::Stop;
                    }
                };
                if used_bytes + item.1 > budget {
                    truncated = true;
                    return Flow::Stop;
                }
                used_bytes += item.1;

                let boundary = cursor.boundary(row);
                if first.is_none() {
                    first = Some(boundary.clone());
                }
                last = Some(boundary);
                objects.push(item.0);

                if objects.len() >= limit {
                    Flow::Stop
                } else {
                    Flow::Continue
                }
            })
        };

        if let Err(err) = streamed {
            Logger::error(
                Event::PageAborted,
                &[
                    ("class", query.class().name.as_str()),
                    ("code", err.code()),
                    ("reason", &err.to_string()),
                ],
            );
            return Err(err.into());
        }
        if let Some(err) = failure {
            return Err(err);
        }
        if truncated {
            Logger::warn(
                Event::PageTruncated,
                &[
                    ("budget", &budget.to_string()),
                    ("class", query.class().name.as_str()),
                    ("emitted", &objects.len().to_string()),
                ],
            );
        }

        let state = cursor.cursor_mut();
        if let Some(boundary) = first {
            state.set_first(boundary);
        }
        if let Some(boundary) = last {
            state.set_last(boundary);
        }
        if !state.direction.is_forward() {
            objects.reverse();
        }

        Ok(PageRows { objects, truncated })
    }

    /// Serialized item and its encoded size in bytes
    fn sized_item(&self, row: &Row) -> PaginationResult<(Value, usize)> {
        let item = self.serializer.serialize(row)?;
        let size = serde_json::to_vec(&item)
            .map_err(|e| PaginationError::Serialize {
                id: row.id,
                reason: e.to_string(),
            })?
            .len();
        Ok((item, size))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{Class, FieldSchema};
    use crate::executor::{ExecutorError, MemoryExecutor};
    use crate::fields::{FieldType, FieldValue};
    use crate::pagination::{IdCursor, PageParams};
    use serde_json::json;
    use std::collections::HashMap;
    use std::sync::Arc;

    fn store(rows: i64) -> (Arc<Class>, MemoryExecutor) {
        let class = Arc::new(Class::new(
            1,
            "note",
            vec![FieldSchema::new("body", FieldType::String)],
        ));
        let mut executor = MemoryExecutor::new();
        for id in 1..=rows {
            executor.insert(&class, Row::new(id).with("body", FieldValue::Text(format!("n{}", id))));
        }
        (class, executor)
    }

    fn cursor(class: &Class, pairs: &[(&str, &str)]) -> IdCursor {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        IdCursor::new(class, &PageParams::parse(&map, &PaginationConfig::default()), true).unwrap()
    }

    fn ids(rows: &PageRows) -> Vec<i64> {
        rows.objects.iter().map(|o| o["id"].as_i64().unwrap()).collect()
    }

    #[test]
    fn test_forward_and_backward_pages() {
        let (class, executor) = store(7);
        let config = PaginationConfig::default();
        let paginator = Paginator::new(&executor, &config);

        let mut forward = cursor(&class, &[("page_size", "3"), ("last_pk", "2")]);
        let rows = paginator.fetch(SelectQuery::new(Arc::clone(&class)), &mut forward).unwrap();
        assert_eq!(ids(&rows), vec![3, 4, 5]);
        assert_eq!(forward.cursor().first().unwrap().pk, 3);
        assert_eq!(forward.cursor().last().unwrap().pk, 5);

        let mut backward = cursor(&class, &[("page_size", "3"), ("last_pk", "6"), ("direction", "0")]);
        let rows = paginator.fetch(SelectQuery::new(class), &mut backward).unwrap();
        assert_eq!(ids(&rows), vec![3, 4, 5]);
        assert_eq!(backward.cursor().first().unwrap().pk, 3);
        assert_eq!(backward.cursor().last().unwrap().pk, 5);
    }

    #[test]
    fn test_budget_smaller_than_one_object() {
        let (class, executor) = store(3);
        let config = PaginationConfig {
            max_response_bytes: 5,
            ..PaginationConfig::default()
        };
        let paginator = Paginator::new(&executor, &config);
        let mut c = cursor(&class, &[("page_size", "2")]);
        let envelope = paginator
            .page(SelectQuery::new(class), &mut c, &LinkBase::new("/notes/"))
            .unwrap();
        assert!(envelope.objects.is_empty());
        assert!(envelope.truncated);
        assert_eq!(envelope.next, None);
        assert_eq!(envelope.prev, None);
    }

    #[test]
    fn test_budget_cuts_page_short() {
        let (class, executor) = store(5);
        let one = serde_json::to_vec(&json!({"id": 1, "body": "n1"})).unwrap().len();
        let config = PaginationConfig {
            max_response_bytes: one * 2,
            ..PaginationConfig::default()
        };
        let paginator = Paginator::new(&executor, &config);
        let mut c = cursor(&class, &[("page_size", "4")]);
        let rows = paginator.fetch(SelectQuery::new(class), &mut c).unwrap();
        assert_eq!(ids(&rows), vec![1, 2]);
        assert!(rows.truncated);
        assert!(!c.cursor().has_next(rows.objects.len()));
    }

    #[test]
    fn test_executor_failure_leaves_cursor_untouched() {
        let (class, executor) = store(5);
        let executor = executor.with_interrupt(2, ExecutorError::Cancelled);
        let config = PaginationConfig::default();
        let paginator = Paginator::new(&executor, &config);
        let mut c = cursor(&class, &[]);
        let err = paginator.fetch(SelectQuery::new(class), &mut c).unwrap_err();
        assert_eq!(err, PaginationError::Executor(ExecutorError::Cancelled));
        assert!(c.cursor().first().is_none());
        assert!(c.cursor().last().is_none());
    }

    #[test]
    fn test_custom_serializer() {
        struct BodyOnly;
        impl ItemSerializer for BodyOnly {
            fn serialize(&self, row: &Row) -> PaginationResult<Value> {
                Ok(row.get("body").to_json())
            }
        }

        let (class, executor) = store(2);
        let config = PaginationConfig::default();
        let paginator = Paginator::with_serializer(&executor, BodyOnly, &config);
        let mut c = cursor(&class, &[]);
        let rows = paginator.fetch(SelectQuery::new(class), &mut c).unwrap();
        assert_eq!(rows.objects, vec![json!("n1"), json!("n2")]);
    }

    #[test]
    fn test_links() {
        let (class, executor) = store(7);
        let config = PaginationConfig::default();
        let paginator = Paginator::new(&executor, &config);
        let base = LinkBase::new("/notes/");

        let mut c = cursor(&class, &[("page_size", "3"), ("last_pk", "2")]);
        let envelope = paginator.page(SelectQuery::new(Arc::clone(&class)), &mut c, &base).unwrap();
        assert_eq!(envelope.next.as_deref(), Some("/notes/?direction=1&page_size=3&last_pk=5"));
        assert_eq!(envelope.prev.as_deref(), Some("/notes/?direction=0&page_size=3&last_pk=3"));

        let mut c = cursor(&class, &[("ordering", "desc")]);
        let envelope = paginator.page(SelectQuery::new(Arc::clone(&class)), &mut c, &base).unwrap();
        assert_eq!(ids(&PageRows { objects: envelope.objects.clone(), truncated: false }), vec![7, 6, 5, 4, 3, 2, 1]);
        assert_eq!(envelope.next, None);
        assert_eq!(envelope.prev, None);

        let mut c = cursor(&class, &[("ordering", "desc"), ("page_size", "2")]);
        let envelope = paginator.page(SelectQuery::new(class), &mut c, &base).unwrap();
        assert_eq!(
            envelope.next.as_deref(),
            Some("/notes/?direction=1&page_size=2&last_pk=6&ordering=desc")
        );
    }

    #[test]
    fn test_empty_page_past_the_end_links_back() {
        let (class, executor) = store(4);
        let config = PaginationConfig::default();
        let paginator = Paginator::new(&executor, &config);
        let base = LinkBase::new("/notes/");

        let mut c = cursor(&class, &[("page_size", "2"), ("last_pk", "4")]);
        let envelope = paginator.page(SelectQuery::new(Arc::clone(&class)), &mut c, &base).unwrap();
        assert!(envelope.objects.is_empty());
        assert_eq!(envelope.next, None);
        assert_eq!(envelope.prev.as_deref(), Some("/notes/?direction=0&page_size=2"));

        let mut c = cursor(&class, &[("page_size", "2"), ("direction", "0")]);
        let rows = paginator.fetch(SelectQuery::new(Arc::clone(&class)), &mut c).unwrap();
        assert_eq!(ids(&rows), vec![3, 4]);

        let mut c = cursor(&class, &[("page_size", "2"), ("last_pk", "1"), ("direction", "0")]);
        let envelope = paginator.page(SelectQuery::new(class), &mut c, &base).unwrap();
        assert!(envelope.objects.is_empty());
        assert_eq!(envelope.prev, None);
        assert_eq!(envelope.next.as_deref(), Some("/notes/?direction=1&page_size=2"));
    }
}
