//! # Page Envelope
//!
//! `{"objects": [...], "prev": ..., "next": ..., ...extra}` plus the
//! navigation links derived from a finished cursor.

use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use serde::Serialize;
use serde_json::{Map, Value};

use crate::config::PaginationConfig;
use crate::fields::FieldValue;

use super::cursor::{Boundary, PageCursor};
use super::errors::PaginationResult;
use super::params::{Direction, DIRECTION_PARAM, LAST_PK_PARAM, ORDERING_PARAM, PAGE_SIZE_PARAM};

/// Unreserved characters stay readable in links
const QUERY_VALUE: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

/// Path and pass-through parameters every link of a listing repeats
#[derive(Debug, Clone, Default)]
pub struct LinkBase {
    pub path: String,
    /// Request parameters that are not pagination state, e.g. the filter document
    pub carried: Vec<(String, String)>,
}

impl LinkBase {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            carried: Vec::new(),
        }
    }

    pub fn carry(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.carried.push((key.into(), value.into()));
        self
    }

    fn url(&self, params: &[(&str, String)]) -> String {
        let carried = self.carried.iter().map(|(k, v)| (k.as_str(), v.as_str()));
        let query: Vec<String> = params
            .iter()
            .map(|(k, v)| (*k, v.as_str()))
            .chain(carried)
            .map(|(k, v)| format!("{}={}", k, utf8_percent_encode(v, QUERY_VALUE)))
            .collect();
        format!("{}?{}", self.path, query.join("&"))
    }
}

/// Serialized objects of one page, in natural order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PageRows {
    pub objects: Vec<Value>,
    /// The response byte budget cut the page short
    pub truncated: bool,
}

/// Response envelope of a listing
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PageEnvelope {
    pub objects: Vec<Value>,
    pub prev: Option<String>,
    pub next: Option<String>,
    #[serde(skip_serializing_if = "is_false")]
    pub truncated: bool,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

fn is_false(flag: &bool) -> bool {
    !*flag
}

impl PageEnvelope {
    /// Wrap fetched rows with links derived from `cursor`
    pub fn build<C: PageCursor>(
        cursor: &C,
        rows: PageRows,
        base: &LinkBase,
        config: &PaginationConfig,
    ) -> PaginationResult<Self> {
        let count = rows.objects.len();
        let state = cursor.cursor();
        // An empty page past either end links back from that end
        let open_end = Boundary {
            pk: 0,
            value: FieldValue::Null,
        };

        let next = if state.has_next(count) {
            let boundary = state.last().unwrap_or(&open_end);
            Some(link(cursor, Direction::Forward, boundary, base, config)?)
        } else {
            None
        };
        let prev = if state.has_prev(count) {
            let boundary = state.first().unwrap_or(&open_end);
            Some(link(cursor, Direction::Backward, boundary, base, config)?)
        } else {
            None
        };

        Ok(Self {
            objects: rows.objects,
            prev,
            next,
            truncated: rows.truncated,
            extra: Map::new(),
        })
    }

    /// Add a top-level property next to `objects`
    pub fn with_extra(mut self, key: impl Into<String>, value: Value) -> Self {
        self.extra.insert(key.into(), value);
        self
    }
}

fn link<C: PageCursor>(
    cursor: &C,
    direction: Direction,
    boundary: &Boundary,
    base: &LinkBase,
    config: &PaginationConfig,
) -> PaginationResult<String> {
    let state = cursor.cursor();
    let mut params = vec![(DIRECTION_PARAM, direction.as_param().to_string())];
    if state.limit != config.default_page_size {
        params.push((PAGE_SIZE_PARAM, state.limit.to_string()));
    }
    if boundary.pk != 0 {
        params.push((LAST_PK_PARAM, boundary.pk.to_string()));
    }
    if !state.is_default_ordering() {
        let ordering = if state.natural_ascending() { "asc" } else { "desc" };
        params.push((ORDERING_PARAM, ordering.to_string()));
    }
    params.extend(cursor.link_params(boundary)?);
    Ok(base.url(&params))
}
