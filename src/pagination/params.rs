//! # Pagination Parameters
//!
//! Request parameters shared by the id cursor and the keyset cursor.
//! Parsing never fails: malformed values fall back to their defaults.

use std::collections::HashMap;

use crate::config::PaginationConfig;

pub const PAGE_SIZE_PARAM: &str = "page_size";
pub const DIRECTION_PARAM: &str = "direction";
pub const LAST_PK_PARAM: &str = "last_pk";
pub const ORDERING_PARAM: &str = "ordering";
pub const ORDER_BY_PARAM: &str = "order_by";
pub const LAST_VALUE_PARAM: &str = "last_value";

/// Paging direction relative to the natural order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Backward,
    Forward,
}

impl Direction {
    /// Wire value: `0` backward, `1` forward
    pub fn as_param(&self) -> &'static str {
        match self {
            Direction::Backward => "0",
            Direction::Forward => "1",
        }
    }

    pub fn is_forward(&self) -> bool {
        *self == Direction::Forward
    }
}

/// Parsed pagination parameters
#[derive(Debug, Clone, PartialEq)]
pub struct PageParams {
    pub page_size: usize,
    pub direction: Direction,
    /// Boundary id, 0 when absent
    pub last_pk: i64,
    /// Requested ordering; `None` means the call site default
    pub ascending: Option<bool>,
    /// Raw `order_by`, including a leading `-` for descending
    pub order_by: Option<String>,
    /// Raw `last_value`, decoded later by the order field
    pub last_value: Option<String>,
}

impl PageParams {
    /// Parse pagination parameters from a query map
    pub fn parse(params: &HashMap<String, String>, config: &PaginationConfig) -> Self {
        let get = |key: &str| params.get(key).map(|v| v.trim());

        let page_size = get(PAGE_SIZE_PARAM)
            .and_then(|v| v.parse::<usize>().ok())
            .filter(|size| *size <= config.max_page_size)
            .unwrap_or(config.default_page_size);

        let direction = match get(DIRECTION_PARAM) {
            Some("0") => Direction::Backward,
            _ => Direction::Forward,
        };

        let last_pk = get(LAST_PK_PARAM)
            .and_then(|v| v.parse::<i64>().ok())
            .filter(|pk| *pk > 0)
            .unwrap_or(0);

        let ascending = get(ORDERING_PARAM).and_then(|v| match v.to_ascii_lowercase().as_str() {
            "asc" => Some(true),
            "desc" => Some(false),
            _ => None,
        });

        let order_by = get(ORDER_BY_PARAM)
            .filter(|v| !v.is_empty() && *v != "-")
            .map(str::to_string);

        let last_value = params.get(LAST_VALUE_PARAM).cloned();

        Self {
            page_size,
            direction,
            last_pk,
            ascending,
            order_by,
            last_value,
        }
    }

    /// Keyset field name and ascending flag from `order_by`
    pub fn order_by_field(&self) -> Option<(&str, bool)> {
        self.order_by.as_deref().map(|raw| match raw.strip_prefix('-') {
            Some(name) => (name, false),
            None => (raw, true),
        })
    }
}
