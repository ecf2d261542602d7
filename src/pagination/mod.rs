//! # Cursor pagination
//!
//! Two cursor kinds share request parameter parsing:
//!
//! - `IdCursor` pages by object id (`last_pk`)
//! - `KeysetCursor` pages by `(order_by field, id)` with NULLS LAST
//!   semantics (`order_by`, `last_pk`, `last_value`)
//!
//! The `Paginator` streams rows from a `RowExecutor`, applies the response
//! byte budget and builds the `{objects, prev, next}` envelope.

mod cursor;
mod errors;
mod page;
mod paginator;
mod params;

pub use cursor::{Boundary, Cursor, IdCursor, KeysetCursor, PageCursor};
pub use errors::{PaginationError, PaginationResult};
pub use page::{LinkBase, PageEnvelope, PageRows};
pub use paginator::{ItemSerializer, ObjectSerializer, Paginator};
pub use params::{
    Direction, PageParams, DIRECTION_PARAM, LAST_PK_PARAM, LAST_VALUE_PARAM, ORDERING_PARAM,
    ORDER_BY_PARAM, PAGE_SIZE_PARAM,
};
