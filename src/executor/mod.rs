//! Row executor subsystem
//!
//! Consumes `SelectQuery` values built by the filter and pagination
//! engines and streams rows back through a visitor. The visitor returns
//! `Flow::Stop` to end a stream early; errors are values, never panics.

mod errors;
mod executor;
mod filters;
mod result;
mod sorter;

pub use errors::{ExecutorError, ExecutorResult};
pub use executor::{Flow, MemoryExecutor, RowExecutor};
pub use filters::{PredicateFilter, SubquerySource};
pub use result::{Row, ID_FIELD};
pub use sorter::RowSorter;
