//! # Query builder
//!
//! The composable "append predicate / order / limit" surface shared by the
//! filter engine, the pagination engine and row executors.

mod predicate;
mod select;
mod sql;

pub use predicate::{CmpOp, Operand, Predicate};
pub use select::{OrderTerm, SelectQuery, ROOT_ALIAS};
pub use sql::SqlWriter;
