//! # Filter engine
//!
//! Validates client filter documents of the form
//! `{"<field>": {"<lookup>": <value>, ...}, ...}` against a class and
//! turns them into query predicates through an operator registry built
//! once at startup.

mod errors;
mod lookups;
mod operator;
mod registry;
mod validator;

pub use errors::{FilterError, FilterResult};
pub use lookups::{register_builtin, DEFAULT_NEAR_MILES, KM_PER_MILE, SELF_TARGET};
pub use operator::{
    BuildFn, FilterOperator, Rejection, Resolved, Shape, TypeScope, ValidateFn,
    ValidationContext, ValueKind,
};
pub use registry::{OperatorRegistry, RegistryBuilder};
pub use validator::{QueryValidator, NESTED_LOOKUP};
