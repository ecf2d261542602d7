//! # Operator Registry
//!
//! Built once at startup and read-only afterwards. Several operators may
//! share a lookup suffix; dispatch picks the first one, in registration
//! order, whose type scope accepts the field type.

use std::collections::BTreeMap;

use crate::fields::FieldType;
use crate::observability::{Event, Logger};

use super::lookups;
use super::operator::FilterOperator;

/// Collects operator definitions before freezing them into a registry
#[derive(Debug, Default)]
pub struct RegistryBuilder {
    lookups: BTreeMap<&'static str, Vec<FilterOperator>>,
}

impl RegistryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an operator under its lookup suffix
    pub fn register(mut self, operator: FilterOperator) -> Self {
        self.lookups
            .entry(operator.lookup())
            .or_default()
            .push(operator);
        self
    }

    pub fn build(self) -> OperatorRegistry {
        let registry = OperatorRegistry {
            lookups: self.lookups,
        };
        Logger::info(
            Event::OperatorRegistryBuilt,
            &[
                ("lookups", &registry.lookup_count().to_string()),
                ("operators", &registry.operator_count().to_string()),
            ],
        );
        registry
    }
}

/// Immutable lookup → operators table
#[derive(Debug)]
pub struct OperatorRegistry {
    lookups: BTreeMap<&'static str, Vec<FilterOperator>>,
}

impl OperatorRegistry {
    /// Registry with every built-in lookup
    pub fn builtin() -> Self {
        lookups::register_builtin(RegistryBuilder::new()).build()
    }

    /// Operator for `lookup` on a field of `field_type`
    pub fn resolve(&self, lookup: &str, field_type: FieldType) -> Option<&FilterOperator> {
        self.lookups
            .get(lookup)?
            .iter()
            .find(|operator| operator.supports(field_type))
    }

    pub fn has_lookup(&self, lookup: &str) -> bool {
        self.lookups.contains_key(lookup)
    }

    pub fn lookup_count(&self) -> usize {
        self.lookups.len()
    }

    pub fn operator_count(&self) -> usize {
        self.lookups.values().map(Vec::len).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fields::FieldValue;
    use crate::filter::operator::{Resolved, Shape, TypeScope, ValueKind};
    use crate::query::{CmpOp, Predicate};

    fn marker(
        lookup: &'static str,
        scope: TypeScope,
        build: crate::filter::operator::BuildFn,
    ) -> FilterOperator {
        FilterOperator::new(lookup, scope, Shape::Scalar(ValueKind::Native), build)
    }

    #[test]
    fn test_dispatch_by_type_scope() {
        let registry = RegistryBuilder::new()
            .register(marker("_x", TypeScope::Only(&[FieldType::String]), |f, _| {
                Ok(Predicate::compare(f, CmpOp::Eq, FieldValue::Int(1)))
            }))
            .register(marker("_x", TypeScope::Only(&[FieldType::Integer]), |f, _| {
                Ok(Predicate::compare(f, CmpOp::Eq, FieldValue::Int(2)))
            }))
            .build();

        let string_op = registry.resolve("_x", FieldType::String).unwrap();
        let int_op = registry.resolve("_x", FieldType::Integer).unwrap();
        assert!(string_op.supports(FieldType::String));
        assert!(!string_op.supports(FieldType::Integer));
        assert!(int_op.supports(FieldType::Integer));
        assert!(registry.resolve("_x", FieldType::Float).is_none());
        assert!(registry.resolve("_y", FieldType::String).is_none());
        assert_eq!(registry.operator_count(), 2);
        assert_eq!(registry.lookup_count(), 1);
    }

    #[test]
    fn test_first_registered_wins() {
        let registry = RegistryBuilder::new()
            .register(marker("_x", TypeScope::Except(&[FieldType::Boolean]), |f, _| {
                Ok(Predicate::is_null(f))
            }))
            .register(marker("_x", TypeScope::Any, |f, _| Ok(Predicate::is_not_null(f))))
            .build();

        let field = std::sync::Arc::new(crate::fields::FieldDescriptor::column(
            "n",
            FieldType::Integer,
            true,
            true,
        ));
        let op = registry.resolve("_x", FieldType::Integer).unwrap();
        let predicate = (op.build_fn())(&field, Resolved::Value(FieldValue::Int(0))).unwrap();
        assert_eq!(predicate, Predicate::is_null(&field));

        let op = registry.resolve("_x", FieldType::Boolean).unwrap();
        let predicate = (op.build_fn())(&field, Resolved::Value(FieldValue::Int(0))).unwrap();
        assert_eq!(predicate, Predicate::is_not_null(&field));
    }

    #[test]
    fn test_builtin_lookups() {
        let registry = OperatorRegistry::builtin();
        for lookup in [
            "_gt", "_gte", "_lt", "_lte", "_eq", "_neq", "_in", "_nin", "_exists", "_contains",
            "_icontains", "_startswith", "_istartswith", "_endswith", "_iendswith", "_ieq",
            "_like", "_ilike", "_near", "_is",
        ] {
            assert!(registry.has_lookup(lookup), "{}", lookup);
        }
        assert!(registry.resolve("_near", FieldType::Geopoint).is_some());
        assert!(registry.resolve("_near", FieldType::String).is_none());
        assert!(registry.resolve("_in", FieldType::Geopoint).is_none());
        assert!(registry.resolve("_gt", FieldType::Relation).is_none());
        assert!(registry.resolve("_gt", FieldType::Array).is_none());
        assert!(registry.resolve("_contains", FieldType::String).is_some());
        assert!(registry.resolve("_contains", FieldType::Relation).is_some());
        assert!(registry.resolve("_contains", FieldType::Array).is_some());
        assert!(registry.resolve("_contains", FieldType::Integer).is_none());
        assert!(registry.resolve("_is", FieldType::Reference).is_some());
        assert!(registry.resolve("_is", FieldType::Relation).is_some());
        assert!(registry.resolve("_exists", FieldType::Object).is_some());
    }
}
