//! # Query Validator
//!
//! Turns a client filter document into predicates in three passes:
//! structure (known fields, lookup maps), nesting (`_is` budget) and
//! resolution (operator dispatch). Any failure aborts the whole parse.

use std::sync::Arc;

use serde_json::{Map, Value};

use crate::catalog::{Class, ClassCatalog};
use crate::config::QueryConfig;
use crate::fields::FieldLookup;
use crate::observability::{Event, Logger};
use crate::query::{Operand, Predicate, SelectQuery};

use super::errors::{FilterError, FilterResult};
use super::operator::ValidationContext;
use super::registry::OperatorRegistry;

/// Lookup that opens a subquery on a reference or relation target
pub const NESTED_LOOKUP: &str = "_is";

/// Parses filter documents against a registry
pub struct QueryValidator<'a> {
    registry: &'a OperatorRegistry,
    config: &'a QueryConfig,
}

impl<'a> QueryValidator<'a> {
    pub fn new(registry: &'a OperatorRegistry, config: &'a QueryConfig) -> Self {
        Self { registry, config }
    }

    pub fn config(&self) -> &QueryConfig {
        self.config
    }

    pub fn registry(&self) -> &OperatorRegistry {
        self.registry
    }

    /// Parse the raw `query` request parameter and AND its predicates into `query`.
    pub fn parse_str(
        &self,
        catalog: &dyn ClassCatalog,
        document: &str,
        query: SelectQuery,
    ) -> FilterResult<SelectQuery> {
        let document: Value =
            serde_json::from_str(document).map_err(|e| FilterError::InvalidJson(e.to_string()))?;
        self.parse(catalog, &document, query)
    }

    /// Validate a decoded filter document for the query's class and AND its predicates in.
    pub fn parse(
        &self,
        catalog: &dyn ClassCatalog,
        document: &Value,
        query: SelectQuery,
    ) -> FilterResult<SelectQuery> {
        let class = Arc::clone(query.class());
        let predicates = self.resolve(catalog, &class, document, 0).map_err(|err| {
            Logger::warn(
                Event::FilterRejected,
                &[("class", class.name.as_str()), ("reason", &err.to_string())],
            );
            err
        })?;
        Ok(query.and_all(predicates))
    }

    /// Resolve a document into predicates for `class`.
    ///
    /// `depth` is 0 for a top-level document and 1 inside an `_is` subquery.
    pub(crate) fn resolve(
        &self,
        catalog: &dyn ClassCatalog,
        class: &Arc<Class>,
        document: &Value,
        depth: usize,
    ) -> FilterResult<Vec<Predicate>> {
        let entries = structural_pass(class, document)?;
        self.nesting_pass(&entries, depth)?;

        let ctx = ValidationContext {
            validator: self,
            catalog,
            class,
            depth,
        };

        let mut predicates = Vec::new();
        for (field, lookups) in &entries {
            for (lookup, value) in lookups.iter() {
                let operator = self
                    .registry
                    .resolve(lookup, field.field_type())
                    .ok_or_else(|| FilterError::UnsupportedLookup {
                        field: field.name().to_string(),
                        lookup: lookup.clone(),
                        field_type: field.field_type(),
                    })?;
                predicates.push(operator.apply(&ctx, field, value)?);
            }
        }
        Ok(predicates)
    }

    fn nesting_pass(&self, entries: &[(Operand, &Map<String, Value>)], depth: usize) -> FilterResult<()> {
        let nested: Vec<&Operand> = entries
            .iter()
            .filter(|(_, lookups)| lookups.contains_key(NESTED_LOOKUP))
            .map(|(field, _)| field)
            .collect();

        if depth > 0 {
            if let Some(field) = nested.first() {
                return Err(FilterError::DoubleNesting(field.name().to_string()));
            }
        } else if nested.len() > self.config.max_nesting {
            return Err(FilterError::NestingExceeded {
                count: nested.len(),
                max: self.config.max_nesting,
            });
        }
        Ok(())
    }
}

/// Check that the document is an object of lookup maps over filterable fields.
fn structural_pass<'d>(
    class: &Class,
    document: &'d Value,
) -> FilterResult<Vec<(Operand, &'d Map<String, Value>)>> {
    let object = document.as_object().ok_or(FilterError::NotAnObject)?;
    let fields = class.fields();

    object
        .iter()
        .map(|(name, lookups)| {
            let field = fields.filter_field(name).map_err(|lookup| match lookup {
                FieldLookup::Unknown => FilterError::UnknownField(name.clone()),
                FieldLookup::NotIndexed => FilterError::FieldNotFilterable(name.clone()),
            })?;
            let lookups = lookups
                .as_object()
                .ok_or_else(|| FilterError::NotAMapping(name.clone()))?;
            Ok((Arc::clone(field), lookups))
        })
        .collect()
}
