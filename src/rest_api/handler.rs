//! # Objects Handler
//!
//! Lists the objects of one class: resolves the tenant and class, applies
//! the `query` filter document, then pages with the keyset cursor when
//! `order_by` is given and with the id cursor otherwise.

use std::collections::HashMap;
use std::sync::Arc;

use crate::catalog::{Catalog, ClassCatalog};
use crate::config::ServiceConfig;
use crate::executor::RowExecutor;
use crate::filter::{OperatorRegistry, QueryValidator};
use crate::pagination::{IdCursor, KeysetCursor, LinkBase, PageEnvelope, PageParams, Paginator};
use crate::query::SelectQuery;

use super::errors::{ApiError, ApiResult};

/// Request parameter carrying the filter document
pub const QUERY_PARAM: &str = "query";

/// Default ordering of the id cursor
const DEFAULT_ASCENDING: bool = true;

/// Serves object listings from a catalog and a row executor
pub struct ObjectsHandler<E: RowExecutor> {
    catalog: Catalog,
    executor: E,
    registry: OperatorRegistry,
    config: ServiceConfig,
}

impl<E: RowExecutor> ObjectsHandler<E> {
    pub fn new(catalog: Catalog, executor: E, registry: OperatorRegistry, config: ServiceConfig) -> Self {
        Self {
            catalog,
            executor,
            registry,
            config,
        }
    }

    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    /// Base path of an object listing
    pub fn objects_path(instance: &str, class: &str) -> String {
        format!("/v1/instances/{}/classes/{}/objects/", instance, class)
    }

    /// List objects of `class` in `instance`
    pub fn list(
        &self,
        instance: &str,
        class: &str,
        params: &HashMap<String, String>,
    ) -> ApiResult<PageEnvelope> {
        let tenant = self
            .catalog
            .instance(instance)
            .ok_or_else(|| ApiError::InstanceNotFound(instance.to_string()))?;
        let class_def = tenant
            .class(class)
            .ok_or_else(|| ApiError::ClassNotFound(class.to_string()))?;

        let mut query = SelectQuery::new(Arc::clone(&class_def));
        let mut base = LinkBase::new(Self::objects_path(instance, class));

        if let Some(document) = params.get(QUERY_PARAM) {
            let validator = QueryValidator::new(&self.registry, &self.config.query);
            query = validator.parse_str(&*tenant, document, query)?;
            base = base.carry(QUERY_PARAM, document.as_str());
        }

        let page_params = PageParams::parse(params, &self.config.pagination);
        let paginator = Paginator::new(&self.executor, &self.config.pagination);

        let envelope = match KeysetCursor::from_params(&class_def, &page_params)? {
            Some(mut cursor) => paginator.page(query, &mut cursor, &base)?,
            None => {
                let mut cursor = IdCursor::new(&class_def, &page_params, DEFAULT_ASCENDING)?;
                paginator.page(query, &mut cursor, &base)?
            }
        };
        Ok(envelope)
    }
}
