//! Tenant catalog
//!
//! Instances (tenants) own classes; a class's field schema is data loaded
//! at runtime. The filter engine reaches other classes (for `_is`
//! subqueries) only through the `ClassCatalog` trait.

mod class;
mod errors;

pub use class::{Class, ClassKind, FieldSchema, USER_PROFILE_CLASS};
pub use errors::{CatalogError, CatalogResult};

use std::collections::BTreeMap;
use std::sync::Arc;

/// Resolves classes by name within one tenant
pub trait ClassCatalog: Send + Sync {
    fn class(&self, name: &str) -> Option<Arc<Class>>;
}

/// A tenant and its classes
#[derive(Debug, Clone, Default)]
pub struct Instance {
    name: String,
    classes: BTreeMap<String, Arc<Class>>,
}

impl Instance {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            classes: BTreeMap::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Register a class, replacing any earlier definition with the same name
    pub fn add_class(&mut self, class: Class) -> Arc<Class> {
        let class = Arc::new(class);
        self.classes.insert(class.name.clone(), Arc::clone(&class));
        class
    }
}

impl ClassCatalog for Instance {
    fn class(&self, name: &str) -> Option<Arc<Class>> {
        self.classes.get(name).cloned()
    }
}

/// All tenants served by this process
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    instances: BTreeMap<String, Arc<Instance>>,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_instance(&mut self, instance: Instance) {
        self.instances
            .insert(instance.name.clone(), Arc::new(instance));
    }

    pub fn instance(&self, name: &str) -> Option<Arc<Instance>> {
        self.instances.get(name).cloned()
    }

    pub fn len(&self) -> usize {
        self.instances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }
}
