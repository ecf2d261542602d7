//! Class definitions
//!
//! A class is a named collection of objects whose fields are declared
//! as data. Field descriptors are derived lazily, once per class value;
//! a schema change produces a new `Class` (and with it a fresh set).

use std::collections::HashSet;
use std::sync::{Arc, OnceLock};

use serde::{Deserialize, Serialize};

use crate::fields::{builtin_columns, FieldSet, FieldType};

use super::errors::{CatalogError, CatalogResult};

/// Name of the built-in user profile class
pub const USER_PROFILE_CLASS: &str = "user_profile";

/// Storage flavour of a class
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClassKind {
    /// Plain data objects
    #[default]
    Data,
    /// Profiles of instance users, joined on `owner_id`
    UserProfile,
}

/// One field declared in a class schema
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldSchema {
    pub name: String,

    #[serde(rename = "type")]
    pub field_type: FieldType,

    /// Target class name for reference/relation fields ("self" allowed)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,

    #[serde(default)]
    pub filter_index: bool,

    #[serde(default)]
    pub order_index: bool,

    /// Key inside the payload column; defaults to the field name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mapping: Option<String>,
}

impl FieldSchema {
    pub fn new(name: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            name: name.into(),
            field_type,
            target: None,
            filter_index: false,
            order_index: false,
            mapping: None,
        }
    }

    pub fn filtered(mut self) -> Self {
        self.filter_index = true;
        self
    }

    pub fn ordered(mut self) -> Self {
        self.order_index = true;
        self
    }

    pub fn with_target(mut self, target: impl Into<String>) -> Self {
        self.target = Some(target.into());
        self
    }

    pub fn with_mapping(mut self, mapping: impl Into<String>) -> Self {
        self.mapping = Some(mapping.into());
        self
    }

    pub fn storage_key(&self) -> &str {
        self.mapping.as_deref().unwrap_or(&self.name)
    }
}

/// A class definition
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Class {
    pub id: i64,
    pub name: String,

    #[serde(default)]
    pub kind: ClassKind,

    #[serde(default)]
    pub revision: u32,

    #[serde(default)]
    pub schema: Vec<FieldSchema>,

    #[serde(skip)]
    fields: OnceLock<Arc<FieldSet>>,
}

impl Class {
    pub fn new(id: i64, name: impl Into<String>, schema: Vec<FieldSchema>) -> Self {
        Self {
            id,
            name: name.into(),
            kind: ClassKind::Data,
            revision: 1,
            schema,
            fields: OnceLock::new(),
        }
    }

    /// The built-in user profile class
    pub fn user_profile(id: i64, schema: Vec<FieldSchema>) -> Self {
        Self {
            kind: ClassKind::UserProfile,
            ..Self::new(id, USER_PROFILE_CLASS, schema)
        }
    }

    /// Check that every schema field has its own name, distinct from the
    /// fixed columns
    pub fn validate(&self) -> CatalogResult<()> {
        let reserved: Vec<String> = builtin_columns(self.kind)
            .iter()
            .map(|column| column.name().to_string())
            .collect();
        let mut seen = HashSet::new();

        for schema in &self.schema {
            if reserved.contains(&schema.name) {
                return Err(CatalogError::ReservedField {
                    class: self.name.clone(),
                    field: schema.name.clone(),
                });
            }
            if !seen.insert(schema.name.as_str()) {
                return Err(CatalogError::DuplicateField {
                    class: self.name.clone(),
                    field: schema.name.clone(),
                });
            }
        }
        Ok(())
    }

    /// Descriptors for this class, built on first use
    pub fn fields(&self) -> &Arc<FieldSet> {
        self.fields.get_or_init(|| Arc::new(FieldSet::build(self)))
    }

    /// Backing table
    pub fn table_name(&self) -> &'static str {
        match self.kind {
            ClassKind::Data => "data_dataobject",
            ClassKind::UserProfile => "users_userprofile",
        }
    }

    /// Column other classes reference this class by
    pub fn join_column(&self) -> &'static str {
        match self.kind {
            ClassKind::Data => "id",
            ClassKind::UserProfile => "owner_id",
        }
    }

    /// Class id column restricting the shared table to this class
    pub fn class_column(&self) -> &'static str {
        "_klass_id"
    }
}
