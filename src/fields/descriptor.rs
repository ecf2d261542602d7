//! Field descriptors
//!
//! A descriptor is the single handle the filter and pagination engines use
//! for a queryable attribute, whether it is a fixed table column or a
//! field declared in a class schema at runtime. Descriptors are immutable
//! and built once per class revision (see `catalog::Class::fields`).

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::catalog::{Class, ClassKind, FieldSchema};
use crate::executor::Row;

use super::errors::ConversionResult;
use super::types::{FieldType, FieldValue};

/// Column holding the schema-field payload of every object
pub const DATA_COLUMN: &str = "_data";

/// Where a field's value lives in the backing table
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldSource {
    /// A native table column
    Column(String),
    /// A key inside the payload column; cast to the native type on read
    Payload { key: String },
}

/// An immutable, queryable attribute of a class
#[derive(Debug, Clone, PartialEq)]
pub struct FieldDescriptor {
    name: String,
    field_type: FieldType,
    source: FieldSource,
    target: Option<String>,
    filterable: bool,
    orderable: bool,
}

impl FieldDescriptor {
    /// A fixed table column
    pub fn column(name: &str, field_type: FieldType, filterable: bool, orderable: bool) -> Self {
        Self {
            name: name.to_string(),
            field_type,
            source: FieldSource::Column(name.to_string()),
            target: None,
            filterable,
            orderable,
        }
    }

    /// A field declared by a class schema
    pub fn from_schema(schema: &FieldSchema) -> Self {
        Self {
            name: schema.name.clone(),
            field_type: schema.field_type,
            source: FieldSource::Payload {
                key: schema.storage_key().to_string(),
            },
            target: schema.target.clone(),
            filterable: schema.filter_index,
            orderable: schema.order_index && schema.field_type.is_ordered(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn field_type(&self) -> FieldType {
        self.field_type
    }

    pub fn source(&self) -> &FieldSource {
        &self.source
    }

    /// Target class of a reference or relation field
    pub fn target(&self) -> Option<&str> {
        self.target.as_deref()
    }

    pub fn is_filterable(&self) -> bool {
        self.filterable
    }

    pub fn is_orderable(&self) -> bool {
        self.orderable
    }

    /// SQL expression reading this field from the table aliased `alias`.
    pub fn sql_expr(&self, alias: &str) -> String {
        match &self.source {
            FieldSource::Column(column) => format!("\"{}\".\"{}\"", alias, column),
            FieldSource::Payload { key } => {
                let raw = format!(
                    "\"{}\".\"{}\"->'{}'",
                    alias,
                    DATA_COLUMN,
                    key.replace('\'', "''")
                );
                self.field_type.cast_sql(&raw)
            }
        }
    }

    /// Value of this field on a fetched row
    pub fn get(&self, row: &Row) -> FieldValue {
        row.get(&self.name)
    }

    pub fn value_to_string(&self, value: &FieldValue) -> ConversionResult<String> {
        self.field_type.format(value)
    }

    pub fn value_from_string(&self, input: &str) -> ConversionResult<FieldValue> {
        self.field_type.parse(input)
    }
}

/// Fixed table columns every class of `kind` carries
pub fn builtin_columns(kind: ClassKind) -> Vec<FieldDescriptor> {
    let mut columns = vec![
        FieldDescriptor::column("id", FieldType::Integer, true, true),
        FieldDescriptor::column("created_at", FieldType::Datetime, true, true),
        FieldDescriptor::column("updated_at", FieldType::Datetime, true, true),
        FieldDescriptor::column("revision", FieldType::Integer, true, false),
    ];
    if kind == ClassKind::UserProfile {
        columns.push(FieldDescriptor::column("owner_id", FieldType::Reference, true, false));
    }
    columns
}

/// Lookup failure on a `FieldSet`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldLookup {
    /// No such field on the class
    Unknown,
    /// The field exists but lacks the index the use needs
    NotIndexed,
}

/// All descriptors of one class revision, keyed by field name
#[derive(Debug, Clone, Default)]
pub struct FieldSet {
    fields: BTreeMap<String, Arc<FieldDescriptor>>,
}

impl FieldSet {
    /// Build the descriptor set for a class: fixed columns first, then schema fields.
    ///
    /// A schema field reusing a fixed column name is skipped; the column keeps
    /// its descriptor. `Class::validate` rejects such schemas at load time.
    pub fn build(class: &Class) -> Self {
        let mut fields = BTreeMap::new();
        for descriptor in builtin_columns(class.kind) {
            fields.insert(descriptor.name().to_string(), Arc::new(descriptor));
        }

        for schema in &class.schema {
            fields
                .entry(schema.name.clone())
                .or_insert_with(|| Arc::new(FieldDescriptor::from_schema(schema)));
        }

        Self { fields }
    }

    pub fn get(&self, name: &str) -> Option<&Arc<FieldDescriptor>> {
        self.fields.get(name)
    }

    /// A field usable in a filter document
    pub fn filter_field(&self, name: &str) -> Result<&Arc<FieldDescriptor>, FieldLookup> {
        match self.fields.get(name) {
            Some(field) if field.is_filterable() => Ok(field),
            Some(_) => Err(FieldLookup::NotIndexed),
            None => Err(FieldLookup::Unknown),
        }
    }

    /// A field usable in `order_by`
    pub fn order_field(&self, name: &str) -> Result<&Arc<FieldDescriptor>, FieldLookup> {
        match self.fields.get(name) {
            Some(field) if field.is_orderable() => Ok(field),
            Some(_) => Err(FieldLookup::NotIndexed),
            None => Err(FieldLookup::Unknown),
        }
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}
