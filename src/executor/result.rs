//! Fetched rows

use std::collections::BTreeMap;

use serde_json::{Map, Value};

use crate::fields::FieldValue;

/// Name of the primary key column
pub const ID_FIELD: &str = "id";

/// One object as returned by a row executor
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Row {
    pub id: i64,
    values: BTreeMap<String, FieldValue>,
}

impl Row {
    pub fn new(id: i64) -> Self {
        Self {
            id,
            values: BTreeMap::new(),
        }
    }

    /// Builder form of `set`
    pub fn with(mut self, name: impl Into<String>, value: FieldValue) -> Self {
        self.set(name, value);
        self
    }

    pub fn set(&mut self, name: impl Into<String>, value: FieldValue) {
        self.values.insert(name.into(), value);
    }

    /// Value of a field; absent fields read as null
    pub fn get(&self, name: &str) -> FieldValue {
        if name == ID_FIELD {
            return FieldValue::Int(self.id);
        }
        self.values.get(name).cloned().unwrap_or(FieldValue::Null)
    }

    /// JSON object with `id` and every stored field
    pub fn to_json(&self) -> Value {
        let mut object = Map::new();
        object.insert(ID_FIELD.to_string(), Value::from(self.id));
        for (name, value) in &self.values {
            object.insert(name.clone(), value.to_json());
        }
        Value::Object(object)
    }
}
