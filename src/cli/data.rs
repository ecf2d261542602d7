//! Instance data file
//!
//! ```json
//! {"instances": [{"name": "acme", "classes": [
//!     {"id": 1, "name": "book", "schema": [...], "objects": [{"id": 1, ...}]}
//! ]}]}
//! ```
//!
//! Object values are decoded through the declared field type, so a data
//! file that disagrees with its schema is rejected at load time.

use std::collections::HashSet;
use std::fs;
use std::path::Path;

use serde::Deserialize;
use serde_json::{Map, Value};

use crate::catalog::{Catalog, Class, Instance};
use crate::executor::{MemoryExecutor, Row, ID_FIELD};
use crate::fields::json_number_as_int;

use super::errors::{CliError, CliResult};

#[derive(Debug, Deserialize)]
struct DataFile {
    #[serde(default)]
    instances: Vec<InstanceData>,
}

#[derive(Debug, Deserialize)]
struct InstanceData {
    name: String,
    #[serde(default)]
    classes: Vec<ClassData>,
}

#[derive(Debug, Deserialize)]
struct ClassData {
    #[serde(flatten)]
    class: Class,
    #[serde(default)]
    objects: Vec<Map<String, Value>>,
}

/// Catalog and rows loaded from a data file
#[derive(Debug)]
pub struct LoadedData {
    pub catalog: Catalog,
    pub executor: MemoryExecutor,
}

impl LoadedData {
    pub fn load(path: &Path) -> CliResult<Self> {
        let content = fs::read_to_string(path).map_err(|source| CliError::DataRead {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json_str(&content)
    }

    pub fn from_json_str(content: &str) -> CliResult<Self> {
        let file: DataFile = serde_json::from_str(content)
            .map_err(|e| CliError::invalid_data(e.to_string()))?;

        let mut catalog = Catalog::new();
        let mut executor = MemoryExecutor::new();
        // Rows are stored per class id, so ids must not repeat across instances.
        let mut class_ids = HashSet::new();

        for instance_data in file.instances {
            let mut instance = Instance::new(instance_data.name.as_str());
            for class_data in instance_data.classes {
                if !class_ids.insert(class_data.class.id) {
                    return Err(CliError::invalid_data(format!(
                        "duplicate class id {}",
                        class_data.class.id
                    )));
                }
                class_data.class.validate()?;
                let class = instance.add_class(class_data.class);
                for object in &class_data.objects {
                    let row = decode_row(&class, object)
                        .map_err(|reason| {
                            CliError::invalid_data(format!(
                                "{}/{}: {}",
                                instance_data.name, class.name, reason
                            ))
                        })?;
                    executor.insert(&class, row);
                }
            }
            catalog.add_instance(instance);
        }

        Ok(Self { catalog, executor })
    }
}

fn decode_row(class: &Class, object: &Map<String, Value>) -> Result<Row, String> {
    let id = object
        .get(ID_FIELD)
        .and_then(|v| v.as_number())
        .and_then(json_number_as_int)
        .filter(|id| *id > 0)
        .ok_or_else(|| "object without a positive integer id".to_string())?;

    let mut row = Row::new(id);
    for (name, value) in object {
        if name == ID_FIELD {
            continue;
        }
        let field = class
            .fields()
            .get(name)
            .ok_or_else(|| format!("object {}: unknown field {}", id, name))?;
        let value = field
            .field_type()
            .value_from_json(value)
            .map_err(|e| format!("object {}: {}: {}", id, name, e))?;
        row.set(name.as_str(), value);
    }
    Ok(row)
}
