//! SQL text accumulator with positional parameters

use crate::fields::FieldValue;

/// Collects SQL text and bound arguments; placeholders are numbered
/// in binding order across nested subqueries.
#[derive(Debug, Default)]
pub struct SqlWriter {
    sql: String,
    args: Vec<FieldValue>,
}

impl SqlWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, text: &str) {
        self.sql.push_str(text);
    }

    /// Bind a value and emit its placeholder
    pub fn bind(&mut self, value: FieldValue) {
        self.args.push(value);
        self.sql.push('$');
        self.sql.push_str(&self.args.len().to_string());
    }

    pub fn finish(self) -> (String, Vec<FieldValue>) {
        (self.sql, self.args)
    }
}
