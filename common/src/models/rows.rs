//! Extracted row sets.
//!
//! Every source driver materialises a result as column names plus rows of
//! JSON scalars, so the runner and loaders never depend on a driver's row type.

use serde_json::{Map, Value};

/// One extracted row keyed by column name.
pub type OrderRecord = Map<String, Value>;

/// Fully materialised query result.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RowSet {
    /// Column names in result order.
    pub columns: Vec<String>,
    /// Row data (each row is a vector of JSON values, one per column).
    pub rows: Vec<Vec<Value>>,
}

impl RowSet {
    /// Creates an empty result with the given columns.
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Appends a row. Short rows are padded with nulls, long rows truncated.
    pub fn push(&mut self, mut row: Vec<Value>) {
        row.resize(self.columns.len(), Value::Null);
        self.rows.push(row);
    }

    /// Finds a column by name, ignoring ASCII case.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns
            .iter()
            .position(|c| c.eq_ignore_ascii_case(name))
    }

    /// Returns row `index` as a column-keyed record.
    pub fn record(&self, index: usize) -> Option<OrderRecord> {
        self.rows.get(index).map(|row| {
            self.columns
                .iter()
                .cloned()
                .zip(row.iter().cloned())
                .collect()
        })
    }

    /// Lowercases every column name.
    pub fn with_lowercase_columns(mut self) -> Self {
        for column in &mut self.columns {
            *column = column.to_lowercase();
        }
        self
    }
}

/// Renders a scalar as text for text-typed destination columns.
pub fn value_to_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}
