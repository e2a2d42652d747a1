//! Row/column addressable raw table.

use serde::{Deserialize, Serialize};

/// An unmodified source table. Cells keep their JSON type; a cell is *missing*
/// when it is null, absent from a short row, or an empty string.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawTable {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<serde_json::Value>>,
}

impl RawTable {
    pub fn new(columns: Vec<String>, rows: Vec<Vec<serde_json::Value>>) -> Self {
        Self { columns, rows }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Cell at `(row, col)`, `None` for ragged rows.
    pub fn cell(&self, row: usize, col: usize) -> Option<&serde_json::Value> {
        self.rows.get(row).and_then(|r| r.get(col))
    }

    /// Whether any column of `row` is missing.
    pub fn row_has_missing(&self, row: &[serde_json::Value]) -> bool {
        (0..self.columns.len()).any(|i| is_missing(row.get(i)))
    }
}

/// Null, absent and empty-string cells all count as missing.
pub fn is_missing(cell: Option<&serde_json::Value>) -> bool {
    match cell {
        None | Some(serde_json::Value::Null) => true,
        Some(serde_json::Value::String(s)) => s.is_empty(),
        Some(_) => false,
    }
}

/// Text form of a cell; strings are taken verbatim, other values use their JSON text.
pub fn cell_text(cell: Option<&serde_json::Value>) -> Option<String> {
    if is_missing(cell) {
        return None;
    }
    match cell? {
        serde_json::Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}
