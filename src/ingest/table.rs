//! Raw tabular input and its schema configuration.

use crate::error::{DemandError, Result};
use std::io::Read;
use std::path::Path;

/// Column names to look for in the uploaded table. Names are configuration,
/// not protocol; these defaults match the reference data layout.
#[derive(Debug, Clone)]
pub struct ColumnConfig {
    /// Date-like column.
    pub date: String,
    /// Quantity column. Values may contain currency symbols or thousands
    /// separators; sanitization strips them.
    pub quantity: String,
    /// Optional entity (item) label column, required only for per-entity flows.
    pub entity: String,
}

impl Default for ColumnConfig {
    fn default() -> Self {
        Self {
            date: "Date".to_string(),
            quantity: "Amount".to_string(),
            entity: "Item Name".to_string(),
        }
    }
}

/// An uploaded table held as strings, exactly as received. All typing and
/// cleaning happens in the sanitizer so that bad cells can be handled
/// per-row instead of failing the whole parse.
#[derive(Debug, Clone)]
pub struct RawTable {
    header: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl RawTable {
    pub fn new(header: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        Self { header, rows }
    }

    /// Read a table from CSV.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .flexible(true)
            .from_reader(reader);
        let header = csv_reader
            .headers()
            .map_err(|e| DemandError::Validation(format!("unreadable header: {e}")))?
            .iter()
            .map(str::to_string)
            .collect();
        let mut rows = Vec::new();
        for record in csv_reader.records() {
            let record =
                record.map_err(|e| DemandError::Validation(format!("unreadable row: {e}")))?;
            rows.push(record.iter().map(str::to_string).collect());
        }
        Ok(Self { header, rows })
    }

    pub fn from_csv_path(path: impl AsRef<Path>) -> Result<Self> {
        let file = std::fs::File::open(path.as_ref())
            .map_err(|e| DemandError::Validation(format!("cannot open input file: {e}")))?;
        Self::from_reader(file)
    }

    pub fn header(&self) -> &[String] {
        &self.header
    }

    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Index of a named column, or a `MissingColumn` error naming exactly
    /// which required field is absent.
    pub fn column_index(&self, name: &str) -> Result<usize> {
        self.header
            .iter()
            .position(|h| h == name)
            .ok_or_else(|| DemandError::MissingColumn(name.to_string()))
    }

    /// Cell at (row, column); out-of-range cells read as empty, which the
    /// sanitizer handles by policy.
    pub fn cell(&self, row: usize, col: usize) -> &str {
        self.rows
            .get(row)
            .and_then(|r| r.get(col))
            .map(String::as_str)
            .unwrap_or("")
    }
}
