//! Domain models for the translation pipeline.
//!
//! This module contains the core data structures passed between stages:
//!
//! - [`CellValue`] - A single spreadsheet cell (empty, number, text, bool)
//! - [`RawGrid`] - Untyped grid read from a worksheet, no schema
//! - [`CanonicalTable`] - Rows below the detected header, with canonical column names
//! - [`Warning`] - Non-fatal anomalies reported alongside a result

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

use crate::error::TableError;

// =============================================================================
// Cell Value
// =============================================================================

/// Value of a single cell.
///
/// Serialized untagged: `null`, number, string or bool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(untagged)]
pub enum CellValue {
    #[default]
    Empty,
    Bool(bool),
    Number(f64),
    Text(String),
}

impl CellValue {
    /// Build a text cell.
    pub fn text(s: impl Into<String>) -> Self {
        CellValue::Text(s.into())
    }

    /// True for empty cells and whitespace-only text.
    pub fn is_blank(&self) -> bool {
        match self {
            CellValue::Empty => true,
            CellValue::Text(s) => s.trim().is_empty(),
            _ => false,
        }
    }

    /// Numeric view: numbers, and text that parses as a plain number.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            CellValue::Number(n) => Some(*n),
            CellValue::Text(s) => s.trim().parse::<f64>().ok(),
            _ => None,
        }
    }

    /// Convert to a JSON value for record output.
    pub fn to_json(&self) -> Value {
        match self {
            CellValue::Empty => Value::Null,
            CellValue::Bool(b) => Value::Bool(*b),
            CellValue::Number(n) => serde_json::Number::from_f64(*n)
                .map(Value::Number)
                .unwrap_or(Value::Null),
            CellValue::Text(s) => Value::String(s.clone()),
        }
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Empty => Ok(()),
            CellValue::Bool(b) => write!(f, "{}", b),
            CellValue::Number(n) => {
                if !n.is_finite() {
                    Ok(())
                } else if n.fract() == 0.0 && n.abs() < 1e15 {
                    write!(f, "{:.0}", n)
                } else {
                    write!(f, "{}", n)
                }
            }
            CellValue::Text(s) => f.write_str(s),
        }
    }
}

impl From<&str> for CellValue {
    fn from(s: &str) -> Self {
        CellValue::Text(s.to_string())
    }
}

impl From<f64> for CellValue {
    fn from(n: f64) -> Self {
        CellValue::Number(n)
    }
}

// =============================================================================
// Raw Grid
// =============================================================================

/// Untyped worksheet content, addressed by absolute (row, column).
///
/// Every row has the same width; short rows are padded with [`CellValue::Empty`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawGrid {
    rows: Vec<Vec<CellValue>>,
    width: usize,
}

impl RawGrid {
    /// Build a grid, padding rows to the widest one.
    pub fn new(mut rows: Vec<Vec<CellValue>>) -> Self {
        let width = rows.iter().map(Vec::len).max().unwrap_or(0);
        for row in &mut rows {
            row.resize(width, CellValue::Empty);
        }
        Self { rows, width }
    }

    /// Build a grid from string literals; `""` becomes an empty cell.
    pub fn from_strings(rows: &[&[&str]]) -> Self {
        Self::new(
            rows.iter()
                .map(|row| {
                    row.iter()
                        .map(|s| {
                            if s.is_empty() {
                                CellValue::Empty
                            } else {
                                CellValue::text(*s)
                            }
                        })
                        .collect()
                })
                .collect(),
        )
    }

    pub fn height(&self) -> usize {
        self.rows.len()
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn rows(&self) -> &[Vec<CellValue>] {
        &self.rows
    }

    pub fn cell(&self, row: usize, col: usize) -> Option<&CellValue> {
        self.rows.get(row).and_then(|r| r.get(col))
    }

    /// Consume the grid, returning its rows.
    pub fn into_rows(self) -> Vec<Vec<CellValue>> {
        self.rows
    }
}

// =============================================================================
// Canonical Table
// =============================================================================

/// A row-oriented table with resolved column names.
///
/// Each row holds one value per column, in column order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CanonicalTable {
    columns: Vec<String>,
    rows: Vec<Vec<CellValue>>,
}

impl CanonicalTable {
    /// Create an empty table with the given columns.
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    /// Create a table from columns and rows; rows are padded or truncated to fit.
    pub fn with_rows(columns: Vec<String>, rows: Vec<Vec<CellValue>>) -> Self {
        let mut table = Self::new(columns);
        for row in rows {
            table.push_row(row);
        }
        table
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<CellValue>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn push_row(&mut self, mut row: Vec<CellValue>) {
        row.resize(self.columns.len(), CellValue::Empty);
        self.rows.push(row);
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Like [`column_index`](Self::column_index) but fails with [`TableError::UnknownColumn`].
    pub fn require_column(&self, name: &str) -> Result<usize, TableError> {
        self.column_index(name)
            .ok_or_else(|| TableError::UnknownColumn(name.to_string()))
    }

    /// Value at `row` in column `name`.
    pub fn get(&self, row: usize, name: &str) -> Option<&CellValue> {
        let col = self.column_index(name)?;
        self.rows.get(row).and_then(|r| r.get(col))
    }

    /// Keep only `columns`, in that order.
    pub fn select(&self, columns: &[String]) -> Result<CanonicalTable, TableError> {
        let indices = columns
            .iter()
            .map(|c| self.require_column(c))
            .collect::<Result<Vec<_>, _>>()?;

        let rows = self
            .rows
            .iter()
            .map(|row| indices.iter().map(|&i| row[i].clone()).collect())
            .collect();

        Ok(CanonicalTable {
            columns: columns.to_vec(),
            rows,
        })
    }

    /// Rows as JSON objects, keys in column order.
    pub fn to_records(&self) -> Vec<Value> {
        self.rows
            .iter()
            .map(|row| {
                let obj: Map<String, Value> = self
                    .columns
                    .iter()
                    .zip(row)
                    .map(|(c, v)| (c.clone(), v.to_json()))
                    .collect();
                Value::Object(obj)
            })
            .collect()
    }

    pub fn into_parts(self) -> (Vec<String>, Vec<Vec<CellValue>>) {
        (self.columns, self.rows)
    }
}

// =============================================================================
// Warnings
// =============================================================================

/// Non-fatal anomaly found while reconciling.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Warning {
    /// A primary row's key has no mapping row; it passes through with empty targets.
    #[serde(rename_all = "camelCase")]
    UnmatchedKey { key: String, row: usize },

    /// Weights for a split key did not sum to 100 and were renormalized.
    #[serde(rename_all = "camelCase")]
    WeightNormalization { key: String, raw_sum: f64 },

    /// A key has several mapping rows but the profile does not allocate; the first one was used.
    #[serde(rename_all = "camelCase")]
    DuplicateMapping { key: String, matches: usize },
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Warning::UnmatchedKey { key, row } => {
                write!(f, "Row {}: key '{}' has no mapping", row, key)
            }
            Warning::WeightNormalization { key, raw_sum } => write!(
                f,
                "Splits for '{}' sum to {}%, normalized to 100%",
                key, raw_sum
            ),
            Warning::DuplicateMapping { key, matches } => write!(
                f,
                "Key '{}' has {} mapping rows, using the first",
                key, matches
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_grid_rows_padded() {
        let grid = RawGrid::from_strings(&[&["a"], &["b", "c", "d"]]);
        assert_eq!(grid.width(), 3);
        assert_eq!(grid.cell(0, 2), Some(&CellValue::Empty));
        assert_eq!(grid.cell(1, 2), Some(&CellValue::text("d")));
    }

    #[test]
    fn test_number_display_drops_integral_fraction() {
        assert_eq!(CellValue::Number(100.0).to_string(), "100");
        assert_eq!(CellValue::Number(12.5).to_string(), "12.5");
        assert_eq!(CellValue::Number(f64::NAN).to_string(), "");
    }

    #[test]
    fn test_blank_detection() {
        assert!(CellValue::Empty.is_blank());
        assert!(CellValue::text("   ").is_blank());
        assert!(!CellValue::Number(0.0).is_blank());
        assert!(!CellValue::text("x").is_blank());
    }

    #[test]
    fn test_records_keep_column_order() {
        let table = CanonicalTable::with_rows(
            vec!["z".into(), "a".into()],
            vec![vec![CellValue::Number(1.0), CellValue::text("x")]],
        );
        let records = table.to_records();
        let keys: Vec<&String> = records[0].as_object().unwrap().keys().collect();
        assert_eq!(keys, vec!["z", "a"]);
        assert_eq!(records[0], json!({ "z": 1.0, "a": "x" }));
    }

    #[test]
    fn test_select_unknown_column() {
        let table = CanonicalTable::new(vec!["a".into()]);
        let err = table.select(&["b".to_string()]).unwrap_err();
        assert_eq!(err, TableError::UnknownColumn("b".into()));
    }

    #[test]
    fn test_warning_serialization() {
        let w = Warning::WeightNormalization {
            key: "A100".into(),
            raw_sum: 80.0,
        };
        assert_eq!(
            serde_json::to_value(&w).unwrap(),
            json!({ "type": "weightNormalization", "key": "A100", "rawSum": 80.0 })
        );
    }
}
