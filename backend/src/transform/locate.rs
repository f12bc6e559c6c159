//! Scattered header detection.
//!
//! Required logical columns may sit on different rows and at any position.
//! The scan walks rows top to bottom and cells left to right, keeping the
//! first occurrence of every logical name, and stops as soon as all of them
//! have been seen.
//!
//! ```text
//! row 0 │              │            │              │
//! row 3 │ Code         │ Invoice#   │              │  ← code, invoice#
//! row 4 │              │            │ Total Due    │  ← total due (last header row)
//! row 5 │ V01          │ 1001       │ 250.00       │  ← data starts here
//! ```

use serde::Serialize;
use std::collections::HashMap;

use super::normalize::{header_key, normalize_str};
use crate::error::HeaderError;
use crate::models::RawGrid;

/// Default number of rows scanned for header cells.
pub const DEFAULT_MAX_HEADER_ROWS: usize = 50;

/// Where a logical column was found.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HeaderPosition {
    pub logical: String,
    pub row: usize,
    pub column: usize,
}

/// Position of every required logical column, in declared order.
///
/// Only built by [`locate_headers`], which guarantees one entry per required name.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HeaderMap {
    positions: Vec<HeaderPosition>,
    last_header_row: usize,
}

impl HeaderMap {
    pub fn positions(&self) -> &[HeaderPosition] {
        &self.positions
    }

    /// Row of the last discovered header cell; data starts below it.
    pub fn last_header_row(&self) -> usize {
        self.last_header_row
    }

    /// Column index of a logical name.
    pub fn column_of(&self, logical: &str) -> Option<usize> {
        let logical = normalize_str(logical);
        self.positions
            .iter()
            .find(|p| p.logical == logical)
            .map(|p| p.column)
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }
}

/// Locate every `required` logical column within the first `max_rows` rows.
///
/// Fails with [`HeaderError::MissingColumns`] naming the columns not found,
/// in declared order. No data row is looked at beyond the scan budget.
pub fn locate_headers(
    grid: &RawGrid,
    required: &[String],
    max_rows: usize,
) -> Result<HeaderMap, HeaderError> {
    let mut names: Vec<String> = Vec::with_capacity(required.len());
    for name in required {
        let name = normalize_str(name);
        if !name.is_empty() && !names.contains(&name) {
            names.push(name);
        }
    }
    if names.is_empty() {
        return Err(HeaderError::NoRequiredColumns);
    }

    let lookup: HashMap<&str, usize> = names
        .iter()
        .enumerate()
        .map(|(i, n)| (n.as_str(), i))
        .collect();

    let mut found: Vec<Option<(usize, usize)>> = vec![None; names.len()];
    let mut remaining = names.len();
    let mut last_header_row = 0;

    'rows: for (row_idx, row) in grid.rows().iter().take(max_rows).enumerate() {
        for (col_idx, cell) in row.iter().enumerate() {
            let key = header_key(cell);
            if key.is_empty() {
                continue;
            }
            if let Some(&slot) = lookup.get(key.as_str()) {
                if found[slot].is_none() {
                    found[slot] = Some((row_idx, col_idx));
                    last_header_row = row_idx;
                    remaining -= 1;
                    if remaining == 0 {
                        break 'rows;
                    }
                }
            }
        }
    }

    let missing: Vec<String> = names
        .iter()
        .zip(&found)
        .filter(|(_, pos)| pos.is_none())
        .map(|(name, _)| name.clone())
        .collect();

    if !missing.is_empty() {
        return Err(HeaderError::MissingColumns { missing });
    }

    let positions = names
        .iter()
        .zip(found)
        .filter_map(|(logical, pos)| {
            pos.map(|(row, column)| HeaderPosition {
                logical: logical.clone(),
                row,
                column,
            })
        })
        .collect();

    Ok(HeaderMap {
        positions,
        last_header_row,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_headers_on_one_row() {
        let grid = RawGrid::from_strings(&[
            &["Report", "", ""],
            &["Account", " Description ", "CURRENT BALANCE"],
            &["4010", "Rent", "100"],
        ]);
        let map = locate_headers(&grid, &names(&["account", "description", "current balance"]), 50)
            .unwrap();
        assert_eq!(map.last_header_row(), 1);
        assert_eq!(map.column_of("account"), Some(0));
        assert_eq!(map.column_of("current balance"), Some(2));
    }

    #[test]
    fn test_scattered_headers_last_row_wins() {
        let grid = RawGrid::from_strings(&[
            &["", "", ""],
            &["Code", "", ""],
            &["", "", "Total Due"],
            &["", "Invoice#", ""],
            &["V1", "9", "10"],
        ]);
        let map = locate_headers(&grid, &names(&["code", "invoice#", "total due"]), 50).unwrap();
        assert_eq!(map.last_header_row(), 3);
        assert_eq!(map.column_of("invoice#"), Some(1));
        assert_eq!(map.positions()[2].row, 2);
    }

    #[test]
    fn test_first_occurrence_wins() {
        let grid = RawGrid::from_strings(&[
            &["", "code", "code"],
            &["code", "", "description"],
        ]);
        let map = locate_headers(&grid, &names(&["code", "description"]), 50).unwrap();
        assert_eq!(map.column_of("code"), Some(1));
        assert_eq!(map.positions()[0].row, 0);
        assert_eq!(map.last_header_row(), 1);
    }

    #[test]
    fn test_short_circuit_ignores_later_rows() {
        let grid = RawGrid::from_strings(&[
            &["account", "description"],
            &["description", "account"],
        ]);
        let map = locate_headers(&grid, &names(&["account", "description"]), 50).unwrap();
        assert_eq!(map.last_header_row(), 0);
        assert_eq!(map.column_of("description"), Some(1));
    }

    #[test]
    fn test_missing_columns_named_exactly() {
        let grid = RawGrid::from_strings(&[&["Code", "Due Date"], &["x", "y"]]);
        let err = locate_headers(
            &grid,
            &names(&["code", "invoice#", "invoice date", "due date"]),
            50,
        )
        .unwrap_err();
        assert_eq!(
            err,
            HeaderError::MissingColumns {
                missing: names(&["invoice#", "invoice date"])
            }
        );
    }

    #[test]
    fn test_row_budget_respected() {
        let mut rows: Vec<Vec<crate::models::CellValue>> = vec![vec![]; 5];
        rows.push(vec!["account".into()]);
        let grid = RawGrid::new(rows);

        let err = locate_headers(&grid, &names(&["account"]), 5).unwrap_err();
        assert!(matches!(err, HeaderError::MissingColumns { .. }));
        assert!(locate_headers(&grid, &names(&["account"]), 6).is_ok());
    }

    #[test]
    fn test_numeric_header_cell_matches() {
        let grid = RawGrid::new(vec![vec![
            crate::models::CellValue::Number(2024.0),
            "label".into(),
        ]]);
        let map = locate_headers(&grid, &names(&["2024", "label"]), 50).unwrap();
        assert_eq!(map.column_of("2024"), Some(0));
    }

    #[test]
    fn test_empty_required_set() {
        let grid = RawGrid::from_strings(&[&["a"]]);
        assert_eq!(
            locate_headers(&grid, &[], 50).unwrap_err(),
            HeaderError::NoRequiredColumns
        );
    }

    #[test]
    fn test_empty_grid_reports_everything_missing() {
        let err = locate_headers(&RawGrid::default(), &names(&["code"]), 50).unwrap_err();
        assert_eq!(err, HeaderError::MissingColumns { missing: names(&["code"]) });
    }
}
