//! Canonical table extraction.
//!
//! Two separate phases:
//! 1. [`rename_plan`] turns the positional [`HeaderMap`] into `(index, canonical name)` pairs
//! 2. [`extract_table`] applies the plan to the grid, drops header rows and blank rows

use super::locate::HeaderMap;
use crate::models::{CanonicalTable, RawGrid};

/// Name given to grid columns that are not part of the header map.
pub fn unlabeled_column(index: usize) -> String {
    format!("column_{}", index)
}

/// Column layout of an extracted table: `(grid index, canonical name)`.
///
/// Required columns come first in declared order, the rest follow in grid order.
pub fn rename_plan<F>(width: usize, header_map: &HeaderMap, canonical: F) -> Vec<(usize, String)>
where
    F: Fn(&str) -> String,
{
    let mut plan: Vec<(usize, String)> = header_map
        .positions()
        .iter()
        .map(|p| (p.column, canonical(&p.logical)))
        .collect();

    for idx in 0..width {
        if !plan.iter().any(|(col, _)| *col == idx) {
            plan.push((idx, unlabeled_column(idx)));
        }
    }
    plan
}

/// Slice the data below the header and name its columns.
///
/// Rows at or above [`HeaderMap::last_header_row`] are dropped, then every row
/// blank in all required columns. A row with one required value is kept.
pub fn extract_table<F>(grid: RawGrid, header_map: &HeaderMap, canonical: F) -> CanonicalTable
where
    F: Fn(&str) -> String,
{
    let plan = rename_plan(grid.width(), header_map, canonical);
    let required: Vec<usize> = header_map.positions().iter().map(|p| p.column).collect();
    let first_data_row = header_map.last_header_row() + 1;

    let columns = plan.iter().map(|(_, name)| name.clone()).collect();
    let mut table = CanonicalTable::new(columns);

    for row in grid.into_rows().into_iter().skip(first_data_row) {
        if required.iter().all(|&c| row[c].is_blank()) {
            continue;
        }
        // Two logical names may share a grid column on different header rows.
        let values = plan.iter().map(|(idx, _)| row[*idx].clone()).collect();
        table.push_row(values);
    }

    table
}
