//! Left join of a primary table with a mapping table on a normalized key.
//!
//! Every primary row appears exactly once in the joined table, carrying the
//! columns of its first matching mapping row (or empty cells). All matches are
//! kept alongside so the split allocator can fan rows out afterwards.

use std::collections::HashMap;

use super::normalize::join_key;
use crate::error::ReconcileError;
use crate::models::{CanonicalTable, CellValue, Warning};

/// Result of [`join`]: the joined rows plus what allocation needs to revisit them.
#[derive(Debug, Clone)]
pub struct JoinedTable {
    pub(crate) table: CanonicalTable,
    /// Normalized key of every joined row
    pub(crate) keys: Vec<String>,
    /// Mapping row indices matching every joined row, in mapping order
    pub(crate) matches: Vec<Vec<usize>>,
    /// `(mapping column, joined column)` for every column carried from the mapping table
    pub(crate) carried: Vec<(usize, usize)>,
    pub(crate) mapping: CanonicalTable,
}

impl JoinedTable {
    pub fn table(&self) -> &CanonicalTable {
        &self.table
    }

    pub fn mapping(&self) -> &CanonicalTable {
        &self.mapping
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    /// Mapping rows matched by joined row `row`.
    pub fn matches(&self, row: usize) -> &[usize] {
        self.matches.get(row).map(Vec::as_slice).unwrap_or(&[])
    }

    /// One warning per primary row without a mapping row.
    pub fn unmatched_warnings(&self) -> Vec<Warning> {
        self.matches
            .iter()
            .enumerate()
            .filter(|(_, m)| m.is_empty())
            .map(|(row, _)| Warning::UnmatchedKey {
                key: self.keys[row].clone(),
                row,
            })
            .collect()
    }

    /// Keep the first match for every row, without allocation.
    ///
    /// Keys with several mapping rows are reported once each.
    pub fn into_first_match(self) -> (CanonicalTable, Vec<Warning>) {
        let mut warnings = self.unmatched_warnings();
        let mut reported: Vec<&str> = Vec::new();
        for (row, m) in self.matches.iter().enumerate() {
            let key = self.keys[row].as_str();
            if m.len() > 1 && !reported.contains(&key) {
                reported.push(key);
                warnings.push(Warning::DuplicateMapping {
                    key: key.to_string(),
                    matches: m.len(),
                });
            }
        }
        (self.table, warnings)
    }
}

/// Left-join `primary` with `mapping` on `key_column`.
///
/// Keys compare after stringify + trim, so `4010` and `" 4010"` match; blank keys
/// never match. Non-blank key cells are written back in that text form. Output columns: `leading` first (those that exist, in that order),
/// then the remaining primary columns, then the remaining mapping columns. A
/// mapping column whose name is already taken gets a `_mapping` suffix.
pub fn join(
    primary: CanonicalTable,
    mapping: CanonicalTable,
    key_column: &str,
    leading: &[String],
) -> Result<JoinedTable, ReconcileError> {
    let pk = primary
        .column_index(key_column)
        .ok_or_else(|| ReconcileError::MissingKeyColumn {
            side: "primary",
            column: key_column.to_string(),
        })?;
    let mk = mapping
        .column_index(key_column)
        .ok_or_else(|| ReconcileError::MissingKeyColumn {
            side: "mapping",
            column: key_column.to_string(),
        })?;

    let mut index: HashMap<String, Vec<usize>> = HashMap::new();
    for (i, row) in mapping.rows().iter().enumerate() {
        let key = join_key(&row[mk]);
        if !key.is_empty() {
            index.entry(key).or_default().push(i);
        }
    }

    // Arrival order: primary columns, then mapping columns other than the key.
    let mut arrival: Vec<String> = primary.columns().to_vec();
    let mut mapping_cols: Vec<usize> = Vec::new();
    for (i, name) in mapping.columns().iter().enumerate() {
        if i == mk {
            continue;
        }
        let mut unique = name.clone();
        while arrival.contains(&unique) {
            unique = format!("{}_mapping", unique);
        }
        arrival.push(unique);
        mapping_cols.push(i);
    }

    let order = column_order(&arrival, leading);
    let columns: Vec<String> = order.iter().map(|&i| arrival[i].clone()).collect();

    // Joined position of every arrival column.
    let mut position = vec![0; arrival.len()];
    for (out, &arr) in order.iter().enumerate() {
        position[arr] = out;
    }
    let primary_width = primary.columns().len();
    let carried: Vec<(usize, usize)> = mapping_cols
        .iter()
        .enumerate()
        .map(|(n, &mc)| (mc, position[primary_width + n]))
        .collect();

    let mut table = CanonicalTable::new(columns);
    let mut keys = Vec::with_capacity(primary.len());
    let mut matches = Vec::with_capacity(primary.len());

    let (_, primary_rows) = primary.into_parts();
    for row in primary_rows {
        let key = join_key(&row[pk]);
        let matched = if key.is_empty() {
            Vec::new()
        } else {
            index.get(&key).cloned().unwrap_or_default()
        };

        let mut values: Vec<CellValue> = row;
        if !key.is_empty() {
            values[pk] = CellValue::Text(key.clone());
        }
        match matched.first() {
            Some(&m) => {
                let source = &mapping.rows()[m];
                values.extend(mapping_cols.iter().map(|&c| source[c].clone()));
            }
            None => values.extend(mapping_cols.iter().map(|_| CellValue::Empty)),
        }

        let mut arranged = vec![CellValue::Empty; values.len()];
        for (arr, value) in values.into_iter().enumerate() {
            arranged[position[arr]] = value;
        }
        table.push_row(arranged);
        keys.push(key);
        matches.push(matched);
    }

    Ok(JoinedTable {
        table,
        keys,
        matches,
        carried,
        mapping,
    })
}

/// Indices of `arrival` with `leading` names first, the rest in arrival order.
fn column_order(arrival: &[String], leading: &[String]) -> Vec<usize> {
    let mut order: Vec<usize> = Vec::with_capacity(arrival.len());
    for name in leading {
        if let Some(i) = arrival.iter().position(|c| c == name) {
            if !order.contains(&i) {
                order.push(i);
            }
        }
    }
    for i in 0..arrival.len() {
        if !order.contains(&i) {
            order.push(i);
        }
    }
    order
}
