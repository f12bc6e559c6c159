//! Split allocation for one-to-many keys.
//!
//! When a key maps to N target rows, every primary row with that key becomes
//! N rows, one per target in mapping order, with the value column scaled by
//! the target's share:
//!
//! ```text
//! weights   30, 50        (raw sum 80, reported)
//! shares    37.5, 62.5    (w * 100 / sum)
//! balance   1000       →  375.0 | 625.0
//! ```
//!
//! Weights come from a [`WeightMap`] supplied per run; targets without an
//! explicit weight get `100 / N`.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::{BTreeMap, HashMap};

use super::normalize::join_key;
use super::reconcile::JoinedTable;
use crate::error::{AllocationError, AllocationResult, TableError};
use crate::models::{CanonicalTable, CellValue, Warning};
use crate::profiles::AllocationSpec;
use crate::validation::validate_weights_json;

/// Tolerance when checking that raw weights sum to 100.
const SUM_TOLERANCE: f64 = 1e-6;

// =============================================================================
// Weight Map
// =============================================================================

/// Split percentages: key -> target index -> percentage.
///
/// Keys are compared in join form (stringified, trimmed).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WeightMap {
    weights: BTreeMap<String, BTreeMap<usize, f64>>,
}

impl WeightMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the percentage of target `index` under `key`.
    pub fn set(&mut self, key: &str, index: usize, percentage: f64) {
        self.weights
            .entry(key.trim().to_string())
            .or_default()
            .insert(index, percentage);
    }

    /// Builder form of [`set`](Self::set).
    pub fn with(mut self, key: &str, index: usize, percentage: f64) -> Self {
        self.set(key, index, percentage);
        self
    }

    pub fn get(&self, key: &str, index: usize) -> Option<f64> {
        self.weights.get(key.trim()).and_then(|w| w.get(&index)).copied()
    }

    pub fn is_empty(&self) -> bool {
        self.weights.is_empty()
    }

    /// Parse and validate a weight document: `{ "A100": { "0": 30, "1": 50 } }`.
    pub fn from_json_str(content: &str) -> AllocationResult<Self> {
        let value: Value = serde_json::from_str(content)
            .map_err(|e| AllocationError::InvalidWeights(e.to_string()))?;
        Self::from_json(value)
    }

    /// Validate and convert an already parsed weight document.
    pub fn from_json(value: Value) -> AllocationResult<Self> {
        validate_weights_json(&value)
            .map_err(|errs| AllocationError::InvalidWeights(errs.join("; ")))?;
        let parsed: WeightMap = serde_json::from_value(value)
            .map_err(|e| AllocationError::InvalidWeights(e.to_string()))?;

        // Re-key through `set` so keys are trimmed like join keys.
        let mut map = WeightMap::new();
        for (key, targets) in parsed.weights {
            for (index, pct) in targets {
                map.set(&key, index, pct);
            }
        }
        Ok(map)
    }

    /// Equal-split template for every split group.
    pub fn defaults_for(groups: &[SplitGroup]) -> Self {
        let mut map = WeightMap::new();
        for group in groups {
            for target in &group.targets {
                map.set(&group.key, target.index, target.default_weight);
            }
        }
        map
    }

    fn indices(&self, key: &str) -> impl Iterator<Item = usize> + '_ {
        self.weights
            .get(key.trim())
            .into_iter()
            .flat_map(|w| w.keys().copied())
    }
}

// =============================================================================
// Split Groups
// =============================================================================

/// One target row of a split key.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SplitTarget {
    /// Position among the key's mapping rows
    pub index: usize,
    /// Target columns of the mapping row
    pub values: Map<String, Value>,
    /// `100 / N`
    pub default_weight: f64,
}

/// A key with more than one mapping row.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SplitGroup {
    pub key: String,
    pub targets: Vec<SplitTarget>,
}

/// Keys of `mapping` with more than one row, in order of first appearance.
///
/// This is what an external caller needs to ask for weights.
pub fn split_groups(
    mapping: &CanonicalTable,
    key_column: &str,
    target_columns: &[String],
) -> Result<Vec<SplitGroup>, TableError> {
    let key_idx = mapping.require_column(key_column)?;
    let target_idx = target_columns
        .iter()
        .map(|c| mapping.require_column(c))
        .collect::<Result<Vec<_>, _>>()?;

    let mut order: Vec<String> = Vec::new();
    let mut rows_by_key: HashMap<String, Vec<usize>> = HashMap::new();
    for (i, row) in mapping.rows().iter().enumerate() {
        let key = join_key(&row[key_idx]);
        if key.is_empty() {
            continue;
        }
        let rows = rows_by_key.entry(key.clone()).or_default();
        if rows.is_empty() {
            order.push(key);
        }
        rows.push(i);
    }

    let groups = order
        .into_iter()
        .filter_map(|key| {
            let rows = rows_by_key.remove(&key)?;
            if rows.len() < 2 {
                return None;
            }
            let default_weight = 100.0 / rows.len() as f64;
            let targets = rows
                .iter()
                .enumerate()
                .map(|(index, &r)| SplitTarget {
                    index,
                    values: target_columns
                        .iter()
                        .zip(&target_idx)
                        .map(|(name, &c)| (name.clone(), mapping.rows()[r][c].to_json()))
                        .collect(),
                    default_weight,
                })
                .collect();
            Some(SplitGroup { key, targets })
        })
        .collect();

    Ok(groups)
}

// =============================================================================
// Weight Resolution
// =============================================================================

/// Shares of a key with `targets` targets, summing to 100.
///
/// Returns a [`Warning::WeightNormalization`] when the raw weights do not sum to 100.
pub fn resolve_weights(
    key: &str,
    targets: usize,
    weights: &WeightMap,
) -> AllocationResult<(Vec<f64>, Option<Warning>)> {
    if let Some(index) = weights.indices(key).find(|&i| i >= targets) {
        return Err(AllocationError::UnknownTarget {
            key: key.to_string(),
            index,
            targets,
        });
    }

    let default_weight = 100.0 / targets as f64;
    let raw = (0..targets)
        .map(|i| {
            let w = weights.get(key, i).unwrap_or(default_weight);
            if w.is_finite() && (0.0..=100.0).contains(&w) {
                Ok(w)
            } else {
                Err(AllocationError::WeightOutOfRange {
                    key: key.to_string(),
                    index: i,
                    value: w,
                })
            }
        })
        .collect::<AllocationResult<Vec<f64>>>()?;

    let sum: f64 = raw.iter().sum();
    if sum <= 0.0 {
        return Err(AllocationError::ZeroWeightTotal {
            key: key.to_string(),
        });
    }

    let warning = ((sum - 100.0).abs() > SUM_TOLERANCE).then(|| Warning::WeightNormalization {
        key: key.to_string(),
        raw_sum: sum,
    });

    Ok((raw.iter().map(|w| w * 100.0 / sum).collect(), warning))
}

// =============================================================================
// Allocation
// =============================================================================

/// Output of [`allocate`].
#[derive(Debug, Clone)]
pub struct Allocation {
    pub table: CanonicalTable,
    pub warnings: Vec<Warning>,
}

/// Fan out rows whose key has several targets and scale their value.
///
/// Rows with one match or none pass through unchanged. Every mapping column
/// carried by the join is overwritten from the target row on fan-out rows.
pub fn allocate(
    joined: JoinedTable,
    spec: &AllocationSpec,
    weights: &WeightMap,
) -> AllocationResult<Allocation> {
    let value_col = joined
        .table
        .column_index(&spec.value_column)
        .ok_or_else(|| AllocationError::MissingColumn(spec.value_column.clone()))?;

    let mut warnings = joined.unmatched_warnings();
    let mut shares: HashMap<String, Vec<f64>> = HashMap::new();

    let JoinedTable {
        table,
        keys,
        matches,
        carried,
        mapping,
    } = joined;
    let (columns, rows) = table.into_parts();
    let mut out = CanonicalTable::new(columns);

    for ((row, key), matched) in rows.into_iter().zip(keys).zip(matches) {
        if matched.len() < 2 {
            out.push_row(row);
            continue;
        }

        if !shares.contains_key(&key) {
            let (resolved, warning) = resolve_weights(&key, matched.len(), weights)?;
            warnings.extend(warning);
            shares.insert(key.clone(), resolved);
        }
        let key_shares = &shares[&key];

        let value = &row[value_col];
        let amount = if value.is_blank() {
            None
        } else {
            Some(value.as_f64().ok_or_else(|| AllocationError::NonNumericValue {
                key: key.clone(),
                value: value.to_string(),
            })?)
        };

        for (&target, &share) in matched.iter().zip(key_shares) {
            let mut split = row.clone();
            let source = &mapping.rows()[target];
            for &(from, to) in &carried {
                split[to] = source[from].clone();
            }
            if let Some(amount) = amount {
                split[value_col] = CellValue::Number(amount * share / 100.0);
            }
            out.push_row(split);
        }
    }

    Ok(Allocation {
        table: out,
        warnings,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transform::reconcile::join;

    fn cols(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    fn spec() -> AllocationSpec {
        AllocationSpec {
            value_column: "balance".into(),
            target_columns: cols(&["sage_account", "sage_account_name"]),
        }
    }

    fn gl(rows: Vec<Vec<CellValue>>) -> CanonicalTable {
        CanonicalTable::with_rows(cols(&["maestro_account", "description", "balance"]), rows)
    }

    fn map() -> CanonicalTable {
        CanonicalTable::with_rows(
            cols(&["maestro_account", "sage_account", "sage_account_name"]),
            vec![
                vec!["A100".into(), "4000".into(), "S1".into()],
                vec!["B200".into(), "5000".into(), "Solo".into()],
                vec!["A100".into(), "4100".into(), "S2".into()],
            ],
        )
    }

    fn run(primary: CanonicalTable, weights: &WeightMap) -> AllocationResult<Allocation> {
        let joined = join(primary, map(), "maestro_account", &[]).unwrap();
        allocate(joined, &spec(), weights)
    }

    fn balances(table: &CanonicalTable) -> Vec<CellValue> {
        (0..table.len())
            .map(|r| table.get(r, "balance").cloned().unwrap_or_default())
            .collect()
    }

    #[test]
    fn test_equal_split_by_default() {
        let primary = gl(vec![vec!["A100".into(), "Sales".into(), 1000.0.into()]]);
        let result = run(primary, &WeightMap::new()).unwrap();

        assert_eq!(result.table.len(), 2);
        assert_eq!(balances(&result.table), vec![CellValue::Number(500.0), CellValue::Number(500.0)]);
        assert_eq!(result.table.get(0, "sage_account_name"), Some(&CellValue::text("S1")));
        assert_eq!(result.table.get(1, "sage_account_name"), Some(&CellValue::text("S2")));
        assert!(result.warnings.is_empty());
    }

    #[test]
    fn test_user_weights_renormalized_with_warning() {
        let primary = gl(vec![vec!["A100".into(), "Sales".into(), 1000.0.into()]]);
        let weights = WeightMap::new().with("A100", 0, 30.0).with("A100", 1, 50.0);
        let result = run(primary, &weights).unwrap();

        assert_eq!(balances(&result.table), vec![CellValue::Number(375.0), CellValue::Number(625.0)]);
        assert_eq!(
            result.warnings,
            vec![Warning::WeightNormalization { key: "A100".into(), raw_sum: 80.0 }]
        );
    }

    #[test]
    fn test_single_match_and_unmatched_pass_through() {
        let primary = gl(vec![
            vec!["B200".into(), "Rent".into(), 10.0.into()],
            vec!["Z999".into(), "Misc".into(), 7.0.into()],
        ]);
        let result = run(primary, &WeightMap::new()).unwrap();

        assert_eq!(result.table.len(), 2);
        assert_eq!(balances(&result.table), vec![CellValue::Number(10.0), CellValue::Number(7.0)]);
        assert_eq!(result.table.get(0, "sage_account"), Some(&CellValue::text("5000")));
        assert_eq!(result.table.get(1, "sage_account"), Some(&CellValue::Empty));
        assert_eq!(
            result.warnings,
            vec![Warning::UnmatchedKey { key: "Z999".into(), row: 1 }]
        );
    }

    #[test]
    fn test_warning_reported_once_per_key() {
        let primary = gl(vec![
            vec!["A100".into(), "Jan".into(), 100.0.into()],
            vec!["A100".into(), "Feb".into(), 200.0.into()],
        ]);
        let weights = WeightMap::new().with("A100", 0, 10.0);
        let result = run(primary, &weights).unwrap();

        assert_eq!(result.table.len(), 4);
        assert_eq!(result.warnings.len(), 1);
        assert_eq!(result.table.get(2, "description"), Some(&CellValue::text("Feb")));
    }

    #[test]
    fn test_scaled_values_sum_to_original() {
        for w in [[1.0, 2.0, 3.0], [33.3, 33.3, 33.3], [0.0, 0.0, 5.0], [100.0, 100.0, 100.0]] {
            let (shares, _) = resolve_weights(
                "K",
                3,
                &WeightMap::new().with("K", 0, w[0]).with("K", 1, w[1]).with("K", 2, w[2]),
            )
            .unwrap();
            let total: f64 = shares.iter().sum();
            assert!((total - 100.0).abs() < 1e-9);

            let value = 1234.56;
            let scaled: f64 = shares.iter().map(|s| value * s / 100.0).sum();
            assert!((scaled - value).abs() < 1e-9);
        }
    }

    #[test]
    fn test_default_thirds_do_not_warn() {
        let (shares, warning) = resolve_weights("K", 3, &WeightMap::new()).unwrap();
        assert!(warning.is_none());
        assert!((shares[0] - 100.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_zero_total_is_error() {
        let weights = WeightMap::new().with("A100", 0, 0.0).with("A100", 1, 0.0);
        assert_eq!(
            resolve_weights("A100", 2, &weights).unwrap_err(),
            AllocationError::ZeroWeightTotal { key: "A100".into() }
        );
    }

    #[test]
    fn test_out_of_range_and_unknown_target() {
        let weights = WeightMap::new().with("A100", 0, 120.0);
        assert!(matches!(
            resolve_weights("A100", 2, &weights),
            Err(AllocationError::WeightOutOfRange { index: 0, .. })
        ));

        let weights = WeightMap::new().with("A100", 5, 10.0);
        assert!(matches!(
            resolve_weights("A100", 2, &weights),
            Err(AllocationError::UnknownTarget { index: 5, targets: 2, .. })
        ));
    }

    #[test]
    fn test_text_amount_parsed_and_garbage_rejected() {
        let primary = gl(vec![vec!["A100".into(), "x".into(), " 80 ".into()]]);
        let result = run(primary, &WeightMap::new()).unwrap();
        assert_eq!(balances(&result.table), vec![CellValue::Number(40.0), CellValue::Number(40.0)]);

        let primary = gl(vec![vec!["A100".into(), "x".into(), "n/a".into()]]);
        assert_eq!(
            run(primary, &WeightMap::new()).unwrap_err(),
            AllocationError::NonNumericValue { key: "A100".into(), value: "n/a".into() }
        );
    }

    #[test]
    fn test_blank_amount_stays_blank() {
        let primary = gl(vec![vec!["A100".into(), "x".into(), CellValue::Empty]]);
        let result = run(primary, &WeightMap::new()).unwrap();
        assert_eq!(balances(&result.table), vec![CellValue::Empty, CellValue::Empty]);
    }

    #[test]
    fn test_split_groups_in_mapping_order() {
        let groups = split_groups(&map(), "maestro_account", &spec().target_columns).unwrap();
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].key, "A100");
        assert_eq!(groups[0].targets.len(), 2);
        assert_eq!(groups[0].targets[1].values["sage_account_name"], "S2");
        assert_eq!(groups[0].targets[0].default_weight, 50.0);

        let template = WeightMap::defaults_for(&groups);
        assert_eq!(template.get("A100", 1), Some(50.0));
    }

    #[test]
    fn test_weights_from_json() {
        let weights = WeightMap::from_json_str(r#"{ " A100 ": { "0": 30, "1": 50 } }"#).unwrap();
        assert_eq!(weights.get("A100", 0), Some(30.0));
        assert_eq!(weights.get("A100", 1), Some(50.0));

        assert!(matches!(
            WeightMap::from_json_str(r#"{ "A100": [30, 50] }"#),
            Err(AllocationError::InvalidWeights(_))
        ));
    }

    #[test]
    fn test_missing_value_column() {
        let joined = join(gl(vec![]), map(), "maestro_account", &[]).unwrap();
        let spec = AllocationSpec {
            value_column: "amount".into(),
            target_columns: vec![],
        };
        assert_eq!(
            allocate(joined, &spec, &WeightMap::new()).unwrap_err(),
            AllocationError::MissingColumn("amount".into())
        );
    }
}
