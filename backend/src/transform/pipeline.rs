//! High-level pipeline API: two workbooks in, one translated table out.
//!
//! Combines every stage: reading, header location, extraction, key join,
//! split allocation and projection to the profile's output columns.
//!
//! # Example
//!
//! ```rust,ignore
//! use datatranslator::profiles::ProfileRegistry;
//! use datatranslator::transform::{translate_files, ReconcileOptions, WeightMap};
//! use std::path::Path;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let registry = ProfileRegistry::new();
//!     let result = translate_files(
//!         Path::new("gl.xlsx"),
//!         Path::new("gl-map.xlsx"),
//!         registry.require("gl")?,
//!         &WeightMap::new(),
//!         &ReconcileOptions::default(),
//!     )?;
//!
//!     println!("Translated {} rows", result.table.len());
//!     Ok(())
//! }
//! ```

use serde::Serialize;
use std::path::{Path, PathBuf};

use super::allocate::{allocate, split_groups, SplitGroup, WeightMap};
use super::extract::extract_table;
use super::locate::{locate_headers, HeaderMap, DEFAULT_MAX_HEADER_ROWS};
use super::reconcile::join;
use crate::api::logs::{log_error, log_info, log_info_indent, log_success, log_warnings};
use crate::error::{PipelineError, PipelineResult};
use crate::models::{CanonicalTable, RawGrid, Warning};
use crate::parser::{read_grid_bytes, read_grid_file};
use crate::profiles::{DocumentProfile, TranslationProfile, DEFAULT_PROFILE_DIR};

/// Options for the translation pipeline
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReconcileOptions {
    /// Rows scanned for header cells
    pub max_header_rows: usize,

    /// Keep every joined column instead of the profile's output columns
    pub full_output: bool,

    /// Where user profiles live
    pub profile_dir: PathBuf,
}

impl Default for ReconcileOptions {
    fn default() -> Self {
        Self {
            max_header_rows: DEFAULT_MAX_HEADER_ROWS,
            full_output: false,
            profile_dir: PathBuf::from(DEFAULT_PROFILE_DIR),
        }
    }
}

impl ReconcileOptions {
    /// Defaults overridden by `DATATRANSLATOR_MAX_HEADER_ROWS` and
    /// `DATATRANSLATOR_PROFILE_DIR`.
    pub fn from_env() -> Self {
        let mut options = Self::default();
        if let Some(rows) = std::env::var("DATATRANSLATOR_MAX_HEADER_ROWS")
            .ok()
            .and_then(|v| v.trim().parse::<usize>().ok())
            .filter(|&n| n > 0)
        {
            options.max_header_rows = rows;
        }
        if let Ok(dir) = std::env::var("DATATRANSLATOR_PROFILE_DIR") {
            if !dir.trim().is_empty() {
                options.profile_dir = PathBuf::from(dir);
            }
        }
        options
    }
}

/// How one input document was read.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentReport {
    /// Last row holding a header cell (0-based)
    pub header_row: usize,
    pub header_map: HeaderMap,
    /// Data rows kept after blank-row removal
    pub rows: usize,
}

/// Result of a complete translation
#[derive(Debug, Clone, Serialize)]
pub struct TranslationResult {
    pub table: CanonicalTable,
    pub warnings: Vec<Warning>,
    pub primary: DocumentReport,
    pub mapping: DocumentReport,
}

/// Locate the header cells of one document, logging what was found.
pub fn locate_document(
    document: &'static str,
    grid: &RawGrid,
    profile: &DocumentProfile,
    max_rows: usize,
) -> PipelineResult<HeaderMap> {
    match locate_headers(grid, &profile.required(), max_rows) {
        Ok(map) => {
            log_success(format!(
                "{} file: {} header(s) found, last on row {}",
                document,
                map.len(),
                map.last_header_row() + 1
            ));
            for p in map.positions() {
                log_info_indent(format!("{} → row {}, column {}", p.logical, p.row + 1, p.column + 1), 1);
            }
            Ok(map)
        }
        Err(e) => {
            let err = PipelineError::header(document, e);
            log_error(err.to_string());
            Err(err)
        }
    }
}

/// Translate two in-memory grids with `profile`.
///
/// Headers of both documents are located before any data row is read, so a
/// missing column in either file fails the run without partial output.
pub fn translate(
    primary: RawGrid,
    mapping: RawGrid,
    profile: &TranslationProfile,
    weights: &WeightMap,
    options: &ReconcileOptions,
) -> PipelineResult<TranslationResult> {
    log_info(format!("🔎 Locating headers (profile \"{}\")...", profile.name));
    let primary_map = locate_document("primary", &primary, &profile.primary, options.max_header_rows)?;
    let mapping_map = locate_document("mapping", &mapping, &profile.mapping, options.max_header_rows)?;

    log_info("📋 Extracting tables...");
    let primary_table = extract_table(primary, &primary_map, |l| profile.primary.canonical_for(l));
    let mapping_table = extract_table(mapping, &mapping_map, |l| profile.mapping.canonical_for(l));
    log_success(format!(
        "{} primary rows, {} mapping rows",
        primary_table.len(),
        mapping_table.len()
    ));

    let primary_report = DocumentReport {
        header_row: primary_map.last_header_row(),
        rows: primary_table.len(),
        header_map: primary_map,
    };
    let mapping_report = DocumentReport {
        header_row: mapping_map.last_header_row(),
        rows: mapping_table.len(),
        header_map: mapping_map,
    };

    log_info(format!("🔗 Joining on \"{}\"...", profile.key_column));
    let joined = join(
        primary_table,
        mapping_table,
        &profile.key_column,
        &profile.leading_columns,
    )?;

    let (table, warnings) = match &profile.allocation {
        Some(spec) => {
            log_info(format!("➗ Allocating \"{}\" across split targets...", spec.value_column));
            let allocation = allocate(joined, spec, weights)?;
            (allocation.table, allocation.warnings)
        }
        None => joined.into_first_match(),
    };

    let table = match (&profile.output_columns, options.full_output) {
        (Some(columns), false) => table.select(columns)?,
        _ => table,
    };

    log_warnings(&warnings);
    log_success(format!("Translated {} rows", table.len()));

    Ok(TranslationResult {
        table,
        warnings,
        primary: primary_report,
        mapping: mapping_report,
    })
}

/// Translate two workbook files.
pub fn translate_files(
    primary: &Path,
    mapping: &Path,
    profile: &TranslationProfile,
    weights: &WeightMap,
    options: &ReconcileOptions,
) -> PipelineResult<TranslationResult> {
    log_info(format!("📖 Reading {}...", primary.display()));
    let primary = read_grid_file(primary).map_err(|e| PipelineError::sheet("primary", e))?;
    log_info(format!("📖 Reading {}...", mapping.display()));
    let mapping = read_grid_file(mapping).map_err(|e| PipelineError::sheet("mapping", e))?;
    translate(primary, mapping, profile, weights, options)
}

/// Translate two in-memory workbooks.
///
/// Same as [`translate_files`] but accepts raw bytes (uploads).
pub fn translate_bytes(
    primary: &[u8],
    mapping: &[u8],
    profile: &TranslationProfile,
    weights: &WeightMap,
    options: &ReconcileOptions,
) -> PipelineResult<TranslationResult> {
    let primary = read_grid_bytes(primary).map_err(|e| PipelineError::sheet("primary", e))?;
    let mapping = read_grid_bytes(mapping).map_err(|e| PipelineError::sheet("mapping", e))?;
    translate(primary, mapping, profile, weights, options)
}

/// Keys of a mapping document that split into several targets.
///
/// Empty for profiles without allocation.
pub fn mapping_splits(
    mapping: RawGrid,
    profile: &TranslationProfile,
    options: &ReconcileOptions,
) -> PipelineResult<Vec<SplitGroup>> {
    let Some(spec) = &profile.allocation else {
        log_info(format!("Profile \"{}\" does not split values", profile.name));
        return Ok(Vec::new());
    };

    let header_map = locate_document("mapping", &mapping, &profile.mapping, options.max_header_rows)?;
    let table = extract_table(mapping, &header_map, |l| profile.mapping.canonical_for(l));
    let groups = split_groups(&table, &profile.key_column, &spec.target_columns)?;
    log_success(format!("{} key(s) split across several targets", groups.len()));
    Ok(groups)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::HeaderError;
    use crate::models::CellValue;
    use crate::profiles::builtin;

    fn ap_primary() -> RawGrid {
        RawGrid::from_strings(&[
            &["", "", "", "", ""],
            &["", "", "", "", ""],
            &["", "", "", "", ""],
            &["Code", "Invoice#", "", "", ""],
            &["", "", "Invoice Date", "Total Due", "Due Date"],
            &["V01", "1001", "2024-01-05", "250", "2024-02-05"],
            &["", "", "", "", ""],
            &["V02", "1002", "2024-01-06", "90", "2024-02-06"],
        ])
    }

    fn ap_mapping() -> RawGrid {
        RawGrid::from_strings(&[
            &["CODE", "Vendor_ID"],
            &["V01", "VEND-1"],
            &["V02", "VEND-2"],
        ])
    }

    fn gl_primary() -> RawGrid {
        RawGrid::from_strings(&[
            &["General Ledger", "", ""],
            &["Account", "Description", "Current Balance"],
            &["A100", "Sales", "1000"],
            &["B200", "Rent", "10"],
            &["Z999", "Misc", "7"],
        ])
    }

    fn gl_mapping() -> RawGrid {
        RawGrid::from_strings(&[
            &["maestro_account_no", "#old_acct_name", "sage_account_no", "acct_name"],
            &["A100", "Sales old", "4000", "S1"],
            &["B200", "Rent old", "5000", "Solo"],
            &["A100", "Sales old", "4100", "S2"],
        ])
    }

    #[test]
    fn test_default_options() {
        let opts = ReconcileOptions::default();
        assert_eq!(opts.max_header_rows, 50);
        assert!(!opts.full_output);
        assert_eq!(opts.profile_dir, PathBuf::from(DEFAULT_PROFILE_DIR));
    }

    #[test]
    fn test_ap_scattered_headers() {
        let result = translate(
            ap_primary(),
            ap_mapping(),
            &builtin::ap(),
            &WeightMap::new(),
            &ReconcileOptions::default(),
        )
        .unwrap();

        assert_eq!(result.primary.header_row, 4);
        assert_eq!(result.primary.rows, 2);
        assert_eq!(
            result.table.columns(),
            &["VENDOR_ID", "Code", "Invoice#", "Invoice Date", "Total Due", "Due Date"]
                .map(String::from)[..]
        );
        assert_eq!(result.table.len(), 2);
        assert_eq!(result.table.get(0, "VENDOR_ID"), Some(&CellValue::text("VEND-1")));
        assert_eq!(result.table.get(1, "Invoice#"), Some(&CellValue::text("1002")));
        assert!(result.warnings.is_empty());
    }

    #[test]
    fn test_gl_split_and_passthrough() {
        let weights = WeightMap::new().with("A100", 0, 30.0).with("A100", 1, 50.0);
        let result = translate(
            gl_primary(),
            gl_mapping(),
            &builtin::gl(),
            &weights,
            &ReconcileOptions::default(),
        )
        .unwrap();

        let table = &result.table;
        assert_eq!(
            table.columns(),
            &["maestro_account", "sage_account", "sage_account_name", "description", "balance"]
                .map(String::from)[..]
        );
        assert_eq!(table.len(), 4);
        assert_eq!(table.get(0, "sage_account"), Some(&CellValue::text("4000")));
        assert_eq!(table.get(0, "balance"), Some(&CellValue::Number(375.0)));
        assert_eq!(table.get(1, "sage_account_name"), Some(&CellValue::text("S2")));
        assert_eq!(table.get(1, "balance"), Some(&CellValue::Number(625.0)));
        assert_eq!(table.get(2, "sage_account"), Some(&CellValue::text("5000")));
        assert_eq!(table.get(2, "balance"), Some(&CellValue::text("10")));
        assert_eq!(table.get(3, "maestro_account"), Some(&CellValue::text("Z999")));
        assert_eq!(table.get(3, "sage_account"), Some(&CellValue::Empty));

        assert_eq!(
            result.warnings,
            vec![
                Warning::UnmatchedKey { key: "Z999".into(), row: 2 },
                Warning::WeightNormalization { key: "A100".into(), raw_sum: 80.0 },
            ]
        );
    }

    #[test]
    fn test_full_output_keeps_every_column() {
        let options = ReconcileOptions {
            full_output: true,
            ..ReconcileOptions::default()
        };
        let result = translate(gl_primary(), gl_mapping(), &builtin::gl(), &WeightMap::new(), &options)
            .unwrap();
        assert!(result.table.column_index("old_name").is_some());
        assert_eq!(result.table.columns()[0], "maestro_account");
    }

    #[test]
    fn test_missing_mapping_column_reported() {
        let mapping = RawGrid::from_strings(&[
            &["maestro_account_no", "#old_acct_name", "sage_account_no"],
            &["A100", "x", "4000"],
        ]);
        let err = translate(
            gl_primary(),
            mapping,
            &builtin::gl(),
            &WeightMap::new(),
            &ReconcileOptions::default(),
        )
        .unwrap_err();

        match err {
            PipelineError::Header { document, source } => {
                assert_eq!(document, "mapping");
                assert_eq!(
                    source,
                    HeaderError::MissingColumns { missing: vec!["acct_name".into()] }
                );
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_primary_checked_first() {
        let empty = RawGrid::from_strings(&[&["nothing here"]]);
        let err = translate(
            empty.clone(),
            empty,
            &builtin::ap(),
            &WeightMap::new(),
            &ReconcileOptions::default(),
        )
        .unwrap_err();
        assert!(matches!(err, PipelineError::Header { document: "primary", .. }));
    }

    #[test]
    fn test_header_budget_applies() {
        let options = ReconcileOptions {
            max_header_rows: 4,
            ..ReconcileOptions::default()
        };
        let err = translate(ap_primary(), ap_mapping(), &builtin::ap(), &WeightMap::new(), &options)
            .unwrap_err();
        assert!(err.to_string().contains("invoice date"));
    }

    #[test]
    fn test_invalid_weights_abort() {
        let weights = WeightMap::new().with("A100", 0, 0.0).with("A100", 1, 0.0);
        let err = translate(
            gl_primary(),
            gl_mapping(),
            &builtin::gl(),
            &weights,
            &ReconcileOptions::default(),
        )
        .unwrap_err();
        assert!(matches!(err, PipelineError::Allocation(_)));
        assert!(err.to_string().contains("A100"));
    }

    #[test]
    fn test_mapping_splits() {
        let groups = mapping_splits(gl_mapping(), &builtin::gl(), &ReconcileOptions::default()).unwrap();
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].key, "A100");

        let none = mapping_splits(ap_mapping(), &builtin::ap(), &ReconcileOptions::default()).unwrap();
        assert!(none.is_empty());
    }

    #[test]
    fn test_translate_bytes_reports_document() {
        let err = translate_bytes(
            b"not a workbook",
            b"",
            &builtin::ap(),
            &WeightMap::new(),
            &ReconcileOptions::default(),
        )
        .unwrap_err();
        assert!(matches!(err, PipelineError::Sheet { document: "primary", .. }));
    }
}
