//! Error types for the translation pipeline.
//!
//! One enum per stage, mirroring the pipeline order:
//!
//! - [`SheetError`] - workbook reading and decoding
//! - [`HeaderError`] - header location (missing required columns)
//! - [`TableError`] - canonical table access
//! - [`ReconcileError`] - key join
//! - [`AllocationError`] - weight validation and fan-out
//! - [`ProfileError`] - profile registry
//! - [`PipelineError`] - top-level orchestration
//! - [`ServerError`] - HTTP surface
//!
//! Error conversion is automatic via `From` implementations,
//! allowing `?` to work across error boundaries.

use thiserror::Error;

// =============================================================================
// Sheet Errors
// =============================================================================

/// Errors while reading a workbook into a raw grid.
#[derive(Debug, Error)]
pub enum SheetError {
    /// Failed to read file.
    #[error("Failed to read file: {0}")]
    Io(#[from] std::io::Error),

    /// The bytes could not be decoded as a workbook.
    #[error("Failed to decode workbook: {0}")]
    Workbook(String),

    /// The workbook has no worksheet.
    #[error("Workbook contains no worksheet")]
    NoWorksheet,
}

// =============================================================================
// Header Errors
// =============================================================================

/// Errors while locating header cells.
#[derive(Debug, Error, PartialEq)]
pub enum HeaderError {
    /// The document profile declares no required column.
    #[error("No required columns configured")]
    NoRequiredColumns,

    /// Required logical columns were not found within the scan budget.
    #[error("Missing required columns: {}", .missing.join(", "))]
    MissingColumns { missing: Vec<String> },
}

// =============================================================================
// Table Errors
// =============================================================================

/// Errors when addressing canonical table columns.
#[derive(Debug, Error, PartialEq)]
pub enum TableError {
    /// Column is not part of the table.
    #[error("Unknown column: {0}")]
    UnknownColumn(String),
}

// =============================================================================
// Reconcile Errors
// =============================================================================

/// Errors during the key join.
#[derive(Debug, Error, PartialEq)]
pub enum ReconcileError {
    /// The join key is missing from one side.
    #[error("Key column '{column}' not found in {side} table")]
    MissingKeyColumn { side: &'static str, column: String },
}

// =============================================================================
// Allocation Errors
// =============================================================================

/// Errors during weight validation and split allocation.
#[derive(Debug, Error, PartialEq)]
pub enum AllocationError {
    /// A column the allocation needs is missing from the joined table.
    #[error("Allocation column not found: {0}")]
    MissingColumn(String),

    /// A weight is negative, above 100 or not finite.
    #[error("Weight {value} for key '{key}' target {index} is outside 0-100")]
    WeightOutOfRange { key: String, index: usize, value: f64 },

    /// A weight refers to a target the key does not have.
    #[error("Key '{key}' has {targets} targets, no target at index {index}")]
    UnknownTarget {
        key: String,
        index: usize,
        targets: usize,
    },

    /// All weights of a key are zero.
    #[error("Weights for key '{key}' sum to zero")]
    ZeroWeightTotal { key: String },

    /// The value to split is not a number.
    #[error("Value '{value}' for key '{key}' is not numeric")]
    NonNumericValue { key: String, value: String },

    /// Weight document could not be parsed.
    #[error("Invalid weights: {0}")]
    InvalidWeights(String),
}

// =============================================================================
// Profile Errors
// =============================================================================

/// Errors from the profile registry.
#[derive(Debug, Error)]
pub enum ProfileError {
    /// Profile not found.
    #[error("Profile not found: {0}")]
    NotFound(String),

    /// Profile failed schema or semantic validation.
    #[error("Invalid profile: {0}")]
    Invalid(String),

    /// Built-in profiles cannot be replaced or removed.
    #[error("Profile '{0}' is built in")]
    BuiltIn(String),

    /// IO error.
    #[error("Profile IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error.
    #[error("Profile JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

// =============================================================================
// Pipeline Errors (top-level)
// =============================================================================

/// Top-level pipeline orchestration errors.
///
/// This is the error type returned by [`crate::transform::pipeline::translate`].
/// Document-level failures carry which input (`primary` or `mapping`) failed.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Reading a document failed.
    #[error("{document} file: {source}")]
    Sheet {
        document: &'static str,
        #[source]
        source: SheetError,
    },

    /// Header location failed.
    #[error("{document} file is missing required columns: {}", missing_of(.source))]
    Header {
        document: &'static str,
        #[source]
        source: HeaderError,
    },

    /// Table error.
    #[error("Table error: {0}")]
    Table(#[from] TableError),

    /// Join error.
    #[error("Reconcile error: {0}")]
    Reconcile(#[from] ReconcileError),

    /// Allocation error.
    #[error("Allocation error: {0}")]
    Allocation(#[from] AllocationError),

    /// Profile error.
    #[error("Profile error: {0}")]
    Profile(#[from] ProfileError),
}

fn missing_of(err: &HeaderError) -> String {
    match err {
        HeaderError::MissingColumns { missing } => missing.join(", "),
        HeaderError::NoRequiredColumns => "(none configured)".to_string(),
    }
}

impl PipelineError {
    pub fn sheet(document: &'static str, source: SheetError) -> Self {
        Self::Sheet { document, source }
    }

    pub fn header(document: &'static str, source: HeaderError) -> Self {
        Self::Header { document, source }
    }
}

// =============================================================================
// Server Errors
// =============================================================================

/// HTTP server errors.
#[derive(Debug, Error)]
pub enum ServerError {
    /// Pipeline error.
    #[error("{0}")]
    Pipeline(#[from] PipelineError),

    /// Invalid request.
    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// Server internal error.
    #[error("Internal server error: {0}")]
    Internal(String),
}

// =============================================================================
// Result Type Aliases
// =============================================================================

/// Result type for sheet reading.
pub type SheetResult<T> = Result<T, SheetError>;

/// Result type for allocation.
pub type AllocationResult<T> = Result<T, AllocationError>;

/// Result type for registry operations.
pub type ProfileResult<T> = Result<T, ProfileError>;

/// Result type for pipeline operations.
pub type PipelineResult<T> = Result<T, PipelineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_columns_message_names_columns() {
        let err = HeaderError::MissingColumns {
            missing: vec!["invoice date".into(), "due date".into()],
        };
        assert_eq!(err.to_string(), "Missing required columns: invoice date, due date");
    }

    #[test]
    fn test_pipeline_error_names_document() {
        let err = PipelineError::header(
            "primary",
            HeaderError::MissingColumns {
                missing: vec!["code".into()],
            },
        );
        let msg = err.to_string();
        assert!(msg.contains("primary"));
        assert!(msg.contains("code"));
    }

    #[test]
    fn test_error_conversion_chain() {
        let alloc = AllocationError::ZeroWeightTotal { key: "A100".into() };
        let pipeline_err: PipelineError = alloc.into();
        assert!(pipeline_err.to_string().contains("A100"));

        let server_err: ServerError = pipeline_err.into();
        assert!(server_err.to_string().contains("A100"));
    }
}
