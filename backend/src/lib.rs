//! # Datatranslator - scattered-header detection and key reconciliation
//!
//! Datatranslator reads accounting exports (Accounts-Payable detail, General-Ledger
//! balances) whose header cells are scattered over several rows, joins them with a
//! mapping workbook on a key column and, when one key maps to several targets,
//! splits the amounts by percentage.
//!
//! ## Architecture
//!
//! ```text
//! ┌───────────┐   ┌──────────┐   ┌──────────┐   ┌───────────┐   ┌────────────┐
//! │ Workbooks │──▶│  Parser  │──▶│  Locate  │──▶│ Reconcile │──▶│  Allocate  │──▶ JSON records
//! │  (.xlsx)  │   │(calamine)│   │ +Extract │   │ (left join│   │  (splits)  │
//! └───────────┘   └──────────┘   └──────────┘   └───────────┘   └────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use datatranslator::{translate_files, ProfileRegistry, ReconcileOptions, WeightMap};
//! use std::path::Path;
//!
//! let registry = ProfileRegistry::new();
//! let weights = WeightMap::new().with("A100", 0, 30.0).with("A100", 1, 70.0);
//! let result = translate_files(
//!     Path::new("gl.xlsx"),
//!     Path::new("gl-map.xlsx"),
//!     registry.require("gl")?,
//!     &weights,
//!     &ReconcileOptions::default(),
//! )?;
//! println!("Translated {} rows", result.table.len());
//! ```
//!
//! ## Modules
//!
//! - [`error`] - Error types per stage
//! - [`models`] - Cells, raw grids, canonical tables, warnings
//! - [`parser`] - Workbook reading
//! - [`transform`] - Header location, extraction, join, allocation and pipeline
//! - [`profiles`] - Built-in and user translation profiles
//! - [`validation`] - JSON schema checks for profiles and weights
//! - [`api`] - HTTP API server and log streaming

// Core modules
pub mod error;
pub mod models;

// Parsing
pub mod parser;

// Transformation
pub mod transform;

// Profiles
pub mod profiles;

// Validation
pub mod validation;

// HTTP API
pub mod api;

// =============================================================================
// Re-exports - Error types
// =============================================================================

pub use error::{
    AllocationError,
    HeaderError,
    PipelineError,
    ProfileError,
    ReconcileError,
    ServerError,
    SheetError,
    TableError,
};

// =============================================================================
// Re-exports - Models
// =============================================================================

pub use models::{CanonicalTable, CellValue, RawGrid, Warning};

// =============================================================================
// Re-exports - Parsing
// =============================================================================

pub use parser::{read_grid_bytes, read_grid_file};

// =============================================================================
// Re-exports - Transformation
// =============================================================================

pub use transform::{
    allocate,
    extract_table,
    join,
    locate_headers,
    resolve_weights,
    split_groups,
    HeaderMap,
    SplitGroup,
    WeightMap,
};

// =============================================================================
// Re-exports - Pipeline
// =============================================================================

pub use transform::pipeline::{
    locate_document,
    mapping_splits,
    translate,
    translate_bytes,
    translate_files,
    DocumentReport,
    ReconcileOptions,
    TranslationResult,
};

// =============================================================================
// Re-exports - Profiles
// =============================================================================

pub use profiles::{ProfileRegistry, StoredProfile, TranslationProfile};

// =============================================================================
// Re-exports - Validation
// =============================================================================

pub use validation::{is_valid, validate, validate_profile_json, validate_weights_json};

// =============================================================================
// Re-exports - API
// =============================================================================

pub use api::types::{error_response, ProfileSummary, SplitsResponse, TranslateResponse};

// Server
pub mod server {
    pub use crate::api::server::start_server;
}
