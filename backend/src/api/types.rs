//! REST API types.
//!
//! Translated tables are returned as JSON records keyed by canonical column
//! name, in output column order.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::models::Warning;
use crate::profiles::StoredProfile;
use crate::transform::allocate::{SplitGroup, WeightMap};
use crate::transform::pipeline::{DocumentReport, TranslationResult};

/// Response sent after a translation.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TranslateResponse {
    /// Unique job identifier
    pub job_id: String,

    /// Status: "ready" or "warning"
    pub status: String,

    /// Profile used
    pub profile: String,

    /// Output column order
    pub columns: Vec<String>,

    /// One JSON object per output row
    pub records: Vec<Value>,

    pub warnings: Vec<Warning>,

    pub metadata: TranslateMetadata,
}

/// How the two documents were read.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TranslateMetadata {
    pub total_rows: usize,
    pub primary: DocumentReport,
    pub mapping: DocumentReport,
}

impl TranslateResponse {
    pub fn new(profile: &str, result: TranslationResult) -> Self {
        let records = result.table.to_records();
        TranslateResponse {
            job_id: Uuid::new_v4().to_string(),
            status: if result.warnings.is_empty() { "ready" } else { "warning" }.to_string(),
            profile: profile.to_string(),
            columns: result.table.columns().to_vec(),
            metadata: TranslateMetadata {
                total_rows: records.len(),
                primary: result.primary,
                mapping: result.mapping,
            },
            records,
            warnings: result.warnings,
        }
    }
}

/// Split keys of a mapping document, with an equal-split weight template.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SplitsResponse {
    pub job_id: String,
    pub profile: String,
    pub splits: Vec<SplitGroup>,
    /// Ready to edit and send back as the `weights` field
    pub template: WeightMap,
}

impl SplitsResponse {
    pub fn new(profile: &str, splits: Vec<SplitGroup>) -> Self {
        SplitsResponse {
            job_id: Uuid::new_v4().to_string(),
            profile: profile.to_string(),
            template: WeightMap::defaults_for(&splits),
            splits,
        }
    }
}

/// One entry of `GET /api/profiles`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileSummary {
    pub name: String,
    pub description: String,
    pub builtin: bool,
    pub key_column: String,
    pub splits: bool,
}

impl From<&StoredProfile> for ProfileSummary {
    fn from(stored: &StoredProfile) -> Self {
        ProfileSummary {
            name: stored.profile.name.clone(),
            description: stored.profile.description.clone(),
            builtin: stored.builtin,
            key_column: stored.profile.key_column.clone(),
            splits: stored.profile.allocation.is_some(),
        }
    }
}

/// Create an error response
pub fn error_response(error: &str) -> Value {
    json!({
        "jobId": Uuid::new_v4().to_string(),
        "status": "error",
        "error": error,
        "records": [],
        "warnings": []
    })
}
