//! JSON Schema validation for user-supplied documents.
//!
//! Profiles and weight maps arrive as JSON (files, CLI, multipart fields).
//! Their shape is checked against schemas embedded at compile time from
//! `schemas/` before deserialization, so errors point at the document rather
//! than at a serde type:
//! - `translation-profile.json`
//! - `weights.json`
//!
//! # Example
//!
//! ```rust,ignore
//! use serde_json::json;
//! use datatranslator::validation::validate_weights_json;
//!
//! assert!(validate_weights_json(&json!({ "A100": { "0": 30, "1": 70 } })).is_ok());
//! assert!(validate_weights_json(&json!({ "A100": [30, 70] })).is_err());
//! ```

use serde_json::Value;

const PROFILE_SCHEMA: &str = include_str!("../../schemas/translation-profile.json");
const WEIGHTS_SCHEMA: &str = include_str!("../../schemas/weights.json");

/// Validate a JSON value against a JSON schema (draft 7).
///
/// # Returns
/// * `Ok(())` if valid
/// * `Err(Vec<String>)` with one message per violation
pub fn validate(schema: &Value, data: &Value) -> Result<(), Vec<String>> {
    let validator = jsonschema::draft7::new(schema)
        .map_err(|e| vec![format!("Invalid schema: {}", e)])?;

    let errors: Vec<String> = validator
        .iter_errors(data)
        .map(|e| e.to_string())
        .collect();

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Quick true/false check.
pub fn is_valid(schema: &Value, data: &Value) -> bool {
    jsonschema::draft7::is_valid(schema, data)
}

fn validate_embedded(schema: &str, data: &Value) -> Result<(), Vec<String>> {
    let schema: Value = serde_json::from_str(schema)
        .map_err(|e| vec![format!("Invalid embedded schema: {}", e)])?;
    validate(&schema, data)
}

/// Validate a translation profile document.
pub fn validate_profile_json(data: &Value) -> Result<(), Vec<String>> {
    validate_embedded(PROFILE_SCHEMA, data)
}

/// Validate a weight map document (`{ key: { index: percentage } }`).
pub fn validate_weights_json(data: &Value) -> Result<(), Vec<String>> {
    validate_embedded(WEIGHTS_SCHEMA, data)
}
