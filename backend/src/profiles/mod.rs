//! Translation profiles - which columns to find, what to call them, how to reconcile
//!
//! Built-in profiles cover the Accounts-Payable and General-Ledger translators.
//! Additional profiles are JSON files stored in a registry directory and loaded at startup.

pub mod builtin;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::api::logs::log_warning;
use crate::error::{ProfileError, ProfileResult};
use crate::transform::normalize::normalize_str;
use crate::validation::validate_profile_json;

/// Directory where user profiles are stored (relative to current dir)
pub const DEFAULT_PROFILE_DIR: &str = ".datatranslator/profiles";

/// A required logical column and the name it takes in the canonical table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnSpec {
    /// Header text to look for (compared trimmed and lowercased)
    pub logical: String,
    /// Column name in the canonical table
    pub canonical: String,
}

impl ColumnSpec {
    pub fn new(logical: impl Into<String>, canonical: impl Into<String>) -> Self {
        Self {
            logical: logical.into(),
            canonical: canonical.into(),
        }
    }
}

/// Required columns of one document type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentProfile {
    pub name: String,
    pub columns: Vec<ColumnSpec>,
}

impl DocumentProfile {
    /// Logical names, normalized, in declared order.
    pub fn required(&self) -> Vec<String> {
        self.columns.iter().map(|c| normalize_str(&c.logical)).collect()
    }

    /// Canonical name for a logical column (the logical name itself if unknown).
    pub fn canonical_for(&self, logical: &str) -> String {
        let logical = normalize_str(logical);
        self.columns
            .iter()
            .find(|c| normalize_str(&c.logical) == logical)
            .map(|c| c.canonical.clone())
            .unwrap_or(logical)
    }

    /// Canonical column names in declared order.
    pub fn canonical_names(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.canonical.clone()).collect()
    }

    fn check(&self, role: &str) -> ProfileResult<()> {
        if self.columns.is_empty() {
            return Err(ProfileError::Invalid(format!(
                "{} document '{}' has no required columns",
                role, self.name
            )));
        }
        let mut logical_seen = Vec::new();
        let mut canonical_seen = Vec::new();
        for col in &self.columns {
            let logical = normalize_str(&col.logical);
            if logical.is_empty() || col.canonical.trim().is_empty() {
                return Err(ProfileError::Invalid(format!(
                    "{} document '{}' has an empty column name",
                    role, self.name
                )));
            }
            if logical_seen.contains(&logical) {
                return Err(ProfileError::Invalid(format!(
                    "{} document '{}' lists '{}' twice",
                    role, self.name, logical
                )));
            }
            if canonical_seen.contains(&col.canonical) {
                return Err(ProfileError::Invalid(format!(
                    "{} document '{}' maps two columns to '{}'",
                    role, self.name, col.canonical
                )));
            }
            logical_seen.push(logical);
            canonical_seen.push(col.canonical.clone());
        }
        Ok(())
    }
}

/// How a numeric value is split when a key maps to several targets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AllocationSpec {
    /// Primary column scaled by the split percentage
    pub value_column: String,
    /// Mapping columns identifying a target (shown when asking for weights)
    pub target_columns: Vec<String>,
}

/// A complete translation: primary document, mapping document, join and output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TranslationProfile {
    pub name: String,

    #[serde(default)]
    pub description: String,

    /// Document being translated
    pub primary: DocumentProfile,

    /// Document holding the key -> target mapping
    pub mapping: DocumentProfile,

    /// Canonical column holding the join key in both documents
    pub key_column: String,

    /// Columns placed first in the joined table, in this order
    #[serde(default)]
    pub leading_columns: Vec<String>,

    /// Final projection; `None` keeps every column
    #[serde(default)]
    pub output_columns: Option<Vec<String>>,

    /// Split rule for one-to-many keys; `None` uses the first mapping row
    #[serde(default)]
    pub allocation: Option<AllocationSpec>,
}

impl TranslationProfile {
    /// Semantic checks the JSON schema cannot express.
    pub fn validate(&self) -> ProfileResult<()> {
        if self.name.trim().is_empty() {
            return Err(ProfileError::Invalid("profile name is empty".to_string()));
        }
        self.primary.check("primary")?;
        self.mapping.check("mapping")?;

        let primary_cols = self.primary.canonical_names();
        let mapping_cols = self.mapping.canonical_names();

        if !primary_cols.contains(&self.key_column) || !mapping_cols.contains(&self.key_column) {
            return Err(ProfileError::Invalid(format!(
                "key column '{}' must be a canonical column of both documents",
                self.key_column
            )));
        }

        let known = |c: &String| primary_cols.contains(c) || mapping_cols.contains(c);
        for col in self.leading_columns.iter().chain(self.output_columns.iter().flatten()) {
            if !known(col) {
                return Err(ProfileError::Invalid(format!("unknown output column '{}'", col)));
            }
        }

        if let Some(ref alloc) = self.allocation {
            if !primary_cols.contains(&alloc.value_column) {
                return Err(ProfileError::Invalid(format!(
                    "allocation value column '{}' is not a primary column",
                    alloc.value_column
                )));
            }
            for col in &alloc.target_columns {
                if !mapping_cols.contains(col) || *col == self.key_column {
                    return Err(ProfileError::Invalid(format!(
                        "allocation target column '{}' is not a mapping column",
                        col
                    )));
                }
            }
        }
        Ok(())
    }

    /// Parse and validate a profile from JSON text.
    pub fn from_json(content: &str) -> ProfileResult<Self> {
        let value: Value = serde_json::from_str(content)?;
        validate_profile_json(&value).map_err(|errs| ProfileError::Invalid(errs.join("; ")))?;
        let profile: TranslationProfile = serde_json::from_value(value)?;
        profile.validate()?;
        Ok(profile)
    }

    pub fn to_json(&self) -> ProfileResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// A registered profile with its origin.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredProfile {
    pub profile: TranslationProfile,
    pub builtin: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
}

/// Registry of built-in and user profiles
pub struct ProfileRegistry {
    /// Directory where user profiles are stored
    registry_dir: PathBuf,
    /// Loaded profiles (name -> profile)
    profiles: BTreeMap<String, StoredProfile>,
}

impl ProfileRegistry {
    /// Create a registry in the default directory
    pub fn new() -> Self {
        Self::with_dir(DEFAULT_PROFILE_DIR)
    }

    /// Create a registry with a custom directory
    pub fn with_dir(dir: impl AsRef<Path>) -> Self {
        let mut registry = Self {
            registry_dir: PathBuf::from(dir.as_ref()),
            profiles: BTreeMap::new(),
        };
        for profile in builtin::all() {
            registry.profiles.insert(
                profile.name.clone(),
                StoredProfile {
                    profile,
                    builtin: true,
                    path: None,
                },
            );
        }
        registry.load_all();
        registry
    }

    /// Load all profiles from the registry directory
    fn load_all(&mut self) {
        if !self.registry_dir.exists() {
            return;
        }

        let entries = match fs::read_dir(&self.registry_dir) {
            Ok(e) => e,
            Err(_) => return,
        };

        for entry in entries.flatten() {
            let path = entry.path();
            if !path.extension().is_some_and(|e| e == "json") {
                continue;
            }
            let loaded = fs::read_to_string(&path)
                .map_err(ProfileError::from)
                .and_then(|content| TranslationProfile::from_json(&content));
            match loaded {
                Ok(profile) if self.is_builtin(&profile.name) => {
                    log_warning(format!(
                        "Ignoring {}: '{}' is a built-in profile",
                        path.display(),
                        profile.name
                    ));
                }
                Ok(profile) => {
                    self.profiles.insert(
                        profile.name.clone(),
                        StoredProfile {
                            profile,
                            builtin: false,
                            path: Some(path),
                        },
                    );
                }
                Err(e) => log_warning(format!("Skipping profile {}: {}", path.display(), e)),
            }
        }
    }

    fn is_builtin(&self, name: &str) -> bool {
        self.profiles.get(name).is_some_and(|p| p.builtin)
    }

    /// Get all profiles, sorted by name
    pub fn list(&self) -> Vec<&StoredProfile> {
        self.profiles.values().collect()
    }

    /// Get a profile by name
    pub fn get(&self, name: &str) -> Option<&TranslationProfile> {
        self.profiles.get(name).map(|p| &p.profile)
    }

    /// Get a profile by name, failing with [`ProfileError::NotFound`]
    pub fn require(&self, name: &str) -> ProfileResult<&TranslationProfile> {
        self.get(name)
            .ok_or_else(|| ProfileError::NotFound(name.to_string()))
    }

    /// Import a profile from a JSON file, optionally renaming it
    pub fn import(&mut self, path: &Path, name: Option<&str>) -> ProfileResult<String> {
        let content = fs::read_to_string(path)?;
        let mut profile = TranslationProfile::from_json(&content)?;
        if let Some(name) = name {
            profile.name = name.to_string();
            profile.validate()?;
        }
        self.save(profile)
    }

    /// Store a profile in the registry directory
    pub fn save(&mut self, profile: TranslationProfile) -> ProfileResult<String> {
        if self.is_builtin(&profile.name) {
            return Err(ProfileError::BuiltIn(profile.name));
        }
        profile.validate()?;

        fs::create_dir_all(&self.registry_dir)?;
        let path = self.registry_dir.join(format!("{}.json", slug(&profile.name)));
        fs::write(&path, profile.to_json()?)?;

        let name = profile.name.clone();
        self.profiles.insert(
            name.clone(),
            StoredProfile {
                profile,
                builtin: false,
                path: Some(path),
            },
        );
        Ok(name)
    }

    /// Delete a user profile
    pub fn delete(&mut self, name: &str) -> ProfileResult<()> {
        if self.is_builtin(name) {
            return Err(ProfileError::BuiltIn(name.to_string()));
        }
        let stored = self
            .profiles
            .remove(name)
            .ok_or_else(|| ProfileError::NotFound(name.to_string()))?;
        if let Some(path) = stored.path {
            fs::remove_file(path)?;
        }
        Ok(())
    }
}

impl Default for ProfileRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// File name for a profile name
fn slug(name: &str) -> String {
    name.to_lowercase()
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { '-' })
        .collect::<String>()
        .split('-')
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("-")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn custom_profile(name: &str) -> TranslationProfile {
        let mut profile = builtin::gl();
        profile.name = name.to_string();
        profile.description = "custom".to_string();
        profile
    }

    #[test]
    fn test_builtins_registered() {
        let dir = tempdir().unwrap();
        let registry = ProfileRegistry::with_dir(dir.path());
        assert!(registry.get("ap").is_some());
        assert!(registry.get("gl").is_some());
        assert!(registry.list().iter().all(|p| p.builtin));
    }

    #[test]
    fn test_save_and_reload() {
        let dir = tempdir().unwrap();
        let mut registry = ProfileRegistry::with_dir(dir.path());
        let name = registry.save(custom_profile("Branch GL")).unwrap();
        assert_eq!(name, "Branch GL");
        assert!(dir.path().join("branch-gl.json").exists());

        let reloaded = ProfileRegistry::with_dir(dir.path());
        let stored = reloaded.require("Branch GL").unwrap();
        assert_eq!(stored.description, "custom");
    }

    #[test]
    fn test_builtin_cannot_be_replaced_or_deleted() {
        let dir = tempdir().unwrap();
        let mut registry = ProfileRegistry::with_dir(dir.path());
        assert!(matches!(
            registry.save(custom_profile("gl")),
            Err(ProfileError::BuiltIn(_))
        ));
        assert!(matches!(registry.delete("ap"), Err(ProfileError::BuiltIn(_))));
    }

    #[test]
    fn test_delete_user_profile() {
        let dir = tempdir().unwrap();
        let mut registry = ProfileRegistry::with_dir(dir.path());
        registry.save(custom_profile("temp")).unwrap();
        registry.delete("temp").unwrap();
        assert!(registry.get("temp").is_none());
        assert!(!dir.path().join("temp.json").exists());
        assert!(matches!(registry.delete("temp"), Err(ProfileError::NotFound(_))));
    }

    #[test]
    fn test_import_with_rename() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("source.json");
        fs::write(&file, custom_profile("original").to_json().unwrap()).unwrap();

        let mut registry = ProfileRegistry::with_dir(dir.path().join("registry"));
        let name = registry.import(&file, Some("renamed")).unwrap();
        assert_eq!(name, "renamed");
        assert!(registry.get("renamed").is_some());
    }

    #[test]
    fn test_invalid_files_skipped() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("broken.json"), "{ not json").unwrap();
        fs::write(dir.path().join("notes.txt"), "ignored").unwrap();
        let registry = ProfileRegistry::with_dir(dir.path());
        assert_eq!(registry.list().len(), builtin::all().len());
    }

    #[test]
    fn test_key_column_must_exist_on_both_sides() {
        let mut profile = custom_profile("bad");
        profile.key_column = "description".to_string();
        assert!(matches!(profile.validate(), Err(ProfileError::Invalid(_))));
    }

    #[test]
    fn test_allocation_target_must_be_mapping_column() {
        let mut profile = custom_profile("bad");
        if let Some(ref mut alloc) = profile.allocation {
            alloc.target_columns.push("balance".to_string());
        }
        assert!(matches!(profile.validate(), Err(ProfileError::Invalid(_))));
    }

    #[test]
    fn test_duplicate_logical_rejected() {
        let mut profile = custom_profile("bad");
        profile.primary.columns.push(ColumnSpec::new(" ACCOUNT ", "acct2"));
        assert!(matches!(profile.validate(), Err(ProfileError::Invalid(_))));
    }

    #[test]
    fn test_canonical_for() {
        let ap = builtin::ap();
        assert_eq!(ap.primary.canonical_for("Invoice Date"), "Invoice Date");
        assert_eq!(ap.mapping.canonical_for("vendor_id"), "VENDOR_ID");
        assert_eq!(ap.primary.canonical_for("unknown"), "unknown");
    }

    #[test]
    fn test_slug() {
        assert_eq!(slug("Branch GL (2024)"), "branch-gl-2024");
    }
}
