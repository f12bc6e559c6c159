//! Built-in translation profiles.

use super::{AllocationSpec, ColumnSpec, DocumentProfile, TranslationProfile};
use crate::transform::normalize::display_name;

/// Accounts-Payable detail columns, presented title-cased.
const AP_COLUMNS: [&str; 5] = ["code", "invoice#", "invoice date", "total due", "due date"];

/// Accounts-Payable: invoice detail joined with a vendor code -> vendor id mapping.
pub fn ap() -> TranslationProfile {
    let primary = DocumentProfile {
        name: "ap-detail".to_string(),
        columns: AP_COLUMNS
            .iter()
            .map(|c| ColumnSpec::new(*c, display_name(c)))
            .collect(),
    };

    let mapping = DocumentProfile {
        name: "vendor-map".to_string(),
        columns: vec![
            ColumnSpec::new("code", "Code"),
            ColumnSpec::new("vendor_id", "VENDOR_ID"),
        ],
    };

    let mut output = vec!["VENDOR_ID".to_string()];
    output.extend(primary.canonical_names());

    TranslationProfile {
        name: "ap".to_string(),
        description: "Accounts-Payable detail with vendor ids".to_string(),
        primary,
        mapping,
        key_column: "Code".to_string(),
        leading_columns: output.clone(),
        output_columns: Some(output),
        allocation: None,
    }
}

/// General-Ledger: balances moved from source accounts to target accounts,
/// split by percentage when one source account maps to several targets.
pub fn gl() -> TranslationProfile {
    let primary = DocumentProfile {
        name: "gl".to_string(),
        columns: vec![
            ColumnSpec::new("account", "maestro_account"),
            ColumnSpec::new("description", "description"),
            ColumnSpec::new("current balance", "balance"),
        ],
    };

    let mapping = DocumentProfile {
        name: "gl-map".to_string(),
        columns: vec![
            ColumnSpec::new("maestro_account_no", "maestro_account"),
            ColumnSpec::new("#old_acct_name", "old_name"),
            ColumnSpec::new("sage_account_no", "sage_account"),
            ColumnSpec::new("acct_name", "sage_account_name"),
        ],
    };

    let output: Vec<String> = [
        "maestro_account",
        "sage_account",
        "sage_account_name",
        "description",
        "balance",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect();

    TranslationProfile {
        name: "gl".to_string(),
        description: "General-Ledger account translation with balance splits".to_string(),
        primary,
        mapping,
        key_column: "maestro_account".to_string(),
        leading_columns: output.clone(),
        output_columns: Some(output),
        allocation: Some(AllocationSpec {
            value_column: "balance".to_string(),
            target_columns: vec!["sage_account".to_string(), "sage_account_name".to_string()],
        }),
    }
}

/// Every built-in profile.
pub fn all() -> Vec<TranslationProfile> {
    vec![ap(), gl()]
}
