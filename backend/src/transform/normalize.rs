//! Cell normalization.
//!
//! Total functions: every cell maps to some string, unconvertible input maps to `""`.

use crate::models::CellValue;

/// Comparable form of a header cell: stringified, trimmed, lowercased.
pub fn header_key(value: &CellValue) -> String {
    normalize_str(&value.to_string())
}

/// Same as [`header_key`] for a plain string (logical column names).
pub fn normalize_str(s: &str) -> String {
    s.trim().to_lowercase()
}

/// Comparable form of a join key: stringified and trimmed, case kept.
pub fn join_key(value: &CellValue) -> String {
    value.to_string().trim().to_string()
}

/// Title-case a logical name: `"invoice date"` -> `"Invoice Date"`.
///
/// A letter is capitalized when it follows a non-letter, so `"invoice#"` -> `"Invoice#"`.
pub fn display_name(logical: &str) -> String {
    let mut out = String::with_capacity(logical.len());
    let mut prev_alpha = false;
    for ch in logical.chars() {
        if ch.is_alphabetic() {
            if prev_alpha {
                out.extend(ch.to_lowercase());
            } else {
                out.extend(ch.to_uppercase());
            }
            prev_alpha = true;
        } else {
            out.push(ch);
            prev_alpha = false;
        }
    }
    out
}
