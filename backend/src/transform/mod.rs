//! Transformation module.
//!
//! Raw grid to translated table, one stage per module:
//! - Normalize: header and join key normalization
//! - Locate: scattered header detection
//! - Extract: canonical tables below the header
//! - Reconcile: left join on the key column
//! - Allocate: percentage splits for one-to-many keys
//! - Pipeline: all of the above behind one call

pub mod allocate;
pub mod extract;
pub mod locate;
pub mod normalize;
pub mod pipeline;
pub mod reconcile;

pub use allocate::{allocate, resolve_weights, split_groups, Allocation, SplitGroup, SplitTarget, WeightMap};
pub use extract::{extract_table, rename_plan};
pub use locate::{locate_headers, HeaderMap, HeaderPosition, DEFAULT_MAX_HEADER_ROWS};
pub use pipeline::*;
pub use reconcile::{join, JoinedTable};
