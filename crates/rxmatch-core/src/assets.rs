//! Embedded data assets.
//!
//! Curated tables ship inside the binary with `include_str!()` so a bare
//! install works without any data directory. Both can be replaced at runtime
//! by pointing the configuration at a file with the same columns.

/// Colloquial / abbreviated name → standard ingredient name.
///
/// Columns: `alias,canonical`
pub const CORE_SYNONYMS: &str = include_str!("../data/core_synonyms.csv");

/// Curated brand identifier → generic identifier collapses.
///
/// Columns: `source_id,target_id,label`
pub const BRAND_GENERIC_MAPPINGS: &str = include_str!("../data/brand_generic_mappings.csv");
