//! Treatment-name normalizer.
//!
//! Produces the comparable key form used on both sides of a lookup:
//! - lowercase
//! - only letters, digits, whitespace and `-` survive
//! - whitespace runs collapse to one space, ends trimmed

/// Normalize a raw name into a lookup key.
///
/// Pure and idempotent. Empty input yields an empty key.
pub fn normalize(raw: &str) -> String {
    let lowered = raw.to_lowercase();
    let kept: String = lowered
        .chars()
        .filter(|c| c.is_alphanumeric() || c.is_whitespace() || *c == '-')
        .collect();
    collapse_whitespace(&kept)
}

/// Normalize an optional cell, treating `None` as empty.
pub fn normalize_opt(raw: Option<&str>) -> String {
    raw.map(normalize).unwrap_or_default()
}

/// Collapse whitespace runs to a single space and trim.
pub fn collapse_whitespace(raw: &str) -> String {
    raw.split_whitespace().collect::<Vec<_>>().join(" ")
}
