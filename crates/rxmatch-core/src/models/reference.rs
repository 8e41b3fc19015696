//! Reference dictionary models.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Term type (or supplement class) attached to a reference record.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum TermType {
    /// RxNorm `IN`
    Ingredient,
    /// RxNorm `BN`
    BrandName,
    /// RxNorm `PT`
    PreferredTerm,
    /// RxNorm `SY`
    Synonym,
    /// RxNorm `PIN`
    PreciseIngredient,
    /// Anything else, kept verbatim (supplement classes land here)
    Other(String),
}

impl TermType {
    /// Parse a term-type code. Unknown codes are kept as `Other`.
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        match trimmed.to_uppercase().as_str() {
            "IN" => TermType::Ingredient,
            "BN" => TermType::BrandName,
            "PT" => TermType::PreferredTerm,
            "SY" => TermType::Synonym,
            "PIN" => TermType::PreciseIngredient,
            _ => TermType::Other(trimmed.to_string()),
        }
    }

    /// Code as written in reference files.
    pub fn code(&self) -> &str {
        match self {
            TermType::Ingredient => "IN",
            TermType::BrandName => "BN",
            TermType::PreferredTerm => "PT",
            TermType::Synonym => "SY",
            TermType::PreciseIngredient => "PIN",
            TermType::Other(code) => code,
        }
    }

    /// Index-building priority, lower loads first.
    pub fn priority(&self) -> u8 {
        match self {
            TermType::Ingredient => 1,
            TermType::BrandName => 2,
            TermType::PreferredTerm => 3,
            TermType::Synonym => 4,
            TermType::PreciseIngredient => 5,
            TermType::Other(_) => 99,
        }
    }

    /// Ingredient-level terms that name the generic substance.
    pub fn is_generic(&self) -> bool {
        matches!(self, TermType::Ingredient | TermType::PreferredTerm)
    }
}

impl Default for TermType {
    fn default() -> Self {
        TermType::Other(String::new())
    }
}

impl From<String> for TermType {
    fn from(raw: String) -> Self {
        TermType::parse(&raw)
    }
}

impl From<TermType> for String {
    fn from(term_type: TermType) -> Self {
        term_type.code().to_string()
    }
}

impl fmt::Display for TermType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// One row of a reference dataset as read from disk, before key derivation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawReferenceRow {
    /// Precomputed normalized key, if the dataset carries one
    pub key: Option<String>,
    /// Secondary "clean name" key, if the dataset carries one
    pub clean_name: Option<String>,
    /// Canonical identifier (RXCUI or supplement id)
    pub identifier: String,
    /// Display name
    pub display_name: String,
    /// Contributing sources, `|`-separated
    pub sources: Option<String>,
    /// Term type or category code
    pub term_type: Option<String>,
}

/// A reference-dictionary entry.
///
/// Records sharing an `identifier` form a unification group.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReferenceRecord {
    /// Canonical identifier
    pub identifier: String,
    /// Display name
    pub display_name: String,
    /// Contributing sources (e.g. `RXNORM`, `MTHSPL`)
    pub sources: Vec<String>,
    /// Term type / category
    pub term_type: TermType,
    /// Primary lookup key
    pub normalized_key: String,
    /// Secondary lookup key
    pub clean_key: Option<String>,
}

impl ReferenceRecord {
    /// Sources joined the way reference files store them.
    pub fn sources_joined(&self) -> String {
        self.sources.join("|")
    }
}

/// Split a `|`-separated sources cell.
pub fn split_sources(raw: &str) -> Vec<String> {
    raw.split('|')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_term_type_parse() {
        assert_eq!(TermType::parse("IN"), TermType::Ingredient);
        assert_eq!(TermType::parse(" bn "), TermType::BrandName);
        assert_eq!(TermType::parse("PIN"), TermType::PreciseIngredient);
        assert_eq!(
            TermType::parse("Vitamin"),
            TermType::Other("Vitamin".into())
        );
    }

    #[test]
    fn test_term_type_priority_order() {
        assert!(TermType::Ingredient.priority() < TermType::BrandName.priority());
        assert!(TermType::BrandName.priority() < TermType::PreferredTerm.priority());
        assert!(TermType::Synonym.priority() < TermType::PreciseIngredient.priority());
        assert_eq!(TermType::Other("Mineral".into()).priority(), 99);
    }

    #[test]
    fn test_term_type_serde_as_code() {
        let json = serde_json::to_string(&TermType::BrandName).unwrap();
        assert_eq!(json, "\"BN\"");
        let parsed: TermType = serde_json::from_str("\"SY\"").unwrap();
        assert_eq!(parsed, TermType::Synonym);
    }

    #[test]
    fn test_split_sources() {
        assert_eq!(split_sources("RXNORM| MTHSPL |"), vec!["RXNORM", "MTHSPL"]);
        assert!(split_sources("").is_empty());
    }
}
