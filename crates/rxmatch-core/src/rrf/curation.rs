//! Which RXNCONSO atoms make it into the clinical reference dataset.

use std::sync::LazyLock;

use regex::Regex;

use super::ConsoAtom;
use crate::models::TermType;

static DOSE_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"\b\d+\.?\d*\s*(mg|mcg|g|ml|l|unit|iu|miu|million unit|billion unit)\b",
        r"\b\d+\.?\d*\s*%",
        // ratios like 5/500
        r"\b\d+/\d+",
        r"\b\d+\s*-\s*\d+\s*(mg|mcg|unit)",
        r"\bstrength\s+\d+",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("dose pattern"))
    .collect()
});

static ROUTE_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"\b(oral|injection|topical|ophthalmic|otic|nasal|rectal|vaginal|sublingual|buccal|transdermal)\b",
        r"\b(tablet|capsule|solution|suspension|cream|ointment|gel|patch|suppository|drops|spray)\b",
        r"\b(iv|im|sc|subq|subcutaneous|intravenous|intramuscular)\b",
        r"\b(extended release|sustained release|delayed release|immediate release)\b",
        r"\b(er|sr|dr|ir|xl|la)\b(?:\s|$)",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("route pattern"))
    .collect()
});

/// True when the name pins a specific strength ("500 mg", "5%", "5/325").
///
/// "low dose" names are never dose-specific.
pub fn is_dose_specific(name: &str) -> bool {
    let lower = name.to_lowercase();
    if lower.contains("low dose") {
        return false;
    }
    DOSE_PATTERNS.iter().any(|p| p.is_match(&lower))
}

/// True when the name pins a route, dosage form or release mechanism.
pub fn is_route_specific(name: &str) -> bool {
    let lower = name.to_lowercase();
    ROUTE_PATTERNS.iter().any(|p| p.is_match(&lower))
}

/// Why an atom was left out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Exclusion {
    Language,
    TermType,
    Suppressed,
    DoseSpecific,
    RouteSpecific,
}

impl Exclusion {
    pub fn as_str(&self) -> &'static str {
        match self {
            Exclusion::Language => "language",
            Exclusion::TermType => "term_type",
            Exclusion::Suppressed => "suppressed",
            Exclusion::DoseSpecific => "dose_specific",
            Exclusion::RouteSpecific => "route_specific",
        }
    }
}

/// Curation rules for RXNCONSO atoms.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurationFilter {
    pub language: String,
    pub term_types: Vec<TermType>,
}

impl Default for CurationFilter {
    fn default() -> Self {
        Self {
            language: "ENG".into(),
            term_types: vec![
                TermType::Ingredient,
                TermType::BrandName,
                TermType::PreferredTerm,
                TermType::Synonym,
                TermType::PreciseIngredient,
            ],
        }
    }
}

impl CurationFilter {
    /// Ingredients and brand names only need to be dose-free; every other
    /// kept term type must also be route-free.
    pub fn admit(&self, atom: &ConsoAtom) -> Result<(), Exclusion> {
        if atom.language != self.language {
            return Err(Exclusion::Language);
        }
        let term_type = TermType::parse(&atom.term_type);
        if !self.term_types.contains(&term_type) {
            return Err(Exclusion::TermType);
        }
        if atom.suppress == "Y" {
            return Err(Exclusion::Suppressed);
        }
        if is_dose_specific(&atom.name) {
            return Err(Exclusion::DoseSpecific);
        }
        let route_exempt = matches!(term_type, TermType::Ingredient | TermType::BrandName);
        if !route_exempt && is_route_specific(&atom.name) {
            return Err(Exclusion::RouteSpecific);
        }
        Ok(())
    }
}
