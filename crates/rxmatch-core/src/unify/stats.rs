//! Unification coverage and brand/generic verification.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::models::{ReferenceRecord, TermType};

/// Well-known brand/generic pairs used as a smoke check of a unified dataset.
pub const DEFAULT_VERIFICATION_PAIRS: &[(&str, &str)] = &[
    ("Tylenol", "acetaminophen"),
    ("Advil", "ibuprofen"),
    ("Motrin", "ibuprofen"),
    ("Aleve", "naproxen"),
    ("Nexium", "esomeprazole"),
    ("Prilosec", "omeprazole"),
    ("Lipitor", "atorvastatin"),
    ("Crestor", "rosuvastatin"),
    ("Prozac", "fluoxetine"),
    ("Zoloft", "sertraline"),
    ("Xanax", "alprazolam"),
    ("Ativan", "lorazepam"),
    ("Ambien", "zolpidem"),
    ("Synthroid", "levothyroxine"),
    ("Glucophage", "metformin"),
    ("Zyrtec", "cetirizine"),
    ("Claritin", "loratadine"),
    ("Plavix", "clopidogrel"),
    ("Eliquis", "apixaban"),
    ("Mestinon", "pyridostigmine"),
];

/// Group-level counts over a record set.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UnificationStats {
    pub total_records: usize,
    pub unique_identifiers: usize,
    /// Identifiers shared by more than one record
    pub unified_groups: usize,
    pub records_in_groups: usize,
}

impl UnificationStats {
    pub fn compute(records: &[ReferenceRecord]) -> Self {
        let sizes = group_sizes(records);
        let grouped = sizes.values().filter(|&&n| n > 1);

        Self {
            total_records: records.len(),
            unique_identifiers: sizes.len(),
            unified_groups: grouped.clone().count(),
            records_in_groups: grouped.sum(),
        }
    }

    /// Share of records that belong to a unified group, in percent.
    pub fn coverage(&self) -> f64 {
        if self.total_records == 0 {
            0.0
        } else {
            self.records_in_groups as f64 * 100.0 / self.total_records as f64
        }
    }
}

/// Record count per identifier.
pub fn group_sizes(records: &[ReferenceRecord]) -> HashMap<&str, usize> {
    let mut sizes = HashMap::new();
    for record in records {
        *sizes.entry(record.identifier.as_str()).or_insert(0) += 1;
    }
    sizes
}

/// Records sharing `identifier`.
pub fn group_members<'a>(records: &'a [ReferenceRecord], identifier: &str) -> Vec<&'a ReferenceRecord> {
    records.iter().filter(|r| r.identifier == identifier).collect()
}

/// Outcome of checking one brand/generic pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "status")]
pub enum PairStatus {
    /// Brand and generic rows share the identifier
    Unified { identifier: String, group_size: usize },
    /// Both found under different identifiers
    Split { brand_id: String, generic_id: String },
    /// Brand or generic row not present
    NotFound,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PairCheck {
    pub brand: String,
    pub generic: String,
    pub status: PairStatus,
}

impl PairCheck {
    pub fn is_unified(&self) -> bool {
        matches!(self.status, PairStatus::Unified { .. })
    }
}

/// Check that each brand name and its generic share one identifier.
///
/// The first brand-name row whose display name contains `brand` and the
/// first ingredient/preferred-term row containing `generic` are compared
/// (case-insensitive).
pub fn verify_pairs<S: AsRef<str>>(records: &[ReferenceRecord], pairs: &[(S, S)]) -> Vec<PairCheck> {
    let sizes = group_sizes(records);

    pairs
        .iter()
        .map(|(brand, generic)| {
            let (brand, generic) = (brand.as_ref(), generic.as_ref());
            let brand_row = first_containing(records, brand, |t| *t == TermType::BrandName);
            let generic_row = first_containing(records, generic, TermType::is_generic);

            let status = match (brand_row, generic_row) {
                (Some(b), Some(g)) if b.identifier == g.identifier => PairStatus::Unified {
                    identifier: b.identifier.clone(),
                    group_size: sizes.get(b.identifier.as_str()).copied().unwrap_or(0),
                },
                (Some(b), Some(g)) => PairStatus::Split {
                    brand_id: b.identifier.clone(),
                    generic_id: g.identifier.clone(),
                },
                _ => PairStatus::NotFound,
            };

            PairCheck {
                brand: brand.to_string(),
                generic: generic.to_string(),
                status,
            }
        })
        .collect()
}

fn first_containing<'a>(
    records: &'a [ReferenceRecord],
    needle: &str,
    term_filter: impl Fn(&TermType) -> bool,
) -> Option<&'a ReferenceRecord> {
    let needle = needle.to_lowercase();
    records
        .iter()
        .filter(|r| term_filter(&r.term_type))
        .find(|r| r.display_name.to_lowercase().contains(&needle))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: &str, name: &str, tty: &str) -> ReferenceRecord {
        ReferenceRecord {
            identifier: id.into(),
            display_name: name.into(),
            term_type: TermType::parse(tty),
            normalized_key: name.to_lowercase(),
            ..ReferenceRecord::default()
        }
    }

    fn dataset() -> Vec<ReferenceRecord> {
        vec![
            record("161", "Acetaminophen", "IN"),
            record("161", "Tylenol", "BN"),
            record("161", "Paracetamol", "SY"),
            record("5640", "Ibuprofen", "IN"),
            record("153010", "Advil", "BN"),
            record("7242", "Naltrexone", "IN"),
        ]
    }

    #[test]
    fn test_stats() {
        let stats = UnificationStats::compute(&dataset());

        assert_eq!(stats.total_records, 6);
        assert_eq!(stats.unique_identifiers, 4);
        assert_eq!(stats.unified_groups, 1);
        assert_eq!(stats.records_in_groups, 3);
        assert!((stats.coverage() - 50.0).abs() < 1e-9);
    }

    #[test]
    fn test_verify_pairs() {
        let records = dataset();
        let checks = verify_pairs(
            &records,
            &[("tylenol", "Acetaminophen"), ("Advil", "ibuprofen"), ("Aleve", "naproxen")],
        );

        assert_eq!(
            checks[0].status,
            PairStatus::Unified {
                identifier: "161".into(),
                group_size: 3
            }
        );
        assert_eq!(
            checks[1].status,
            PairStatus::Split {
                brand_id: "153010".into(),
                generic_id: "5640".into()
            }
        );
        assert_eq!(checks[2].status, PairStatus::NotFound);
        assert!(checks[0].is_unified());
    }

    #[test]
    fn test_synonym_rows_do_not_count_as_generic() {
        let records = vec![record("1", "Brandix", "BN"), record("1", "genericol", "SY")];
        let checks = verify_pairs(&records, &[("Brandix", "genericol")]);
        assert_eq!(checks[0].status, PairStatus::NotFound);
    }

    #[test]
    fn test_group_members() {
        let records = dataset();
        let members = group_members(&records, "161");
        assert_eq!(members.len(), 3);
        assert!(members.iter().any(|r| r.display_name == "Tylenol"));
    }
}
