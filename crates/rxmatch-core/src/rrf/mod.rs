//! RxNorm release ingestion (`RXNCONSO.RRF`).
//!
//! Produces the curated clinical reference dataset: English ingredient,
//! brand, preferred-term, synonym and precise-ingredient names, minus
//! suppressed atoms and dose- or route-specific strings, one record per
//! (RXCUI, name, term type) with its contributing vocabularies collapsed.

mod curation;

pub use curation::*;

use std::collections::HashMap;
use std::io::Read;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use crate::models::{ReferenceRecord, TermType};
use crate::resolver::{normalize, AliasExpander};

/// RRF ingestion errors.
#[derive(Error, Debug)]
pub enum RrfError {
    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("RRF read error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Malformed RXNCONSO row at line {line}: expected {expected} fields, found {found}")]
    Malformed {
        line: u64,
        expected: usize,
        found: usize,
    },
}

pub type RrfResult<T> = Result<T, RrfError>;

/// Column positions in `RXNCONSO.RRF`.
mod column {
    pub const RXCUI: usize = 0;
    pub const LAT: usize = 1;
    pub const SAB: usize = 11;
    pub const TTY: usize = 12;
    pub const STR: usize = 14;
    pub const SUPPRESS: usize = 16;
    /// RXCUI … CVF
    pub const COUNT: usize = 18;
}

/// The fields of one concept-name atom that ingestion uses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsoAtom {
    pub rxcui: String,
    pub language: String,
    pub vocabulary: String,
    pub term_type: String,
    pub name: String,
    pub suppress: String,
}

impl ConsoAtom {
    fn from_record(record: &csv::StringRecord) -> RrfResult<Self> {
        if record.len() < column::COUNT {
            return Err(RrfError::Malformed {
                line: record.position().map_or(0, |p| p.line()),
                expected: column::COUNT,
                found: record.len(),
            });
        }
        let field = |i: usize| record.get(i).unwrap_or_default().to_string();
        Ok(Self {
            rxcui: field(column::RXCUI),
            language: field(column::LAT),
            vocabulary: field(column::SAB),
            term_type: field(column::TTY),
            name: field(column::STR),
            suppress: field(column::SUPPRESS),
        })
    }
}

/// Where the rows went.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestStats {
    pub rows_read: usize,
    pub kept: usize,
    pub records: usize,
    pub rejected: HashMap<String, usize>,
}

/// Curated records in term-type priority order, plus counts.
#[derive(Debug, Clone, Default)]
pub struct IngestOutcome {
    pub records: Vec<ReferenceRecord>,
    pub stats: IngestStats,
}

/// Ingest an `RXNCONSO.RRF` file.
pub fn ingest_conso_file<P: AsRef<Path>>(
    path: P,
    filter: &CurationFilter,
    expander: &AliasExpander,
) -> RrfResult<IngestOutcome> {
    let path = path.as_ref();
    let file = std::fs::File::open(path).map_err(|source| RrfError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    info!(path = %path.display(), "reading RXNCONSO");
    ingest_conso(file, filter, expander)
}

/// Stream `RXNCONSO` rows, keep the curated subset and collapse duplicates.
///
/// Records are ordered by term-type priority, then by how many
/// vocabularies contributed the name (more first), then by first
/// appearance.
pub fn ingest_conso<R: Read>(
    reader: R,
    filter: &CurationFilter,
    expander: &AliasExpander,
) -> RrfResult<IngestOutcome> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(b'|')
        .has_headers(false)
        .flexible(true)
        .quoting(false)
        .from_reader(reader);

    let mut stats = IngestStats::default();
    let mut order: Vec<(String, String, String)> = Vec::new();
    let mut vocabularies: HashMap<(String, String, String), Vec<String>> = HashMap::new();

    for row in reader.records() {
        let atom = ConsoAtom::from_record(&row?)?;
        stats.rows_read += 1;

        if let Err(exclusion) = filter.admit(&atom) {
            *stats.rejected.entry(exclusion.as_str().to_string()).or_default() += 1;
            continue;
        }
        stats.kept += 1;

        let key = (atom.rxcui, atom.name, atom.term_type);
        let sources = vocabularies.entry(key.clone()).or_insert_with(|| {
            order.push(key);
            Vec::new()
        });
        if !sources.contains(&atom.vocabulary) {
            sources.push(atom.vocabulary);
        }
    }

    let mut records: Vec<ReferenceRecord> = order
        .into_iter()
        .filter_map(|key| {
            let mut sources = vocabularies.remove(&key).unwrap_or_default();
            sources.sort();
            let (rxcui, name, term_type) = key;
            let normalized_key = normalize(&name);
            if normalized_key.is_empty() {
                return None;
            }
            let clean_key = Some(expander.extract_core(&name)).filter(|k| !k.is_empty());
            Some(ReferenceRecord {
                identifier: rxcui,
                display_name: name,
                sources,
                term_type: TermType::parse(&term_type),
                normalized_key,
                clean_key,
            })
        })
        .collect();

    records.sort_by(|a, b| {
        a.term_type
            .priority()
            .cmp(&b.term_type.priority())
            .then_with(|| b.sources.len().cmp(&a.sources.len()))
    });
    stats.records = records.len();

    info!(
        rows = stats.rows_read,
        kept = stats.kept,
        records = stats.records,
        "RXNCONSO ingested"
    );
    Ok(IngestOutcome { records, stats })
}

#[cfg(test)]
mod tests {
    use super::*;

    const CONSO: &str = "\
7242|ENG||L1|PF|S1|Y|A1|||7242|RXNORM|IN|7242|naltrexone|0|N|4096|
7242|ENG||L1|PF|S2|Y|A2|||7242|MTHSPL|IN|7242|naltrexone|0|N||
7242|ENG||L2|PF|S3|Y|A3|||7242|RXNORM|SY|7242|naltrexone 50 MG Oral Tablet|0|N||
7242|SPA||L3|PF|S4|Y|A4|||7242|MSHSPA|IN|7242|naltrexona|0|N||
202433|ENG||L4|PF|S5|Y|A5|||202433|RXNORM|BN|202433|Tylenol|0|N||
202433|ENG||L4|PF|S6|Y|A6|||202433|RXNORM|BN|202433|Tylenol Old|0|Y||
161|ENG||L5|PF|S7|Y|A7|||161|RXNORM|SCD|161|acetaminophen 500 MG Oral Tablet|0|N||
161|ENG||L6|PF|S8|Y|A8|||161|RXNORM|IN|161|acetaminophen|0|N||
161|ENG||L7|PF|S9|Y|A9|||161|VANDF|PT|161|acetaminophen oral suspension|0|N||
";

    fn ingest() -> IngestOutcome {
        let expander = AliasExpander::with_embedded_synonyms().unwrap();
        ingest_conso(CONSO.as_bytes(), &CurationFilter::default(), &expander).unwrap()
    }

    #[test]
    fn test_keeps_curated_subset() {
        let outcome = ingest();
        let names: Vec<&str> = outcome.records.iter().map(|r| r.display_name.as_str()).collect();

        // IN first (multi-vocabulary naltrexone ahead), then BN
        assert_eq!(names, vec!["naltrexone", "acetaminophen", "Tylenol"]);
        assert_eq!(outcome.stats.rows_read, 9);
        assert_eq!(outcome.stats.kept, 4);
        assert_eq!(outcome.stats.records, 3);
    }

    #[test]
    fn test_collapses_vocabularies() {
        let outcome = ingest();
        let naltrexone = &outcome.records[0];
        assert_eq!(naltrexone.identifier, "7242");
        assert_eq!(naltrexone.sources, vec!["MTHSPL".to_string(), "RXNORM".to_string()]);
        assert_eq!(naltrexone.term_type, TermType::Ingredient);
        assert_eq!(naltrexone.clean_key.as_deref(), Some("naltrexone"));
    }

    #[test]
    fn test_rejection_reasons_counted() {
        let stats = ingest().stats;
        assert_eq!(stats.rejected["language"], 1);
        assert_eq!(stats.rejected["suppressed"], 1);
        assert_eq!(stats.rejected["term_type"], 1);
        assert_eq!(stats.rejected["dose_specific"], 1);
        assert_eq!(stats.rejected["route_specific"], 1);
    }

    #[test]
    fn test_short_row_is_malformed() {
        let expander = AliasExpander::default();
        let err = ingest_conso("7242|ENG|x\n".as_bytes(), &CurationFilter::default(), &expander)
            .unwrap_err();
        assert!(matches!(err, RrfError::Malformed { found: 3, .. }));
    }
}
