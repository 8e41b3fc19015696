//! CSV reading and writing for reference datasets.

use std::io::{Read, Write};
use std::path::Path;

use csv::StringRecord;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::models::{RawReferenceRow, ReferenceRecord};

use super::{ReferenceError, ReferenceResult};

/// Column names used to read a reference dataset.
///
/// Optional columns that are configured but absent from the file are
/// treated as not supplied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColumnMap {
    pub key: Option<String>,
    pub clean_name: Option<String>,
    pub identifier: String,
    pub display_name: String,
    pub sources: Option<String>,
    pub term_type: Option<String>,
}

impl Default for ColumnMap {
    fn default() -> Self {
        Self::rxnorm()
    }
}

impl ColumnMap {
    /// Columns of a unified RxNorm core file.
    pub fn rxnorm() -> Self {
        Self {
            key: Some("normalized_name".into()),
            clean_name: Some("clean_name".into()),
            identifier: "primary_RXCUI".into(),
            display_name: "DrugName".into(),
            sources: Some("sources".into()),
            term_type: Some("preferred_term_type".into()),
        }
    }

    /// Columns of a fetched supplements file.
    pub fn supplements() -> Self {
        Self {
            key: None,
            clean_name: None,
            identifier: "supplement_id".into(),
            display_name: "name".into(),
            sources: None,
            term_type: Some("class".into()),
        }
    }
}

/// Resolved header positions for one file.
struct ColumnPositions {
    key: Option<usize>,
    clean_name: Option<usize>,
    identifier: usize,
    display_name: usize,
    sources: Option<usize>,
    term_type: Option<usize>,
}

impl ColumnPositions {
    fn resolve(headers: &StringRecord, columns: &ColumnMap, origin: &str) -> ReferenceResult<Self> {
        let find = |name: &str| headers.iter().position(|h| h.trim() == name);
        let required = |name: &str| {
            find(name).ok_or_else(|| ReferenceError::MissingColumn {
                column: name.to_string(),
                origin: origin.to_string(),
            })
        };
        let optional = |name: &Option<String>| {
            let name = name.as_deref()?;
            let position = find(name);
            if position.is_none() {
                debug!(column = name, origin, "optional column absent");
            }
            position
        };

        Ok(Self {
            key: optional(&columns.key),
            clean_name: optional(&columns.clean_name),
            identifier: required(columns.identifier.as_str())?,
            display_name: required(columns.display_name.as_str())?,
            sources: optional(&columns.sources),
            term_type: optional(&columns.term_type),
        })
    }

    fn extract(&self, record: &StringRecord) -> RawReferenceRow {
        let cell = |i: usize| record.get(i).unwrap_or("").to_string();
        let optional_cell = |i: Option<usize>| {
            i.and_then(|i| record.get(i))
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(str::to_string)
        };

        RawReferenceRow {
            key: optional_cell(self.key),
            clean_name: optional_cell(self.clean_name),
            identifier: cell(self.identifier),
            display_name: cell(self.display_name),
            sources: optional_cell(self.sources),
            term_type: optional_cell(self.term_type),
        }
    }
}

/// Load every row of a reference CSV file.
pub fn load_reference_rows<P: AsRef<Path>>(
    path: P,
    columns: &ColumnMap,
) -> ReferenceResult<Vec<RawReferenceRow>> {
    let path = path.as_ref();
    let file = std::fs::File::open(path).map_err(|source| ReferenceError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    read_reference_rows(file, columns, &path.display().to_string())
}

/// Read reference rows from any CSV source. `origin` names it in errors.
pub fn read_reference_rows<R: Read>(
    reader: R,
    columns: &ColumnMap,
    origin: &str,
) -> ReferenceResult<Vec<RawReferenceRow>> {
    let mut csv_reader = csv::ReaderBuilder::new().flexible(true).from_reader(reader);
    let headers = csv_reader.headers()?.clone();
    let positions = ColumnPositions::resolve(&headers, columns, origin)?;

    let mut rows = Vec::new();
    for record in csv_reader.records() {
        rows.push(positions.extract(&record?));
    }
    debug!(origin, rows = rows.len(), "read reference rows");
    Ok(rows)
}

/// Canonical on-disk layout of a reference record.
#[derive(Debug, Serialize)]
struct ReferenceCsvRow<'a> {
    normalized_name: &'a str,
    clean_name: &'a str,
    #[serde(rename = "primary_RXCUI")]
    primary_rxcui: &'a str,
    #[serde(rename = "DrugName")]
    drug_name: &'a str,
    sources: String,
    preferred_term_type: &'a str,
}

/// Write records in the canonical column layout (readable with [`ColumnMap::rxnorm`]).
pub fn write_reference_records<W: Write>(
    writer: W,
    records: &[ReferenceRecord],
) -> ReferenceResult<()> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    for record in records {
        csv_writer.serialize(ReferenceCsvRow {
            normalized_name: &record.normalized_key,
            clean_name: record.clean_key.as_deref().unwrap_or(""),
            primary_rxcui: &record.identifier,
            drug_name: &record.display_name,
            sources: record.sources_joined(),
            preferred_term_type: record.term_type.code(),
        })?;
    }
    csv_writer.flush().map_err(csv::Error::from)?;
    Ok(())
}

/// Write records to a file in the canonical layout.
pub fn save_reference_records<P: AsRef<Path>>(
    path: P,
    records: &[ReferenceRecord],
) -> ReferenceResult<()> {
    let path = path.as_ref();
    let file = std::fs::File::create(path).map_err(|source| ReferenceError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    write_reference_records(file, records)
}

/// Load a canonical reference file straight into records, file order kept.
pub fn load_reference_records<P: AsRef<Path>>(path: P) -> ReferenceResult<Vec<ReferenceRecord>> {
    Ok(load_reference_rows(path, &ColumnMap::rxnorm())?
        .into_iter()
        .filter_map(super::record_from_row)
        .collect())
}
