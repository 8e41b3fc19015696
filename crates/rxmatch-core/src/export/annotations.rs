//! Per-name annotation table.

use std::io::Write;
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::{create_file, ExportResult};
use crate::models::MatchResult;

/// Separator for the candidate-key audit column.
pub const CANDIDATE_SEPARATOR: &str = "|";

/// One output row, in column order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnnotationRow {
    pub treatment_name: String,
    pub matched: bool,
    pub identifier: String,
    pub matched_name: String,
    pub source: String,
    pub term_type: String,
    pub method: String,
    pub confidence: f64,
    pub matched_key: String,
    pub candidate_keys: String,
}

impl From<&MatchResult> for AnnotationRow {
    fn from(result: &MatchResult) -> Self {
        let record = result.record.as_ref();
        Self {
            treatment_name: result.input.clone(),
            matched: result.matched,
            identifier: record.map(|r| r.identifier.clone()).unwrap_or_default(),
            matched_name: record.map(|r| r.display_name.clone()).unwrap_or_default(),
            source: result.source.clone().unwrap_or_default(),
            term_type: record.map(|r| r.term_type.code().to_string()).unwrap_or_default(),
            method: result.method.as_str().to_string(),
            confidence: (result.confidence * 10_000.0).round() / 10_000.0,
            matched_key: result.matched_key.clone().unwrap_or_default(),
            candidate_keys: result.candidates.joined(CANDIDATE_SEPARATOR),
        }
    }
}

/// Write one row per result, in input order.
pub fn write_annotations<W: Write>(writer: W, results: &[MatchResult]) -> ExportResult<()> {
    let mut writer = csv::Writer::from_writer(writer);
    for result in results {
        writer.serialize(AnnotationRow::from(result))?;
    }
    writer.flush().map_err(csv::Error::from)?;
    Ok(())
}

pub fn save_annotations<P: AsRef<Path>>(path: P, results: &[MatchResult]) -> ExportResult<()> {
    write_annotations(create_file(path.as_ref())?, results)
}
