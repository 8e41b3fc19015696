//! Reference dictionaries: loading, indexing and availability.
//!
//! An index is built once per dataset and is read-only afterwards. A dataset
//! that cannot be located is not an error: it yields
//! [`SourceIndex::Unavailable`] so other sources can still be consulted.

mod index;
mod loader;

pub use index::*;
pub use loader::*;

use std::path::PathBuf;

use thiserror::Error;
use tracing::{info, warn};

use crate::config::SourceConfig;

/// Reference data errors.
#[derive(Error, Debug)]
pub enum ReferenceError {
    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Missing required column '{column}' in {origin}")]
    MissingColumn { column: String, origin: String },
}

pub type ReferenceResult<T> = Result<T, ReferenceError>;

/// A configured reference source after the load attempt.
#[derive(Debug, Clone)]
pub enum SourceIndex {
    /// Dataset found and indexed
    Available(ReferenceIndex),
    /// Dataset could not be located; contributes no matches
    Unavailable { label: String, reason: String },
}

impl SourceIndex {
    pub fn label(&self) -> &str {
        match self {
            SourceIndex::Available(index) => index.label(),
            SourceIndex::Unavailable { label, .. } => label,
        }
    }

    pub fn index(&self) -> Option<&ReferenceIndex> {
        match self {
            SourceIndex::Available(index) => Some(index),
            SourceIndex::Unavailable { .. } => None,
        }
    }

    pub fn is_available(&self) -> bool {
        matches!(self, SourceIndex::Available(_))
    }
}

/// Locate, read and index a configured source.
///
/// The first existing path in `config.paths` is used. When none exists the
/// source is reported unavailable; a file that exists but cannot be parsed
/// is an error.
pub fn open_source(config: &SourceConfig) -> ReferenceResult<SourceIndex> {
    let Some(path) = config.paths.iter().find(|p| p.is_file()) else {
        let tried = config
            .paths
            .iter()
            .map(|p| p.display().to_string())
            .collect::<Vec<_>>()
            .join(", ");
        warn!(source = %config.label, tried = %tried, "reference dataset not found");
        return Ok(SourceIndex::Unavailable {
            label: config.label.clone(),
            reason: format!("no reference file found (tried: {tried})"),
        });
    };

    let rows = load_reference_rows(path, &config.columns)?;
    let index = ReferenceIndexBuilder::new(&config.label)
        .prioritize_term_types(config.prioritize_term_types)
        .build(rows);
    info!(
        source = %config.label,
        path = %path.display(),
        records = index.len(),
        "loaded reference dataset"
    );
    Ok(SourceIndex::Available(index))
}
