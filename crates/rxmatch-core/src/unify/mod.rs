//! Brand→generic unification of reference identifiers.
//!
//! A batch transform over the reference records: every record whose
//! identifier is a mapping source takes the mapping's target identifier.
//! Records that end up sharing an identifier form a unification group;
//! groups are recomputed from identifiers whenever needed, never stored.

mod stats;

pub use stats::*;

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::io::Read;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::assets;
use crate::models::{MappingEntry, ReferenceRecord, UnificationMapping};

/// Unifier errors.
#[derive(Error, Debug)]
pub enum UnifyError {
    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Mapping table error: {0}")]
    Csv(#[from] csv::Error),
}

pub type UnifyResult<T> = Result<T, UnifyError>;

/// The embedded curated brand→generic table.
pub fn embedded_mapping() -> UnifyResult<UnificationMapping> {
    read_mapping(assets::BRAND_GENERIC_MAPPINGS.as_bytes())
}

/// Load a `source_id,target_id[,label]` mapping table from disk.
pub fn load_mapping<P: AsRef<Path>>(path: P) -> UnifyResult<UnificationMapping> {
    let path = path.as_ref();
    let file = std::fs::File::open(path).map_err(|source| UnifyError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    read_mapping(file)
}

pub fn read_mapping<R: Read>(reader: R) -> UnifyResult<UnificationMapping> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(reader);

    reader
        .deserialize::<MappingEntry>()
        .map(|row| {
            row.map(|mut entry| {
                entry.label = entry.label.filter(|l| !l.is_empty());
                entry
            })
            .map_err(UnifyError::from)
        })
        .collect()
}

/// Why a mapping entry was not applied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum Rejection {
    /// Target identifier is not present among the records
    UnknownTarget,
    /// Source already mapped to a different target earlier in the table
    Conflict { kept_target: String },
    /// Following the chain of mappings returns to an earlier identifier
    Cycle,
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rejection::UnknownTarget => f.write_str("target identifier not found"),
            Rejection::Conflict { kept_target } => {
                write!(f, "source already mapped to {kept_target}")
            }
            Rejection::Cycle => f.write_str("mapping chain is cyclic"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RejectedMapping {
    pub entry: MappingEntry,
    pub reason: Rejection,
}

/// What a unification pass did.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnificationReport {
    /// Records whose identifier was rewritten
    pub applied: usize,
    /// Entries that passed validation
    pub valid_entries: usize,
    /// Entries mapping an identifier onto itself
    pub ignored: usize,
    pub rejected: Vec<RejectedMapping>,
}

/// Rewrite record identifiers according to `mapping`.
///
/// Chains are followed to their end so a single pass reaches the fixed
/// point; running the result through the same mapping again changes
/// nothing.
pub fn unify(
    mut records: Vec<ReferenceRecord>,
    mapping: &UnificationMapping,
) -> (Vec<ReferenceRecord>, UnificationReport) {
    let mut report = UnificationReport::default();
    let known: HashSet<&str> = records.iter().map(|r| r.identifier.as_str()).collect();

    // direct edges, validated one entry at a time
    let mut edges: HashMap<String, String> = HashMap::new();
    let mut edge_entries: Vec<&MappingEntry> = Vec::new();
    for entry in &mapping.entries {
        if entry.source_id == entry.target_id {
            report.ignored += 1;
            continue;
        }
        if let Some(kept) = edges.get(&entry.source_id) {
            if *kept != entry.target_id {
                report.rejected.push(RejectedMapping {
                    entry: entry.clone(),
                    reason: Rejection::Conflict {
                        kept_target: kept.clone(),
                    },
                });
            }
            continue;
        }
        if !known.contains(entry.target_id.as_str()) {
            report.rejected.push(RejectedMapping {
                entry: entry.clone(),
                reason: Rejection::UnknownTarget,
            });
            continue;
        }
        edges.insert(entry.source_id.clone(), entry.target_id.clone());
        edge_entries.push(entry);
    }

    let mut resolved: HashMap<&str, String> = HashMap::new();
    for entry in edge_entries {
        match resolve_chain(&entry.source_id, &edges) {
            Some(target) => {
                resolved.insert(entry.source_id.as_str(), target);
                report.valid_entries += 1;
            }
            None => report.rejected.push(RejectedMapping {
                entry: entry.clone(),
                reason: Rejection::Cycle,
            }),
        }
    }

    for rejected in &report.rejected {
        warn!(
            source_id = %rejected.entry.source_id,
            target_id = %rejected.entry.target_id,
            reason = %rejected.reason,
            "mapping rejected"
        );
    }

    for record in &mut records {
        if let Some(target) = resolved.get(record.identifier.as_str()) {
            debug!(from = %record.identifier, to = %target, name = %record.display_name, "unified");
            record.identifier = target.clone();
            report.applied += 1;
        }
    }

    info!(
        applied = report.applied,
        valid = report.valid_entries,
        rejected = report.rejected.len(),
        "unification complete"
    );
    (records, report)
}

/// Follow edges from `start` to an identifier with no outgoing edge.
fn resolve_chain(start: &str, edges: &HashMap<String, String>) -> Option<String> {
    let mut seen = HashSet::from([start]);
    let mut current = edges.get(start)?;
    while let Some(next) = edges.get(current) {
        if !seen.insert(current.as_str()) {
            return None;
        }
        current = next;
    }
    Some(current.clone())
}
