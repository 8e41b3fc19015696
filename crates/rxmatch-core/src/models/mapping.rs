//! Curated brand→generic unification mappings.

use serde::{Deserialize, Serialize};

/// One curated collapse of a source identifier onto a target identifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MappingEntry {
    pub source_id: String,
    pub target_id: String,
    /// Free-text note, e.g. "Advil -> Ibuprofen"
    #[serde(default)]
    pub label: Option<String>,
}

impl MappingEntry {
    pub fn new(source_id: impl Into<String>, target_id: impl Into<String>) -> Self {
        Self {
            source_id: source_id.into(),
            target_id: target_id.into(),
            label: None,
        }
    }
}

/// Ordered table of unification mappings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnificationMapping {
    pub entries: Vec<MappingEntry>,
}

impl UnificationMapping {
    pub fn new(entries: Vec<MappingEntry>) -> Self {
        Self { entries }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl FromIterator<MappingEntry> for UnificationMapping {
    fn from_iter<I: IntoIterator<Item = MappingEntry>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}
