//! In-memory reference index.

use std::collections::HashMap;

use sha2::{Digest, Sha256};

use crate::models::{split_sources, RawReferenceRow, ReferenceRecord, TermType};
use crate::resolver::normalize;

/// Lookup structure over one reference dataset.
///
/// Keys are unique; on collision the first inserted record keeps the key.
#[derive(Debug, Clone)]
pub struct ReferenceIndex {
    label: String,
    records: Vec<ReferenceRecord>,
    primary: HashMap<String, usize>,
    clean: HashMap<String, usize>,
    /// Records owning a primary key, in insertion order
    primary_order: Vec<usize>,
    digest: String,
}

impl ReferenceIndex {
    /// Source label, e.g. `rxnorm`.
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Exact lookup on the primary normalized key.
    pub fn get(&self, key: &str) -> Option<&ReferenceRecord> {
        self.primary.get(key).map(|&i| &self.records[i])
    }

    /// Exact lookup on the secondary clean-name key.
    pub fn get_clean(&self, key: &str) -> Option<&ReferenceRecord> {
        self.clean.get(key).map(|&i| &self.records[i])
    }

    /// Records that own a primary key, in load order. Fuzzy scans walk this.
    pub fn primary_entries(&self) -> impl Iterator<Item = (&str, &ReferenceRecord)> {
        self.primary_order.iter().map(move |&i| {
            let record = &self.records[i];
            (record.normalized_key.as_str(), record)
        })
    }

    /// Every indexed record, shadowed duplicates included.
    pub fn records(&self) -> &[ReferenceRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn primary_key_count(&self) -> usize {
        self.primary.len()
    }

    pub fn clean_key_count(&self) -> usize {
        self.clean.len()
    }

    /// SHA-256 over the indexed records in load order (hex).
    pub fn digest(&self) -> &str {
        &self.digest
    }
}

/// Builds a [`ReferenceIndex`] in a single pass over its rows.
#[derive(Debug, Clone)]
pub struct ReferenceIndexBuilder {
    label: String,
    prioritize_term_types: bool,
}

impl ReferenceIndexBuilder {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            prioritize_term_types: true,
        }
    }

    /// Stable-sort rows by term-type priority before insertion.
    ///
    /// On by default. Turn off only for data already ordered by the caller.
    pub fn prioritize_term_types(mut self, enabled: bool) -> Self {
        self.prioritize_term_types = enabled;
        self
    }

    /// Build from raw dataset rows.
    pub fn build<I>(self, rows: I) -> ReferenceIndex
    where
        I: IntoIterator<Item = RawReferenceRow>,
    {
        let records = rows.into_iter().filter_map(record_from_row).collect();
        self.build_from_records(records)
    }

    /// Build from already-derived records.
    pub fn build_from_records(self, mut records: Vec<ReferenceRecord>) -> ReferenceIndex {
        records.retain(|r| !r.normalized_key.is_empty());
        if self.prioritize_term_types {
            records.sort_by_key(|r| r.term_type.priority());
        }

        let mut primary = HashMap::new();
        let mut clean = HashMap::new();
        let mut primary_order = Vec::new();
        let mut hasher = Sha256::new();

        for (i, record) in records.iter().enumerate() {
            if !primary.contains_key(&record.normalized_key) {
                primary.insert(record.normalized_key.clone(), i);
                primary_order.push(i);
            }
            if let Some(clean_key) = record.clean_key.as_ref().filter(|k| !k.is_empty()) {
                clean.entry(clean_key.clone()).or_insert(i);
            }
            hash_record(&mut hasher, record);
        }

        ReferenceIndex {
            label: self.label,
            records,
            primary,
            clean,
            primary_order,
            digest: hex::encode(hasher.finalize()),
        }
    }
}

/// Derive a record from a raw row. Rows without a usable key are dropped.
pub fn record_from_row(row: RawReferenceRow) -> Option<ReferenceRecord> {
    let precomputed = row.key.as_deref().map(normalize).filter(|k| !k.is_empty());
    let normalized_key = precomputed.unwrap_or_else(|| normalize(&row.display_name));
    if normalized_key.is_empty() {
        return None;
    }
    let clean_key = row
        .clean_name
        .as_deref()
        .map(normalize)
        .filter(|k| !k.is_empty());

    Some(ReferenceRecord {
        identifier: row.identifier.trim().to_string(),
        display_name: row.display_name,
        sources: row.sources.as_deref().map(split_sources).unwrap_or_default(),
        term_type: row
            .term_type
            .as_deref()
            .map(TermType::parse)
            .unwrap_or_default(),
        normalized_key,
        clean_key,
    })
}

fn hash_record(hasher: &mut Sha256, record: &ReferenceRecord) {
    for field in [
        record.identifier.as_str(),
        record.display_name.as_str(),
        record.normalized_key.as_str(),
        record.clean_key.as_deref().unwrap_or(""),
        record.term_type.code(),
    ] {
        hasher.update(field.as_bytes());
        hasher.update([0x1f]);
    }
    hasher.update([0x1e]);
}
