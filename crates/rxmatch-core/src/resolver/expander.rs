//! Alias expansion: one raw treatment name → ordered candidate keys.
//!
//! Order of the produced keys:
//! 1. the normalized full name
//! 2. the main phrase and the parenthetical, for `"<main> (<paren>)"` names
//! 3. the core ingredient extracted from the name with parentheticals removed

use std::collections::HashMap;
use std::io::Read;
use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;
use serde::Deserialize;

use crate::assets;
use crate::models::CandidateKeySet;
use crate::reference::{ReferenceError, ReferenceResult};

use super::normalizer::{collapse_whitespace, normalize};

static PARENTHETICAL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(.+?)\s*\(([^)]+)\)").expect("parenthetical pattern"));

static PARENTHETICAL_SPAN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s*\([^)]+\)").expect("parenthetical span pattern"));

/// Ordered stripping rules for core-ingredient extraction.
///
/// Each rule runs on the output of the previous one.
static STRIP_RULES: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        // dose qualifiers
        r"(?i)\b(low\s+dose|high\s+dose|extended\s+release|immediate\s+release|sustained\s+release|delayed\s+release)\b",
        // administration routes
        r"(?i)\b(oral|iv|intravenous|topical|nasal|sublingual)\b",
        // dosage forms
        r"(?i)\b(tablet|capsule|injection|spray|cream|gel|solution)s?\b",
        // numeric dose + unit
        r"(?i)\b\d+\s*(mg|mcg|g|ml|cc|units?|iu|meq)\b",
        // frequency codes
        r"(?i)\b(twice\s+daily|once\s+daily|bid|tid|qid|prn)\b",
    ]
    .iter()
    .map(|pattern| Regex::new(pattern).expect("strip rule pattern"))
    .collect()
});

#[derive(Debug, Deserialize)]
struct SynonymRow {
    alias: String,
    canonical: String,
}

/// Fixed synonym table consulted before pattern stripping.
///
/// Keys are stored normalized so lookups compare like with like.
#[derive(Debug, Clone, Default)]
pub struct SynonymTable {
    entries: HashMap<String, String>,
}

impl SynonymTable {
    /// The table shipped with the crate.
    pub fn embedded() -> ReferenceResult<Self> {
        Self::from_reader(assets::CORE_SYNONYMS.as_bytes())
    }

    /// Load an `alias,canonical` CSV file.
    pub fn from_path<P: AsRef<Path>>(path: P) -> ReferenceResult<Self> {
        let path = path.as_ref();
        let file = std::fs::File::open(path).map_err(|source| ReferenceError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_reader(file)
    }

    /// Parse `alias,canonical` CSV content.
    pub fn from_reader<R: Read>(reader: R) -> ReferenceResult<Self> {
        let mut table = Self::default();
        let mut csv_reader = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
        for row in csv_reader.deserialize::<SynonymRow>() {
            let row = row?;
            table.insert(&row.alias, &row.canonical);
        }
        Ok(table)
    }

    /// Add or replace an entry.
    pub fn insert(&mut self, alias: &str, canonical: &str) {
        let key = normalize(alias);
        if key.is_empty() {
            return;
        }
        self.entries.insert(key, normalize(canonical));
    }

    /// Look up an already-normalized key.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Derives candidate lookup keys from raw treatment names.
#[derive(Debug, Clone, Default)]
pub struct AliasExpander {
    synonyms: SynonymTable,
}

impl AliasExpander {
    pub fn new(synonyms: SynonymTable) -> Self {
        Self { synonyms }
    }

    /// Expander backed by the embedded synonym table.
    pub fn with_embedded_synonyms() -> ReferenceResult<Self> {
        Ok(Self::new(SynonymTable::embedded()?))
    }

    pub fn synonyms(&self) -> &SynonymTable {
        &self.synonyms
    }

    /// Expand a raw name into its ordered candidate key set.
    ///
    /// The first key is always `normalize(raw)`, even when empty.
    pub fn expand(&self, raw: &str) -> CandidateKeySet {
        let mut keys = CandidateKeySet::new();
        let seed = normalize(raw);
        keys.push(seed.clone());

        if let Some(caps) = PARENTHETICAL.captures(raw) {
            for part in [caps.get(1), caps.get(2)].into_iter().flatten() {
                let key = normalize(part.as_str());
                if !key.is_empty() {
                    keys.push(key);
                }
            }
        }

        let main_phrase = PARENTHETICAL_SPAN.replace_all(raw, "");
        let core = self.extract_core(&main_phrase);
        if !core.is_empty() && core != seed {
            keys.push(core);
        }

        keys
    }

    /// Reduce a verbose treatment description to its core ingredient.
    ///
    /// Synonym-table hits win outright; otherwise dose qualifiers, routes,
    /// dosage forms, dose amounts and frequency codes are stripped in order.
    pub fn extract_core(&self, raw: &str) -> String {
        let normalized = normalize(raw);
        if let Some(canonical) = self.synonyms.get(&normalized) {
            return canonical.to_string();
        }

        let mut result = normalized;
        for rule in STRIP_RULES.iter() {
            result = rule.replace_all(&result, "").into_owned();
        }
        collapse_whitespace(&result)
    }
}
