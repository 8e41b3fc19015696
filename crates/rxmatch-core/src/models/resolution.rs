//! Match models produced by the resolver.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::ReferenceRecord;

/// Ordered, duplicate-free lookup keys derived from one treatment name.
///
/// Order is precedence: the most literal key comes first.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateKeySet {
    keys: Vec<String>,
}

impl CandidateKeySet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a key unless it is already present. Returns whether it was added.
    pub fn push(&mut self, key: impl Into<String>) -> bool {
        let key = key.into();
        if self.keys.contains(&key) {
            return false;
        }
        self.keys.push(key);
        true
    }

    pub fn keys(&self) -> &[String] {
        &self.keys
    }

    pub fn iter(&self) -> std::slice::Iter<'_, String> {
        self.keys.iter()
    }

    pub fn first(&self) -> Option<&str> {
        self.keys.first().map(String::as_str)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.keys.iter().any(|k| k == key)
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Keys joined for audit output.
    pub fn joined(&self, separator: &str) -> String {
        self.keys.join(separator)
    }
}

impl<'a> IntoIterator for &'a CandidateKeySet {
    type Item = &'a String;
    type IntoIter = std::slice::Iter<'a, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.keys.iter()
    }
}

impl<S: Into<String>> FromIterator<S> for CandidateKeySet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut set = CandidateKeySet::new();
        for key in iter {
            set.push(key);
        }
        set
    }
}

/// How a match was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchMethod {
    /// Exact hit on the primary normalized key
    Exact,
    /// Exact hit on the secondary clean-name key
    ExactCleanName,
    /// Similarity-scored fallback
    Fuzzy,
    /// Nothing cleared the bar
    None,
}

impl MatchMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            MatchMethod::Exact => "exact",
            MatchMethod::ExactCleanName => "exact_clean_name",
            MatchMethod::Fuzzy => "fuzzy",
            MatchMethod::None => "none",
        }
    }

    pub fn is_exact(&self) -> bool {
        matches!(self, MatchMethod::Exact | MatchMethod::ExactCleanName)
    }
}

impl fmt::Display for MatchMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Annotation outcome for one raw treatment name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchResult {
    /// Treatment name exactly as supplied
    pub input: String,
    /// Keys that were tried, in order
    pub candidates: CandidateKeySet,
    pub matched: bool,
    /// Resolved reference record
    pub record: Option<ReferenceRecord>,
    /// Label of the source that produced the match
    pub source: Option<String>,
    /// Candidate key that produced the match
    pub matched_key: Option<String>,
    pub method: MatchMethod,
    /// Confidence in [0, 1]
    pub confidence: f64,
}

impl MatchResult {
    /// A result with no match.
    pub fn unmatched(input: impl Into<String>, candidates: CandidateKeySet) -> Self {
        Self {
            input: input.into(),
            candidates,
            matched: false,
            record: None,
            source: None,
            matched_key: None,
            method: MatchMethod::None,
            confidence: 0.0,
        }
    }

    pub fn identifier(&self) -> Option<&str> {
        self.record.as_ref().map(|r| r.identifier.as_str())
    }

    pub fn display_name(&self) -> Option<&str> {
        self.record.as_ref().map(|r| r.display_name.as_str())
    }
}
