//! Layered exact → fuzzy matching against prioritized reference sources.
//!
//! Precedence, in order:
//! - sources in the configured priority order; the first source that yields
//!   an accepted match wins and later sources are not consulted
//! - within a source, every candidate key (in order) is tried against each
//!   lookup kind (in order); the first exact hit wins with confidence 1.0
//! - otherwise, if the source allows it, the best similarity score over all
//!   candidate keys and indexed names is accepted when it reaches the
//!   source's `min_confidence`
//!
//! Fuzzy fallback is a linear scan of the index per unmatched name. Fine for
//! dictionaries in the tens of thousands; larger ones would need an n-gram
//! or token pre-filter.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use similar::{DiffTag, TextDiff};

use crate::config::MatchingConfig;
use crate::models::{CandidateKeySet, MatchMethod, MatchResult, ReferenceRecord};
use crate::reference::ReferenceIndex;

/// Which exact-lookup map to consult.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LookupKind {
    /// Primary normalized-name map
    Primary,
    /// Secondary clean-name map
    Clean,
}

impl LookupKind {
    fn lookup<'a>(&self, index: &'a ReferenceIndex, key: &str) -> Option<&'a ReferenceRecord> {
        match self {
            LookupKind::Primary => index.get(key),
            LookupKind::Clean => index.get_clean(key),
        }
    }

    fn method(&self) -> MatchMethod {
        match self {
            LookupKind::Primary => MatchMethod::Exact,
            LookupKind::Clean => MatchMethod::ExactCleanName,
        }
    }
}

/// One reference index with its acceptance settings.
#[derive(Debug, Clone)]
pub struct MatchSource {
    pub index: ReferenceIndex,
    /// Minimum fuzzy score accepted from this source
    pub min_confidence: f64,
    /// Whether fuzzy fallback runs for this source
    pub fuzzy: bool,
}

impl MatchSource {
    pub fn new(index: ReferenceIndex, min_confidence: f64, fuzzy: bool) -> Self {
        Self {
            index,
            min_confidence,
            fuzzy,
        }
    }

    pub fn label(&self) -> &str {
        self.index.label()
    }
}

/// Similarity scoring for fuzzy fallback.
///
/// Score = max of the character sequence ratio, the containment floor
/// (when one key contains the other) and weighted token Jaccard overlap.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FuzzyScorer {
    pub containment_floor: f64,
    pub token_overlap_weight: f64,
}

impl Default for FuzzyScorer {
    fn default() -> Self {
        Self {
            containment_floor: 0.8,
            token_overlap_weight: 0.9,
        }
    }
}

impl FuzzyScorer {
    /// Score two normalized keys in [0, 1]. Empty keys score 0.
    pub fn score(&self, a: &str, b: &str) -> f64 {
        if a.is_empty() || b.is_empty() {
            return 0.0;
        }

        let mut similarity = sequence_ratio(a, b);

        if a.contains(b) || b.contains(a) {
            similarity = similarity.max(self.containment_floor);
        }

        let a_tokens: HashSet<&str> = a.split_whitespace().collect();
        let b_tokens: HashSet<&str> = b.split_whitespace().collect();
        let union = a_tokens.union(&b_tokens).count();
        if union > 0 {
            let overlap = a_tokens.intersection(&b_tokens).count() as f64 / union as f64;
            similarity = similarity.max(overlap * self.token_overlap_weight);
        }

        similarity
    }
}

/// `2·M / T` over characters, where `M` counts characters in matching runs
/// and `T` is the combined length. A transposition costs one match, not two.
pub fn sequence_ratio(a: &str, b: &str) -> f64 {
    let total = a.chars().count() + b.chars().count();
    if total == 0 {
        return 1.0;
    }
    let diff = TextDiff::from_chars(a, b);
    let matched: usize = diff
        .ops()
        .iter()
        .map(|op| op.as_tag_tuple())
        .filter(|(tag, _, _)| *tag == DiffTag::Equal)
        .map(|(_, old, _)| old.len())
        .sum();
    2.0 * matched as f64 / total as f64
}

/// Best fuzzy candidate within one index.
#[derive(Debug, Clone, PartialEq)]
pub struct FuzzyHit<'a> {
    pub key: &'a str,
    pub record: &'a ReferenceRecord,
    pub score: f64,
}

/// Ordered matching policy.
#[derive(Debug, Clone, PartialEq)]
pub struct Matcher {
    lookup_order: Vec<LookupKind>,
    scorer: FuzzyScorer,
}

impl Default for Matcher {
    fn default() -> Self {
        Self::new(vec![LookupKind::Primary, LookupKind::Clean], FuzzyScorer::default())
    }
}

impl Matcher {
    pub fn new(lookup_order: Vec<LookupKind>, scorer: FuzzyScorer) -> Self {
        Self {
            lookup_order,
            scorer,
        }
    }

    pub fn from_config(config: &MatchingConfig) -> Self {
        Self::new(
            config.lookup_order.clone(),
            FuzzyScorer {
                containment_floor: config.containment_floor,
                token_overlap_weight: config.token_overlap_weight,
            },
        )
    }

    pub fn scorer(&self) -> &FuzzyScorer {
        &self.scorer
    }

    /// Resolve one name's candidate keys against the sources, in order.
    pub fn resolve(
        &self,
        input: &str,
        candidates: CandidateKeySet,
        sources: &[MatchSource],
    ) -> MatchResult {
        for source in sources {
            if let Some((key, record, method)) = self.exact(&candidates, &source.index) {
                let (key, record) = (key.to_string(), record.clone());
                return accepted(input, candidates, source, key, record, method, 1.0);
            }

            if !source.fuzzy {
                continue;
            }
            if let Some(hit) = self.best_fuzzy(&candidates, &source.index) {
                if hit.score >= source.min_confidence {
                    let (key, record, score) = (hit.key.to_string(), hit.record.clone(), hit.score);
                    return accepted(input, candidates, source, key, record, MatchMethod::Fuzzy, score);
                }
            }
        }

        MatchResult::unmatched(input, candidates)
    }

    /// First exact hit, candidate-major then lookup kind.
    pub fn exact<'a>(
        &self,
        candidates: &'a CandidateKeySet,
        index: &'a ReferenceIndex,
    ) -> Option<(&'a str, &'a ReferenceRecord, MatchMethod)> {
        candidates
            .iter()
            .filter(|key| !key.is_empty())
            .find_map(|key| {
                self.lookup_order
                    .iter()
                    .find_map(|kind| kind.lookup(index, key).map(|r| (key.as_str(), r, kind.method())))
            })
    }

    /// Highest-scoring (candidate key, indexed name) pair.
    ///
    /// Ties keep the earlier candidate key, then the earlier indexed record.
    pub fn best_fuzzy<'a>(
        &self,
        candidates: &'a CandidateKeySet,
        index: &'a ReferenceIndex,
    ) -> Option<FuzzyHit<'a>> {
        let mut best: Option<FuzzyHit<'a>> = None;
        for key in candidates.iter().filter(|k| !k.is_empty()) {
            for (reference_key, record) in index.primary_entries() {
                let score = self.scorer.score(key, reference_key);
                if score > best.as_ref().map_or(0.0, |b| b.score) {
                    best = Some(FuzzyHit {
                        key: key.as_str(),
                        record,
                        score,
                    });
                }
            }
        }
        best
    }
}

fn accepted(
    input: &str,
    candidates: CandidateKeySet,
    source: &MatchSource,
    key: String,
    record: ReferenceRecord,
    method: MatchMethod,
    confidence: f64,
) -> MatchResult {
    MatchResult {
        input: input.to_string(),
        candidates,
        matched: true,
        record: Some(record),
        source: Some(source.label().to_string()),
        matched_key: Some(key),
        method,
        confidence,
    }
}
