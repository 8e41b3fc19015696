//! Treatment-name resolver.
//!
//! Pipeline: Normalization → Alias Expansion → Exact Lookup → Fuzzy Fallback

mod expander;
mod matcher;
mod normalizer;
mod stats;

pub use expander::*;
pub use matcher::*;
pub use normalizer::*;
pub use stats::*;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::config::RxMatchConfig;
use crate::models::MatchResult;
use crate::reference::{open_source, ReferenceError, ReferenceIndex, SourceIndex};

/// Resolver errors.
#[derive(Error, Debug)]
pub enum ResolverError {
    #[error("Reference error: {0}")]
    Reference(#[from] ReferenceError),

    #[error("No reference source is available: {0}")]
    NoSourcesAvailable(String),
}

pub type ResolverResult<T> = Result<T, ResolverError>;

/// Load state of one configured source, for run summaries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceStatus {
    pub label: String,
    pub available: bool,
    /// Indexed records (0 when unavailable)
    pub records: usize,
    /// Content digest of the index
    pub digest: Option<String>,
    /// Why the source could not be used
    pub reason: Option<String>,
}

impl SourceStatus {
    fn from_index(index: &ReferenceIndex) -> Self {
        Self {
            label: index.label().to_string(),
            available: true,
            records: index.len(),
            digest: Some(index.digest().to_string()),
            reason: None,
        }
    }

    fn from_source(source: &SourceIndex) -> Self {
        match source {
            SourceIndex::Available(index) => Self::from_index(index),
            SourceIndex::Unavailable { label, reason } => Self {
                label: label.clone(),
                available: false,
                records: 0,
                digest: None,
                reason: Some(reason.clone()),
            },
        }
    }
}

/// Runs expansion and matching over a batch of treatment names.
///
/// Indexes are read-only once built, so one annotator can be shared across
/// threads.
pub struct Annotator {
    expander: AliasExpander,
    matcher: Matcher,
    sources: Vec<MatchSource>,
    statuses: Vec<SourceStatus>,
    progress_interval: usize,
}

impl Annotator {
    /// Create an annotator over already-built sources, in priority order.
    pub fn new(expander: AliasExpander, matcher: Matcher, sources: Vec<MatchSource>) -> Self {
        let statuses = sources
            .iter()
            .map(|s| SourceStatus::from_index(&s.index))
            .collect();
        Self {
            expander,
            matcher,
            sources,
            statuses,
            progress_interval: 0,
        }
    }

    /// Load synonyms and every configured source.
    ///
    /// Missing datasets are skipped with a warning; it is an error only when
    /// none of them can be loaded.
    pub fn from_config(config: &RxMatchConfig) -> ResolverResult<Self> {
        let synonyms = match &config.synonyms_path {
            Some(path) => SynonymTable::from_path(path)?,
            None => SynonymTable::embedded()?,
        };
        debug!(entries = synonyms.len(), "synonym table ready");

        let mut sources = Vec::new();
        let mut statuses = Vec::new();
        for source_config in &config.sources {
            let source = open_source(source_config)?;
            statuses.push(SourceStatus::from_source(&source));
            if let SourceIndex::Available(index) = source {
                sources.push(MatchSource::new(
                    index,
                    source_config.min_confidence,
                    source_config.fuzzy,
                ));
            }
        }

        if sources.is_empty() {
            let reasons = statuses
                .iter()
                .map(|s| format!("{}: {}", s.label, s.reason.as_deref().unwrap_or("not loaded")))
                .collect::<Vec<_>>()
                .join("; ");
            return Err(ResolverError::NoSourcesAvailable(reasons));
        }

        for status in statuses.iter().filter(|s| !s.available) {
            warn!(source = %status.label, "continuing without reference source");
        }

        Ok(Self {
            expander: AliasExpander::new(synonyms),
            matcher: Matcher::from_config(&config.matching),
            sources,
            statuses,
            progress_interval: config.matching.progress_interval,
        })
    }

    /// Log progress every `interval` names (0 disables).
    pub fn with_progress_interval(mut self, interval: usize) -> Self {
        self.progress_interval = interval;
        self
    }

    pub fn expander(&self) -> &AliasExpander {
        &self.expander
    }

    pub fn matcher(&self) -> &Matcher {
        &self.matcher
    }

    /// Available sources in priority order.
    pub fn sources(&self) -> &[MatchSource] {
        &self.sources
    }

    /// Every configured source, available or not.
    pub fn statuses(&self) -> &[SourceStatus] {
        &self.statuses
    }

    /// Annotate a single treatment name.
    pub fn annotate_one(&self, raw: &str) -> MatchResult {
        let candidates = self.expander.expand(raw);
        self.matcher.resolve(raw, candidates, &self.sources)
    }

    /// Annotate names in order; output position i corresponds to input i.
    pub fn annotate<S: AsRef<str>>(&self, names: &[S]) -> Vec<MatchResult> {
        let total = names.len();
        info!(total, sources = self.sources.len(), "annotating treatment names");

        names
            .iter()
            .enumerate()
            .map(|(i, name)| {
                if self.progress_interval > 0 && i > 0 && i % self.progress_interval == 0 {
                    debug!(processed = i, total, "annotation progress");
                }
                self.annotate_one(name.as_ref())
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SourceConfig;
    use crate::models::{MatchMethod, RawReferenceRow};
    use crate::reference::ReferenceIndexBuilder;
    use std::path::PathBuf;

    fn rxnorm() -> MatchSource {
        let rows = [
            ("naltrexone", "7242", "Naltrexone", "IN"),
            ("acetaminophen", "161", "Acetaminophen", "IN"),
            ("ibuprofen", "643349", "Ibuprofen", "IN"),
        ];
        let index = ReferenceIndexBuilder::new("rxnorm").build(rows.iter().map(
            |(key, id, name, tty)| RawReferenceRow {
                key: Some(key.to_string()),
                identifier: id.to_string(),
                display_name: name.to_string(),
                term_type: Some(tty.to_string()),
                ..RawReferenceRow::default()
            },
        ));
        MatchSource::new(index, 0.85, true)
    }

    fn annotator() -> Annotator {
        Annotator::new(
            AliasExpander::with_embedded_synonyms().unwrap(),
            Matcher::default(),
            vec![rxnorm()],
        )
    }

    #[test]
    fn test_annotate_preserves_order() {
        let names = ["Advil", "Low Dose Naltrexone (LDN) 4.5mg", "Unobtainium"];
        let results = annotator().annotate(&names);

        assert_eq!(results.len(), 3);
        assert_eq!(results[0].input, "Advil");
        assert!(!results[0].matched);
        assert_eq!(results[1].identifier(), Some("7242"));
        assert!(results[1].method.is_exact());
        assert_eq!(results[2].method, MatchMethod::None);
    }

    #[test]
    fn test_parenthetical_brand_resolves_generic() {
        let result = annotator().annotate_one("Tylenol (Acetaminophen)");
        assert_eq!(result.identifier(), Some("161"));
        assert_eq!(result.matched_key.as_deref(), Some("acetaminophen"));
    }

    #[test]
    fn test_statuses_for_prebuilt_sources() {
        let annotator = annotator();
        assert_eq!(annotator.statuses().len(), 1);
        assert!(annotator.statuses()[0].available);
        assert_eq!(annotator.statuses()[0].records, 3);
    }

    #[test]
    fn test_all_sources_missing_is_fatal() {
        let config = RxMatchConfig {
            sources: vec![SourceConfig {
                label: "rxnorm".into(),
                paths: vec![PathBuf::from("/nope/rxnorm.csv")],
                ..SourceConfig::default()
            }],
            ..RxMatchConfig::default()
        };

        let err = Annotator::from_config(&config).err().unwrap();
        assert!(matches!(err, ResolverError::NoSourcesAvailable(_)));
        assert!(err.to_string().contains("rxnorm"));
    }

    #[test]
    fn test_missing_secondary_source_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rxnorm.csv");
        std::fs::write(
            &path,
            "normalized_name,clean_name,primary_RXCUI,DrugName,sources,preferred_term_type\n\
             metformin,metformin,6809,Metformin,RXNORM,IN\n",
        )
        .unwrap();

        let config = RxMatchConfig {
            sources: vec![
                SourceConfig {
                    paths: vec![path],
                    ..SourceConfig::rxnorm()
                },
                SourceConfig {
                    paths: vec![dir.path().join("supplements.csv")],
                    ..SourceConfig::supplements()
                },
            ],
            ..RxMatchConfig::default()
        };

        let annotator = Annotator::from_config(&config).unwrap();
        assert_eq!(annotator.sources().len(), 1);
        assert_eq!(annotator.statuses().len(), 2);
        assert!(!annotator.statuses()[1].available);

        let result = annotator.annotate_one("Metformin 500mg");
        assert_eq!(result.identifier(), Some("6809"));
    }
}
