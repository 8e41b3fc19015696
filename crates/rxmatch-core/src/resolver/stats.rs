//! Aggregate counts over a batch of match results.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::models::{MatchMethod, MatchResult};

/// Exact / fuzzy split for one source.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceTally {
    pub exact: usize,
    pub fuzzy: usize,
}

impl SourceTally {
    pub fn total(&self) -> usize {
        self.exact + self.fuzzy
    }
}

/// Summary statistics for an annotation run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnnotationStats {
    pub total: usize,
    pub matched: usize,
    pub unmatched: usize,
    /// Matches per source label
    pub by_source: BTreeMap<String, SourceTally>,
    /// Results per method (`exact`, `exact_clean_name`, `fuzzy`, `none`)
    pub by_method: BTreeMap<String, usize>,
}

impl AnnotationStats {
    pub fn from_results(results: &[MatchResult]) -> Self {
        let mut stats = Self {
            total: results.len(),
            ..Self::default()
        };

        for result in results {
            *stats
                .by_method
                .entry(result.method.as_str().to_string())
                .or_default() += 1;

            if !result.matched {
                stats.unmatched += 1;
                continue;
            }
            stats.matched += 1;

            let label = result.source.clone().unwrap_or_default();
            let tally = stats.by_source.entry(label).or_default();
            match result.method {
                MatchMethod::Fuzzy => tally.fuzzy += 1,
                _ => tally.exact += 1,
            }
        }

        stats
    }

    /// Matched share in percent (0 for an empty batch).
    pub fn match_rate(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.matched as f64 * 100.0 / self.total as f64
        }
    }

    pub fn log_summary(&self) {
        info!(
            total = self.total,
            matched = self.matched,
            unmatched = self.unmatched,
            match_rate = %format_args!("{:.1}%", self.match_rate()),
            "annotation complete"
        );
        for (source, tally) in &self.by_source {
            info!(
                source = %source,
                exact = tally.exact,
                fuzzy = tally.fuzzy,
                "matches by source"
            );
        }
    }
}
