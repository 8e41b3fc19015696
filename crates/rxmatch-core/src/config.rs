//! Run configuration.
//!
//! Loaded from TOML; every field has a default so a missing file, or a file
//! that only overrides a threshold, is valid.
//!
//! ```toml
//! [matching]
//! containment_floor = 0.8
//! token_overlap_weight = 0.9
//!
//! [[sources]]
//! label = "rxnorm"
//! paths = ["data/rxnorm_core_medications.csv"]
//! min_confidence = 0.85
//! fuzzy = true
//! ```

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::reference::ColumnMap;
use crate::resolver::LookupKind;

/// Configuration errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

/// Top-level configuration for an annotation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RxMatchConfig {
    pub matching: MatchingConfig,
    /// Reference sources in priority order
    pub sources: Vec<SourceConfig>,
    /// Replaces the embedded synonym table
    pub synonyms_path: Option<PathBuf>,
    /// Replaces the embedded brand→generic mapping table
    pub mappings_path: Option<PathBuf>,
}

impl Default for RxMatchConfig {
    fn default() -> Self {
        Self {
            matching: MatchingConfig::default(),
            sources: vec![SourceConfig::rxnorm(), SourceConfig::supplements()],
            synonyms_path: None,
            mappings_path: None,
        }
    }
}

/// Fuzzy-scoring constants and lookup order.
///
/// The floors were tuned on one labelled batch; re-validate before reuse
/// on a different population.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchingConfig {
    /// Score floor when one key contains the other
    pub containment_floor: f64,
    /// Multiplier applied to token Jaccard overlap
    pub token_overlap_weight: f64,
    /// Exact lookups tried for each candidate key, in order
    pub lookup_order: Vec<LookupKind>,
    /// Log progress every N names (0 disables)
    pub progress_interval: usize,
}

impl Default for MatchingConfig {
    fn default() -> Self {
        Self {
            containment_floor: 0.8,
            token_overlap_weight: 0.9,
            lookup_order: vec![LookupKind::Primary, LookupKind::Clean],
            progress_interval: 100,
        }
    }
}

/// One reference source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    pub label: String,
    /// Candidate locations; the first existing file is used
    pub paths: Vec<PathBuf>,
    /// Minimum fuzzy score accepted from this source
    pub min_confidence: f64,
    /// Whether fuzzy fallback runs for this source
    pub fuzzy: bool,
    pub columns: ColumnMap,
    /// Stable-sort rows by term-type priority before indexing
    pub prioritize_term_types: bool,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            label: String::new(),
            paths: Vec::new(),
            min_confidence: 0.6,
            fuzzy: true,
            columns: ColumnMap::default(),
            prioritize_term_types: true,
        }
    }
}

impl SourceConfig {
    /// Clinical drug dictionary. Its fuzzy hits must be strong enough to
    /// pre-empt the supplement source.
    pub fn rxnorm() -> Self {
        Self {
            label: "rxnorm".into(),
            paths: vec![PathBuf::from("data/rxnorm_core_medications.csv")],
            min_confidence: 0.85,
            fuzzy: true,
            columns: ColumnMap::rxnorm(),
            prioritize_term_types: true,
        }
    }

    /// Supplement catalogue fetched from the practice API.
    pub fn supplements() -> Self {
        Self {
            label: "supplements".into(),
            paths: vec![
                PathBuf::from("data/supplements.csv"),
                PathBuf::from("supplements.csv"),
            ],
            min_confidence: 0.6,
            fuzzy: true,
            columns: ColumnMap::supplements(),
            prioritize_term_types: false,
        }
    }
}

impl RxMatchConfig {
    /// Load from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> ConfigResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    /// Parse and validate TOML content.
    pub fn from_toml_str(content: &str) -> ConfigResult<Self> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Check thresholds and source labels.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.sources.is_empty() {
            return Err(ConfigError::Invalid("at least one source is required".into()));
        }
        let unit = |name: &str, value: f64| {
            if (0.0..=1.0).contains(&value) {
                Ok(())
            } else {
                Err(ConfigError::Invalid(format!("{name} must be in [0, 1], got {value}")))
            }
        };
        unit("containment_floor", self.matching.containment_floor)?;
        unit("token_overlap_weight", self.matching.token_overlap_weight)?;

        let mut labels = HashSet::new();
        for source in &self.sources {
            if source.label.trim().is_empty() {
                return Err(ConfigError::Invalid("source label must not be empty".into()));
            }
            if !labels.insert(source.label.as_str()) {
                return Err(ConfigError::Invalid(format!(
                    "duplicate source label '{}'",
                    source.label
                )));
            }
            unit(&format!("{}.min_confidence", source.label), source.min_confidence)?;
        }
        Ok(())
    }
}
