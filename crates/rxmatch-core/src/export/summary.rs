//! Machine-readable run summaries.

use std::path::Path;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{create_file, ExportResult};
use crate::resolver::{AnnotationStats, SourceStatus};

/// Summary of one annotation run.
///
/// Two runs with equal source digests used identical reference data.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSummary {
    /// Unique run id
    pub run_id: String,
    /// RFC 3339 timestamp
    pub generated_at: String,
    /// Input file, when the names came from one
    pub input: Option<String>,
    /// Names annotated after de-duplication
    pub input_names: usize,
    pub stats: AnnotationStats,
    /// Matched share in percent
    pub match_rate: f64,
    /// Every configured source in priority order
    pub sources: Vec<SourceStatus>,
}

impl RunSummary {
    pub fn new(input: Option<&Path>, stats: AnnotationStats, sources: &[SourceStatus]) -> Self {
        Self {
            run_id: Uuid::new_v4().to_string(),
            generated_at: Utc::now().to_rfc3339(),
            input: input.map(|p| p.display().to_string()),
            input_names: stats.total,
            match_rate: (stats.match_rate() * 10.0).round() / 10.0,
            stats,
            sources: sources.to_vec(),
        }
    }

    /// Export to JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> ExportResult<()> {
        let file = create_file(path.as_ref())?;
        serde_json::to_writer_pretty(file, self)?;
        Ok(())
    }
}
