//! RxMatch Core Library
//!
//! Maps free-text treatment names onto canonical drug identifiers drawn from
//! a clinical drug dictionary (RxNorm) and a supplement catalogue.
//!
//! # Architecture
//!
//! ```text
//!   RXNCONSO.RRF ──► Curation ──► Unifier ──► reference CSV
//!                                                  │
//!   Supplement API ──► supplements CSV             │
//!                            │                     │
//!                            ▼                     ▼
//!                    ┌──────────────────────────────────┐
//!                    │   Reference Index (per source)   │
//!                    └─────────────────┬────────────────┘
//!                                      │
//!   raw name ──► Normalizer ──► Alias Expander ──► Matcher ──► MatchResult
//!                                                   exact → clean → fuzzy,
//!                                                   sources in priority order
//! ```
//!
//! # Core Principle
//!
//! **Deterministic output.** Identical inputs and reference data always give
//! identical results; every statistic is derived from the results.
//!
//! # Modules
//!
//! - [`models`]: Domain types (ReferenceRecord, CandidateKeySet, MatchResult, ...)
//! - [`resolver`]: Normalizer, alias expander, matcher and batch annotator
//! - [`reference`]: Reference dataset loading and indexing
//! - [`unify`]: Brand→generic identifier unification and verification
//! - [`rrf`]: RxNorm release ingestion
//! - [`fetch`]: Supplement catalogue API client
//! - [`export`]: Annotation CSV and run summaries
//! - [`input`]: Treatment-name input files
//! - [`config`]: TOML run configuration

pub mod assets;
pub mod config;
pub mod export;
pub mod fetch;
pub mod input;
pub mod models;
pub mod reference;
pub mod resolver;
pub mod rrf;
pub mod unify;

// Re-export commonly used types
pub use config::RxMatchConfig;
pub use models::{
    CandidateKeySet, MappingEntry, MatchMethod, MatchResult, ReferenceRecord, TermType,
    UnificationMapping,
};
pub use reference::{ReferenceIndex, ReferenceIndexBuilder, SourceIndex};
pub use resolver::{normalize, AliasExpander, Annotator, Matcher};
pub use unify::unify;
