//! Subcommand implementations.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use tracing::{info, info_span, warn};

use rxmatch_core::export::{save_annotations, RunSummary};
use rxmatch_core::fetch::{fetch_all, save_supplements, FetchLimits, HttpSupplementPages};
use rxmatch_core::input::load_treatment_names;
use rxmatch_core::reference::{load_reference_records, save_reference_records};
use rxmatch_core::resolver::{AliasExpander, AnnotationStats, Annotator, SynonymTable};
use rxmatch_core::rrf::{ingest_conso_file, CurationFilter};
use rxmatch_core::unify::{
    embedded_mapping, load_mapping, unify, verify_pairs, PairStatus, UnificationStats,
    DEFAULT_VERIFICATION_PAIRS,
};
use rxmatch_core::{RxMatchConfig, UnificationMapping};

use crate::cli::{AnnotateArgs, FetchArgs, IngestRrfArgs, UnifyArgs, VerifyArgs};

/// Configuration from `--config`, or the built-in defaults.
pub fn load_config(path: Option<&Path>) -> Result<RxMatchConfig> {
    match path {
        Some(path) => RxMatchConfig::load(path)
            .with_context(|| format!("load configuration {}", path.display())),
        None => Ok(RxMatchConfig::default()),
    }
}

pub fn run_annotate(args: &AnnotateArgs, config: &RxMatchConfig) -> Result<()> {
    let span = info_span!("annotate", input = %args.input.display());
    let _guard = span.enter();

    let names = load_treatment_names(&args.input).context("load treatment names")?;
    let annotator = Annotator::from_config(config).context("load reference sources")?;

    let results = annotator.annotate(&names);
    save_annotations(&args.output, &results)
        .with_context(|| format!("write {}", args.output.display()))?;
    info!(output = %args.output.display(), rows = results.len(), "annotations written");

    let stats = AnnotationStats::from_results(&results);
    stats.log_summary();

    if let Some(path) = &args.summary {
        RunSummary::new(Some(args.input.as_path()), stats.clone(), annotator.statuses())
            .save(path)
            .with_context(|| format!("write {}", path.display()))?;
        info!(summary = %path.display(), "run summary written");
    }

    println!(
        "Annotated {} names: {} matched ({:.1}%), {} unmatched",
        stats.total,
        stats.matched,
        stats.match_rate(),
        stats.unmatched
    );
    for (source, tally) in &stats.by_source {
        println!("  {source}: {} exact, {} fuzzy", tally.exact, tally.fuzzy);
    }
    Ok(())
}

pub fn run_unify(args: &UnifyArgs, config: &RxMatchConfig) -> Result<()> {
    let records = load_reference_records(&args.reference)
        .with_context(|| format!("load {}", args.reference.display()))?;
    let mapping = resolve_mapping(args.mappings.as_deref(), config)?;

    let (records, report) = unify(records, &mapping);

    let output = args
        .output
        .clone()
        .unwrap_or_else(|| sibling_with_suffix(&args.reference, "_unified"));
    save_reference_records(&output, &records)
        .with_context(|| format!("write {}", output.display()))?;

    println!(
        "Unified {} records using {} of {} mappings -> {}",
        report.applied,
        report.valid_entries,
        mapping.len(),
        output.display()
    );
    for rejected in &report.rejected {
        println!(
            "  rejected {} -> {}: {}",
            rejected.entry.source_id, rejected.entry.target_id, rejected.reason
        );
    }
    print_stats(&UnificationStats::compute(&records));
    Ok(())
}

pub fn run_verify(args: &VerifyArgs) -> Result<()> {
    let records = load_reference_records(&args.reference)
        .with_context(|| format!("load {}", args.reference.display()))?;

    let checks = verify_pairs(&records, DEFAULT_VERIFICATION_PAIRS);
    let mut unified = 0;
    for check in &checks {
        match &check.status {
            PairStatus::Unified {
                identifier,
                group_size,
            } => {
                unified += 1;
                println!(
                    "  ok    {:12} = {:15} ({identifier}, {group_size} records)",
                    check.brand, check.generic
                );
            }
            PairStatus::Split {
                brand_id,
                generic_id,
            } => println!(
                "  split {:12} = {:15} ({brand_id} vs {generic_id})",
                check.brand, check.generic
            ),
            PairStatus::NotFound => println!(
                "  ?     {:12} = {:15} (one or both not found)",
                check.brand, check.generic
            ),
        }
    }
    println!(
        "Unified pairs: {unified}/{} ({:.1}%)",
        checks.len(),
        unified as f64 * 100.0 / checks.len().max(1) as f64
    );
    print_stats(&UnificationStats::compute(&records));
    Ok(())
}

pub fn run_ingest_rrf(args: &IngestRrfArgs, config: &RxMatchConfig) -> Result<()> {
    let expander = match &config.synonyms_path {
        Some(path) => AliasExpander::new(SynonymTable::from_path(path)?),
        None => AliasExpander::with_embedded_synonyms()?,
    };

    let outcome = ingest_conso_file(&args.rrf, &CurationFilter::default(), &expander)
        .with_context(|| format!("ingest {}", args.rrf.display()))?;
    if outcome.records.is_empty() {
        bail!("no suitable entries found in {}", args.rrf.display());
    }

    let records = if args.skip_unify {
        outcome.records
    } else {
        let mapping = resolve_mapping(None, config)?;
        let (records, report) = unify(outcome.records, &mapping);
        println!(
            "Unified {} records ({} mappings rejected)",
            report.applied,
            report.rejected.len()
        );
        records
    };

    save_reference_records(&args.output, &records)
        .with_context(|| format!("write {}", args.output.display()))?;
    println!(
        "Read {} rows, kept {}, wrote {} records -> {}",
        outcome.stats.rows_read,
        outcome.stats.kept,
        records.len(),
        args.output.display()
    );
    print_stats(&UnificationStats::compute(&records));
    Ok(())
}

pub fn run_fetch_supplements(args: &FetchArgs) -> Result<()> {
    let pages = HttpSupplementPages::from_env()
        .context("configure supplement API client")?
        .include_inactive(args.all);
    let limits = FetchLimits {
        max_rows: args.max_rows,
        ..FetchLimits::default()
    };

    let outcome = fetch_all(&pages, &limits);
    if let Some(error) = &outcome.error {
        if outcome.records.is_empty() {
            bail!("supplement fetch failed: {error}");
        }
        warn!(error = %error, kept = outcome.records.len(), "saving partial results");
    }

    save_supplements(&args.output, &outcome.records)
        .with_context(|| format!("write {}", args.output.display()))?;
    let active = outcome.records.iter().filter(|r| r.active).count();
    println!(
        "Fetched {} supplements ({active} active) in {} pages -> {}",
        outcome.records.len(),
        outcome.pages,
        args.output.display()
    );
    Ok(())
}

/// `--mappings`, else the configured table, else the embedded one.
fn resolve_mapping(flag: Option<&Path>, config: &RxMatchConfig) -> Result<UnificationMapping> {
    match flag.or(config.mappings_path.as_deref()) {
        Some(path) => load_mapping(path).with_context(|| format!("load mappings {}", path.display())),
        None => embedded_mapping().context("load embedded mappings"),
    }
}

fn sibling_with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "reference".to_string());
    path.with_file_name(format!("{stem}{suffix}.csv"))
}

fn print_stats(stats: &UnificationStats) {
    println!("Total records: {}", stats.total_records);
    println!("Unique identifiers: {}", stats.unique_identifiers);
    println!("Unified groups: {}", stats.unified_groups);
    println!("Records in unified groups: {}", stats.records_in_groups);
    println!("Unification coverage: {:.1}%", stats.coverage());
}
