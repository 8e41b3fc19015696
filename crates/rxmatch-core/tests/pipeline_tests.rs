//! End-to-end annotation tests over file-backed reference sources.

use std::path::{Path, PathBuf};

use rxmatch_core::config::{RxMatchConfig, SourceConfig};
use rxmatch_core::export::{save_annotations, AnnotationRow, RunSummary};
use rxmatch_core::input::load_treatment_names;
use rxmatch_core::resolver::{AnnotationStats, Annotator, ResolverError};
use rxmatch_core::MatchMethod;

const RXNORM_CSV: &str = "\
normalized_name,clean_name,primary_RXCUI,DrugName,sources,preferred_term_type
tylenol,tylenol,161,Tylenol,RXNORM,BN
acetaminophen,acetaminophen,161,Acetaminophen,RXNORM|MTHSPL,IN
naltrexone,naltrexone,7242,Naltrexone,RXNORM,IN
ibuprofen,ibuprofen,643349,Ibuprofen,RXNORM,IN
advil,advil,643349,Advil,RXNORM,BN
metformin,metformin,6809,Metformin,RXNORM,IN
coenzyme q10,coenzyme q10,21406,Coenzyme Q10,RXNORM,IN
";

const SUPPLEMENTS_CSV: &str = "\
supplement_id,name,vendor_code,class,external_ref_id,active,description,vendor,dosage_form,strength,unit
S-100,Magnesium Glycinate Complex,MG1,Mineral,,true,,Acme,,,
S-200,Berberine HCl,BB2,Botanical,,true,,Acme,,,
";

fn write(dir: &Path, name: &str, content: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, content).unwrap();
    path
}

fn config(rxnorm: PathBuf, supplements: PathBuf) -> RxMatchConfig {
    RxMatchConfig {
        sources: vec![
            SourceConfig {
                paths: vec![rxnorm],
                ..SourceConfig::rxnorm()
            },
            SourceConfig {
                paths: vec![supplements],
                ..SourceConfig::supplements()
            },
        ],
        ..RxMatchConfig::default()
    }
}

fn annotator(dir: &Path) -> Annotator {
    let rxnorm = write(dir, "rxnorm.csv", RXNORM_CSV);
    let supplements = write(dir, "supplements.csv", SUPPLEMENTS_CSV);
    Annotator::from_config(&config(rxnorm, supplements)).unwrap()
}

#[test]
fn test_ldn_resolves_through_synonym_table() {
    let dir = tempfile::tempdir().unwrap();
    let result = annotator(dir.path()).annotate_one("Low Dose Naltrexone (LDN) 4.5mg");

    assert!(result.matched);
    assert_ne!(result.method, MatchMethod::None);
    assert_eq!(result.identifier(), Some("7242"));
    assert_eq!(result.display_name(), Some("Naltrexone"));
    assert_eq!(result.source.as_deref(), Some("rxnorm"));
}

#[test]
fn test_brand_and_generic_share_identifier() {
    let dir = tempfile::tempdir().unwrap();
    let annotator = annotator(dir.path());

    let brand = annotator.annotate_one("Advil");
    let generic = annotator.annotate_one("Ibuprofen 200mg tablet");

    assert_eq!(brand.identifier(), Some("643349"));
    assert_eq!(generic.identifier(), Some("643349"));
    assert_eq!(generic.matched_key.as_deref(), Some("ibuprofen"));
}

#[test]
fn test_batch_annotation() {
    let dir = tempfile::tempdir().unwrap();
    let annotator = annotator(dir.path());
    let input = write(
        dir.path(),
        "treatments.txt",
        "Low Dose Naltrexone (LDN) 4.5mg\nAdvil\nadvil\n\nCoQ10\nMagnesium Glycinate\nUnobtainium 10mg\n",
    );

    let names = load_treatment_names(&input).unwrap();
    assert_eq!(names.len(), 5);

    let results = annotator.annotate(&names);
    let methods: Vec<MatchMethod> = results.iter().map(|r| r.method).collect();
    assert_eq!(
        methods,
        vec![
            MatchMethod::Exact,
            MatchMethod::Exact,
            MatchMethod::Exact,
            MatchMethod::Fuzzy,
            MatchMethod::None,
        ]
    );

    let magnesium = &results[3];
    assert_eq!(magnesium.source.as_deref(), Some("supplements"));
    assert_eq!(magnesium.identifier(), Some("S-100"));
    // 19 shared characters over 46; above the containment floor
    assert!((magnesium.confidence - 38.0 / 46.0).abs() < 1e-9);

    let stats = AnnotationStats::from_results(&results);
    assert_eq!(stats.matched, 4);
    assert_eq!(stats.by_source["rxnorm"].exact, 3);
    assert_eq!(stats.by_source["supplements"].fuzzy, 1);

    let output = dir.path().join("annotated.csv");
    save_annotations(&output, &results).unwrap();
    let rows: Vec<AnnotationRow> = csv::Reader::from_path(&output)
        .unwrap()
        .deserialize()
        .collect::<Result<_, _>>()
        .unwrap();
    assert_eq!(rows.len(), 5);
    assert_eq!(rows[2].treatment_name, "CoQ10");
    assert_eq!(rows[2].identifier, "21406");
    assert_eq!(rows[2].candidate_keys, "coq10|coenzyme q10");
    assert!(!rows[4].matched);

    let summary = RunSummary::new(Some(input.as_path()), stats, annotator.statuses());
    assert_eq!(summary.sources.len(), 2);
    assert!(summary.sources.iter().all(|s| s.available));
}

#[test]
fn test_runs_are_deterministic() {
    let dir = tempfile::tempdir().unwrap();
    let names = ["Tylenol (Acetaminophen)", "Berberine", "Metformin ER 750 mg"];

    let first = annotator(dir.path()).annotate(&names);
    let second = annotator(dir.path()).annotate(&names);

    assert_eq!(first, second);
    assert_eq!(
        annotator(dir.path()).statuses()[0].digest,
        annotator(dir.path()).statuses()[0].digest
    );
}

#[test]
fn test_missing_supplements_still_annotates() {
    let dir = tempfile::tempdir().unwrap();
    let rxnorm = write(dir.path(), "rxnorm.csv", RXNORM_CSV);
    let annotator =
        Annotator::from_config(&config(rxnorm, dir.path().join("absent.csv"))).unwrap();

    assert_eq!(annotator.sources().len(), 1);
    assert!(!annotator.statuses()[1].available);
    assert!(!annotator.annotate_one("Magnesium Glycinate").matched);
    assert!(annotator.annotate_one("Tylenol").matched);
}

#[test]
fn test_no_sources_is_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let result = Annotator::from_config(&config(
        dir.path().join("absent-rxnorm.csv"),
        dir.path().join("absent-supplements.csv"),
    ));

    assert!(matches!(result, Err(ResolverError::NoSourcesAvailable(_))));
}
