//! RXNCONSO ingestion through brand→generic unification to annotation.

use rxmatch_core::models::TermType;
use rxmatch_core::reference::{load_reference_records, save_reference_records};
use rxmatch_core::resolver::{AliasExpander, Annotator, MatchSource, Matcher};
use rxmatch_core::rrf::{ingest_conso, CurationFilter};
use rxmatch_core::unify::{embedded_mapping, verify_pairs, PairStatus, UnificationStats};
use rxmatch_core::{unify, ReferenceIndexBuilder, ReferenceRecord};

const CONSO: &str = "\
161|ENG||L1|PF|S1|Y|A1|||161|RXNORM|IN|161|acetaminophen|0|N|4096|
161|ENG||L1|PF|S2|Y|A2|||161|MTHSPL|IN|161|acetaminophen|0|N||
202433|ENG||L2|PF|S3|Y|A3|||202433|RXNORM|BN|202433|Tylenol|0|N||
202433|ENG||L3|PF|S4|Y|A4|||202433|RXNORM|SY|202433|Tylenol 325 MG Oral Tablet|0|N||
5640|ENG||L4|PF|S5|Y|A5|||5640|RXNORM|IN|5640|ibuprofen|0|N||
153010|ENG||L5|PF|S6|Y|A6|||153010|RXNORM|BN|153010|Advil|0|N||
643349|ENG||L6|PF|S7|Y|A7|||643349|RXNORM|SY|643349|Ibuprofen (USP)|0|N||
1191|ENG||L7|PF|S8|Y|A8|||1191|RXNORM|IN|1191|aspirin|0|N||
";

fn expander() -> AliasExpander {
    AliasExpander::with_embedded_synonyms().unwrap()
}

fn ingested() -> Vec<ReferenceRecord> {
    ingest_conso(CONSO.as_bytes(), &CurationFilter::default(), &expander())
        .unwrap()
        .records
}

fn ids(records: &[ReferenceRecord]) -> Vec<&str> {
    records.iter().map(|r| r.identifier.as_str()).collect()
}

#[test]
fn test_ingest_orders_by_term_type() {
    let records = ingested();

    assert_eq!(ids(&records), vec!["161", "5640", "1191", "202433", "153010", "643349"]);
    assert_eq!(records[0].sources, vec!["MTHSPL", "RXNORM"]);
    assert_eq!(records[5].term_type, TermType::Synonym);
}

#[test]
fn test_embedded_mapping_unifies_brands() {
    let mapping = embedded_mapping().unwrap();
    let (records, report) = unify(ingested(), &mapping);

    assert_eq!(ids(&records), vec!["161", "643349", "1191", "161", "643349", "643349"]);
    assert_eq!(report.applied, 3);
    assert!(report.rejected.len() < mapping.len());

    let stats = UnificationStats::compute(&records);
    assert_eq!(stats.total_records, 6);
    assert_eq!(stats.unique_identifiers, 3);
    assert_eq!(stats.unified_groups, 2);
    assert_eq!(stats.records_in_groups, 5);
}

#[test]
fn test_verify_pairs_after_unification() {
    let (records, _) = unify(ingested(), &embedded_mapping().unwrap());
    let checks = verify_pairs(
        &records,
        &[("Tylenol", "acetaminophen"), ("Advil", "ibuprofen"), ("Bayer", "aspirin")],
    );

    assert_eq!(
        checks[0].status,
        PairStatus::Unified {
            identifier: "161".into(),
            group_size: 2
        }
    );
    assert_eq!(
        checks[1].status,
        PairStatus::Unified {
            identifier: "643349".into(),
            group_size: 3
        }
    );
    assert_eq!(checks[2].status, PairStatus::NotFound);
}

#[test]
fn test_pairs_split_before_unification() {
    let checks = verify_pairs(&ingested(), &[("Tylenol", "acetaminophen")]);
    assert!(!checks[0].is_unified());
    assert_eq!(
        checks[0].status,
        PairStatus::Split {
            brand_id: "202433".into(),
            generic_id: "161".into()
        }
    );
}

#[test]
fn test_unification_is_idempotent() {
    let mapping = embedded_mapping().unwrap();
    let (once, _) = unify(ingested(), &mapping);
    let (twice, report) = unify(once.clone(), &mapping);

    assert_eq!(once, twice);
    assert_eq!(report.applied, 0);
}

#[test]
fn test_unified_dataset_drives_annotation() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("rxnorm_core_medications.csv");
    let (records, _) = unify(ingested(), &embedded_mapping().unwrap());

    save_reference_records(&path, &records).unwrap();
    let loaded = load_reference_records(&path).unwrap();
    assert_eq!(loaded, records);

    let index = ReferenceIndexBuilder::new("rxnorm").build_from_records(loaded);
    let annotator = Annotator::new(
        expander(),
        Matcher::default(),
        vec![MatchSource::new(index, 0.85, true)],
    );

    let brand = annotator.annotate_one("Tylenol");
    let generic = annotator.annotate_one("Acetaminophen");
    assert_eq!(brand.identifier(), Some("161"));
    assert_eq!(brand.identifier(), generic.identifier());
    assert_eq!(annotator.annotate_one("Advil 200mg").identifier(), Some("643349"));
}
