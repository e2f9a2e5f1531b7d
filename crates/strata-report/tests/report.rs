//! End-to-end report behavior over the full pipeline: relabel, canonical
//! form, cache state, and extraction.

use std::collections::BTreeMap;

use strata_canonical::InMemoryDocument;
use strata_idref::{IdReference, PathSegment};
use strata_report::{
    ExtractError, MetadataSelection, ReportError, SubsetSelection, TempFileManager,
    ValidationReport,
};

fn field(name: &str) -> PathSegment {
    PathSegment::Field(name.into())
}

fn report(document: &str, errors: &[&str], refs: Vec<IdReference>) -> ValidationReport {
    report_with_selection(document, errors, refs, "{}", "{}")
}

fn report_with_selection(
    document: &str,
    errors: &[&str],
    refs: Vec<IdReference>,
    selection: &str,
    metadata: &str,
) -> ValidationReport {
    let selection: SubsetSelection = serde_json::from_str(selection).unwrap();
    let metadata: MetadataSelection = serde_json::from_str(metadata).unwrap();
    ValidationReport::new(
        Box::new(InMemoryDocument::new(document.as_bytes().to_vec())),
        "Mod.Type-1.0",
        errors.iter().map(|e| e.to_string()).collect(),
        selection,
        metadata,
        refs,
    )
}

fn canonical_bytes(report: &ValidationReport) -> Vec<u8> {
    let mut out = Vec::new();
    report.writable().write_to(&mut out).unwrap();
    out
}

#[test]
fn unsorted_document_is_sorted_and_cached() {
    let mut r = report(r#"{"b":1,"a":{"z":2,"y":3}}"#, &[], vec![]);
    let summary = r.ensure_canonicalized(None, u64::MAX).unwrap();
    assert!(!summary.already_canonical);
    assert_eq!(canonical_bytes(&r), br#"{"a":{"y":3,"z":2},"b":1}"#.to_vec());

    // A second call reuses the cached result.
    let again = r.ensure_canonicalized(None, u64::MAX).unwrap();
    assert_eq!(again, summary);
}

#[test]
fn sorted_document_takes_the_fast_path() {
    let mut r = report(r#"{ "a" : 1 , "b" : [2, 3] }"#, &[], vec![]);
    let summary = r.ensure_canonicalized(None, u64::MAX).unwrap();
    assert!(summary.already_canonical);
    let bytes = canonical_bytes(&r);
    assert_eq!(bytes, br#"{"a":1,"b":[2,3]}"#.to_vec());
    assert_eq!(summary.bytes, bytes.len() as u64);
}

#[test]
fn disk_and_memory_sorts_produce_identical_bytes() {
    let doc = r#"{"zzz":{"b":1,"a":2},"mmm":[{"y":1,"x":2}],"aaa":"v"}"#;

    let mut in_memory = report(doc, &[], vec![]);
    in_memory.ensure_canonicalized(None, u64::MAX).unwrap();

    let dir = tempfile::tempdir().unwrap();
    let tfm = TempFileManager::new(dir.path()).unwrap();
    let mut on_disk = report(doc, &[], vec![]);
    // A zero threshold forces the spill path.
    on_disk.ensure_canonicalized(Some(&tfm), 0).unwrap();

    assert_eq!(canonical_bytes(&in_memory), canonical_bytes(&on_disk));
}

#[test]
fn relabeling_feeds_canonicalization() {
    let refs = vec![
        IdReference::value(vec![field("ref")], "rec-1"),
        IdReference::mapping_key(vec![field("index"), field("rec-1")], "rec-1"),
    ];
    let mut r = report(r#"{"ref":"rec-1","index":{"rec-1":7}}"#, &[], refs);
    let mut mapping = BTreeMap::new();
    mapping.insert("rec-1".to_string(), "ws/42/3".to_string());
    r.set_absolute_id_mapping(mapping).unwrap();
    r.ensure_canonicalized(None, u64::MAX).unwrap();
    assert_eq!(
        canonical_bytes(&r),
        br#"{"index":{"ws/42/3":7},"ref":"ws/42/3"}"#.to_vec()
    );
}

#[test]
fn setting_the_mapping_invalidates_the_cache() {
    let refs = vec![IdReference::value(vec![field("ref")], "rec-1")];
    let mut r = report(r#"{"ref":"rec-1","a":1}"#, &[], refs);
    r.ensure_canonicalized(None, u64::MAX).unwrap();
    assert_eq!(canonical_bytes(&r), br#"{"a":1,"ref":"rec-1"}"#.to_vec());

    let mut mapping = BTreeMap::new();
    mapping.insert("rec-1".to_string(), "ws/1/1".to_string());
    r.set_absolute_id_mapping(mapping).unwrap();
    assert!(r.canonical_summary().is_none());

    r.ensure_canonicalized(None, u64::MAX).unwrap();
    assert_eq!(canonical_bytes(&r), br#"{"a":1,"ref":"ws/1/1"}"#.to_vec());
}

#[test]
fn the_mapping_is_fixed_once() {
    let mut r = report(r#"{"a":1}"#, &[], vec![]);
    r.set_absolute_id_mapping(BTreeMap::new()).unwrap();
    let err = r.set_absolute_id_mapping(BTreeMap::new()).unwrap_err();
    assert!(matches!(err, ReportError::MappingAlreadySet));
}

#[test]
fn mapping_assignment_fills_absolute_ids() {
    let refs = vec![
        IdReference::value(vec![field("a")], "rec-1"),
        IdReference::value(vec![field("b")], "rec-2"),
    ];
    let mut r = report(r#"{"a":"rec-1","b":"rec-2"}"#, &[], refs);
    let mut mapping = BTreeMap::new();
    mapping.insert("rec-1".to_string(), "ws/1/1".to_string());
    r.set_absolute_id_mapping(mapping).unwrap();

    let by_id: BTreeMap<&str, Option<&str>> = r
        .id_references()
        .iter()
        .map(|i| (i.id.as_str(), i.absolute_id.as_deref()))
        .collect();
    assert_eq!(by_id["rec-1"], Some("ws/1/1"));
    assert_eq!(by_id["rec-2"], None);
    assert_eq!(r.all_ids(), vec!["rec-1", "rec-2"]);
}

#[test]
fn invalid_reports_short_circuit_every_operation() {
    let mut r = report_with_selection(
        r#"{"b":1,"a":2}"#,
        &["missing required field 'id'"],
        vec![],
        r#"{"fields":{"a":{}}}"#,
        r#"{"N":"a"}"#,
    );
    assert!(!r.is_valid());

    let summary = r.ensure_canonicalized(None, u64::MAX).unwrap();
    assert_eq!(summary.bytes, 0);

    let mut out = Vec::new();
    assert_eq!(r.writable().write_to(&mut out).unwrap(), 0);
    assert!(out.is_empty());

    let extraction = r.extract_subset_and_metadata(u64::MAX).unwrap();
    assert_eq!(extraction.subset, serde_json::json!({}));
    assert!(extraction.metadata.is_empty());

    let rendered = r.to_string();
    assert!(rendered.contains("invalid"));
    assert!(rendered.contains("missing required field 'id'"));
}

#[test]
fn extraction_reads_from_the_canonical_cache() {
    let doc = r#"{"z":"skip","data":{"name":"g1","len":99},"tags":["a","b"]}"#;
    let sel = r#"{"fields":{"data":{"name":{}},"tags":{}}}"#;
    let meta = r#"{"Name":"data.name","Length":"data.len"}"#;

    let mut r = report_with_selection(doc, &[], vec![], sel, meta);
    r.ensure_canonicalized(None, u64::MAX).unwrap();

    let extraction = r.extract_subset_and_metadata(10_000).unwrap();
    assert_eq!(
        extraction.subset,
        serde_json::json!({"data":{"name":"g1"},"tags":["a","b"]})
    );
    assert_eq!(extraction.metadata["Name"], "g1");
    assert_eq!(extraction.metadata["Length"], "99");
}

#[test]
fn extraction_size_limit_matches_across_cache_forms() {
    let doc = r#"{"b":{"long":"0123456789012345678901234567890123456789"},"a":1}"#;
    let sel = r#"{"fields":{"b":{}}}"#;
    let limit = 30;

    let mut in_memory = report_with_selection(doc, &[], vec![], sel, "{}");
    in_memory.ensure_canonicalized(None, u64::MAX).unwrap();
    let mem_err = in_memory.extract_subset(limit).unwrap_err();

    let dir = tempfile::tempdir().unwrap();
    let tfm = TempFileManager::new(dir.path()).unwrap();
    let mut on_disk = report_with_selection(doc, &[], vec![], sel, "{}");
    on_disk.ensure_canonicalized(Some(&tfm), 0).unwrap();
    let disk_err = on_disk.extract_subset(limit).unwrap_err();

    for err in [mem_err, disk_err] {
        match err {
            ReportError::Extract(ExtractError::SizeLimit { limit: l }) => assert_eq!(l, limit),
            other => panic!("unexpected error: {other}"),
        }
    }
}

#[test]
fn duplicate_keys_fail_canonicalization() {
    let mut r = report(r#"{"outer":{"k":1,"k":2}}"#, &[], vec![]);
    let err = r.ensure_canonicalized(None, u64::MAX).unwrap_err();
    match err {
        ReportError::Canonical(strata_canonical::CanonicalError::KeyCollision { path }) => {
            assert_eq!(path, "outer.k")
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn relabeled_value_materializes_without_caching() {
    let refs = vec![IdReference::value(vec![field("ref")], "rec-1")];
    let mut r = report(r#"{"ref":"rec-1"}"#, &[], refs);
    let mut mapping = BTreeMap::new();
    mapping.insert("rec-1".to_string(), "ws/9/9".to_string());
    r.set_absolute_id_mapping(mapping).unwrap();

    let value = r.relabeled_value().unwrap();
    assert_eq!(value, serde_json::json!({"ref":"ws/9/9"}));
    assert!(r.canonical_summary().is_none());
}

#[test]
fn id_references_group_by_depth() {
    let refs = vec![
        IdReference::value(vec![field("top")], "t"),
        IdReference::value(vec![field("a"), field("b")], "d"),
    ];
    let r = report(r#"{"top":"t","a":{"b":"d"}}"#, &[], refs);
    let grouped = r.id_references_by_depth();
    assert_eq!(grouped[1].len(), 1);
    assert_eq!(grouped[1][0].id, "t");
    assert_eq!(grouped[2][0].id, "d");
}
