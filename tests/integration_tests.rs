//! Integration tests for the complete Styx pipeline
//!
//! These tests verify end-to-end functionality across crates:
//! - RDF text → Dataset → IndexWriter → MemoryStore
//! - Store snapshot → persist → reload
//! - Pattern with blank nodes → Compiler → Plan
//!
//! Run with: cargo test --test integration_tests

use std::sync::Arc;
use std::thread;
use tempfile::tempdir;

use styx_core::key::major_key;
use styx_core::{decode_node, Node, Position};
use styx_ingest_rdf::{dataset_from_rdf, RdfFormat};
use styx_plan::{CompileConfig, Compiler, PlanError, PlanSummary};
use styx_store::{candidate_values, read_count, IndexWriter, KvStore, MemoryStore};

const DATA: &str = r#"
<http://ex.org/joel> <http://ex.org/name> "Joel" .
<http://ex.org/joel> <http://ex.org/age> "22"^^<http://www.w3.org/2001/XMLSchema#integer> .
<http://ex.org/joel> <http://ex.org/friend> <http://ex.org/gabriel> .
<http://ex.org/gabriel> <http://ex.org/name> "Gabriel" <http://ex.org/people> .
<http://ex.org/gabriel> <http://ex.org/friend> _:anon .
_:anon <http://ex.org/name> "Anon" .
"#;

const PATTERN: &str = r#"
_:x <http://ex.org/name> "Joel" .
_:x <http://ex.org/age> "22"^^<http://www.w3.org/2001/XMLSchema#integer> .
_:x <http://ex.org/friend> _:y .
_:y <http://ex.org/name> "Gabriel" .
"#;

fn indexed_store() -> MemoryStore {
    let data = dataset_from_rdf(DATA.as_bytes(), RdfFormat::NQuads).unwrap();
    let store = MemoryStore::new();
    let report = IndexWriter::new(&store, "http://ex.org/doc")
        .index(&data)
        .unwrap();
    assert_eq!(report.statements, 6);
    assert_eq!(report.inserted, 6);
    store
}

// ============================================================================
// RDF → Store → Plan
// ============================================================================

#[test]
fn test_rdf_pattern_compiles_against_indexed_document() {
    let store = indexed_store();
    let pattern = dataset_from_rdf(PATTERN.as_bytes(), RdfFormat::NTriples).unwrap();

    let plan = Compiler::default().compile_in(&store, &pattern).unwrap();
    assert_eq!(plan.len(), 2);

    let first = &plan.assignments()[0];
    assert_eq!(first.present.len(), 2);
    assert_eq!(first.value_root, Some(vec![Node::iri("http://ex.org/joel")]));
    assert!(first.dependencies.is_empty());

    let second = &plan.assignments()[1];
    assert_eq!(second.value_root, Some(vec![Node::iri("http://ex.org/gabriel")]));
    assert_eq!(second.past.len(), 1);
    assert_eq!(second.dependencies, vec![0]);

    let rid = second.past.cursors()[0];
    let cursor = plan.reference(rid).cursor().unwrap();
    assert_eq!(cursor.id.as_ref(), Some(&first.variable));
    // Two friend statements in the store.
    assert_eq!(cursor.count, 2);
}

#[test]
fn test_blank_nodes_in_data_are_document_scoped() {
    let store = indexed_store();
    let snap = store.view().unwrap();
    let values = candidate_values(
        &snap,
        Position::Subject,
        &Node::iri("http://ex.org/name"),
        &Node::literal("Anon"),
    )
    .unwrap();
    assert_eq!(values.len(), 1);
    let (node, _) = decode_node(&values[0]).unwrap();
    match node {
        Node::Iri(iri) => assert!(iri.starts_with("http://ex.org/doc#_:")),
        other => panic!("unexpected node {other}"),
    }
    assert_eq!(
        read_count(&snap, &major_key(Position::Subject, &Node::iri("http://ex.org/joel"))).unwrap(),
        3
    );
}

#[test]
fn test_absent_value_rejects_the_pattern() {
    let store = indexed_store();
    let pattern = dataset_from_rdf(
        br#"_:x <http://ex.org/name> "Nobody" ."#,
        RdfFormat::NTriples,
    )
    .unwrap();
    let err = Compiler::default()
        .compile_in(&store, &pattern)
        .unwrap_err();
    assert!(matches!(err, PlanError::ZeroCandidateReference { .. }));
}

// ============================================================================
// Persistence and snapshots
// ============================================================================

#[test]
fn test_plan_survives_store_reload() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("styx.cbor");

    let store = indexed_store();
    store.save(&path).unwrap();
    let reloaded = MemoryStore::load(&path).unwrap();

    let pattern = dataset_from_rdf(PATTERN.as_bytes(), RdfFormat::NTriples).unwrap();
    let before = Compiler::default()
        .compile_in(&store, &pattern)
        .unwrap()
        .summary();
    let after = Compiler::default()
        .compile_in(&reloaded, &pattern)
        .unwrap()
        .summary();
    assert_eq!(before, after);

    let json = serde_json::to_string(&after).unwrap();
    let back: PlanSummary = serde_json::from_str(&json).unwrap();
    assert_eq!(back, after);
}

#[test]
fn test_snapshot_is_stable_under_concurrent_writes() {
    let store = Arc::new(indexed_store());
    let pattern = dataset_from_rdf(PATTERN.as_bytes(), RdfFormat::NTriples).unwrap();
    let snap = store.view().unwrap();
    let baseline = Compiler::default().compile(&pattern, &snap).unwrap().summary();

    let writer = {
        let store = Arc::clone(&store);
        thread::spawn(move || {
            let more = dataset_from_rdf(
                br#"<http://ex.org/ana> <http://ex.org/friend> <http://ex.org/gabriel> ."#,
                RdfFormat::NTriples,
            )
            .unwrap();
            IndexWriter::new(store.as_ref(), "http://ex.org/more")
                .index(&more)
                .unwrap();
        })
    };
    writer.join().unwrap();

    let again = Compiler::default().compile(&pattern, &snap).unwrap().summary();
    assert_eq!(again, baseline);

    let fresh = Compiler::default()
        .compile_in(store.as_ref(), &pattern)
        .unwrap()
        .summary();
    assert_ne!(fresh, baseline);
}

#[test]
fn test_config_from_json() {
    let store = indexed_store();
    let pattern = dataset_from_rdf(PATTERN.as_bytes(), RdfFormat::NTriples).unwrap();
    let config: CompileConfig =
        serde_json::from_str(r#"{ "order": "ascending_count", "max_variables": 4 }"#).unwrap();
    let plan = Compiler::new(config).compile_in(&store, &pattern).unwrap();

    let last = &plan.assignments()[1];
    assert_eq!(last.value_root, Some(vec![Node::iri("http://ex.org/joel")]));
    assert_eq!(last.dependencies, vec![0]);
}
