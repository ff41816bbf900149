//! Indexer runs against scripted upstream services.

mod common;

use common::*;
use ontoclosure_indexer::store::{
    CatalogEntry, IndexStore, MemoryStore, OntologyRecord, StoreError, StoreResult, TermSet,
};
use ontoclosure_indexer::{ClosureIndexer, ClosureLookup, IndexError, StaticTermSource, Term};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

fn set(items: &[&str]) -> TermSet {
    items.iter().map(|s| s.to_string()).collect()
}

fn indexer(store: Arc<dyn IndexStore>, upstream: Arc<ScriptedUpstream>) -> ClosureIndexer {
    ClosureIndexer::with_backend(&test_config(), store, upstream)
}

// ============================================================================
// End-to-end
// ============================================================================

#[test]
fn test_two_term_hierarchy_end_to_end() {
    let upstream = Arc::new(
        ScriptedUpstream::new()
            .ontology("HP", HP_BASE)
            .hierarchy("HP", HP_BASE, "1", &["HP:1"])
            .hierarchy("HP", HP_BASE, "2", &["HP:1", "HP:2"]),
    );
    let store = Arc::new(MemoryStore::new());

    let summary = indexer(store.clone(), upstream)
        .run(&StaticTermSource(vec!["HP:1".into(), "HP:2".into()]))
        .unwrap();

    assert_eq!(summary.distinct_terms, 2);
    assert_eq!(summary.resolved, 2);
    assert!(summary.unresolved.is_empty());
    assert_eq!(store.get_ancestors("HP:1").unwrap(), Some(set(&["HP:1"])));
    assert_eq!(store.get_ancestors("HP:2").unwrap(), Some(set(&["HP:1", "HP:2"])));
    assert_eq!(store.get_descendants("HP:1").unwrap(), Some(set(&["HP:1", "HP:2"])));
    assert_eq!(store.get_descendants("HP:2").unwrap(), Some(set(&["HP:2"])));
    assert_eq!(
        store.get_ontology("HP").unwrap(),
        Some(OntologyRecord {
            prefix: "HP".to_string(),
            base_uri: HP_BASE.to_string(),
        })
    );
}

#[test]
fn test_mixed_providers_in_one_run() {
    let upstream = Arc::new(
        ScriptedUpstream::new()
            .ontology("HP", HP_BASE)
            .hierarchy("HP", HP_BASE, "0001250", &["HP:0000118", "HP:0001250"])
            .expansion("22298006", &[200], &["22298006", "404684003"])
            .expansion("404684003", &[200], &["404684003"]),
    );
    let store = Arc::new(MemoryStore::new());

    let summary = indexer(store.clone(), upstream.clone())
        .run_terms(["HP:0001250", "SNOMED:22298006", "404684003"])
        .unwrap();

    assert_eq!(summary.resolved, 3);
    assert_eq!(
        store.get_ancestors("SNOMED:22298006").unwrap(),
        Some(set(&["SNOMED:22298006", "SNOMED:404684003"]))
    );
    assert_eq!(store.get_ancestors("404684003").unwrap(), Some(set(&["404684003"])));
    assert_eq!(
        store.get_descendants("HP:0000118").unwrap(),
        Some(set(&["HP:0001250"]))
    );
    // the clinical namespace never touches the lookup service
    assert_eq!(upstream.calls_mentioning(&format!("{OLS}/SNOMED")), 0);
}

// ============================================================================
// Dedup and monotonicity
// ============================================================================

#[test]
fn test_indexed_terms_are_never_refetched() {
    let upstream = Arc::new(
        ScriptedUpstream::new()
            .ontology("HP", HP_BASE)
            .hierarchy("HP", HP_BASE, "2", &["HP:1", "HP:2"]),
    );
    let store = Arc::new(MemoryStore::new());
    store
        .put_ancestors(vec![("HP:1".to_string(), set(&["HP:1"]))])
        .unwrap();

    let summary = indexer(store.clone(), upstream.clone())
        .run_terms(["HP:1", "HP:2"])
        .unwrap();

    assert_eq!(summary.already_indexed, 1);
    assert_eq!(summary.scheduled, 1);
    assert_eq!(upstream.calls_mentioning(&ancestors_url("HP", HP_BASE, "1")), 0);
    assert_eq!(upstream.calls_mentioning(&ancestors_url("HP", HP_BASE, "2")), 1);
}

#[test]
fn test_second_run_is_a_no_op() {
    let upstream = Arc::new(
        ScriptedUpstream::new()
            .ontology("HP", HP_BASE)
            .hierarchy("HP", HP_BASE, "1", &["HP:1"])
            .hierarchy("HP", HP_BASE, "2", &["HP:1", "HP:2"]),
    );
    let store = Arc::new(MemoryStore::new());
    let indexer = indexer(store.clone(), upstream.clone());

    indexer.run_terms(["HP:1", "HP:2"]).unwrap();
    let before = store.snapshot();
    let calls_before = upstream.calls().len();

    let again = indexer.run_terms(["HP:1", "HP:2"]).unwrap();
    let after = store.snapshot();

    assert_eq!(again.already_indexed, 2);
    assert_eq!(again.scheduled, 0);
    assert_eq!(before.ancestors, after.ancestors);
    assert_eq!(before.descendants, after.descendants);
    assert_eq!(upstream.calls().len(), calls_before);
}

#[test]
fn test_new_terms_only_grow_existing_descendants() {
    let upstream = Arc::new(
        ScriptedUpstream::new()
            .ontology("HP", HP_BASE)
            .hierarchy("HP", HP_BASE, "1", &["HP:1"])
            .hierarchy("HP", HP_BASE, "2", &["HP:1", "HP:2"])
            .hierarchy("HP", HP_BASE, "3", &["HP:1", "HP:3"]),
    );
    let store = Arc::new(MemoryStore::new());
    let indexer = indexer(store.clone(), upstream);

    indexer.run_terms(["HP:1", "HP:2"]).unwrap();
    let summary = indexer.run_terms(["HP:1", "HP:2", "HP:3"]).unwrap();

    assert_eq!(summary.descendant_records_merged, 1);
    assert_eq!(summary.descendant_records_created, 1);
    assert_eq!(
        store.get_descendants("HP:1").unwrap(),
        Some(set(&["HP:1", "HP:2", "HP:3"]))
    );
    assert_eq!(store.get_descendants("HP:2").unwrap(), Some(set(&["HP:2"])));

    let lookup = ClosureLookup::new(store);
    let expanded = lookup.expand("HP:1").unwrap();
    assert!(expanded.contains(&Term::from("HP:3")));
}

// ============================================================================
// Failure handling
// ============================================================================

#[test]
fn test_clinical_term_resolves_on_tenth_attempt() {
    let mut statuses = vec![500; 9];
    statuses.push(200);
    let upstream = Arc::new(ScriptedUpstream::new().expansion("100", &statuses, &["100", "1"]));
    let store = Arc::new(MemoryStore::new());

    let summary = indexer(store.clone(), upstream.clone())
        .run_terms(["SNOMED:100"])
        .unwrap();

    assert_eq!(summary.resolved, 1);
    assert_eq!(upstream.calls_mentioning("POST 100"), 10);
    assert_eq!(
        store.get_ancestors("SNOMED:100").unwrap(),
        Some(set(&["SNOMED:1", "SNOMED:100"]))
    );
}

#[test]
fn test_clinical_term_failing_ten_times_leaves_no_trace() {
    let upstream = Arc::new(ScriptedUpstream::new().expansion("100", &[503], &[]));
    let store = Arc::new(MemoryStore::new());

    let summary = indexer(store.clone(), upstream.clone())
        .run_terms(["SNOMED:100"])
        .unwrap();

    assert_eq!(summary.resolved, 0);
    assert!(summary.unresolved.contains(&Term::from("SNOMED:100")));
    assert_eq!(upstream.calls_mentioning("POST 100"), 10);
    assert!(store.get_ancestors("SNOMED:100").unwrap().is_none());
    assert!(store.get_descendants("SNOMED:100").unwrap().is_none());
}

#[test]
fn test_hierarchy_failure_is_deferred_to_next_run() {
    let upstream = Arc::new(
        ScriptedUpstream::new()
            .ontology("HP", HP_BASE)
            .hierarchy("HP", HP_BASE, "1", &["HP:1"])
            .hierarchy_status("HP", HP_BASE, "2", 502),
    );
    let store = Arc::new(MemoryStore::new());

    let summary = indexer(store.clone(), upstream.clone())
        .run_terms(["HP:1", "HP:2"])
        .unwrap();

    assert_eq!(summary.resolved, 1);
    assert_eq!(summary.unresolved.len(), 1);
    assert_eq!(upstream.calls_mentioning(&ancestors_url("HP", HP_BASE, "2")), 1);
    assert!(store.get_ancestors("HP:2").unwrap().is_none());
}

#[test]
fn test_unregistered_namespace_is_skipped() {
    let upstream = Arc::new(
        ScriptedUpstream::new()
            .ontology("HP", HP_BASE)
            .hierarchy("HP", HP_BASE, "1", &["HP:1"]),
    );
    let store = Arc::new(MemoryStore::new());

    let summary = indexer(store.clone(), upstream)
        .run_terms(["HP:1", "LOCAL:7", "LOCAL:8"])
        .unwrap();

    assert!(summary.skipped_namespaces.contains("LOCAL"));
    assert_eq!(summary.resolved, 1);
    assert!(store.get_ontology("LOCAL").unwrap().is_none());
}

#[test]
fn test_lookup_outage_is_forgotten_by_the_next_run() {
    let upstream = Arc::new(
        ScriptedUpstream::new()
            .ontology_after("HP", HP_BASE, &[503])
            .hierarchy("HP", HP_BASE, "1", &["HP:1"]),
    );
    let store = Arc::new(MemoryStore::new());
    let indexer = indexer(store.clone(), upstream.clone());

    let first = indexer.run_terms(["HP:1"]).unwrap();
    assert!(first.skipped_namespaces.contains("HP"));
    assert!(store.get_ancestors("HP:1").unwrap().is_none());

    let second = indexer.run_terms(["HP:1"]).unwrap();
    assert!(second.skipped_namespaces.is_empty());
    assert_eq!(second.resolved, 1);
    assert_eq!(upstream.calls_mentioning(&format!("GET {OLS}/HP/")), 1);
    let lookup = format!("GET {OLS}/HP");
    assert_eq!(upstream.calls().iter().filter(|c| **c == lookup).count(), 2);
    assert_eq!(store.get_ancestors("HP:1").unwrap(), Some(set(&["HP:1"])));
}

/// Memory store whose descendant writes can be made to fail.
#[derive(Default)]
struct BrittleStore {
    inner: MemoryStore,
    fail_descendants: AtomicBool,
}

impl IndexStore for BrittleStore {
    fn get_ontology(&self, prefix: &str) -> StoreResult<Option<OntologyRecord>> {
        self.inner.get_ontology(prefix)
    }
    fn put_ontology(&self, record: OntologyRecord) -> StoreResult<()> {
        self.inner.put_ontology(record)
    }
    fn get_ancestors(&self, term: &str) -> StoreResult<Option<TermSet>> {
        self.inner.get_ancestors(term)
    }
    fn put_ancestors(&self, entries: Vec<(String, TermSet)>) -> StoreResult<()> {
        self.inner.put_ancestors(entries)
    }
    fn get_descendants(&self, term: &str) -> StoreResult<Option<TermSet>> {
        self.inner.get_descendants(term)
    }
    fn put_descendants(&self, entries: Vec<(String, TermSet)>) -> StoreResult<()> {
        if self.fail_descendants.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("descendant table throttled".to_string()));
        }
        self.inner.put_descendants(entries)
    }
    fn merge_descendants(&self, term: &str, additions: &TermSet) -> StoreResult<()> {
        self.inner.merge_descendants(term, additions)
    }
    fn put_catalog(&self, entries: Vec<CatalogEntry>) -> StoreResult<()> {
        self.inner.put_catalog(entries)
    }
    fn catalog_by_term(&self, term: &str) -> StoreResult<Vec<CatalogEntry>> {
        self.inner.catalog_by_term(term)
    }
    fn catalog_by_table(&self, table_name: &str) -> StoreResult<Vec<CatalogEntry>> {
        self.inner.catalog_by_table(table_name)
    }
}

#[test]
fn test_rerun_after_store_failure_converges() {
    let upstream = Arc::new(
        ScriptedUpstream::new()
            .ontology("HP", HP_BASE)
            .hierarchy("HP", HP_BASE, "1", &["HP:1"])
            .hierarchy("HP", HP_BASE, "2", &["HP:1", "HP:2"])
            .hierarchy("HP", HP_BASE, "3", &["HP:1", "HP:3"]),
    );
    let store = Arc::new(BrittleStore::default());
    store.fail_descendants.store(true, Ordering::SeqCst);

    let err = indexer(store.clone(), upstream.clone())
        .run_terms(["HP:1", "HP:2"])
        .unwrap_err();
    assert!(matches!(err, IndexError::Store(StoreError::Unavailable(_))));
    // nothing is marked indexed when the build fails
    assert!(store.get_ancestors("HP:1").unwrap().is_none());
    assert!(store.get_ancestors("HP:2").unwrap().is_none());

    store.fail_descendants.store(false, Ordering::SeqCst);
    let summary = indexer(store.clone(), upstream.clone())
        .run_terms(["HP:1", "HP:2", "HP:3"])
        .unwrap();

    assert_eq!(summary.already_indexed, 0);
    assert_eq!(summary.resolved, 3);
    assert_eq!(upstream.calls_mentioning(&ancestors_url("HP", HP_BASE, "2")), 2);
    assert_eq!(store.get_ancestors("HP:2").unwrap(), Some(set(&["HP:1", "HP:2"])));
    assert_eq!(
        store.get_descendants("HP:1").unwrap(),
        Some(set(&["HP:1", "HP:2", "HP:3"]))
    );
    assert_eq!(store.get_descendants("HP:2").unwrap(), Some(set(&["HP:2"])));
    assert_eq!(store.get_descendants("HP:3").unwrap(), Some(set(&["HP:3"])));
}
