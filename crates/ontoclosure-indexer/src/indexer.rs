//! The batch job: classify → dedup → fetch → build.

use crate::builder::{BuildSummary, ClosureIndexBuilder};
use crate::classifier::{classify, cluster_size};
use crate::config::IndexerConfig;
use crate::dedup::DedupGate;
use crate::error::IndexResult;
use crate::http::{HttpBackend, ReqwestBackend};
use crate::orchestrator::FetchOrchestrator;
use crate::provider::ProviderSet;
use crate::registry::OntologyRegistry;
use crate::source::TermSource;
use crate::term::Term;
use ontoclosure_store::IndexStore;
use serde::Serialize;
use std::collections::BTreeSet;
use std::sync::Arc;

#[derive(Debug, Default, Clone, Serialize)]
pub struct RunSummary {
    pub distinct_terms: usize,
    pub already_indexed: usize,
    pub scheduled: usize,
    pub resolved: usize,
    pub unresolved: BTreeSet<Term>,
    pub skipped_namespaces: BTreeSet<String>,
    pub ancestor_records: usize,
    pub descendant_records_created: usize,
    pub descendant_records_merged: usize,
}

impl RunSummary {
    fn record_build(&mut self, build: BuildSummary) {
        self.ancestor_records = build.ancestor_records;
        self.descendant_records_created = build.descendant_records_created;
        self.descendant_records_merged = build.descendant_records_merged;
    }
}

pub struct ClosureIndexer {
    store: Arc<dyn IndexStore>,
    http: Arc<dyn HttpBackend>,
    providers: ProviderSet,
    ols_base: String,
    clinical_base_uri: String,
    max_workers: usize,
    dedup: DedupGate,
    builder: ClosureIndexBuilder,
}

impl ClosureIndexer {
    /// Indexer talking to the configured services over a reqwest client.
    pub fn new(config: &IndexerConfig, store: Arc<dyn IndexStore>) -> IndexResult<Self> {
        config.validate()?;
        let http: Arc<dyn HttpBackend> = Arc::new(ReqwestBackend::new(config.http_timeout())?);
        Ok(Self::with_backend(config, store, http))
    }

    pub fn with_backend(
        config: &IndexerConfig,
        store: Arc<dyn IndexStore>,
        http: Arc<dyn HttpBackend>,
    ) -> Self {
        let providers = ProviderSet::from_config(config, http.clone());
        Self::with_providers(config, store, http, providers)
    }

    pub fn with_providers(
        config: &IndexerConfig,
        store: Arc<dyn IndexStore>,
        http: Arc<dyn HttpBackend>,
        providers: ProviderSet,
    ) -> Self {
        Self {
            dedup: DedupGate::new(store.clone()),
            builder: ClosureIndexBuilder::new(store.clone()),
            http,
            providers,
            ols_base: config.ols_base().to_string(),
            clinical_base_uri: config.clinical_base_uri.clone(),
            max_workers: config.max_workers,
            store,
        }
    }

    /// Fresh registry per run: its namespace cache, negative answers
    /// included, lives for one run only.
    fn orchestrator(&self) -> FetchOrchestrator {
        let registry = Arc::new(OntologyRegistry::new(
            self.store.clone(),
            self.http.clone(),
            &self.ols_base,
            &self.clinical_base_uri,
        ));
        FetchOrchestrator::new(registry, self.providers.clone(), self.max_workers)
    }

    pub fn store(&self) -> &Arc<dyn IndexStore> {
        &self.store
    }

    pub fn run(&self, source: &dyn TermSource) -> IndexResult<RunSummary> {
        let terms = source.terms()?;
        tracing::info!(origin = %source.origin(), rows = terms.len(), "loaded terms");
        self.run_terms(terms)
    }

    pub fn run_terms<I, S>(&self, raw_terms: I) -> IndexResult<RunSummary>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let clusters = classify(raw_terms);
        let mut summary = RunSummary {
            distinct_terms: cluster_size(&clusters),
            ..Default::default()
        };

        let dedup = self.dedup.filter(clusters)?;
        summary.already_indexed = dedup.already_indexed;

        let fetched = self.orchestrator().run(&dedup.pending)?;
        summary.scheduled = fetched.resolved.len() + fetched.unresolved.len();
        summary.resolved = fetched.resolved.len();
        summary.unresolved = fetched.unresolved;
        summary.skipped_namespaces = fetched.skipped_namespaces;

        let build = self.builder.apply(fetched.resolved)?;
        summary.record_build(build);
        // registry writes land even when nothing was fetched
        self.store.flush()?;

        tracing::info!(
            distinct = summary.distinct_terms,
            already_indexed = summary.already_indexed,
            resolved = summary.resolved,
            unresolved = summary.unresolved.len(),
            "indexing run finished"
        );
        Ok(summary)
    }
}
