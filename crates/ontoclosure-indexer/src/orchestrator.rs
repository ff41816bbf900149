//! Bounded worker pool that fans terms out to the ancestor providers.
//!
//! ```text
//!   jobs ──► [queue] ──► worker 0 ─┐
//!                    ──► worker 1 ─┼──► mpsc ──► collector (owns the report)
//!                    ──► worker N ─┘
//! ```
//!
//! Workers are scoped threads; the scope is the join barrier between the
//! fetch phase and the build phase.

use crate::classifier::NamespaceClusters;
use crate::error::{FetchError, IndexError, IndexResult};
use crate::provider::ProviderSet;
use crate::registry::OntologyRegistry;
use crate::term::{AncestorSet, OntologyInfo, Term};
use parking_lot::Mutex;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::{mpsc, Arc};

#[derive(Debug, Clone)]
pub struct FetchJob {
    pub term: Term,
    pub info: OntologyInfo,
}

struct FetchMessage {
    term: Term,
    outcome: Result<AncestorSet, FetchError>,
}

#[derive(Debug, Default, Clone)]
pub struct FetchReport {
    pub resolved: BTreeMap<Term, AncestorSet>,
    pub unresolved: BTreeSet<Term>,
    /// Namespaces the registry could not resolve; none of their terms ran
    pub skipped_namespaces: BTreeSet<String>,
}

pub struct FetchOrchestrator {
    registry: Arc<OntologyRegistry>,
    providers: ProviderSet,
    capacity: usize,
}

impl FetchOrchestrator {
    pub fn new(registry: Arc<OntologyRegistry>, providers: ProviderSet, capacity: usize) -> Self {
        Self {
            registry,
            providers,
            capacity: capacity.max(1),
        }
    }

    pub fn run(&self, pending: &NamespaceClusters) -> IndexResult<FetchReport> {
        let (jobs, skipped) = self.plan(pending)?;
        let mut report = self.execute(jobs)?;
        report.skipped_namespaces = skipped;
        Ok(report)
    }

    /// Resolve each namespace once and turn its terms into jobs.
    pub fn plan(&self, pending: &NamespaceClusters) -> IndexResult<(Vec<FetchJob>, BTreeSet<String>)> {
        let mut jobs = Vec::new();
        let mut skipped = BTreeSet::new();
        for (namespace, terms) in pending {
            match self.registry.resolve(namespace)? {
                Some(info) => jobs.extend(terms.iter().map(|term| FetchJob {
                    term: term.clone(),
                    info: info.clone(),
                })),
                None => {
                    tracing::warn!(namespace = %namespace, terms = terms.len(), "skipping unregistered namespace");
                    skipped.insert(namespace.clone());
                }
            }
        }
        Ok((jobs, skipped))
    }

    /// Run every job and wait for all of them. Unresolved terms are reported,
    /// never raised.
    pub fn execute(&self, jobs: Vec<FetchJob>) -> IndexResult<FetchReport> {
        let mut report = FetchReport::default();
        if jobs.is_empty() {
            return Ok(report);
        }

        let workers = self.capacity.min(jobs.len());
        let queue = Mutex::new(jobs.into_iter());
        let (tx, rx) = mpsc::channel::<FetchMessage>();

        std::thread::scope(|scope| {
            let mut spawned = 0usize;
            for i in 0..workers {
                let tx = tx.clone();
                let queue = &queue;
                let providers = &self.providers;
                let handle = std::thread::Builder::new()
                    .name(format!("ontoclosure_fetch_{i}"))
                    .spawn_scoped(scope, move || loop {
                        let Some(job) = queue.lock().next() else {
                            break;
                        };
                        let outcome = providers.for_kind(job.info.kind).fetch(&job.term, &job.info);
                        if tx.send(FetchMessage { term: job.term, outcome }).is_err() {
                            break;
                        }
                    });
                match handle {
                    Ok(_) => spawned += 1,
                    Err(err) => {
                        if spawned == 0 {
                            return Err(IndexError::WorkerPool(err.to_string()));
                        }
                        tracing::warn!(spawned, error = %err, "fetch pool running below capacity");
                        break;
                    }
                }
            }
            drop(tx);

            for message in rx {
                match message.outcome {
                    Ok(ancestors) => {
                        report.resolved.insert(message.term, ancestors);
                    }
                    Err(_) => {
                        report.unresolved.insert(message.term);
                    }
                }
            }
            Ok(())
        })?;

        tracing::info!(
            resolved = report.resolved.len(),
            unresolved = report.unresolved.len(),
            "fetch phase complete"
        );
        Ok(report)
    }
}
