//! Skip terms that already have an ancestor record.

use crate::classifier::NamespaceClusters;
use crate::error::IndexResult;
use ontoclosure_store::IndexStore;
use std::sync::Arc;

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct DedupOutcome {
    /// Terms still missing from the ancestor table, by namespace
    pub pending: NamespaceClusters,
    /// How many terms were dropped because they are already indexed
    pub already_indexed: usize,
}

pub struct DedupGate {
    store: Arc<dyn IndexStore>,
}

impl DedupGate {
    pub fn new(store: Arc<dyn IndexStore>) -> Self {
        Self { store }
    }

    /// Per-term existence check. Namespaces left with no pending term are
    /// omitted from the result.
    pub fn filter(&self, clusters: NamespaceClusters) -> IndexResult<DedupOutcome> {
        let mut outcome = DedupOutcome::default();
        for (namespace, terms) in clusters {
            let mut pending = std::collections::BTreeSet::new();
            for term in terms {
                if self.store.has_ancestors(term.as_str())? {
                    outcome.already_indexed += 1;
                } else {
                    pending.insert(term);
                }
            }
            if !pending.is_empty() {
                outcome.pending.insert(namespace, pending);
            }
        }
        Ok(outcome)
    }
}
