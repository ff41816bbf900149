//! Persist ancestor sets and fold their inversion into the descendant table.

use crate::error::IndexResult;
use crate::term::{to_store_set, AncestorSet, Term};
use ontoclosure_store::IndexStore;
use std::collections::BTreeMap;
use std::sync::Arc;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct BuildSummary {
    pub ancestor_records: usize,
    pub descendant_records_created: usize,
    pub descendant_records_merged: usize,
}

/// Add each term to its own ancestor set.
pub fn reflexive(fetched: BTreeMap<Term, AncestorSet>) -> BTreeMap<Term, AncestorSet> {
    fetched
        .into_iter()
        .map(|(term, mut ancestors)| {
            ancestors.insert(term.clone());
            (term, ancestors)
        })
        .collect()
}

/// ancestor → every term that listed it.
pub fn invert(ancestors: &BTreeMap<Term, AncestorSet>) -> BTreeMap<Term, AncestorSet> {
    let mut descendants: BTreeMap<Term, AncestorSet> = BTreeMap::new();
    for (term, set) in ancestors {
        for ancestor in set {
            descendants
                .entry(ancestor.clone())
                .or_default()
                .insert(term.clone());
        }
    }
    descendants
}

pub struct ClosureIndexBuilder {
    store: Arc<dyn IndexStore>,
}

impl ClosureIndexBuilder {
    pub fn new(store: Arc<dyn IndexStore>) -> Self {
        Self { store }
    }

    /// Ancestor records are written last; they mark a term as indexed, so
    /// any store error before them leaves the whole batch pending.
    pub fn apply(&self, fetched: BTreeMap<Term, AncestorSet>) -> IndexResult<BuildSummary> {
        let mut summary = BuildSummary::default();
        if fetched.is_empty() {
            return Ok(summary);
        }

        let ancestors = reflexive(fetched);

        let mut created = Vec::new();
        for (ancestor, contributions) in invert(&ancestors) {
            let contributions = to_store_set(&contributions);
            if self.store.get_descendants(ancestor.as_str())?.is_some() {
                self.store.merge_descendants(ancestor.as_str(), &contributions)?;
                summary.descendant_records_merged += 1;
            } else {
                created.push((ancestor.into_string(), contributions));
            }
        }
        summary.descendant_records_created = created.len();
        self.store.put_descendants(created)?;

        summary.ancestor_records = ancestors.len();
        self.store.put_ancestors(
            ancestors
                .iter()
                .map(|(term, set)| (term.as_str().to_string(), to_store_set(set)))
                .collect(),
        )?;
        self.store.flush()?;

        tracing::info!(
            ancestors = summary.ancestor_records,
            created = summary.descendant_records_created,
            merged = summary.descendant_records_merged,
            "closure index updated"
        );
        Ok(summary)
    }
}
