//! Read side of the closure index.

use crate::error::IndexResult;
use crate::term::{from_store_set, AncestorSet, Term};
use ontoclosure_store::IndexStore;
use std::sync::Arc;

pub struct ClosureLookup {
    store: Arc<dyn IndexStore>,
}

impl ClosureLookup {
    pub fn new(store: Arc<dyn IndexStore>) -> Self {
        Self { store }
    }

    pub fn ancestors(&self, term: &str) -> IndexResult<Option<AncestorSet>> {
        Ok(self.store.get_ancestors(term)?.map(from_store_set))
    }

    pub fn descendants(&self, term: &str) -> IndexResult<Option<AncestorSet>> {
        Ok(self.store.get_descendants(term)?.map(from_store_set))
    }

    /// The term plus everything indexed below it; what an "including
    /// descendants" filter matches.
    pub fn expand(&self, term: &str) -> IndexResult<AncestorSet> {
        let mut out = self.descendants(term)?.unwrap_or_default();
        out.insert(Term::from(term));
        Ok(out)
    }

    pub fn expand_all<I, S>(&self, terms: I) -> IndexResult<AncestorSet>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut out = AncestorSet::new();
        for term in terms {
            out.extend(self.expand(term.as_ref())?);
        }
        Ok(out)
    }
}
