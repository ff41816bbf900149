//! In-memory index store.

use crate::{CatalogEntry, IndexStore, IndexTables, OntologyRecord, StoreResult, TermSet};
use parking_lot::RwLock;
use std::collections::btree_map::Entry;

/// Tables held behind a single lock. Nothing is durable; `flush` is a no-op.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: RwLock<IndexTables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_tables(tables: IndexTables) -> Self {
        Self {
            tables: RwLock::new(tables),
        }
    }

    /// Clone of the current tables.
    pub fn snapshot(&self) -> IndexTables {
        self.tables.read().clone()
    }

    pub(crate) fn with_tables<R>(&self, f: impl FnOnce(&IndexTables) -> R) -> R {
        f(&self.tables.read())
    }
}

impl IndexStore for MemoryStore {
    fn get_ontology(&self, prefix: &str) -> StoreResult<Option<OntologyRecord>> {
        Ok(self.tables.read().ontologies.get(prefix).cloned())
    }

    fn put_ontology(&self, record: OntologyRecord) -> StoreResult<()> {
        self.tables
            .write()
            .ontologies
            .insert(record.prefix.clone(), record);
        Ok(())
    }

    fn get_ancestors(&self, term: &str) -> StoreResult<Option<TermSet>> {
        Ok(self.tables.read().ancestors.get(term).cloned())
    }

    fn has_ancestors(&self, term: &str) -> StoreResult<bool> {
        Ok(self.tables.read().ancestors.contains_key(term))
    }

    fn put_ancestors(&self, entries: Vec<(String, TermSet)>) -> StoreResult<()> {
        let mut tables = self.tables.write();
        for (term, ancestors) in entries {
            match tables.ancestors.entry(term) {
                Entry::Vacant(slot) => {
                    slot.insert(ancestors);
                }
                Entry::Occupied(slot) => {
                    tracing::debug!(term = %slot.key(), "ancestor record already present; keeping it");
                }
            }
        }
        Ok(())
    }

    fn get_descendants(&self, term: &str) -> StoreResult<Option<TermSet>> {
        Ok(self.tables.read().descendants.get(term).cloned())
    }

    fn put_descendants(&self, entries: Vec<(String, TermSet)>) -> StoreResult<()> {
        let mut tables = self.tables.write();
        for (term, descendants) in entries {
            tables.union_descendants(&term, &descendants);
        }
        Ok(())
    }

    fn merge_descendants(&self, term: &str, additions: &TermSet) -> StoreResult<()> {
        self.tables.write().union_descendants(term, additions);
        Ok(())
    }

    fn put_catalog(&self, entries: Vec<CatalogEntry>) -> StoreResult<()> {
        let mut tables = self.tables.write();
        for entry in entries {
            tables.catalog.insert(entry.id.clone(), entry);
        }
        Ok(())
    }

    fn catalog_by_term(&self, term: &str) -> StoreResult<Vec<CatalogEntry>> {
        Ok(self.tables.read().catalog_matching(|e| e.term == term))
    }

    fn catalog_by_table(&self, table_name: &str) -> StoreResult<Vec<CatalogEntry>> {
        Ok(self
            .tables
            .read()
            .catalog_matching(|e| e.table_name == table_name))
    }
}
