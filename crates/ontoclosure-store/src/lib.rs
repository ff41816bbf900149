//! Ontoclosure Index Store
//!
//! Persisted tables behind the ontology closure indexer:
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                         INDEX STORE                                 │
//! ├─────────────────────────────────────────────────────────────────────┤
//! │                                                                     │
//! │  ┌──────────────┐   namespace ──► { prefix, baseUri }               │
//! │  │  ontologies  │                                                   │
//! │  └──────────────┘                                                   │
//! │  ┌──────────────┐   term ──► { term, ancestor, ... }  (write-once)  │
//! │  │  ancestors   │                                                   │
//! │  └──────────────┘                                                   │
//! │  ┌──────────────┐   term ──► { descendant, ... }      (union-merge) │
//! │  │ descendants  │                                                   │
//! │  └──────────────┘                                                   │
//! │  ┌──────────────┐   table\tcolumn\tterm ──► catalog entry            │
//! │  │   catalog    │                                                   │
//! │  └──────────────┘                                                   │
//! │                                                                     │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Invariants
//!
//! - **Ancestors are write-once**: a term with an ancestor record is never
//!   fetched again, so rewriting one only ever stores the same value.
//! - **Descendants only grow**: `merge_descendants` is a set union; nothing in
//!   this crate removes a descendant.
//!
//! Two implementations ship here: [`MemoryStore`] (tests, dry runs) and
//! [`FileStore`] (single snapshot file, CBOR or JSON by extension).

pub mod memory;
pub mod persistence;


pub use memory::MemoryStore;
pub use persistence::FileStore;

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

// ============================================================================
// Records
// ============================================================================

/// Set of term identifiers as stored in the ancestor/descendant tables.
pub type TermSet = BTreeSet<String>;

/// Registration record for one ontology namespace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OntologyRecord {
    /// Uppercased namespace prefix (`HP`, `SNOMED`, ...)
    pub prefix: String,
    /// IRI prefix that, concatenated with a local code, names a term
    #[serde(rename = "baseUri")]
    pub base_uri: String,
}

/// One occurrence of a term in a metadata table column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogEntry {
    /// `table\tcolumn\tterm`
    pub id: String,
    /// `table\tterm`
    #[serde(rename = "tableTerms")]
    pub table_terms: String,
    #[serde(rename = "tableName")]
    pub table_name: String,
    #[serde(rename = "columnName")]
    pub column_name: String,
    pub term: String,
    pub label: String,
    #[serde(rename = "type")]
    pub kind: String,
}

impl CatalogEntry {
    pub fn new(table_name: &str, column_name: &str, term: &str, label: &str, kind: &str) -> Self {
        Self {
            id: format!("{table_name}\t{column_name}\t{term}"),
            table_terms: format!("{table_name}\t{term}"),
            table_name: table_name.to_string(),
            column_name: column_name.to_string(),
            term: term.to_string(),
            label: label.to_string(),
            kind: kind.to_string(),
        }
    }
}

// ============================================================================
// Errors
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("i/o error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to encode index snapshot: {0}")]
    Encode(String),
    #[error("failed to decode index snapshot {path}: {message}")]
    Decode { path: String, message: String },
    #[error("unsupported snapshot version `{0}`")]
    Version(String),
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

// ============================================================================
// Store contract
// ============================================================================

/// Key-value contract the indexer relies on.
///
/// Implementations must be shareable across the fetch worker threads; all
/// methods take `&self`.
pub trait IndexStore: Send + Sync {
    fn get_ontology(&self, prefix: &str) -> StoreResult<Option<OntologyRecord>>;

    /// Last write wins.
    fn put_ontology(&self, record: OntologyRecord) -> StoreResult<()>;

    fn get_ancestors(&self, term: &str) -> StoreResult<Option<TermSet>>;

    fn has_ancestors(&self, term: &str) -> StoreResult<bool> {
        Ok(self.get_ancestors(term)?.is_some())
    }

    fn put_ancestors(&self, entries: Vec<(String, TermSet)>) -> StoreResult<()>;

    fn get_descendants(&self, term: &str) -> StoreResult<Option<TermSet>>;

    /// Create new descendant records. Existing keys are unioned rather than
    /// replaced so a racing writer can never shrink a record.
    fn put_descendants(&self, entries: Vec<(String, TermSet)>) -> StoreResult<()>;

    /// Union `additions` into the record for `term`, creating it if absent.
    fn merge_descendants(&self, term: &str, additions: &TermSet) -> StoreResult<()>;

    fn put_catalog(&self, entries: Vec<CatalogEntry>) -> StoreResult<()>;

    fn catalog_by_term(&self, term: &str) -> StoreResult<Vec<CatalogEntry>>;

    fn catalog_by_table(&self, table_name: &str) -> StoreResult<Vec<CatalogEntry>>;

    /// Make every accepted write durable.
    fn flush(&self) -> StoreResult<()> {
        Ok(())
    }
}

// ============================================================================
// Shared table state
// ============================================================================

pub const INDEX_SNAPSHOT_VERSION_V1: &str = "ontoclosure_index_v1";

/// The full contents of a store; what [`FileStore`] writes to disk.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexTables {
    pub version: String,
    #[serde(default)]
    pub ontologies: BTreeMap<String, OntologyRecord>,
    #[serde(default)]
    pub ancestors: BTreeMap<String, TermSet>,
    #[serde(default)]
    pub descendants: BTreeMap<String, TermSet>,
    #[serde(default)]
    pub catalog: BTreeMap<String, CatalogEntry>,
}

impl Default for IndexTables {
    fn default() -> Self {
        Self {
            version: INDEX_SNAPSHOT_VERSION_V1.to_string(),
            ontologies: BTreeMap::new(),
            ancestors: BTreeMap::new(),
            descendants: BTreeMap::new(),
            catalog: BTreeMap::new(),
        }
    }
}

impl IndexTables {
    pub(crate) fn union_descendants(&mut self, term: &str, additions: &TermSet) {
        self.descendants
            .entry(term.to_string())
            .or_default()
            .extend(additions.iter().cloned());
    }

    pub(crate) fn catalog_matching<F>(&self, pred: F) -> Vec<CatalogEntry>
    where
        F: Fn(&CatalogEntry) -> bool,
    {
        self.catalog.values().filter(|e| pred(e)).cloned().collect()
    }
}
