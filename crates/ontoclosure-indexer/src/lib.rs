//! Ontology term closure indexer.
//!
//! Given the filtering terms in use, compute each term's ancestors (from the
//! upstream hierarchy services) and, by inversion, each term's descendants,
//! so "term X including descendants" becomes a key lookup.
//!
//! ```text
//!  TermSource ─► classify ─► DedupGate ─► FetchOrchestrator ─► ClosureIndexBuilder
//!                                          │        │                  │
//!                               OntologyRegistry  AncestorProvider   IndexStore
//!                                                 (OLS | FHIR)
//! ```
//!
//! The index only grows: ancestor records are write-once and descendant
//! records are unions, so a failed or repeated run is fixed by running again.

pub mod builder;
pub mod catalog;
pub mod classifier;
pub mod config;
pub mod dedup;
pub mod error;
pub mod http;
pub mod indexer;
pub mod lookup;
pub mod orchestrator;
pub mod provider;
pub mod registry;
pub mod source;
pub mod term;

pub use builder::{BuildSummary, ClosureIndexBuilder};
pub use catalog::TermCatalog;
pub use classifier::{classify, NamespaceClusters};
pub use config::IndexerConfig;
pub use dedup::DedupGate;
pub use error::{FetchError, IndexError, IndexResult};
pub use http::{HttpBackend, HttpReply, ReqwestBackend};
pub use indexer::{ClosureIndexer, RunSummary};
pub use lookup::ClosureLookup;
pub use orchestrator::{FetchOrchestrator, FetchReport};
pub use provider::{AncestorProvider, ClinicalProvider, OlsProvider, ProviderSet};
pub use registry::OntologyRegistry;
pub use source::{CsvTermSource, StaticTermSource, TermSource};
pub use term::{AncestorSet, OntologyInfo, ProviderKind, Term, CLINICAL_NAMESPACE};

pub use ontoclosure_store as store;
