//! Upstream ancestor providers.
//!
//! Two services answer "what are the ancestors of this term":
//!
//! - [`OlsProvider`]: the general ontology lookup service. One attempt per
//!   run; a failed term is picked up again by the next run.
//! - [`ClinicalProvider`]: the FHIR terminology server used for the clinical
//!   namespace. Known to fail transiently, so it retries in-run.

mod clinical;
mod ols;

pub use clinical::ClinicalProvider;
pub use ols::{double_encode, OlsProvider};

use crate::config::IndexerConfig;
use crate::error::FetchError;
use crate::http::HttpBackend;
use crate::term::{AncestorSet, OntologyInfo, ProviderKind, Term};
use std::sync::Arc;

pub trait AncestorProvider: Send + Sync {
    fn kind(&self) -> ProviderKind;

    /// Ancestors as reported upstream. The term itself is not guaranteed to
    /// be included; the builder adds it.
    fn fetch(&self, term: &Term, info: &OntologyInfo) -> Result<AncestorSet, FetchError>;
}

/// One provider per [`ProviderKind`].
#[derive(Clone)]
pub struct ProviderSet {
    hierarchy: Arc<dyn AncestorProvider>,
    value_set: Arc<dyn AncestorProvider>,
}

impl ProviderSet {
    pub fn new(hierarchy: Arc<dyn AncestorProvider>, value_set: Arc<dyn AncestorProvider>) -> Self {
        Self {
            hierarchy,
            value_set,
        }
    }

    pub fn from_config(config: &IndexerConfig, http: Arc<dyn HttpBackend>) -> Self {
        Self::new(
            Arc::new(OlsProvider::new(http.clone(), config.ols_base(), config.ols_max_pages)),
            Arc::new(ClinicalProvider::new(
                http,
                &config.ontoserver_url,
                config.clinical_max_attempts,
                config.retry_delay(),
            )),
        )
    }

    pub fn for_kind(&self, kind: ProviderKind) -> &Arc<dyn AncestorProvider> {
        match kind {
            ProviderKind::Hierarchy => &self.hierarchy,
            ProviderKind::ValueSetExpansion => &self.value_set,
        }
    }
}
