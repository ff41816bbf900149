//! Namespace → ontology metadata, registered lazily and persisted.

use crate::error::{FetchError, IndexResult};
use crate::http::HttpBackend;
use crate::term::{OntologyInfo, ProviderKind, CLINICAL_NAMESPACE};
use ontoclosure_store::{IndexStore, OntologyRecord};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

/// Resolves namespaces for one indexing run.
///
/// Lookups go run cache → persisted store → upstream. Negative answers are
/// cached for the run too, so an unknown namespace costs one upstream call.
pub struct OntologyRegistry {
    store: Arc<dyn IndexStore>,
    http: Arc<dyn HttpBackend>,
    ols_base: String,
    clinical_base_uri: String,
    cache: RwLock<HashMap<String, Option<OntologyInfo>>>,
}

impl OntologyRegistry {
    pub fn new(
        store: Arc<dyn IndexStore>,
        http: Arc<dyn HttpBackend>,
        ols_base: &str,
        clinical_base_uri: &str,
    ) -> Self {
        Self {
            store,
            http,
            ols_base: ols_base.trim_end_matches('/').to_string(),
            clinical_base_uri: clinical_base_uri.to_string(),
            cache: RwLock::new(HashMap::new()),
        }
    }

    /// `Ok(None)` means the namespace is not registered anywhere; callers skip
    /// it. Only store failures are errors.
    pub fn resolve(&self, namespace: &str) -> IndexResult<Option<OntologyInfo>> {
        let key = namespace.to_ascii_uppercase();
        if let Some(hit) = self.cache.read().get(&key) {
            return Ok(hit.clone());
        }

        let resolved = match self.store.get_ontology(&key)? {
            Some(record) => Some(OntologyInfo::from(record)),
            None => self.register(namespace, &key)?,
        };

        self.cache.write().insert(key, resolved.clone());
        Ok(resolved)
    }

    fn register(&self, namespace: &str, key: &str) -> IndexResult<Option<OntologyInfo>> {
        let record = if ProviderKind::for_namespace(key) == ProviderKind::ValueSetExpansion {
            OntologyRecord {
                prefix: CLINICAL_NAMESPACE.to_string(),
                base_uri: self.clinical_base_uri.clone(),
            }
        } else {
            match self.lookup(namespace, key) {
                Ok(Some(record)) => record,
                Ok(None) => {
                    tracing::warn!(namespace, "namespace is not registered with the lookup service; skipping");
                    return Ok(None);
                }
                Err(err) => {
                    tracing::warn!(namespace, error = %err, "namespace lookup failed; skipping");
                    return Ok(None);
                }
            }
        };

        tracing::info!(prefix = %record.prefix, base_uri = %record.base_uri, "registered ontology");
        self.store.put_ontology(record.clone())?;
        Ok(Some(OntologyInfo::from(record)))
    }

    /// `GET {ols}/{namespace}` → `{ ontologyId, config: { baseUris: [..] } }`
    fn lookup(&self, namespace: &str, key: &str) -> Result<Option<OntologyRecord>, FetchError> {
        let url = format!("{}/{}", self.ols_base, namespace);
        let reply = self.http.get(&url)?;
        if reply.status == 404 {
            return Ok(None);
        }
        if !reply.is_success() {
            return Err(FetchError::Status {
                url,
                status: reply.status,
            });
        }
        let body = reply.json(&url)?;
        if body.get("ontologyId").and_then(|v| v.as_str()).is_none() {
            return Ok(None);
        }
        let base_uri = body
            .pointer("/config/baseUris/0")
            .and_then(|v| v.as_str())
            .filter(|s| !s.is_empty());
        Ok(base_uri.map(|base_uri| OntologyRecord {
            prefix: key.to_string(),
            base_uri: base_uri.to_string(),
        }))
    }
}
