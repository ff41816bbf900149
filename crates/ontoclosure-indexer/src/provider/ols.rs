use super::AncestorProvider;
use crate::error::FetchError;
use crate::http::HttpBackend;
use crate::term::{AncestorSet, OntologyInfo, ProviderKind, Term};
use serde_json::Value;
use std::sync::Arc;
use url::form_urlencoded::byte_serialize;

/// Form-encode twice. OLS expects the term IRI double-encoded inside the path.
pub fn double_encode(iri: &str) -> String {
    let once: String = byte_serialize(iri.as_bytes()).collect();
    byte_serialize(once.as_bytes()).collect()
}

pub struct OlsProvider {
    http: Arc<dyn HttpBackend>,
    ols_base: String,
    max_pages: usize,
}

impl OlsProvider {
    pub fn new(http: Arc<dyn HttpBackend>, ols_base: &str, max_pages: usize) -> Self {
        Self {
            http,
            ols_base: ols_base.trim_end_matches('/').to_string(),
            max_pages: max_pages.max(1),
        }
    }

    pub fn ancestors_url(&self, term: &Term, info: &OntologyInfo) -> String {
        let namespace = term.prefix().unwrap_or(&info.prefix);
        let iri = format!("{}{}", info.base_uri, term.local_code());
        format!(
            "{}/{}/terms/{}/hierarchicalAncestors",
            self.ols_base,
            namespace,
            double_encode(&iri)
        )
    }

    fn fetch_pages(&self, first_url: String) -> Result<AncestorSet, FetchError> {
        let mut ancestors = AncestorSet::new();
        let mut next = Some(first_url);
        let mut pages = 0;

        while let Some(url) = next.take() {
            if pages == self.max_pages {
                return Err(FetchError::TooManyPages(self.max_pages));
            }
            pages += 1;

            let reply = self.http.get(&url)?;
            if !reply.is_success() {
                return Err(FetchError::Status {
                    url,
                    status: reply.status,
                });
            }
            let body = reply.json(&url)?;
            collect_obo_ids(&body, &url, &mut ancestors)?;
            next = body
                .pointer("/_links/next/href")
                .and_then(Value::as_str)
                .map(str::to_string);
        }
        Ok(ancestors)
    }
}

/// `_embedded.terms[].obo_id`; a page without `_embedded` carries no terms.
fn collect_obo_ids(body: &Value, url: &str, out: &mut AncestorSet) -> Result<(), FetchError> {
    let malformed = |message: &str| FetchError::Malformed {
        url: url.to_string(),
        message: message.to_string(),
    };
    if !body.is_object() {
        return Err(malformed("expected a JSON object"));
    }
    let Some(embedded) = body.get("_embedded") else {
        return Ok(());
    };
    let terms = embedded
        .get("terms")
        .and_then(Value::as_array)
        .ok_or_else(|| malformed("`_embedded.terms` is not a list"))?;
    for entry in terms {
        if let Some(obo_id) = entry.get("obo_id").and_then(Value::as_str) {
            if !obo_id.is_empty() {
                out.insert(Term::from(obo_id));
            }
        }
    }
    Ok(())
}

impl AncestorProvider for OlsProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Hierarchy
    }

    fn fetch(&self, term: &Term, info: &OntologyInfo) -> Result<AncestorSet, FetchError> {
        let result = self.fetch_pages(self.ancestors_url(term, info));
        if let Err(err) = &result {
            tracing::warn!(term = %term, error = %err, "error fetching term from ontology lookup service");
        }
        result
    }
}
