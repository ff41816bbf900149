use super::AncestorProvider;
use crate::error::FetchError;
use crate::http::HttpBackend;
use crate::term::{AncestorSet, OntologyInfo, ProviderKind, Term, CLINICAL_NAMESPACE};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;

/// FHIR `ValueSet/$expand` with a `generalizes` filter.
pub struct ClinicalProvider {
    http: Arc<dyn HttpBackend>,
    expand_url: String,
    max_attempts: u32,
    retry_delay: Duration,
}

impl ClinicalProvider {
    pub fn new(
        http: Arc<dyn HttpBackend>,
        expand_url: &str,
        max_attempts: u32,
        retry_delay: Duration,
    ) -> Self {
        Self {
            http,
            expand_url: expand_url.to_string(),
            max_attempts: max_attempts.max(1),
            retry_delay,
        }
    }

    /// `Parameters` resource asking for every concept that generalizes `code`.
    pub fn expand_request(system: &str, code: &str) -> Value {
        json!({
            "resourceType": "Parameters",
            "parameter": [{
                "name": "valueSet",
                "resource": {
                    "resourceType": "ValueSet",
                    "compose": {
                        "include": [{
                            "system": system,
                            "filter": [{
                                "property": "concept",
                                "op": "generalizes",
                                "value": code
                            }]
                        }]
                    }
                }
            }]
        })
    }

    fn attempt(&self, body: &Value) -> Result<Value, FetchError> {
        let reply = self.http.post_json(&self.expand_url, body)?;
        if reply.status != 200 {
            return Err(FetchError::Status {
                url: self.expand_url.clone(),
                status: reply.status,
            });
        }
        reply.json(&self.expand_url)
    }

    fn expand_with_retry(&self, body: &Value) -> Result<Value, FetchError> {
        let mut attempt = 1;
        loop {
            match self.attempt(body) {
                Ok(value) => return Ok(value),
                Err(err @ FetchError::Malformed { .. }) => return Err(err),
                Err(err) if attempt >= self.max_attempts => {
                    return Err(FetchError::Exhausted {
                        attempts: attempt,
                        last: Box::new(err),
                    });
                }
                Err(err) => {
                    tracing::debug!(attempt, error = %err, "terminology server attempt failed; retrying");
                    attempt += 1;
                    std::thread::sleep(self.retry_delay);
                }
            }
        }
    }
}

/// `expansion.contains[].code`, prefixed when the input term was prefixed.
fn expansion_codes(body: &Value, url: &str, prefixed: bool) -> Result<AncestorSet, FetchError> {
    let contains = body
        .pointer("/expansion/contains")
        .and_then(Value::as_array)
        .ok_or_else(|| FetchError::Malformed {
            url: url.to_string(),
            message: "missing `expansion.contains`".to_string(),
        })?;
    Ok(contains
        .iter()
        .filter_map(|c| c.get("code").and_then(Value::as_str))
        .map(|code| {
            if prefixed {
                Term::new(format!("{CLINICAL_NAMESPACE}:{code}"))
            } else {
                Term::from(code)
            }
        })
        .collect())
}

impl AncestorProvider for ClinicalProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::ValueSetExpansion
    }

    fn fetch(&self, term: &Term, info: &OntologyInfo) -> Result<AncestorSet, FetchError> {
        let prefixed = term.has_clinical_prefix();
        let body = Self::expand_request(&info.base_uri, term.local_code());
        let result = self
            .expand_with_retry(&body)
            .and_then(|value| expansion_codes(&value, &self.expand_url, prefixed));
        if let Err(err) = &result {
            tracing::warn!(term = %term, error = %err, "error fetching term from terminology server");
        }
        result
    }
}
