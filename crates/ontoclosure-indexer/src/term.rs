//! Terms, namespaces and resolved ontology metadata.

use ontoclosure_store::{OntologyRecord, TermSet};
use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::collections::BTreeSet;
use std::fmt;

/// Namespace key of the clinical terminology (also used for bare numeric codes).
pub const CLINICAL_NAMESPACE: &str = "SNOMED";

/// A filtering term, e.g. `HP:0001250`, `SNOMED:22298006` or `22298006`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Term(String);

pub type AncestorSet = BTreeSet<Term>;

impl Term {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }

    /// Text before the first `:`, if any.
    pub fn prefix(&self) -> Option<&str> {
        self.0.split_once(':').map(|(p, _)| p)
    }

    /// Text after the first `:`, or the whole term when there is no separator.
    pub fn local_code(&self) -> &str {
        self.0.split_once(':').map_or(self.0.as_str(), |(_, code)| code)
    }

    /// `SNOMED:`-prefixed (any case) rather than a bare code.
    pub fn has_clinical_prefix(&self) -> bool {
        self.0
            .get(..CLINICAL_NAMESPACE.len())
            .is_some_and(|head| head.eq_ignore_ascii_case(CLINICAL_NAMESPACE))
    }
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Term {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for Term {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl Borrow<str> for Term {
    fn borrow(&self) -> &str {
        &self.0
    }
}

pub(crate) fn to_store_set(terms: &AncestorSet) -> TermSet {
    terms.iter().map(|t| t.as_str().to_string()).collect()
}

pub(crate) fn from_store_set(terms: TermSet) -> AncestorSet {
    terms.into_iter().map(Term::from).collect()
}

/// Which upstream protocol answers hierarchy questions for a namespace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProviderKind {
    /// OLS `hierarchicalAncestors`
    Hierarchy,
    /// FHIR `ValueSet/$expand` with a `generalizes` filter
    ValueSetExpansion,
}

impl ProviderKind {
    pub fn for_namespace(namespace: &str) -> Self {
        if namespace.eq_ignore_ascii_case(CLINICAL_NAMESPACE) {
            ProviderKind::ValueSetExpansion
        } else {
            ProviderKind::Hierarchy
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OntologyInfo {
    pub prefix: String,
    pub base_uri: String,
    pub kind: ProviderKind,
}

impl From<OntologyRecord> for OntologyInfo {
    fn from(record: OntologyRecord) -> Self {
        let kind = ProviderKind::for_namespace(&record.prefix);
        Self {
            prefix: record.prefix,
            base_uri: record.base_uri,
            kind,
        }
    }
}

impl From<&OntologyInfo> for OntologyRecord {
    fn from(info: &OntologyInfo) -> Self {
        OntologyRecord {
            prefix: info.prefix.clone(),
            base_uri: info.base_uri.clone(),
        }
    }
}
