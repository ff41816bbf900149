//! Partition raw terms into provider clusters by namespace.

use crate::term::{Term, CLINICAL_NAMESPACE};
use std::collections::{BTreeMap, BTreeSet};

/// namespace key → terms in that namespace
pub type NamespaceClusters = BTreeMap<String, BTreeSet<Term>>;

/// Namespace key for one raw term, or `None` when the term is dropped.
///
/// `SNOMED`-prefixed (any case) and purely numeric terms belong to the
/// clinical namespace. Everything else needs a `PREFIX:code` shape with both
/// halves non-empty.
pub fn namespace_of(term: &str) -> Option<&str> {
    if term.is_empty() {
        return None;
    }
    let clinical_prefix = term
        .get(..CLINICAL_NAMESPACE.len())
        .is_some_and(|head| head.eq_ignore_ascii_case(CLINICAL_NAMESPACE));
    if clinical_prefix || term.bytes().all(|b| b.is_ascii_digit()) {
        return Some(CLINICAL_NAMESPACE);
    }
    match term.split_once(':') {
        Some((prefix, code)) if !prefix.is_empty() && !code.is_empty() => Some(prefix),
        _ => None,
    }
}

pub fn classify<I, S>(raw_terms: I) -> NamespaceClusters
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut clusters = NamespaceClusters::new();
    for raw in raw_terms {
        let term = raw.as_ref().trim();
        match namespace_of(term) {
            Some(namespace) => {
                clusters
                    .entry(namespace.to_string())
                    .or_default()
                    .insert(Term::from(term));
            }
            None => {
                if !term.is_empty() {
                    tracing::debug!(term, "dropping term without a recognisable namespace");
                }
            }
        }
    }
    clusters
}

/// Number of terms across all clusters.
pub fn cluster_size(clusters: &NamespaceClusters) -> usize {
    clusters.values().map(BTreeSet::len).sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cluster<'a>(clusters: &'a NamespaceClusters, key: &str) -> Vec<&'a str> {
        clusters
            .get(key)
            .map(|s| s.iter().map(Term::as_str).collect())
            .unwrap_or_default()
    }

    #[test]
    fn clinical_and_curie_terms_are_partitioned() {
        let clusters = classify(["SNOMED:100", "HP:0001", "42"]);
        assert_eq!(cluster(&clusters, "SNOMED"), vec!["42", "SNOMED:100"]);
        assert_eq!(cluster(&clusters, "HP"), vec!["HP:0001"]);
        assert_eq!(clusters.len(), 2);
    }

    #[test]
    fn clinical_prefix_is_case_insensitive() {
        let clusters = classify(["snomed:22298006", "Snomed:1"]);
        assert_eq!(cluster(&clusters, "SNOMED").len(), 2);
    }

    #[test]
    fn unclassifiable_terms_are_dropped() {
        let clusters = classify(["", "   ", "nocolon", "HP:", ":123", "12a"]);
        assert!(clusters.is_empty(), "{clusters:?}");
    }

    #[test]
    fn duplicates_and_whitespace_collapse() {
        let clusters = classify([" NCIT:C3262 ", "NCIT:C3262", "NCIT:C9305"]);
        assert_eq!(cluster(&clusters, "NCIT"), vec!["NCIT:C3262", "NCIT:C9305"]);
        assert_eq!(cluster_size(&clusters), 2);
    }

    #[test]
    fn prefix_keeps_its_case() {
        let clusters = classify(["hp:0001", "HP:0002"]);
        assert_eq!(cluster(&clusters, "hp"), vec!["hp:0001"]);
        assert_eq!(cluster(&clusters, "HP"), vec!["HP:0002"]);
    }
}
