//! Scripted upstream services shared by the indexer tests.

#![allow(dead_code)]

use ontoclosure_indexer::provider::double_encode;
use ontoclosure_indexer::{FetchError, HttpBackend, HttpReply, IndexerConfig};
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::collections::{HashMap, VecDeque};

pub const OLS: &str = "http://ols.test/api/ontologies";
pub const ONTOSERVER: &str = "http://tx.test/fhir/ValueSet/$expand";
pub const HP_BASE: &str = "http://purl.obolibrary.org/obo/HP_";

pub fn test_config() -> IndexerConfig {
    IndexerConfig {
        ols_url: OLS.to_string(),
        ontoserver_url: ONTOSERVER.to_string(),
        max_workers: 8,
        retry_delay_ms: 0,
        ..Default::default()
    }
}

fn reply(status: u16, body: impl Into<String>) -> HttpReply {
    HttpReply {
        status,
        body: body.into(),
    }
}

/// Canned replies by URL (GET) or by `generalizes` code (POST). Each queue
/// replays in order and then repeats its last reply; unknown routes fail
/// with a transport error.
#[derive(Default)]
pub struct ScriptedUpstream {
    gets: Mutex<HashMap<String, VecDeque<HttpReply>>>,
    posts: Mutex<HashMap<String, VecDeque<HttpReply>>>,
    calls: Mutex<Vec<String>>,
}

impl ScriptedUpstream {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ontology(self, namespace: &str, base_uri: &str) -> Self {
        self.ontology_after(namespace, base_uri, &[])
    }

    /// Lookup answers each of `failures` in turn before the registration.
    pub fn ontology_after(self, namespace: &str, base_uri: &str, failures: &[u16]) -> Self {
        let body = json!({
            "ontologyId": namespace.to_lowercase(),
            "config": { "baseUris": [base_uri] }
        });
        let replies = failures
            .iter()
            .map(|&s| reply(s, ""))
            .chain(std::iter::once(reply(200, body.to_string())))
            .collect();
        self.get(&format!("{OLS}/{namespace}"), replies)
    }

    pub fn hierarchy(self, namespace: &str, base_uri: &str, code: &str, ancestors: &[&str]) -> Self {
        let terms: Vec<Value> = ancestors.iter().map(|a| json!({ "obo_id": a })).collect();
        let body = json!({ "_embedded": { "terms": terms } });
        self.get(&ancestors_url(namespace, base_uri, code), vec![reply(200, body.to_string())])
    }

    pub fn hierarchy_status(self, namespace: &str, base_uri: &str, code: &str, status: u16) -> Self {
        self.get(&ancestors_url(namespace, base_uri, code), vec![reply(status, "")])
    }

    pub fn get(self, url: &str, replies: Vec<HttpReply>) -> Self {
        self.gets.lock().insert(url.to_string(), replies.into());
        self
    }

    /// `statuses` are answered in order; a 200 carries `codes` as the expansion.
    pub fn expansion(self, code: &str, statuses: &[u16], codes: &[&str]) -> Self {
        let contains: Vec<Value> = codes.iter().map(|c| json!({ "code": c })).collect();
        let body = json!({ "expansion": { "contains": contains } }).to_string();
        let replies = statuses
            .iter()
            .map(|&s| reply(s, if s == 200 { body.clone() } else { String::new() }))
            .collect();
        self.posts.lock().insert(code.to_string(), replies);
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }

    pub fn calls_mentioning(&self, needle: &str) -> usize {
        self.calls.lock().iter().filter(|c| c.contains(needle)).count()
    }

    fn next(queue: Option<&mut VecDeque<HttpReply>>) -> Option<HttpReply> {
        let queue = queue?;
        if queue.len() > 1 {
            queue.pop_front()
        } else {
            queue.front().cloned()
        }
    }
}

pub fn ancestors_url(namespace: &str, base_uri: &str, code: &str) -> String {
    format!(
        "{OLS}/{namespace}/terms/{}/hierarchicalAncestors",
        double_encode(&format!("{base_uri}{code}"))
    )
}

impl HttpBackend for ScriptedUpstream {
    fn get(&self, url: &str) -> Result<HttpReply, FetchError> {
        self.calls.lock().push(format!("GET {url}"));
        Self::next(self.gets.lock().get_mut(url)).ok_or_else(|| FetchError::Transport {
            url: url.to_string(),
            message: "connection refused".to_string(),
        })
    }

    fn post_json(&self, url: &str, body: &Value) -> Result<HttpReply, FetchError> {
        let code = body
            .pointer("/parameter/0/resource/compose/include/0/filter/0/value")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        self.calls.lock().push(format!("POST {code}"));
        Self::next(self.posts.lock().get_mut(&code)).ok_or_else(|| FetchError::Transport {
            url: url.to_string(),
            message: "connection refused".to_string(),
        })
    }
}
