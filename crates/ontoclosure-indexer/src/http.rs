//! Minimal blocking HTTP seam used by the registry and the providers.

use crate::error::{FetchError, IndexError};
use reqwest::blocking::Client;
use std::time::Duration;

/// Status and body of one HTTP exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpReply {
    pub status: u16,
    pub body: String,
}

impl HttpReply {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn json(&self, url: &str) -> Result<serde_json::Value, FetchError> {
        serde_json::from_str(&self.body).map_err(|e| FetchError::Malformed {
            url: url.to_string(),
            message: e.to_string(),
        })
    }
}

/// Transport errors are `Err`; any HTTP status, including 4xx/5xx, is `Ok`.
pub trait HttpBackend: Send + Sync {
    fn get(&self, url: &str) -> Result<HttpReply, FetchError>;

    fn post_json(&self, url: &str, body: &serde_json::Value) -> Result<HttpReply, FetchError>;
}

pub struct ReqwestBackend {
    client: Client,
}

impl ReqwestBackend {
    pub fn new(timeout: Option<Duration>) -> Result<Self, IndexError> {
        let mut builder = Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|e| IndexError::Client(e.to_string()))?;
        Ok(Self { client })
    }

    fn finish(url: &str, resp: reqwest::Result<reqwest::blocking::Response>) -> Result<HttpReply, FetchError> {
        let transport = |e: reqwest::Error| FetchError::Transport {
            url: url.to_string(),
            message: e.to_string(),
        };
        let resp = resp.map_err(transport)?;
        let status = resp.status().as_u16();
        let body = resp.text().map_err(transport)?;
        Ok(HttpReply { status, body })
    }
}

impl HttpBackend for ReqwestBackend {
    fn get(&self, url: &str) -> Result<HttpReply, FetchError> {
        Self::finish(url, self.client.get(url).send())
    }

    fn post_json(&self, url: &str, body: &serde_json::Value) -> Result<HttpReply, FetchError> {
        Self::finish(url, self.client.post(url).json(body).send())
    }
}
