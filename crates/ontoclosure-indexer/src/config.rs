//! Indexer configuration: defaults, optional JSON file, environment overrides.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

pub const DEFAULT_OLS_URL: &str = "https://www.ebi.ac.uk/ols/api/ontologies";
pub const DEFAULT_ONTOSERVER_URL: &str = "https://r4.ontoserver.csiro.au/fhir/ValueSet/$expand";
pub const DEFAULT_CLINICAL_BASE_URI: &str = "http://snomed.info/sct";

pub const OLS_URL_ENV: &str = "ONTOCLOSURE_OLS_URL";
pub const ONTOSERVER_URL_ENV: &str = "ONTOCLOSURE_ONTOSERVER_URL";
pub const WORKERS_ENV: &str = "ONTOCLOSURE_WORKERS";
pub const RETRY_DELAY_ENV: &str = "ONTOCLOSURE_RETRY_DELAY_MS";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexerConfig {
    /// Base of the general ontology lookup service (`.../ontologies`)
    pub ols_url: String,
    /// FHIR `ValueSet/$expand` endpoint of the clinical terminology service
    pub ontoserver_url: String,
    /// System URI sent for the reserved clinical namespace
    pub clinical_base_uri: String,
    /// Upper bound on concurrently running fetch tasks
    pub max_workers: usize,
    /// Total attempts (first try included) against the clinical service
    pub clinical_max_attempts: u32,
    /// Sleep between clinical attempts
    pub retry_delay_ms: u64,
    /// Per-request timeout; the HTTP client default applies when unset
    pub http_timeout_secs: Option<u64>,
    /// Cap on `_links.next` pages followed for one hierarchy lookup
    pub ols_max_pages: usize,
}

impl Default for IndexerConfig {
    fn default() -> Self {
        Self {
            ols_url: DEFAULT_OLS_URL.to_string(),
            ontoserver_url: DEFAULT_ONTOSERVER_URL.to_string(),
            clinical_base_uri: DEFAULT_CLINICAL_BASE_URI.to_string(),
            max_workers: 500,
            clinical_max_attempts: 10,
            retry_delay_ms: 1000,
            http_timeout_secs: None,
            ols_max_pages: 50,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config file {path}: {message}")]
    Parse { path: String, message: String },
    #[error("invalid value for {name}: `{value}`")]
    Env { name: &'static str, value: String },
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

impl IndexerConfig {
    /// Defaults, overlaid by `path` (if given), overlaid by the environment.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        let config = config.with_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        serde_json::from_str(&text).map_err(|e| ConfigError::Parse {
            path: path.display().to_string(),
            message: e.to_string(),
        })
    }

    pub fn with_env_overrides(self) -> Result<Self, ConfigError> {
        self.with_overrides(|name| std::env::var(name).ok())
    }

    fn with_overrides(
        mut self,
        lookup: impl Fn(&'static str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        if let Some(url) = lookup(OLS_URL_ENV) {
            self.ols_url = url;
        }
        if let Some(url) = lookup(ONTOSERVER_URL_ENV) {
            self.ontoserver_url = url;
        }
        if let Some(value) = lookup(WORKERS_ENV) {
            self.max_workers = value.trim().parse().map_err(|_| ConfigError::Env {
                name: WORKERS_ENV,
                value: value.clone(),
            })?;
        }
        if let Some(value) = lookup(RETRY_DELAY_ENV) {
            self.retry_delay_ms = value.trim().parse().map_err(|_| ConfigError::Env {
                name: RETRY_DELAY_ENV,
                value: value.clone(),
            })?;
        }
        Ok(self)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_workers == 0 {
            return Err(ConfigError::Invalid("max_workers must be > 0".to_string()));
        }
        if self.clinical_max_attempts == 0 {
            return Err(ConfigError::Invalid(
                "clinical_max_attempts must be > 0".to_string(),
            ));
        }
        if self.ols_max_pages == 0 {
            return Err(ConfigError::Invalid("ols_max_pages must be > 0".to_string()));
        }
        Ok(())
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }

    pub fn http_timeout(&self) -> Option<Duration> {
        self.http_timeout_secs.map(Duration::from_secs)
    }

    /// OLS base with any trailing slash removed.
    pub fn ols_base(&self) -> &str {
        self.ols_url.trim_end_matches('/')
    }
}
