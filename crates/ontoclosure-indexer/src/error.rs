use ontoclosure_store::StoreError;

/// Run-level failures. Anything that reaches the caller aborts the run;
/// per-term upstream failures are absorbed and never show up here.
#[derive(Debug, thiserror::Error)]
pub enum IndexError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("failed to read terms from {origin}: {message}")]
    Source { origin: String, message: String },
    #[error(transparent)]
    Config(#[from] crate::config::ConfigError),
    #[error("failed to build http client: {0}")]
    Client(String),
    #[error("could not start any fetch worker: {0}")]
    WorkerPool(String),
}

pub type IndexResult<T> = Result<T, IndexError>;

/// Why a single upstream call did not produce an ancestor set.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FetchError {
    #[error("request to {url} failed: {message}")]
    Transport { url: String, message: String },
    #[error("{url} answered http {status}")]
    Status { url: String, status: u16 },
    #[error("malformed response from {url}: {message}")]
    Malformed { url: String, message: String },
    #[error("gave up after {attempts} attempts: {last}")]
    Exhausted { attempts: u32, last: Box<FetchError> },
    #[error("more than {0} result pages")]
    TooManyPages(usize),
}
