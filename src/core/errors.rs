use crate::core::retry::Classification;
use thiserror::Error;
use url::Url;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("request timed out")]
    Timeout,

    #[error("connection error: {0}")]
    Connection(String),

    #[error("protocol error: {0}")]
    Protocol(String),

    #[error("transport is closed")]
    Closed,
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            TransportError::Timeout
        } else if err.is_connect() {
            TransportError::Connection(err.to_string())
        } else {
            TransportError::Protocol(err.to_string())
        }
    }
}

#[derive(Error, Debug)]
pub enum FetchError {
    #[error("Invalid request: {0}")]
    Validation(String),

    #[error("Transport error for {url}: {source}")]
    Transport {
        url: Url,
        #[source]
        source: TransportError,
    },

    #[error("Server error for {url}: HTTP {status}")]
    Server { url: Url, status: u16 },

    #[error("Client error for {url}: HTTP {status}")]
    Client { url: Url, status: u16 },

    #[error("Retries exhausted for {url} after {attempts} attempts: {last}")]
    ExhaustedRetries {
        url: Url,
        attempts: usize,
        #[source]
        last: Box<FetchError>,
    },

    #[error("Fetch session is closed")]
    SessionClosed,

    #[error("Batch was cancelled")]
    Cancelled,

    #[error("Fetch task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl FetchError {
    /// Classification of the underlying failure. Exhausted retries report the
    /// classification of the last attempt.
    pub fn classification(&self) -> Option<Classification> {
        match self {
            FetchError::Transport { .. } => Some(Classification::TransportError),
            FetchError::Server { .. } => Some(Classification::ServerError),
            FetchError::Client { .. } => Some(Classification::ClientError),
            FetchError::ExhaustedRetries { last, .. } => last.classification(),
            _ => None,
        }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            FetchError::Server { status, .. } | FetchError::Client { status, .. } => Some(*status),
            FetchError::ExhaustedRetries { last, .. } => last.status(),
            _ => None,
        }
    }
}

impl From<url::ParseError> for FetchError {
    fn from(err: url::ParseError) -> Self {
        FetchError::Validation(format!("invalid url: {}", err))
    }
}

impl From<serde_json::Error> for FetchError {
    fn from(err: serde_json::Error) -> Self {
        FetchError::Validation(format!("body is not serializable: {}", err))
    }
}

impl From<reqwest::header::InvalidHeaderName> for FetchError {
    fn from(err: reqwest::header::InvalidHeaderName) -> Self {
        FetchError::Validation(format!("invalid header name: {}", err))
    }
}

impl From<reqwest::header::InvalidHeaderValue> for FetchError {
    fn from(err: reqwest::header::InvalidHeaderValue) -> Self {
        FetchError::Validation(format!("invalid header value: {}", err))
    }
}

pub type FetchResult<T> = Result<T, FetchError>;
