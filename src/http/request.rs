use crate::{FetchError, FetchResult};
use reqwest::header::{HeaderName, HeaderValue};
use reqwest::Method;
use serde_json::Value;
use std::collections::HashMap;
use std::time::Duration;
use url::Url;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);
pub const DEFAULT_MAX_RETRIES: usize = 3;

/// Immutable description of one request. Built through the consuming
/// `with_*` methods, each of which validates its input.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestSpec {
    url: Url,
    method: Method,
    headers: Option<HashMap<String, String>>,
    body: Option<Value>,
    timeout: Duration,
    max_retries: usize,
}

impl RequestSpec {
    pub fn new(url: &str) -> FetchResult<Self> {
        Self::from_url(Url::parse(url)?)
    }

    pub fn from_url(url: Url) -> FetchResult<Self> {
        match url.scheme() {
            "http" | "https" => {}
            other => {
                return Err(FetchError::Validation(format!(
                    "unsupported url scheme '{}' in {}",
                    other, url
                )))
            }
        }

        Ok(Self {
            url,
            method: Method::GET,
            headers: None,
            body: None,
            timeout: DEFAULT_TIMEOUT,
            max_retries: DEFAULT_MAX_RETRIES,
        })
    }

    pub fn with_method(mut self, method: Method) -> Self {
        self.method = method;
        self
    }

    pub fn with_header(mut self, name: &str, value: &str) -> FetchResult<Self> {
        HeaderName::from_bytes(name.as_bytes())?;
        HeaderValue::from_str(value)?;

        self.headers
            .get_or_insert_with(HashMap::new)
            .insert(name.to_string(), value.to_string());
        Ok(self)
    }

    pub fn with_headers(self, headers: Vec<(&str, &str)>) -> FetchResult<Self> {
        headers
            .into_iter()
            .try_fold(self, |spec, (name, value)| spec.with_header(name, value))
    }

    pub fn with_json<T: serde::Serialize>(mut self, body: &T) -> FetchResult<Self> {
        self.body = Some(serde_json::to_value(body)?);
        Ok(self)
    }

    pub fn with_timeout(mut self, timeout: Duration) -> FetchResult<Self> {
        if timeout.is_zero() {
            return Err(FetchError::Validation(format!(
                "timeout for {} must be greater than zero",
                self.url
            )));
        }
        self.timeout = timeout;
        Ok(self)
    }

    pub fn with_max_retries(mut self, max_retries: usize) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn headers(&self) -> Option<&HashMap<String, String>> {
        self.headers.as_ref()
    }

    /// Payload to send. GET requests never carry a body.
    pub fn body(&self) -> Option<&Value> {
        if self.method == Method::GET {
            None
        } else {
            self.body.as_ref()
        }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn max_retries(&self) -> usize {
        self.max_retries
    }
}
