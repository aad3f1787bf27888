use crate::core::limiter::DEFAULT_MAX_CONCURRENT;
use crate::core::retry::RetryPolicy;
use crate::transports::http_transport::DEFAULT_USER_AGENT;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct FetcherConfig {
    pub max_concurrent: usize,
    /// Upper bound for a whole exchange on the HTTP client, on top of the
    /// per-request timeout.
    pub session_timeout: Duration,
    /// Idle connections kept per host.
    pub pool_size: usize,
    pub user_agent: String,
    pub headers: Vec<(String, String)>,
    pub retry_policy: RetryPolicy,
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self {
            max_concurrent: DEFAULT_MAX_CONCURRENT,
            session_timeout: Duration::from_secs(30),
            pool_size: 100,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            headers: Vec::new(),
            retry_policy: RetryPolicy::default(),
        }
    }
}

impl FetcherConfig {
    pub fn with_concurrency(mut self, max_concurrent: usize) -> Self {
        self.max_concurrent = max_concurrent;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.session_timeout = timeout;
        self
    }

    pub fn with_pool_size(mut self, pool_size: usize) -> Self {
        self.pool_size = pool_size;
        self
    }

    pub fn with_user_agent(mut self, user_agent: &str) -> Self {
        self.user_agent = user_agent.to_string();
        self
    }

    pub fn with_headers(mut self, headers: Vec<(&str, &str)>) -> Self {
        self.headers.extend(
            headers
                .into_iter()
                .map(|(key, value)| (key.to_string(), value.to_string())),
        );
        self
    }

    pub fn with_retry(mut self, retry_policy: RetryPolicy) -> Self {
        self.retry_policy = retry_policy;
        self
    }
}
