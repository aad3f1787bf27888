use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;

use super::{RawResponse, Transport};
use crate::core::TransportError;
use crate::http::RequestSpec;

#[derive(Debug, Clone)]
pub struct MockResponse {
    pub status: u16,
    pub body: String,
    pub content_type: Option<String>,
    pub delay: Option<Duration>,
    pub error: Option<TransportError>,
}

impl MockResponse {
    pub fn status(status: u16) -> Self {
        Self {
            status,
            body: String::new(),
            content_type: None,
            delay: None,
            error: None,
        }
    }

    pub fn text(status: u16, body: &str) -> Self {
        Self {
            body: body.to_string(),
            content_type: Some("text/plain".to_string()),
            ..Self::status(status)
        }
    }

    pub fn json(status: u16, body: Value) -> Self {
        Self {
            body: body.to_string(),
            content_type: Some("application/json".to_string()),
            ..Self::status(status)
        }
    }

    pub fn error(error: TransportError) -> Self {
        Self {
            error: Some(error),
            ..Self::status(0)
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }
}

#[derive(Debug, Default)]
struct Route {
    responses: Vec<MockResponse>,
    served: usize,
}

#[derive(Debug, Default)]
struct Counters {
    calls: AtomicUsize,
    active: AtomicUsize,
    peak_active: AtomicUsize,
    closes: AtomicUsize,
}

/// Decrements the active-call gauge even when the calling task is aborted.
struct ActiveCall<'a>(&'a Counters);

impl<'a> ActiveCall<'a> {
    fn enter(counters: &'a Counters) -> Self {
        let now = counters.active.fetch_add(1, Ordering::SeqCst) + 1;
        counters.peak_active.fetch_max(now, Ordering::SeqCst);
        Self(counters)
    }
}

impl Drop for ActiveCall<'_> {
    fn drop(&mut self) {
        self.0.active.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Scripted transport. Each URL replays its responses in order and keeps
/// repeating the last one; unknown URLs get the fallback response.
#[derive(Clone)]
pub struct MockTransport {
    routes: Arc<Mutex<HashMap<String, Route>>>,
    calls_per_url: Arc<Mutex<HashMap<String, usize>>>,
    fallback: MockResponse,
    counters: Arc<Counters>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self {
            routes: Arc::new(Mutex::new(HashMap::new())),
            calls_per_url: Arc::new(Mutex::new(HashMap::new())),
            fallback: MockResponse::status(404),
            counters: Arc::new(Counters::default()),
        }
    }

    pub fn with_route(self, url: &str, responses: Vec<MockResponse>) -> Self {
        self.routes.lock().insert(
            normalize(url),
            Route {
                responses,
                served: 0,
            },
        );
        self
    }

    pub fn with_fallback(mut self, response: MockResponse) -> Self {
        self.fallback = response;
        self
    }

    pub fn calls(&self) -> usize {
        self.counters.calls.load(Ordering::SeqCst)
    }

    pub fn calls_for(&self, url: &str) -> usize {
        self.calls_per_url
            .lock()
            .get(&normalize(url))
            .copied()
            .unwrap_or(0)
    }

    pub fn active_calls(&self) -> usize {
        self.counters.active.load(Ordering::SeqCst)
    }

    /// Highest number of calls that were in progress at the same time.
    pub fn peak_active_calls(&self) -> usize {
        self.counters.peak_active.load(Ordering::SeqCst)
    }

    pub fn close_count(&self) -> usize {
        self.counters.closes.load(Ordering::SeqCst)
    }

    fn next_response(&self, url: &str) -> MockResponse {
        *self.calls_per_url.lock().entry(url.to_string()).or_insert(0) += 1;

        let mut routes = self.routes.lock();
        match routes.get_mut(url) {
            Some(route) if !route.responses.is_empty() => {
                let index = route.served.min(route.responses.len() - 1);
                route.served += 1;
                route.responses[index].clone()
            }
            _ => self.fallback.clone(),
        }
    }
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new()
    }
}

fn normalize(url: &str) -> String {
    url::Url::parse(url)
        .map(|url| url.to_string())
        .unwrap_or_else(|_| url.to_string())
}

#[async_trait]
impl Transport for MockTransport {
    async fn send(&self, request: &RequestSpec) -> Result<RawResponse, TransportError> {
        self.counters.calls.fetch_add(1, Ordering::SeqCst);
        let _active = ActiveCall::enter(&self.counters);

        let response = self.next_response(request.url().as_str());
        if let Some(delay) = response.delay {
            sleep(delay).await;
        }
        if let Some(error) = response.error {
            return Err(error);
        }

        let mut headers = HashMap::new();
        if let Some(content_type) = response.content_type {
            headers.insert("content-type".to_string(), content_type);
        }

        Ok(RawResponse {
            status: response.status,
            headers,
            body: response.body.into_bytes(),
        })
    }

    fn close(&self) {
        self.counters.closes.fetch_add(1, Ordering::SeqCst);
    }
}
