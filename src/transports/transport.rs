use crate::core::TransportError;
use crate::http::RequestSpec;
use async_trait::async_trait;
use std::collections::HashMap;

/// Raw reply of a transport, before any body decoding.
#[derive(Debug, Clone, PartialEq)]
pub struct RawResponse {
    pub status: u16,
    pub headers: HashMap<String, String>,
    pub body: Vec<u8>,
}

impl RawResponse {
    pub fn content_type(&self) -> Option<&str> {
        self.headers
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case("content-type"))
            .map(|(_, value)| value.as_str())
    }
}

#[async_trait]
pub trait Transport: Send + Sync {
    /// Performs exactly one request, bounded by the request's own timeout.
    async fn send(&self, request: &RequestSpec) -> Result<RawResponse, TransportError>;

    /// Releases pooled connections. Called once when the owning session ends.
    fn close(&self);
}
