use chrono::prelude::*;
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use std::time::Duration;
use url::Url;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ResponseBody {
    Json(Value),
    Text(String),
}

impl ResponseBody {
    /// Decodes a raw body according to the declared content type. Only a JSON
    /// content type yields structured data; everything else is opaque text.
    pub fn decode(content_type: Option<&str>, raw: &[u8]) -> Self {
        match content_type {
            Some(content_type) if content_type.to_ascii_lowercase().contains("json") => {
                match serde_json::from_slice(raw) {
                    Ok(value) => ResponseBody::Json(value),
                    Err(e) => ResponseBody::Text(format!("Error reading data: {}", e)),
                }
            }
            _ => ResponseBody::Text(String::from_utf8_lossy(raw).into_owned()),
        }
    }

    pub fn as_json(&self) -> Option<&Value> {
        match self {
            ResponseBody::Json(value) => Some(value),
            ResponseBody::Text(_) => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            ResponseBody::Text(text) => Some(text),
            ResponseBody::Json(_) => None,
        }
    }
}

/// Outcome of the attempt that completed a request successfully.
#[derive(Debug, Clone, Serialize)]
pub struct ResponseRecord {
    url: Url,
    status_code: u16,
    headers: HashMap<String, String>,
    body: ResponseBody,
    elapsed: Duration,
    attempt_number: usize,
    timestamp: DateTime<Utc>,
}

impl ResponseRecord {
    pub(crate) fn new(
        url: Url,
        status_code: u16,
        headers: HashMap<String, String>,
        body: ResponseBody,
        elapsed: Duration,
        attempt_number: usize,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            url,
            status_code,
            headers,
            body,
            elapsed,
            attempt_number,
            timestamp,
        }
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn status_code(&self) -> u16 {
        self.status_code
    }

    pub fn headers(&self) -> &HashMap<String, String> {
        &self.headers
    }

    pub fn body(&self) -> &ResponseBody {
        &self.body
    }

    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    pub fn attempt_number(&self) -> usize {
        self.attempt_number
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }
}
