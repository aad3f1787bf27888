use async_trait::async_trait;
use log::debug;
use parking_lot::RwLock;
use reqwest::{header, Client, ClientBuilder};
use std::collections::HashMap;

use super::{RawResponse, Transport};
use crate::core::{FetcherConfig, TransportError};
use crate::http::RequestSpec;
use crate::{FetchError, FetchResult};

pub const DEFAULT_USER_AGENT: &str = concat!("turbofetch/", env!("CARGO_PKG_VERSION"));

/// `reqwest`-backed transport. The client owns the connection pool, which is
/// dropped on [`Transport::close`].
pub struct HttpTransport {
    client: RwLock<Option<Client>>,
}

impl HttpTransport {
    pub fn new(config: &FetcherConfig) -> FetchResult<Self> {
        let mut header_map = header::HeaderMap::new();
        for (key, value) in &config.headers {
            let name = header::HeaderName::from_bytes(key.as_bytes())?;
            let value = header::HeaderValue::from_str(value)?;
            header_map.insert(name, value);
        }

        let client = ClientBuilder::new()
            .user_agent(config.user_agent.as_str())
            .default_headers(header_map)
            .timeout(config.session_timeout)
            .pool_max_idle_per_host(config.pool_size)
            .build()
            .map_err(|e| FetchError::Validation(format!("cannot build client: {}", e)))?;

        Ok(Self {
            client: RwLock::new(Some(client)),
        })
    }

    fn extract_headers(response: &reqwest::Response) -> HashMap<String, String> {
        response
            .headers()
            .iter()
            .filter_map(|(k, v)| v.to_str().ok().map(|val| (k.to_string(), val.to_string())))
            .collect()
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: &RequestSpec) -> Result<RawResponse, TransportError> {
        // Cloning shares the pool; the lock is not held across the await.
        let client = self.client.read().clone().ok_or(TransportError::Closed)?;

        let mut req = client
            .request(request.method().clone(), request.url().clone())
            .timeout(request.timeout());

        if let Some(headers) = request.headers() {
            for (key, value) in headers {
                req = req.header(key, value);
            }
        }

        if let Some(body) = request.body() {
            req = req.json(body);
        }

        let response = req.send().await?;
        let status = response.status().as_u16();
        let headers = Self::extract_headers(&response);
        let body = response.bytes().await?;

        Ok(RawResponse {
            status,
            headers,
            body: body.to_vec(),
        })
    }

    fn close(&self) {
        if self.client.write().take().is_some() {
            debug!("HTTP connection pool released");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::Method;
    use serde_json::json;
    use std::time::Duration;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn setup() -> (HttpTransport, MockServer) {
        let server = MockServer::start().await;
        let transport = HttpTransport::new(&FetcherConfig::default()).unwrap();
        (transport, server)
    }

    #[tokio::test]
    async fn test_get_request() {
        let (transport, mock_server) = setup().await;

        Mock::given(method("GET"))
            .and(path("/test"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string("Hello, World!")
                    .insert_header("content-type", "text/plain"),
            )
            .mount(&mock_server)
            .await;

        let spec = RequestSpec::new(&format!("{}/test", mock_server.uri())).unwrap();
        let response = transport.send(&spec).await.unwrap();

        assert_eq!(response.status, 200);
        assert_eq!(response.body, b"Hello, World!");
        assert_eq!(response.content_type(), Some("text/plain"));
    }

    #[tokio::test]
    async fn test_post_json_request() {
        let (transport, mock_server) = setup().await;

        Mock::given(method("POST"))
            .and(path("/items"))
            .and(body_json(json!({"key": "value"})))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({"status": "created"})))
            .mount(&mock_server)
            .await;

        let spec = RequestSpec::new(&format!("{}/items", mock_server.uri()))
            .unwrap()
            .with_method(Method::POST)
            .with_json(&json!({"key": "value"}))
            .unwrap();
        let response = transport.send(&spec).await.unwrap();

        assert_eq!(response.status, 201);
        assert_eq!(
            serde_json::from_slice::<serde_json::Value>(&response.body).unwrap(),
            json!({"status": "created"})
        );
    }

    #[tokio::test]
    async fn test_error_statuses_are_not_transport_errors() {
        let (transport, mock_server) = setup().await;

        Mock::given(method("GET"))
            .and(path("/missing"))
            .respond_with(ResponseTemplate::new(404).set_body_string("Not Found"))
            .mount(&mock_server)
            .await;

        let spec = RequestSpec::new(&format!("{}/missing", mock_server.uri())).unwrap();
        let response = transport.send(&spec).await.unwrap();
        assert_eq!(response.status, 404);
    }

    #[tokio::test]
    async fn test_request_and_default_headers() {
        let mock_server = MockServer::start().await;
        let config = FetcherConfig::default()
            .with_user_agent("CustomBot/1.0")
            .with_headers(vec![("x-session", "s1")]);
        let transport = HttpTransport::new(&config).unwrap();

        Mock::given(method("GET"))
            .and(header("user-agent", "CustomBot/1.0"))
            .and(header("x-session", "s1"))
            .and(header("x-request", "r1"))
            .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
            .mount(&mock_server)
            .await;

        let spec = RequestSpec::new(&mock_server.uri())
            .unwrap()
            .with_header("x-request", "r1")
            .unwrap();
        let response = transport.send(&spec).await.unwrap();
        assert_eq!(response.status, 200);
    }

    #[tokio::test]
    async fn test_timeout_maps_to_timeout_error() {
        let (transport, mock_server) = setup().await;

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_millis(500)))
            .mount(&mock_server)
            .await;

        let spec = RequestSpec::new(&mock_server.uri())
            .unwrap()
            .with_timeout(Duration::from_millis(50))
            .unwrap();
        assert_eq!(transport.send(&spec).await, Err(TransportError::Timeout));
    }

    #[tokio::test]
    async fn test_refused_connection() {
        let transport = HttpTransport::new(&FetcherConfig::default()).unwrap();
        let port = std::net::TcpListener::bind("127.0.0.1:0")
            .unwrap()
            .local_addr()
            .unwrap()
            .port();
        let spec = RequestSpec::new(&format!("http://127.0.0.1:{}/", port)).unwrap();
        assert!(matches!(
            transport.send(&spec).await,
            Err(TransportError::Connection(_))
        ));
    }

    #[tokio::test]
    async fn test_send_after_close() {
        let (transport, mock_server) = setup().await;
        transport.close();
        transport.close();

        let spec = RequestSpec::new(&mock_server.uri()).unwrap();
        assert_eq!(transport.send(&spec).await, Err(TransportError::Closed));
    }

    #[test]
    fn test_invalid_default_headers() {
        let config = FetcherConfig::default().with_headers(vec![("invalid\0header", "value")]);
        assert!(HttpTransport::new(&config).is_err());
    }
}
