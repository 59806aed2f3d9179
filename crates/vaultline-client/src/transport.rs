//! HTTP transport.
//!
//! The pipeline only needs one capability from the network layer: send a
//! fully assembled [`HttpRequest`] and hand back the raw [`VaultResponse`].
//! [`ReqwestTransport`] is the default implementation; tests and callers with
//! special needs can plug in their own.

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use tracing::trace;

use crate::error::VaultError;
use crate::types::{HttpRequest, VaultResponse};

/// Sends HTTP requests on behalf of the pipeline.
///
/// Implementations must be safe to share across async tasks (`Send + Sync`).
/// Errors are returned to the caller unchanged; the pipeline never retries.
#[async_trait]
pub trait Transport: Send + Sync + 'static {
    /// Send one request.
    ///
    /// # Errors
    ///
    /// Returns whatever the underlying client reports: network failures,
    /// non-success statuses, or undecodable bodies.
    async fn send(&self, request: HttpRequest) -> Result<VaultResponse, VaultError>;
}

/// [`Transport`] backed by a `reqwest` client.
///
/// Non-success statuses become [`VaultError::Api`]; an empty body (e.g. 204
/// on delete) becomes `Value::Null`.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    /// Transport with no request timeout.
    ///
    /// # Errors
    ///
    /// Returns [`VaultError::Network`] if the HTTP client cannot be built.
    pub fn new() -> Result<Self, VaultError> {
        Self::build(None)
    }

    /// Transport that aborts requests after `timeout`.
    ///
    /// # Errors
    ///
    /// Returns [`VaultError::Network`] if the HTTP client cannot be built.
    pub fn with_timeout(timeout: Duration) -> Result<Self, VaultError> {
        Self::build(Some(timeout))
    }

    fn build(timeout: Option<Duration>) -> Result<Self, VaultError> {
        let mut builder = reqwest::Client::builder()
            .user_agent(concat!("vaultline/", env!("CARGO_PKG_VERSION")));
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build().map_err(VaultError::Network)?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn send(&self, request: HttpRequest) -> Result<VaultResponse, VaultError> {
        let HttpRequest {
            method,
            url,
            headers,
            body,
        } = request;

        let mut req = self.client.request(method, url.as_str());
        for (name, value) in &headers {
            req = req.header(name.as_str(), value.as_str());
        }
        if let Some(body) = &body {
            req = req.json(body);
        }

        let resp = req.send().await?;
        let status = resp.status();
        let headers: BTreeMap<String, String> = resp
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_owned(), v.to_owned()))
            })
            .collect();
        let text = resp.text().await?;

        trace!(status = status.as_u16(), bytes = text.len(), "vault response received");

        if !status.is_success() {
            return Err(VaultError::Api {
                status: status.as_u16(),
                body: text,
            });
        }

        let body = if text.trim().is_empty() {
            serde_json::Value::Null
        } else {
            serde_json::from_str(&text)?
        };

        Ok(VaultResponse {
            status: status.as_u16(),
            headers,
            body,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use serde_json::json;
    use wiremock::matchers::{body_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    fn request(method: reqwest::Method, url: String) -> HttpRequest {
        let mut headers = BTreeMap::new();
        headers.insert("X-Vault-Token".to_owned(), "s.tok".to_owned());
        HttpRequest {
            method,
            url,
            headers,
            body: None,
        }
    }

    #[tokio::test]
    async fn sends_headers_and_parses_json() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/kv/foo"))
            .and(header("x-vault-token", "s.tok"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({ "data": { "a": 1 } })),
            )
            .expect(1)
            .mount(&server)
            .await;

        let transport = ReqwestTransport::new().unwrap();
        let resp = transport
            .send(request(reqwest::Method::GET, format!("{}/v1/kv/foo", server.uri())))
            .await
            .unwrap();

        assert_eq!(resp.status, 200);
        assert_eq!(resp.body, json!({ "data": { "a": 1 } }));
        assert_eq!(
            resp.headers.get("content-type").map(String::as_str),
            Some("application/json")
        );
    }

    #[tokio::test]
    async fn posts_json_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/kv/foo"))
            .and(body_json(json!({ "a": 1 })))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        let mut req = request(reqwest::Method::POST, format!("{}/v1/kv/foo", server.uri()));
        req.body = Some(json!({ "a": 1 }));
        let resp = ReqwestTransport::new().unwrap().send(req).await.unwrap();

        assert_eq!(resp.status, 204);
        assert!(resp.body.is_null());
    }

    #[tokio::test]
    async fn keeps_query_string_from_request_path() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/kv"))
            .and(query_param("list", "true"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({ "data": { "keys": ["a"] } })),
            )
            .expect(1)
            .mount(&server)
            .await;

        let url = format!("{}/v1/kv?list=true", server.uri());
        let resp = ReqwestTransport::new()
            .unwrap()
            .send(request(reqwest::Method::GET, url))
            .await
            .unwrap();
        assert_eq!(resp.body["data"]["keys"], json!(["a"]));
    }

    #[tokio::test]
    async fn non_success_status_is_an_api_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(403).set_body_string(r#"{"errors":["permission denied"]}"#))
            .mount(&server)
            .await;

        let err = ReqwestTransport::new()
            .unwrap()
            .send(request(reqwest::Method::GET, format!("{}/v1/kv/foo", server.uri())))
            .await
            .unwrap_err();

        match err {
            VaultError::Api { status, body } => {
                assert_eq!(status, 403);
                assert!(body.contains("permission denied"));
            }
            other => panic!("expected Api error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn invalid_json_is_a_json_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&server)
            .await;

        let err = ReqwestTransport::new()
            .unwrap()
            .send(request(reqwest::Method::GET, format!("{}/v1/kv/foo", server.uri())))
            .await
            .unwrap_err();
        assert!(matches!(err, VaultError::Json(_)), "got {err:?}");
    }

    #[tokio::test]
    async fn unreachable_server_is_a_network_error() {
        // Port 9 (discard) is closed on loopback in every environment we test in.
        let transport = ReqwestTransport::with_timeout(Duration::from_secs(2)).unwrap();
        let err = transport
            .send(request(reqwest::Method::GET, "http://127.0.0.1:9/v1/kv/foo".to_owned()))
            .await
            .unwrap_err();
        assert!(matches!(err, VaultError::Network(_)), "got {err:?}");
    }
}
