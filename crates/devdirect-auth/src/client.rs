//! Shared outgoing-request layer.
//!
//! [`ApiClient`] is cheap to clone; every clone shares the same bound token.
//! `bind`/`unbind` are synchronous so a request built right after a session
//! transition already sees the new token.

use std::sync::Arc;
use std::time::Duration;

use devdirect_settings::ApiSettings;
use parking_lot::RwLock;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue};
use reqwest::{Method, RequestBuilder};

use crate::errors::AuthError;

struct ClientInner {
    http: reqwest::Client,
    base_url: String,
    token: RwLock<Option<String>>,
}

/// HTTP client that decorates every request with the bound bearer token.
#[derive(Clone)]
pub struct ApiClient {
    inner: Arc<ClientInner>,
}

impl ApiClient {
    /// Client for `base_url` with default transport settings.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_http(reqwest::Client::new(), base_url)
    }

    /// Client over an existing `reqwest::Client`.
    pub fn with_http(http: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            inner: Arc::new(ClientInner {
                http,
                base_url: base_url.into().trim_end_matches('/').to_string(),
                token: RwLock::new(None),
            }),
        }
    }

    /// Build from API settings (base URL, timeout, JSON content type).
    pub fn from_settings(settings: &ApiSettings) -> Result<Self, AuthError> {
        let mut headers = HeaderMap::new();
        let _ = headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_millis(settings.timeout_ms))
            .build()?;
        Ok(Self::with_http(http, settings.base_url.as_str()))
    }

    /// Base URL without a trailing slash.
    pub fn base_url(&self) -> &str {
        &self.inner.base_url
    }

    /// Decorate all subsequent requests with `token`.
    pub fn bind(&self, token: &str) {
        *self.inner.token.write() = Some(token.to_string());
        tracing::debug!("api client token bound");
    }

    /// Stop decorating requests.
    pub fn unbind(&self) {
        *self.inner.token.write() = None;
        tracing::debug!("api client token unbound");
    }

    /// Currently bound token.
    pub fn token(&self) -> Option<String> {
        self.inner.token.read().clone()
    }

    /// Whether a token is bound.
    pub fn is_bound(&self) -> bool {
        self.inner.token.read().is_some()
    }

    /// `Bearer <token>` when bound.
    pub fn authorization_header(&self) -> Option<String> {
        self.inner
            .token
            .read()
            .as_deref()
            .map(|t| format!("Bearer {t}"))
    }

    /// Absolute URL for an API path.
    pub fn url(&self, path: &str) -> String {
        format!("{}/{}", self.inner.base_url, path.trim_start_matches('/'))
    }

    /// Start a request to `path`, with the authorization header when bound.
    pub fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let builder = self.inner.http.request(method, self.url(path));
        match self.authorization_header() {
            Some(value) => builder.header(AUTHORIZATION, value),
            None => builder,
        }
    }

    /// `GET path`.
    pub fn get(&self, path: &str) -> RequestBuilder {
        self.request(Method::GET, path)
    }

    /// `POST path`.
    pub fn post(&self, path: &str) -> RequestBuilder {
        self.request(Method::POST, path)
    }
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("base_url", &self.inner.base_url)
            .field("bound", &self.is_bound())
            .finish_non_exhaustive()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn bind_and_unbind() {
        let client = ApiClient::new("http://localhost:8080");
        assert!(!client.is_bound());
        assert!(client.authorization_header().is_none());

        client.bind("abc");
        assert_eq!(client.token().as_deref(), Some("abc"));
        assert_eq!(client.authorization_header().as_deref(), Some("Bearer abc"));

        client.unbind();
        assert!(client.token().is_none());
    }

    #[test]
    fn clones_share_token() {
        let a = ApiClient::new("http://localhost");
        let b = a.clone();
        a.bind("shared");
        assert_eq!(b.token().as_deref(), Some("shared"));
    }

    #[test]
    fn url_joining() {
        let client = ApiClient::new("http://localhost:8080/");
        assert_eq!(client.base_url(), "http://localhost:8080");
        assert_eq!(client.url("/auth/login"), "http://localhost:8080/auth/login");
        assert_eq!(client.url("auth/login"), "http://localhost:8080/auth/login");
    }

    #[test]
    fn debug_hides_token() {
        let client = ApiClient::new("http://localhost");
        client.bind("secret");
        let dbg = format!("{client:?}");
        assert!(!dbg.contains("secret"));
        assert!(dbg.contains("bound: true"));
    }

    #[test]
    fn from_settings_uses_base_url() {
        let settings = ApiSettings {
            base_url: "https://api.example.com".to_string(),
            ..ApiSettings::default()
        };
        let client = ApiClient::from_settings(&settings).unwrap();
        assert_eq!(client.base_url(), "https://api.example.com");
    }

    #[tokio::test]
    async fn bound_request_carries_bearer_header() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/me"))
            .and(header("authorization", "Bearer abc"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let client = ApiClient::new(server.uri());
        client.bind("abc");
        let resp = client.get("/me").send().await.unwrap();
        assert_eq!(resp.status().as_u16(), 200);
    }

    #[tokio::test]
    async fn unbound_request_has_no_authorization_header() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/me"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        let client = ApiClient::new(server.uri());
        client.bind("abc");
        client.unbind();
        let _ = client.get("/me").send().await.unwrap();

        let received = server.received_requests().await.unwrap();
        assert_eq!(received.len(), 1);
        assert!(!received[0].headers.contains_key("authorization"));
    }
}
