//! HTTP request/response types and the transport seam
//!
//! [`ApiRequest`] captures everything needed to send a call and to replay it
//! later with a different bearer credential. [`Transport`] is the base
//! network call that the authenticated pipeline in [`crate::client`] wraps;
//! [`HttpTransport`] implements it on top of reqwest.

use crate::config::ApiClientConfig;
use crate::{ApiError, Result};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

/// Authorization header name
pub const AUTHORIZATION: &str = "Authorization";

/// Accept header name
pub const ACCEPT: &str = "Accept";

/// JSON media type
pub const APPLICATION_JSON: &str = "application/json";

// =============================================================================
// Request Types
// =============================================================================

/// HTTP method
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    /// GET request
    Get,
    /// POST request
    Post,
    /// PUT request
    Put,
    /// PATCH request
    Patch,
    /// DELETE request
    Delete,
}

impl HttpMethod {
    /// Method name as sent on the wire
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Delete => "DELETE",
        }
    }
}

impl From<HttpMethod> for reqwest::Method {
    fn from(method: HttpMethod) -> Self {
        match method {
            HttpMethod::Get => reqwest::Method::GET,
            HttpMethod::Post => reqwest::Method::POST,
            HttpMethod::Put => reqwest::Method::PUT,
            HttpMethod::Patch => reqwest::Method::PATCH,
            HttpMethod::Delete => reqwest::Method::DELETE,
        }
    }
}

/// Behavioral options carried with a request
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestOptions {
    /// Overrides the client-wide request timeout
    pub timeout: Option<Duration>,
    /// A 401 on this request never starts a token refresh
    pub skip_refresh: bool,
    /// Return 3xx responses as received instead of following them
    pub no_redirects: bool,
}

/// Outbound API call
///
/// Cloning a request and swapping its bearer credential is how a call is
/// replayed after a token refresh, so every field that affects the call
/// lives here.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    /// HTTP method
    pub method: HttpMethod,
    /// Path relative to the base URL (e.g., "/cart/items/42")
    pub path: String,
    /// Query parameters, in order
    pub query: Vec<(String, String)>,
    /// Request headers
    pub headers: HashMap<String, String>,
    /// Request body
    pub body: Option<Vec<u8>>,
    /// Body media type
    pub content_type: Option<String>,
    /// Behavioral options
    pub options: RequestOptions,
}

impl ApiRequest {
    /// Create a request with no parameters
    pub fn new(method: HttpMethod, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            headers: HashMap::new(),
            body: None,
            content_type: None,
            options: RequestOptions::default(),
        }
    }

    /// Create a GET request
    pub fn get(path: impl Into<String>) -> Self {
        Self::new(HttpMethod::Get, path)
    }

    /// Create a POST request
    pub fn post(path: impl Into<String>) -> Self {
        Self::new(HttpMethod::Post, path)
    }

    /// Create a PUT request
    pub fn put(path: impl Into<String>) -> Self {
        Self::new(HttpMethod::Put, path)
    }

    /// Create a DELETE request
    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(HttpMethod::Delete, path)
    }

    /// Add a query parameter
    pub fn query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    /// Add a query parameter when a value is present
    pub fn query_opt(self, key: impl Into<String>, value: Option<impl ToString>) -> Self {
        match value {
            Some(value) => self.query(key, value.to_string()),
            None => self,
        }
    }

    /// Add a header, replacing any existing header with the same name
    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        let key = key.into();
        self.headers.retain(|existing, _| !existing.eq_ignore_ascii_case(&key));
        self.headers.insert(key, value.into());
        self
    }

    /// Set a raw body
    pub fn body(mut self, body: Vec<u8>, content_type: impl Into<String>) -> Self {
        self.body = Some(body);
        self.content_type = Some(content_type.into());
        self
    }

    /// Set the body from JSON
    pub fn json_body<T: Serialize + ?Sized>(mut self, value: &T) -> Result<Self> {
        self.body = Some(serde_json::to_vec(value)?);
        self.content_type = Some(APPLICATION_JSON.to_string());
        Ok(self)
    }

    /// Override the request timeout
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.options.timeout = Some(timeout);
        self
    }

    /// Never start a token refresh when this request fails with 401
    pub fn without_refresh(mut self) -> Self {
        self.options.skip_refresh = true;
        self
    }

    /// Hand 3xx responses back to the caller instead of following them
    pub fn without_redirects(mut self) -> Self {
        self.options.no_redirects = true;
        self
    }

    /// Look up a header case-insensitively
    pub fn header_value(&self, key: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(key))
            .map(|(_, value)| value.as_str())
    }

    /// Token carried in the `Authorization: Bearer` header, if any
    pub fn bearer_token(&self) -> Option<&str> {
        self.header_value(AUTHORIZATION)
            .and_then(|value| value.strip_prefix("Bearer "))
    }

    /// Attach or strip the bearer credential
    ///
    /// Empty tokens are treated as absent.
    pub fn with_bearer(mut self, token: Option<&str>) -> Self {
        self.headers.retain(|name, _| !name.eq_ignore_ascii_case(AUTHORIZATION));
        if let Some(token) = token.filter(|token| !token.is_empty()) {
            self.headers.insert(AUTHORIZATION.to_string(), format!("Bearer {}", token));
        }
        self
    }
}

// =============================================================================
// Response Types
// =============================================================================

/// Response received from the API
#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse {
    /// HTTP status code
    pub status: u16,
    /// Response headers (lower-case names)
    pub headers: HashMap<String, String>,
    /// Raw body
    pub body: Vec<u8>,
}

impl ApiResponse {
    /// Create a new response
    pub fn new(status: u16, headers: HashMap<String, String>, body: Vec<u8>) -> Self {
        Self { status, headers, body }
    }

    /// Create a response with a JSON body
    pub fn json_response(status: u16, value: &serde_json::Value) -> Self {
        let mut headers = HashMap::new();
        headers.insert("content-type".to_string(), APPLICATION_JSON.to_string());
        Self::new(status, headers, value.to_string().into_bytes())
    }

    /// Get a header value
    pub fn header(&self, key: &str) -> Option<&String> {
        self.headers.get(&key.to_ascii_lowercase())
    }

    /// Check if the response is successful (2xx status)
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Check if the response is a redirect (3xx status)
    pub fn is_redirect(&self) -> bool {
        (300..400).contains(&self.status)
    }

    /// Decode the body as JSON
    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_slice(&self.body)
            .map_err(|e| ApiError::InvalidResponse(format!("Failed to parse JSON: {}", e)))
    }

    /// Body as UTF-8 text (lossy)
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// Message from an `{ error | message }` error body
    pub fn error_message(&self) -> Option<String> {
        let body: ErrorBody = serde_json::from_slice(&self.body).ok()?;
        body.error
            .filter(|message| !message.trim().is_empty())
            .or(body.message.filter(|message| !message.trim().is_empty()))
    }

    /// Server message, or a generic fallback naming the status
    pub fn failure_message(&self) -> String {
        self.error_message()
            .unwrap_or_else(|| format!("Request failed with status {}", self.status))
    }

    /// Convert a non-2xx response into the matching error
    pub fn into_error(self) -> ApiError {
        let message = self.failure_message();
        match self.status {
            401 => ApiError::Unauthenticated { message },
            status => ApiError::ServerError { status, message },
        }
    }
}

/// Error body returned by the API
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ErrorBody {
    /// Error description
    #[serde(default)]
    pub error: Option<String>,
    /// Alternative description field
    #[serde(default)]
    pub message: Option<String>,
}

// =============================================================================
// Transport
// =============================================================================

/// Base network call
///
/// Implementations send the request exactly as given and return whatever
/// status the server answered with. Only failures to obtain a response are
/// errors ([`ApiError::NetworkFailure`]).
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send a request
    async fn send(&self, request: &ApiRequest) -> Result<ApiResponse>;
}

/// reqwest-backed transport
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    /// Same settings as `client` but never follows redirects
    no_redirect_client: reqwest::Client,
    config: ApiClientConfig,
}

impl HttpTransport {
    /// Create a new transport
    pub fn new(config: ApiClientConfig) -> Result<Self> {
        let client = build_client(&config, reqwest::redirect::Policy::default())?;
        let no_redirect_client = build_client(&config, reqwest::redirect::Policy::none())?;

        Ok(Self { client, no_redirect_client, config })
    }

    /// Get the transport configuration
    pub fn config(&self) -> &ApiClientConfig {
        &self.config
    }
}

fn build_client(
    config: &ApiClientConfig,
    redirects: reqwest::redirect::Policy,
) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(config.timeout)
        .connect_timeout(config.connect_timeout)
        .user_agent(&config.user_agent)
        .redirect(redirects)
        .build()
        .map_err(|e| ApiError::InvalidRequest(format!("Failed to build HTTP client: {}", e)))
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: &ApiRequest) -> Result<ApiResponse> {
        let url = self.config.url_for(&request.path);

        let client = if request.options.no_redirects {
            &self.no_redirect_client
        } else {
            &self.client
        };
        let mut req = client.request(request.method.into(), &url);

        if !request.query.is_empty() {
            req = req.query(&request.query);
        }

        for (key, value) in &self.config.default_headers {
            if request.header_value(key).is_none() {
                req = req.header(key, value);
            }
        }

        for (key, value) in &request.headers {
            req = req.header(key, value);
        }

        if let Some(body) = &request.body {
            if let Some(content_type) = &request.content_type {
                req = req.header("Content-Type", content_type);
            }
            req = req.body(body.clone());
        }

        if let Some(timeout) = request.options.timeout {
            req = req.timeout(timeout);
        }

        tracing::debug!("{} {}", request.method.as_str(), url);

        let response = req
            .send()
            .await
            .map_err(|e| ApiError::NetworkFailure(format!("Request failed: {}", e)))?;

        let status = response.status().as_u16();

        let mut headers = HashMap::new();
        for (key, value) in response.headers() {
            if let Ok(value_str) = value.to_str() {
                headers.insert(key.as_str().to_ascii_lowercase(), value_str.to_string());
            }
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| ApiError::NetworkFailure(format!("Failed to read response: {}", e)))?;

        tracing::debug!("{} {} -> {}", request.method.as_str(), url, status);

        Ok(ApiResponse::new(status, headers, body.to_vec()))
    }
}

// =============================================================================
// Tests
// =============================================================================
