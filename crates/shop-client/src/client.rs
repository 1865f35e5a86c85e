//! Authenticated request pipeline
//!
//! [`ApiClient`] wraps a [`Transport`] with the session handling every API
//! call needs:
//!
//! 1. attach `Accept: application/json` and the current access token as a
//!    bearer credential
//! 2. on a 401 (from anything but the refresh endpoint) run, or join, the
//!    single-flight token refresh
//! 3. replay the original request once with the new token, or surface
//!    [`ApiError::RefreshExhausted`] when the refresh failed
//!
//! # Example
//!
//! ```rust,no_run
//! use shop_client::{ApiClient, ApiClientConfig, ApiRequest};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = ApiClient::new(ApiClientConfig::new("http://127.0.0.1:5000/api"))?;
//!     client.store().set_tokens("access", "refresh");
//!
//!     let cart: serde_json::Value = client.fetch_json(ApiRequest::get("/cart")).await?;
//!     println!("{}", cart);
//!
//!     Ok(())
//! }
//! ```

use crate::config::ApiClientConfig;
use crate::http::{ApiRequest, ApiResponse, HttpTransport, Transport, ACCEPT, APPLICATION_JSON};
use crate::session::{RefreshCoordinator, RefreshOutcome, TokenStore};
use crate::{ApiError, Result};
use serde::de::DeserializeOwned;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// HTTP client with bearer authentication and transparent token refresh
#[derive(Clone)]
pub struct ApiClient {
    transport: Arc<dyn Transport>,
    store: Arc<TokenStore>,
    coordinator: Arc<RefreshCoordinator>,
    config: ApiClientConfig,
}

impl ApiClient {
    /// Create a client with an in-memory token store
    pub fn new(config: ApiClientConfig) -> Result<Self> {
        Self::with_store(config, Arc::new(TokenStore::new()))
    }

    /// Create a client sharing an existing token store
    pub fn with_store(config: ApiClientConfig, store: Arc<TokenStore>) -> Result<Self> {
        let transport = Arc::new(HttpTransport::new(config.clone())?);
        Ok(Self::with_transport(config, transport, store))
    }

    /// Create a client over a custom transport
    pub fn with_transport(
        config: ApiClientConfig,
        transport: Arc<dyn Transport>,
        store: Arc<TokenStore>,
    ) -> Self {
        let coordinator = Arc::new(RefreshCoordinator::new(
            Arc::clone(&transport),
            Arc::clone(&store),
            &config,
        ));

        Self {
            transport,
            store,
            coordinator,
            config,
        }
    }

    /// Get the token store
    pub fn store(&self) -> &Arc<TokenStore> {
        &self.store
    }

    /// Get the refresh coordinator
    pub fn coordinator(&self) -> &RefreshCoordinator {
        &self.coordinator
    }

    /// Get the client configuration
    pub fn config(&self) -> &ApiClientConfig {
        &self.config
    }

    /// Send a request and return the 2xx response
    pub async fn send(&self, request: ApiRequest) -> Result<ApiResponse> {
        let access_token = self.store.access_token().await;
        let response = self.dispatch(&request, access_token.as_deref()).await?;

        if is_accepted(&request, &response) {
            return Ok(response);
        }

        if response.status != 401 || !self.may_refresh(&request) {
            return Err(response.into_error());
        }

        self.recover(&request, access_token.as_deref(), response).await
    }

    /// Send a request, giving up when `cancel` fires
    ///
    /// A token refresh started on behalf of this request keeps running for
    /// other waiters; only this request's result is abandoned.
    pub async fn send_with_cancel(
        &self,
        request: ApiRequest,
        cancel: &CancellationToken,
    ) -> Result<ApiResponse> {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                tracing::debug!("{} {} cancelled", request.method.as_str(), request.path);
                Err(ApiError::Cancelled)
            }
            result = self.send(request.clone()) => result,
        }
    }

    /// Send a request and decode the JSON body
    pub async fn fetch_json<T: DeserializeOwned>(&self, request: ApiRequest) -> Result<T> {
        self.send(request).await?.json()
    }

    fn may_refresh(&self, request: &ApiRequest) -> bool {
        !request.options.skip_refresh && !self.config.is_refresh_path(&request.path)
    }

    async fn recover(
        &self,
        request: &ApiRequest,
        sent_with: Option<&str>,
        failed: ApiResponse,
    ) -> Result<ApiResponse> {
        let message = failed.failure_message();

        // A sibling request may already have refreshed the token this one
        // was sent with.
        if !self.coordinator.is_refreshing() {
            let current = self.store.snapshot();
            if let Some(current) = current.usable_access_token() {
                if Some(current) != sent_with {
                    tracing::debug!(
                        "{} {} was sent with a stale token; replaying",
                        request.method.as_str(),
                        request.path
                    );
                    return self.replay(request, current).await;
                }
            }
        }

        match self.coordinator.refresh().await {
            RefreshOutcome::Refreshed { access_token } => self.replay(request, &access_token).await,
            RefreshOutcome::Failed => Err(ApiError::RefreshExhausted { message }),
            RefreshOutcome::NoRefreshToken => Err(ApiError::Unauthenticated { message }),
        }
    }

    async fn replay(&self, request: &ApiRequest, access_token: &str) -> Result<ApiResponse> {
        tracing::debug!("Replaying {} {}", request.method.as_str(), request.path);

        let response = self.dispatch(request, Some(access_token)).await?;

        if is_accepted(request, &response) {
            Ok(response)
        } else {
            Err(response.into_error())
        }
    }

    async fn dispatch(&self, request: &ApiRequest, access_token: Option<&str>) -> Result<ApiResponse> {
        let mut outgoing = request.clone().with_bearer(access_token);
        if outgoing.header_value(ACCEPT).is_none() {
            outgoing = outgoing.header(ACCEPT, APPLICATION_JSON);
        }

        self.transport.send(&outgoing).await
    }
}

/// 2xx, or a 3xx the caller asked to see instead of following
fn is_accepted(request: &ApiRequest, response: &ApiResponse) -> bool {
    response.is_success() || (request.options.no_redirects && response.is_redirect())
}
