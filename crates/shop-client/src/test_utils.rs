//! Test utilities and fixtures for shop client testing
//!
//! This module provides a scripted in-memory transport, a channel-backed
//! persistence hook, and canned API responses.

#![allow(dead_code)] // Test utilities may not all be used yet

use crate::http::{ApiRequest, ApiResponse, Transport};
use crate::session::{Session, TokenPersistence, TokenStoreError};
use crate::Result;
use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::json;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::mpsc;

/// Refresh endpoint path used by the default config
pub const REFRESH_PATH: &str = "/auth/refresh";

type RefreshHandler = Box<dyn Fn(usize) -> Result<ApiResponse> + Send + Sync>;
type RequestHandler = Box<dyn Fn(&ApiRequest) -> Result<ApiResponse> + Send + Sync>;

/// Install a test subscriber honouring `RUST_LOG`
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// In-memory transport answering from closures
///
/// Requests to the refresh path go to the refresh handler (which receives
/// the zero-based refresh call index); everything else goes to the request
/// handler. Every request is recorded.
pub struct ScriptedTransport {
    refresh_handler: Mutex<Option<RefreshHandler>>,
    request_handler: Mutex<Option<RequestHandler>>,
    refresh_delay: Duration,
    request_delay: Duration,
    refresh_calls: AtomicUsize,
    sent: Mutex<Vec<ApiRequest>>,
}

impl Default for ScriptedTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptedTransport {
    /// Transport answering 401 to refreshes and `{}` to everything else
    pub fn new() -> Self {
        Self {
            refresh_handler: Mutex::new(None),
            request_handler: Mutex::new(None),
            refresh_delay: Duration::ZERO,
            request_delay: Duration::ZERO,
            refresh_calls: AtomicUsize::new(0),
            sent: Mutex::new(Vec::new()),
        }
    }

    /// Delay every refresh response
    pub fn with_refresh_delay(mut self, delay: Duration) -> Self {
        self.refresh_delay = delay;
        self
    }

    /// Delay every non-refresh response
    pub fn with_request_delay(mut self, delay: Duration) -> Self {
        self.request_delay = delay;
        self
    }

    /// Answer refresh calls
    pub fn on_refresh<F>(&self, handler: F)
    where
        F: Fn(usize) -> Result<ApiResponse> + Send + Sync + 'static,
    {
        *self.refresh_handler.lock() = Some(Box::new(handler));
    }

    /// Answer all other calls
    pub fn on_request<F>(&self, handler: F)
    where
        F: Fn(&ApiRequest) -> Result<ApiResponse> + Send + Sync + 'static,
    {
        *self.request_handler.lock() = Some(Box::new(handler));
    }

    /// Number of refresh calls received
    pub fn refresh_calls(&self) -> usize {
        self.refresh_calls.load(Ordering::SeqCst)
    }

    /// Bearer tokens presented to the refresh endpoint, in order
    pub fn refresh_bearers(&self) -> Vec<String> {
        self.requests_to(REFRESH_PATH)
            .iter()
            .filter_map(|r| r.bearer_token().map(str::to_string))
            .collect()
    }

    /// All recorded requests
    pub fn sent_requests(&self) -> Vec<ApiRequest> {
        self.sent.lock().clone()
    }

    /// Recorded requests for one path
    pub fn requests_to(&self, path: &str) -> Vec<ApiRequest> {
        self.sent.lock().iter().filter(|r| r.path == path).cloned().collect()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn send(&self, request: &ApiRequest) -> Result<ApiResponse> {
        self.sent.lock().push(request.clone());

        if request.path == REFRESH_PATH {
            let n = self.refresh_calls.fetch_add(1, Ordering::SeqCst);
            if !self.refresh_delay.is_zero() {
                tokio::time::sleep(self.refresh_delay).await;
            }
            return match self.refresh_handler.lock().as_ref() {
                Some(handler) => handler(n),
                None => unauthorized("Token has expired"),
            };
        }

        if !self.request_delay.is_zero() {
            tokio::time::sleep(self.request_delay).await;
        }
        match self.request_handler.lock().as_ref() {
            Some(handler) => handler(request),
            None => ok_json(json!({})),
        }
    }
}

/// Request handler that accepts only `token` as bearer
pub fn accept_only(token: &'static str) -> impl Fn(&ApiRequest) -> Result<ApiResponse> {
    move |request: &ApiRequest| {
        if request.bearer_token() == Some(token) {
            ok_json(json!({"path": request.path.clone(), "token": token}))
        } else {
            unauthorized("Token has expired")
        }
    }
}

/// 200 with a JSON body
pub fn ok_json(value: serde_json::Value) -> Result<ApiResponse> {
    Ok(ApiResponse::json_response(200, &value))
}

/// 401 with an `{error}` body
pub fn unauthorized(message: &str) -> Result<ApiResponse> {
    Ok(ApiResponse::json_response(401, &json!({"error": message})))
}

/// Successful refresh body
pub fn auth_refresh_ok(access_token: &str) -> Result<ApiResponse> {
    ok_json(json!({"access_token": access_token}))
}

/// Login/register body
pub fn auth_response(access_token: &str, refresh_token: &str) -> serde_json::Value {
    json!({
        "access_token": access_token,
        "refresh_token": refresh_token,
        "user": user_json(),
    })
}

/// A user as returned by the auth endpoints
pub fn user_json() -> serde_json::Value {
    json!({
        "id": "665f1c2ab3e4d5f6a7b8c9d0",
        "name": "Nadia Perera",
        "email": "nadia@example.com",
        "role": "user",
        "is_active": true,
        "created_at": "2024-06-04T10:15:00"
    })
}

/// Persistence hook reporting every save on a channel
pub struct ChannelPersistence {
    initial: Option<Session>,
    saved: mpsc::UnboundedSender<Session>,
}

impl ChannelPersistence {
    /// Create the hook and the receiving end of its save channel
    pub fn new(initial: Option<Session>) -> (Self, mpsc::UnboundedReceiver<Session>) {
        let (saved, rx) = mpsc::unbounded_channel();
        (Self { initial, saved }, rx)
    }
}

#[async_trait]
impl TokenPersistence for ChannelPersistence {
    async fn load(&self) -> std::result::Result<Option<Session>, TokenStoreError> {
        Ok(self.initial.clone())
    }

    async fn save(&self, session: &Session) -> std::result::Result<(), TokenStoreError> {
        self.saved
            .send(session.clone())
            .map_err(|e| TokenStoreError::Backend(e.to_string()))
    }
}
