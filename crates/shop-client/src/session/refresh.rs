//! Single-flight token refresh
//!
//! When several requests fail with 401 at the same time, only one refresh
//! call may reach the backend; everything else waits for that call's
//! outcome. The coordinator keeps the in-flight refresh as a shared future
//! in a mutex-guarded slot. Checking the slot and installing a new refresh
//! happen under the same lock, so two callers can never both start one.
//!
//! The result is only written back if the store still holds the refresh
//! token the call was made with, so a logout or a new login during the
//! call is never overwritten.
//!
//! The refresh itself runs on a spawned task. Callers that give up (their
//! future is dropped) do not cancel it; the remaining waiters still get the
//! outcome.
//!
//! # Example
//!
//! ```rust,no_run
//! use shop_client::{ApiClientConfig, HttpTransport, RefreshCoordinator, TokenStore};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ApiClientConfig::new("http://127.0.0.1:5000/api");
//!     let transport = Arc::new(HttpTransport::new(config.clone())?);
//!     let store = Arc::new(TokenStore::new());
//!     store.set_tokens("expired-access", "refresh");
//!
//!     let coordinator = RefreshCoordinator::new(transport, store.clone(), &config);
//!     let outcome = coordinator.refresh().await;
//!     println!("refreshed: {}", outcome.is_success());
//!
//!     Ok(())
//! }
//! ```

use super::TokenStore;
use crate::config::ApiClientConfig;
use crate::http::{ApiRequest, Transport, ACCEPT, APPLICATION_JSON};
use futures::future::{BoxFuture, FutureExt, Shared};
use parking_lot::Mutex;
use serde::Deserialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Result of a refresh attempt, shared by every waiter
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// A new access token was stored
    Refreshed {
        /// The new access token
        access_token: String,
    },
    /// The refresh call failed, or the session was signed out meanwhile;
    /// the store holds no tokens from the refreshed session
    Failed,
    /// No refresh token was available, so no call was made
    NoRefreshToken,
}

impl RefreshOutcome {
    /// Whether a new access token is available
    pub fn is_success(&self) -> bool {
        matches!(self, RefreshOutcome::Refreshed { .. })
    }
}

/// Body returned by the refresh endpoint
#[derive(Debug, Clone, Deserialize)]
pub struct RefreshResponse {
    /// New access token
    #[serde(default)]
    pub access_token: Option<String>,
    /// Rotated refresh token, when the backend issues one
    #[serde(default)]
    pub refresh_token: Option<String>,
}

type PendingRefresh = Shared<BoxFuture<'static, RefreshOutcome>>;

/// In-flight refresh and the generation that installed it
type Slot = Arc<Mutex<Option<(u64, PendingRefresh)>>>;

/// Coordinates token refreshes so at most one runs at a time
pub struct RefreshCoordinator {
    transport: Arc<dyn Transport>,
    store: Arc<TokenStore>,
    refresh_path: String,
    refresh_timeout: Duration,
    pending: Slot,
    generation: AtomicU64,
}

impl RefreshCoordinator {
    /// Create a coordinator refreshing through `transport`
    pub fn new(
        transport: Arc<dyn Transport>,
        store: Arc<TokenStore>,
        config: &ApiClientConfig,
    ) -> Self {
        Self {
            transport,
            store,
            refresh_path: config.refresh_path.clone(),
            refresh_timeout: config.refresh_timeout,
            pending: Arc::new(Mutex::new(None)),
            generation: AtomicU64::new(0),
        }
    }

    /// Whether a refresh is currently in flight
    pub fn is_refreshing(&self) -> bool {
        self.pending.lock().is_some()
    }

    /// Start a refresh, or join the one already in flight
    pub async fn refresh(&self) -> RefreshOutcome {
        if let Some(pending) = self.in_flight() {
            tracing::debug!("Joining in-flight token refresh");
            return pending.await;
        }

        if self.store.refresh_token().await.filter(|t| !t.is_empty()).is_none() {
            tracing::debug!("No refresh token; skipping token refresh");
            return RefreshOutcome::NoRefreshToken;
        }

        self.start_or_join().await
    }

    fn in_flight(&self) -> Option<PendingRefresh> {
        self.pending.lock().as_ref().map(|(_, pending)| pending.clone())
    }

    fn start_or_join(&self) -> PendingRefresh {
        let mut slot = self.pending.lock();

        if let Some((_, pending)) = slot.as_ref() {
            tracing::debug!("Joining in-flight token refresh");
            return pending.clone();
        }

        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        tracing::info!("Starting token refresh (cycle {})", generation);

        let task = tokio::spawn(run_refresh(
            Arc::clone(&self.transport),
            Arc::clone(&self.store),
            self.refresh_path.clone(),
            self.refresh_timeout,
            Arc::clone(&self.pending),
            generation,
        ));

        let pending = async move {
            match task.await {
                Ok(outcome) => outcome,
                Err(e) => {
                    tracing::error!("Token refresh task failed: {}", e);
                    RefreshOutcome::Failed
                }
            }
        }
        .boxed()
        .shared();

        *slot = Some((generation, pending.clone()));
        pending
    }
}

async fn run_refresh(
    transport: Arc<dyn Transport>,
    store: Arc<TokenStore>,
    refresh_path: String,
    refresh_timeout: Duration,
    pending: Slot,
    generation: u64,
) -> RefreshOutcome {
    let outcome = match store.snapshot().usable_refresh_token().map(str::to_string) {
        Some(refresh_token) => {
            let tokens = request_new_access_token(
                transport.as_ref(),
                &refresh_token,
                &refresh_path,
                refresh_timeout,
            )
            .await;
            settle(&store, &refresh_token, tokens, generation)
        }
        None => RefreshOutcome::Failed,
    };

    let mut slot = pending.lock();
    if matches!(slot.as_ref(), Some((current, _)) if *current == generation) {
        *slot = None;
    }

    outcome
}

/// Apply a refresh result to the store, unless the session it was issued
/// for has since been replaced
fn settle(
    store: &TokenStore,
    refresh_token: &str,
    tokens: Option<(String, Option<String>)>,
    generation: u64,
) -> RefreshOutcome {
    match tokens {
        Some((access_token, rotated)) => {
            if store.apply_refresh_if(refresh_token, access_token.clone(), rotated) {
                tracing::info!("Token refresh succeeded (cycle {})", generation);
                return RefreshOutcome::Refreshed { access_token };
            }
        }
        None => {
            if store.clear_if(refresh_token) {
                tracing::warn!("Token refresh failed (cycle {}); clearing session", generation);
                return RefreshOutcome::Failed;
            }
        }
    }

    // Logout or a new login happened while the call was in flight.
    tracing::info!("Session changed during token refresh (cycle {}); discarding result", generation);
    match store.snapshot().usable_access_token() {
        Some(current) => RefreshOutcome::Refreshed { access_token: current.to_string() },
        None => RefreshOutcome::Failed,
    }
}

/// Call the refresh endpoint, returning the new access token and any
/// rotated refresh token
async fn request_new_access_token(
    transport: &dyn Transport,
    refresh_token: &str,
    refresh_path: &str,
    refresh_timeout: Duration,
) -> Option<(String, Option<String>)> {
    let request = ApiRequest::post(refresh_path)
        .header(ACCEPT, APPLICATION_JSON)
        .with_bearer(Some(refresh_token))
        .timeout(refresh_timeout)
        .without_refresh();

    let response = match transport.send(&request).await {
        Ok(response) => response,
        Err(e) => {
            tracing::warn!("Refresh request failed: {}", e);
            return None;
        }
    };

    if !response.is_success() {
        tracing::warn!(
            "Refresh rejected with status {}: {}",
            response.status,
            response.failure_message()
        );
        return None;
    }

    let body: RefreshResponse = match response.json() {
        Ok(body) => body,
        Err(e) => {
            tracing::warn!("Unreadable refresh response: {}", e);
            return None;
        }
    };

    let Some(access_token) = body.access_token.filter(|token| !token.is_empty()) else {
        tracing::warn!("Refresh response did not include an access token");
        return None;
    };

    Some((access_token, body.refresh_token.filter(|token| !token.is_empty())))
}
