//! Session management
//!
//! This module owns the signed-in session:
//! - [`TokenStore`] keeps the access/refresh tokens in memory and mirrors them
//!   to an optional [`TokenPersistence`] backend
//! - [`RefreshCoordinator`] runs at most one token refresh at a time and lets
//!   every concurrent caller share its outcome
//!
//! # Example
//!
//! ```rust
//! use shop_client::session::TokenStore;
//!
//! # #[tokio::main]
//! # async fn main() {
//! let store = TokenStore::new();
//! store.set_tokens("A1", "R1");
//!
//! assert_eq!(store.access_token().await.as_deref(), Some("A1"));
//! assert_eq!(store.refresh_token().await.as_deref(), Some("R1"));
//! # }
//! ```

mod refresh;

pub use refresh::{RefreshCoordinator, RefreshOutcome, RefreshResponse};

use async_trait::async_trait;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use storage::{FileStoreConfig, PersistenceError, VersionedFile};
use thiserror::Error;
use tokio::sync::{Mutex, OnceCell};

/// Errors raised by token persistence backends
#[derive(Debug, Error)]
pub enum TokenStoreError {
    /// File persistence error
    #[error("Persistence error: {0}")]
    Persistence(#[from] PersistenceError),

    /// Backend-specific failure
    #[error("Token backend error: {0}")]
    Backend(String),
}

/// Access and refresh tokens for the signed-in user
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    /// Short-lived bearer credential
    pub access_token: Option<String>,
    /// Credential used only to obtain a new access token
    pub refresh_token: Option<String>,
}

impl Session {
    /// Create a session holding both tokens
    pub fn new(access_token: impl Into<String>, refresh_token: impl Into<String>) -> Self {
        Self {
            access_token: Some(access_token.into()),
            refresh_token: Some(refresh_token.into()),
        }
    }

    /// Access token, if present and non-empty
    pub fn usable_access_token(&self) -> Option<&str> {
        self.access_token.as_deref().filter(|token| !token.is_empty())
    }

    /// Refresh token, if present and non-empty
    pub fn usable_refresh_token(&self) -> Option<&str> {
        self.refresh_token.as_deref().filter(|token| !token.is_empty())
    }

    /// Whether neither token is present
    pub fn is_empty(&self) -> bool {
        self.access_token.is_none() && self.refresh_token.is_none()
    }
}

/// Pluggable load/save hooks for the session
///
/// The store calls `load` at most once (lazily, on first token access) and
/// calls `save` in the background after every change.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TokenPersistence: Send + Sync {
    /// Load the stored session, `None` when nothing was saved
    async fn load(&self) -> Result<Option<Session>, TokenStoreError>;

    /// Persist the session; an empty session means "signed out"
    async fn save(&self, session: &Session) -> Result<(), TokenStoreError>;
}

/// File-backed [`TokenPersistence`]
pub struct FileTokenPersistence {
    file: VersionedFile<Session>,
}

impl FileTokenPersistence {
    /// Create a file-backed persistence hook
    pub fn new(config: FileStoreConfig) -> Self {
        Self { file: VersionedFile::new(config) }
    }
}

#[async_trait]
impl TokenPersistence for FileTokenPersistence {
    async fn load(&self) -> Result<Option<Session>, TokenStoreError> {
        Ok(self.file.load().await?)
    }

    async fn save(&self, session: &Session) -> Result<(), TokenStoreError> {
        if session.is_empty() {
            self.file.remove().await?;
        } else {
            self.file.save(session).await?;
        }
        Ok(())
    }
}

struct SessionState {
    session: Session,
    /// Set once tokens were loaded or explicitly written
    loaded: bool,
}

/// In-memory token store with optional persistence
///
/// Writes never fail from the caller's point of view: the in-memory session
/// is updated immediately and the persistence hook runs on a background
/// task. Background saves are serialized and a save superseded by a newer
/// one is skipped.
pub struct TokenStore {
    state: RwLock<SessionState>,
    persistence: Option<Arc<dyn TokenPersistence>>,
    hydrated: OnceCell<()>,
    save_seq: Arc<AtomicU64>,
    save_lock: Arc<Mutex<()>>,
}

impl Default for TokenStore {
    fn default() -> Self {
        Self::new()
    }
}

impl TokenStore {
    /// Create an in-memory store
    pub fn new() -> Self {
        Self {
            state: RwLock::new(SessionState {
                session: Session::default(),
                loaded: false,
            }),
            persistence: None,
            hydrated: OnceCell::new(),
            save_seq: Arc::new(AtomicU64::new(0)),
            save_lock: Arc::new(Mutex::new(())),
        }
    }

    /// Create a store backed by load/save hooks
    pub fn with_persistence(persistence: Arc<dyn TokenPersistence>) -> Self {
        Self {
            persistence: Some(persistence),
            ..Self::new()
        }
    }

    /// Store both tokens
    pub fn set_tokens(&self, access_token: impl Into<String>, refresh_token: impl Into<String>) {
        self.set_session(Session::new(access_token, refresh_token));
    }

    /// Replace the whole session
    pub fn set_session(&self, session: Session) {
        {
            let mut state = self.state.write();
            state.session = session.clone();
            state.loaded = true;
        }
        self.schedule_save(session);
    }

    /// Replace the access token, keeping the refresh token
    pub fn set_access_token(&self, access_token: impl Into<String>) {
        let session = {
            let mut state = self.state.write();
            state.session.access_token = Some(access_token.into());
            state.loaded = true;
            state.session.clone()
        };
        self.schedule_save(session);
    }

    /// Store a refreshed access token if the session still holds
    /// `expected_refresh`
    ///
    /// The refresh token is kept unless a rotated one is supplied. Returns
    /// `false`, leaving the store untouched, when the session changed while
    /// the refresh was in flight (logout or a new login).
    pub(crate) fn apply_refresh_if(
        &self,
        expected_refresh: &str,
        access_token: String,
        rotated_refresh: Option<String>,
    ) -> bool {
        let session = {
            let mut state = self.state.write();
            if state.session.usable_refresh_token() != Some(expected_refresh) {
                return false;
            }
            state.session.access_token = Some(access_token);
            if let Some(refresh) = rotated_refresh {
                state.session.refresh_token = Some(refresh);
            }
            state.session.clone()
        };
        self.schedule_save(session);
        true
    }

    /// Drop both tokens if the session still holds `expected_refresh`
    pub(crate) fn clear_if(&self, expected_refresh: &str) -> bool {
        {
            let mut state = self.state.write();
            if state.session.usable_refresh_token() != Some(expected_refresh) {
                return false;
            }
            state.session = Session::default();
        }
        self.schedule_save(Session::default());
        true
    }

    /// Drop both tokens
    pub fn clear(&self) {
        self.set_session(Session::default());
    }

    /// Current access token, hydrating from persistence on first use
    pub async fn access_token(&self) -> Option<String> {
        self.session().await.access_token
    }

    /// Current refresh token, hydrating from persistence on first use
    pub async fn refresh_token(&self) -> Option<String> {
        self.session().await.refresh_token
    }

    /// Current session, hydrating from persistence on first use
    pub async fn session(&self) -> Session {
        self.ensure_hydrated().await;
        self.snapshot()
    }

    /// Current in-memory session, without hydrating
    pub fn snapshot(&self) -> Session {
        self.state.read().session.clone()
    }

    /// Whether a usable access token is held in memory
    pub fn is_authenticated(&self) -> bool {
        self.state.read().session.usable_access_token().is_some()
    }

    async fn ensure_hydrated(&self) {
        let Some(persistence) = &self.persistence else {
            return;
        };

        if self.state.read().loaded {
            return;
        }

        self.hydrated
            .get_or_init(|| async {
                let loaded = match persistence.load().await {
                    Ok(session) => session,
                    Err(e) => {
                        tracing::warn!("Failed to load stored session: {}", e);
                        None
                    }
                };

                let mut state = self.state.write();
                if !state.loaded {
                    if let Some(session) = loaded {
                        tracing::debug!("Restored stored session");
                        state.session = session;
                    }
                    state.loaded = true;
                }
            })
            .await;
    }

    fn schedule_save(&self, session: Session) {
        let Some(persistence) = self.persistence.clone() else {
            return;
        };

        let runtime = match tokio::runtime::Handle::try_current() {
            Ok(runtime) => runtime,
            Err(_) => {
                tracing::warn!("No async runtime available; session change not persisted");
                return;
            }
        };

        let seq = self.save_seq.fetch_add(1, Ordering::SeqCst) + 1;
        let latest = Arc::clone(&self.save_seq);
        let lock = Arc::clone(&self.save_lock);

        runtime.spawn(async move {
            let _guard = lock.lock().await;

            if latest.load(Ordering::SeqCst) != seq {
                tracing::debug!("Skipping superseded session save");
                return;
            }

            if let Err(e) = persistence.save(&session).await {
                tracing::warn!("Failed to persist session: {}", e);
            }
        });
    }
}
