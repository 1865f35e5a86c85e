//! Glowcart Shop Client Library
//!
//! This crate provides the REST client for the Glowcart shop API, including
//! token storage, the authenticated request pipeline with single-flight
//! token refresh, and the named shop operations used by the app screens.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod client;
pub mod config;
pub mod http;
pub mod models;
pub mod session;
pub mod shop;

#[cfg(test)]
pub(crate) mod test_utils;

pub use client::ApiClient;
pub use config::ApiClientConfig;
pub use http::{ApiRequest, ApiResponse, HttpMethod, HttpTransport, Transport};
pub use session::{
    FileTokenPersistence, RefreshCoordinator, RefreshOutcome, Session, TokenPersistence,
    TokenStore,
};
pub use shop::ShopApi;

/// Result type for shop API operations
pub type Result<T> = std::result::Result<T, ApiError>;

/// Fallback shown when the server did not explain a failure
pub const NETWORK_FALLBACK_MESSAGE: &str = "Network error. Please check your connection.";

/// Error types surfaced to callers of the shop API
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ApiError {
    /// No response was received (connect, send or receive failure)
    #[error("Network failure: {0}")]
    NetworkFailure(String),

    /// 401 with no usable refresh path
    #[error("Unauthenticated: {message}")]
    Unauthenticated {
        /// Message from the server, or a fallback
        message: String,
    },

    /// 401 after a refresh attempt failed; stored tokens have been cleared
    #[error("Session expired: {message}")]
    RefreshExhausted {
        /// Message from the original 401 response
        message: String,
    },

    /// Any other non-2xx response
    #[error("Server error ({status}): {message}")]
    ServerError {
        /// HTTP status code
        status: u16,
        /// Message from the server, or a fallback
        message: String,
    },

    /// A 2xx body could not be decoded into the expected type
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// The request could not be built
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// The caller cancelled the request
    #[error("Request cancelled")]
    Cancelled,
}

impl ApiError {
    /// HTTP status associated with this error, if any
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Unauthenticated { .. } | ApiError::RefreshExhausted { .. } => Some(401),
            ApiError::ServerError { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Whether the caller must sign in again
    pub fn is_auth_failure(&self) -> bool {
        matches!(self, ApiError::Unauthenticated { .. } | ApiError::RefreshExhausted { .. })
    }

    /// Message suitable for showing to the user
    pub fn user_message(&self) -> String {
        match self {
            ApiError::Unauthenticated { message }
            | ApiError::RefreshExhausted { message }
            | ApiError::ServerError { message, .. } => message.clone(),
            ApiError::NetworkFailure(_) => NETWORK_FALLBACK_MESSAGE.to_string(),
            ApiError::InvalidResponse(_) | ApiError::InvalidRequest(_) => {
                "Something went wrong. Please try again.".to_string()
            }
            ApiError::Cancelled => "Request cancelled.".to_string(),
        }
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        ApiError::InvalidRequest(err.to_string())
    }
}
