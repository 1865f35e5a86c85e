//! Client configuration and base URL resolution

use std::collections::HashMap;
use std::time::Duration;

/// Environment variable overriding the API base URL
///
/// Read at compile time first, then at runtime.
pub const BASE_URL_ENV: &str = "GLOWCART_API_BASE_URL";

/// Path of the token refresh endpoint, relative to the base URL
pub const DEFAULT_REFRESH_PATH: &str = "/auth/refresh";

/// Local development server as seen from an Android emulator
pub const ANDROID_EMULATOR_URL: &str = "http://10.0.2.2:5000/api";

/// Local development server on the host loopback
pub const LOCALHOST_URL: &str = "http://127.0.0.1:5000/api";

/// Platform-appropriate local development base URL
pub fn local_development_url() -> &'static str {
    if cfg!(target_os = "android") {
        ANDROID_EMULATOR_URL
    } else {
        LOCALHOST_URL
    }
}

/// Resolve the API base URL
///
/// Order: build-time `GLOWCART_API_BASE_URL`, then the runtime variable of
/// the same name, then [`local_development_url`].
pub fn resolve_base_url() -> String {
    pick_base_url(option_env!("GLOWCART_API_BASE_URL"), std::env::var(BASE_URL_ENV).ok())
}

fn pick_base_url(build_time: Option<&str>, runtime: Option<String>) -> String {
    if let Some(url) = build_time.map(str::trim).filter(|url| !url.is_empty()) {
        return url.to_string();
    }

    if let Some(url) = runtime.as_deref().map(str::trim).filter(|url| !url.is_empty()) {
        return url.to_string();
    }

    local_development_url().to_string()
}

/// Configuration for the API client
#[derive(Debug, Clone)]
pub struct ApiClientConfig {
    /// Base URL including the API prefix (e.g., "http://127.0.0.1:5000/api")
    pub base_url: String,
    /// Default per-request timeout
    pub timeout: Duration,
    /// TCP connect timeout
    pub connect_timeout: Duration,
    /// Timeout applied to the token refresh call
    pub refresh_timeout: Duration,
    /// User agent string
    pub user_agent: String,
    /// Custom headers to include in all requests
    pub default_headers: HashMap<String, String>,
    /// Refresh endpoint path
    pub refresh_path: String,
}

impl Default for ApiClientConfig {
    fn default() -> Self {
        Self {
            base_url: resolve_base_url(),
            timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(10),
            refresh_timeout: Duration::from_secs(15),
            user_agent: format!("Glowcart/{}", env!("CARGO_PKG_VERSION")),
            default_headers: HashMap::new(),
            refresh_path: DEFAULT_REFRESH_PATH.to_string(),
        }
    }
}

impl ApiClientConfig {
    /// Create a new config with a base URL
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Default::default()
        }
    }

    /// Set the request timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the connect timeout
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Set the refresh call timeout
    pub fn with_refresh_timeout(mut self, timeout: Duration) -> Self {
        self.refresh_timeout = timeout;
        self
    }

    /// Set the user agent
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Add a default header
    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.default_headers.insert(key.into(), value.into());
        self
    }

    /// Set the refresh endpoint path
    pub fn with_refresh_path(mut self, path: impl Into<String>) -> Self {
        self.refresh_path = path.into();
        self
    }

    /// Join a request path onto the base URL
    pub fn url_for(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    /// Whether `path` addresses the refresh endpoint
    pub fn is_refresh_path(&self, path: &str) -> bool {
        let path = path.split('?').next().unwrap_or(path);
        normalize(path) == normalize(&self.refresh_path)
    }
}

fn normalize(path: &str) -> &str {
    path.trim_start_matches('/').trim_end_matches('/')
}
