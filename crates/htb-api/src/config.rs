//! Client configuration
//!
//! Values come from the environment, with builder overrides for the
//! options the command line can set.

use serde::{Deserialize, Serialize};

/// Default API root for the labs platform.
pub const DEFAULT_BASE_URL: &str = "https://labs.hackthebox.com/api/v4";

/// Default per-request timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// HTTP client configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// API root, without trailing slash
    pub base_url: String,
    /// App token sent as a bearer credential
    #[serde(skip_serializing)]
    pub token: Option<String>,
    /// Optional HTTP(S)/SOCKS proxy URL
    pub proxy: Option<String>,
    /// Per-request timeout in seconds
    pub timeout_secs: u64,
    /// User-Agent header value
    pub user_agent: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        ClientConfig {
            base_url: std::env::var("HTB_API_URL")
                .unwrap_or_else(|_| DEFAULT_BASE_URL.to_string()),
            token: std::env::var("HTB_TOKEN").ok().filter(|t| !t.trim().is_empty()),
            proxy: std::env::var("HTB_PROXY").ok().filter(|p| !p.trim().is_empty()),
            timeout_secs: std::env::var("HTB_TIMEOUT_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(DEFAULT_TIMEOUT_SECS),
            user_agent: format!("htb-cli/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl ClientConfig {
    /// Create a new config from environment variables
    pub fn from_env() -> Self {
        Self::default()
    }

    /// Create config for a specific server with no credentials
    pub fn new(base_url: &str) -> Self {
        ClientConfig {
            base_url: base_url.trim_end_matches('/').to_string(),
            token: None,
            proxy: None,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            user_agent: format!("htb-cli/{}", env!("CARGO_PKG_VERSION")),
        }
    }

    /// Set the bearer token
    pub fn with_token(mut self, token: &str) -> Self {
        self.token = Some(token.to_string());
        self
    }

    /// Route requests through a proxy. `None` keeps the current value.
    pub fn with_proxy(mut self, proxy: Option<&str>) -> Self {
        if let Some(p) = proxy.filter(|p| !p.trim().is_empty()) {
            self.proxy = Some(p.to_string());
        }
        self
    }
}
