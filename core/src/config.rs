//! Configuration for the `reqwest` client used as a transport.
//!
//! Per-request settings (method, headers, timeout) live on each `Resource`.
//! This only covers what is shared by every request sent through one client.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Client-wide transport settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransportConfig {
    /// User agent sent with every request
    pub user_agent: String,

    /// Limit on establishing a connection, separate from the request timeout
    pub connect_timeout: Option<Duration>,

    /// Maximum number of redirects to follow
    pub max_redirects: usize,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            user_agent: concat!("tinynet/", env!("CARGO_PKG_VERSION")).to_string(),
            connect_timeout: None,
            max_redirects: 10,
        }
    }
}

impl TransportConfig {
    /// Read overrides from `TINYNET_USER_AGENT`, `TINYNET_CONNECT_TIMEOUT_SECS`
    /// and `TINYNET_MAX_REDIRECTS`. Unparseable values are logged and ignored.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();
        if let Some(user_agent) = lookup("TINYNET_USER_AGENT") {
            config.user_agent = user_agent;
        }
        if let Some(raw) = lookup("TINYNET_CONNECT_TIMEOUT_SECS") {
            match raw.parse::<u64>() {
                Ok(secs) => config.connect_timeout = Some(Duration::from_secs(secs)),
                Err(_) => warn!(value = %raw, "ignoring invalid TINYNET_CONNECT_TIMEOUT_SECS"),
            }
        }
        if let Some(raw) = lookup("TINYNET_MAX_REDIRECTS") {
            match raw.parse::<usize>() {
                Ok(max) => config.max_redirects = max,
                Err(_) => warn!(value = %raw, "ignoring invalid TINYNET_MAX_REDIRECTS"),
            }
        }
        config
    }

    /// Build a `reqwest::Client` with these settings.
    pub fn build_client(&self) -> Result<reqwest::Client, reqwest::Error> {
        debug!(
            user_agent = %self.user_agent,
            max_redirects = self.max_redirects,
            "building HTTP client"
        );
        let mut builder = reqwest::Client::builder()
            .user_agent(&self.user_agent)
            .redirect(reqwest::redirect::Policy::limited(self.max_redirects));
        if let Some(timeout) = self.connect_timeout {
            builder = builder.connect_timeout(timeout);
        }
        builder.build()
    }
}
