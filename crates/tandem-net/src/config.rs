//! Transport configuration loaded from environment variables.
//!
//! The value is built once and injected into [`crate::HttpTransport`]; no
//! other component reads these settings.

use std::time::Duration;

use tandem_shared::constants::{DEFAULT_API_BASE_URL, DEFAULT_REQUEST_TIMEOUT_SECS};

use crate::error::{Result, TransportError};
use crate::retry::ReconnectPolicy;

/// Transport configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportConfig {
    /// Base URL of the REST API, without trailing slash.
    /// Env: `TANDEM_API_URL`
    /// Default: `http://localhost:8000/api`
    pub api_base_url: String,

    /// Base URL of the push stream endpoint.
    /// Env: `TANDEM_STREAM_URL`
    /// Default: derived from `api_base_url` (`http` → `ws`, `https` → `wss`).
    pub stream_base_url: Option<String>,

    /// Per-request timeout.
    /// Env: `TANDEM_REQUEST_TIMEOUT_SECS`
    /// Default: 30 seconds.
    pub request_timeout: Duration,

    /// Stream reconnect schedule.
    /// Env: `TANDEM_STREAM_RETRY_BASE_MS`, `TANDEM_STREAM_RETRY_MAX_MS`,
    /// `TANDEM_STREAM_MAX_RETRIES` (`0` disables reconnects).
    pub reconnect: ReconnectPolicy,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            stream_base_url: None,
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            reconnect: ReconnectPolicy::default(),
        }
    }
}

impl TransportConfig {
    pub fn new(api_base_url: impl Into<String>) -> Self {
        Self {
            api_base_url: trim_base(api_base_url.into()),
            ..Self::default()
        }
    }

    /// Load configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(url) = std::env::var("TANDEM_API_URL") {
            if url.trim().is_empty() {
                tracing::warn!("Empty TANDEM_API_URL, using default");
            } else {
                config.api_base_url = trim_base(url);
            }
        }

        if let Ok(url) = std::env::var("TANDEM_STREAM_URL") {
            if !url.trim().is_empty() {
                config.stream_base_url = Some(trim_base(url));
            }
        }

        if let Some(secs) = parse_env::<u64>("TANDEM_REQUEST_TIMEOUT_SECS") {
            config.request_timeout = Duration::from_secs(secs);
        }

        let base = parse_env::<u64>("TANDEM_STREAM_RETRY_BASE_MS")
            .map(Duration::from_millis)
            .unwrap_or(config.reconnect.base_delay());
        let max = parse_env::<u64>("TANDEM_STREAM_RETRY_MAX_MS")
            .map(Duration::from_millis)
            .unwrap_or(config.reconnect.max_delay());
        let attempts = parse_env::<u32>("TANDEM_STREAM_MAX_RETRIES")
            .map(Some)
            .unwrap_or(config.reconnect.max_attempts());
        config.reconnect = ReconnectPolicy::new(base, max, attempts);

        config
    }

    /// Base URL for stream connections.
    pub fn stream_base(&self) -> Result<String> {
        if let Some(ref url) = self.stream_base_url {
            return Ok(url.clone());
        }

        let api = &self.api_base_url;
        if let Some(rest) = api.strip_prefix("https://") {
            Ok(format!("wss://{rest}"))
        } else if let Some(rest) = api.strip_prefix("http://") {
            Ok(format!("ws://{rest}"))
        } else {
            Err(TransportError::InvalidUrl(format!(
                "api base must start with http:// or https://, got {api}"
            )))
        }
    }
}

fn trim_base(url: String) -> String {
    url.trim().trim_end_matches('/').to_string()
}

fn parse_env<T: std::str::FromStr>(key: &str) -> Option<T> {
    let raw = std::env::var(key).ok()?;
    match raw.trim().parse::<T>() {
        Ok(value) => Some(value),
        Err(_) => {
            tracing::warn!(key, value = %raw, "Invalid value, using default");
            None
        }
    }
}
