/// Configuration for the sync core
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default quiet interval before a field edit is persisted
pub const DEFAULT_FIELD_DEBOUNCE_MS: u64 = 500;

const DEFAULT_API_BASE_URL: &str = "http://127.0.0.1:8000/api";

/// Runtime configuration for `NodeStateSync` and `HttpStore`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Base URL of the REST API, without trailing slash
    pub api_base_url: String,

    /// Quiet interval for debounced field writes
    pub field_debounce_ms: u64,

    /// Per-request timeout; `None` waits for the transport indefinitely
    pub request_timeout_secs: Option<u64>,

    /// Pixel size of the graph view, used to place new nodes at the visible centre
    pub view_width: f64,
    pub view_height: f64,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            field_debounce_ms: DEFAULT_FIELD_DEBOUNCE_MS,
            request_timeout_secs: None,
            view_width: 1200.0,
            view_height: 800.0,
        }
    }
}

impl SyncConfig {
    /// Build configuration from `DEALCANVAS_*` environment variables
    ///
    /// - `DEALCANVAS_API_URL`
    /// - `DEALCANVAS_FIELD_DEBOUNCE_MS`
    /// - `DEALCANVAS_REQUEST_TIMEOUT_SECS`
    ///
    /// Unset variables keep their defaults; malformed numbers are an error.
    pub fn from_env() -> Result<Self, String> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, String> {
        let mut config = Self::default();

        if let Some(url) = lookup("DEALCANVAS_API_URL") {
            config.api_base_url = url.trim_end_matches('/').to_string();
        }
        if let Some(ms) = lookup("DEALCANVAS_FIELD_DEBOUNCE_MS") {
            config.field_debounce_ms = ms
                .parse()
                .map_err(|_| format!("DEALCANVAS_FIELD_DEBOUNCE_MS is not a number: {}", ms))?;
        }
        if let Some(secs) = lookup("DEALCANVAS_REQUEST_TIMEOUT_SECS") {
            let secs = secs.parse().map_err(|_| {
                format!("DEALCANVAS_REQUEST_TIMEOUT_SECS is not a number: {}", secs)
            })?;
            config.request_timeout_secs = Some(secs);
        }

        config.validate()?;
        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.api_base_url.is_empty() {
            return Err("api_base_url cannot be empty".to_string());
        }

        if !(self.api_base_url.starts_with("http://") || self.api_base_url.starts_with("https://"))
        {
            return Err(format!(
                "api_base_url must be an http(s) URL, got '{}'",
                self.api_base_url
            ));
        }

        if self.field_debounce_ms == 0 {
            return Err("field_debounce_ms must be greater than 0".to_string());
        }

        if self.request_timeout_secs == Some(0) {
            return Err("request_timeout_secs must be greater than 0 when set".to_string());
        }

        if self.view_width <= 0.0 || self.view_height <= 0.0 {
            return Err("view dimensions must be positive".to_string());
        }

        Ok(())
    }

    pub fn field_debounce(&self) -> Duration {
        Duration::from_millis(self.field_debounce_ms)
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_secs.map(Duration::from_secs)
    }
}
