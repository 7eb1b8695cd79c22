use std::time::Duration;

use super::error::{HttpStoreError, HttpStoreResult};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Runtime configuration describing how to reach the remote record store.
#[derive(Debug, Clone)]
pub struct HttpStoreConfig {
    pub base_url: String,
    pub timeout: Duration,
}

impl HttpStoreConfig {
    /// Construct a configuration from an explicit endpoint URL.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Override the per-request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Build a configuration by reading the expected environment variables.
    pub fn from_env() -> HttpStoreResult<Self> {
        let base_url = std::env::var("RECORD_STORE_URL")
            .ok()
            .filter(|value| !value.trim().is_empty())
            .ok_or(HttpStoreError::MissingEnvVar {
                var: "RECORD_STORE_URL",
            })?;

        let mut config = Self::new(base_url);

        if let Some(timeout_ms) = std::env::var("RECORD_STORE_TIMEOUT_MS")
            .ok()
            .and_then(|value| value.parse::<u64>().ok())
        {
            config = config.with_timeout(Duration::from_millis(timeout_ms));
        }

        Ok(config)
    }
}
