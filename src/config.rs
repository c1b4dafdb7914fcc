//! Client configuration resolved from environment variables with sane defaults.

use std::path::PathBuf;
use std::time::Duration;
use tracing::info;

#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL of the remote API, without the `/api/` prefix.
    pub base_url: String,
    /// Directory holding the persisted access/refresh token slots.
    pub credentials_dir: PathBuf,
    /// Cadence of the background token refresh task.
    pub refresh_interval: Duration,
}

impl ClientConfig {
    pub fn new(base_url: impl Into<String>, credentials_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_url: base_url.into(),
            credentials_dir: credentials_dir.into(),
            refresh_interval: Duration::from_secs(100),
        }
    }

    pub fn from_env() -> Self {
        let base_url = std::env::var("CARDWALLET_API_URL")
            .unwrap_or_else(|_| "http://127.0.0.1:8000".to_string());
        let credentials_dir = std::env::var("CARDWALLET_CREDENTIALS_DIR")
            .unwrap_or_else(|_| ".cardwallet".to_string());
        let refresh_secs = std::env::var("CARDWALLET_REFRESH_INTERVAL_SECS")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .unwrap_or(100);
        Self {
            base_url,
            credentials_dir: PathBuf::from(credentials_dir),
            refresh_interval: Duration::from_secs(refresh_secs),
        }
    }

    /// Log the effective configuration once at startup.
    pub fn log_startup(&self) {
        let rust_log = std::env::var("RUST_LOG").unwrap_or_else(|_| "<unset>".to_string());
        info!(
            target: "startup",
            "cardwallet starting: RUST_LOG='{}', api_url='{}', credentials_dir={:?}, refresh_interval_secs={}",
            rust_log, self.base_url, self.credentials_dir, self.refresh_interval.as_secs()
        );
    }
}
