//! Configuration management for the FOIS fetcher
//!
//! This module handles loading and validating configuration from environment
//! variables (optionally seeded from a `.env` file) and TOML files.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::api::rate::RatePolicy;
use crate::error::{Error, Result};
use crate::utils::retry::RetryPolicy;

/// Default FOIS gateway host
pub const DEFAULT_API_HOST: &str = "https://gw.crisapis.indianrail.gov.in";

/// Default dashboard resource base, relative to the host
pub const DEFAULT_DATA_PATH: &str = "/t/fois.cris.in/foisrlydashb/1.0/";

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Remote API configuration
    #[serde(default)]
    pub api: ApiConfig,

    /// Destination store configuration
    #[serde(default)]
    pub store: StoreConfig,

    /// Proactive call pacing
    #[serde(default)]
    pub pacing: PacingConfig,

    /// Write retry policy
    #[serde(default)]
    pub write: WriteConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Remote API configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// OAuth client identifier
    pub client_id: String,

    /// OAuth client secret
    pub client_secret: String,

    /// Token exchange URL
    pub token_url: String,

    /// Token revocation URL
    pub revoke_url: String,

    /// Base URL the endpoint paths are joined onto
    pub base_url: String,

    /// Zone code rows are narrowed to
    pub zone: String,

    /// Request timeout in seconds
    pub request_timeout_secs: u64,
}

/// Destination store configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Destination store identifier (SQLite database path)
    pub id: PathBuf,

    /// Display name used in progress output
    pub name: Option<String>,
}

/// Call pacing configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PacingConfig {
    /// Calls allowed before a pause
    pub threshold: u32,

    /// Pause length in seconds
    pub pause_secs: u64,
}

/// Write retry configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WriteConfig {
    /// Total write attempts per batch
    pub max_attempts: u32,

    /// Delay between attempts in seconds
    pub retry_delay_secs: u64,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// Log format (text, json)
    pub format: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            client_id: String::new(),
            client_secret: String::new(),
            token_url: format!("{DEFAULT_API_HOST}/token"),
            revoke_url: format!("{DEFAULT_API_HOST}/revoke"),
            base_url: format!("{DEFAULT_API_HOST}{DEFAULT_DATA_PATH}"),
            zone: String::from("WR"),
            request_timeout_secs: 30,
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            id: PathBuf::from("data/fois.db"),
            name: None,
        }
    }
}

impl Default for PacingConfig {
    fn default() -> Self {
        Self {
            threshold: 10,
            pause_secs: 60,
        }
    }
}

impl Default for WriteConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            retry_delay_secs: 5,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: String::from("info"),
            format: String::from("text"),
        }
    }
}

fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse::<T>().ok())
        .unwrap_or(default)
}

impl Config {
    /// Load configuration from environment variables
    ///
    /// A `.env` file in the working directory is read first if present.
    pub fn from_env() -> Result<Self> {
        dotenv::dotenv().ok();

        let mut config = Self::default();
        config.apply_env();
        Ok(config)
    }

    /// Load configuration from a TOML file, with environment overrides on top
    pub fn from_file(path: &Path) -> Result<Self> {
        dotenv::dotenv().ok();

        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::config(format!("Failed to read config file {}: {e}", path.display()))
        })?;

        let mut config: Self = toml::from_str(&content).map_err(|e| {
            Error::config(format!("Failed to parse TOML config file {}: {e}", path.display()))
        })?;

        config.apply_env();
        Ok(config)
    }

    fn apply_env(&mut self) {
        let api = &mut self.api;
        if let Ok(v) = std::env::var("CLIENT_ID") {
            api.client_id = v;
        }
        if let Ok(v) = std::env::var("CLIENT_SECRET") {
            api.client_secret = v;
        }
        if let Ok(v) = std::env::var("FOIS_TOKEN_URL") {
            api.token_url = v;
        }
        if let Ok(v) = std::env::var("FOIS_REVOKE_URL") {
            api.revoke_url = v;
        }
        if let Ok(v) = std::env::var("FOIS_BASE_URL") {
            api.base_url = v;
        }
        if let Ok(v) = std::env::var("FOIS_ZONE") {
            api.zone = v;
        }
        api.request_timeout_secs = env_or("FOIS_REQUEST_TIMEOUT", api.request_timeout_secs);

        if let Ok(v) = std::env::var("STORE_ID") {
            self.store.id = PathBuf::from(v);
        }
        if let Ok(v) = std::env::var("STORE_NAME") {
            self.store.name = Some(v);
        }

        self.pacing.threshold = env_or("FOIS_RATE_THRESHOLD", self.pacing.threshold);
        self.pacing.pause_secs = env_or("FOIS_RATE_PAUSE_SECS", self.pacing.pause_secs);
        self.write.max_attempts = env_or("FOIS_WRITE_ATTEMPTS", self.write.max_attempts);
        self.write.retry_delay_secs = env_or("FOIS_WRITE_DELAY_SECS", self.write.retry_delay_secs);

        if let Ok(v) = std::env::var("FOIS_LOG_LEVEL") {
            self.logging.level = v;
        }
        if let Ok(v) = std::env::var("FOIS_LOG_FORMAT") {
            self.logging.format = v;
        }
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if self.api.client_id.trim().is_empty() || self.api.client_secret.trim().is_empty() {
            return Err(Error::config("CLIENT_ID and CLIENT_SECRET must be set"));
        }

        if self.api.zone.trim().is_empty() {
            return Err(Error::config("zone must not be empty"));
        }

        for (name, url) in [
            ("token_url", &self.api.token_url),
            ("revoke_url", &self.api.revoke_url),
            ("base_url", &self.api.base_url),
        ] {
            url::Url::parse(url).map_err(|e| Error::config(format!("{name} is invalid: {e}")))?;
        }

        if self.pacing.threshold == 0 {
            return Err(Error::config("pacing threshold must be greater than 0"));
        }

        if self.write.max_attempts == 0 {
            return Err(Error::config("write max_attempts must be greater than 0"));
        }

        if self.store.id.as_os_str().is_empty() {
            return Err(Error::config("STORE_ID must not be empty"));
        }

        Ok(())
    }

    /// Get request timeout as Duration
    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.api.request_timeout_secs)
    }

    #[must_use]
    pub fn rate_policy(&self) -> RatePolicy {
        RatePolicy::new(self.pacing.threshold, Duration::from_secs(self.pacing.pause_secs))
    }

    #[must_use]
    pub fn write_policy(&self) -> RetryPolicy {
        RetryPolicy::fixed(
            self.write.max_attempts,
            Duration::from_secs(self.write.retry_delay_secs),
        )
    }

    /// Name shown for the destination store
    pub fn store_display_name(&self) -> String {
        self.store
            .name
            .clone()
            .unwrap_or_else(|| self.store.id.display().to_string())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api: ApiConfig::default(),
            store: StoreConfig::default(),
            pacing: PacingConfig::default(),
            write: WriteConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}
