//! Tap configuration
//!
//! The configuration file is a flat JSON object. Only the credentials and
//! `start_date` are required; everything else falls back to the live Apaleo
//! endpoints and conservative client settings.

use crate::error::{Error, Result};
use crate::types::OptionStringExt;
use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use serde::{Deserialize, Deserializer};
use std::path::Path;
use std::time::Duration;

/// Default API root
pub const DEFAULT_API_URL: &str = "https://api.apaleo.com";

/// Default identity endpoint for the client-credentials exchange
pub const DEFAULT_AUTH_URL: &str = "https://identity.apaleo.com/connect/token";

/// Records requested per page
pub const DEFAULT_PAGE_SIZE: u32 = 1000;

/// Runtime configuration for a tap run
#[derive(Clone, Deserialize)]
pub struct TapConfig {
    /// OAuth2 client id
    #[serde(default)]
    pub client_id: String,

    /// OAuth2 client secret
    #[serde(default)]
    pub client_secret: String,

    /// Earliest modification time to extract when no bookmark exists
    #[serde(deserialize_with = "deserialize_start_date")]
    pub start_date: DateTime<Utc>,

    /// Optional `User-Agent` header
    #[serde(default)]
    pub user_agent: Option<String>,

    /// API root
    #[serde(default = "default_api_url")]
    pub api_url: String,

    /// Token endpoint
    #[serde(default = "default_auth_url")]
    pub auth_url: String,

    /// Records per page
    #[serde(default = "default_page_size")]
    pub page_size: u32,

    /// Minutes subtracted from a stored bookmark before resuming
    #[serde(default)]
    pub lookback_window_minutes: u32,

    /// Transport retries per request
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Client-side request rate cap (0 disables the limiter)
    #[serde(default = "default_requests_per_second")]
    pub requests_per_second: u32,

    /// Per-request timeout
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
}

fn default_api_url() -> String {
    DEFAULT_API_URL.to_string()
}

fn default_auth_url() -> String {
    DEFAULT_AUTH_URL.to_string()
}

fn default_page_size() -> u32 {
    DEFAULT_PAGE_SIZE
}

fn default_max_retries() -> u32 {
    3
}

fn default_requests_per_second() -> u32 {
    10
}

fn default_timeout_seconds() -> u64 {
    30
}

fn deserialize_start_date<'de, D>(deserializer: D) -> std::result::Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_start_date(&raw).map_err(serde::de::Error::custom)
}

/// Parse an RFC 3339 timestamp or a plain `YYYY-MM-DD` date (midnight UTC)
pub fn parse_start_date(raw: &str) -> Result<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Ok(ts.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc())
        .ok_or_else(|| {
            Error::invalid_value("start_date", format!("'{raw}' is not an ISO-8601 date"))
        })
}

/// Format a timestamp the way the API expects it in query strings
pub fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Secs, true)
}

impl TapConfig {
    /// Create a config with the required fields and defaults for the rest
    pub fn new(
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        start_date: DateTime<Utc>,
    ) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            start_date,
            user_agent: None,
            api_url: default_api_url(),
            auth_url: default_auth_url(),
            page_size: default_page_size(),
            lookback_window_minutes: 0,
            max_retries: default_max_retries(),
            requests_per_second: default_requests_per_second(),
            timeout_seconds: default_timeout_seconds(),
        }
    }

    /// Parse and validate a config from a JSON string
    pub fn from_json(json: &str) -> Result<Self> {
        let value: serde_json::Value = serde_json::from_str(json)
            .map_err(|e| Error::config(format!("Invalid config JSON: {e}")))?;
        if value.get("start_date").is_none() {
            return Err(Error::missing_field("start_date"));
        }
        let config: Self = serde_json::from_value(value)
            .map_err(|e| Error::config(format!("Invalid config JSON: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a config file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::config(format!("Failed to read config file {}: {e}", path.display()))
        })?;
        Self::from_json(&content)
    }

    /// Check required fields and value ranges
    pub fn validate(&self) -> Result<()> {
        if self.client_id.trim().is_empty() {
            return Err(Error::missing_field("client_id"));
        }
        if self.client_secret.trim().is_empty() {
            return Err(Error::missing_field("client_secret"));
        }
        if self.page_size == 0 {
            return Err(Error::invalid_value("page_size", "must be greater than zero"));
        }
        url::Url::parse(&self.api_url)?;
        url::Url::parse(&self.auth_url)?;
        Ok(())
    }

    /// User agent sent with every request
    pub fn user_agent(&self) -> String {
        self.user_agent
            .clone()
            .none_if_empty()
            .unwrap_or_else(|| format!("tap-apaleo/{}", env!("CARGO_PKG_VERSION")))
    }

    /// Per-request timeout
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }

    /// Look-back applied to stored bookmarks
    pub fn lookback(&self) -> chrono::Duration {
        chrono::Duration::minutes(i64::from(self.lookback_window_minutes))
    }
}

impl std::fmt::Debug for TapConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TapConfig")
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .field("start_date", &self.start_date)
            .field("user_agent", &self.user_agent)
            .field("api_url", &self.api_url)
            .field("auth_url", &self.auth_url)
            .field("page_size", &self.page_size)
            .field("lookback_window_minutes", &self.lookback_window_minutes)
            .field("max_retries", &self.max_retries)
            .field("requests_per_second", &self.requests_per_second)
            .field("timeout_seconds", &self.timeout_seconds)
            .finish()
    }
}
