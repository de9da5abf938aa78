//! Token provider implementation
//!
//! Performs the client-credentials exchange and caches the resulting bearer
//! credential until it expires or the API rejects it.

use super::types::{Credential, TokenResponse};
use crate::config::TapConfig;
use crate::error::{Error, Result};
use reqwest::Client;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::RwLock;
use tracing::{debug, info};

/// Settings for the client-credentials exchange
#[derive(Clone)]
pub struct TokenProviderConfig {
    /// Token endpoint URL
    pub token_url: String,
    /// Client ID
    pub client_id: String,
    /// Client secret
    pub client_secret: String,
}

impl TokenProviderConfig {
    /// Create a new token provider config
    pub fn new(
        token_url: impl Into<String>,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
    ) -> Self {
        Self {
            token_url: token_url.into(),
            client_id: client_id.into(),
            client_secret: client_secret.into(),
        }
    }
}

impl From<&TapConfig> for TokenProviderConfig {
    fn from(config: &TapConfig) -> Self {
        Self::new(&config.auth_url, &config.client_id, &config.client_secret)
    }
}

impl std::fmt::Debug for TokenProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenProviderConfig")
            .field("token_url", &self.token_url)
            .field("client_id", &self.client_id)
            .finish_non_exhaustive()
    }
}

/// Acquires and caches the bearer credential for a whole run
///
/// Build one per run, wrap it in an `Arc` and hand it to every
/// [`PageFetcher`](crate::http::PageFetcher).
pub struct TokenProvider {
    /// Exchange settings
    config: TokenProviderConfig,
    /// Cached credential, `None` until the first request
    cached: RwLock<Option<Credential>>,
    /// HTTP client for token requests
    http_client: Client,
    /// Number of exchanges performed against the identity endpoint
    exchanges: AtomicU64,
}

impl TokenProvider {
    /// Create a new token provider
    pub fn new(config: TokenProviderConfig) -> Self {
        Self::with_client(config, Client::new())
    }

    /// Create a token provider with a custom HTTP client
    pub fn with_client(config: TokenProviderConfig, http_client: Client) -> Self {
        Self {
            config,
            cached: RwLock::new(None),
            http_client,
            exchanges: AtomicU64::new(0),
        }
    }

    /// Return the cached credential, exchanging a new one if needed
    pub async fn get_token(&self) -> Result<Credential> {
        {
            let cached = self.cached.read().await;
            if let Some(credential) = cached.as_ref() {
                if !credential.is_expired() {
                    return Ok(credential.clone());
                }
            }
        }

        let mut cached = self.cached.write().await;

        // Double-check after acquiring write lock (another task might have refreshed)
        if let Some(credential) = cached.as_ref() {
            if !credential.is_expired() {
                return Ok(credential.clone());
            }
        }

        let credential = self.exchange().await?;
        *cached = Some(credential.clone());
        Ok(credential)
    }

    /// Drop `rejected` from the cache and exchange a fresh credential
    ///
    /// If another caller already replaced the rejected credential, the newer
    /// one is returned without a second exchange.
    pub async fn refresh(&self, rejected: &Credential) -> Result<Credential> {
        let mut cached = self.cached.write().await;
        if let Some(current) = cached.as_ref() {
            if current != rejected && !current.is_expired() {
                return Ok(current.clone());
            }
        }

        *cached = None;
        let credential = self.exchange().await.map_err(|e| Error::TokenRefresh {
            message: e.to_string(),
        })?;
        *cached = Some(credential.clone());
        Ok(credential)
    }

    /// Number of token exchanges performed so far
    pub fn exchange_count(&self) -> u64 {
        self.exchanges.load(Ordering::Relaxed)
    }

    /// Client-credentials exchange against the identity endpoint
    async fn exchange(&self) -> Result<Credential> {
        debug!(token_url = %self.config.token_url, "Requesting access token");
        self.exchanges.fetch_add(1, Ordering::Relaxed);

        let form = [
            ("client_id", self.config.client_id.as_str()),
            ("client_secret", self.config.client_secret.as_str()),
            ("grant_type", "client_credentials"),
        ];

        let response = self
            .http_client
            .post(&self.config.token_url)
            .form(&form)
            .send()
            .await
            .map_err(|e| Error::auth(format!("Token request failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::auth(format!(
                "Token request failed with status {status}: {body}"
            )));
        }

        let token_response: TokenResponse = response
            .json()
            .await
            .map_err(|e| Error::auth(format!("Invalid token response: {e}")))?;

        let credential = token_response.into_credential();
        info!(expires_at = ?credential.expires_at, "Acquired access token");
        Ok(credential)
    }
}

impl std::fmt::Debug for TokenProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenProvider")
            .field("config", &self.config)
            .field("exchanges", &self.exchange_count())
            .finish_non_exhaustive()
    }
}
