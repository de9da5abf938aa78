//! Page transport
//!
//! Sends one authenticated GET per call and classifies the answer into the
//! outcomes the page fetcher acts on. Throttling, transient server errors and
//! connection failures are retried here with backoff. A 401 is handed back
//! untouched: only a new credential can fix it.

use super::page::PageRequest;
use super::throttle::Throttle;
use crate::auth::Credential;
use crate::config::TapConfig;
use crate::error::{Error, Result};
use crate::types::BackoffType;
use reqwest::header::{AUTHORIZATION, RETRY_AFTER};
use reqwest::{Client, Response, StatusCode};
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

/// Seconds to wait on a 429 without a usable `Retry-After`
const DEFAULT_RETRY_AFTER_SECS: u64 = 60;

/// How often and how long to wait between attempts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Attempts after the first one
    pub max_retries: u32,
    pub backoff: BackoffType,
    /// Delay before the first retry
    pub initial: Duration,
    /// Upper bound for any computed delay
    pub ceiling: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            backoff: BackoffType::Exponential,
            initial: Duration::from_millis(100),
            ceiling: Duration::from_secs(60),
        }
    }
}

impl RetryPolicy {
    /// Delay before retry number `attempt + 1`
    pub fn delay(&self, attempt: u32) -> Duration {
        let delay = match self.backoff {
            BackoffType::Constant => self.initial,
            BackoffType::Linear => self.initial.saturating_mul(attempt.saturating_add(1)),
            BackoffType::Exponential => self.initial.saturating_mul(2u32.saturating_pow(attempt)),
        };
        delay.min(self.ceiling)
    }
}

/// Transport settings
#[derive(Debug, Clone)]
pub struct TransportConfig {
    /// API root every page path is resolved against
    pub api_url: Url,
    /// Per-request timeout
    pub timeout: Duration,
    pub user_agent: String,
    /// Zero disables client-side pacing
    pub requests_per_second: u32,
    pub retry: RetryPolicy,
}

impl TransportConfig {
    /// Defaults against `api_url`, without pacing
    pub fn new(api_url: Url) -> Self {
        Self {
            api_url,
            timeout: Duration::from_secs(30),
            user_agent: format!("{}/{}", crate::NAME, crate::VERSION),
            requests_per_second: 0,
            retry: RetryPolicy::default(),
        }
    }

    /// Settings taken from the tap configuration
    pub fn from_tap_config(config: &TapConfig) -> Result<Self> {
        Ok(Self {
            timeout: config.timeout(),
            user_agent: config.user_agent(),
            requests_per_second: config.requests_per_second,
            retry: RetryPolicy {
                max_retries: config.max_retries,
                ..RetryPolicy::default()
            },
            ..Self::new(Url::parse(&config.api_url)?)
        })
    }

    #[must_use]
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }
}

/// How the API answered a page request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Success with a body
    Page { status: u16, body: String },
    /// 204: nothing (more) to return
    NoContent,
    /// 401: the credential was rejected
    Unauthorized,
}

/// Authenticated GET with pacing and retries
pub struct Transport {
    client: Client,
    config: TransportConfig,
    throttle: Throttle,
}

impl Transport {
    pub fn new(config: TransportConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .user_agent(&config.user_agent)
            .build()?;
        let throttle = Throttle::per_second(config.requests_per_second);

        Ok(Self {
            client,
            config,
            throttle,
        })
    }

    /// Request one page with `credential`
    ///
    /// Returns an error for transport failures, for retryable failures that
    /// outlast the retry budget, and for any other non-success status.
    pub async fn get(&self, request: &PageRequest, credential: &Credential) -> Result<Outcome> {
        let url = self.url_for(&request.path)?;
        let retry = self.config.retry;
        let mut attempt = 0;

        loop {
            self.throttle.ready().await;

            let error = match self.send(&url, request, credential).await {
                Ok(outcome) => return Ok(outcome),
                Err(e) if e.is_retryable() && attempt < retry.max_retries => e,
                Err(e) => return Err(e),
            };

            let delay = match &error {
                Error::RateLimited {
                    retry_after_seconds,
                } => Duration::from_secs(*retry_after_seconds),
                _ => retry.delay(attempt),
            };
            attempt += 1;
            warn!(
                path = %request.path,
                page = request.page_number,
                attempt,
                max_retries = retry.max_retries,
                delay_ms = delay.as_millis() as u64,
                error = %error,
                "Retrying page request"
            );
            tokio::time::sleep(delay).await;
        }
    }

    /// Resolve a page path against the API root
    pub fn url_for(&self, path: &str) -> Result<Url> {
        let root = self.config.api_url.as_str().trim_end_matches('/');
        Ok(Url::parse(&format!("{root}/{}", path.trim_start_matches('/')))?)
    }

    async fn send(&self, url: &Url, request: &PageRequest, credential: &Credential) -> Result<Outcome> {
        debug!(%url, page = request.page_number, params = ?request.params, "Fetching page");

        let mut builder = self
            .client
            .get(url.clone())
            .header(AUTHORIZATION, credential.header_value());
        if !request.params.is_empty() {
            builder = builder.query(&request.params);
        }

        match builder.send().await {
            Ok(response) => classify(response).await,
            Err(e) if e.is_timeout() => Err(Error::Timeout {
                timeout_ms: self.config.timeout.as_millis() as u64,
            }),
            Err(e) => Err(Error::Http(e)),
        }
    }
}

impl std::fmt::Debug for Transport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Transport")
            .field("config", &self.config)
            .field("throttle", &self.throttle)
            .finish_non_exhaustive()
    }
}

async fn classify(response: Response) -> Result<Outcome> {
    let status = response.status();
    match status {
        StatusCode::NO_CONTENT => Ok(Outcome::NoContent),
        StatusCode::UNAUTHORIZED => Ok(Outcome::Unauthorized),
        StatusCode::TOO_MANY_REQUESTS => Err(Error::RateLimited {
            retry_after_seconds: retry_after(&response),
        }),
        s if s.is_success() => {
            let body = response
                .text()
                .await
                .map_err(|e| Error::decode(format!("Failed to read response body: {e}")))?;
            Ok(Outcome::Page {
                status: s.as_u16(),
                body,
            })
        }
        s => Err(Error::http_status(
            s.as_u16(),
            response.text().await.unwrap_or_default(),
        )),
    }
}

fn retry_after(response: &Response) -> u64 {
    response
        .headers()
        .get(RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.trim().parse().ok())
        .unwrap_or(DEFAULT_RETRY_AFTER_SECS)
}
