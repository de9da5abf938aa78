//! Credential types

use chrono::{DateTime, Utc};
use serde::Deserialize;

/// Seconds before the real expiry at which a credential counts as expired
const EXPIRY_BUFFER_SECONDS: i64 = 30;

/// Bearer credential with expiration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credential {
    /// The access token
    pub access_token: String,
    /// When the token expires
    pub expires_at: Option<DateTime<Utc>>,
}

impl Credential {
    /// Create a new credential
    pub fn new(access_token: impl Into<String>, expires_at: Option<DateTime<Utc>>) -> Self {
        Self {
            access_token: access_token.into(),
            expires_at,
        }
    }

    /// Create a credential that expires in N seconds from now
    pub fn expires_in(access_token: impl Into<String>, seconds: i64) -> Self {
        Self {
            access_token: access_token.into(),
            expires_at: Some(Utc::now() + chrono::Duration::seconds(seconds)),
        }
    }

    /// Check if the credential is expired (with 30 second buffer)
    pub fn is_expired(&self) -> bool {
        match self.expires_at {
            Some(expires_at) => {
                Utc::now() + chrono::Duration::seconds(EXPIRY_BUFFER_SECONDS) >= expires_at
            }
            None => false, // No expiration = never expires
        }
    }

    /// Value for the `Authorization` header
    pub fn header_value(&self) -> String {
        format!("Bearer {}", self.access_token)
    }
}

/// OAuth2 token response
#[derive(Debug, Deserialize)]
pub(crate) struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub expires_in: Option<i64>,
    #[serde(default)]
    #[allow(dead_code)]
    pub token_type: Option<String>,
}

impl TokenResponse {
    pub(crate) fn into_credential(self) -> Credential {
        match self.expires_in {
            Some(secs) => Credential::expires_in(self.access_token, secs),
            None => Credential::new(self.access_token, None),
        }
    }
}
