//! Error types for tap-apaleo
//!
//! Errors fall into layers: setup (config, catalog), authentication,
//! transport, payload, and the run itself. Two questions are asked of them
//! while syncing: may the request be tried again ([`Error::is_retryable`]) and
//! does the failure end the whole run ([`Error::is_auth`]).

use thiserror::Error;

/// The main error type for tap-apaleo
#[derive(Error, Debug)]
pub enum Error {
    // ------------------------------------------------------------------------
    // Setup
    // ------------------------------------------------------------------------
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Missing required config field: {field}")]
    MissingConfigField { field: String },

    #[error("Invalid config value for '{field}': {message}")]
    InvalidConfigValue { field: String, message: String },

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("Invalid catalog: {0}")]
    Catalog(#[from] serde_yaml::Error),

    #[error("Stream '{stream}' not found in catalog")]
    StreamNotFound { stream: String },

    // ------------------------------------------------------------------------
    // Authentication: always fatal to the run
    // ------------------------------------------------------------------------
    #[error("Authentication failed: {message}")]
    Auth { message: String },

    #[error("Token refresh failed: {message}")]
    TokenRefresh { message: String },

    // ------------------------------------------------------------------------
    // Transport
    // ------------------------------------------------------------------------
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("HTTP {status}: {body}")]
    HttpStatus { status: u16, body: String },

    #[error("Rate limited, retry after {retry_after_seconds}s")]
    RateLimited { retry_after_seconds: u64 },

    #[error("Request timeout after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    // ------------------------------------------------------------------------
    // Payload
    // ------------------------------------------------------------------------
    #[error("Failed to decode response: {message}")]
    Decode { message: String },

    #[error("JSONPath error: {message}")]
    JsonPath { message: String },

    #[error("Failed to extract records from path '{path}': {message}")]
    RecordExtraction { path: String, message: String },

    #[error("Protocol error in stream '{stream}' at page {page}: {message}")]
    Protocol {
        stream: String,
        page: u32,
        message: String,
    },

    // ------------------------------------------------------------------------
    // Run
    // ------------------------------------------------------------------------
    #[error("Stream '{stream}' failed at page {page}: {source}")]
    Stream {
        stream: String,
        page: u32,
        #[source]
        source: Box<Error>,
    },

    #[error("{failed} stream(s) failed: {summary}")]
    StreamsFailed { failed: usize, summary: String },

    #[error("Connection check failed: {message}")]
    CheckFailed { message: String },

    #[error("State error: {message}")]
    State { message: String },

    #[error("Output error: {message}")]
    Output { message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{message}: {source}")]
    Context {
        message: String,
        #[source]
        source: Box<Error>,
    },

    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}

impl Error {
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    pub fn missing_field(field: impl Into<String>) -> Self {
        Self::MissingConfigField {
            field: field.into(),
        }
    }

    pub fn invalid_value(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidConfigValue {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn auth(message: impl Into<String>) -> Self {
        Self::Auth {
            message: message.into(),
        }
    }

    pub fn http_status(status: u16, body: impl Into<String>) -> Self {
        Self::HttpStatus {
            status,
            body: body.into(),
        }
    }

    pub fn decode(message: impl Into<String>) -> Self {
        Self::Decode {
            message: message.into(),
        }
    }

    /// Malformed page for `stream`
    pub fn protocol(stream: impl Into<String>, page: u32, message: impl Into<String>) -> Self {
        Self::Protocol {
            stream: stream.into(),
            page,
            message: message.into(),
        }
    }

    pub fn state(message: impl Into<String>) -> Self {
        Self::State {
            message: message.into(),
        }
    }

    pub fn output(message: impl Into<String>) -> Self {
        Self::Output {
            message: message.into(),
        }
    }

    /// Attach the stream and page the error happened on
    ///
    /// Errors that already carry a location are returned unchanged.
    pub fn in_stream(self, stream: impl Into<String>, page: u32) -> Self {
        match self {
            Self::Protocol { .. } | Self::Stream { .. } => self,
            other => Self::Stream {
                stream: stream.into(),
                page,
                source: Box::new(other),
            },
        }
    }

    /// Whether the same request may succeed if sent again
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Http(e) => e.is_connect() || e.is_timeout(),
            Self::RateLimited { .. } | Self::Timeout { .. } => true,
            Self::HttpStatus { status, .. } => matches!(status, 429 | 500 | 502 | 503 | 504),
            _ => false,
        }
    }

    /// Whether the failure ends the whole run rather than a single stream
    pub fn is_auth(&self) -> bool {
        match self {
            Self::Auth { .. } | Self::TokenRefresh { .. } => true,
            Self::Stream { source, .. } | Self::Context { source, .. } => source.is_auth(),
            _ => false,
        }
    }
}

/// Result type alias for tap-apaleo
pub type Result<T> = std::result::Result<T, Error>;

/// Adds a description of what was being attempted to an error
pub trait ResultExt<T> {
    fn context(self, message: impl Into<String>) -> Result<T>;

    /// Like [`ResultExt::context`], building the message only on error
    fn with_context<F: FnOnce() -> String>(self, f: F) -> Result<T>;
}

impl<T, E: Into<Error>> ResultExt<T> for std::result::Result<T, E> {
    fn context(self, message: impl Into<String>) -> Result<T> {
        self.with_context(|| message.into())
    }

    fn with_context<F: FnOnce() -> String>(self, f: F) -> Result<T> {
        self.map_err(|e| Error::Context {
            message: f(),
            source: Box::new(e.into()),
        })
    }
}
