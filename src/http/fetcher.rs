//! Page fetcher
//!
//! Issues one authenticated GET per page and hands back the raw response.
//! The body is not interpreted here.

use super::page::{PageRequest, PageResponse};
use super::transport::{Outcome, Transport};
use crate::auth::TokenProvider;
use crate::error::{Error, Result};
use crate::streams::StreamDescriptor;
use std::sync::Arc;
use tracing::warn;

/// Fetches pages for every stream of a run
#[derive(Debug)]
pub struct PageFetcher {
    transport: Transport,
    tokens: Arc<TokenProvider>,
}

impl PageFetcher {
    /// Create a fetcher over `transport`, authenticating with the shared `tokens`
    pub fn new(transport: Transport, tokens: Arc<TokenProvider>) -> Self {
        Self { transport, tokens }
    }

    /// The shared token provider
    pub fn tokens(&self) -> &Arc<TokenProvider> {
        &self.tokens
    }

    /// Fetch one page
    ///
    /// A 401 invalidates the credential and the page is retried once with a
    /// fresh one; a second 401 is an authentication error. 204 is returned as
    /// a normal response. Other non-success statuses are errors.
    pub async fn fetch(
        &self,
        stream: &StreamDescriptor,
        request: &PageRequest,
    ) -> Result<PageResponse> {
        let credential = self.tokens.get_token().await?;

        let outcome = match self.transport.get(request, &credential).await? {
            Outcome::Unauthorized => {
                warn!(
                    stream = %stream.name,
                    page = request.page_number,
                    "Credential rejected, refreshing token and retrying page"
                );
                let fresh = self.tokens.refresh(&credential).await?;
                self.transport.get(request, &fresh).await?
            }
            outcome => outcome,
        };

        match outcome {
            Outcome::Page { status, body } => Ok(PageResponse::new(status, body)),
            Outcome::NoContent => Ok(PageResponse::no_content()),
            Outcome::Unauthorized => Err(Error::auth(format!(
                "API rejected a freshly issued token for stream '{}'",
                stream.name
            ))),
        }
    }
}
