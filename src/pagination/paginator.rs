//! Page-number paginator driven by the `count` field

use super::types::PageToken;
use crate::config::DEFAULT_PAGE_SIZE;
use crate::http::PageResponse;
use serde_json::Value;
use thiserror::Error;

/// Why the next page could not be determined
#[derive(Debug, Error, PartialEq)]
pub enum PaginationError {
    #[error("response body has no 'count' field")]
    MissingCount,

    #[error("'count' is not a non-negative integer: {0}")]
    InvalidCount(Value),

    #[error("response body is not valid JSON: {0}")]
    InvalidBody(String),
}

/// Decides whether another page must be fetched
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Paginator {
    page_size: u32,
}

impl Default for Paginator {
    fn default() -> Self {
        Self::new(DEFAULT_PAGE_SIZE)
    }
}

impl Paginator {
    /// Create a paginator for a fixed page size
    pub fn new(page_size: u32) -> Self {
        Self {
            page_size: page_size.max(1),
        }
    }

    /// Records requested per page
    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    /// Token for the page after `previous`, or `None` when the last page was seen
    ///
    /// `previous` is `None` for the first page. A 204 response always ends
    /// pagination. Otherwise pages `1..=previous` covered
    /// `previous * page_size` records, and pagination ends once that reaches
    /// `count`.
    pub fn next_page_token(
        &self,
        response: &PageResponse,
        previous: Option<PageToken>,
    ) -> Result<Option<PageToken>, PaginationError> {
        if response.is_no_content() {
            return Ok(None);
        }

        let body = response
            .json()
            .map_err(|e| PaginationError::InvalidBody(e.to_string()))?;
        let count = total_count(body)?;

        let previous = previous.unwrap_or(PageToken::FIRST);
        let covered = u64::from(previous.number()) * u64::from(self.page_size);

        if covered >= count {
            Ok(None)
        } else {
            Ok(Some(previous.next()))
        }
    }
}

fn total_count(body: &Value) -> Result<u64, PaginationError> {
    match body.get("count") {
        None | Some(Value::Null) => Err(PaginationError::MissingCount),
        Some(value) => value
            .as_u64()
            .ok_or_else(|| PaginationError::InvalidCount(value.clone())),
    }
}
