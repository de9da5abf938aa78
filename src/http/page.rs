//! Page request and response values

use crate::error::{Error, Result};
use once_cell::sync::OnceCell;
use serde_json::Value;

/// One page request, built fresh for every HTTP call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRequest {
    /// Resource path relative to the API root
    pub path: String,
    /// Query parameters, in the order they are sent
    pub params: Vec<(String, String)>,
    /// Page number this request asks for (1-based)
    pub page_number: u32,
}

impl PageRequest {
    /// Create a request for `path` at `page_number`
    pub fn new(path: impl Into<String>, page_number: u32) -> Self {
        Self {
            path: path.into(),
            params: Vec::new(),
            page_number,
        }
    }

    /// Add a query parameter
    #[must_use]
    pub fn param(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.params.push((key.into(), value.to_string()));
        self
    }

    /// Look up a query parameter by name
    pub fn get_param(&self, key: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

/// Raw page response: status code plus body
///
/// The body is parsed as JSON at most once, on first access.
#[derive(Debug)]
pub struct PageResponse {
    status: u16,
    body: String,
    parsed: OnceCell<Value>,
}

impl PageResponse {
    /// Create a response from a status code and raw body
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
            parsed: OnceCell::new(),
        }
    }

    /// Create a response from a JSON body with status 200
    pub fn from_json(body: &Value) -> Self {
        Self::new(200, body.to_string())
    }

    /// Create an empty 204 response
    pub fn no_content() -> Self {
        Self::new(204, String::new())
    }

    /// HTTP status code
    pub fn status(&self) -> u16 {
        self.status
    }

    /// Raw body text
    pub fn body(&self) -> &str {
        &self.body
    }

    /// Whether the API signalled an empty page with 204 No Content
    pub fn is_no_content(&self) -> bool {
        self.status == 204
    }

    /// Parsed JSON body
    pub fn json(&self) -> Result<&Value> {
        self.parsed.get_or_try_init(|| {
            serde_json::from_str(&self.body)
                .map_err(|e| Error::decode(format!("Failed to parse JSON: {e}")))
        })
    }
}
