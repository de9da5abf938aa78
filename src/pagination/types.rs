//! Pagination types

use serde::{Deserialize, Serialize};
use std::fmt;

/// Page number of the next page to request (1-based)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PageToken(u32);

impl PageToken {
    /// The first page
    pub const FIRST: PageToken = PageToken(1);

    /// Create a token for page `number`; page numbers start at 1
    pub fn new(number: u32) -> Option<Self> {
        (number >= 1).then_some(Self(number))
    }

    /// The page number
    pub fn number(self) -> u32 {
        self.0
    }

    /// Token for the following page
    #[must_use]
    pub fn next(self) -> Self {
        Self(self.0.saturating_add(1))
    }
}

impl Default for PageToken {
    fn default() -> Self {
        Self::FIRST
    }
}

impl fmt::Display for PageToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
