//! Pagination module
//!
//! Apaleo list endpoints are paged by page number and report the total number
//! of matching records in a `count` field. The paginator decides from a
//! fetched page whether another page exists.

mod paginator;
mod types;

pub use paginator::{Paginator, PaginationError};
pub use types::PageToken;
