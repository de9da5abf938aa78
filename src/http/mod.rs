//! HTTP module
//!
//! Transport with pacing, retries and backoff, plus the page fetcher that
//! attaches the bearer credential to each page request.

mod fetcher;
mod page;
mod throttle;
mod transport;

pub use fetcher::PageFetcher;
pub use page::{PageRequest, PageResponse};
pub use throttle::Throttle;
pub use transport::{Outcome, RetryPolicy, Transport, TransportConfig};
