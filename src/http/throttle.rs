//! Client-side request pacing
//!
//! Apaleo throttles per client id, so one token bucket (governor) is shared by
//! every stream of a run. A rate of zero turns pacing off.

use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use std::num::NonZeroU32;
use std::sync::Arc;

/// Shared request pacer
#[derive(Clone, Default)]
pub struct Throttle {
    bucket: Option<Arc<DefaultDirectRateLimiter>>,
}

impl Throttle {
    /// Allow `rate` requests per second, bursting up to `rate`
    pub fn per_second(rate: u32) -> Self {
        let bucket = NonZeroU32::new(rate)
            .map(|rate| Arc::new(RateLimiter::direct(Quota::per_second(rate))));
        Self { bucket }
    }

    /// No pacing at all
    pub fn unlimited() -> Self {
        Self::default()
    }

    pub fn is_limited(&self) -> bool {
        self.bucket.is_some()
    }

    /// Wait for the next request slot
    pub async fn ready(&self) {
        if let Some(bucket) = &self.bucket {
            bucket.until_ready().await;
        }
    }
}

impl std::fmt::Debug for Throttle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Throttle")
            .field("limited", &self.is_limited())
            .finish()
    }
}
