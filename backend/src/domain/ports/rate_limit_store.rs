//! Port abstraction for shared rate-limit counters.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::RateLimitHit;

use super::define_port_error;

define_port_error! {
    /// Errors raised by rate-limit store adapters.
    pub enum RateLimitStoreError {
        /// Store connection could not be established.
        Connection { message: String } => "rate limit store connection failed: {message}",
        /// Query or mutation failed during execution.
        Query { message: String } => "rate limit store query failed: {message}",
        /// The store did not answer in time.
        Timeout => "rate limit store timed out",
    }
}

/// Port for fixed-window request counters.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RateLimitStore: Send + Sync {
    /// Count one request and return the count in the current window.
    ///
    /// A counter whose window started before `hit.window_floor` restarts at
    /// one. The reset and increment happen in a single atomic operation.
    async fn record_hit(&self, hit: &RateLimitHit) -> Result<u32, RateLimitStoreError>;

    /// Delete counters whose retention ended before `now`.
    async fn delete_expired(&self, now: DateTime<Utc>) -> Result<u64, RateLimitStoreError>;
}

/// Fixture store that never limits.
#[derive(Debug, Default)]
pub struct FixtureRateLimitStore;

#[async_trait]
impl RateLimitStore for FixtureRateLimitStore {
    async fn record_hit(&self, _hit: &RateLimitHit) -> Result<u32, RateLimitStoreError> {
        Ok(1)
    }

    async fn delete_expired(&self, _now: DateTime<Utc>) -> Result<u64, RateLimitStoreError> {
        Ok(0)
    }
}
