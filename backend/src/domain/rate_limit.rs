//! Fixed-window request rate limiting.
//!
//! Counters live in the backing store so every service instance shares the
//! same view. Each check is one atomic store operation: the store resets the
//! window when it has elapsed, otherwise increments, and reports the resulting
//! count. The decision is `count <= limit`.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use mockable::Clock;
use tracing::{debug, warn};

use super::ports::{RateLimitStore, RateLimitStoreError};
use super::{Error, KeyHash};

/// Minimum retention for counter rows, independent of the window length.
fn counter_retention() -> TimeDelta {
    TimeDelta::hours(1)
}

/// Maximum number of requests allowed per window.
///
/// # Examples
/// ```
/// use std::time::Duration;
/// use ridebook::domain::RateLimitPolicy;
///
/// let policy = RateLimitPolicy::new(5, Duration::from_secs(60));
/// assert_eq!(policy.limit(), 5);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitPolicy {
    limit: u32,
    window: Duration,
}

impl RateLimitPolicy {
    /// Build a policy allowing `limit` requests per `window`.
    pub const fn new(limit: u32, window: Duration) -> Self {
        Self { limit, window }
    }

    /// Requests allowed per window.
    pub const fn limit(&self) -> u32 {
        self.limit
    }

    /// Window length.
    pub const fn window(&self) -> Duration {
        self.window
    }

    fn window_delta(&self) -> TimeDelta {
        TimeDelta::from_std(self.window).unwrap_or(TimeDelta::MAX)
    }
}

/// Plaintext rate-limit key such as `ip:203.0.113.9`.
///
/// Only the [`KeyHash`] of a key reaches storage or logs.
#[derive(Clone, PartialEq, Eq)]
pub struct RateLimitKey(String);

impl RateLimitKey {
    /// Key scoped to a client IP address.
    pub fn ip(addr: &str) -> Self {
        Self(format!("ip:{addr}"))
    }

    /// Key scoped to a normalized email address.
    pub fn email(email: &str) -> Self {
        Self(format!("email:{email}"))
    }

    /// Same key counted separately under `scope`, so one endpoint's
    /// traffic does not consume another's budget.
    pub fn scoped(&self, scope: &str) -> Self {
        Self(format!("{scope}:{}", self.0))
    }

    /// Fingerprint persisted by the store.
    pub fn hash(&self) -> KeyHash {
        KeyHash::of(&self.0)
    }
}

impl std::fmt::Debug for RateLimitKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("RateLimitKey").field(&self.hash().as_str()).finish()
    }
}

/// One observed request, as handed to the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateLimitHit {
    /// Hashed key the counter belongs to.
    pub key_hash: KeyHash,
    /// Time the request was observed.
    pub now: DateTime<Utc>,
    /// Windows that started before this instant have elapsed.
    pub window_floor: DateTime<Utc>,
    /// When the counter row may be purged.
    pub expires_at: DateTime<Utc>,
}

impl RateLimitHit {
    /// Describe a request for `key` at `now` under `policy`.
    pub fn new(key: &RateLimitKey, policy: &RateLimitPolicy, now: DateTime<Utc>) -> Self {
        let window = policy.window_delta();
        Self {
            key_hash: key.hash(),
            now,
            window_floor: now.checked_sub_signed(window).unwrap_or(DateTime::<Utc>::MIN_UTC),
            expires_at: now + window.max(counter_retention()).min(TimeDelta::days(365)),
        }
    }
}

/// Store-backed rate limiter.
///
/// When the store fails the limiter either allows the request (`fail_open`)
/// or refuses it with [`crate::domain::ErrorCode::ServiceUnavailable`].
#[derive(Clone)]
pub struct RateLimiter {
    store: Arc<dyn RateLimitStore>,
    clock: Arc<dyn Clock>,
    fail_open: bool,
}

impl RateLimiter {
    /// Create a limiter over `store`.
    pub fn new(store: Arc<dyn RateLimitStore>, clock: Arc<dyn Clock>, fail_open: bool) -> Self {
        Self {
            store,
            clock,
            fail_open,
        }
    }

    /// Count one request against `key` and report whether it is allowed.
    pub async fn allow(&self, key: &RateLimitKey, policy: &RateLimitPolicy) -> Result<bool, Error> {
        let hit = RateLimitHit::new(key, policy, self.clock.utc());
        match self.store.record_hit(&hit).await {
            Ok(count) => {
                let allowed = count <= policy.limit();
                debug!(key_hash = %hit.key_hash, count, allowed, "rate limit counted");
                Ok(allowed)
            }
            Err(err) => self.on_store_failure(&hit.key_hash, &err),
        }
    }

    /// Check every key in order; refuse on the first key over its limit.
    ///
    /// Keys after a rejection are not counted.
    pub async fn enforce(&self, keys: &[RateLimitKey], policy: &RateLimitPolicy) -> Result<(), Error> {
        for key in keys {
            if !self.allow(key, policy).await? {
                return Err(Error::too_many_requests(
                    "Too many requests. Try again later.",
                ));
            }
        }
        Ok(())
    }

    /// Remove counters whose retention has passed.
    pub async fn cleanup_expired(&self) -> Result<u64, Error> {
        self.store
            .delete_expired(self.clock.utc())
            .await
            .map_err(|err| Error::internal(format!("rate limit cleanup failed: {err}")))
    }

    fn on_store_failure(&self, key_hash: &KeyHash, err: &RateLimitStoreError) -> Result<bool, Error> {
        if self.fail_open {
            warn!(%key_hash, error = %err, "rate limit store failed; allowing request");
            Ok(true)
        } else {
            warn!(%key_hash, error = %err, "rate limit store failed; refusing request");
            Err(Error::service_unavailable("rate limiting is temporarily unavailable"))
        }
    }
}

#[cfg(test)]
mod tests;
