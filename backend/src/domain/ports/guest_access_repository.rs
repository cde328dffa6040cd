//! Port abstraction for guest access code persistence.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::{GuestAccessCode, NewGuestAccessCode};

use super::define_port_error;

define_port_error! {
    /// Errors raised by guest access repository adapters.
    pub enum GuestAccessRepositoryError {
        /// Repository connection could not be established.
        Connection { message: String } => "guest access repository connection failed: {message}",
        /// Query or mutation failed during execution.
        Query { message: String } => "guest access repository query failed: {message}",
        /// The repository did not answer in time.
        Timeout => "guest access repository timed out",
    }
}

/// Port for one-time guest access records.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait GuestAccessRepository: Send + Sync {
    /// Insert a new record.
    async fn create(&self, code: &NewGuestAccessCode) -> Result<(), GuestAccessRepositoryError>;

    /// Most recent record for a lowercased email.
    async fn latest_for_email(
        &self,
        email: &str,
    ) -> Result<Option<GuestAccessCode>, GuestAccessRepositoryError>;

    /// Record carrying the given magic token.
    async fn find_by_token(
        &self,
        token: &str,
    ) -> Result<Option<GuestAccessCode>, GuestAccessRepositoryError>;

    /// Count one failed verification.
    async fn record_failed_attempt(&self, id: i64) -> Result<(), GuestAccessRepositoryError>;

    /// Set `used_at` if it is still unset. Returns whether this call set it.
    async fn mark_used(&self, id: i64, now: DateTime<Utc>)
    -> Result<bool, GuestAccessRepositoryError>;

    /// Delete records that expired before `cutoff`.
    async fn delete_expired(&self, cutoff: DateTime<Utc>) -> Result<u64, GuestAccessRepositoryError>;
}
