//! Port abstraction for booking idempotency records.
//!
//! Records map a hashed `Idempotency-Key` to the booking it created. The
//! reserve step is atomic so concurrent duplicates cannot both create.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::{BookingId, KeyHash, PayloadHash, Reservation};

use super::define_port_error;

define_port_error! {
    /// Errors raised by idempotency store adapters.
    pub enum IdempotencyStoreError {
        /// Store connection could not be established.
        Connection { message: String } => "idempotency store connection failed: {message}",
        /// Query or mutation failed during execution.
        Query { message: String } => "idempotency store query failed: {message}",
        /// The store did not answer in time.
        Timeout => "idempotency store timed out",
    }
}

/// Port for reserve-or-fetch idempotency records.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait IdempotencyStore: Send + Sync {
    /// Reserve `key_hash` for the caller, or report the existing record.
    ///
    /// Returns:
    /// - [`Reservation::Reserved`] when no live record exists. An expired
    ///   record is taken over.
    /// - [`Reservation::Completed`] when a booking was already created.
    /// - [`Reservation::InFlight`] when another request holds the key.
    async fn reserve(
        &self,
        key_hash: &KeyHash,
        payload_hash: &PayloadHash,
        now: DateTime<Utc>,
        expires_at: DateTime<Utc>,
    ) -> Result<Reservation, IdempotencyStoreError>;

    /// Record the created booking and extend the record to `expires_at`.
    async fn complete(
        &self,
        key_hash: &KeyHash,
        booking_id: BookingId,
        expires_at: DateTime<Utc>,
    ) -> Result<(), IdempotencyStoreError>;

    /// Drop a reservation that never completed.
    async fn release(&self, key_hash: &KeyHash) -> Result<(), IdempotencyStoreError>;

    /// Delete records that expired before `now`.
    async fn delete_expired(&self, now: DateTime<Utc>) -> Result<u64, IdempotencyStoreError>;
}

/// Fixture store that reserves every key and remembers nothing.
#[derive(Debug, Default)]
pub struct FixtureIdempotencyStore;

#[async_trait]
impl IdempotencyStore for FixtureIdempotencyStore {
    async fn reserve(
        &self,
        _key_hash: &KeyHash,
        _payload_hash: &PayloadHash,
        _now: DateTime<Utc>,
        _expires_at: DateTime<Utc>,
    ) -> Result<Reservation, IdempotencyStoreError> {
        Ok(Reservation::Reserved)
    }

    async fn complete(
        &self,
        _key_hash: &KeyHash,
        _booking_id: BookingId,
        _expires_at: DateTime<Utc>,
    ) -> Result<(), IdempotencyStoreError> {
        Ok(())
    }

    async fn release(&self, _key_hash: &KeyHash) -> Result<(), IdempotencyStoreError> {
        Ok(())
    }

    async fn delete_expired(&self, _now: DateTime<Utc>) -> Result<u64, IdempotencyStoreError> {
        Ok(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::canonicalize_and_hash;
    use serde_json::json;

    #[tokio::test]
    async fn fixture_store_always_reserves() {
        let store = FixtureIdempotencyStore;
        let outcome = store
            .reserve(
                &KeyHash::of("checkout-1"),
                &canonicalize_and_hash(&json!({"pickup": "A"})),
                Utc::now(),
                Utc::now(),
            )
            .await
            .expect("fixture reserve should succeed");
        assert_eq!(outcome, Reservation::Reserved);
    }
}
