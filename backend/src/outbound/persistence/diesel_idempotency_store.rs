//! PostgreSQL-backed `IdempotencyStore` for guest booking creation.
//!
//! Reservation is an insert that takes over an expired row and leaves a live
//! one alone. When the insert changes nothing, the live row is read back to
//! tell a completed booking from an in-flight request.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel::sql_types::{Bytea, Text, Timestamptz};
use diesel_async::RunQueryDsl;
use tracing::debug;

use crate::domain::ports::{IdempotencyStore, IdempotencyStoreError};
use crate::domain::{BookingId, KeyHash, PayloadHash, Reservation};

use super::diesel_helpers::{map_basic_diesel_error, map_basic_pool_error, with_query_timeout};
use super::models::IdempotencyRow;
use super::pool::{DbPool, PoolError};
use super::schema::booking_idempotency;

const RESERVE_SQL: &str = r"
INSERT INTO booking_idempotency (key_hash, payload_hash, booking_id, expires_at, created_at)
VALUES ($1, $2, NULL, $4, $3)
ON CONFLICT (key_hash) DO UPDATE SET
    payload_hash = EXCLUDED.payload_hash,
    booking_id = NULL,
    expires_at = EXCLUDED.expires_at,
    created_at = EXCLUDED.created_at
WHERE booking_idempotency.expires_at <= $3
";

/// Diesel-backed idempotency records.
#[derive(Clone)]
pub struct DieselIdempotencyStore {
    pool: DbPool,
}

impl DieselIdempotencyStore {
    /// Create a new store with the given connection pool.
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn map_pool_error(error: PoolError) -> IdempotencyStoreError {
    map_basic_pool_error(error, IdempotencyStoreError::connection)
}

fn map_diesel_error(error: diesel::result::Error) -> IdempotencyStoreError {
    map_basic_diesel_error(
        error,
        IdempotencyStoreError::query,
        IdempotencyStoreError::connection,
    )
}

/// Interpret a live record that blocked a reservation.
fn existing_to_reservation(row: IdempotencyRow) -> Result<Reservation, IdempotencyStoreError> {
    let Some(booking_id) = row.booking_id else {
        return Ok(Reservation::InFlight);
    };
    let payload_hash = PayloadHash::try_from_bytes(&row.payload_hash).map_err(|err| {
        IdempotencyStoreError::query(format!("corrupted payload hash in database: {err}"))
    })?;
    Ok(Reservation::Completed {
        booking_id: BookingId::new(booking_id),
        payload_hash,
    })
}

#[async_trait]
impl IdempotencyStore for DieselIdempotencyStore {
    async fn reserve(
        &self,
        key_hash: &KeyHash,
        payload_hash: &PayloadHash,
        now: DateTime<Utc>,
        expires_at: DateTime<Utc>,
    ) -> Result<Reservation, IdempotencyStoreError> {
        let call = async {
            let mut conn = self.pool.get().await.map_err(map_pool_error)?;
            let inserted = diesel::sql_query(RESERVE_SQL)
                .bind::<Text, _>(key_hash.as_str())
                .bind::<Bytea, _>(payload_hash.as_bytes().as_slice())
                .bind::<Timestamptz, _>(now)
                .bind::<Timestamptz, _>(expires_at)
                .execute(&mut conn)
                .await
                .map_err(map_diesel_error)?;
            if inserted == 1 {
                return Ok(Reservation::Reserved);
            }

            let existing: Option<IdempotencyRow> = booking_idempotency::table
                .filter(booking_idempotency::key_hash.eq(key_hash.as_str()))
                .select(IdempotencyRow::as_select())
                .first(&mut conn)
                .await
                .optional()
                .map_err(map_diesel_error)?;
            // A row deleted between the two statements belongs to a racing
            // request; report it as in flight rather than reserving twice.
            existing.map_or(Ok(Reservation::InFlight), existing_to_reservation)
        };
        with_query_timeout("idempotency.reserve", call, IdempotencyStoreError::timeout).await
    }

    async fn complete(
        &self,
        key_hash: &KeyHash,
        booking_id: BookingId,
        expires_at: DateTime<Utc>,
    ) -> Result<(), IdempotencyStoreError> {
        let call = async {
            let mut conn = self.pool.get().await.map_err(map_pool_error)?;
            diesel::update(booking_idempotency::table)
                .filter(booking_idempotency::key_hash.eq(key_hash.as_str()))
                .filter(booking_idempotency::booking_id.is_null())
                .set((
                    booking_idempotency::booking_id.eq(Some(booking_id.get())),
                    booking_idempotency::expires_at.eq(expires_at),
                ))
                .execute(&mut conn)
                .await
                .map(|_| ())
                .map_err(map_diesel_error)
        };
        with_query_timeout("idempotency.complete", call, IdempotencyStoreError::timeout).await
    }

    async fn release(&self, key_hash: &KeyHash) -> Result<(), IdempotencyStoreError> {
        let call = async {
            let mut conn = self.pool.get().await.map_err(map_pool_error)?;
            diesel::delete(booking_idempotency::table)
                .filter(booking_idempotency::key_hash.eq(key_hash.as_str()))
                .filter(booking_idempotency::booking_id.is_null())
                .execute(&mut conn)
                .await
                .map(|_| ())
                .map_err(map_diesel_error)
        };
        with_query_timeout("idempotency.release", call, IdempotencyStoreError::timeout).await
    }

    async fn delete_expired(&self, now: DateTime<Utc>) -> Result<u64, IdempotencyStoreError> {
        let call = async {
            let mut conn = self.pool.get().await.map_err(map_pool_error)?;
            let deleted = diesel::delete(booking_idempotency::table)
                .filter(booking_idempotency::expires_at.lt(now))
                .execute(&mut conn)
                .await
                .map_err(map_diesel_error)?;
            debug!(deleted, "deleted expired idempotency records");
            Ok(deleted as u64)
        };
        with_query_timeout(
            "idempotency.delete_expired",
            call,
            IdempotencyStoreError::timeout,
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::canonicalize_and_hash;
    use rstest::rstest;
    use serde_json::json;

    #[rstest]
    fn unfinished_record_is_in_flight() {
        let row = IdempotencyRow {
            payload_hash: vec![0; 32],
            booking_id: None,
        };
        assert_eq!(existing_to_reservation(row), Ok(Reservation::InFlight));
    }

    #[rstest]
    fn finished_record_replays_booking() {
        let hash = canonicalize_and_hash(&json!({"pickup": "Airport"}));
        let row = IdempotencyRow {
            payload_hash: hash.as_bytes().to_vec(),
            booking_id: Some(42),
        };
        assert_eq!(
            existing_to_reservation(row),
            Ok(Reservation::Completed {
                booking_id: BookingId::new(42),
                payload_hash: hash,
            })
        );
    }

    #[rstest]
    fn corrupted_hash_is_a_query_error() {
        let row = IdempotencyRow {
            payload_hash: vec![1, 2, 3],
            booking_id: Some(7),
        };
        assert!(matches!(
            existing_to_reservation(row),
            Err(IdempotencyStoreError::Query { .. })
        ));
    }

    #[rstest]
    fn takeover_only_replaces_expired_rows() {
        assert!(RESERVE_SQL.contains("WHERE booking_idempotency.expires_at <= $3"));
    }
}
