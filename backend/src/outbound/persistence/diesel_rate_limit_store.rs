//! PostgreSQL-backed `RateLimitStore`.
//!
//! A hit is one upsert: a counter whose window started before the floor is
//! reset to one, otherwise it is incremented. Concurrent hits on the same
//! key serialize on the row lock, so no request is lost.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel::sql_types::{Text, Timestamptz};
use diesel_async::RunQueryDsl;
use tracing::debug;

use crate::domain::RateLimitHit;
use crate::domain::ports::{RateLimitStore, RateLimitStoreError};

use super::diesel_helpers::{map_basic_diesel_error, map_basic_pool_error, with_query_timeout};
use super::models::CounterRow;
use super::pool::{DbPool, PoolError};
use super::schema::rate_limits;

const RECORD_HIT_SQL: &str = r"
INSERT INTO rate_limits (key_hash, count, window_start, expires_at)
VALUES ($1, 1, $2, $4)
ON CONFLICT (key_hash) DO UPDATE SET
    count = CASE
        WHEN rate_limits.window_start < $3 THEN 1
        ELSE rate_limits.count + 1
    END,
    window_start = CASE
        WHEN rate_limits.window_start < $3 THEN $2
        ELSE rate_limits.window_start
    END,
    expires_at = $4
RETURNING count
";

/// Diesel-backed rate-limit counters.
#[derive(Clone)]
pub struct DieselRateLimitStore {
    pool: DbPool,
}

impl DieselRateLimitStore {
    /// Create a new store with the given connection pool.
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn map_pool_error(error: PoolError) -> RateLimitStoreError {
    map_basic_pool_error(error, RateLimitStoreError::connection)
}

fn map_diesel_error(error: diesel::result::Error) -> RateLimitStoreError {
    map_basic_diesel_error(
        error,
        RateLimitStoreError::query,
        RateLimitStoreError::connection,
    )
}

#[async_trait]
impl RateLimitStore for DieselRateLimitStore {
    async fn record_hit(&self, hit: &RateLimitHit) -> Result<u32, RateLimitStoreError> {
        let call = async {
            let mut conn = self.pool.get().await.map_err(map_pool_error)?;
            let row: CounterRow = diesel::sql_query(RECORD_HIT_SQL)
                .bind::<Text, _>(hit.key_hash.as_str())
                .bind::<Timestamptz, _>(hit.now)
                .bind::<Timestamptz, _>(hit.window_floor)
                .bind::<Timestamptz, _>(hit.expires_at)
                .get_result(&mut conn)
                .await
                .map_err(map_diesel_error)?;
            u32::try_from(row.count)
                .map_err(|_| RateLimitStoreError::query("negative rate limit counter"))
        };
        with_query_timeout("rate_limit.record_hit", call, RateLimitStoreError::timeout).await
    }

    async fn delete_expired(&self, now: DateTime<Utc>) -> Result<u64, RateLimitStoreError> {
        let call = async {
            let mut conn = self.pool.get().await.map_err(map_pool_error)?;
            let deleted = diesel::delete(rate_limits::table)
                .filter(rate_limits::expires_at.lt(now))
                .execute(&mut conn)
                .await
                .map_err(map_diesel_error)?;
            debug!(deleted, "deleted expired rate limit counters");
            Ok(deleted as u64)
        };
        with_query_timeout(
            "rate_limit.delete_expired",
            call,
            RateLimitStoreError::timeout,
        )
        .await
    }
}
