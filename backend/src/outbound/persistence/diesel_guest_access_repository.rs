//! PostgreSQL-backed `GuestAccessRepository`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel_async::RunQueryDsl;
use tracing::debug;

use crate::domain::ports::{GuestAccessRepository, GuestAccessRepositoryError};
use crate::domain::{GuestAccessCode, NewGuestAccessCode};

use super::diesel_helpers::{map_basic_diesel_error, map_basic_pool_error, with_query_timeout};
use super::models::{GuestAccessCodeRow, NewGuestAccessCodeRow};
use super::pool::{DbPool, PoolError};
use super::schema::guest_access_codes;

/// Diesel-backed guest access code storage.
#[derive(Clone)]
pub struct DieselGuestAccessRepository {
    pool: DbPool,
}

impl DieselGuestAccessRepository {
    /// Create a new repository with the given connection pool.
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn map_pool_error(error: PoolError) -> GuestAccessRepositoryError {
    map_basic_pool_error(error, GuestAccessRepositoryError::connection)
}

fn map_diesel_error(error: diesel::result::Error) -> GuestAccessRepositoryError {
    map_basic_diesel_error(
        error,
        GuestAccessRepositoryError::query,
        GuestAccessRepositoryError::connection,
    )
}

fn row_to_code(row: GuestAccessCodeRow) -> GuestAccessCode {
    GuestAccessCode {
        id: row.id,
        email: row.email,
        code_hash: row.code_hash,
        token: row.token,
        expires_at: row.expires_at,
        used_at: row.used_at,
        attempts: row.attempts,
        created_at: row.created_at,
    }
}

#[async_trait]
impl GuestAccessRepository for DieselGuestAccessRepository {
    async fn create(&self, code: &NewGuestAccessCode) -> Result<(), GuestAccessRepositoryError> {
        let call = async {
            let mut conn = self.pool.get().await.map_err(map_pool_error)?;
            let row = NewGuestAccessCodeRow {
                email: &code.email,
                code_hash: &code.code_hash,
                token: &code.token,
                expires_at: code.expires_at,
                ip_created: code.ip_created.map(|ip| ip.to_string()),
            };
            diesel::insert_into(guest_access_codes::table)
                .values(&row)
                .execute(&mut conn)
                .await
                .map(|_| ())
                .map_err(map_diesel_error)
        };
        with_query_timeout(
            "guest_access.create",
            call,
            GuestAccessRepositoryError::timeout,
        )
        .await
    }

    async fn latest_for_email(
        &self,
        email: &str,
    ) -> Result<Option<GuestAccessCode>, GuestAccessRepositoryError> {
        let call = async {
            let mut conn = self.pool.get().await.map_err(map_pool_error)?;
            let row: Option<GuestAccessCodeRow> = guest_access_codes::table
                .filter(guest_access_codes::email.eq(email))
                .order((
                    guest_access_codes::created_at.desc(),
                    guest_access_codes::id.desc(),
                ))
                .select(GuestAccessCodeRow::as_select())
                .first(&mut conn)
                .await
                .optional()
                .map_err(map_diesel_error)?;
            Ok(row.map(row_to_code))
        };
        with_query_timeout(
            "guest_access.latest_for_email",
            call,
            GuestAccessRepositoryError::timeout,
        )
        .await
    }

    async fn find_by_token(
        &self,
        token: &str,
    ) -> Result<Option<GuestAccessCode>, GuestAccessRepositoryError> {
        let call = async {
            let mut conn = self.pool.get().await.map_err(map_pool_error)?;
            let row: Option<GuestAccessCodeRow> = guest_access_codes::table
                .filter(guest_access_codes::token.eq(token))
                .select(GuestAccessCodeRow::as_select())
                .first(&mut conn)
                .await
                .optional()
                .map_err(map_diesel_error)?;
            Ok(row.map(row_to_code))
        };
        with_query_timeout(
            "guest_access.find_by_token",
            call,
            GuestAccessRepositoryError::timeout,
        )
        .await
    }

    async fn record_failed_attempt(&self, id: i64) -> Result<(), GuestAccessRepositoryError> {
        let call = async {
            let mut conn = self.pool.get().await.map_err(map_pool_error)?;
            diesel::update(guest_access_codes::table.find(id))
                .set(guest_access_codes::attempts.eq(guest_access_codes::attempts + 1))
                .execute(&mut conn)
                .await
                .map(|_| ())
                .map_err(map_diesel_error)
        };
        with_query_timeout(
            "guest_access.record_failed_attempt",
            call,
            GuestAccessRepositoryError::timeout,
        )
        .await
    }

    async fn mark_used(
        &self,
        id: i64,
        now: DateTime<Utc>,
    ) -> Result<bool, GuestAccessRepositoryError> {
        let call = async {
            let mut conn = self.pool.get().await.map_err(map_pool_error)?;
            let updated = diesel::update(guest_access_codes::table.find(id))
                .filter(guest_access_codes::used_at.is_null())
                .set(guest_access_codes::used_at.eq(Some(now)))
                .execute(&mut conn)
                .await
                .map_err(map_diesel_error)?;
            Ok(updated == 1)
        };
        with_query_timeout(
            "guest_access.mark_used",
            call,
            GuestAccessRepositoryError::timeout,
        )
        .await
    }

    async fn delete_expired(
        &self,
        cutoff: DateTime<Utc>,
    ) -> Result<u64, GuestAccessRepositoryError> {
        let call = async {
            let mut conn = self.pool.get().await.map_err(map_pool_error)?;
            let deleted = diesel::delete(guest_access_codes::table)
                .filter(guest_access_codes::expires_at.lt(cutoff))
                .execute(&mut conn)
                .await
                .map_err(map_diesel_error)?;
            debug!(deleted, "deleted expired guest access codes");
            Ok(deleted as u64)
        };
        with_query_timeout(
            "guest_access.delete_expired",
            call,
            GuestAccessRepositoryError::timeout,
        )
        .await
    }
}
