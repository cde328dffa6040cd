//! Shared helpers for the Diesel adapters.
//!
//! Every port error enum in this crate has `Connection`, `Query`, and
//! `Timeout` variants, so the mapping helpers take the matching constructors
//! rather than a concrete error type.

use std::future::Future;
use std::time::Duration;

use diesel::sql_types::Text;
use tracing::debug;

use super::pool::PoolError;

/// Upper bound on a single adapter call, checkout included.
pub const QUERY_TIMEOUT: Duration = Duration::from_secs(3);

diesel::define_sql_function! {
    /// SQL `lower(text)`.
    fn lower(value: Text) -> Text;
}

/// Map pool errors into a repository-specific connection error.
pub fn map_basic_pool_error<E, C>(error: PoolError, connection: C) -> E
where
    C: FnOnce(String) -> E,
{
    connection(error.into_message())
}

/// Map Diesel errors into query or connection errors.
///
/// Only a closed connection is reported as a connection failure; every
/// other variant is a query failure. Driver messages are logged at debug
/// level and not propagated.
pub fn map_basic_diesel_error<E, Q, C>(error: diesel::result::Error, query: Q, connection: C) -> E
where
    Q: FnOnce(&'static str) -> E,
    C: FnOnce(&'static str) -> E,
{
    use diesel::result::{DatabaseErrorKind, Error as DieselError};

    match &error {
        DieselError::DatabaseError(kind, info) => {
            debug!(?kind, message = info.message(), "diesel operation failed");
        }
        _ => debug!(%error, "diesel operation failed"),
    }

    match error {
        DieselError::NotFound => query("record not found"),
        DieselError::QueryBuilderError(_) => query("database query error"),
        DieselError::DatabaseError(DatabaseErrorKind::ClosedConnection, _) => {
            connection("database connection error")
        }
        DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, _) => {
            query("duplicate key")
        }
        _ => query("database error"),
    }
}

/// Run `call` under [`QUERY_TIMEOUT`].
pub async fn with_query_timeout<T, E, F, O>(operation: &'static str, call: F, on_timeout: O) -> Result<T, E>
where
    F: Future<Output = Result<T, E>>,
    O: FnOnce() -> E,
{
    match tokio::time::timeout(QUERY_TIMEOUT, call).await {
        Ok(result) => result,
        Err(_) => {
            debug!(operation, "database call timed out");
            Err(on_timeout())
        }
    }
}
