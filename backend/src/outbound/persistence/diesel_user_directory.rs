//! PostgreSQL-backed `UserDirectory` over the accounts table.

use async_trait::async_trait;
use diesel::prelude::*;
use diesel_async::RunQueryDsl;

use crate::domain::ports::{UserDirectory, UserDirectoryError};
use crate::domain::{RegisteredUser, Role, UserId};

use super::diesel_helpers::{
    lower, map_basic_diesel_error, map_basic_pool_error, with_query_timeout,
};
use super::models::UserRow;
use super::pool::{DbPool, PoolError};
use super::schema::users;

/// Diesel-backed account lookups.
#[derive(Clone)]
pub struct DieselUserDirectory {
    pool: DbPool,
}

impl DieselUserDirectory {
    /// Create a new directory with the given connection pool.
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn map_pool_error(error: PoolError) -> UserDirectoryError {
    map_basic_pool_error(error, UserDirectoryError::connection)
}

fn map_diesel_error(error: diesel::result::Error) -> UserDirectoryError {
    map_basic_diesel_error(
        error,
        UserDirectoryError::query,
        UserDirectoryError::connection,
    )
}

impl TryFrom<UserRow> for RegisteredUser {
    type Error = UserDirectoryError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        let role = row
            .role
            .parse::<Role>()
            .map_err(|err| UserDirectoryError::query(err.to_string()))?;
        Ok(Self {
            id: UserId::new(row.id),
            name: row.name,
            email: row.email.to_lowercase(),
            phone: row.phone,
            role,
        })
    }
}

#[async_trait]
impl UserDirectory for DieselUserDirectory {
    async fn find_by_email(&self, email: &str) -> Result<Option<RegisteredUser>, UserDirectoryError> {
        let call = async {
            let mut conn = self.pool.get().await.map_err(map_pool_error)?;
            let row: Option<UserRow> = users::table
                .filter(lower(users::email).eq(email.to_lowercase()))
                .select(UserRow::as_select())
                .first(&mut conn)
                .await
                .optional()
                .map_err(map_diesel_error)?;
            row.map(RegisteredUser::try_from).transpose()
        };
        with_query_timeout("users.find_by_email", call, UserDirectoryError::timeout).await
    }

    async fn find_by_id(&self, id: UserId) -> Result<Option<RegisteredUser>, UserDirectoryError> {
        let call = async {
            let mut conn = self.pool.get().await.map_err(map_pool_error)?;
            let row: Option<UserRow> = users::table
                .find(id.get())
                .select(UserRow::as_select())
                .first(&mut conn)
                .await
                .optional()
                .map_err(map_diesel_error)?;
            row.map(RegisteredUser::try_from).transpose()
        };
        with_query_timeout("users.find_by_id", call, UserDirectoryError::timeout).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn row(role: &str) -> UserRow {
        UserRow {
            id: 3,
            name: "Grace Hopper".to_owned(),
            email: "Grace@Example.com".to_owned(),
            phone: "+15550002222".to_owned(),
            role: role.to_owned(),
        }
    }

    #[rstest]
    fn row_converts_with_lowercased_email() {
        let user = RegisteredUser::try_from(row("rider")).expect("valid role");
        assert_eq!(user.id, UserId::new(3));
        assert_eq!(user.email, "grace@example.com");
        assert_eq!(user.role, Role::Rider);
    }

    #[rstest]
    fn unknown_role_is_a_query_error() {
        let err = RegisteredUser::try_from(row("driver")).expect_err("unknown role");
        assert!(matches!(err, UserDirectoryError::Query { .. }));
    }
}
