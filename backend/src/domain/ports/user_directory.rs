//! Port abstraction for registered account lookups.

use async_trait::async_trait;

use crate::domain::{RegisteredUser, UserId};

use super::define_port_error;

define_port_error! {
    /// Errors raised by user directory adapters.
    pub enum UserDirectoryError {
        /// Directory connection could not be established.
        Connection { message: String } => "user directory connection failed: {message}",
        /// Query failed during execution.
        Query { message: String } => "user directory query failed: {message}",
        /// The directory did not answer in time.
        Timeout => "user directory timed out",
    }
}

/// Read-only view of registered accounts.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UserDirectory: Send + Sync {
    /// Account with the given email, compared case-insensitively.
    async fn find_by_email(&self, email: &str) -> Result<Option<RegisteredUser>, UserDirectoryError>;

    /// Account with the given id.
    async fn find_by_id(&self, id: UserId) -> Result<Option<RegisteredUser>, UserDirectoryError>;
}

/// Fixture directory with no accounts.
#[derive(Debug, Default)]
pub struct FixtureUserDirectory;

#[async_trait]
impl UserDirectory for FixtureUserDirectory {
    async fn find_by_email(&self, _email: &str) -> Result<Option<RegisteredUser>, UserDirectoryError> {
        Ok(None)
    }

    async fn find_by_id(&self, _id: UserId) -> Result<Option<RegisteredUser>, UserDirectoryError> {
        Ok(None)
    }
}
