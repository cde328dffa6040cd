//! Port abstraction for booking persistence.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::{
    Booking, BookingChanges, BookingId, BookingListQuery, BookingOwner, ManageToken, NewBooking,
};

use super::define_port_error;

define_port_error! {
    /// Errors raised by booking repository adapters.
    pub enum BookingRepositoryError {
        /// Repository connection could not be established.
        Connection { message: String } => "booking repository connection failed: {message}",
        /// Query or mutation failed during execution.
        Query { message: String } => "booking repository query failed: {message}",
        /// The repository did not answer in time.
        Timeout => "booking repository timed out",
    }
}

/// Port for booking storage.
///
/// Mutations are single conditional statements; callers rely on their
/// return values rather than on read-then-write sequences.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait BookingRepository: Send + Sync {
    /// Insert a pending booking and return the stored row.
    async fn insert(
        &self,
        booking: &NewBooking,
        now: DateTime<Utc>,
    ) -> Result<Booking, BookingRepositoryError>;

    /// Booking by id.
    async fn find_by_id(&self, id: BookingId) -> Result<Option<Booking>, BookingRepositoryError>;

    /// Booking by id whose manage token matches.
    async fn find_by_id_and_token(
        &self,
        id: BookingId,
        token: &ManageToken,
    ) -> Result<Option<Booking>, BookingRepositoryError>;

    /// Apply `changes` if the booking is open and its reschedule count still
    /// equals `expected_reschedule_count`.
    ///
    /// Returns the updated row, or `None` when the guard did not match.
    async fn apply_changes(
        &self,
        id: BookingId,
        changes: &BookingChanges,
        expected_reschedule_count: i32,
        now: DateTime<Utc>,
    ) -> Result<Option<Booking>, BookingRepositoryError>;

    /// Move an open booking to `canceled`. Returns whether a row changed.
    async fn cancel(&self, id: BookingId, now: DateTime<Utc>) -> Result<bool, BookingRepositoryError>;

    /// Bookings of `owner`, newest first.
    async fn list(
        &self,
        owner: &BookingOwner,
        query: &BookingListQuery,
    ) -> Result<Vec<Booking>, BookingRepositoryError>;
}
