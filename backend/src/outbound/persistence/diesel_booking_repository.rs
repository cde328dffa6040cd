//! PostgreSQL-backed `BookingRepository`.
//!
//! Patches and cancellations are single guarded `UPDATE` statements. A
//! patch matches only while the reschedule count is unchanged and the
//! booking is open; a cancel matches only while the booking is open.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel_async::RunQueryDsl;

use crate::domain::ports::{BookingRepository, BookingRepositoryError};
use crate::domain::{
    Booking, BookingChanges, BookingId, BookingListQuery, BookingOwner, BookingStatus,
    ManageToken, NewBooking, RideType, UserId,
};

use super::diesel_helpers::{
    lower, map_basic_diesel_error, map_basic_pool_error, with_query_timeout,
};
use super::models::{BookingChangeset, BookingRow, NewBookingRow};
use super::pool::{DbPool, PoolError};
use super::schema::bookings;

const CLOSED_STATUSES: [&str; 2] = [
    BookingStatus::Completed.as_str(),
    BookingStatus::Canceled.as_str(),
];

/// Diesel-backed booking storage.
#[derive(Clone)]
pub struct DieselBookingRepository {
    pool: DbPool,
}

impl DieselBookingRepository {
    /// Create a new repository with the given connection pool.
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn map_pool_error(error: PoolError) -> BookingRepositoryError {
    map_basic_pool_error(error, BookingRepositoryError::connection)
}

fn map_diesel_error(error: diesel::result::Error) -> BookingRepositoryError {
    map_basic_diesel_error(
        error,
        BookingRepositoryError::query,
        BookingRepositoryError::connection,
    )
}

impl TryFrom<BookingRow> for Booking {
    type Error = BookingRepositoryError;

    fn try_from(row: BookingRow) -> Result<Self, Self::Error> {
        let status = row
            .status
            .parse::<BookingStatus>()
            .map_err(|err| BookingRepositoryError::query(err.to_string()))?;
        let ride_type = row
            .ride_type
            .parse::<RideType>()
            .map_err(|err| BookingRepositoryError::query(err.to_string()))?;
        Ok(Self {
            id: BookingId::new(row.id),
            manage_token: ManageToken::from_string(row.manage_token),
            status,
            rider_name: row.rider_name,
            rider_email: row.rider_email,
            rider_phone: row.rider_phone,
            pickup: row.pickup,
            dropoff: row.dropoff,
            scheduled_at: row.scheduled_at,
            notes: row.notes,
            passengers: row.passengers,
            luggages: row.luggages,
            ride_type,
            user_id: row.user_id.map(UserId::new),
            driver_id: row.driver_id,
            reschedule_count: row.reschedule_count,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

fn changeset(changes: &BookingChanges, now: DateTime<Utc>) -> BookingChangeset<'_> {
    BookingChangeset {
        rider_name: changes.rider_name.as_deref(),
        rider_phone: changes.rider_phone.as_deref(),
        pickup: changes.pickup.as_deref(),
        dropoff: changes.dropoff.as_deref(),
        scheduled_at: changes.scheduled_at,
        notes: changes.notes.as_deref(),
        passengers: changes.passengers,
        luggages: changes.luggages,
        ride_type: changes.ride_type.map(RideType::as_str),
        updated_at: now,
    }
}

#[async_trait]
impl BookingRepository for DieselBookingRepository {
    async fn insert(
        &self,
        booking: &NewBooking,
        now: DateTime<Utc>,
    ) -> Result<Booking, BookingRepositoryError> {
        let call = async {
            let mut conn = self.pool.get().await.map_err(map_pool_error)?;
            let row = NewBookingRow {
                manage_token: booking.manage_token.as_str(),
                status: BookingStatus::Pending.as_str(),
                rider_name: &booking.contact.name,
                rider_email: &booking.contact.email,
                rider_phone: &booking.contact.phone,
                pickup: &booking.trip.pickup,
                dropoff: &booking.trip.dropoff,
                scheduled_at: booking.trip.scheduled_at,
                notes: booking.trip.notes.as_deref(),
                passengers: booking.trip.passengers,
                luggages: booking.trip.luggages,
                ride_type: booking.trip.ride_type.as_str(),
                user_id: booking.user_id.map(UserId::get),
                reschedule_count: 0,
                created_at: now,
                updated_at: now,
            };
            let stored: BookingRow = diesel::insert_into(bookings::table)
                .values(&row)
                .returning(BookingRow::as_returning())
                .get_result(&mut conn)
                .await
                .map_err(map_diesel_error)?;
            Booking::try_from(stored)
        };
        with_query_timeout("bookings.insert", call, BookingRepositoryError::timeout).await
    }

    async fn find_by_id(&self, id: BookingId) -> Result<Option<Booking>, BookingRepositoryError> {
        let call = async {
            let mut conn = self.pool.get().await.map_err(map_pool_error)?;
            let row: Option<BookingRow> = bookings::table
                .find(id.get())
                .select(BookingRow::as_select())
                .first(&mut conn)
                .await
                .optional()
                .map_err(map_diesel_error)?;
            row.map(Booking::try_from).transpose()
        };
        with_query_timeout("bookings.find_by_id", call, BookingRepositoryError::timeout).await
    }

    async fn find_by_id_and_token(
        &self,
        id: BookingId,
        token: &ManageToken,
    ) -> Result<Option<Booking>, BookingRepositoryError> {
        let call = async {
            let mut conn = self.pool.get().await.map_err(map_pool_error)?;
            let row: Option<BookingRow> = bookings::table
                .find(id.get())
                .filter(bookings::manage_token.eq(token.as_str()))
                .select(BookingRow::as_select())
                .first(&mut conn)
                .await
                .optional()
                .map_err(map_diesel_error)?;
            row.map(Booking::try_from).transpose()
        };
        with_query_timeout(
            "bookings.find_by_id_and_token",
            call,
            BookingRepositoryError::timeout,
        )
        .await
    }

    async fn apply_changes(
        &self,
        id: BookingId,
        changes: &BookingChanges,
        expected_reschedule_count: i32,
        now: DateTime<Utc>,
    ) -> Result<Option<Booking>, BookingRepositoryError> {
        let call = async {
            let mut conn = self.pool.get().await.map_err(map_pool_error)?;
            let step = i32::from(changes.reschedules);
            let row: Option<BookingRow> = diesel::update(bookings::table.find(id.get()))
                .filter(bookings::reschedule_count.eq(expected_reschedule_count))
                .filter(bookings::status.ne_all(CLOSED_STATUSES))
                .set((
                    changeset(changes, now),
                    bookings::reschedule_count.eq(bookings::reschedule_count + step),
                ))
                .returning(BookingRow::as_returning())
                .get_result(&mut conn)
                .await
                .optional()
                .map_err(map_diesel_error)?;
            row.map(Booking::try_from).transpose()
        };
        with_query_timeout(
            "bookings.apply_changes",
            call,
            BookingRepositoryError::timeout,
        )
        .await
    }

    async fn cancel(&self, id: BookingId, now: DateTime<Utc>) -> Result<bool, BookingRepositoryError> {
        let call = async {
            let mut conn = self.pool.get().await.map_err(map_pool_error)?;
            let updated = diesel::update(bookings::table.find(id.get()))
                .filter(bookings::status.ne_all(CLOSED_STATUSES))
                .set((
                    bookings::status.eq(BookingStatus::Canceled.as_str()),
                    bookings::updated_at.eq(now),
                ))
                .execute(&mut conn)
                .await
                .map_err(map_diesel_error)?;
            Ok(updated == 1)
        };
        with_query_timeout("bookings.cancel", call, BookingRepositoryError::timeout).await
    }

    async fn list(
        &self,
        owner: &BookingOwner,
        query: &BookingListQuery,
    ) -> Result<Vec<Booking>, BookingRepositoryError> {
        let call = async {
            let mut conn = self.pool.get().await.map_err(map_pool_error)?;
            let mut statement = bookings::table
                .select(BookingRow::as_select())
                .order((bookings::created_at.desc(), bookings::id.desc()))
                .into_boxed();

            statement = match owner {
                BookingOwner::Email(email) => {
                    statement.filter(lower(bookings::rider_email).eq(email.to_lowercase()))
                }
                BookingOwner::User(user_id) => {
                    statement.filter(bookings::user_id.eq(Some(user_id.get())))
                }
            };
            if let Some(status) = query.status() {
                statement = statement.filter(bookings::status.eq(status.as_str()));
            }

            let rows = statement
                .limit(query.limit())
                .offset(query.offset())
                .load::<BookingRow>(&mut conn)
                .await
                .map_err(map_diesel_error)?;
            rows.into_iter().map(Booking::try_from).collect()
        };
        with_query_timeout("bookings.list", call, BookingRepositoryError::timeout).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rstest::rstest;

    fn row(status: &str, ride_type: &str) -> BookingRow {
        let at = Utc
            .with_ymd_and_hms(2026, 3, 4, 9, 0, 0)
            .single()
            .expect("valid timestamp");
        BookingRow {
            id: 11,
            manage_token: "mt-11".to_owned(),
            status: status.to_owned(),
            rider_name: "Ada".to_owned(),
            rider_email: "ada@example.com".to_owned(),
            rider_phone: "+15550001111".to_owned(),
            pickup: "Airport".to_owned(),
            dropoff: "Harbour".to_owned(),
            scheduled_at: at,
            notes: None,
            passengers: 2,
            luggages: 1,
            ride_type: ride_type.to_owned(),
            user_id: Some(4),
            driver_id: None,
            reschedule_count: 1,
            created_at: at,
            updated_at: at,
        }
    }

    #[rstest]
    fn row_converts_to_booking() {
        let booking = Booking::try_from(row("on_trip", "hourly")).expect("valid row");
        assert_eq!(booking.id, BookingId::new(11));
        assert_eq!(booking.status, BookingStatus::OnTrip);
        assert_eq!(booking.ride_type, RideType::Hourly);
        assert_eq!(booking.user_id, Some(UserId::new(4)));
        assert_eq!(booking.manage_token.as_str(), "mt-11");
    }

    #[rstest]
    #[case("archived", "per_ride")]
    #[case("pending", "shuttle")]
    fn unknown_names_are_query_errors(#[case] status: &str, #[case] ride_type: &str) {
        let err = Booking::try_from(row(status, ride_type)).expect_err("unknown name");
        assert!(matches!(err, BookingRepositoryError::Query { .. }));
    }

    #[rstest]
    fn changeset_leaves_absent_fields_untouched() {
        let now = Utc::now();
        let changes = BookingChanges {
            notes: Some("Gate 4".to_owned()),
            ride_type: Some(RideType::Hourly),
            ..BookingChanges::default()
        };
        let set = changeset(&changes, now);
        assert_eq!(set.notes, Some("Gate 4"));
        assert_eq!(set.ride_type, Some("hourly"));
        assert_eq!(set.pickup, None);
        assert_eq!(set.scheduled_at, None);
        assert_eq!(set.updated_at, now);
    }
}
