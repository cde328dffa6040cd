//! Internal Diesel row structs for database operations.
//!
//! These types are implementation details of the persistence layer and must
//! never be exposed to the domain.

use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel::sql_types::Integer;

use super::schema::{booking_idempotency, bookings, guest_access_codes, users};

// ---------------------------------------------------------------------------
// Rate limit models
// ---------------------------------------------------------------------------

/// Count returned by the rate-limit upsert.
#[derive(Debug, QueryableByName)]
pub(crate) struct CounterRow {
    #[diesel(sql_type = Integer)]
    pub count: i32,
}

// ---------------------------------------------------------------------------
// Idempotency models
// ---------------------------------------------------------------------------

/// Existing idempotency record.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = booking_idempotency)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct IdempotencyRow {
    pub payload_hash: Vec<u8>,
    pub booking_id: Option<i64>,
}

// ---------------------------------------------------------------------------
// Guest access models
// ---------------------------------------------------------------------------

/// Row struct for reading from the guest_access_codes table.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = guest_access_codes)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct GuestAccessCodeRow {
    pub id: i64,
    pub email: String,
    pub code_hash: String,
    pub token: String,
    pub expires_at: DateTime<Utc>,
    pub used_at: Option<DateTime<Utc>>,
    pub attempts: i32,
    pub created_at: DateTime<Utc>,
}

/// Insertable struct for new access codes.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = guest_access_codes)]
pub(crate) struct NewGuestAccessCodeRow<'a> {
    pub email: &'a str,
    pub code_hash: &'a str,
    pub token: &'a str,
    pub expires_at: DateTime<Utc>,
    pub ip_created: Option<String>,
}

// ---------------------------------------------------------------------------
// Booking models
// ---------------------------------------------------------------------------

/// Row struct for reading from the bookings table.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = bookings)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct BookingRow {
    pub id: i64,
    pub manage_token: String,
    pub status: String,
    pub rider_name: String,
    pub rider_email: String,
    pub rider_phone: String,
    pub pickup: String,
    pub dropoff: String,
    pub scheduled_at: DateTime<Utc>,
    pub notes: Option<String>,
    pub passengers: i32,
    pub luggages: i32,
    pub ride_type: String,
    pub user_id: Option<i64>,
    pub driver_id: Option<i64>,
    pub reschedule_count: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Insertable struct for new bookings.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = bookings)]
pub(crate) struct NewBookingRow<'a> {
    pub manage_token: &'a str,
    pub status: &'a str,
    pub rider_name: &'a str,
    pub rider_email: &'a str,
    pub rider_phone: &'a str,
    pub pickup: &'a str,
    pub dropoff: &'a str,
    pub scheduled_at: DateTime<Utc>,
    pub notes: Option<&'a str>,
    pub passengers: i32,
    pub luggages: i32,
    pub ride_type: &'a str,
    pub user_id: Option<i64>,
    pub reschedule_count: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Changeset for partial booking updates. `None` leaves a column untouched.
#[derive(Debug, Clone, AsChangeset)]
#[diesel(table_name = bookings)]
pub(crate) struct BookingChangeset<'a> {
    pub rider_name: Option<&'a str>,
    pub rider_phone: Option<&'a str>,
    pub pickup: Option<&'a str>,
    pub dropoff: Option<&'a str>,
    pub scheduled_at: Option<DateTime<Utc>>,
    pub notes: Option<&'a str>,
    pub passengers: Option<i32>,
    pub luggages: Option<i32>,
    pub ride_type: Option<&'a str>,
    pub updated_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// User models
// ---------------------------------------------------------------------------

/// Row struct for reading from the users table.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = users)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct UserRow {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub role: String,
}
