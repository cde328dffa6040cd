//! Booking aggregate, input validation, and lifecycle policy.
//!
//! Policy constants:
//! - at most [`MAX_RESCHEDULES`] changes to `scheduled_at` per booking;
//! - cancellation only until [`cancellation_cutoff`] before pickup;
//! - `passengers` in [`PASSENGERS`], `luggages` in [`LUGGAGES`].

use std::fmt;
use std::ops::RangeInclusive;
use std::str::FromStr;

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::contact::{is_valid_email, is_valid_phone, normalize_email, normalize_phone};
use super::{Error, PolicyReason, UserId};

/// Maximum number of reschedules per booking.
pub const MAX_RESCHEDULES: i32 = 2;

/// Allowed passenger counts.
pub const PASSENGERS: RangeInclusive<i32> = 1..=8;

/// Allowed luggage counts.
pub const LUGGAGES: RangeInclusive<i32> = 0..=10;

/// Minimum notice before pickup for a rider-initiated cancellation.
pub fn cancellation_cutoff() -> TimeDelta {
    TimeDelta::hours(24)
}

/// Booking identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BookingId(i64);

impl BookingId {
    /// Wrap a stored booking id.
    pub const fn new(id: i64) -> Self {
        Self(id)
    }

    /// Raw database id.
    pub const fn get(self) -> i64 {
        self.0
    }
}

impl fmt::Display for BookingId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Error returned when an enum value is not recognised.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {kind}: {value}")]
pub struct UnknownVariant {
    kind: &'static str,
    value: String,
}

macro_rules! wire_enum {
    (
        $(#[$outer:meta])*
        pub enum $name:ident as $kind:literal {
            $( $(#[$meta:meta])* $variant:ident => $wire:literal ),+ $(,)?
        }
    ) => {
        $(#[$outer])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum $name {
            $( $(#[$meta])* #[serde(rename = $wire)] $variant, )+
        }

        impl $name {
            /// Wire and storage name.
            pub const fn as_str(self) -> &'static str {
                match self {
                    $( Self::$variant => $wire, )+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = UnknownVariant;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $( $wire => Ok(Self::$variant), )+
                    other => Err(UnknownVariant { kind: $kind, value: other.to_owned() }),
                }
            }
        }
    };
}

wire_enum! {
    /// Booking status.
    pub enum BookingStatus as "booking status" {
        /// Created, awaiting confirmation.
        Pending => "pending",
        /// Confirmed by operations.
        Confirmed => "confirmed",
        /// A driver has been assigned.
        Assigned => "assigned",
        /// The trip is under way.
        OnTrip => "on_trip",
        /// The trip finished.
        Completed => "completed",
        /// The booking was canceled.
        Canceled => "canceled",
    }
}

impl BookingStatus {
    /// Terminal statuses admit no further changes.
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Canceled | Self::Completed)
    }
}

wire_enum! {
    /// Pricing model of a ride.
    pub enum RideType as "ride type" {
        /// Single point-to-point ride.
        PerRide => "per_ride",
        /// Chauffeur booked by the hour.
        Hourly => "hourly",
    }
}

/// Per-booking capability secret.
///
/// Possession grants full access to one booking. The value is never logged.
#[derive(Clone, PartialEq, Eq)]
pub struct ManageToken(String);

impl ManageToken {
    /// Generate a fresh random token.
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Wrap a token supplied by a client or loaded from storage.
    pub fn from_string(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// Borrow the token text.
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Debug for ManageToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ManageToken(<redacted>)")
    }
}

/// Validated rider contact details.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RiderContact {
    /// Trimmed rider name.
    pub name: String,
    /// Lowercased email.
    pub email: String,
    /// Normalized phone number.
    pub phone: String,
}

/// Validated trip details.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TripDetails {
    /// Pickup address.
    pub pickup: String,
    /// Drop-off address.
    pub dropoff: String,
    /// Pickup time; strictly in the future at validation.
    pub scheduled_at: DateTime<Utc>,
    /// Optional rider notes.
    pub notes: Option<String>,
    /// Passenger count within [`PASSENGERS`].
    pub passengers: i32,
    /// Luggage count within [`LUGGAGES`].
    pub luggages: i32,
    /// Pricing model.
    pub ride_type: RideType,
}

/// Unvalidated rider contact details.
#[derive(Debug, Clone, Default)]
pub struct ContactDraft {
    /// Rider name.
    pub name: String,
    /// Rider email.
    pub email: String,
    /// Rider phone.
    pub phone: String,
}

/// Unvalidated trip details.
#[derive(Debug, Clone, Default)]
pub struct TripDraft {
    /// Pickup address.
    pub pickup: String,
    /// Drop-off address.
    pub dropoff: String,
    /// Pickup time.
    pub scheduled_at: Option<DateTime<Utc>>,
    /// Optional notes.
    pub notes: Option<String>,
    /// Passenger count.
    pub passengers: i32,
    /// Luggage count.
    pub luggages: i32,
    /// Ride type name.
    pub ride_type: String,
}

fn required(field: &str, value: &str) -> Result<String, Error> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(Error::invalid_field(
            field,
            "required",
            format!("{field} is required"),
        ));
    }
    Ok(trimmed.to_owned())
}

fn optional_text(value: Option<String>) -> Option<String> {
    value
        .map(|text| text.trim().to_owned())
        .filter(|text| !text.is_empty())
}

pub(crate) fn validate_email(raw: &str) -> Result<String, Error> {
    let email = normalize_email(&required("rider_email", raw)?);
    if !is_valid_email(&email) {
        return Err(Error::invalid_field(
            "rider_email",
            "invalid_email",
            "Invalid email format",
        ));
    }
    Ok(email)
}

fn validate_phone(raw: &str) -> Result<String, Error> {
    let phone = normalize_phone(&required("rider_phone", raw)?);
    if !is_valid_phone(&phone) {
        return Err(Error::invalid_field(
            "rider_phone",
            "invalid_phone",
            "Invalid phone number format",
        ));
    }
    Ok(phone)
}

fn validate_passengers(value: i32) -> Result<i32, Error> {
    if PASSENGERS.contains(&value) {
        Ok(value)
    } else {
        Err(Error::invalid_field(
            "passengers",
            "out_of_range",
            "Number of passengers must be between 1 and 8",
        ))
    }
}

fn validate_luggages(value: i32) -> Result<i32, Error> {
    if LUGGAGES.contains(&value) {
        Ok(value)
    } else {
        Err(Error::invalid_field(
            "luggages",
            "out_of_range",
            "Number of luggages must be between 0 and 10",
        ))
    }
}

fn validate_ride_type(raw: &str) -> Result<RideType, Error> {
    raw.trim().parse().map_err(|_| {
        Error::invalid_field(
            "ride_type",
            "invalid_ride_type",
            "Ride type must be 'per_ride' or 'hourly'",
        )
    })
}

fn validate_schedule(at: DateTime<Utc>, now: DateTime<Utc>) -> Result<DateTime<Utc>, Error> {
    if at <= now {
        return Err(Error::invalid_field(
            "scheduled_at",
            "past_datetime",
            "Scheduled time must be in the future",
        ));
    }
    Ok(at)
}

impl ContactDraft {
    /// Normalize and validate the contact details.
    pub fn validate(self) -> Result<RiderContact, Error> {
        Ok(RiderContact {
            name: required("rider_name", &self.name)?,
            email: validate_email(&self.email)?,
            phone: validate_phone(&self.phone)?,
        })
    }
}

impl TripDraft {
    /// Normalize and validate the trip details against `now`.
    pub fn validate(self, now: DateTime<Utc>) -> Result<TripDetails, Error> {
        let pickup = required("pickup", &self.pickup)?;
        let dropoff = required("dropoff", &self.dropoff)?;
        let scheduled_at = self.scheduled_at.ok_or_else(|| {
            Error::invalid_field("scheduled_at", "required", "scheduled_at is required")
        })?;
        Ok(TripDetails {
            pickup,
            dropoff,
            scheduled_at: validate_schedule(scheduled_at, now)?,
            notes: optional_text(self.notes),
            passengers: validate_passengers(self.passengers)?,
            luggages: validate_luggages(self.luggages)?,
            ride_type: validate_ride_type(&self.ride_type)?,
        })
    }
}

/// Booking ready to be inserted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewBooking {
    /// Rider contact details.
    pub contact: RiderContact,
    /// Trip details.
    pub trip: TripDetails,
    /// Owning account for rider bookings.
    pub user_id: Option<UserId>,
    /// Capability secret assigned at creation.
    pub manage_token: ManageToken,
}

/// Stored booking.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Booking {
    /// Booking id.
    pub id: BookingId,
    /// Capability secret.
    pub manage_token: ManageToken,
    /// Current status.
    pub status: BookingStatus,
    /// Rider name.
    pub rider_name: String,
    /// Rider email, lowercased.
    pub rider_email: String,
    /// Rider phone.
    pub rider_phone: String,
    /// Pickup address.
    pub pickup: String,
    /// Drop-off address.
    pub dropoff: String,
    /// Pickup time.
    pub scheduled_at: DateTime<Utc>,
    /// Rider notes.
    pub notes: Option<String>,
    /// Passenger count.
    pub passengers: i32,
    /// Luggage count.
    pub luggages: i32,
    /// Pricing model.
    pub ride_type: RideType,
    /// Owning account, when booked by a rider.
    pub user_id: Option<UserId>,
    /// Assigned driver, if any.
    pub driver_id: Option<i64>,
    /// Number of times `scheduled_at` changed.
    pub reschedule_count: i32,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Last modification time.
    pub updated_at: DateTime<Utc>,
}

impl Booking {
    /// Reason a reschedule would be refused, if any.
    pub fn reschedule_refusal(&self) -> Option<PolicyReason> {
        if self.status.is_terminal() {
            Some(PolicyReason::BookingClosed)
        } else if self.reschedule_count >= MAX_RESCHEDULES {
            Some(PolicyReason::RescheduleLimitReached)
        } else {
            None
        }
    }

    /// Whether `scheduled_at` may still change.
    pub fn can_reschedule(&self) -> bool {
        self.reschedule_refusal().is_none()
    }

    /// Reason a rider cancellation at `now` would be refused, if any.
    pub fn cancel_refusal(&self, now: DateTime<Utc>) -> Option<PolicyReason> {
        if self.status.is_terminal() {
            Some(PolicyReason::BookingClosed)
        } else if now >= self.scheduled_at - cancellation_cutoff() {
            Some(PolicyReason::CancellationCutoff)
        } else {
            None
        }
    }

    /// Whether a rider may cancel at `now`.
    pub fn can_cancel(&self, now: DateTime<Utc>) -> bool {
        self.cancel_refusal(now).is_none()
    }
}

/// Partial update supplied by a caller.
#[derive(Debug, Clone, Default)]
pub struct BookingPatch {
    /// New rider name.
    pub rider_name: Option<String>,
    /// New rider phone.
    pub rider_phone: Option<String>,
    /// New pickup address.
    pub pickup: Option<String>,
    /// New drop-off address.
    pub dropoff: Option<String>,
    /// New pickup time.
    pub scheduled_at: Option<DateTime<Utc>>,
    /// New notes.
    pub notes: Option<String>,
    /// New passenger count.
    pub passengers: Option<i32>,
    /// New luggage count.
    pub luggages: Option<i32>,
    /// New ride type name.
    pub ride_type: Option<String>,
}

/// Validated changes to persist. `None` fields keep their stored value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BookingChanges {
    /// New rider name.
    pub rider_name: Option<String>,
    /// New rider phone.
    pub rider_phone: Option<String>,
    /// New pickup address.
    pub pickup: Option<String>,
    /// New drop-off address.
    pub dropoff: Option<String>,
    /// New pickup time.
    pub scheduled_at: Option<DateTime<Utc>>,
    /// New notes.
    pub notes: Option<String>,
    /// New passenger count.
    pub passengers: Option<i32>,
    /// New luggage count.
    pub luggages: Option<i32>,
    /// New ride type.
    pub ride_type: Option<RideType>,
    /// Whether this update counts as a reschedule.
    pub reschedules: bool,
}

impl BookingChanges {
    /// Names of the fields this update changes relative to `current`.
    ///
    /// # Examples
    /// ```no_run
    /// # use ridebook::domain::{Booking, BookingChanges};
    /// # fn demo(current: &Booking) {
    /// let changes = BookingChanges { notes: Some("gate 4".into()), ..Default::default() };
    /// assert_eq!(changes.changed_fields(current), vec!["notes"]);
    /// # }
    /// ```
    pub fn changed_fields(&self, current: &Booking) -> Vec<&'static str> {
        let mut fields = Vec::new();
        let mut note = |name: &'static str, changed: bool| {
            if changed {
                fields.push(name);
            }
        };
        note(
            "rider_name",
            self.rider_name.as_ref().is_some_and(|v| *v != current.rider_name),
        );
        note(
            "rider_phone",
            self.rider_phone.as_ref().is_some_and(|v| *v != current.rider_phone),
        );
        note("pickup", self.pickup.as_ref().is_some_and(|v| *v != current.pickup));
        note("dropoff", self.dropoff.as_ref().is_some_and(|v| *v != current.dropoff));
        note(
            "scheduled_at",
            self.scheduled_at.is_some_and(|v| v != current.scheduled_at),
        );
        note(
            "notes",
            self.notes.as_ref().is_some_and(|v| Some(v) != current.notes.as_ref()),
        );
        note(
            "passengers",
            self.passengers.is_some_and(|v| v != current.passengers),
        );
        note("luggages", self.luggages.is_some_and(|v| v != current.luggages));
        note("ride_type", self.ride_type.is_some_and(|v| v != current.ride_type));
        fields
    }
}

impl BookingPatch {
    /// Validate present fields and apply the reschedule policy against
    /// `current`.
    ///
    /// A `scheduled_at` equal to the stored value is not a reschedule.
    pub fn validate(self, current: &Booking, now: DateTime<Utc>) -> Result<BookingChanges, Error> {
        if current.status.is_terminal() {
            return Err(Error::policy(
                PolicyReason::BookingClosed,
                "Booking can no longer be modified",
            ));
        }

        let scheduled_at = match self.scheduled_at {
            Some(at) if at != current.scheduled_at => {
                if let Some(reason) = current.reschedule_refusal() {
                    return Err(Error::policy(
                        reason,
                        "Booking cannot be rescheduled: maximum reschedules reached",
                    ));
                }
                Some(validate_schedule(at, now)?)
            }
            _ => None,
        };

        Ok(BookingChanges {
            rider_name: self
                .rider_name
                .map(|name| required("rider_name", &name))
                .transpose()?,
            rider_phone: self
                .rider_phone
                .map(|phone| validate_phone(&phone))
                .transpose()?,
            pickup: self.pickup.map(|v| required("pickup", &v)).transpose()?,
            dropoff: self.dropoff.map(|v| required("dropoff", &v)).transpose()?,
            reschedules: scheduled_at.is_some(),
            scheduled_at,
            notes: self.notes.map(|text| text.trim().to_owned()),
            passengers: self.passengers.map(validate_passengers).transpose()?,
            luggages: self.luggages.map(validate_luggages).transpose()?,
            ride_type: self
                .ride_type
                .map(|raw| validate_ride_type(&raw))
                .transpose()?,
        })
    }
}

/// Whose bookings a listing returns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BookingOwner {
    /// Bookings whose rider email matches, case-insensitively.
    Email(String),
    /// Bookings linked to an account.
    User(UserId),
}

/// Default page size for booking listings.
pub const DEFAULT_PAGE_SIZE: i64 = 20;
/// Largest page size for booking listings.
pub const MAX_PAGE_SIZE: i64 = 100;

/// Pagination and filtering for booking listings.
///
/// # Examples
/// ```
/// use ridebook::domain::BookingListQuery;
///
/// let query = BookingListQuery::new(None, Some(500), Some(-3));
/// assert_eq!(query.limit(), 100);
/// assert_eq!(query.offset(), 0);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BookingListQuery {
    status: Option<BookingStatus>,
    limit: i64,
    offset: i64,
}

impl BookingListQuery {
    /// Build a query, clamping the limit to `1..=MAX_PAGE_SIZE` and replacing
    /// a negative offset with zero.
    pub fn new(status: Option<BookingStatus>, limit: Option<i64>, offset: Option<i64>) -> Self {
        let limit = limit.map_or(DEFAULT_PAGE_SIZE, |value| value.clamp(1, MAX_PAGE_SIZE));
        let offset = offset.filter(|value| *value >= 0).unwrap_or(0);
        Self {
            status,
            limit,
            offset,
        }
    }

    /// Optional status filter.
    pub fn status(&self) -> Option<BookingStatus> {
        self.status
    }

    /// Page size.
    pub fn limit(&self) -> i64 {
        self.limit
    }

    /// Rows to skip.
    pub fn offset(&self) -> i64 {
        self.offset
    }
}

impl Default for BookingListQuery {
    fn default() -> Self {
        Self::new(None, None, None)
    }
}
