//! Request and response bodies shared by the booking handlers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::domain::{
    Booking, BookingListQuery, BookingPatch, BookingStatus, ContactDraft, Error,
    GuestBookingDraft, ManageToken, ResolvedBooking, RideType, TripDraft,
};
use crate::inbound::http::schemas::{BookingStatusSchema, RideTypeSchema};
use crate::inbound::http::validation::{
    FieldName, parse_list_query, parse_optional_rfc3339_timestamp,
};

const SCHEDULED_AT: FieldName = FieldName::new("scheduled_at");

/// Trip fields shared by guest and rider booking requests.
#[derive(Debug, Clone, Default, Deserialize, Serialize, ToSchema)]
pub struct TripBody {
    #[schema(example = "1 Airport Way")]
    #[serde(default)]
    pub pickup: String,
    #[schema(example = "22 Harbour Street")]
    #[serde(default)]
    pub dropoff: String,
    #[schema(format = "date-time", example = "2026-03-04T09:00:00Z")]
    #[serde(default)]
    pub scheduled_at: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    #[schema(minimum = 1, maximum = 8, example = 2)]
    #[serde(default)]
    pub passengers: i32,
    #[schema(minimum = 0, maximum = 10, example = 1)]
    #[serde(default)]
    pub luggages: i32,
    #[schema(example = "per_ride")]
    #[serde(default)]
    pub ride_type: String,
}

impl TryFrom<TripBody> for TripDraft {
    type Error = Error;

    fn try_from(body: TripBody) -> Result<Self, Self::Error> {
        Ok(Self {
            scheduled_at: parse_optional_rfc3339_timestamp(
                body.scheduled_at.as_deref(),
                SCHEDULED_AT,
            )?,
            pickup: body.pickup,
            dropoff: body.dropoff,
            notes: body.notes,
            passengers: body.passengers,
            luggages: body.luggages,
            ride_type: body.ride_type,
        })
    }
}

/// Guest booking request.
#[derive(Debug, Clone, Default, Deserialize, Serialize, ToSchema)]
pub struct GuestBookingRequest {
    #[schema(example = "Ada Lovelace")]
    #[serde(default)]
    pub rider_name: String,
    #[schema(example = "ada@example.com")]
    #[serde(default)]
    pub rider_email: String,
    #[schema(example = "+15550001111")]
    #[serde(default)]
    pub rider_phone: String,
    #[serde(flatten)]
    pub trip: TripBody,
}

impl TryFrom<GuestBookingRequest> for GuestBookingDraft {
    type Error = Error;

    fn try_from(body: GuestBookingRequest) -> Result<Self, Self::Error> {
        Ok(Self {
            contact: ContactDraft {
                name: body.rider_name,
                email: body.rider_email,
                phone: body.rider_phone,
            },
            trip: TripDraft::try_from(body.trip)?,
        })
    }
}

/// Partial booking update. Absent fields keep their stored value.
#[derive(Debug, Clone, Default, Deserialize, Serialize, ToSchema)]
pub struct BookingPatchRequest {
    pub rider_name: Option<String>,
    pub rider_phone: Option<String>,
    pub pickup: Option<String>,
    pub dropoff: Option<String>,
    #[schema(format = "date-time")]
    pub scheduled_at: Option<String>,
    pub notes: Option<String>,
    #[schema(minimum = 1, maximum = 8)]
    pub passengers: Option<i32>,
    #[schema(minimum = 0, maximum = 10)]
    pub luggages: Option<i32>,
    pub ride_type: Option<String>,
}

impl TryFrom<BookingPatchRequest> for BookingPatch {
    type Error = Error;

    fn try_from(body: BookingPatchRequest) -> Result<Self, Self::Error> {
        Ok(Self {
            scheduled_at: parse_optional_rfc3339_timestamp(
                body.scheduled_at.as_deref(),
                SCHEDULED_AT,
            )?,
            rider_name: body.rider_name,
            rider_phone: body.rider_phone,
            pickup: body.pickup,
            dropoff: body.dropoff,
            notes: body.notes,
            passengers: body.passengers,
            luggages: body.luggages,
            ride_type: body.ride_type,
        })
    }
}

/// Response to a guest booking creation.
#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
pub struct GuestBookingCreated {
    pub id: i64,
    /// Secret granting access to this booking; shown only here.
    pub manage_token: String,
    #[schema(value_type = BookingStatusSchema)]
    pub status: BookingStatus,
    pub scheduled_at: DateTime<Utc>,
}

impl From<&Booking> for GuestBookingCreated {
    fn from(booking: &Booking) -> Self {
        Self {
            id: booking.id.get(),
            manage_token: booking.manage_token.as_str().to_owned(),
            status: booking.status,
            scheduled_at: booking.scheduled_at,
        }
    }
}

/// Booking as returned to riders.
///
/// `manage_token` is present only when the caller authenticated with it.
#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
pub struct BookingBody {
    pub id: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub manage_token: Option<String>,
    #[schema(value_type = BookingStatusSchema)]
    pub status: BookingStatus,
    pub rider_name: String,
    pub rider_email: String,
    pub rider_phone: String,
    pub pickup: String,
    pub dropoff: String,
    pub scheduled_at: DateTime<Utc>,
    pub notes: Option<String>,
    pub passengers: i32,
    pub luggages: i32,
    #[schema(value_type = RideTypeSchema)]
    pub ride_type: RideType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub driver_id: Option<i64>,
    pub reschedule_count: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl BookingBody {
    /// Render `booking` without its manage token.
    pub fn redacted(booking: Booking) -> Self {
        Self::render(booking, false)
    }

    fn render(booking: Booking, expose_token: bool) -> Self {
        let Booking {
            id,
            manage_token,
            status,
            rider_name,
            rider_email,
            rider_phone,
            pickup,
            dropoff,
            scheduled_at,
            notes,
            passengers,
            luggages,
            ride_type,
            user_id: _,
            driver_id,
            reschedule_count,
            created_at,
            updated_at,
        } = booking;
        Self {
            id: id.get(),
            manage_token: expose_token.then(|| manage_token.as_str().to_owned()),
            status,
            rider_name,
            rider_email,
            rider_phone,
            pickup,
            dropoff,
            scheduled_at,
            notes,
            passengers,
            luggages,
            ride_type,
            driver_id,
            reschedule_count,
            created_at,
            updated_at,
        }
    }
}

impl From<ResolvedBooking> for BookingBody {
    fn from(resolved: ResolvedBooking) -> Self {
        let expose = resolved.exposes_token();
        Self::render(resolved.booking, expose)
    }
}

/// Query parameters naming a booking credential.
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct BookingAccessParams {
    /// Capability secret returned at creation.
    pub manage_token: Option<String>,
    /// Session credential, when no bearer header is sent.
    pub session_token: Option<String>,
}

impl BookingAccessParams {
    /// Non-blank manage token, if any.
    pub fn manage_token(&self) -> Option<ManageToken> {
        self.manage_token
            .as_deref()
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .map(ManageToken::from_string)
    }
}

/// Listing filters. Values arrive as raw strings so bad input maps to a
/// field-level error.
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct BookingListParams {
    /// One of `pending`, `confirmed`, `assigned`, `on_trip`, `completed`,
    /// `canceled`.
    pub status: Option<String>,
    /// Page size, 1 to 100. Defaults to 20.
    pub limit: Option<String>,
    /// Rows to skip. Defaults to 0.
    pub offset: Option<String>,
    /// Session credential, when no bearer header is sent.
    pub session_token: Option<String>,
}

impl TryFrom<&BookingListParams> for BookingListQuery {
    type Error = Error;

    fn try_from(params: &BookingListParams) -> Result<Self, Self::Error> {
        parse_list_query(
            params.status.as_deref(),
            params.limit.as_deref(),
            params.offset.as_deref(),
        )
    }
}

/// Render a listing; listed bookings never carry manage tokens.
pub fn render_list(bookings: Vec<Booking>) -> Vec<BookingBody> {
    bookings.into_iter().map(BookingBody::redacted).collect()
}
