//! OpenAPI schema definitions for domain types.
//!
//! Domain types remain framework-agnostic by not deriving `ToSchema`. This
//! module provides the schema definitions required for OpenAPI documentation
//! using utoipa's external schema registration.
//!
//! The schema wrappers mirror the structure of their corresponding domain
//! types but live in the inbound adapter layer where framework concerns belong.

use utoipa::ToSchema;

/// OpenAPI schema for [`crate::domain::ErrorCode`].
///
/// Stable machine-readable error codes returned in API error responses.
#[derive(ToSchema)]
#[schema(as = crate::domain::ErrorCode)]
pub enum ErrorCodeSchema {
    /// The request is malformed or fails validation.
    #[schema(rename = "invalid_request")]
    InvalidRequest,
    /// Authentication failed or is missing.
    #[schema(rename = "unauthorized")]
    Unauthorized,
    /// Authenticated but not permitted to perform this action.
    #[schema(rename = "forbidden")]
    Forbidden,
    /// The requested resource does not exist or is not visible to the caller.
    #[schema(rename = "not_found")]
    NotFound,
    /// The request collides with an earlier one or a concurrent change.
    #[schema(rename = "conflict")]
    Conflict,
    /// A booking rule refused the change; `details.reason` names the rule.
    #[schema(rename = "policy_violation")]
    PolicyViolation,
    /// The caller exceeded a rate limit.
    #[schema(rename = "too_many_requests")]
    TooManyRequests,
    /// A dependency is unavailable.
    #[schema(rename = "service_unavailable")]
    ServiceUnavailable,
    /// An unexpected error occurred on the server.
    #[schema(rename = "internal_error")]
    InternalError,
}

/// OpenAPI schema for [`crate::domain::Error`].
///
/// API error response payload with machine-readable code and human-readable
/// message.
#[derive(ToSchema)]
#[schema(as = crate::domain::Error)]
#[expect(
    dead_code,
    reason = "Used only for OpenAPI schema generation via utoipa"
)]
pub struct ErrorSchema {
    /// Stable machine-readable error code.
    #[schema(example = "invalid_request")]
    code: ErrorCodeSchema,
    /// Human-readable message returned to clients.
    #[schema(example = "Something went wrong")]
    message: String,
    /// Correlation identifier for tracing this error across systems.
    #[schema(example = "01HZY8B2W6X5Y7Z9ABCD1234")]
    trace_id: Option<String>,
    /// Supplementary error details for clients.
    details: Option<serde_json::Value>,
}

/// OpenAPI schema for [`crate::domain::BookingStatus`].
#[derive(ToSchema)]
#[schema(as = crate::domain::BookingStatus)]
pub enum BookingStatusSchema {
    /// Awaiting dispatcher confirmation.
    #[schema(rename = "pending")]
    Pending,
    /// Confirmed by dispatch.
    #[schema(rename = "confirmed")]
    Confirmed,
    /// A driver is assigned.
    #[schema(rename = "assigned")]
    Assigned,
    /// The ride is under way.
    #[schema(rename = "on_trip")]
    OnTrip,
    /// The ride finished.
    #[schema(rename = "completed")]
    Completed,
    /// The booking was canceled.
    #[schema(rename = "canceled")]
    Canceled,
}

/// OpenAPI schema for [`crate::domain::RideType`].
#[derive(ToSchema)]
#[schema(as = crate::domain::RideType)]
pub enum RideTypeSchema {
    /// Fixed price per ride.
    #[schema(rename = "per_ride")]
    PerRide,
    /// Charged by the hour.
    #[schema(rename = "hourly")]
    Hourly,
}
