//! Guest booking HTTP handlers.
//!
//! ```text
//! POST   /api/v1/guest/bookings
//! GET    /api/v1/guest/bookings
//! GET    /api/v1/guest/bookings/{id}
//! PATCH  /api/v1/guest/bookings/{id}
//! DELETE /api/v1/guest/bookings/{id}
//! ```
//!
//! Single-booking routes accept either the booking's `manage_token` query
//! parameter or a session that owns the booking.

use actix_web::{HttpRequest, HttpResponse, delete, get, patch, post, web};

use crate::domain::{
    BookingCredential, BookingId, BookingListQuery, BookingPatch, GuestBookingDraft,
};
use crate::inbound::http::ApiResult;
use crate::inbound::http::booking_dto::{
    BookingAccessParams, BookingBody, BookingListParams, BookingPatchRequest,
    GuestBookingCreated, GuestBookingRequest, render_list,
};
use crate::inbound::http::client_ip::ClientIp;
use crate::inbound::http::idempotency::{extract_idempotency_key, map_idempotency_key_error};
use crate::inbound::http::schemas::ErrorSchema;
use crate::inbound::http::session::SessionContext;
use crate::inbound::http::state::HttpState;

const BOOKING_SCOPE: &str = "guest_booking";

fn credential(params: &BookingAccessParams, session: SessionContext) -> BookingCredential {
    BookingCredential::from_parts(params.manage_token(), session.into_identity())
}

/// Create a guest booking.
///
/// # Idempotency
///
/// Clients may send an `Idempotency-Key` header for safe retries. A retry
/// with the same key and body returns the original booking with `200`; the
/// same key with a different body is rejected with `409`.
#[utoipa::path(
    post,
    path = "/api/v1/guest/bookings",
    request_body = GuestBookingRequest,
    params(
        ("Idempotency-Key" = Option<String>, Header, description = "Client key for safe retries")
    ),
    responses(
        (status = 201, description = "Booking created", body = GuestBookingCreated),
        (status = 200, description = "Earlier booking replayed", body = GuestBookingCreated),
        (status = 400, description = "Invalid request", body = ErrorSchema),
        (status = 409, description = "Idempotency key conflict", body = ErrorSchema),
        (status = 429, description = "Too many requests", body = ErrorSchema)
    ),
    tags = ["guest-bookings"],
    operation_id = "createGuestBooking",
    security([])
)]
#[post("/guest/bookings")]
pub async fn create_guest_booking(
    state: web::Data<HttpState>,
    request: HttpRequest,
    client: ClientIp,
    payload: web::Json<GuestBookingRequest>,
) -> ApiResult<HttpResponse> {
    state
        .limiter
        .enforce(
            &[client.rate_limit_key().scoped(BOOKING_SCOPE)],
            &state.booking_limit,
        )
        .await?;
    let key = extract_idempotency_key(request.headers()).map_err(map_idempotency_key_error)?;
    let draft = GuestBookingDraft::try_from(payload.into_inner())?;
    let created = state.bookings.create_guest(draft, key).await?;

    let body = GuestBookingCreated::from(&created.booking);
    let response = if created.replayed {
        HttpResponse::Ok().json(body)
    } else {
        HttpResponse::Created().json(body)
    };
    Ok(response)
}

/// List bookings made with the session's email.
#[utoipa::path(
    get,
    path = "/api/v1/guest/bookings",
    params(BookingListParams),
    responses(
        (status = 200, description = "Bookings, newest first", body = [BookingBody]),
        (status = 400, description = "Invalid filter", body = ErrorSchema),
        (status = 401, description = "Session required", body = ErrorSchema)
    ),
    tags = ["guest-bookings"],
    operation_id = "listGuestBookings",
    security(("GuestSession" = []))
)]
#[get("/guest/bookings")]
pub async fn list_guest_bookings(
    state: web::Data<HttpState>,
    session: SessionContext,
    params: web::Query<BookingListParams>,
) -> ApiResult<web::Json<Vec<BookingBody>>> {
    let identity = session.require("Valid guest session required")?;
    let query = BookingListQuery::try_from(&*params)?;
    let bookings = state.bookings.list(&identity, &query).await?;
    Ok(web::Json(render_list(bookings)))
}

/// Fetch one booking.
#[utoipa::path(
    get,
    path = "/api/v1/guest/bookings/{id}",
    params(("id" = i64, Path, description = "Booking id"), BookingAccessParams),
    responses(
        (status = 200, description = "Booking", body = BookingBody),
        (status = 401, description = "No credential presented", body = ErrorSchema),
        (status = 404, description = "Booking not found", body = ErrorSchema)
    ),
    tags = ["guest-bookings"],
    operation_id = "getGuestBooking",
    security((), ("GuestSession" = []))
)]
#[get("/guest/bookings/{id}")]
pub async fn get_guest_booking(
    state: web::Data<HttpState>,
    session: SessionContext,
    path: web::Path<i64>,
    params: web::Query<BookingAccessParams>,
) -> ApiResult<web::Json<BookingBody>> {
    let id = BookingId::new(path.into_inner());
    let resolved = state.bookings.get(id, &credential(&params, session)).await?;
    Ok(web::Json(resolved.into()))
}

/// Update a booking. Only fields present in the body change.
#[utoipa::path(
    patch,
    path = "/api/v1/guest/bookings/{id}",
    request_body = BookingPatchRequest,
    params(("id" = i64, Path, description = "Booking id"), BookingAccessParams),
    responses(
        (status = 200, description = "Updated booking", body = BookingBody),
        (status = 400, description = "Invalid field", body = ErrorSchema),
        (status = 401, description = "No credential presented", body = ErrorSchema),
        (status = 404, description = "Booking not found", body = ErrorSchema),
        (status = 409, description = "Concurrent modification", body = ErrorSchema),
        (status = 422, description = "Reschedule limit reached or booking closed", body = ErrorSchema)
    ),
    tags = ["guest-bookings"],
    operation_id = "patchGuestBooking",
    security((), ("GuestSession" = []))
)]
#[patch("/guest/bookings/{id}")]
pub async fn patch_guest_booking(
    state: web::Data<HttpState>,
    session: SessionContext,
    path: web::Path<i64>,
    params: web::Query<BookingAccessParams>,
    payload: web::Json<BookingPatchRequest>,
) -> ApiResult<web::Json<BookingBody>> {
    let id = BookingId::new(path.into_inner());
    let patch = BookingPatch::try_from(payload.into_inner())?;
    let resolved = state
        .bookings
        .patch(id, &credential(&params, session), patch)
        .await?;
    Ok(web::Json(resolved.into()))
}

/// Cancel a booking at least 24 hours before pickup.
#[utoipa::path(
    delete,
    path = "/api/v1/guest/bookings/{id}",
    params(("id" = i64, Path, description = "Booking id"), BookingAccessParams),
    responses(
        (status = 204, description = "Booking canceled"),
        (status = 401, description = "No credential presented", body = ErrorSchema),
        (status = 404, description = "Booking not found or already canceled", body = ErrorSchema),
        (status = 422, description = "Inside the cancellation cutoff", body = ErrorSchema)
    ),
    tags = ["guest-bookings"],
    operation_id = "cancelGuestBooking",
    security((), ("GuestSession" = []))
)]
#[delete("/guest/bookings/{id}")]
pub async fn cancel_guest_booking(
    state: web::Data<HttpState>,
    session: SessionContext,
    path: web::Path<i64>,
    params: web::Query<BookingAccessParams>,
) -> ApiResult<HttpResponse> {
    let id = BookingId::new(path.into_inner());
    state
        .bookings
        .cancel(id, &credential(&params, session))
        .await?;
    Ok(HttpResponse::NoContent().finish())
}

#[cfg(test)]
#[path = "guest_bookings_tests.rs"]
mod tests;
