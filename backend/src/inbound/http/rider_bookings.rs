//! Rider booking HTTP handlers.
//!
//! ```text
//! POST   /api/v1/rider/bookings
//! GET    /api/v1/rider/bookings
//! GET    /api/v1/rider/bookings/{id}
//! DELETE /api/v1/rider/bookings/{id}
//! ```
//!
//! Every route requires a rider account session. Manage tokens are never
//! accepted or returned here.

use actix_web::{HttpResponse, delete, get, post, web};

use crate::domain::{BookingCredential, BookingId, BookingListQuery, Role, TripDraft};
use crate::inbound::http::ApiResult;
use crate::inbound::http::booking_dto::{BookingBody, BookingListParams, TripBody, render_list};
use crate::inbound::http::schemas::ErrorSchema;
use crate::inbound::http::session::SessionContext;
use crate::inbound::http::state::HttpState;

/// Book a ride for the signed-in rider.
///
/// Contact details come from the rider's account.
#[utoipa::path(
    post,
    path = "/api/v1/rider/bookings",
    request_body = TripBody,
    responses(
        (status = 201, description = "Booking created", body = BookingBody),
        (status = 400, description = "Invalid request", body = ErrorSchema),
        (status = 401, description = "Session required", body = ErrorSchema),
        (status = 403, description = "Rider account required", body = ErrorSchema)
    ),
    tags = ["rider-bookings"],
    operation_id = "createRiderBooking",
    security(("AccountSession" = []))
)]
#[post("/rider/bookings")]
pub async fn create_rider_booking(
    state: web::Data<HttpState>,
    session: SessionContext,
    payload: web::Json<TripBody>,
) -> ApiResult<HttpResponse> {
    let identity = session.require_role(Role::Rider)?;
    let trip = TripDraft::try_from(payload.into_inner())?;
    let booking = state.bookings.create_for_user(&identity, trip).await?;
    Ok(HttpResponse::Created().json(BookingBody::redacted(booking)))
}

/// List the rider's bookings, newest first.
#[utoipa::path(
    get,
    path = "/api/v1/rider/bookings",
    params(BookingListParams),
    responses(
        (status = 200, description = "Bookings", body = [BookingBody]),
        (status = 400, description = "Invalid filter", body = ErrorSchema),
        (status = 401, description = "Session required", body = ErrorSchema),
        (status = 403, description = "Rider account required", body = ErrorSchema)
    ),
    tags = ["rider-bookings"],
    operation_id = "listRiderBookings",
    security(("AccountSession" = []))
)]
#[get("/rider/bookings")]
pub async fn list_rider_bookings(
    state: web::Data<HttpState>,
    session: SessionContext,
    params: web::Query<BookingListParams>,
) -> ApiResult<web::Json<Vec<BookingBody>>> {
    let identity = session.require_role(Role::Rider)?;
    let query = BookingListQuery::try_from(&*params)?;
    let bookings = state.bookings.list(&identity, &query).await?;
    Ok(web::Json(render_list(bookings)))
}

/// Fetch one of the rider's bookings.
#[utoipa::path(
    get,
    path = "/api/v1/rider/bookings/{id}",
    params(("id" = i64, Path, description = "Booking id")),
    responses(
        (status = 200, description = "Booking", body = BookingBody),
        (status = 401, description = "Session required", body = ErrorSchema),
        (status = 403, description = "Rider account required", body = ErrorSchema),
        (status = 404, description = "Booking not found", body = ErrorSchema)
    ),
    tags = ["rider-bookings"],
    operation_id = "getRiderBooking",
    security(("AccountSession" = []))
)]
#[get("/rider/bookings/{id}")]
pub async fn get_rider_booking(
    state: web::Data<HttpState>,
    session: SessionContext,
    path: web::Path<i64>,
) -> ApiResult<web::Json<BookingBody>> {
    let identity = session.require_role(Role::Rider)?;
    let id = BookingId::new(path.into_inner());
    let resolved = state
        .bookings
        .get(id, &BookingCredential::Session(identity))
        .await?;
    Ok(web::Json(resolved.into()))
}

/// Cancel one of the rider's bookings, honouring the 24 hour cutoff.
#[utoipa::path(
    delete,
    path = "/api/v1/rider/bookings/{id}",
    params(("id" = i64, Path, description = "Booking id")),
    responses(
        (status = 204, description = "Booking canceled"),
        (status = 401, description = "Session required", body = ErrorSchema),
        (status = 403, description = "Rider account required", body = ErrorSchema),
        (status = 404, description = "Booking not found or already canceled", body = ErrorSchema),
        (status = 422, description = "Inside the cancellation cutoff", body = ErrorSchema)
    ),
    tags = ["rider-bookings"],
    operation_id = "cancelRiderBooking",
    security(("AccountSession" = []))
)]
#[delete("/rider/bookings/{id}")]
pub async fn cancel_rider_booking(
    state: web::Data<HttpState>,
    session: SessionContext,
    path: web::Path<i64>,
) -> ApiResult<HttpResponse> {
    let identity = session.require_role(Role::Rider)?;
    let id = BookingId::new(path.into_inner());
    state
        .bookings
        .cancel(id, &BookingCredential::Session(identity))
        .await?;
    Ok(HttpResponse::NoContent().finish())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inbound::http::test_utils::{bearer, init_api, json_body};
    use crate::test_support::{TestApp, TestAppOptions, sample_booking, sample_user};
    use actix_web::http::StatusCode;
    use actix_web::test as actix_test;
    use rstest::rstest;
    use serde_json::json;

    fn trip() -> serde_json::Value {
        json!({
            "pickup": "5 Station Road",
            "dropoff": "1 Airport Way",
            "scheduled_at": "2026-03-03T07:30:00Z",
            "passengers": 1,
            "luggages": 2,
            "ride_type": "hourly"
        })
    }

    #[rstest]
    #[actix_web::test]
    async fn rider_booking_copies_account_contact() {
        let rider = sample_user(11, Role::Rider);
        let app = TestApp::new(TestAppOptions {
            users: vec![rider.clone()],
            ..TestAppOptions::default()
        });
        let service = init_api(&app.state).await;
        let session = app.account_session(&rider);

        let res = actix_test::call_service(
            &service,
            actix_test::TestRequest::post()
                .uri("/api/v1/rider/bookings")
                .insert_header(bearer(&session))
                .set_json(trip())
                .to_request(),
        )
        .await;
        assert_eq!(res.status(), StatusCode::CREATED);
        let body = json_body(res).await;
        assert_eq!(body["rider_name"], rider.name.as_str());
        assert_eq!(body["rider_email"], rider.email.as_str());
        assert_eq!(body["ride_type"], "hourly");
        assert!(body.get("manage_token").is_none());

        let id = body["id"].as_i64().expect("id");
        let stored = app.bookings.get(BookingId::new(id)).expect("stored");
        assert_eq!(stored.user_id, Some(rider.id));

        let res = actix_test::call_service(
            &service,
            actix_test::TestRequest::get()
                .uri("/api/v1/rider/bookings")
                .insert_header(bearer(&session))
                .to_request(),
        )
        .await;
        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(json_body(res).await.as_array().map(Vec::len), Some(1));
    }

    #[rstest]
    #[actix_web::test]
    async fn riders_cannot_reach_each_others_bookings() {
        let owner = sample_user(11, Role::Rider);
        let intruder = sample_user(12, Role::Rider);
        let app = TestApp::new(TestAppOptions {
            users: vec![owner.clone(), intruder.clone()],
            ..TestAppOptions::default()
        });
        let mut booking = sample_booking(BookingId::new(40));
        booking.user_id = Some(owner.id);
        booking.rider_email = owner.email.clone();
        app.bookings.seed(booking);
        let service = init_api(&app.state).await;

        for (user, expected) in [(&owner, StatusCode::OK), (&intruder, StatusCode::NOT_FOUND)] {
            let res = actix_test::call_service(
                &service,
                actix_test::TestRequest::get()
                    .uri("/api/v1/rider/bookings/40")
                    .insert_header(bearer(&app.account_session(user)))
                    .to_request(),
            )
            .await;
            assert_eq!(res.status(), expected);
        }

        let res = actix_test::call_service(
            &service,
            actix_test::TestRequest::delete()
                .uri("/api/v1/rider/bookings/40")
                .insert_header(bearer(&app.account_session(&intruder)))
                .to_request(),
        )
        .await;
        assert_eq!(res.status(), StatusCode::NOT_FOUND);

        let res = actix_test::call_service(
            &service,
            actix_test::TestRequest::delete()
                .uri("/api/v1/rider/bookings/40")
                .insert_header(bearer(&app.account_session(&owner)))
                .to_request(),
        )
        .await;
        assert_eq!(res.status(), StatusCode::NO_CONTENT);
    }

    #[rstest]
    #[actix_web::test]
    async fn guest_sessions_are_forbidden() {
        let app = TestApp::default();
        let service = init_api(&app.state).await;

        let res = actix_test::call_service(
            &service,
            actix_test::TestRequest::post()
                .uri("/api/v1/rider/bookings")
                .insert_header(bearer(&app.guest_session("ada@example.com")))
                .set_json(trip())
                .to_request(),
        )
        .await;
        assert_eq!(res.status(), StatusCode::FORBIDDEN);
        assert_eq!(app.bookings.count(), 0);
    }
}
